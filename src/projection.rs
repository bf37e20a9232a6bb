use crate::config::MapConfig;
use geo::{BoundingRect, LineString, MultiPolygon};
use std::f64::consts::{FRAC_PI_4, PI};
use std::fmt::Write;

/// Transverse Mercator with a three-axis rotation, scaled and translated to
/// screen space. The third rotation angle is fixed at 90 degrees so the
/// central meridian runs vertically.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    /// Rotation in radians: lambda, phi, gamma.
    rotate: [f64; 3],
    scale: f64,
    translate: [f64; 2],
}

impl Projection {
    pub fn transverse_mercator(rotate_deg: [f64; 2], scale: f64, translate: [f64; 2]) -> Self {
        Projection {
            rotate: [
                rotate_deg[0].to_radians(),
                rotate_deg[1].to_radians(),
                90f64.to_radians(),
            ],
            scale,
            translate,
        }
    }

    pub fn for_map(config: &MapConfig) -> Self {
        Self::transverse_mercator(
            config.rotate,
            config.scale,
            [config.width / 2.0, config.height / 2.0],
        )
    }

    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (lambda, phi) = self.rotate_point(lon.to_radians(), lat.to_radians());
        let x = (FRAC_PI_4 + phi / 2.0).tan().ln();
        let y = -lambda;
        (
            self.translate[0] + self.scale * x,
            self.translate[1] - self.scale * y,
        )
    }

    fn rotate_point(&self, lambda: f64, phi: f64) -> (f64, f64) {
        let mut lambda = lambda + self.rotate[0];
        if lambda > PI {
            lambda -= 2.0 * PI;
        } else if lambda < -PI {
            lambda += 2.0 * PI;
        }

        let (sin_dphi, cos_dphi) = self.rotate[1].sin_cos();
        let (sin_dgamma, cos_dgamma) = self.rotate[2].sin_cos();
        let cos_phi = phi.cos();
        let x = lambda.cos() * cos_phi;
        let y = lambda.sin() * cos_phi;
        let z = phi.sin();
        let k = z * cos_dphi + x * sin_dphi;

        (
            (y * cos_dgamma - k * sin_dgamma).atan2(x * cos_dphi - z * sin_dphi),
            (k * cos_dgamma + y * sin_dgamma).clamp(-1.0, 1.0).asin(),
        )
    }

    /// SVG path data for a multipolygon: one closed subpath per ring.
    pub fn path(&self, geometry: &MultiPolygon<f64>) -> String {
        let mut d = String::new();
        for polygon in geometry {
            self.ring(&mut d, polygon.exterior(), true);
            for interior in polygon.interiors() {
                self.ring(&mut d, interior, true);
            }
        }
        d
    }

    pub fn line(&self, line: &LineString<f64>) -> String {
        let mut d = String::new();
        self.ring(&mut d, line, false);
        d
    }

    fn ring(&self, d: &mut String, line: &LineString<f64>, close: bool) {
        for (i, coord) in line.coords().enumerate() {
            let (x, y) = self.project(coord.x, coord.y);
            let cmd = if i == 0 { 'M' } else { 'L' };
            let _ = write!(d, "{}{:.2},{:.2}", cmd, x, y);
        }
        if close && line.0.len() > 1 {
            d.push('Z');
        }
    }
}

/// Meridians and parallels every `step` degrees covering the geometry's
/// extent padded by one step, snapped to whole steps.
pub fn graticule(extent_of: &[MultiPolygon<f64>], step: f64) -> Vec<LineString<f64>> {
    let bounds = extent_of
        .iter()
        .filter_map(|mp| mp.bounding_rect())
        .reduce(|a, b| {
            geo::Rect::new(
                geo::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                geo::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            )
        });
    let Some(bounds) = bounds else {
        return Vec::new();
    };

    let x0 = (bounds.min().x / step).floor() * step - step;
    let x1 = (bounds.max().x / step).ceil() * step + step;
    let y0 = (bounds.min().y / step).floor() * step - step;
    let y1 = (bounds.max().y / step).ceil() * step + step;
    // Sample along each line so curvature survives projection.
    let samples = 10;

    let mut lines: Vec<LineString<f64>> = Vec::new();
    let mut x = x0;
    while x <= x1 + f64::EPSILON {
        lines.push(
            (0..=samples)
                .map(|i| (x, y0 + (y1 - y0) * i as f64 / samples as f64))
                .collect::<Vec<_>>()
                .into(),
        );
        x += step;
    }
    let mut y = y0;
    while y <= y1 + f64::EPSILON {
        lines.push(
            (0..=samples)
                .map(|i| (x0 + (x1 - x0) * i as f64 / samples as f64, y))
                .collect::<Vec<_>>()
                .into(),
        );
        y += step;
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn nj() -> Projection {
        Projection::for_map(&MapConfig::default())
    }

    #[test]
    fn rotation_centre_lands_on_frame_centre() {
        let (x, y) = nj().project(-74.5, 40.0 + 10.0 / 60.0);
        assert!((x - 408.0).abs() < 1e-6, "x = {}", x);
        assert!((y - 292.5).abs() < 1e-6, "y = {}", y);
    }

    #[test]
    fn north_is_up_and_east_is_right() {
        let p = nj();
        let (_, y_south) = p.project(-74.5, 39.5);
        let (_, y_north) = p.project(-74.5, 41.0);
        assert!(y_north < y_south);

        let (x_west, _) = p.project(-75.0, 40.1667);
        let (x_east, _) = p.project(-74.0, 40.1667);
        assert!(x_west < x_east);
    }

    #[test]
    fn path_closes_each_ring() {
        let mp = MultiPolygon::new(vec![polygon![
            (x: -74.6, y: 40.0),
            (x: -74.4, y: 40.0),
            (x: -74.4, y: 40.2),
        ]]);
        let d = nj().path(&mp);
        assert!(d.starts_with('M'));
        assert_eq!(d.matches('L').count(), 3);
        assert!(d.ends_with('Z'));
    }

    #[test]
    fn graticule_spans_padded_extent() {
        let mp = MultiPolygon::new(vec![polygon![
            (x: -75.5, y: 39.2),
            (x: -73.9, y: 39.2),
            (x: -73.9, y: 41.3),
        ]]);
        let lines = graticule(&[mp], 1.0);
        // Meridians -77..=-72, parallels 38..=43.
        assert_eq!(lines.len(), 6 + 6);
        assert!(graticule(&[], 1.0).is_empty());
    }
}
