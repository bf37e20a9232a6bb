use super::{escape, COUNTY_STYLE};
use crate::classify::ViewState;
use crate::config::MapConfig;
use crate::projection::{graticule, Projection};
use crate::types::{AttributeValues, GeoFeature};
use geo::MultiPolygon;
use rayon::prelude::*;
use std::fmt::Write;

pub const RECOLOR_MS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct CountyShape {
    pub geoid: String,
    pub d: String,
    pub attributes: Option<AttributeValues>,
}

impl CountyShape {
    pub fn fill(&self, view: &ViewState) -> &'static str {
        let value = self
            .attributes
            .as_ref()
            .and_then(|attrs| attrs.get(&view.expressed).copied());
        view.scale.fill(value)
    }
}

/// Projected map geometry. Geometry never changes after the join, so paths
/// are computed once and only fills depend on the view.
#[derive(Debug, Clone)]
pub struct MapSurface {
    pub width: f64,
    pub height: f64,
    pub graticule: Vec<String>,
    pub context: String,
    pub counties: Vec<CountyShape>,
}

impl MapSurface {
    pub fn build(config: &MapConfig, counties: &[GeoFeature], context: &[MultiPolygon<f64>]) -> Self {
        let projection = Projection::for_map(config);

        let extent: Vec<MultiPolygon<f64>> = counties.iter().map(|f| f.geometry.clone()).collect();
        let graticule = graticule(&extent, 1.0)
            .iter()
            .map(|line| projection.line(line))
            .collect();

        let context = context
            .par_iter()
            .map(|mp| projection.path(mp))
            .collect::<Vec<_>>()
            .concat();

        let counties = counties
            .par_iter()
            .map(|f| CountyShape {
                geoid: f.geoid.clone(),
                d: projection.path(&f.geometry),
                attributes: f.attributes.clone(),
            })
            .collect();

        MapSurface {
            width: config.width,
            height: config.height,
            graticule,
            context,
            counties,
        }
    }

    /// Current fill for every county, in draw order.
    pub fn fills(&self, view: &ViewState) -> Vec<(&str, &'static str)> {
        self.counties
            .iter()
            .map(|c| (c.geoid.as_str(), c.fill(view)))
            .collect()
    }

    pub fn to_svg(&self, view: &ViewState) -> String {
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg class="map" xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" fill="lightBlue">"#,
            self.width, self.height
        );
        let _ = writeln!(svg, r#"<rect class="mapBackground" width="100%" height="100%" fill="lightBlue"/>"#);
        for d in &self.graticule {
            let _ = writeln!(svg, r#"<path class="gratLines" d="{}"/>"#, d);
        }
        let _ = writeln!(svg, r#"<path class="states" d="{}"/>"#, self.context);
        for county in &self.counties {
            let geoid = escape(&county.geoid);
            let _ = writeln!(
                svg,
                r#"<path class="counties {id}" data-geoid="{id}" d="{d}" style="fill: {fill}; stroke: {stroke}; stroke-width: {width}"/>"#,
                id = geoid,
                d = county.d,
                fill = county.fill(view),
                stroke = COUNTY_STYLE.stroke,
                width = COUNTY_STYLE.stroke_width,
            );
        }
        svg.push_str("</svg>\n");
        svg
    }
}
