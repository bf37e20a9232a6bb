use super::{escape, BAR_STYLE};
use crate::classify::ViewState;
use crate::config::ChartConfig;
use crate::types::{AttributeName, CountyRecord};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt::Write;

/// Per-bar stagger and duration of the re-sort transition.
pub const BAR_DELAY_STEP_MS: u64 = 40;
pub const BAR_DURATION_MS: u64 = 1500;

const TITLE_POS: (f64, f64) = (90.0, 40.0);
const TICK_SIZE: f64 = 6.0;

pub fn chart_title(expressed: AttributeName) -> String {
    format!("Number of Residents per County {} per 1,000", expressed)
}

#[derive(Debug, Clone)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub left_padding: f64,
    pub top_bottom_padding: f64,
    pub inner_width: f64,
    pub inner_height: f64,
    domain: [f64; 2],
    range: [f64; 2],
}

/// Where one bar sits, by rank in the current sort.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarGeometry {
    pub geoid: String,
    pub rank: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: &'static str,
}

impl ChartLayout {
    pub fn new(config: &ChartConfig) -> Self {
        ChartLayout {
            width: config.width,
            height: config.height,
            left_padding: config.left_padding,
            top_bottom_padding: config.top_bottom_padding,
            inner_width: config.width - config.left_padding - config.right_padding,
            inner_height: config.height - config.top_bottom_padding * 2.0,
            domain: config.domain,
            range: config.range,
        }
    }

    pub fn y_scale(&self, value: f64) -> f64 {
        let [d0, d1] = self.domain;
        let [r0, r1] = self.range;
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }

    /// Bars sorted by the expressed value, largest first. NaN sorts last and
    /// draws as an empty bar on the baseline.
    pub fn layout_bars(&self, records: &[CountyRecord], view: &ViewState) -> Vec<BarGeometry> {
        let mut order: Vec<&CountyRecord> = records.iter().collect();
        order.sort_by(|a, b| descending(a.value(view.expressed), b.value(view.expressed)));

        let n = records.len().max(1) as f64;
        let slot = self.inner_width / n;
        let baseline = self.range[0];

        order
            .into_iter()
            .enumerate()
            .map(|(rank, record)| {
                let value = record.value(view.expressed);
                let top = if value.is_nan() { baseline } else { self.y_scale(value) };
                BarGeometry {
                    geoid: record.geoid.clone(),
                    rank,
                    x: rank as f64 * slot + self.left_padding,
                    y: top + self.top_bottom_padding,
                    width: slot - 1.0,
                    height: baseline - top,
                    fill: view.scale.color(value),
                }
            })
            .collect()
    }

    pub fn ticks(&self) -> Vec<f64> {
        linear_ticks(self.domain[0], self.domain[1], 10)
    }

    pub fn to_svg(&self, records: &[CountyRecord], view: &ViewState) -> String {
        let translate = format!("translate({},{})", self.left_padding, self.top_bottom_padding);
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg class="chart" xmlns="http://www.w3.org/2000/svg" width="{}" height="{}">"#,
            self.width, self.height
        );
        let _ = writeln!(
            svg,
            r#"<rect class="chartBackground" width="{}" height="{}" transform="{}"/>"#,
            self.inner_width, self.inner_height, translate
        );

        for bar in self.layout_bars(records, view) {
            let geoid = escape(&bar.geoid);
            let _ = writeln!(
                svg,
                r#"<rect class="bar {id}" data-geoid="{id}" x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" style="fill: {fill}; stroke: {stroke}; stroke-width: {sw}"/>"#,
                id = geoid,
                x = bar.x,
                y = bar.y,
                w = bar.width,
                h = bar.height,
                fill = bar.fill,
                stroke = BAR_STYLE.stroke,
                sw = BAR_STYLE.stroke_width,
            );
        }

        let _ = writeln!(
            svg,
            r#"<text class="chartTitle" x="{}" y="{}">{}</text>"#,
            TITLE_POS.0,
            TITLE_POS.1,
            escape(&chart_title(view.expressed))
        );
        let _ = writeln!(
            svg,
            r#"<rect class="chartFrame" width="{}" height="{}" transform="{}"/>"#,
            self.inner_width, self.inner_height, translate
        );

        let _ = writeln!(svg, r#"<g class="axis" transform="{}">"#, translate);
        for tick in self.ticks() {
            let _ = writeln!(
                svg,
                r#"<g class="tick" transform="translate(0,{y})"><line x2="-{t}" y2="0"/><text x="-{tx}" y="0" dy=".32em" style="text-anchor: end">{v}</text></g>"#,
                y = self.y_scale(tick),
                t = TICK_SIZE,
                tx = TICK_SIZE + 3.0,
                v = tick,
            );
        }
        let _ = writeln!(
            svg,
            r#"<path class="domain" d="M-{t},{r0}H0V{r1}H-{t}"/>"#,
            t = TICK_SIZE,
            r0 = self.range[0],
            r1 = self.range[1],
        );
        svg.push_str("</g>\n</svg>\n");
        svg
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Roughly `count` evenly spaced round values covering [start, stop].
fn linear_ticks(start: f64, stop: f64, count: usize) -> Vec<f64> {
    let span = stop - start;
    if span <= 0.0 || count == 0 {
        return vec![start];
    }
    let m = count as f64;
    let mut step = 10f64.powf((span / m).log10().floor());
    let err = m / span * step;
    if err <= 0.15 {
        step *= 10.0;
    } else if err <= 0.35 {
        step *= 5.0;
    } else if err <= 0.75 {
        step *= 2.0;
    }

    let first = (start / step).ceil();
    let last = (stop / step).floor();
    (first as i64..=last as i64).map(|i| i as f64 * step).collect()
}
