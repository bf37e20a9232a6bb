pub mod chart;
pub mod map;
pub mod page;

use crate::classify::ViewState;
use crate::config::AppConfig;
use crate::data::LoadedData;
use anyhow::{Context, Result};
use chart::ChartLayout;
use map::MapSurface;
use serde::Serialize;
use std::fs;
use tracing::info;

/// Stroke an element is created with, restored after a highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleSnapshot {
    pub stroke: &'static str,
    pub stroke_width: &'static str,
}

pub const COUNTY_STYLE: StyleSnapshot = StyleSnapshot {
    stroke: "#000",
    stroke_width: "0.5px",
};

pub const BAR_STYLE: StyleSnapshot = StyleSnapshot {
    stroke: "none",
    stroke_width: "0px",
};

pub const HIGHLIGHT_STYLE: StyleSnapshot = StyleSnapshot {
    stroke: "blue",
    stroke_width: "2",
};

/// Write `map.svg`, `chart.svg` and a static `index.html` for one view.
pub fn generate_outputs(config: &AppConfig, data: &LoadedData, view: &ViewState) -> Result<()> {
    let dir = &config.output.dir;
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {:?}", dir))?;

    let surface = MapSurface::build(&config.map, &data.counties, &data.context);
    let layout = ChartLayout::new(&config.chart);

    let map_svg = surface.to_svg(view);
    let chart_svg = layout.to_svg(&data.records, view);
    let html = page::render_page(&map_svg, &chart_svg, view, false);

    for (name, content) in [("map.svg", &map_svg), ("chart.svg", &chart_svg), ("index.html", &html)] {
        let path = dir.join(name);
        fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;
        info!("Wrote {:?}", path);
    }
    Ok(())
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
