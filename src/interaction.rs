use crate::classify::ViewState;
use crate::render::chart::{chart_title, ChartLayout, BAR_DELAY_STEP_MS, BAR_DURATION_MS};
use crate::render::map::{MapSurface, RECOLOR_MS};
use crate::render::{StyleSnapshot, BAR_STYLE, COUNTY_STYLE, HIGHLIGHT_STYLE};
use crate::types::{AttributeName, CountyRecord};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

const LABEL_OFFSET_X: f64 = 10.0;
const LABEL_RISE: f64 = 75.0;
const LABEL_DROP: f64 = 25.0;
const EDGE_MARGIN: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    County,
    Bar,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId {
    pub kind: ElementKind,
    pub geoid: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionEvent {
    PointerEnter {
        geoid: String,
    },
    PointerLeave {
        geoid: String,
    },
    PointerMove {
        client_x: f64,
        client_y: f64,
        viewport_width: f64,
        label_width: f64,
    },
    SelectAttribute {
        attribute: AttributeName,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RenderCommand {
    SetStroke {
        element: ElementId,
        stroke: String,
        stroke_width: String,
    },
    ShowLabel {
        geoid: String,
        heading: String,
        attribute: String,
        county_name: String,
    },
    MoveLabel {
        left: f64,
        top: f64,
    },
    RemoveLabel,
    Recolor {
        element: ElementId,
        fill: String,
        duration_ms: u64,
    },
    PlaceBar {
        geoid: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: String,
        delay_ms: u64,
        duration_ms: u64,
    },
    SetTitle {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverState {
    Idle,
    Hovered(String),
}

pub struct Controller {
    view: ViewState,
    hover: HoverState,
    records: Vec<CountyRecord>,
    map: MapSurface,
    chart: ChartLayout,
    feature_names: HashMap<String, String>,
    snapshots: HashMap<ElementId, StyleSnapshot>,
}

impl Controller {
    /// Record the creation-time style of every county path and bar, then
    /// start from `expressed`.
    pub fn new(
        records: Vec<CountyRecord>,
        map: MapSurface,
        chart: ChartLayout,
        feature_names: HashMap<String, String>,
        expressed: AttributeName,
    ) -> Self {
        let mut snapshots = HashMap::new();
        for county in &map.counties {
            snapshots.insert(element(ElementKind::County, &county.geoid), COUNTY_STYLE);
        }
        for record in &records {
            snapshots.insert(element(ElementKind::Bar, &record.geoid), BAR_STYLE);
        }

        Controller {
            view: ViewState::new(&records, expressed),
            hover: HoverState::Idle,
            records,
            map,
            chart,
            feature_names,
            snapshots,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn hover(&self) -> &HoverState {
        &self.hover
    }

    pub fn records(&self) -> &[CountyRecord] {
        &self.records
    }

    pub fn map(&self) -> &MapSurface {
        &self.map
    }

    pub fn chart(&self) -> &ChartLayout {
        &self.chart
    }

    pub fn handle(&mut self, event: InteractionEvent) -> Vec<RenderCommand> {
        debug!(?event, hover = ?self.hover, "interaction");
        match event {
            InteractionEvent::PointerEnter { geoid } => {
                let mut commands = Vec::new();
                if let HoverState::Hovered(previous) = &self.hover {
                    let previous = previous.clone();
                    commands.extend(self.dehighlight(&previous));
                }
                commands.extend(self.highlight(&geoid));
                self.hover = HoverState::Hovered(geoid);
                commands
            }
            InteractionEvent::PointerLeave { geoid } => {
                if self.hover != HoverState::Hovered(geoid.clone()) {
                    return Vec::new();
                }
                self.hover = HoverState::Idle;
                self.dehighlight(&geoid)
            }
            InteractionEvent::PointerMove {
                client_x,
                client_y,
                viewport_width,
                label_width,
            } => match self.hover {
                HoverState::Hovered(_) => {
                    let (left, top) =
                        label_position(client_x, client_y, viewport_width, label_width);
                    vec![RenderCommand::MoveLabel { left, top }]
                }
                HoverState::Idle => Vec::new(),
            },
            InteractionEvent::SelectAttribute { attribute } => self.select(attribute),
        }
    }

    fn linked_elements(&self, geoid: &str) -> Vec<ElementId> {
        [ElementKind::County, ElementKind::Bar]
            .into_iter()
            .map(|kind| element(kind, geoid))
            .filter(|id| self.snapshots.contains_key(id))
            .collect()
    }

    fn highlight(&self, geoid: &str) -> Vec<RenderCommand> {
        let mut commands: Vec<RenderCommand> = self
            .linked_elements(geoid)
            .into_iter()
            .map(|element| RenderCommand::SetStroke {
                element,
                stroke: HIGHLIGHT_STYLE.stroke.to_string(),
                stroke_width: HIGHLIGHT_STYLE.stroke_width.to_string(),
            })
            .collect();
        commands.push(self.label(geoid));
        commands
    }

    fn dehighlight(&self, geoid: &str) -> Vec<RenderCommand> {
        let mut commands: Vec<RenderCommand> = self
            .linked_elements(geoid)
            .into_iter()
            .filter_map(|element| {
                let snapshot = self.snapshots.get(&element)?;
                Some(RenderCommand::SetStroke {
                    element,
                    stroke: snapshot.stroke.to_string(),
                    stroke_width: snapshot.stroke_width.to_string(),
                })
            })
            .collect();
        commands.push(RenderCommand::RemoveLabel);
        commands
    }

    fn label(&self, geoid: &str) -> RenderCommand {
        let record = self.records.iter().find(|r| r.geoid == geoid);
        let value = record.map_or(f64::NAN, |r| r.value(self.view.expressed));
        let heading = if value.is_nan() {
            "No data".to_string()
        } else {
            value.to_string()
        };
        let name = record
            .map(|r| r.name.clone())
            .or_else(|| self.feature_names.get(geoid).cloned())
            .unwrap_or_else(|| geoid.to_string());

        RenderCommand::ShowLabel {
            geoid: geoid.to_string(),
            heading,
            attribute: self.view.expressed.to_string(),
            county_name: format!("{} County", name),
        }
    }

    /// Reclassify, recolor the map, then re-sort and re-lay the bars, as one batch.
    fn select(&mut self, attribute: AttributeName) -> Vec<RenderCommand> {
        self.view.express(&self.records, attribute);
        debug!(attribute = %attribute, thresholds = ?self.view.scale.thresholds(), "expressed");

        // Multi-part counties share one id; the page recolors every path under it.
        let mut seen = HashSet::new();
        let mut commands: Vec<RenderCommand> = self
            .map
            .fills(&self.view)
            .into_iter()
            .filter(|(geoid, _)| seen.insert(*geoid))
            .map(|(geoid, fill)| RenderCommand::Recolor {
                element: element(ElementKind::County, geoid),
                fill: fill.to_string(),
                duration_ms: RECOLOR_MS,
            })
            .collect();

        commands.extend(
            self.chart
                .layout_bars(&self.records, &self.view)
                .into_iter()
                .map(|bar| RenderCommand::PlaceBar {
                    delay_ms: bar.rank as u64 * BAR_DELAY_STEP_MS,
                    duration_ms: BAR_DURATION_MS,
                    geoid: bar.geoid,
                    x: bar.x,
                    y: bar.y,
                    width: bar.width,
                    height: bar.height,
                    fill: bar.fill.to_string(),
                }),
        );
        commands.push(RenderCommand::SetTitle {
            text: chart_title(attribute),
        });
        commands
    }
}

fn element(kind: ElementKind, geoid: &str) -> ElementId {
    ElementId {
        kind,
        geoid: geoid.to_string(),
    }
}

/// Place the label up and to the right of the cursor, flipping left near the
/// right edge and below the cursor near the top.
pub fn label_position(client_x: f64, client_y: f64, viewport_width: f64, label_width: f64) -> (f64, f64) {
    let left = if client_x > viewport_width - label_width - EDGE_MARGIN {
        client_x - label_width - LABEL_OFFSET_X
    } else {
        client_x + LABEL_OFFSET_X
    };
    let top = if client_y < LABEL_RISE {
        client_y + LABEL_DROP
    } else {
        client_y - LABEL_RISE
    };
    (left, top)
}
