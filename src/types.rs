use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumCount, EnumIter, EnumString};

/// Columns that can drive the map and chart.
///
/// `Placeholder` has no CSV column behind it; it exists so the dropdown can
/// open on a neutral prompt, and every value read for it is NaN.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
)]
pub enum AttributeName {
    #[default]
    #[serde(rename = "Select Age Range")]
    #[strum(serialize = "Select Age Range")]
    Placeholder,
    #[serde(rename = "Age 0-9")]
    #[strum(serialize = "Age 0-9")]
    Age0To9,
    #[serde(rename = "Age 10-19")]
    #[strum(serialize = "Age 10-19")]
    Age10To19,
    #[serde(rename = "Age 20-29")]
    #[strum(serialize = "Age 20-29")]
    Age20To29,
    #[serde(rename = "Age 30-39")]
    #[strum(serialize = "Age 30-39")]
    Age30To39,
    #[serde(rename = "Age 40-49")]
    #[strum(serialize = "Age 40-49")]
    Age40To49,
    #[serde(rename = "Age 50-59")]
    #[strum(serialize = "Age 50-59")]
    Age50To59,
    #[serde(rename = "Age 60-69")]
    #[strum(serialize = "Age 60-69")]
    Age60To69,
    #[serde(rename = "Age 70-79")]
    #[strum(serialize = "Age 70-79")]
    Age70To79,
    #[serde(rename = "Age 80 Plus")]
    #[strum(serialize = "Age 80 Plus")]
    Age80Plus,
}

pub type AttributeValues = BTreeMap<AttributeName, f64>;

// NaN for anything that isn't a finite number, including "inf" and overflow.
pub fn parse_value(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(f64::NAN)
}

#[derive(Debug, Clone, Serialize)]
pub struct CountyRecord {
    pub geoid: String,
    pub name: String,
    pub values: AttributeValues,
}

impl CountyRecord {
    pub fn value(&self, attribute: AttributeName) -> f64 {
        self.values.get(&attribute).copied().unwrap_or(f64::NAN)
    }
}

/// A county boundary. `attributes` stays `None` until the join finds a
/// matching record.
#[derive(Debug, Clone)]
pub struct GeoFeature {
    pub geoid: String,
    pub name: Option<String>,
    pub geometry: MultiPolygon<f64>,
    pub attributes: Option<AttributeValues>,
}

impl GeoFeature {
    pub fn value(&self, attribute: AttributeName) -> Option<f64> {
        self.attributes
            .as_ref()
            .and_then(|attrs| attrs.get(&attribute).copied())
    }
}
