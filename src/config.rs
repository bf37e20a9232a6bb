use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Locations of the three inputs. Each may be a local path or an http(s) URL.
#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub data_csv: PathBuf,
    pub counties: PathBuf,
    #[serde(default = "default_counties_object")]
    pub counties_object: String,
    pub context: PathBuf,
    #[serde(default = "default_context_object")]
    pub context_object: String,
    #[serde(default = "default_join_column")]
    pub join_column: String,
}

fn default_counties_object() -> String {
    "NJ_Counties".to_string()
}

fn default_context_object() -> String {
    "states".to_string()
}

fn default_join_column() -> String {
    "GEOID".to_string()
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub width: f64,
    pub height: f64,
    /// Projection rotation in degrees, [lambda, phi].
    pub rotate: [f64; 2],
    pub scale: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            width: 816.0,
            height: 585.0,
            rotate: [74.0 + 30.0 / 60.0, -40.0 - 10.0 / 60.0],
            scale: 13000.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChartConfig {
    pub width: f64,
    pub height: f64,
    pub left_padding: f64,
    pub right_padding: f64,
    pub top_bottom_padding: f64,
    /// Value domain of the y axis.
    pub domain: [f64; 2],
    /// Pixel range the domain maps onto, bottom first.
    pub range: [f64; 2],
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig {
            width: 816.0,
            height: 600.0,
            left_padding: 30.0,
            right_padding: 50.0,
            top_bottom_padding: 6.0,
            domain: [0.0, 140.0],
            range: [585.0, 0.0],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { port: 3000 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            data_csv = "data/lab2_data.csv"
            counties = "data/NJ_Counties.topojson"
            context = "data/states.topojson"
            "#,
        )
        .unwrap();

        assert_eq!(config.input.counties_object, "NJ_Counties");
        assert_eq!(config.input.context_object, "states");
        assert_eq!(config.input.join_column, "GEOID");
        assert_eq!(config.map.height, 585.0);
        assert_eq!(config.chart.domain, [0.0, 140.0]);
        assert_eq!(config.chart.range, [585.0, 0.0]);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn missing_input_section_is_an_error() {
        assert!(AppConfig::from_toml("[server]\nport = 8080\n").is_err());
    }
}
