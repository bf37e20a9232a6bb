pub mod types;
pub mod config;
pub mod error;
pub mod topology;
pub mod data;
pub mod join;
pub mod classify;
pub mod projection;
pub mod render;
pub mod interaction;
pub mod server;

use anyhow::Context;
use clap::{Parser, Subcommand};
use classify::ViewState;
use interaction::Controller;
use render::chart::ChartLayout;
use render::map::MapSurface;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use types::AttributeName;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the map, chart and a static page for one attribute
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Attribute to express, e.g. "Age 30-39"
        #[arg(short, long, default_value = "Select Age Range")]
        attribute: String,
    },
    /// Serve the interactive map and chart
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Render { config, attribute } => {
            info!("Rendering map with config: {:?}", config);
            let expressed = AttributeName::from_str(attribute)
                .with_context(|| format!("Unknown attribute '{}'", attribute))?;
            let app_config = config::AppConfig::load_from_file(config)?;

            let data = load_joined(&app_config, config).await?;
            let view = ViewState::new(&data.records, expressed);
            render::generate_outputs(&app_config, &data, &view)?;

            info!("Render complete!");
        }
        Commands::Serve { config } => {
            info!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let data = load_joined(&app_config, config).await?;
            let surface = MapSurface::build(&app_config.map, &data.counties, &data.context);
            let feature_names = data
                .counties
                .iter()
                .filter_map(|f| Some((f.geoid.clone(), f.name.clone()?)))
                .collect();
            let controller = Controller::new(
                data.records,
                surface,
                ChartLayout::new(&app_config.chart),
                feature_names,
                AttributeName::default(),
            );

            let state = server::AppState::new(data.counties, controller);
            server::start_server(app_config, state).await?;
        }
    }

    Ok(())
}

/// Load all inputs and join them. A failed load aborts before anything is drawn.
async fn load_joined(app_config: &config::AppConfig, config_path: &Path) -> anyhow::Result<data::LoadedData> {
    let mut data = match data::load_data(app_config).await {
        Ok(data) => data,
        Err(e) => {
            error!("Failed to load inputs from {:?}: {}", config_path, e);
            return Err(e.into());
        }
    };
    join::join_attributes(&data.records, &mut data.counties);
    Ok(data)
}
