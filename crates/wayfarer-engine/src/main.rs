//! # Wayfarer Engine
//!
//! Headless host for Project Wayfarer, an overworld strategy simulation.
//!
//! This binary ties the subsystems together:
//! - World: terrain field, battlefields and settlements
//! - Gameplay: NPC armies, combat, encounters and dialogue
//!
//! Usage: `wayfarer [config.toml]`. Without an argument `wayfarer.toml` in
//! the working directory is used when present.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod timing;

use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{EngineConfig, CONFIG_FILE};

/// Main entry point.
fn main() -> Result<()> {
    let explicit_path = std::env::args().nth(1);
    let config = match &explicit_path {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    };

    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_filter))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(config.log_json.then(|| fmt::layer().json()))
        .with((!config.log_json).then(fmt::layer))
        .init();

    info!("Project Wayfarer starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // First run without a config file leaves an editable copy behind
    if explicit_path.is_none() && !Path::new(CONFIG_FILE).exists() {
        if let Err(e) = config.save_to(CONFIG_FILE) {
            warn!("Failed to save config: {e}");
        }
    }

    let summary = app::run(config)?;

    info!(
        "Project Wayfarer shutdown complete after {:.0}s simulated",
        summary.simulated_seconds
    );
    Ok(())
}
