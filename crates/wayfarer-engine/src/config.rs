//! Host configuration.
//!
//! Wraps the simulation configuration with settings that only the host
//! cares about: tick rate, run length, scenario size and logging.
//! Configuration can be loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{info, warn};
use wayfarer_gameplay::SimConfig;

/// Configuration file name.
pub const CONFIG_FILE: &str = "wayfarer.toml";

/// Host configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Driver Settings ===
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Simulated seconds to run
    pub run_seconds: f64,
    /// Pace ticks against the wall clock instead of running flat out
    pub realtime: bool,
    /// World seed (None = random)
    pub seed: Option<u64>,
    /// Log filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Emit logs as JSON lines
    pub log_json: bool,

    // === Scenario Settings ===
    /// Bandit armies roaming the overworld
    pub bandit_count: usize,
    /// Merchant caravans
    pub merchant_count: usize,
    /// Allied patrols
    pub patrol_count: usize,
    /// Seconds to wait for a dialogue reply before giving up
    pub dialogue_max_wait: f64,

    // === Simulation ===
    /// Simulation core settings
    pub sim: SimConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Driver
            tick_rate: 20,
            run_seconds: 300.0,
            realtime: false,
            seed: None,
            log_filter: "wayfarer=info".to_string(),
            log_json: false,

            // Scenario
            bandit_count: 4,
            merchant_count: 4,
            patrol_count: 2,
            dialogue_max_wait: 5.0,

            sim: SimConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `wayfarer.toml` in the working directory.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let mut config = match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str::<Self>(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        };
        config.validate();
        config
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(1, 240);
        if !self.run_seconds.is_finite() || self.run_seconds < 0.0 {
            self.run_seconds = 0.0;
        }
        if !self.dialogue_max_wait.is_finite() || self.dialogue_max_wait < 0.0 {
            self.dialogue_max_wait = 5.0;
        }
        if self.log_filter.trim().is_empty() {
            self.log_filter = "wayfarer=info".to_string();
        }
        self.sim.validate();
    }

    /// Number of ticks in a full run.
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        (self.run_seconds * f64::from(self.tick_rate)).round() as u64
    }
}
