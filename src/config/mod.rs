// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Configuration module

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Longest accepted rolling-average interval: one year
pub const MAX_INTERVAL_MINUTES: u64 = 60 * 24 * 365;

/// Longest accepted rolling-average window: ten years
pub const MAX_WINDOW_HOURS: u64 = 24 * 365 * 10;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Data directory
    pub data_dir: PathBuf,

    /// Log level
    pub log_level: String,

    /// Enable demo mode (simulated BME280 readings)
    pub demo_mode: bool,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Recurring aggregation configuration
    pub scheduler: SchedulerConfig,

    /// Reading simulator configuration
    pub simulator: SimulatorConfig,

    /// Query limits
    pub query: QueryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "SensorHub".to_string(),
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
            demo_mode: false,
            database: DatabaseConfig::default(),
            scheduler: SchedulerConfig::default(),
            simulator: SimulatorConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Reject values the scheduler and simulator cannot work with
    pub fn validate(&self) -> Result<()> {
        let interval = self.scheduler.rolling_average_interval_minutes;
        if !(1..=MAX_INTERVAL_MINUTES).contains(&interval) {
            bail!(
                "scheduler.rolling_average_interval_minutes must be between 1 and {}, got {}",
                MAX_INTERVAL_MINUTES,
                interval
            );
        }
        let window = self.scheduler.rolling_average_window_hours;
        if !(1..=MAX_WINDOW_HOURS).contains(&window) {
            bail!(
                "scheduler.rolling_average_window_hours must be between 1 and {}, got {}",
                MAX_WINDOW_HOURS,
                window
            );
        }
        if self.scheduler.rolling_average_sensor_type.trim().is_empty() {
            bail!("scheduler.rolling_average_sensor_type must not be empty");
        }
        if self.simulator.interval_secs == 0 {
            bail!("simulator.interval_secs must be at least 1");
        }

        let sim = &self.simulator;
        for (name, min, max) in [
            ("temperature", sim.temp_min, sim.temp_max),
            ("humidity", sim.humidity_min, sim.humidity_max),
            ("pressure", sim.pressure_min, sim.pressure_max),
        ] {
            if min > max {
                bail!("simulator {} range is inverted ({} > {})", name, min, max);
            }
        }

        if self.query.default_limit == 0 || self.query.default_limit > self.query.max_limit {
            bail!(
                "query.default_limit must be between 1 and query.max_limit ({})",
                self.query.max_limit
            );
        }

        Ok(())
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("sensorhub"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database path
    pub path: PathBuf,

    /// How long a writer waits on a locked database, in milliseconds
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/sensorhub.db"),
            busy_timeout_ms: 5000,
        }
    }
}

/// Recurring rolling-average configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Start the background scheduler with the service
    pub enable_scheduler: bool,

    /// How often the rolling average is recomputed
    pub rolling_average_interval_minutes: u64,

    /// Size of the trailing window each run aggregates
    pub rolling_average_window_hours: u64,

    /// Sensor type the recurring job targets
    pub rolling_average_sensor_type: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enable_scheduler: true,
            rolling_average_interval_minutes: 1,
            rolling_average_window_hours: 1,
            rolling_average_sensor_type: "bme280".to_string(),
        }
    }
}

/// Simulated BME280 producer used in demo mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub device_id: String,
    pub sensor_type: String,
    pub interval_secs: u64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity_min: f64,
    pub humidity_max: f64,
    pub pressure_min: f64,
    pub pressure_max: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            device_id: "bme280_sim".to_string(),
            sensor_type: "bme280".to_string(),
            interval_secs: 5,
            temp_min: 18.0,
            temp_max: 28.0,
            humidity_min: 30.0,
            humidity_max: 70.0,
            pressure_min: 990.0,
            pressure_max: 1030.0,
        }
    }
}

/// Row limits applied to listing queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 1000,
        }
    }
}

impl QueryConfig {
    /// Resolve a caller-supplied limit into `1..=max_limit`
    pub fn clamp(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}
