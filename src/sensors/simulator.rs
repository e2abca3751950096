// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Simulated BME280 producer for demo mode

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::NewReading;
use crate::config::SimulatorConfig;
use crate::db::ReadingStore;

/// Generates plausible BME280 readings inside the configured ranges
pub struct ReadingSimulator {
    config: SimulatorConfig,
    rng: StdRng,
    sequence: u64,
}

impl ReadingSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
            sequence: 0,
        }
    }

    /// Deterministic simulator for tests
    pub fn with_seed(config: SimulatorConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            sequence: 0,
        }
    }

    pub fn next_reading(&mut self) -> NewReading {
        self.sequence += 1;

        let cfg = &self.config;
        let temperature = sample(&mut self.rng, cfg.temp_min, cfg.temp_max);
        let humidity = sample(&mut self.rng, cfg.humidity_min, cfg.humidity_max);
        let pressure = sample(&mut self.rng, cfg.pressure_min, cfg.pressure_max);

        let mut metadata = serde_json::Map::new();
        metadata.insert("source".into(), "simulator".into());
        metadata.insert("sequence".into(), self.sequence.into());

        NewReading {
            sensor_type: cfg.sensor_type.clone(),
            device_id: cfg.device_id.clone(),
            timestamp: None,
            temperature: Some(temperature),
            humidity: Some(humidity),
            pressure: Some(pressure),
            metadata: Some(metadata),
        }
    }

    /// Insert a reading every `interval_secs` until shutdown flips to true
    pub async fn run(mut self, store: Arc<dyn ReadingStore>, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Simulator producing '{}' readings for {} every {}s",
            self.config.sensor_type, self.config.device_id, self.config.interval_secs
        );

        let mut ticker = interval(Duration::from_secs(self.config.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let reading = self.next_reading();
                    match store.insert(reading).await {
                        Ok(stored) => debug!("Simulated reading #{} stored as {}", self.sequence, stored.id),
                        Err(e) => warn!("Failed to store simulated reading: {}", e),
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        info!("Simulator stopped after {} readings", self.sequence);
    }
}

fn sample(rng: &mut StdRng, min: f64, max: f64) -> f64 {
    if max <= min {
        return min;
    }
    let value = rng.gen_range(min..=max);
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readings_stay_in_range_and_validate() {
        let config = SimulatorConfig::default();
        let mut sim = ReadingSimulator::with_seed(config.clone(), 7);

        for _ in 0..200 {
            let reading = sim.next_reading();
            assert!(reading.validate().is_ok());

            let t = reading.temperature.unwrap();
            let h = reading.humidity.unwrap();
            let p = reading.pressure.unwrap();
            assert!(t >= config.temp_min && t <= config.temp_max);
            assert!(h >= config.humidity_min && h <= config.humidity_max);
            assert!(p >= config.pressure_min && p <= config.pressure_max);
        }
    }

    #[test]
    fn test_sequence_is_recorded_in_metadata() {
        let mut sim = ReadingSimulator::with_seed(SimulatorConfig::default(), 1);
        sim.next_reading();
        let second = sim.next_reading();

        assert_eq!(second.metadata.unwrap()["sequence"], 2);
    }

    #[test]
    fn test_degenerate_range_is_constant() {
        let mut config = SimulatorConfig::default();
        config.temp_min = 21.0;
        config.temp_max = 21.0;
        let mut sim = ReadingSimulator::with_seed(config, 3);

        assert_eq!(sim.next_reading().temperature, Some(21.0));
    }
}
