// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Per-channel averaging shared by the built-in processors

use std::collections::BTreeSet;

use serde_json::Value;

use super::Payload;
use crate::error::ProcessError;
use crate::sensors::ReadingSample;

/// Round to two decimals, halves away from zero (`0.125 -> 0.13`)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, Default)]
struct Mean {
    sum: f64,
    n: usize,
}

impl Mean {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.n += 1;
    }

    fn value(&self) -> Option<f64> {
        (self.n > 0).then(|| round2(self.sum / self.n as f64))
    }
}

/// Independent channel averages, reading count and distinct devices
#[derive(Debug, Clone, Default)]
pub struct ChannelSummary {
    temperature: Mean,
    humidity: Mean,
    pressure: Mean,
    count: usize,
    devices: BTreeSet<String>,
}

impl ChannelSummary {
    /// Single pass over `readings`; a missing channel only affects its own average
    pub fn from_samples(readings: &[ReadingSample]) -> Result<Self, ProcessError> {
        let mut summary = Self::default();

        for reading in readings {
            for (field, value, mean) in [
                ("temperature", reading.temperature, &mut summary.temperature),
                ("humidity", reading.humidity, &mut summary.humidity),
                ("pressure", reading.pressure, &mut summary.pressure),
            ] {
                let Some(v) = value else { continue };
                if !v.is_finite() {
                    return Err(ProcessError::MalformedReading {
                        device_id: reading.device_id.clone(),
                        field,
                    });
                }
                mean.push(v);
            }

            summary.count += 1;
            summary.devices.insert(reading.device_id.clone());
        }

        Ok(summary)
    }

    pub fn avg_temperature(&self) -> Option<f64> {
        self.temperature.value()
    }

    pub fn avg_humidity(&self) -> Option<f64> {
        self.humidity.value()
    }

    pub fn avg_pressure(&self) -> Option<f64> {
        self.pressure.value()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn devices(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(String::as_str)
    }

    /// `{avg_temperature, avg_humidity, avg_pressure, count, devices}`
    pub fn into_payload(self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("avg_temperature".into(), optional(self.avg_temperature()));
        payload.insert("avg_humidity".into(), optional(self.avg_humidity()));
        payload.insert("avg_pressure".into(), optional(self.avg_pressure()));
        payload.insert("count".into(), Value::from(self.count));
        payload.insert(
            "devices".into(),
            Value::Array(self.devices.into_iter().map(Value::String).collect()),
        );
        payload
    }
}

fn optional(value: Option<f64>) -> Value {
    value.map_or(Value::Null, Value::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(dev: &str) -> ReadingSample {
        ReadingSample::new(dev, Utc::now())
    }

    #[test]
    fn test_round2_half_away_from_zero() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
        assert_eq!(round2(22.0), 22.0);
        assert_eq!(round2(1.0 / 3.0), 0.33);
    }

    #[test]
    fn test_channels_average_independently() {
        let readings = vec![
            sample("a").with_temperature(20.0).with_humidity(40.0),
            sample("a").with_temperature(21.0),
            sample("b").with_pressure(1000.0),
        ];

        let summary = ChannelSummary::from_samples(&readings).unwrap();
        assert_eq!(summary.avg_temperature(), Some(20.5));
        assert_eq!(summary.avg_humidity(), Some(40.0));
        assert_eq!(summary.avg_pressure(), Some(1000.0));
        assert_eq!(summary.count(), 3);
    }

    #[test]
    fn test_channel_absent_everywhere_is_none() {
        let readings = vec![sample("a").with_temperature(20.0), sample("b").with_temperature(22.0)];

        let summary = ChannelSummary::from_samples(&readings).unwrap();
        assert_eq!(summary.avg_humidity(), None);
        assert_eq!(summary.avg_pressure(), None);

        let payload = summary.into_payload();
        assert!(payload["avg_humidity"].is_null());
        assert_eq!(payload["avg_temperature"], 21.0);
    }

    #[test]
    fn test_devices_are_deduplicated() {
        let readings = vec![sample("b"), sample("a"), sample("b"), sample("a")];
        let summary = ChannelSummary::from_samples(&readings).unwrap();

        assert_eq!(summary.devices().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_non_finite_value_is_rejected() {
        let readings = vec![sample("a").with_temperature(20.0), sample("c").with_humidity(f64::INFINITY)];

        match ChannelSummary::from_samples(&readings) {
            Err(ProcessError::MalformedReading { device_id, field }) => {
                assert_eq!(device_id, "c");
                assert_eq!(field, "humidity");
            }
            other => panic!("expected malformed reading, got {:?}", other),
        }
    }
}
