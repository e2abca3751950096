// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Plain average over a window

use super::{ChannelSummary, Payload, Processor, TimeWindow};
use crate::error::ProcessError;
use crate::sensors::ReadingSample;

/// Average temperature, humidity and pressure over the selected readings
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageProcessor;

impl Processor for AverageProcessor {
    fn name(&self) -> &'static str {
        "average"
    }

    fn version(&self) -> &'static str {
        "1.0.0"
    }

    fn description(&self) -> &'static str {
        "Calculate average of sensor readings"
    }

    fn process(
        &self,
        readings: &[ReadingSample],
        _window: &TimeWindow,
        _sensor_type: &str,
        _device_id: Option<&str>,
    ) -> Result<Payload, ProcessError> {
        Ok(ChannelSummary::from_samples(readings)?.into_payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn reading(dev: &str, t: f64, h: f64, p: f64) -> ReadingSample {
        ReadingSample::new(dev, Utc::now())
            .with_temperature(t)
            .with_humidity(h)
            .with_pressure(p)
    }

    #[test]
    fn test_average_with_data() {
        let readings = vec![
            reading("A", 20.0, 50.0, 1000.0),
            reading("A", 22.0, 52.0, 1002.0),
            reading("B", 24.0, 54.0, 1004.0),
        ];

        let payload = AverageProcessor.process(&readings, &window(), "bme280", None).unwrap();

        assert_eq!(
            serde_json::Value::Object(payload),
            json!({
                "avg_temperature": 22.0,
                "avg_humidity": 52.0,
                "avg_pressure": 1002.0,
                "count": 3,
                "devices": ["A", "B"],
            })
        );
    }

    #[test]
    fn test_average_empty() {
        let payload = AverageProcessor.process(&[], &window(), "bme280", None).unwrap();

        assert_eq!(payload["count"], 0);
        assert!(payload["avg_temperature"].is_null());
        assert!(payload["avg_humidity"].is_null());
        assert!(payload["avg_pressure"].is_null());
        assert_eq!(payload["devices"], json!([]));
        assert!(!payload.contains_key("window_start"));
    }

    #[test]
    fn test_average_rounds_to_two_decimals() {
        let readings = vec![
            ReadingSample::new("A", Utc::now()).with_temperature(20.0),
            ReadingSample::new("A", Utc::now()).with_temperature(20.0),
            ReadingSample::new("A", Utc::now()).with_temperature(21.0),
        ];

        let payload = AverageProcessor.process(&readings, &window(), "bme280", Some("A")).unwrap();
        assert_eq!(payload["avg_temperature"], 20.33);
    }
}
