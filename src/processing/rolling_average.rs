// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Rolling average - the average plus a description of the window it covers

use serde_json::Value;

use super::{ChannelSummary, Payload, Processor, TimeWindow};
use crate::error::ProcessError;
use crate::sensors::ReadingSample;

/// Average over a trailing window, annotated with the window bounds
#[derive(Debug, Clone, Copy, Default)]
pub struct RollingAverageProcessor;

impl Processor for RollingAverageProcessor {
    fn name(&self) -> &'static str {
        "rolling_average"
    }

    fn version(&self) -> &'static str {
        "1.0.0"
    }

    fn description(&self) -> &'static str {
        "Calculate rolling average of sensor readings over a time window"
    }

    fn process(
        &self,
        readings: &[ReadingSample],
        window: &TimeWindow,
        _sensor_type: &str,
        _device_id: Option<&str>,
    ) -> Result<Payload, ProcessError> {
        let mut payload = ChannelSummary::from_samples(readings)?.into_payload();
        payload.insert("window_start".into(), Value::String(window.start_iso()));
        payload.insert("window_end".into(), Value::String(window.end_iso()));
        payload.insert(
            "window_duration_minutes".into(),
            Value::from(window.duration_minutes()),
        );
        Ok(payload)
    }
}
