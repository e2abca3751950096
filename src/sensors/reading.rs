// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Reading records and ingestion validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Opaque key-value metadata attached to a reading
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Longest accepted device identifier
pub const MAX_DEVICE_ID_LEN: usize = 100;

/// Accepted temperature range in °C (BME280 operating range)
pub const TEMPERATURE_RANGE: (f64, f64) = (-40.0, 85.0);

/// Accepted relative humidity range in %
pub const HUMIDITY_RANGE: (f64, f64) = (0.0, 100.0);

/// Accepted pressure range in hPa
pub const PRESSURE_RANGE: (f64, f64) = (300.0, 1100.0);

/// A stored sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: i64,
    pub sensor_type: String,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub metadata: Option<Metadata>,
    pub created_at: DateTime<Utc>,
}

impl Reading {
    /// The fields a processor reduces over
    pub fn sample(&self) -> ReadingSample {
        ReadingSample {
            device_id: self.device_id.clone(),
            timestamp: self.timestamp,
            temperature: self.temperature,
            humidity: self.humidity,
            pressure: self.pressure,
        }
    }
}

/// Measurement view of a reading handed to processors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingSample {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
}

impl ReadingSample {
    pub fn new(device_id: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            device_id: device_id.to_string(),
            timestamp,
            temperature: None,
            humidity: None,
            pressure: None,
        }
    }

    pub fn with_temperature(mut self, value: f64) -> Self {
        self.temperature = Some(value);
        self
    }

    pub fn with_humidity(mut self, value: f64) -> Self {
        self.humidity = Some(value);
        self
    }

    pub fn with_pressure(mut self, value: f64) -> Self {
        self.pressure = Some(value);
        self
    }
}

/// A reading as submitted for ingestion, before the store assigns an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReading {
    #[serde(default = "default_sensor_type")]
    pub sensor_type: String,
    pub device_id: String,
    /// Defaults to the insert time when absent
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

fn default_sensor_type() -> String {
    "bme280".to_string()
}

impl NewReading {
    pub fn new(sensor_type: &str, device_id: &str) -> Self {
        Self {
            sensor_type: sensor_type.to_string(),
            device_id: device_id.to_string(),
            timestamp: None,
            temperature: None,
            humidity: None,
            pressure: None,
            metadata: None,
        }
    }

    /// A full BME280 reading with all three channels
    pub fn bme280(device_id: &str, temperature: f64, humidity: f64, pressure: f64) -> Self {
        Self {
            temperature: Some(temperature),
            humidity: Some(humidity),
            pressure: Some(pressure),
            ..Self::new("bme280", device_id)
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Check identifiers and channel ranges before the reading is stored
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.sensor_type.trim().is_empty() {
            return Err(IngestError::Invalid {
                field: "sensor_type",
                reason: "must not be empty".to_string(),
            });
        }

        let len = self.device_id.chars().count();
        if len == 0 || len > MAX_DEVICE_ID_LEN {
            return Err(IngestError::Invalid {
                field: "device_id",
                reason: format!("length must be 1..={} characters, got {}", MAX_DEVICE_ID_LEN, len),
            });
        }

        check_channel("temperature", self.temperature, TEMPERATURE_RANGE)?;
        check_channel("humidity", self.humidity, HUMIDITY_RANGE)?;
        check_channel("pressure", self.pressure, PRESSURE_RANGE)?;

        Ok(())
    }
}

fn check_channel(field: &'static str, value: Option<f64>, (min, max): (f64, f64)) -> Result<(), IngestError> {
    let Some(v) = value else {
        return Ok(());
    };

    if !v.is_finite() {
        return Err(IngestError::Invalid {
            field,
            reason: "must be a finite number".to_string(),
        });
    }
    if v < min || v > max {
        return Err(IngestError::Invalid {
            field,
            reason: format!("{} is outside {}..={}", v, min, max),
        });
    }

    Ok(())
}
