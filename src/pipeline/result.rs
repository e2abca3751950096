// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Aggregation result records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::processing::Payload;

/// A persisted aggregation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub id: i64,
    pub processor_name: String,
    pub processor_version: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub sensor_type: String,
    /// `None` means all devices
    pub device_id: Option<String>,
    pub result: Payload,
    /// Number of readings the run reduced
    pub raw_count: u64,
    pub created_at: DateTime<Utc>,
}

/// An aggregation result before the store assigns id and creation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAggregationResult {
    pub processor_name: String,
    pub processor_version: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub sensor_type: String,
    pub device_id: Option<String>,
    pub result: Payload,
    pub raw_count: u64,
}

impl NewAggregationResult {
    pub fn stored(self, id: i64, created_at: DateTime<Utc>) -> AggregationResult {
        AggregationResult {
            id,
            processor_name: self.processor_name,
            processor_version: self.processor_version,
            start_time: self.start_time,
            end_time: self.end_time,
            sensor_type: self.sensor_type,
            device_id: self.device_id,
            result: self.result,
            raw_count: self.raw_count,
            created_at,
        }
    }
}
