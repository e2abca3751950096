// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Store interfaces consumed by the aggregation pipeline

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::pipeline::{AggregationResult, NewAggregationResult};
use crate::sensors::{NewReading, Reading};

/// Reading selection. Absent fields do not filter; time bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingFilter {
    pub sensor_type: Option<String>,
    pub device_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// `None` returns every match
    pub limit: Option<usize>,
}

impl ReadingFilter {
    pub fn sensor_type(mut self, sensor_type: &str) -> Self {
        self.sensor_type = Some(sensor_type.to_string());
        self
    }

    /// Restrict to one device; `None` or a blank id leaves every device in
    pub fn device(mut self, device_id: Option<&str>) -> Self {
        self.device_id = device_id.filter(|d| !d.trim().is_empty()).map(str::to_string);
        self
    }

    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Result selection, filters AND-ed together.
///
/// `start_time` keeps results whose window starts at or after it, `end_time` those whose
/// window ends at or before it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultQuery {
    pub processor: Option<String>,
    pub sensor_type: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Raw readings, written by ingestion and read by the pipeline
#[async_trait]
pub trait ReadingStore: Send + Sync {
    async fn insert(&self, reading: NewReading) -> Result<Reading, StoreError>;

    /// Matching readings, newest timestamp first
    async fn query(&self, filter: &ReadingFilter) -> Result<Vec<Reading>, StoreError>;
}

/// Aggregation results, written once per pipeline run
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn insert(&self, result: NewAggregationResult) -> Result<AggregationResult, StoreError>;

    /// Matching results, newest creation time first
    async fn query(&self, query: &ResultQuery) -> Result<Vec<AggregationResult>, StoreError>;
}
