// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Aggregation pipeline - fetch, reduce, persist

mod result;

pub use result::{AggregationResult, NewAggregationResult};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::QueryConfig;
use crate::db::{ReadingFilter, ReadingStore, ResultQuery, ResultStore};
use crate::error::AggregationError;
use crate::processing::{ProcessorInfo, ProcessorRegistry, TimeWindow};
use crate::sensors::ReadingSample;

/// One aggregation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub processor: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default = "default_sensor_type")]
    pub sensor_type: String,
    /// `None` (or a blank id) aggregates every device
    #[serde(default)]
    pub device_id: Option<String>,
}

fn default_sensor_type() -> String {
    "bme280".to_string()
}

impl JobRequest {
    pub fn new(processor: &str, start_time: DateTime<Utc>, end_time: DateTime<Utc>, sensor_type: &str) -> Self {
        Self {
            processor: processor.to_string(),
            start_time,
            end_time,
            sensor_type: sensor_type.to_string(),
            device_id: None,
        }
    }

    pub fn for_device(mut self, device_id: &str) -> Self {
        self.device_id = Some(device_id.to_string());
        self
    }

    /// Device filter in effect; blank ids mean every device
    pub fn device(&self) -> Option<&str> {
        self.device_id.as_deref().filter(|d| !d.trim().is_empty())
    }
}

/// Stateless fetch → reduce → persist over shared stores.
///
/// Cloning is cheap; concurrent runs share nothing but the stores.
#[derive(Clone)]
pub struct AggregationPipeline {
    registry: Arc<ProcessorRegistry>,
    readings: Arc<dyn ReadingStore>,
    results: Arc<dyn ResultStore>,
    limits: QueryConfig,
}

impl AggregationPipeline {
    pub fn new(
        registry: Arc<ProcessorRegistry>,
        readings: Arc<dyn ReadingStore>,
        results: Arc<dyn ResultStore>,
        limits: QueryConfig,
    ) -> Self {
        Self {
            registry,
            readings,
            results,
            limits,
        }
    }

    /// Aggregate one window and persist exactly one result.
    ///
    /// Nothing is written unless the reduction succeeds.
    pub async fn run(&self, request: &JobRequest) -> Result<AggregationResult, AggregationError> {
        let window = TimeWindow::new(request.start_time, request.end_time).ok_or(
            AggregationError::InvalidRange {
                start: request.start_time,
                end: request.end_time,
            },
        )?;
        let processor = self.registry.get(&request.processor)?;
        let device_id = request.device();

        let filter = ReadingFilter::default()
            .sensor_type(&request.sensor_type)
            .device(device_id)
            .between(window.start(), window.end());
        let readings = self.readings.query(&filter).await?;
        debug!(
            "Fetched {} '{}' readings for {} [{} .. {}]",
            readings.len(),
            request.sensor_type,
            processor.name(),
            window.start(),
            window.end()
        );

        let samples: Vec<ReadingSample> = readings.iter().map(|r| r.sample()).collect();
        let payload = processor.process(
            &samples,
            &window,
            &request.sensor_type,
            device_id,
        )?;

        let stored = self
            .results
            .insert(NewAggregationResult {
                processor_name: processor.name().to_string(),
                processor_version: processor.version().to_string(),
                start_time: window.start(),
                end_time: window.end(),
                sensor_type: request.sensor_type.clone(),
                device_id: device_id.map(str::to_string),
                result: payload,
                raw_count: samples.len() as u64,
            })
            .await?;

        info!(
            "{} over {} .. {} reduced {} readings (result {})",
            stored.processor_name, stored.start_time, stored.end_time, stored.raw_count, stored.id
        );
        Ok(stored)
    }

    /// Stored results, newest first, with the limit clamped to the configured bounds
    pub async fn query(&self, query: &ResultQuery) -> Result<Vec<AggregationResult>, AggregationError> {
        let query = ResultQuery {
            limit: Some(self.limits.clamp(query.limit)),
            ..query.clone()
        };
        Ok(self.results.query(&query).await?)
    }

    pub fn processors(&self) -> Vec<ProcessorInfo> {
        self.registry.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::sensors::NewReading;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 14, 0, 0, 0).unwrap()
    }

    fn pipeline(db: &Database) -> AggregationPipeline {
        let db = Arc::new(db.clone());
        AggregationPipeline::new(
            Arc::new(ProcessorRegistry::with_defaults()),
            db.clone(),
            db,
            QueryConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_device_filter_narrows_readings() {
        let db = Database::open_in_memory().unwrap();
        for (dev, temp) in [("A", 20.0), ("A", 22.0), ("B", 30.0)] {
            let reading = NewReading::bme280(dev, temp, 50.0, 1000.0).at(t0() + Duration::minutes(5));
            ReadingStore::insert(&db, reading).await.unwrap();
        }

        let request = JobRequest::new("average", t0(), t0() + Duration::hours(1), "bme280").for_device("A");
        let result = pipeline(&db).run(&request).await.unwrap();

        assert_eq!(result.raw_count, 2);
        assert_eq!(result.device_id.as_deref(), Some("A"));
        assert_eq!(result.result["avg_temperature"], 21.0);
        assert_eq!(result.result["devices"], serde_json::json!(["A"]));
    }

    #[tokio::test]
    async fn test_blank_device_means_all_devices() {
        let db = Database::open_in_memory().unwrap();
        for (dev, temp) in [("A", 20.0), ("B", 30.0)] {
            let reading = NewReading::bme280(dev, temp, 50.0, 1000.0).at(t0() + Duration::minutes(5));
            ReadingStore::insert(&db, reading).await.unwrap();
        }

        for blank in ["", "   "] {
            let request = JobRequest::new("average", t0(), t0() + Duration::hours(1), "bme280").for_device(blank);
            let result = pipeline(&db).run(&request).await.unwrap();

            assert_eq!(result.raw_count, 2);
            assert_eq!(result.device_id, None);
            assert_eq!(result.result["devices"], serde_json::json!(["A", "B"]));
        }
    }

    #[tokio::test]
    async fn test_query_clamps_limit() {
        let db = Database::open_in_memory().unwrap();
        let pipeline = pipeline(&db);
        let request = JobRequest::new("average", t0(), t0() + Duration::hours(1), "bme280");
        for _ in 0..3 {
            pipeline.run(&request).await.unwrap();
        }

        let zero = pipeline
            .query(&ResultQuery { limit: Some(0), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(zero.len(), 1);

        let all = pipeline.query(&ResultQuery::default()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_job_request_deserialize_defaults() {
        let request: JobRequest = serde_json::from_str(
            r#"{"processor": "average", "start_time": "2025-11-14T00:00:00Z", "end_time": "2025-11-14T23:59:59Z"}"#,
        )
        .unwrap();

        assert_eq!(request.sensor_type, "bme280");
        assert_eq!(request.device_id, None);
        assert_eq!(request.start_time, t0());
    }
}
