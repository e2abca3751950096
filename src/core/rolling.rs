// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Recurring trailing-window rolling average

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use super::scheduler::{Job, Scheduler};
use crate::config::{SchedulerConfig, MAX_INTERVAL_MINUTES, MAX_WINDOW_HOURS};
use crate::pipeline::{AggregationPipeline, JobRequest};
use crate::processing::TimeWindow;

pub const ROLLING_AVERAGE_JOB_ID: &str = "rolling_average";

/// Re-aggregates the trailing `window_hours` of one sensor type on every fire
pub struct RollingAverageJob {
    pipeline: AggregationPipeline,
    sensor_type: String,
    window_hours: u64,
}

impl RollingAverageJob {
    pub fn new(pipeline: AggregationPipeline, config: &SchedulerConfig) -> Self {
        Self {
            pipeline,
            sensor_type: config.rolling_average_sensor_type.clone(),
            window_hours: config.rolling_average_window_hours,
        }
    }

    pub fn name(&self) -> String {
        format!("Calculate {}-hour rolling average", self.window_hours)
    }

    /// Window ending now and reaching `window_hours` back
    pub fn window(&self) -> TimeWindow {
        let hours = self.window_hours.min(MAX_WINDOW_HOURS) as i64;
        TimeWindow::trailing(Utc::now(), chrono::Duration::hours(hours))
    }
}

#[async_trait]
impl Job for RollingAverageJob {
    async fn run(&self) -> anyhow::Result<()> {
        let window = self.window();
        info!(
            "Running rolling average calculation for {}-hour window: {} to {}",
            self.window_hours,
            window.start(),
            window.end()
        );

        let request = JobRequest::new("rolling_average", window.start(), window.end(), &self.sensor_type);
        let result = self.pipeline.run(&request).await?;

        info!(
            "Rolling average calculation completed. Processed {} readings. Result ID: {}",
            result.raw_count, result.id
        );
        Ok(())
    }
}

/// Scheduler carrying the built-in rolling-average job, gated by `enable_scheduler`
pub fn build_scheduler(config: &SchedulerConfig, pipeline: AggregationPipeline) -> Scheduler {
    let scheduler = Scheduler::new(config.enable_scheduler);
    let job = RollingAverageJob::new(pipeline, config);
    // Unvalidated configs are capped so the timer deadline stays representable
    let minutes = config.rolling_average_interval_minutes.clamp(1, MAX_INTERVAL_MINUTES);
    let every = Duration::from_secs(minutes * 60);

    info!(
        "Rolling average task will run every {} minute(s) with a {}-hour window",
        minutes, config.rolling_average_window_hours
    );
    scheduler.add_job(ROLLING_AVERAGE_JOB_ID, &job.name(), every, Arc::new(job));
    scheduler
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryConfig;
    use crate::db::{Database, ReadingStore, ResultQuery};
    use crate::processing::ProcessorRegistry;
    use crate::sensors::NewReading;

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
    async fn test_run_aggregates_trailing_window() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        for (minutes_ago, temp) in [(10, 20.0), (50, 22.0), (120, 40.0)] {
            let reading = NewReading::bme280("dev-1", temp, 50.0, 1000.0).at(now - chrono::Duration::minutes(minutes_ago));
            ReadingStore::insert(&db, reading).await.unwrap();
        }

        let job = RollingAverageJob::new(pipeline(&db), &SchedulerConfig::default());
        job.run().await.unwrap();

        let results = pipeline(&db).query(&ResultQuery::default()).await.unwrap();
        assert_eq!(results.len(), 1);

        let result = &results[0];
        assert_eq!(result.processor_name, "rolling_average");
        assert_eq!(result.device_id, None);
        assert_eq!(result.raw_count, 2);
        assert_eq!(result.result["avg_temperature"], 21.0);
        assert_eq!(result.result["window_duration_minutes"], 60);
    }

    #[tokio::test]
    async fn test_oversized_interval_is_capped() {
        let db = Database::open_in_memory().unwrap();
        let mut config = SchedulerConfig::default();
        config.rolling_average_interval_minutes = u64::MAX;

        let scheduler = build_scheduler(&config, pipeline(&db));
        scheduler.start().await;

        let status = scheduler.status().await;
        assert_eq!(status.jobs[0].trigger, "interval[8760:00:00]");
        scheduler.stop().await;
    }

    #[test]
    fn test_job_name_mentions_window() {
        let db = Database::open_in_memory().unwrap();
        let mut config = SchedulerConfig::default();
        config.rolling_average_window_hours = 6;

        let job = RollingAverageJob::new(pipeline(&db), &config);
        assert_eq!(job.name(), "Calculate 6-hour rolling average");
        assert_eq!(job.window().duration_minutes(), 360);
    }
}
