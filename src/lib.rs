// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! SensorHub - Environmental Sensor Aggregation Service
//!
//! Turns raw BME280-style readings (temperature, humidity, pressure) into stored summaries:
//! - Pluggable processors (`average`, `rolling_average`) looked up by name
//! - An aggregation pipeline: fetch readings for a window, reduce, persist one result
//! - A recurring scheduler that re-aggregates a trailing window without overlapping runs
//! - SQLite storage for readings and results
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     SensorHub Engine                     │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────────────────┐   ┌─────────┐  │
//! │  │ Scheduler │ → │ Aggregation Pipeline │ ← │ run_job │  │
//! │  └───────────┘   └──────────────────────┘   └─────────┘  │
//! │                    ↓        ↓         ↓                  │
//! │             ┌──────────┐ ┌──────────┐ ┌──────────┐       │
//! │             │ Readings │ │ Registry │ │ Results  │       │
//! │             └──────────┘ └──────────┘ └──────────┘       │
//! │                    ↑                                     │
//! │             ┌────────────────────┐                       │
//! │             │ Ingest / Simulator │                       │
//! │             └────────────────────┘                       │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod processing;
pub mod sensors;

// Re-exports for convenience
pub use config::Config;
pub use core::{Engine, Scheduler, SchedulerStatus};
pub use db::{Database, ReadingFilter, ResultQuery};
pub use error::{AggregationError, IngestError, ProcessError, SchedulerError, StoreError};
pub use pipeline::{AggregationPipeline, AggregationResult, JobRequest};
pub use processing::{Processor, ProcessorInfo, ProcessorRegistry, TimeWindow};
pub use sensors::{NewReading, Reading};

/// SensorHub version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// SensorHub name
pub const NAME: &str = "SensorHub";
