// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Error types for the storage, processing and scheduling layers

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failure inside a reading or result store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("storage task failed: {0}")]
    Task(String),
}

/// Failure while reducing readings
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("reading from device '{device_id}' has a non-finite {field} value")]
    MalformedReading { device_id: String, field: &'static str },
}

/// Failure of an aggregation run or result query
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("unknown processor: {0}")]
    UnknownProcessor(String),

    #[error("invalid time range: start {start} is after end {end}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("processing failed: {0}")]
    Strategy(#[from] ProcessError),
}

impl AggregationError {
    /// Whether the caller supplied bad input, as opposed to a server-side fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnknownProcessor(_) | Self::InvalidRange { .. })
    }
}

/// Failure while ingesting a reading
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

/// Failure of a scheduler control call
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("scheduler is not running")]
    NotRunning,

    #[error("no scheduled job with id '{0}'")]
    UnknownJob(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        let now = Utc::now();

        assert!(AggregationError::UnknownProcessor("median".into()).is_client_error());
        assert!(AggregationError::InvalidRange { start: now, end: now }.is_client_error());
        assert!(!AggregationError::Store(StoreError::Corrupt("bad timestamp".into())).is_client_error());
        assert!(!AggregationError::Strategy(ProcessError::MalformedReading {
            device_id: "a".into(),
            field: "humidity",
        })
        .is_client_error());
    }
}
