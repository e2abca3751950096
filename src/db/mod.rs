// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Database module for persistent storage

mod store;

pub use store::{ReadingFilter, ReadingStore, ResultQuery, ResultStore};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::pipeline::{AggregationResult, NewAggregationResult};
use crate::sensors::{Metadata, NewReading, Reading};

const DEFAULT_RESULT_LIMIT: usize = 100;

/// SQLite-backed reading and result store.
///
/// One connection behind a mutex; WAL journaling lets other processes read while a write is
/// in flight. Every call runs on the blocking pool and is its own transaction.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database
    pub fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&config.path)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        "#,
        )?;

        let db = Self::from_connection(conn)?;
        info!("Database opened at {:?}", config.path);
        Ok(db)
    }

    /// Private in-memory database, used by tests and one-shot tooling
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        create_tables(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Row counts per table
    pub async fn stats(&self) -> Result<DatabaseStats, StoreError> {
        self.blocking(|conn| {
            let reading_count: i64 = conn.query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?;
            let result_count: i64 =
                conn.query_row("SELECT COUNT(*) FROM aggregation_results", [], |row| row.get(0))?;

            Ok(DatabaseStats {
                reading_count: reading_count.max(0) as u64,
                result_count: result_count.max(0) as u64,
            })
        })
        .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    pub reading_count: u64,
    pub result_count: u64,
}

fn create_tables(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        -- Raw sensor readings
        CREATE TABLE IF NOT EXISTS readings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sensor_type TEXT NOT NULL,
            device_id TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            temperature REAL,
            humidity REAL,
            pressure REAL,
            metadata TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_readings_sensor_device ON readings(sensor_type, device_id);
        CREATE INDEX IF NOT EXISTS idx_readings_timestamp ON readings(timestamp);

        -- Aggregation results
        CREATE TABLE IF NOT EXISTS aggregation_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            processor_name TEXT NOT NULL,
            processor_version TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            sensor_type TEXT NOT NULL,
            device_id TEXT,
            result TEXT NOT NULL,
            raw_count INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_results_processor_time ON aggregation_results(processor_name, start_time, end_time);
        CREATE INDEX IF NOT EXISTS idx_results_time_range ON aggregation_results(start_time, end_time);
        CREATE INDEX IF NOT EXISTS idx_results_created ON aggregation_results(created_at);
    "#,
    )?;

    Ok(())
}

/// Timestamps are stored as fixed-width UTC text so they compare lexicographically
fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp '{}': {}", text, e)))
}

/// Collects `column op ?` clauses and their bound values
#[derive(Default)]
struct Conditions {
    clauses: Vec<&'static str>,
    values: Vec<Value>,
}

impl Conditions {
    fn text(&mut self, clause: &'static str, value: Option<&String>) {
        if let Some(v) = value {
            self.clauses.push(clause);
            self.values.push(Value::Text(v.clone()));
        }
    }

    fn time(&mut self, clause: &'static str, value: Option<DateTime<Utc>>) {
        if let Some(ts) = value {
            self.clauses.push(clause);
            self.values.push(Value::Text(encode_ts(ts.trunc_subsecs(6))));
        }
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

struct ReadingRow {
    id: i64,
    sensor_type: String,
    device_id: String,
    timestamp: String,
    temperature: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
    metadata: Option<String>,
    created_at: String,
}

impl ReadingRow {
    const COLUMNS: &'static str =
        "id, sensor_type, device_id, timestamp, temperature, humidity, pressure, metadata, created_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            sensor_type: row.get(1)?,
            device_id: row.get(2)?,
            timestamp: row.get(3)?,
            temperature: row.get(4)?,
            humidity: row.get(5)?,
            pressure: row.get(6)?,
            metadata: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn into_reading(self) -> Result<Reading, StoreError> {
        let metadata = self
            .metadata
            .as_deref()
            .map(serde_json::from_str::<Metadata>)
            .transpose()?;

        Ok(Reading {
            id: self.id,
            sensor_type: self.sensor_type,
            device_id: self.device_id,
            timestamp: decode_ts(&self.timestamp)?,
            temperature: self.temperature,
            humidity: self.humidity,
            pressure: self.pressure,
            metadata,
            created_at: decode_ts(&self.created_at)?,
        })
    }
}

struct ResultRow {
    id: i64,
    processor_name: String,
    processor_version: String,
    start_time: String,
    end_time: String,
    sensor_type: String,
    device_id: Option<String>,
    result: String,
    raw_count: i64,
    created_at: String,
}

impl ResultRow {
    const COLUMNS: &'static str = "id, processor_name, processor_version, start_time, end_time, \
         sensor_type, device_id, result, raw_count, created_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            processor_name: row.get(1)?,
            processor_version: row.get(2)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            sensor_type: row.get(5)?,
            device_id: row.get(6)?,
            result: row.get(7)?,
            raw_count: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn into_result(self) -> Result<AggregationResult, StoreError> {
        let raw_count = u64::try_from(self.raw_count)
            .map_err(|_| StoreError::Corrupt(format!("negative raw_count on result {}", self.id)))?;

        Ok(AggregationResult {
            id: self.id,
            processor_name: self.processor_name,
            processor_version: self.processor_version,
            start_time: decode_ts(&self.start_time)?,
            end_time: decode_ts(&self.end_time)?,
            sensor_type: self.sensor_type,
            device_id: self.device_id,
            result: serde_json::from_str(&self.result)?,
            raw_count,
            created_at: decode_ts(&self.created_at)?,
        })
    }
}

fn insert_reading(conn: &Connection, reading: NewReading) -> Result<Reading, StoreError> {
    let created_at = Utc::now().trunc_subsecs(6);
    let timestamp = reading.timestamp.unwrap_or(created_at).trunc_subsecs(6);
    let metadata = reading.metadata.as_ref().map(serde_json::to_string).transpose()?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO readings (sensor_type, device_id, timestamp, temperature, humidity, pressure, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            reading.sensor_type,
            reading.device_id,
            encode_ts(timestamp),
            reading.temperature,
            reading.humidity,
            reading.pressure,
            metadata,
            encode_ts(created_at),
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    Ok(Reading {
        id,
        sensor_type: reading.sensor_type,
        device_id: reading.device_id,
        timestamp,
        temperature: reading.temperature,
        humidity: reading.humidity,
        pressure: reading.pressure,
        metadata: reading.metadata,
        created_at,
    })
}

fn select_readings(conn: &Connection, filter: &ReadingFilter) -> Result<Vec<Reading>, StoreError> {
    let mut cond = Conditions::default();
    cond.text("sensor_type = ?", filter.sensor_type.as_ref());
    cond.text("device_id = ?", filter.device_id.as_ref());
    cond.time("timestamp >= ?", filter.start_time);
    cond.time("timestamp <= ?", filter.end_time);

    let sql = format!(
        "SELECT {} FROM readings{} ORDER BY timestamp DESC, id DESC LIMIT ?",
        ReadingRow::COLUMNS,
        cond.where_sql()
    );

    let mut values = cond.values;
    // SQLite treats a negative LIMIT as unbounded
    values.push(Value::Integer(filter.limit.map_or(-1, |l| l as i64)));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), ReadingRow::from_row)?;
    let readings = rows
        .map(|row| row?.into_reading())
        .collect::<Result<Vec<_>, StoreError>>();
    readings
}

fn insert_result(conn: &Connection, result: NewAggregationResult) -> Result<AggregationResult, StoreError> {
    let created_at = Utc::now().trunc_subsecs(6);
    let payload = serde_json::to_string(&result.result)?;
    let raw_count = i64::try_from(result.raw_count)
        .map_err(|_| StoreError::Corrupt(format!("raw_count {} overflows", result.raw_count)))?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO aggregation_results
            (processor_name, processor_version, start_time, end_time, sensor_type, device_id, result, raw_count, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            result.processor_name,
            result.processor_version,
            encode_ts(result.start_time.trunc_subsecs(6)),
            encode_ts(result.end_time.trunc_subsecs(6)),
            result.sensor_type,
            result.device_id,
            payload,
            raw_count,
            encode_ts(created_at),
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    debug!("Stored aggregation result {} ({})", id, result.processor_name);
    Ok(result.stored(id, created_at))
}

fn select_results(conn: &Connection, query: &ResultQuery) -> Result<Vec<AggregationResult>, StoreError> {
    let mut cond = Conditions::default();
    cond.text("processor_name = ?", query.processor.as_ref());
    cond.text("sensor_type = ?", query.sensor_type.as_ref());
    cond.time("start_time >= ?", query.start_time);
    cond.time("end_time <= ?", query.end_time);

    let sql = format!(
        "SELECT {} FROM aggregation_results{} ORDER BY created_at DESC, id DESC LIMIT ?",
        ResultRow::COLUMNS,
        cond.where_sql()
    );

    let mut values = cond.values;
    values.push(Value::Integer(query.limit.unwrap_or(DEFAULT_RESULT_LIMIT) as i64));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), ResultRow::from_row)?;
    let results = rows
        .map(|row| row?.into_result())
        .collect::<Result<Vec<_>, StoreError>>();
    results
}

#[async_trait]
impl ReadingStore for Database {
    async fn insert(&self, reading: NewReading) -> Result<Reading, StoreError> {
        self.blocking(move |conn| insert_reading(conn, reading)).await
    }

    async fn query(&self, filter: &ReadingFilter) -> Result<Vec<Reading>, StoreError> {
        let filter = filter.clone();
        self.blocking(move |conn| select_readings(conn, &filter)).await
    }
}

#[async_trait]
impl ResultStore for Database {
    async fn insert(&self, result: NewAggregationResult) -> Result<AggregationResult, StoreError> {
        self.blocking(move |conn| insert_result(conn, result)).await
    }

    async fn query(&self, query: &ResultQuery) -> Result<Vec<AggregationResult>, StoreError> {
        let query = query.clone();
        self.blocking(move |conn| select_results(conn, &query)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::Payload;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 14, 10, 0, 0).unwrap()
    }

    async fn seed(db: &Database) {
        let rows = [
            ("dev-a", 0, 20.0),
            ("dev-a", 10, 21.0),
            ("dev-b", 20, 22.0),
            ("dev-a", 30, 23.0),
        ];
        for (dev, minutes, temp) in rows {
            let reading = NewReading::bme280(dev, temp, 50.0, 1000.0).at(t0() + Duration::minutes(minutes));
            ReadingStore::insert(db, reading).await.unwrap();
        }

        let mut other = NewReading::new("dht22", "dev-c").at(t0() + Duration::minutes(15));
        other.humidity = Some(60.0);
        ReadingStore::insert(db, other).await.unwrap();
    }

    fn result(processor: &str, start_min: i64, end_min: i64) -> NewAggregationResult {
        NewAggregationResult {
            processor_name: processor.to_string(),
            processor_version: "1.0.0".to_string(),
            start_time: t0() + Duration::minutes(start_min),
            end_time: t0() + Duration::minutes(end_min),
            sensor_type: "bme280".to_string(),
            device_id: None,
            result: Payload::new(),
            raw_count: 0,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_and_keeps_fields() {
        let db = Database::open_in_memory().unwrap();

        let mut metadata = serde_json::Map::new();
        metadata.insert("location".into(), "office".into());
        let reading = NewReading::bme280("bme280_001", 23.45, 45.67, 1013.25)
            .at(t0())
            .with_metadata(metadata);

        let stored = ReadingStore::insert(&db, reading).await.unwrap();
        assert!(stored.id > 0);

        let fetched = ReadingStore::query(&db, &ReadingFilter::default()).await.unwrap();
        assert_eq!(fetched, vec![stored]);
        assert_eq!(fetched[0].metadata.as_ref().unwrap()["location"], "office");
    }

    #[tokio::test]
    async fn test_reading_query_bounds_are_inclusive() {
        let db = Database::open_in_memory().unwrap();
        seed(&db).await;

        let filter = ReadingFilter::default()
            .sensor_type("bme280")
            .between(t0() + Duration::minutes(10), t0() + Duration::minutes(30));
        let readings = ReadingStore::query(&db, &filter).await.unwrap();

        let temps: Vec<f64> = readings.iter().filter_map(|r| r.temperature).collect();
        assert_eq!(temps, vec![23.0, 22.0, 21.0]);
    }

    #[tokio::test]
    async fn test_reading_query_filters_device_and_limit() {
        let db = Database::open_in_memory().unwrap();
        seed(&db).await;

        let filter = ReadingFilter::default().sensor_type("bme280").device(Some("dev-a")).limit(2);
        let readings = ReadingStore::query(&db, &filter).await.unwrap();

        assert_eq!(readings.len(), 2);
        assert!(readings.iter().all(|r| r.device_id == "dev-a"));
        assert!(readings[0].timestamp > readings[1].timestamp);
    }

    #[tokio::test]
    async fn test_result_query_orders_newest_first_and_filters() {
        let db = Database::open_in_memory().unwrap();

        let first = ResultStore::insert(&db, result("average", 0, 60)).await.unwrap();
        let second = ResultStore::insert(&db, result("rolling_average", 0, 60)).await.unwrap();
        let third = ResultStore::insert(&db, result("average", 30, 90)).await.unwrap();

        let all = ResultStore::query(&db, &ResultQuery::default()).await.unwrap();
        let ids: Vec<i64> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);

        let averages = ResultStore::query(
            &db,
            &ResultQuery {
                processor: Some("average".into()),
                end_time: Some(t0() + Duration::minutes(60)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(averages.len(), 1);
        assert_eq!(averages[0].id, first.id);

        let limited = ResultStore::query(&db, &ResultQuery { limit: Some(1), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_stats_count_rows() {
        let db = Database::open_in_memory().unwrap();
        seed(&db).await;
        ResultStore::insert(&db, result("average", 0, 60)).await.unwrap();

        let stats = db.stats().await.unwrap();
        assert_eq!(stats.reading_count, 5);
        assert_eq!(stats.result_count, 1);
    }
}
