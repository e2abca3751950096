//! Main engine - wires stores, pipeline, scheduler and simulator together

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::rolling::build_scheduler;
use super::scheduler::{Scheduler, SchedulerStatus, TriggerOutcome};
use crate::config::Config;
use crate::db::{Database, ReadingFilter, ReadingStore, ResultQuery};
use crate::error::{AggregationError, IngestError, SchedulerError, StoreError};
use crate::pipeline::{AggregationPipeline, AggregationResult, JobRequest};
use crate::processing::{ProcessorInfo, ProcessorRegistry};
use crate::sensors::{NewReading, Reading, ReadingSimulator};

struct SimulatorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Composition root: the operations the service exposes to its callers
pub struct Engine {
    pub config: Arc<Config>,
    database: Database,
    pipeline: AggregationPipeline,
    scheduler: Scheduler,
    simulator: Option<SimulatorHandle>,
    start_time: Option<Instant>,
}

impl Engine {
    /// Open the configured database and build the engine on it
    pub fn new(config: Config) -> Result<Self> {
        let database = Database::open(&config.database)?;
        Ok(Self::with_database(config, database))
    }

    pub fn with_database(config: Config, database: Database) -> Self {
        let config = Arc::new(config);
        let store = Arc::new(database.clone());
        let pipeline = AggregationPipeline::new(
            Arc::new(ProcessorRegistry::with_defaults()),
            store.clone(),
            store,
            config.query,
        );
        let scheduler = build_scheduler(&config.scheduler, pipeline.clone());

        Self {
            config,
            database,
            pipeline,
            scheduler,
            simulator: None,
            start_time: None,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        info!("Starting {} engine...", self.config.app_name);
        self.start_time = Some(Instant::now());

        let stats = self.database.stats().await?;
        info!(
            "Database holds {} readings and {} aggregation results",
            stats.reading_count, stats.result_count
        );

        self.scheduler.start().await;

        if self.config.demo_mode && self.simulator.is_none() {
            let (shutdown, rx) = watch::channel(false);
            let simulator = ReadingSimulator::new(self.config.simulator.clone());
            let store: Arc<dyn ReadingStore> = Arc::new(self.database.clone());
            let task = tokio::spawn(simulator.run(store, rx));
            self.simulator = Some(SimulatorHandle { shutdown, task });
        }

        info!("{} engine started", self.config.app_name);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        info!("Stopping {} engine...", self.config.app_name);

        if let Some(sim) = self.simulator.take() {
            let _ = sim.shutdown.send(true);
            if let Err(e) = sim.task.await {
                warn!("Simulator task ended abnormally: {}", e);
            }
        }

        self.scheduler.stop().await;

        info!("{} engine stopped", self.config.app_name);
        Ok(())
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }

    pub fn pipeline(&self) -> &AggregationPipeline {
        &self.pipeline
    }

    pub async fn run_job(&self, request: JobRequest) -> Result<AggregationResult, AggregationError> {
        self.pipeline.run(&request).await
    }

    pub fn list_processors(&self) -> Vec<ProcessorInfo> {
        self.pipeline.processors()
    }

    pub async fn query_results(&self, query: ResultQuery) -> Result<Vec<AggregationResult>, AggregationError> {
        self.pipeline.query(&query).await
    }

    pub async fn scheduler_status(&self) -> SchedulerStatus {
        self.scheduler.status().await
    }

    pub async fn trigger_job(&self, id: &str) -> Result<TriggerOutcome, SchedulerError> {
        self.scheduler.trigger(id).await
    }

    /// Validate and store one reading
    pub async fn ingest(&self, reading: NewReading) -> Result<Reading, IngestError> {
        reading.validate()?;
        Ok(ReadingStore::insert(&self.database, reading).await?)
    }

    /// Raw readings, newest first; an absent limit falls back to the configured default
    pub async fn query_readings(&self, filter: ReadingFilter) -> Result<Vec<Reading>, StoreError> {
        let filter = ReadingFilter {
            limit: Some(self.config.query.clamp(filter.limit)),
            ..filter
        };
        ReadingStore::query(&self.database, &filter).await
    }
}
