// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Interval scheduler with overlap prevention and graceful drain

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::SchedulerError;

/// Work the scheduler fires on every tick
#[async_trait]
pub trait Job: Send + Sync + 'static {
    async fn run(&self) -> anyhow::Result<()>;
}

/// What happened to a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerOutcome {
    Started,
    /// The previous run was still in progress
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub id: String,
    pub name: String,
    pub next_run_time: Option<DateTime<Utc>>,
    pub trigger: String,
    pub in_progress: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub jobs: Vec<JobStatus>,
}

struct JobSlot {
    id: String,
    name: String,
    every: Duration,
    job: Arc<dyn Job>,
    in_progress: AtomicBool,
    next_run: RwLock<Option<DateTime<Utc>>>,
}

impl JobSlot {
    fn status(&self) -> JobStatus {
        JobStatus {
            id: self.id.clone(),
            name: self.name.clone(),
            next_run_time: *self.next_run.read(),
            trigger: describe_interval(self.every),
            in_progress: self.in_progress.load(Ordering::Acquire),
        }
    }

    fn schedule_next(&self) {
        let next = chrono::Duration::from_std(self.every)
            .ok()
            .and_then(|every| Utc::now().checked_add_signed(every));
        *self.next_run.write() = next;
    }
}

/// Holds a job's run-in-progress flag; clears it on drop, panics included
struct RunGuard {
    slot: Arc<JobSlot>,
}

impl RunGuard {
    fn acquire(slot: &Arc<JobSlot>) -> Option<Self> {
        slot.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { slot: Arc::clone(slot) })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.slot.in_progress.store(false, Ordering::Release);
    }
}

type TriggerRequest = oneshot::Sender<TriggerOutcome>;

struct Running {
    shutdown: watch::Sender<bool>,
    timers: Vec<JoinHandle<()>>,
    triggers: HashMap<String, mpsc::Sender<TriggerRequest>>,
}

/// Fires registered jobs at fixed intervals.
///
/// Each job gets its own timer task. A tick that finds the previous run of the same job still
/// going is skipped, never queued; `stop` waits for in-flight runs to finish.
pub struct Scheduler {
    enabled: bool,
    jobs: RwLock<Vec<Arc<JobSlot>>>,
    state: Mutex<Option<Running>>,
}

impl Scheduler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            jobs: RwLock::new(Vec::new()),
            state: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Register a job; an existing job with the same id is replaced.
    /// Takes effect on the next `start`.
    pub fn add_job(&self, id: &str, name: &str, every: Duration, job: Arc<dyn Job>) {
        let slot = Arc::new(JobSlot {
            id: id.to_string(),
            name: name.to_string(),
            every,
            job,
            in_progress: AtomicBool::new(false),
            next_run: RwLock::new(None),
        });

        let mut jobs = self.jobs.write();
        match jobs.iter_mut().find(|s| s.id == id) {
            Some(existing) => *existing = slot,
            None => jobs.push(slot),
        }
        debug!("Scheduled job '{}' with interval {:?}", id, every);
    }

    pub async fn start(&self) {
        if !self.enabled {
            info!("Scheduler is disabled in configuration");
            return;
        }

        let mut state = self.state.lock().await;
        if state.is_some() {
            warn!("Scheduler already running");
            return;
        }

        info!("Starting background scheduler");
        let (shutdown, _) = watch::channel(false);
        let mut timers = Vec::new();
        let mut triggers = HashMap::new();

        for slot in self.jobs.read().iter() {
            let (tx, rx) = mpsc::channel(8);
            triggers.insert(slot.id.clone(), tx);
            slot.schedule_next();
            timers.push(tokio::spawn(drive(Arc::clone(slot), shutdown.subscribe(), rx)));
            info!("  - {} (ID: {}, Trigger: {})", slot.name, slot.id, describe_interval(slot.every));
        }

        *state = Some(Running {
            shutdown,
            timers,
            triggers,
        });
        info!("Background scheduler started successfully");
    }

    /// Cancel future fires, then wait for any in-flight run to complete
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        let Some(running) = state.take() else {
            warn!("Scheduler not running");
            return;
        };

        info!("Stopping background scheduler");
        let _ = running.shutdown.send(true);
        for timer in running.timers {
            if let Err(e) = timer.await {
                error!("Scheduler timer task failed: {}", e);
            }
        }
        info!("Background scheduler stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.is_some()
    }

    pub async fn status(&self) -> SchedulerStatus {
        let state = self.state.lock().await;
        if state.is_none() {
            return SchedulerStatus {
                running: false,
                jobs: Vec::new(),
            };
        }

        SchedulerStatus {
            running: true,
            jobs: self.jobs.read().iter().map(|slot| slot.status()).collect(),
        }
    }

    /// Fire a job now, through the same overlap guard as its timer
    pub async fn trigger(&self, id: &str) -> Result<TriggerOutcome, SchedulerError> {
        let sender = {
            let state = self.state.lock().await;
            let running = state.as_ref().ok_or(SchedulerError::NotRunning)?;
            running
                .triggers
                .get(id)
                .cloned()
                .ok_or_else(|| SchedulerError::UnknownJob(id.to_string()))?
        };

        let (reply, outcome) = oneshot::channel();
        sender.send(reply).await.map_err(|_| SchedulerError::NotRunning)?;
        outcome.await.map_err(|_| SchedulerError::NotRunning)
    }
}

/// Timer loop for one job; runs are spawned onto a local set so a slow run never delays a tick
async fn drive(slot: Arc<JobSlot>, mut shutdown: watch::Receiver<bool>, mut manual: mpsc::Receiver<TriggerRequest>) {
    let mut ticker = interval_at(Instant::now() + slot.every, slot.every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut runs = JoinSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                slot.schedule_next();
                fire(&slot, &mut runs);
            }
            Some(reply) = manual.recv() => {
                let _ = reply.send(fire(&slot, &mut runs));
            }
            Some(joined) = runs.join_next(), if !runs.is_empty() => {
                if let Err(e) = joined {
                    error!("Job '{}' run aborted: {}", slot.id, e);
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    *slot.next_run.write() = None;

    if !runs.is_empty() {
        info!("Waiting for in-flight run of '{}' to finish", slot.id);
    }
    while let Some(joined) = runs.join_next().await {
        if let Err(e) = joined {
            error!("Job '{}' run aborted: {}", slot.id, e);
        }
    }
}

fn fire(slot: &Arc<JobSlot>, runs: &mut JoinSet<()>) -> TriggerOutcome {
    let Some(guard) = RunGuard::acquire(slot) else {
        warn!("Skipping '{}': previous run still in progress", slot.id);
        return TriggerOutcome::Skipped;
    };

    let slot = Arc::clone(slot);
    runs.spawn(async move {
        let _guard = guard;
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        debug!("Job '{}' run {} started", slot.id, run_id);

        match slot.job.run().await {
            Ok(()) => debug!("Job '{}' run {} finished in {:?}", slot.id, run_id, started.elapsed()),
            Err(e) => error!("Job '{}' run {} failed: {:#}", slot.id, run_id, e),
        }
    });

    TriggerOutcome::Started
}

/// `interval[H:MM:SS]`
fn describe_interval(every: Duration) -> String {
    let secs = every.as_secs();
    format!("interval[{}:{:02}:{:02}]", secs / 3600, (secs % 3600) / 60, secs % 60)
}
