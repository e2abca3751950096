//! Core module - engine, scheduler and the recurring rolling-average job

mod engine;
mod rolling;
mod scheduler;

pub use engine::Engine;
pub use rolling::{build_scheduler, RollingAverageJob, ROLLING_AVERAGE_JOB_ID};
pub use scheduler::{Job, JobStatus, Scheduler, SchedulerStatus, TriggerOutcome};
