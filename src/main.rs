// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! SensorHub - Environmental Sensor Aggregation Service
//!
//! Runs the recurring rolling-average scheduler as a long-lived service, or performs one-shot
//! operations against the configured database: run an aggregation, list results or readings,
//! ingest a reading, list processors.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sensorhub::{Config, Engine, JobRequest, NewReading, ReadingFilter, ResultQuery, NAME, VERSION};

/// SensorHub - Environmental Sensor Aggregation Service
#[derive(Parser, Debug)]
#[command(name = "sensorhub")]
#[command(author = "SensorHub Project")]
#[command(version = VERSION)]
#[command(about = "Windowed aggregation of environmental sensor readings")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Data directory; the database lives here as sensorhub.db
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scheduler (and simulator in demo mode) until Ctrl+C
    Serve {
        /// Insert simulated BME280 readings
        #[arg(long)]
        demo: bool,

        /// Do not start the recurring rolling-average job
        #[arg(long)]
        no_scheduler: bool,
    },

    /// Run one aggregation and print the stored result
    Run {
        /// Processor name, e.g. average or rolling_average
        processor: String,

        /// Window start (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,

        /// Window end (RFC 3339)
        #[arg(long)]
        end: DateTime<Utc>,

        #[arg(long, default_value = "bme280")]
        sensor_type: String,

        /// Restrict to one device
        #[arg(long)]
        device: Option<String>,
    },

    /// List stored aggregation results, newest first
    Results {
        #[arg(long)]
        processor: Option<String>,

        #[arg(long)]
        sensor_type: Option<String>,

        /// Only results whose window starts at or after this instant
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        /// Only results whose window ends at or before this instant
        #[arg(long)]
        end: Option<DateTime<Utc>>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// List raw readings, newest first
    Readings {
        #[arg(long)]
        sensor_type: Option<String>,

        #[arg(long)]
        device: Option<String>,

        #[arg(long)]
        start: Option<DateTime<Utc>>,

        #[arg(long)]
        end: Option<DateTime<Utc>>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Validate and store one reading
    Ingest {
        /// Device identifier
        #[arg(long)]
        device: String,

        #[arg(long, default_value = "bme280")]
        sensor_type: String,

        /// Reading time (RFC 3339); defaults to now
        #[arg(long)]
        timestamp: Option<DateTime<Utc>>,

        #[arg(long, allow_negative_numbers = true)]
        temperature: Option<f64>,

        #[arg(long)]
        humidity: Option<f64>,

        #[arg(long)]
        pressure: Option<f64>,
    },

    /// List registered processors
    Processors,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    init_logging(&args, &config)?;

    // Override with command line args
    if let Some(data_dir) = args.data_dir {
        config.database.path = data_dir.join("sensorhub.db");
        config.data_dir = data_dir;
    }
    let command = args.command.unwrap_or(Command::Serve {
        demo: false,
        no_scheduler: false,
    });
    if let Command::Serve { demo, no_scheduler } = &command {
        if *demo {
            config.demo_mode = true;
        }
        if *no_scheduler {
            config.scheduler.enable_scheduler = false;
        }
    }

    info!("Configuration loaded from {:?}", config_path);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config, command))
}

fn init_logging(args: &Args, config: &Config) -> Result<()> {
    let level = if args.trace {
        "trace"
    } else if args.debug {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run(config: Config, command: Command) -> Result<()> {
    let mut engine = Engine::new(config)?;

    match command {
        Command::Serve { .. } => serve(&mut engine).await,
        Command::Run {
            processor,
            start,
            end,
            sensor_type,
            device,
        } => {
            let mut request = JobRequest::new(&processor, start, end, &sensor_type);
            request.device_id = device;
            print_json(&engine.run_job(request).await?)
        }
        Command::Results {
            processor,
            sensor_type,
            start,
            end,
            limit,
        } => {
            let query = ResultQuery {
                processor,
                sensor_type,
                start_time: start,
                end_time: end,
                limit,
            };
            print_json(&engine.query_results(query).await?)
        }
        Command::Readings {
            sensor_type,
            device,
            start,
            end,
            limit,
        } => {
            let filter = ReadingFilter {
                sensor_type,
                device_id: device,
                start_time: start,
                end_time: end,
                limit,
            };
            print_json(&engine.query_readings(filter).await?)
        }
        Command::Ingest {
            device,
            sensor_type,
            timestamp,
            temperature,
            humidity,
            pressure,
        } => {
            let reading = NewReading {
                timestamp,
                temperature,
                humidity,
                pressure,
                ..NewReading::new(&sensor_type, &device)
            };
            print_json(&engine.ingest(reading).await?)
        }
        Command::Processors => print_json(&engine.list_processors()),
    }
}

/// Long-running mode: scheduler plus optional simulator until Ctrl+C
async fn serve(engine: &mut Engine) -> Result<()> {
    info!("{} v{} starting", NAME, VERSION);
    engine.start().await?;

    let status = engine.scheduler_status().await;
    info!("Scheduler running: {}", status.running);
    for job in &status.jobs {
        info!("  {} ({}) next run {:?}", job.name, job.trigger, job.next_run_time);
    }

    info!("{} running, press Ctrl+C to shutdown", NAME);
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received, cleaning up...");
    engine.stop().await?;

    info!("{} shutdown complete (uptime {}s)", NAME, engine.uptime());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
