// Copyright (c) 2026 walkware
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/walkware/stridekeeper-rs

//! stridekeeper - Step Telemetry Engine
//!
//! Reads a cumulative step counter, accrues a running total, persists it
//! locally, and appends each accepted increment to a remote document store
//! as best-effort telemetry.

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::interval;

use stridekeeper::config::Config;
use stridekeeper::core::{run_accrual, AccrualEngine, EventBus, SessionState};
use stridekeeper::sensors::{
    ActivationGate, ActivationState, PedometerSimulator, Permission, SensorManager, StepSource,
};
use stridekeeper::store::CounterStore;
use stridekeeper::sync::RemoteSink;
use stridekeeper::VERSION;

/// stridekeeper - Step Telemetry Engine
#[derive(Parser, Debug)]
#[command(name = "stridekeeper")]
#[command(author = "walkware")]
#[command(version = VERSION)]
#[command(about = "Pedometer accrual, durable local counts, best-effort cloud sync")]
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

    /// Demo mode with a simulated pedometer
    #[arg(long)]
    demo: bool,

    /// Data output directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Remote document store endpoint (enables sync)
    #[arg(long)]
    sync_endpoint: Option<String>,

    /// Identifier stamped on sync records
    #[arg(long)]
    user: Option<String>,

    /// Start without activity-recognition authorization
    #[arg(long)]
    deny_motion: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("stridekeeper v{} - Step Telemetry Engine", VERSION);

    // Load or create configuration
    let config_path = args.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Override with command line args
    if args.demo {
        config.demo_mode = true;
    }
    if let Some(data_dir) = args.data_dir {
        config.store.path = data_dir.join("stridekeeper.db");
        config.data_dir = data_dir;
    }
    if let Some(endpoint) = args.sync_endpoint {
        config.sync.enabled = true;
        config.sync.endpoint = endpoint;
    }
    if let Some(user) = args.user {
        config.sync.user_id = user;
    }

    info!("Configuration loaded from {:?}", config_path);
    info!("Demo mode: {}", config.demo_mode);

    let permission = if args.deny_motion {
        Permission::Denied
    } else {
        Permission::Granted
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config, permission))
}

/// Run the session until ctrl-c
async fn run(config: Config, permission: Permission) -> Result<()> {
    let store = Arc::new(CounterStore::open(&config.store)?);
    let initial_total = store.load()?;
    info!("Resuming from persisted total: {} steps", initial_total);

    let sink = Arc::new(RemoteSink::new(&config.sync)?);
    if sink.is_enabled() {
        info!("Remote sync enabled → {}", config.sync.endpoint);
    }

    let bus = Arc::new(EventBus::new(1024));

    // Without demo mode there is no pedometer backend on this host
    let source_present = config.demo_mode;
    let gate = ActivationGate::new(permission, source_present);

    let (shutdown_tx, _) = broadcast::channel(1);
    let mut tasks = Vec::new();

    if gate.state().is_active() {
        let source: Box<dyn StepSource> = {
            let mut sim = match config.sensor.simulator_seed {
                Some(seed) => PedometerSimulator::seeded(
                    &config.sensor.source_id,
                    config.sensor.rate_class,
                    seed,
                ),
                None => PedometerSimulator::new(&config.sensor.source_id, config.sensor.rate_class),
            };
            sim.set_reset_probability(config.sensor.reset_probability);
            Box::new(sim)
        };

        let manager = Arc::new(SensorManager::new(source, bus.clone(), gate));

        tasks.push(tokio::spawn(run_accrual(
            AccrualEngine::new(initial_total),
            bus.clone(),
            store.clone(),
            sink.clone(),
            shutdown_tx.subscribe(),
        )));

        let feed_shutdown = shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = manager.run(feed_shutdown).await {
                error!("Feed manager failed: {}", e);
            }
        }));
    } else {
        // Display-only condition; the total stays frozen until the gate
        // is re-triggered on a future start
        warn!("Step counting inactive: {}", gate.state());
    }

    let status = tokio::spawn(status_display(
        bus.clone(),
        gate.state(),
        initial_total,
        shutdown_tx.subscribe(),
    ));

    info!("stridekeeper running, press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received, cleaning up...");
    let _ = shutdown_tx.send(());
    for task in tasks {
        let _ = task.await;
    }
    let _ = status.await;

    info!("stridekeeper shutdown complete");
    Ok(())
}

/// Presentation stand-in: log the running total and last-synced time
async fn status_display(
    bus: Arc<EventBus>,
    activation: ActivationState,
    initial_total: u64,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut accruals = bus.subscribe_accruals();
    let mut state = SessionState::new(activation, initial_total);
    let mut heartbeat = interval(Duration::from_secs(30));

    loop {
        tokio::select! {
            result = accruals.recv() => match result {
                Ok(update) => {
                    state.apply(&update);
                    info!("Steps taken: {}", state.running_total);
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = heartbeat.tick() => {
                match state.last_accrual {
                    Some(t) => info!(
                        "Steps taken: {} (last synced {})",
                        state.running_total,
                        t.format("%H:%M:%S")
                    ),
                    None => info!("Steps taken: {} ({})", state.running_total, state.activation),
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}
