//! Domicile
//!
//! Mirrors a zigbee2mqtt network into PostgreSQL, records sensor reports and
//! serves the dashboard.

use clap::{Parser, Subcommand};
use domicile::api::{self, AppState};
use domicile::bus::{Bus, BusMessage, MqttClient, Topics};
use domicile::command::CommandDispatcher;
use domicile::config::{self, Config};
use domicile::controller::Controller;
use domicile::error::{DomicileError, Result};
use domicile::store::Stores;
use domicile::store::postgres::PostgresStore;
use log::{error, info};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "domicile")]
#[command(about = "zigbee2mqtt device and group reconciliation with sensor reports")]
struct Cli {
    /// Apply pending database migrations before starting
    #[arg(long, env = "DOMICILE_MIGRATE")]
    migrate: bool,

    #[command(subcommand)]
    role: Option<Role>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// Reconcile snapshots and record telemetry
    Controller,
    /// Serve the HTTP surface only
    Api,
    /// Both (default)
    All,
}

impl Role {
    fn runs_controller(self) -> bool {
        matches!(self, Role::Controller | Role::All)
    }

    fn runs_api(self) -> bool {
        matches!(self, Role::Api | Role::All)
    }
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() -> ExitCode {
    // Before the runtime exists: load_dotenv mutates the process environment.
    config::load_dotenv();
    init_logger();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let role = cli.role.unwrap_or(Role::All);
    info!("Starting Domicile");

    let config = Config::from_env()?;
    info!("Configuration loaded:");
    info!(
        "  MQTT broker: {}:{}",
        config.mqtt.broker_host, config.mqtt.broker_port
    );
    info!("  Topic root: {}", config.mqtt.topic_root);
    info!("  HTTP bind: {}", config.http.bind);
    info!(
        "  Weather models: {}",
        config.telemetry.weather_model_ids.join(", ")
    );

    let store = Arc::new(PostgresStore::connect(&config.database).await?);
    if cli.migrate {
        store.migrate().await?;
    }
    let stores = Stores::from_backend(store.clone());

    let cancel = CancellationToken::new();
    let mqtt = MqttClient::new(&config.mqtt);
    let bus: Arc<dyn Bus> = Arc::new(mqtt.bus(cancel.clone()));
    let (tx, rx) = mpsc::channel::<BusMessage>(256);

    // The event loop runs in every role: publishes only leave through it.
    let mut mqtt_task = tokio::spawn(mqtt.run(tx, cancel.clone()));

    let mut idle_rx = None;
    let dispatcher_task = if role.runs_controller() {
        let controller = Controller::new(&config, bus.clone(), &stores);
        let task = tokio::spawn(controller.dispatcher().run(rx, cancel.clone()));
        controller.start().await?;
        Some(task)
    } else {
        idle_rx = Some(rx);
        None
    };

    let mut http_task = role.runs_api().then(|| {
        let state = AppState {
            stores: stores.clone(),
            commands: CommandDispatcher::new(bus.clone(), Topics::new(config.mqtt.topic_root.clone())),
        };
        tokio::spawn(api::serve(config.http.bind, state, cancel.clone()))
    });

    let mut mqtt_done = false;
    let mut http_done = false;
    let outcome = tokio::select! {
        res = signal::ctrl_c() => {
            match res {
                Ok(()) => info!("Received shutdown signal"),
                Err(e) => error!("Failed to listen for shutdown signal: {}", e),
            }
            Ok(())
        }
        res = &mut mqtt_task => {
            mqtt_done = true;
            res.map_err(DomicileError::from).and_then(|r| r)
        }
        res = wait(&mut http_task) => {
            http_done = true;
            res
        }
    };

    cancel.cancel();

    if let Some(task) = dispatcher_task {
        task.await?;
    }
    if !http_done {
        if let Some(task) = http_task {
            task.await??;
        }
    }
    if !mqtt_done {
        mqtt_task.await??;
    }
    drop(idle_rx);

    store.close().await;
    info!("Shutdown complete");
    outcome
}

/// Await an optional task; never resolves when there is none.
async fn wait(task: &mut Option<JoinHandle<Result<()>>>) -> Result<()> {
    match task {
        Some(task) => task.await?,
        None => std::future::pending().await,
    }
}
