//! # focusd: focuser simulator daemon
//!
//! Composition root that wires the focuser simulator to its client over
//! stdin/stdout.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize logging on stderr; stdout carries the transport
//! - Construct the file config store and the stdio transport (adapters)
//! - Construct the simulator, injecting both through the port traits
//! - Forward client requests from stdin until it closes or SIGINT arrives
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer. No domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use propbus_adapter_focuser_sim::{Command, FocuserSimulator};
use propbus_adapter_transport_stdio::{Inbound, LineTransport, forward_lines};
use propbus_app::services::config_service::ConfigService;
use propbus_domain::id::ClientId;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

const CHANNEL_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging.filter);

    let device = config.device_name()?;
    let store = config
        .config_store()
        .context("failed to locate the configuration store")?;
    tracing::info!(device = %device, location = ?store.location(), "starting focusd");

    // Simulator
    let transport = Arc::new(LineTransport::stdout());
    let persistence = ConfigService::new(store).with_policy(config.storage.default_snapshot);
    let mut simulator = FocuserSimulator::new(&device, transport, persistence)
        .context("failed to declare the focuser properties")?;
    if config.simulator.load_config_on_start {
        match simulator.load_config().await {
            Ok(restored) => tracing::info!(restored, "stored configuration restored"),
            Err(err) => tracing::warn!(%err, "stored configuration not restored"),
        }
    }

    // Client
    let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let client = ClientId::new();
    let reader = tokio::spawn(async move {
        if let Err(err) = forward_lines(BufReader::new(tokio::io::stdin()), client, inbound_tx).await {
            tracing::error!(%err, "failed to read client requests");
        }
    });
    let bridge = tokio::spawn(route(inbound_rx, command_tx, device.to_string()));

    tokio::select! {
        result = simulator.run(command_rx) => result.context("transport failed")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }

    reader.abort();
    bridge.abort();
    tracing::info!("focusd stopped");
    Ok(())
}

/// Turn client requests into simulator commands, dropping property
/// requests addressed to other devices.
async fn route(
    mut inbound: mpsc::Receiver<Inbound>,
    commands: mpsc::Sender<Command>,
    device: String,
) {
    while let Some(message) = inbound.recv().await {
        let command = match message {
            Inbound::GetProperties { device: Some(name) } if name != device => {
                tracing::debug!(device = %name, "ignoring request for another device");
                continue;
            }
            Inbound::GetProperties { .. } => Command::GetProperties,
            Inbound::Update(request) => Command::Update(request),
        };
        if commands.send(command).await.is_err() {
            break;
        }
    }
}

fn init_tracing(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}
