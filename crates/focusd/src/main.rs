//! focusd - The focusguard background service
//!
//! Wires together:
//! - Configuration loading
//! - Store initialization
//! - Focus engine with the Linux collaborators
//! - IPC server

use anyhow::{Context, Result};
use clap::Parser;
use focus_config::{Policy, load_config_or_default};
use focus_core::{Collaborators, EngineEvent};
use focus_host_linux::LinuxHost;
use focus_ipc::{IpcServer, ServerMessage};
use focus_store::{SqliteStore, Store};
use focus_util::default_config_path;
use focusd::Service;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// focusd - Schedule-driven app restriction and focus overlay
#[derive(Parser, Debug)]
#[command(name = "focusd")]
#[command(about = "Schedule-driven app restriction and focus overlay", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/focusguard/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set FOCUSGUARD_SOCKET env var)
    #[arg(short, long, env = "FOCUSGUARD_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set FOCUSGUARD_DATA_DIR env var)
    #[arg(short, long, env = "FOCUSGUARD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Log to stderr and to `focusd.log` in the configured log directory
fn init_logging(level: &str, log_dir: &Path) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {:?}", log_dir))?;
    let log_path = log_dir.join("focusd.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();
    Ok(())
}

struct Daemon {
    service: Arc<Service>,
    ipc: Arc<IpcServer>,
}

impl Daemon {
    async fn new(args: &Args, policy: &Policy) -> Result<Self> {
        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| policy.daemon.socket_path.clone());
        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| policy.daemon.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join("focusd.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );
        info!(db_path = %db_path.display(), "Store initialized");

        let host = Arc::new(LinuxHost::detect(&policy.host));
        let collaborators = Collaborators::from_host(host, policy.engine.collaborator_timeout);
        let service = Arc::new(Service::new(policy, collaborators, store));

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start()
            .await
            .with_context(|| format!("Failed to bind socket {:?}", socket_path))?;

        Ok(Self {
            service,
            ipc: Arc::new(ipc),
        })
    }

    async fn run(self) -> Result<()> {
        let service = self.service;
        let ipc = self.ipc;

        // Subscribe before anything can emit
        let mut engine_events = service.subscribe_engine();
        let mut client_events = service.subscribe();

        service.initialize(focus_util::now()).await?;
        service.start()?;

        let mut ipc_messages = ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        let ipc_accept = ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let ipc_events = ipc.clone();
        tokio::spawn(async move {
            loop {
                match client_events.recv().await {
                    Ok(event) => ipc_events.broadcast_event(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Client event forwarder lagging");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                // Sent by the compositor on session exit
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                event = engine_events.recv() => match event {
                    Ok(event) => Self::handle_engine_event(&service, event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Engine event receiver lagging");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        error!("Engine event channel closed");
                        break;
                    }
                },

                Some(msg) = ipc_messages.recv() => {
                    Self::handle_ipc_message(&service, &ipc, msg).await;
                }
            }
        }

        info!("Shutting down focusd");
        service.shutdown().await;
        ipc.shutdown();
        info!("Shutdown complete");
        Ok(())
    }

    fn handle_engine_event(service: &Service, event: EngineEvent) {
        debug!(?event, "Engine event");
        service.handle_engine_event(event);
    }

    async fn handle_ipc_message(service: &Service, ipc: &IpcServer, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                debug!(client_id = %client_id, command = ?request.command, "Request");
                let response = service.handle_request(request).await;
                if let Err(e) = ipc.send_response(&client_id, response).await {
                    debug!(client_id = %client_id, error = %e, "Failed to send response");
                }
            }
            ServerMessage::ClientConnected { client_id, uid } => {
                debug!(client_id = %client_id, uid = ?uid, "Client registered");
            }
            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let policy = load_config_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    init_logging(&args.log_level, &policy.daemon.log_dir)?;

    info!(version = env!("CARGO_PKG_VERSION"), "focusd starting");
    info!(
        config_path = %args.config.display(),
        slots = policy.initial_schedule.slot_count(),
        allow_list = policy.restrictions.allow_list.len(),
        "Configuration loaded"
    );

    let daemon = Daemon::new(&args, &policy).await?;
    daemon.run().await
}
