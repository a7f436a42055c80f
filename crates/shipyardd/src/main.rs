//! shipyardd — the Shipyard daemon.
//!
//! Single binary that assembles the blue/green control plane:
//! - Application registry (redb)
//! - Traffic router
//! - Preview readiness monitor
//! - Blue/green controller
//! - REST API
//!
//! # Usage
//!
//! ```text
//! shipyardd standalone --port 8443 --data-dir /var/lib/shipyard \
//!     --token-secret <secret>
//! shipyardd token --secret <secret> --subject alice --namespace acme
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use shipyard_api::auth::{TokenVerifier, issue_token};
use shipyard_api::{ApiState, build_router};
use shipyard_bluegreen::{BlueGreenController, LocalProvisioner};
use shipyard_probe::{PreviewMonitor, ReadinessBoard};
use shipyard_state::RegistryStore;
use shipyard_traffic::TrafficRouter;

#[derive(Parser)]
#[command(name = "shipyardd", about = "Shipyard daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run in standalone mode (single-node, local provisioner).
    Standalone {
        /// Port to listen on.
        #[arg(long, default_value = "8443")]
        port: u16,

        /// Data directory for persistent state.
        #[arg(long, default_value = "/var/lib/shipyard")]
        data_dir: PathBuf,

        /// Shared secret for verifying bearer tokens.
        #[arg(long)]
        token_secret: String,

        /// Base readiness probe interval in seconds.
        #[arg(long, default_value = "5")]
        probe_interval: u64,
    },

    /// Mint a bearer token for a subject.
    Token {
        /// Shared secret the daemon was started with.
        #[arg(long)]
        secret: String,

        /// Subject the token identifies.
        #[arg(long)]
        subject: String,

        /// Tenant namespace the token is scoped to.
        #[arg(long)]
        namespace: String,

        /// Role claim (`tenant` or `platform_admin`).
        #[arg(long, default_value = "tenant")]
        role: String,

        /// Token lifetime in seconds.
        #[arg(long, default_value = "86400")]
        ttl: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,shipyardd=debug,shipyard=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Standalone {
            port,
            data_dir,
            token_secret,
            probe_interval,
        } => run_standalone(port, data_dir, token_secret, probe_interval).await,
        Command::Token {
            secret,
            subject,
            namespace,
            role,
            ttl,
        } => {
            let token = issue_token(&secret, &subject, &namespace, &role, ttl)?;
            println!("{token}");
            Ok(())
        }
    }
}

async fn run_standalone(
    port: u16,
    data_dir: PathBuf,
    token_secret: String,
    probe_interval: u64,
) -> anyhow::Result<()> {
    info!("Shipyard daemon starting in standalone mode");

    // Ensure data directory exists.
    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("shipyard.redb");

    // ── Initialize subsystems ──────────────────────────────────

    let store = RegistryStore::open(&db_path)?;
    info!(path = ?db_path, "application registry opened");

    let router = TrafficRouter::new();
    let board = ReadinessBoard::new();
    let provisioner = Arc::new(LocalProvisioner::new(store.clone()));

    let controller = BlueGreenController::new(
        store.clone(),
        router.clone(),
        board.clone(),
        provisioner,
    );
    info!("blue/green controller initialized");

    let monitor = Arc::new(PreviewMonitor::new(
        board,
        Duration::from_secs(probe_interval),
    ));
    info!(interval = probe_interval, "preview monitor initialized");

    // Routes and readiness probing do not survive a restart; rebuild
    // them from the registry.
    for record in controller.apps_with_previews()? {
        let key = record.table_key();
        match record.preview.as_ref() {
            Some(preview) => {
                // Standalone workloads are local; the address follows
                // directly from the descriptor.
                let address = format!("127.0.0.1:{}", preview.port);
                monitor.start(&key, &address, &preview.readiness_path).await;
                info!(app = %key, "resumed preview readiness monitor");
            }
            None => warn!(app = %key, "preview listing returned record without preview"),
        }
    }
    for record in controller.all_apps()? {
        let key = record.table_key();
        router.set_route(
            &key,
            shipyard_traffic::Selector::for_color(
                &record.name,
                record.active_color,
                record.stable.port,
            ),
        );
    }

    // ── Start API server ───────────────────────────────────────

    let state = ApiState {
        controller,
        monitor: Arc::clone(&monitor),
        verifier: TokenVerifier::new(&token_secret),
    };
    let api = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, api).with_graceful_shutdown(async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
    });

    server.await?;

    monitor.stop_all().await;

    info!("Shipyard daemon stopped");
    Ok(())
}
