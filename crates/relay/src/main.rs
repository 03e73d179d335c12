//! Command relay server entry point.
//!
//! Loads configuration, sets up logging, and runs the relay until a shutdown
//! signal arrives.

mod cli;
mod config;
mod signals;

use anyhow::{anyhow, Context, Result};
use cli::CliArgs;
use config::AppConfig;
use relay_core::logging::setup_logging;
use relay_core::RelayServer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub struct Application {
    config: AppConfig,
    server: Arc<RelayServer>,
}

impl Application {
    pub async fn new(args: CliArgs) -> Result<Self> {
        // Configuration is loaded before logging so the file can set the level.
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        config.apply_cli(&args);
        config
            .validate()
            .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

        setup_logging(&config.logging.level, config.logging.json_format)?;
        display_banner();
        info!("📂 Config: {}", args.config_path.display());

        let relay_config = config.to_relay_config()?;
        let server = Arc::new(RelayServer::new(relay_config));

        Ok(Self { config, server })
    }

    pub async fn run(self) -> Result<()> {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!(
            "  💓 Online window: {}s | Client timeout: {}s | Sweep every {}s",
            self.config.liveness.online_window_secs,
            self.config.liveness.client_timeout_secs,
            self.config.liveness.sweep_interval_secs
        );
        info!(
            "  🗃️ Exec result TTL: {}s | Chat cap: {} | Log cap: {}",
            self.config.retention.exec_result_ttl_secs,
            self.config.retention.chat_history_cap,
            self.config.retention.log_cap
        );

        let mut server_handle = {
            let server = self.server.clone();
            tokio::spawn(async move { server.start().await })
        };

        info!("🛑 Press Ctrl+C to gracefully shutdown");

        tokio::select! {
            result = &mut server_handle => {
                // The server only returns on its own when it failed to start.
                return match result.context("server task panicked")? {
                    Ok(()) => Ok(()),
                    Err(e) => Err(anyhow!("server error: {}", e)),
                };
            }
            signal = signals::wait_for_shutdown_signal() => {
                signal?;
            }
        }

        info!("🛑 Shutdown signal received, initiating graceful shutdown...");
        let health = self.server.service().health_snapshot().await;
        self.server.shutdown().await?;

        match tokio::time::timeout(Duration::from_secs(10), server_handle).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => error!("❌ Server error during shutdown: {}", e),
            Ok(Err(e)) => error!("❌ Server task failed: {}", e),
            Err(_) => warn!("⏳ Server did not stop within 10s, exiting anyway"),
        }

        info!(
            "📊 Dropping state for {} client(s) with {} pending command(s)",
            health.client_count, health.pending_command_count
        );
        info!("👋 Command relay shutdown complete");
        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let app = match Application::new(args).await {
        Ok(app) => app,
        Err(e) => {
            eprintln!("❌ Failed to start application: {:?}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run().await {
        error!("❌ Application error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║              📡 COMMAND RELAY            ║");
    info!("║                  v{:<8}               ║", version);
    info!("║                                          ║");
    info!("║  Register, heartbeat, poll               ║");
    info!("║  One pending command per client          ║");
    info!("║  In-memory state, swept on silence       ║");
    info!("╚══════════════════════════════════════════╝");
}
