//! Background expiry sweeps.
//!
//! Two independent loops run for the lifetime of the server: one evicts
//! clients whose last sighting is older than the client timeout, the other
//! discards unread execution results past their TTL. Both stop when the
//! shutdown signal fires.

use crate::config::RelayConfig;
use crate::service::RelayService;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Spawns the sweep loops for a service.
pub struct ExpirySweeper;

impl ExpirySweeper {
    /// Starts both sweep loops and returns a handle that stops them.
    ///
    /// The first sweep of each loop happens one full interval after spawning.
    /// Must be called from within a tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `service` - The service whose stores are swept
    /// * `config` - Supplies `sweep_interval` and `exec_sweep_interval`
    pub fn spawn(service: RelayService, config: &RelayConfig) -> SweeperHandle {
        let (shutdown_sender, _) = broadcast::channel(1);

        let clients = spawn_loop(
            "client",
            config.sweep_interval,
            shutdown_sender.subscribe(),
            {
                let service = service.clone();
                move || {
                    let service = service.clone();
                    async move {
                        service.sweep_expired().await;
                    }
                }
            },
        );

        let exec_results = spawn_loop(
            "exec-result",
            config.exec_sweep_interval,
            shutdown_sender.subscribe(),
            move || {
                let service = service.clone();
                async move {
                    service.sweep_exec_results().await;
                }
            },
        );

        info!(
            "🧹 Expiry sweeper started (clients every {:?}, exec results every {:?})",
            config.sweep_interval, config.exec_sweep_interval
        );

        SweeperHandle {
            shutdown_sender,
            tasks: vec![clients, exec_results],
        }
    }
}

fn spawn_loop<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
    mut sweep: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => sweep().await,
                _ = shutdown.recv() => {
                    debug!("{} sweep loop stopping", name);
                    break;
                }
            }
        }
    })
}

/// Stops the sweep loops when asked.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_sender: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Signals both loops and waits for them to finish.
    pub async fn stop(self) {
        let _ = self.shutdown_sender.send(());
        for result in futures::future::join_all(self.tasks).await {
            if let Err(e) = result {
                warn!("Sweep loop ended abnormally: {}", e);
            }
        }
        info!("🧹 Expiry sweeper stopped");
    }
}
