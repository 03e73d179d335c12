//! Relay configuration types and defaults.
//!
//! Every liveness and retention threshold is configuration rather than a
//! constant; the defaults are the values the service has historically run with.

use std::net::SocketAddr;
use std::time::Duration;

/// Runtime configuration for the relay service and its HTTP server.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// The socket address to bind the HTTP server to
    pub bind_address: SocketAddr,

    /// A client is online while its last sighting is younger than this
    pub online_window: Duration,

    /// Clients unseen for longer than this are swept from every store
    pub client_timeout: Duration,

    /// How often the client sweep runs
    pub sweep_interval: Duration,

    /// Unread execution results older than this are discarded
    pub exec_result_ttl: Duration,

    /// How often the execution-result sweep runs
    pub exec_sweep_interval: Duration,

    /// Maximum chat messages kept per client
    pub chat_history_cap: usize,

    /// Maximum audit log entries kept per client
    pub log_cap: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            online_window: Duration::from_secs(15),
            client_timeout: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(30),
            exec_result_ttl: Duration::from_secs(300),
            exec_sweep_interval: Duration::from_secs(60),
            chat_history_cap: 100,
            log_cap: 200,
        }
    }
}
