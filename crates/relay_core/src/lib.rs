//! # Relay Core - In-Memory Command Relay
//!
//! A small coordination service that sits between administrators and a fleet
//! of remote clients that can only make outbound requests. Clients register,
//! heartbeat and poll; administrators list clients and queue commands for
//! them. The relay remembers who is alive and holds at most one pending
//! command per client until that client picks it up.
//!
//! ## Components
//!
//! * **Client registry** - last-known record of every client, with online
//!   status computed from the last sighting at read time
//! * **Command mailbox** - one overwrite-on-write, take-once slot per client
//! * **Side channels** - bounded audit log and chat history, plus read-once
//!   execution results
//! * **Expiry sweeper** - background task evicting silent clients from every
//!   store at once
//! * **HTTP layer** - the JSON API served with axum
//!
//! All state lives in memory and is lost on restart.
//!
//! ## Usage
//!
//! ```no_run
//! use relay_core::{RelayConfig, RelayServer};
//!
//! # async fn run() -> Result<(), relay_core::RelayError> {
//! let server = RelayServer::new(RelayConfig::default());
//! server.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod mailbox;
pub mod registry;
pub mod service;
pub mod side_channel;
pub mod sweeper;
pub mod wire;

pub use clock::{current_timestamp, Clock, ManualClock, SystemClock};
pub use command::Command;
pub use config::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use http::{router, RelayServer};
pub use registry::{ClientId, ClientMetadata, ClientView};
pub use service::{HealthSnapshot, RelayService, RelayStats};
pub use side_channel::{ChatMessage, ExecOutcome, ExecutionResult, LogEntry, LogKind};
pub use sweeper::{ExpirySweeper, SweeperHandle};
pub use wire::WireId;
