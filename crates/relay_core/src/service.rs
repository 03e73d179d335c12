//! The relay service object.
//!
//! [`RelayService`] owns every per-client store and is the only way to reach
//! them. It is created once at startup and handed to request handlers and the
//! sweeper as a cheap clone.
//!
//! All stores sit behind a single `RwLock`, and every operation acquires it
//! exactly once. That makes each operation, including the cascade delete
//! across all stores, atomic with respect to every other request and sweep.

use crate::clock::{Clock, SystemClock};
use crate::command::Command;
use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::mailbox::CommandMailbox;
use crate::registry::{ClientId, ClientMetadata, ClientRegistry, ClientView};
use crate::side_channel::{
    AuditLog, ChatHistory, ChatMessage, ExecOutcome, ExecResults, ExecutionResult, LogEntry,
    LogKind,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Every per-client store, mutated together under one lock.
#[derive(Debug)]
struct Stores {
    registry: ClientRegistry,
    mailbox: CommandMailbox,
    chat: ChatHistory,
    exec_results: ExecResults,
    logs: AuditLog,
}

impl Stores {
    fn new(config: &RelayConfig) -> Self {
        Self {
            registry: ClientRegistry::new(),
            mailbox: CommandMailbox::new(),
            chat: ChatHistory::new(config.chat_history_cap),
            exec_results: ExecResults::new(),
            logs: AuditLog::new(config.log_cap),
        }
    }

    /// Removes `id` from every store. Returns whether any store held it.
    fn cascade_remove(&mut self, id: &str) -> bool {
        // Non-short-circuiting: every store must be visited.
        self.registry.remove(id)
            | self.mailbox.remove(id)
            | self.chat.remove(id)
            | self.exec_results.remove(id)
            | self.logs.remove(id)
    }

    /// Ids holding side-channel state without a registry record, whose newest
    /// activity is older than `timeout`.
    ///
    /// Every write to the mailbox, chat or execution results also appends to
    /// the audit log, so the newest log entry is the id's last activity. An
    /// orphan with no log entry at all is always stale.
    fn orphaned(&self, now: u64, timeout: Duration) -> Vec<ClientId> {
        let timeout_ms = timeout.as_millis();
        let candidates: HashSet<&str> = self
            .mailbox
            .ids()
            .chain(self.chat.ids())
            .chain(self.exec_results.ids())
            .chain(self.logs.ids())
            .collect();

        candidates
            .into_iter()
            .filter(|id| self.registry.get(id).is_none())
            .filter(|id| match self.logs.latest(id) {
                Some(latest) => (now.saturating_sub(latest) as u128) > timeout_ms,
                None => true,
            })
            .map(str::to_string)
            .collect()
    }
}

/// Health summary served at `/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub status: String,
    pub client_count: usize,
    pub online_count: usize,
    pub pending_command_count: usize,
    pub uptime_secs: u64,
}

/// Dashboard counters served at `/api/stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStats {
    pub total_players: usize,
    pub online_players: usize,
    pub pending_commands: usize,
}

struct Inner {
    config: RelayConfig,
    clock: Arc<dyn Clock>,
    started_at: Instant,
    stores: RwLock<Stores>,
}

/// Handle to the relay's in-memory state.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RelayService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayService")
            .field("config", &self.inner.config)
            .field("clock", &self.inner.clock)
            .finish_non_exhaustive()
    }
}

impl RelayService {
    /// Creates an empty service on the wall clock.
    pub fn new(config: RelayConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an empty service reading time from `clock`.
    pub fn with_clock(config: RelayConfig, clock: Arc<dyn Clock>) -> Self {
        let stores = Stores::new(&config);
        Self {
            inner: Arc::new(Inner {
                config,
                clock,
                started_at: Instant::now(),
                stores: RwLock::new(stores),
            }),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    fn now(&self) -> u64 {
        self.inner.clock.now_ms()
    }

    /// Registers a client or refreshes its record.
    ///
    /// Always succeeds for a non-blank id. The first registration of an id is
    /// written to its audit log.
    pub async fn register(&self, id: &str, metadata: ClientMetadata) -> RelayResult<()> {
        require("userid", id)?;
        let now = self.now();
        let display_name = metadata.username.clone().unwrap_or_else(|| id.to_string());

        let mut stores = self.inner.stores.write().await;
        if stores.registry.upsert(id, metadata, now) {
            stores.logs.append(
                id,
                LogKind::Connection,
                "registered",
                format!("{display_name} connected"),
                now,
            );
            info!("👋 Client {} ({}) registered", display_name, id);
        } else {
            debug!("Client {} ({}) re-registered", display_name, id);
        }
        Ok(())
    }

    /// Refreshes a client's last-seen time.
    ///
    /// Returns `false` when the id was never registered (or already swept);
    /// nothing is created in that case.
    pub async fn heartbeat(&self, id: &str) -> RelayResult<bool> {
        require("userid", id)?;
        let now = self.now();
        let found = self.inner.stores.write().await.registry.touch(id, now);
        if !found {
            debug!("Heartbeat from unknown client {}", id);
        }
        Ok(found)
    }

    /// Takes the pending command for a client, if any.
    pub async fn poll_command(&self, id: &str) -> RelayResult<Option<Command>> {
        require("userid", id)?;
        let now = self.now();

        let mut stores = self.inner.stores.write().await;
        let command = stores.mailbox.dequeue(id);
        if let Some(command) = &command {
            stores.logs.append(
                id,
                LogKind::Command,
                "delivered",
                format!("{} delivered", command.name()),
                now,
            );
            info!("📤 Delivered command '{}' to client {}", command.name(), id);
        }
        Ok(command)
    }

    /// Queues `command` for every target, replacing anything undelivered.
    ///
    /// # Arguments
    ///
    /// * `targets` - Client ids; duplicates are collapsed
    /// * `command` - The payload, validated before anything is stored
    ///
    /// # Returns
    ///
    /// The number of distinct clients the command was queued for. Nothing is
    /// mutated when the target list is empty, a target is blank, or the
    /// payload is invalid.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use relay_core::{Command, RelayConfig, RelayService};
    ///
    /// # async fn run() -> relay_core::RelayResult<()> {
    /// let service = RelayService::new(RelayConfig::default());
    /// let kick = Command::Action { action: "kick".into(), reason: None };
    /// assert_eq!(service.enqueue_command(["100", "200"], kick).await?, 2);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn enqueue_command<I, S>(&self, targets: I, command: Command) -> RelayResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let targets = distinct_ids(targets)?;
        if targets.is_empty() {
            return Err(RelayError::EmptyTargets);
        }
        command.validate()?;
        let now = self.now();

        let mut stores = self.inner.stores.write().await;
        for id in &targets {
            if let Some(previous) = stores.mailbox.enqueue(id, command.clone()) {
                debug!(
                    "Command '{}' for client {} replaced undelivered '{}'",
                    command.name(),
                    id,
                    previous.name()
                );
            }
            stores.logs.append(
                id,
                LogKind::Command,
                "queued",
                format!("{} queued", command.name()),
                now,
            );
        }
        info!(
            "📥 Queued command '{}' for {} client(s)",
            command.name(),
            targets.len()
        );
        Ok(targets.len())
    }

    /// Every known client with status computed now.
    pub async fn list_clients(&self) -> Vec<ClientView> {
        let now = self.now();
        self.inner
            .stores
            .read()
            .await
            .registry
            .list(now, self.inner.config.online_window)
    }

    /// Removes a client from every store. Idempotent.
    pub async fn delete_client(&self, id: &str) -> bool {
        let removed = self.inner.stores.write().await.cascade_remove(id);
        if removed {
            info!("🗑️ Deleted client {}", id);
        }
        removed
    }

    /// Removes several clients. Returns how many of them held any state.
    pub async fn delete_clients<I, S>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut stores = self.inner.stores.write().await;
        let removed = ids
            .into_iter()
            .filter(|id| seen.insert(id.as_ref().to_string()))
            .filter(|id| stores.cascade_remove(id.as_ref()))
            .count();
        if removed > 0 {
            info!("🗑️ Deleted {} client(s)", removed);
        }
        removed
    }

    /// Records a chat line for a client.
    pub async fn append_chat(
        &self,
        id: &str,
        sender: &str,
        message: &str,
        is_admin: bool,
    ) -> RelayResult<()> {
        require("userid", id)?;
        require("sender", sender)?;
        require("message", message)?;
        let now = self.now();

        let mut stores = self.inner.stores.write().await;
        stores.chat.append(id, sender, message, is_admin, now);
        let action = if is_admin { "admin_message" } else { "message" };
        stores
            .logs
            .append(id, LogKind::Chat, action, format!("{sender}: {message}"), now);
        debug!("💬 Chat for client {} from {}", id, sender);
        Ok(())
    }

    pub async fn chat_history(&self, id: &str) -> Vec<ChatMessage> {
        self.inner.stores.read().await.chat.history(id)
    }

    /// Stores the outcome a client reported for an `execute` command.
    pub async fn set_exec_result(&self, id: &str, outcome: ExecOutcome) -> RelayResult<()> {
        require("userid", id)?;
        let now = self.now();
        let (action, details) = if outcome.success {
            ("succeeded", outcome.output.clone().unwrap_or_default())
        } else {
            ("failed", outcome.error.clone().unwrap_or_default())
        };

        let mut stores = self.inner.stores.write().await;
        stores.exec_results.set(id, outcome, now);
        stores
            .logs
            .append(id, LogKind::Execution, action, details, now);
        debug!("Execution result for client {}: {}", id, action);
        Ok(())
    }

    /// Takes the unread execution result for a client, if any.
    pub async fn take_exec_result(&self, id: &str) -> Option<ExecutionResult> {
        self.inner.stores.write().await.exec_results.take(id)
    }

    /// Audit log for a client, newest first.
    pub async fn logs(&self, id: &str) -> Vec<LogEntry> {
        self.inner.stores.read().await.logs.entries(id)
    }

    pub async fn health_snapshot(&self) -> HealthSnapshot {
        let now = self.now();
        let stores = self.inner.stores.read().await;
        HealthSnapshot {
            status: "ok".to_string(),
            client_count: stores.registry.len(),
            online_count: stores
                .registry
                .online_count(now, self.inner.config.online_window),
            pending_command_count: stores.mailbox.len(),
            uptime_secs: self.inner.started_at.elapsed().as_secs(),
        }
    }

    pub async fn stats(&self) -> RelayStats {
        let now = self.now();
        let stores = self.inner.stores.read().await;
        RelayStats {
            total_players: stores.registry.len(),
            online_players: stores
                .registry
                .online_count(now, self.inner.config.online_window),
            pending_commands: stores.mailbox.len(),
        }
    }

    /// Cascade-deletes every client unseen for longer than the client timeout.
    ///
    /// The same pass evicts orphaned state: commands, chat, results and logs
    /// kept for ids that never registered (or whose record is gone) once
    /// their last activity is older than the client timeout. Orphans that
    /// are still fresh are kept, so a command queued just before its client
    /// registers survives.
    ///
    /// # Returns
    ///
    /// The evicted ids, sorted.
    pub async fn sweep_expired(&self) -> Vec<ClientId> {
        let now = self.now();
        let timeout = self.inner.config.client_timeout;

        let mut stores = self.inner.stores.write().await;
        let expired = stores.registry.expired(now, timeout);
        let orphaned = stores.orphaned(now, timeout);
        for id in expired.iter().chain(&orphaned) {
            stores.cascade_remove(id);
        }
        drop(stores);

        if !expired.is_empty() {
            info!("🧹 Swept {} expired client(s): {:?}", expired.len(), expired);
        }
        if !orphaned.is_empty() {
            info!(
                "🧹 Swept stale state for {} unregistered id(s)",
                orphaned.len()
            );
        }

        let mut evicted = expired;
        evicted.extend(orphaned);
        evicted.sort();
        evicted
    }

    /// Discards execution results older than their TTL.
    pub async fn sweep_exec_results(&self) -> usize {
        let now = self.now();
        let removed = self
            .inner
            .stores
            .write()
            .await
            .exec_results
            .sweep(now, self.inner.config.exec_result_ttl);
        if removed > 0 {
            debug!("Discarded {} stale execution result(s)", removed);
        }
        removed
    }
}

fn require(field: &'static str, value: &str) -> RelayResult<()> {
    if value.trim().is_empty() {
        Err(RelayError::MissingField(field))
    } else {
        Ok(())
    }
}

/// Target ids in first-seen order without duplicates; rejects blank ids.
fn distinct_ids<I, S>(ids: I) -> RelayResult<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for id in ids {
        let id = id.as_ref();
        require("userid", id)?;
        if seen.insert(id.to_string()) {
            out.push(id.to_string());
        }
    }
    Ok(out)
}
