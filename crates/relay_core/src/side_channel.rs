//! Per-client side channels: audit log, chat history and execution results.
//!
//! The audit log and chat history are bounded sequences. The audit log keeps
//! the newest entry first and drops from the tail; chat keeps arrival order and
//! drops the oldest message. Execution results follow the same read-once,
//! single-slot contract as the command mailbox, with a TTL so unread results
//! do not linger.

use crate::registry::ClientId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Category of an audit log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Connection,
    Command,
    Execution,
    Chat,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: u64,
    pub kind: LogKind,
    pub action: String,
    pub details: String,
}

/// Newest-first bounded audit log per client.
#[derive(Debug)]
pub struct AuditLog {
    cap: usize,
    entries: HashMap<ClientId, VecDeque<LogEntry>>,
}

impl AuditLog {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            entries: HashMap::new(),
        }
    }

    pub fn append(&mut self, id: &str, kind: LogKind, action: &str, details: String, now: u64) {
        let log = self.entries.entry(id.to_string()).or_default();
        log.push_front(LogEntry {
            timestamp: now,
            kind,
            action: action.to_string(),
            details,
        });
        log.truncate(self.cap);
    }

    /// Entries for `id`, newest first. Empty when none exist.
    pub fn entries(&self, id: &str) -> Vec<LogEntry> {
        self.entries
            .get(id)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Timestamp of the newest entry for `id`.
    pub fn latest(&self, id: &str) -> Option<u64> {
        self.entries
            .get(id)
            .and_then(|log| log.front())
            .map(|entry| entry.timestamp)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub timestamp: u64,
    pub sender: String,
    pub message: String,
    pub is_admin: bool,
}

/// Bounded chat history per client, oldest first.
#[derive(Debug)]
pub struct ChatHistory {
    cap: usize,
    messages: HashMap<ClientId, VecDeque<ChatMessage>>,
}

impl ChatHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            messages: HashMap::new(),
        }
    }

    pub fn append(&mut self, id: &str, sender: &str, message: &str, is_admin: bool, now: u64) {
        let history = self.messages.entry(id.to_string()).or_default();
        history.push_back(ChatMessage {
            timestamp: now,
            sender: sender.to_string(),
            message: message.to_string(),
            is_admin,
        });
        while history.len() > self.cap {
            history.pop_front();
        }
    }

    /// Messages for `id` in arrival order. Empty when none exist.
    pub fn history(&self, id: &str) -> Vec<ChatMessage> {
        self.messages
            .get(id)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.messages.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

/// What a client reported after running an `execute` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub recorded_at: u64,
    #[serde(flatten)]
    pub outcome: ExecOutcome,
}

/// Single-slot, read-once execution results.
#[derive(Debug, Default)]
pub struct ExecResults {
    results: HashMap<ClientId, ExecutionResult>,
}

impl ExecResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any unread result for `id`.
    pub fn set(&mut self, id: &str, outcome: ExecOutcome, now: u64) {
        self.results.insert(
            id.to_string(),
            ExecutionResult {
                recorded_at: now,
                outcome,
            },
        );
    }

    pub fn take(&mut self, id: &str) -> Option<ExecutionResult> {
        self.results.remove(id)
    }

    /// Drops results recorded more than `ttl` ago. Returns how many went.
    pub fn sweep(&mut self, now: u64, ttl: Duration) -> usize {
        let before = self.results.len();
        let ttl_ms = ttl.as_millis();
        self.results
            .retain(|_, result| (now.saturating_sub(result.recorded_at) as u128) <= ttl_ms);
        before - self.results.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(String::as_str)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.results.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_log_newest_first_and_capped() {
        let mut log = AuditLog::new(3);
        for i in 0..10u64 {
            log.append("100", LogKind::Command, "queued", format!("#{i}"), i);
        }

        let entries = log.entries("100");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].details, "#9");
        assert_eq!(entries[2].details, "#7");
    }

    #[test]
    fn test_chat_history_drops_oldest() {
        let mut chat = ChatHistory::new(2);
        chat.append("100", "Alice", "one", false, 1);
        chat.append("100", "admin", "two", true, 2);
        chat.append("100", "Alice", "three", false, 3);

        let history = chat.history("100");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message, "two");
        assert!(history[0].is_admin);
        assert_eq!(history[1].message, "three");
    }

    #[test]
    fn test_audit_log_latest() {
        let mut log = AuditLog::new(2);
        assert_eq!(log.latest("100"), None);

        log.append("100", LogKind::Chat, "message", String::new(), 5);
        log.append("100", LogKind::Chat, "message", String::new(), 9);
        assert_eq!(log.latest("100"), Some(9));
        assert_eq!(log.ids().collect::<Vec<_>>(), vec!["100"]);
    }

    #[test]
    fn test_history_of_unknown_client_is_empty() {
        let chat = ChatHistory::new(10);
        let log = AuditLog::new(10);
        assert!(chat.history("nobody").is_empty());
        assert!(log.entries("nobody").is_empty());
    }

    #[test]
    fn test_exec_result_read_once() {
        let mut results = ExecResults::new();
        let outcome = ExecOutcome {
            success: true,
            output: Some("ok".into()),
            error: None,
        };
        results.set("100", outcome.clone(), 1_000);

        let taken = results.take("100").unwrap();
        assert_eq!(taken.outcome, outcome);
        assert_eq!(taken.recorded_at, 1_000);
        assert!(results.take("100").is_none());
    }

    #[test]
    fn test_exec_result_ttl_sweep() {
        let mut results = ExecResults::new();
        let failed = ExecOutcome {
            success: false,
            output: None,
            error: Some("attempt to index nil".into()),
        };
        results.set("old", failed.clone(), 0);
        results.set("new", failed, 200_000);

        let ttl = Duration::from_secs(300);
        assert_eq!(results.sweep(300_000, ttl), 0);
        assert_eq!(results.sweep(300_001, ttl), 1);
        assert!(results.take("old").is_none());
        assert!(results.take("new").is_some());
    }
}
