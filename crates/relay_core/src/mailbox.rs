//! Single-slot command mailbox.
//!
//! Each client has room for exactly one pending command. Enqueueing replaces
//! whatever was waiting and a poll takes the command out, so a command is
//! delivered to at most one poll and never queued behind another.

use crate::command::Command;
use crate::registry::ClientId;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct CommandMailbox {
    pending: HashMap<ClientId, Command>,
}

impl CommandMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `command` as the only pending command for `id`.
    ///
    /// Returns the undelivered command it replaced, if any.
    pub fn enqueue(&mut self, id: &str, command: Command) -> Option<Command> {
        self.pending.insert(id.to_string(), command)
    }

    /// Takes the pending command for `id`, leaving the slot empty.
    pub fn dequeue(&mut self, id: &str) -> Option<Command> {
        self.pending.remove(id)
    }

    pub fn peek(&self, id: &str) -> Option<&Command> {
        self.pending.get(id)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.pending.remove(id).is_some()
    }

    /// Ids with a pending command.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.pending.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
