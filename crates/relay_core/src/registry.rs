//! Client registry and liveness tracking.
//!
//! The registry keeps the last-known record of every client that registered
//! with the relay. Online status is never stored: it is recomputed from the
//! last-seen timestamp on every read, so a client that stops heartbeating is
//! reported offline as soon as its liveness window elapses, without waiting
//! for the sweeper.

use crate::wire::opt_string_or_number;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Client identifiers are supplied by the clients themselves and treated as
/// opaque strings.
pub type ClientId = String;

/// Free-form metadata reported by a client on registration.
///
/// None of these fields are validated; they are stored and echoed back as-is.
/// Numeric values (a place id, for example) are kept as their decimal text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMetadata {
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub executor: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub ip: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub game: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub game_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub job_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub country: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub region: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub city: Option<String>,
}

/// Stored state for one client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientRecord {
    pub id: ClientId,
    pub metadata: ClientMetadata,
    /// First registration time, kept across re-registrations
    pub first_seen_at: u64,
    /// Last registration or heartbeat time
    pub last_seen_at: u64,
}

impl ClientRecord {
    fn new(id: ClientId, metadata: ClientMetadata, now: u64) -> Self {
        Self {
            id,
            metadata,
            first_seen_at: now,
            last_seen_at: now,
        }
    }

    /// Milliseconds since the client was last seen. Zero if the clock went
    /// backwards.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_seen_at)
    }

    /// Online iff the last sighting is strictly inside the window.
    pub fn is_online(&self, now: u64, window: Duration) -> bool {
        (self.age_ms(now) as u128) < window.as_millis()
    }

    /// Expired iff the last sighting is strictly older than the timeout.
    pub fn is_expired(&self, now: u64, timeout: Duration) -> bool {
        (self.age_ms(now) as u128) > timeout.as_millis()
    }

    /// Read-time snapshot with status derived from `now`.
    pub fn view(&self, now: u64, window: Duration) -> ClientView {
        ClientView {
            id: self.id.clone(),
            metadata: self.metadata.clone(),
            online: self.is_online(now, window),
            last_heartbeat: self.last_seen_at,
            registered_at: self.first_seen_at,
        }
    }
}

/// A client record as reported to administrators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientView {
    #[serde(rename = "userid")]
    pub id: ClientId,
    #[serde(flatten)]
    pub metadata: ClientMetadata,
    pub online: bool,
    pub last_heartbeat: u64,
    pub registered_at: u64,
}

/// Registry of known clients keyed by id.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, ClientRecord>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the record for `id` and marks it seen at `now`.
    ///
    /// The first-seen timestamp survives re-registration. Returns `true` when
    /// the id was not known before.
    pub fn upsert(&mut self, id: &str, metadata: ClientMetadata, now: u64) -> bool {
        match self.clients.get_mut(id) {
            Some(record) => {
                record.metadata = metadata;
                record.last_seen_at = record.last_seen_at.max(now);
                false
            }
            None => {
                self.clients
                    .insert(id.to_string(), ClientRecord::new(id.to_string(), metadata, now));
                true
            }
        }
    }

    /// Refreshes the last-seen time of an existing client.
    ///
    /// Returns `false` for unknown ids; no record is created.
    pub fn touch(&mut self, id: &str, now: u64) -> bool {
        if let Some(record) = self.clients.get_mut(id) {
            record.last_seen_at = record.last_seen_at.max(now);
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: &str) -> Option<&ClientRecord> {
        self.clients.get(id)
    }

    /// Snapshot of every client with status recomputed at `now`, ordered by id.
    pub fn list(&self, now: u64, window: Duration) -> Vec<ClientView> {
        let mut views: Vec<ClientView> = self
            .clients
            .values()
            .map(|record| record.view(now, window))
            .collect();
        views.sort_by(|a, b| a.id.cmp(&b.id));
        views
    }

    /// Removes a client. Idempotent; returns whether a record existed.
    pub fn remove(&mut self, id: &str) -> bool {
        self.clients.remove(id).is_some()
    }

    /// Ids whose last sighting is older than `timeout`.
    pub fn expired(&self, now: u64, timeout: Duration) -> Vec<ClientId> {
        self.clients
            .values()
            .filter(|record| record.is_expired(now, timeout))
            .map(|record| record.id.clone())
            .collect()
    }

    pub fn online_count(&self, now: u64, window: Duration) -> usize {
        self.clients
            .values()
            .filter(|record| record.is_online(now, window))
            .count()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
