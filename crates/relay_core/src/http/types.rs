//! Request and response bodies for the JSON API.

use crate::command::Command;
use crate::error::{RelayError, RelayResult};
use crate::registry::{ClientMetadata, ClientView};
use crate::side_channel::ExecOutcome;
use crate::wire::{opt_string_or_number, WireId};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// `POST /api`: registration and heartbeat from a client.
#[derive(Debug, Deserialize)]
pub struct ClientActionRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub userid: Option<WireId>,
    #[serde(flatten)]
    pub metadata: ClientMetadata,
}

/// `GET /api?userid=`
#[derive(Debug, Deserialize)]
pub struct PollQuery {
    #[serde(default)]
    pub userid: Option<String>,
}

/// `POST /api/command`, in either the typed or the flat legacy form.
///
/// ```json
/// { "userids": ["100", "200"], "command": { "type": "action", "action": "kick" } }
/// { "userid": 100, "command": "freeze", "reason": "spamming" }
/// ```
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub userids: Option<Vec<WireId>>,
    #[serde(default)]
    pub userid: Option<WireId>,
    #[serde(default)]
    pub command: Option<serde_json::Value>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(
        default,
        rename = "assetId",
        deserialize_with = "opt_string_or_number"
    )]
    pub asset_id: Option<String>,
}

impl CommandRequest {
    /// Resolves the target ids and the command payload.
    pub fn into_parts(self) -> RelayResult<(Vec<String>, Command)> {
        let mut targets: Vec<String> = self
            .userids
            .unwrap_or_default()
            .into_iter()
            .map(String::from)
            .collect();
        if let Some(id) = self.userid {
            targets.push(id.into());
        }

        let command = match self.command {
            Some(serde_json::Value::String(name)) => {
                Command::from_legacy(&name, self.reason, self.asset_id)?
            }
            Some(value @ serde_json::Value::Object(_)) => serde_json::from_value(value)
                .map_err(|e| RelayError::InvalidCommand(e.to_string()))?,
            Some(serde_json::Value::Null) | None => {
                return Err(RelayError::MissingField("command"))
            }
            Some(other) => {
                return Err(RelayError::InvalidCommand(format!(
                    "expected a command name or object, got {other}"
                )))
            }
        };
        Ok((targets, command))
    }
}

/// `POST /api/players/delete`
#[derive(Debug, Deserialize)]
pub struct DeleteClientsRequest {
    #[serde(default)]
    pub userids: Vec<WireId>,
}

/// `POST /api/chat`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub userid: Option<WireId>,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// `POST /api/exec-result`
#[derive(Debug, Deserialize)]
pub struct ExecResultRequest {
    #[serde(default)]
    pub userid: Option<WireId>,
    #[serde(flatten)]
    pub outcome: ExecOutcome,
}

#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub success: bool,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct PlayersResponse {
    pub players: Vec<ClientView>,
}

/// A delivered command with its name repeated under `command`, which is the
/// key older clients dispatch on.
#[derive(Debug, Serialize)]
pub struct PolledCommand<'a> {
    pub command: &'a str,
    #[serde(flatten)]
    pub payload: &'a Command,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        if self.is_client_error() {
            warn!("Rejected request: {}", self);
            let body = ErrorBody {
                success: false,
                error: self.to_string(),
            };
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        } else {
            error!("Request failed: {}", self);
            let body = ErrorBody {
                success: false,
                error: "internal server error".to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// Extracts a required id, treating absence like a blank id.
pub(crate) fn required_id(id: Option<WireId>) -> RelayResult<String> {
    id.map(String::from)
        .filter(|id| !id.trim().is_empty())
        .ok_or(RelayError::MissingField("userid"))
}
