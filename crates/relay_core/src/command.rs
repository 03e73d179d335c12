//! Command payloads delivered to clients.
//!
//! Commands are a closed set of variants, serialized with a `type` tag so a
//! polling client can dispatch on it:
//!
//! ```json
//! { "type": "action", "action": "kick", "reason": "afk" }
//! { "type": "teleport", "x": 0.0, "y": 10.0, "z": -4.5 }
//! ```

use crate::error::{RelayError, RelayResult};
use crate::wire::string_or_number;
use serde::{Deserialize, Serialize};

/// An administrator-issued instruction for a single client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// A named action with no parameters (kick, freeze, respawn, ...).
    Action {
        action: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// A chat line to display on the client.
    Chat { message: String, sender: String },
    /// Raw code for the client to execute.
    Execute { code: String },
    /// Sets the client's movement speed.
    WalkSpeed { speed: f64 },
    /// Moves the client to a position.
    Teleport { x: f64, y: f64, z: f64 },
    /// A named action referencing an asset (sound, animation, ...).
    PlayAsset {
        action: String,
        #[serde(rename = "assetId", deserialize_with = "string_or_number")]
        asset_id: String,
    },
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &str {
        match self {
            Command::Action { action, .. } => action,
            Command::Chat { .. } => "chat",
            Command::Execute { .. } => "execute",
            Command::WalkSpeed { .. } => "walkspeed",
            Command::Teleport { .. } => "teleport",
            Command::PlayAsset { action, .. } => action,
        }
    }

    /// Rejects payloads that would be meaningless to a client.
    pub fn validate(&self) -> RelayResult<()> {
        match self {
            Command::Action { action, .. } => non_blank(action, "action"),
            Command::Chat { message, sender } => {
                non_blank(message, "message")?;
                non_blank(sender, "sender")
            }
            Command::Execute { code } => non_blank(code, "code"),
            Command::WalkSpeed { speed } => {
                if speed.is_finite() && *speed >= 0.0 {
                    Ok(())
                } else {
                    Err(RelayError::InvalidCommand(format!(
                        "speed must be a non-negative number, got {speed}"
                    )))
                }
            }
            Command::Teleport { x, y, z } => {
                if [x, y, z].iter().all(|v| v.is_finite()) {
                    Ok(())
                } else {
                    Err(RelayError::InvalidCommand(
                        "coordinates must be finite numbers".to_string(),
                    ))
                }
            }
            Command::PlayAsset { action, asset_id } => {
                non_blank(action, "action")?;
                non_blank(asset_id, "assetId")
            }
        }
    }

    /// Builds a command from the flat `{command, reason, assetId}` form that
    /// older admin panels send.
    pub fn from_legacy(
        command: &str,
        reason: Option<String>,
        asset_id: Option<String>,
    ) -> RelayResult<Self> {
        let action = command.trim();
        if action.is_empty() {
            return Err(RelayError::MissingField("command"));
        }
        let asset_id = asset_id.filter(|a| !a.trim().is_empty());
        let command = match asset_id {
            Some(asset_id) => Command::PlayAsset {
                action: action.to_string(),
                asset_id,
            },
            None => Command::Action {
                action: action.to_string(),
                reason: reason.filter(|r| !r.trim().is_empty()),
            },
        };
        Ok(command)
    }
}

fn non_blank(value: &str, field: &str) -> RelayResult<()> {
    if value.trim().is_empty() {
        Err(RelayError::InvalidCommand(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}
