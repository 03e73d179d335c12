//! Route handlers. Each one is a thin translation between JSON and a single
//! [`RelayService`] call.

use super::types::{
    required_id, Ack, ChatRequest, ClientActionRequest, CommandRequest, CountResponse,
    DeleteClientsRequest, ExecResultRequest, PlayersResponse, PollQuery, PolledCommand,
};
use crate::error::{RelayError, RelayResult};
use crate::registry::ClientView;
use crate::service::{HealthSnapshot, RelayService, RelayStats};
use crate::side_channel::{ChatMessage, LogEntry};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

const BANNER: &str = "\
Command relay is running.

  POST   /api                      register or heartbeat {action, userid, ...}
  GET    /api?userid=ID            poll the pending command
  GET    /api/players              list clients
  DELETE /api/players/ID           delete one client
  POST   /api/players/delete       delete clients {userids}
  POST   /api/command              queue a command {userids, command}
  GET    /api/stats                counters
  POST   /api/chat                 append chat {userid, sender, message}
  GET    /api/chat/ID              chat history
  POST   /api/exec-result          report execution {userid, success, ...}
  GET    /api/exec-result/ID       take execution result
  GET    /api/logs/ID              audit log
  GET    /health                   health
";

pub async fn banner() -> &'static str {
    BANNER
}

pub async fn health(State(service): State<RelayService>) -> Json<HealthSnapshot> {
    Json(service.health_snapshot().await)
}

pub async fn client_action(
    State(service): State<RelayService>,
    Json(request): Json<ClientActionRequest>,
) -> RelayResult<Json<Ack>> {
    let id = required_id(request.userid)?;
    let success = match request.action.as_deref() {
        Some("register") => {
            service.register(&id, request.metadata).await?;
            true
        }
        Some("heartbeat") => service.heartbeat(&id).await?,
        Some(other) => {
            return Err(RelayError::InvalidCommand(format!(
                "unknown action '{other}'"
            )))
        }
        None => return Err(RelayError::MissingField("action")),
    };
    Ok(Json(Ack { success }))
}

pub async fn poll(
    State(service): State<RelayService>,
    Query(query): Query<PollQuery>,
) -> RelayResult<Response> {
    let id = query.userid.unwrap_or_default();
    let response = match service.poll_command(&id).await? {
        Some(command) => Json(PolledCommand {
            command: command.name(),
            payload: &command,
        })
        .into_response(),
        None => Json(json!({})).into_response(),
    };
    Ok(response)
}

pub async fn list_players(State(service): State<RelayService>) -> Json<PlayersResponse> {
    let players: Vec<ClientView> = service.list_clients().await;
    Json(PlayersResponse { players })
}

pub async fn delete_player(
    State(service): State<RelayService>,
    Path(id): Path<String>,
) -> Json<Ack> {
    let success = service.delete_client(&id).await;
    Json(Ack { success })
}

pub async fn delete_players(
    State(service): State<RelayService>,
    Json(request): Json<DeleteClientsRequest>,
) -> Json<CountResponse> {
    let ids: Vec<String> = request.userids.into_iter().map(String::from).collect();
    let count = service.delete_clients(ids).await;
    Json(CountResponse {
        success: true,
        count,
    })
}

pub async fn enqueue_command(
    State(service): State<RelayService>,
    Json(request): Json<CommandRequest>,
) -> RelayResult<Json<CountResponse>> {
    let (targets, command) = request.into_parts()?;
    let count = service.enqueue_command(targets, command).await?;
    Ok(Json(CountResponse {
        success: true,
        count,
    }))
}

pub async fn stats(State(service): State<RelayService>) -> Json<RelayStats> {
    Json(service.stats().await)
}

pub async fn append_chat(
    State(service): State<RelayService>,
    Json(request): Json<ChatRequest>,
) -> RelayResult<Json<Ack>> {
    let id = required_id(request.userid)?;
    service
        .append_chat(&id, &request.sender, &request.message, request.is_admin)
        .await?;
    Ok(Json(Ack { success: true }))
}

pub async fn chat_history(
    State(service): State<RelayService>,
    Path(id): Path<String>,
) -> Json<Vec<ChatMessage>> {
    Json(service.chat_history(&id).await)
}

pub async fn set_exec_result(
    State(service): State<RelayService>,
    Json(request): Json<ExecResultRequest>,
) -> RelayResult<Json<Ack>> {
    let id = required_id(request.userid)?;
    service.set_exec_result(&id, request.outcome).await?;
    Ok(Json(Ack { success: true }))
}

pub async fn take_exec_result(
    State(service): State<RelayService>,
    Path(id): Path<String>,
) -> Response {
    match service.take_exec_result(&id).await {
        Some(result) => Json(result).into_response(),
        None => Json(json!({})).into_response(),
    }
}

pub async fn logs(
    State(service): State<RelayService>,
    Path(id): Path<String>,
) -> Json<Vec<LogEntry>> {
    Json(service.logs(&id).await)
}
