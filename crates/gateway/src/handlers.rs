//! Route handlers and wire types

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use parlance_agent::{AgentError, AgentInfo, ToolDescription};
use parlance_session::{SessionError, Turn};

use crate::GatewayState;

// --- Wire types ---

fn default_session_id() -> String {
    "default".to_string()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub used_tool: bool,
    pub tool_name: Option<String>,
    pub session_id: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
    pub version: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ToolListResponse {
    pub tools: Vec<ToolDescription>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// --- Errors ---

/// Error returned to HTTP clients as `{"error": ...}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        let status = match &e {
            AgentError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AgentError::Completion(_) => StatusCode::BAD_GATEWAY,
            AgentError::ToolNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "{}", self.message);
        } else {
            warn!(status = %self.status, "{}", self.message);
        }
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

// --- Handlers ---

fn running() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        message: "Parlance agent is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn root_handler() -> Json<StatusResponse> {
    running()
}

pub async fn health_handler() -> Json<StatusResponse> {
    running()
}

pub async fn chat_handler(
    State(state): State<GatewayState>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = request?;
    let exchange = state
        .agent
        .process(&request.session_id, &request.message)
        .await?;

    Ok(Json(ChatResponse {
        response: exchange.response,
        used_tool: exchange.used_tool,
        tool_name: exchange.tool_name,
        session_id: exchange.session_id,
    }))
}

pub async fn list_sessions_handler(State(state): State<GatewayState>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.agent.sessions().list().await,
    })
}

pub async fn get_session_handler(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let shared = state
        .agent
        .sessions()
        .get(&id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Session '{id}' not found")))?;

    let session = shared.lock().await;
    Ok(Json(SessionResponse {
        session_id: id,
        turns: session.history().to_vec(),
    }))
}

pub async fn delete_session_handler(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    if state.agent.sessions().remove(&id).await? {
        Ok(Json(MessageResponse {
            message: format!("Session '{id}' deleted"),
        }))
    } else {
        Err(ApiError::not_found(format!("Session '{id}' not found")))
    }
}

pub async fn agent_info_handler(State(state): State<GatewayState>) -> Json<AgentInfo> {
    Json(state.agent.info(None).await)
}

pub async fn session_info_handler(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Json<AgentInfo> {
    Json(state.agent.info(Some(&id)).await)
}

pub async fn list_tools_handler(State(state): State<GatewayState>) -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: state.agent.registry().descriptions(),
    })
}
