use super::super::dto::{ChatRequestBody, ChatResponseBody};
use super::super::error::ApiError;
use super::super::state::AppState;
use crate::auth::AuthenticatedSession;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use pagepilot_agent::ChatRequest;
use std::sync::Arc;
use tracing::{error, info, warn};

pub(crate) async fn chat_handler(
    State(state): State<Arc<AppState>>,
    session: AuthenticatedSession,
    payload: Result<Json<ChatRequestBody>, JsonRejection>,
) -> Result<Json<ChatResponseBody>, ApiError> {
    let Json(ChatRequestBody { message, thread_id }) = payload.map_err(|rejection| {
        warn!(session = %session.0, error = %rejection.body_text(), "rejecting malformed /api/chat body");
        ApiError::bad_request(rejection.body_text())
    })?;

    info!(
        session = %session.0,
        thread_id = thread_id.as_deref(),
        "received /api/chat request"
    );

    let request = ChatRequest {
        message,
        thread_id,
        session_key: Some(session.conversation_key()),
    };
    let cancel = state.request_token();

    match state.agent().chat(request, &cancel).await {
        Ok(reply) => {
            info!(
                session = %session.0,
                thread_id = %reply.thread_id,
                run_id = %reply.run_id,
                tool_calls = reply.tool_calls,
                "chat request completed"
            );
            Ok(Json(ChatResponseBody {
                thread_id: reply.thread_id,
                message: reply.message,
            }))
        }
        Err(agent_error) => {
            if agent_error.is_client_error() {
                warn!(session = %session.0, error = %agent_error, "rejecting /api/chat request");
            } else {
                error!(
                    session = %session.0,
                    thread_id = agent_error.thread_id(),
                    last_status = agent_error.last_status().map(|status| status.as_str()),
                    error = %agent_error,
                    "chat request failed"
                );
            }
            Err(ApiError::from(agent_error))
        }
    }
}
