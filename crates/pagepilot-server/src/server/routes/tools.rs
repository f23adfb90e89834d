use super::super::dto::ToolsResponse;
use super::super::state::AppState;
use crate::auth::AuthenticatedSession;
use axum::Json;
use axum::extract::State;
use std::sync::Arc;
use tracing::debug;

pub(crate) async fn tools_handler(
    State(state): State<Arc<AppState>>,
    session: AuthenticatedSession,
) -> Json<ToolsResponse> {
    let tools = state.agent().tool_definitions();
    debug!(session = %session.0, tool_count = tools.len(), "serving /api/tools");
    Json(ToolsResponse { tools })
}
