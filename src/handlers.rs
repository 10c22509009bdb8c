use crate::app::AppState;
use crate::completion::persona_conversation;
use crate::error::{AppError, AppResult};
use crate::models::{AskRequest, AskResponse, HealthResponse};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::Json as ResponseJson;
use tracing::{debug, info};

/// Health check handler
/// Returns the service status and health information
pub async fn health_check() -> AppResult<ResponseJson<HealthResponse>> {
    debug!("Health check endpoint called");

    let response = HealthResponse::ok();

    Ok(ResponseJson(response))
}

/// Ask handler for answering user questions in the configured persona.
///
/// A missing or malformed body is folded into the same rejection as an empty
/// question, so the extractor rejection is taken as a value rather than
/// short-circuiting with axum's default response.
pub async fn ask_handler(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> AppResult<ResponseJson<AskResponse>> {
    let question = payload
        .ok()
        .and_then(|Json(request)| request.trimmed_question().map(str::to_string));

    let Some(question) = question else {
        return Err(AppError::ValidationError("No question provided".to_string()));
    };

    info!("Ask endpoint called with question: {}", question);

    let answer = state
        .completion
        .complete(persona_conversation(&question))
        .await?;

    info!("Successfully answered question, returning response");
    Ok(ResponseJson(AskResponse::new(answer)))
}
