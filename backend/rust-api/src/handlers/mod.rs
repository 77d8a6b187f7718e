use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::sync::Arc;

use crate::metrics;
use crate::models::MCP_SERVER_NAME;
use crate::services::{orchestrator::OrchestratorError, AppState};

pub mod mcp;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "service": MCP_SERVER_NAME,
        "description": "AI-powered microlearning: bite-sized lessons, adaptive quizzes and progress tracking",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "skills": "GET /mcp/skills",
            "generate_lesson": "POST /mcp/lesson/generate",
            "narrate": "POST /mcp/lesson/narrate",
            "generate_quiz": "POST /mcp/quiz/generate",
            "submit_quiz": "POST /mcp/quiz/submit",
            "progress": "GET /mcp/progress/{user_id}?skill=",
            "stats": "GET /mcp/stats/{user_id}"
        }
    }))
}

/// Liveness. Upstream services are reported by configuration only; the
/// service stays usable without them.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let upstream_status = |configured: bool| {
        if configured {
            "configured"
        } else {
            "not_configured"
        }
    };

    let learners = state.progress.learner_count().await;
    let (lessons_cached, quizzes_cached) = state.content.sizes().await;

    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "skillsprout-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": {
                "azure_openai": upstream_status(state.config.azure_openai.is_configured()),
                "azure_speech": upstream_status(state.config.azure_speech.is_configured()),
            },
            "learners_tracked": learners,
            "lessons_cached": lessons_cached,
            "quizzes_cached": quizzes_cached
        })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// Protects /metrics with HTTP Basic Auth against `metrics_auth` ("user:password").
pub async fn metrics_auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let encoded = auth_header
        .strip_prefix("Basic ")
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let decoded = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    if credentials != state.config.metrics_auth {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    NotFound(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(format!("Validation error: {}", err))
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::LessonNotFound(_) | OrchestratorError::QuizNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        };
        let json_response = json!({
            "message": message,
            "status": status.as_u16()
        });
        (status, Json(json_response)).into_response()
    }
}
