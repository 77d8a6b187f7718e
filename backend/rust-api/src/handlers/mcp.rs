use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use super::ApiError;
use crate::{
    extractors::AppJson,
    models::{
        gamification::LearnerStatsResponse,
        lesson::{LessonRequest, LessonResponse},
        narration::{NarrationRequest, NarrationResponse},
        progress::ProgressQuery,
        quiz::{GenerateQuizRequest, GenerateQuizResponse, QuizSubmission, QuizSubmissionResponse},
        PREDEFINED_SKILLS,
    },
    services::{orchestrator::Orchestrator, AppState},
};

/// GET /mcp/skills
pub async fn list_skills() -> impl IntoResponse {
    Json(json!({
        "predefined_skills": PREDEFINED_SKILLS,
        "custom_skills_supported": true,
        "message": "Choose a predefined skill or name any skill you want to learn"
    }))
}

/// POST /mcp/lesson/generate
pub async fn generate_lesson(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LessonRequest>,
) -> Result<Json<LessonResponse>, ApiError> {
    req.validate()?;
    if req.skill.trim().is_empty() {
        return Err(ApiError::validation("Skill must not be blank"));
    }

    tracing::info!(user_id = %req.user_id, skill = %req.skill, "Lesson requested");

    let response = Orchestrator::new(&state).start_lesson(req).await;
    Ok(Json(response))
}

/// POST /mcp/lesson/narrate
pub async fn narrate_lesson(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<NarrationRequest>,
) -> Result<Json<NarrationResponse>, ApiError> {
    req.validate()?;
    if req.text.trim().is_empty() {
        return Err(ApiError::validation("Text must not be blank"));
    }

    let response = Orchestrator::new(&state)
        .narration_response(&req.text, req.voice.as_deref())
        .await;
    Ok(Json(response))
}

/// POST /mcp/quiz/generate
pub async fn generate_quiz(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<GenerateQuizRequest>,
) -> Result<Json<GenerateQuizResponse>, ApiError> {
    req.validate()?;

    tracing::info!(user_id = %req.user_id, lesson_id = %req.lesson_id, "Quiz requested");

    let response = Orchestrator::new(&state).prepare_quiz(req).await?;
    Ok(Json(response))
}

/// POST /mcp/quiz/submit
pub async fn submit_quiz(
    State(state): State<Arc<AppState>>,
    AppJson(submission): AppJson<QuizSubmission>,
) -> Result<Json<QuizSubmissionResponse>, ApiError> {
    submission.validate()?;
    if submission.skill.trim().is_empty() {
        return Err(ApiError::validation("Skill must not be blank"));
    }

    tracing::info!(
        user_id = %submission.user_id,
        quiz_id = %submission.quiz_id,
        answers = submission.answers.len(),
        "Quiz submitted"
    );

    let response = Orchestrator::new(&state).submit_quiz(submission).await?;
    Ok(Json(response))
}

/// GET /mcp/progress/{user_id}?skill=
///
/// With `skill`, a single-skill snapshot; otherwise every skill the learner
/// has touched. Unknown learners get an empty snapshot.
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<ProgressQuery>,
) -> Result<Response, ApiError> {
    let orchestrator = Orchestrator::new(&state);

    match query.skill.as_deref().map(str::trim) {
        Some("") => Err(ApiError::validation("Skill must not be blank")),
        Some(skill) => {
            let response = orchestrator.skill_progress(&user_id, skill).await;
            Ok(Json(response).into_response())
        }
        None => {
            let response = orchestrator.all_progress(&user_id).await;
            Ok(Json(response).into_response())
        }
    }
}

/// GET /mcp/stats/{user_id}
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Json<LearnerStatsResponse> {
    Json(Orchestrator::new(&state).learner_stats(&user_id).await)
}
