use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{DegradedNotice, Difficulty, DEFAULT_USER_ID};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub skill: String,
    pub difficulty: Difficulty,
    pub title: String,
    pub content: String,
    pub duration_minutes: u32,
    pub key_concepts: Vec<String>,
    pub practice_items: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LessonRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Skill must be between 1 and 200 characters"
    ))]
    pub skill: String,

    #[serde(default = "default_user_id")]
    #[validate(length(min = 1, max = 200, message = "user_id must not be empty"))]
    pub user_id: String,

    /// Falls back to the learner's current level when omitted
    pub difficulty: Option<Difficulty>,

    /// Free-text learner context ("I already know loops", ...)
    #[validate(length(max = 2000, message = "Context must be at most 2000 characters"))]
    pub context: Option<String>,

    #[serde(default)]
    pub narrate: bool,
}

pub(crate) fn default_user_id() -> String {
    DEFAULT_USER_ID.to_string()
}

#[derive(Debug, Serialize)]
pub struct UserContext {
    pub user_id: String,
    pub current_difficulty: Difficulty,
    pub lessons_completed: u32,
}

#[derive(Debug, Serialize)]
pub struct LessonResponse {
    pub lesson: Lesson,
    pub user_context: UserContext,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<DegradedNotice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration: Option<NarrationBlock>,
    pub mcp_server: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Audio attached to a lesson, or the reason it is text-only.
#[derive(Debug, Serialize)]
pub struct NarrationBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<DegradedNotice>,
}
