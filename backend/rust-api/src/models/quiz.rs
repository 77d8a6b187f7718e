use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{gamification::Achievement, DegradedNotice, Difficulty, Recommendation};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub kind: QuestionKind,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub lesson_id: String,
    pub lesson_title: String,
    pub skill: String,
    pub difficulty: Difficulty,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
}

/// Question as shown to the learner, without the answer key.
#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub number: usize,
    pub kind: QuestionKind,
    pub question: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl QuestionView {
    pub fn from_question(number: usize, question: &Question) -> Self {
        Self {
            number,
            kind: question.kind,
            question: question.question.clone(),
            options: question.options.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateQuizRequest {
    #[serde(default = "super::lesson::default_user_id")]
    #[validate(length(min = 1, max = 200, message = "user_id must not be empty"))]
    pub user_id: String,

    #[validate(length(min = 1, message = "lesson_id must not be empty"))]
    pub lesson_id: String,

    pub difficulty: Option<Difficulty>,

    #[validate(range(min = 1, max = 10, message = "question_count must be between 1 and 10"))]
    pub question_count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct GenerateQuizResponse {
    pub quiz_id: String,
    pub lesson_id: String,
    pub lesson_title: String,
    pub skill: String,
    pub difficulty: Difficulty,
    pub questions: Vec<QuestionView>,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<DegradedNotice>,
    pub instructions: &'static str,
    pub mcp_server: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuizSubmission {
    #[validate(length(min = 1, max = 200, message = "user_id must not be empty"))]
    pub user_id: String,

    #[validate(length(min = 1, message = "quiz_id must not be empty"))]
    pub quiz_id: String,

    pub answers: Vec<String>,

    #[validate(length(
        min = 1,
        max = 200,
        message = "Skill must be between 1 and 200 characters"
    ))]
    pub skill: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionResult {
    pub number: usize,
    pub question: String,
    pub your_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
    pub explanation: String,
}

/// Score for a single submission before it is recorded.
#[derive(Debug, Clone)]
pub struct QuizScore {
    pub score: u8,
    pub correct_answers: usize,
    pub total_questions: usize,
    pub results: Vec<QuestionResult>,
}

#[derive(Debug, Serialize)]
pub struct UpdatedProgress {
    pub lessons_completed: u32,
    pub average_score: f64,
    pub mastery: f64,
    pub current_difficulty: Difficulty,
    pub streak_days: u32,
}

#[derive(Debug, Serialize)]
pub struct QuizSubmissionResponse {
    pub user_id: String,
    pub quiz_id: String,
    pub skill: String,
    pub score: u8,
    pub passed: bool,
    pub feedback: String,
    pub correct_answers: usize,
    pub total_questions: usize,
    pub results: Vec<QuestionResult>,
    pub updated_progress: UpdatedProgress,
    pub recommendation: Recommendation,
    pub new_achievements: Vec<Achievement>,
    pub total_points: u32,
    pub level: u32,
    pub mcp_server: &'static str,
    pub timestamp: DateTime<Utc>,
}
