use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_LEVEL: u32 = 10;
pub const POINTS_PER_LEVEL: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerStats {
    pub total_points: u32,
    pub level: u32,
    pub achievements: Vec<String>,
    pub streak_days: u32,
    pub total_lessons: u32,
    pub total_quizzes: u32,
    pub correct_answers: u32,
    /// Quizzes submitted on the calendar day of `last_activity`
    pub quizzes_today: u32,
    pub last_activity: Option<DateTime<Utc>>,
}

impl Default for LearnerStats {
    fn default() -> Self {
        Self {
            total_points: 0,
            level: 1,
            achievements: Vec::new(),
            streak_days: 0,
            total_lessons: 0,
            total_quizzes: 0,
            correct_answers: 0,
            quizzes_today: 0,
            last_activity: None,
        }
    }
}

impl LearnerStats {
    pub fn add_points(&mut self, points: u32) {
        self.total_points = self.total_points.saturating_add(points);
        self.level = (1 + self.total_points / POINTS_PER_LEVEL).min(MAX_LEVEL);
    }

    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a == id)
    }
}

#[derive(Debug, Serialize)]
pub struct AchievementStatus {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub unlocked: bool,
}

#[derive(Debug, Serialize)]
pub struct LearnerStatsResponse {
    pub user_id: String,
    pub stats: LearnerStats,
    pub achievements: Vec<AchievementStatus>,
    pub mcp_server: &'static str,
    pub timestamp: DateTime<Utc>,
}
