use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::{gamification::LearnerStats, Difficulty, Recommendation};

/// Number of lesson titles fed back into the next lesson prompt.
pub const RECENT_LESSONS_KEPT: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProgress {
    pub user_id: String,
    pub skills: BTreeMap<String, SkillProgress>,
    pub stats: LearnerStats,
}

impl UserProgress {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            skills: BTreeMap::new(),
            stats: LearnerStats::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillProgress {
    pub skill: String,
    pub lessons_completed: u32,
    pub quiz_scores: Vec<u8>,
    pub current_difficulty: Difficulty,
    pub streak_days: u32,
    pub mastery: f64,
    pub last_activity: Option<DateTime<Utc>>,
    pub recent_lessons: Vec<String>,
    #[serde(skip)]
    pub(crate) counted_lessons: HashSet<String>,
}

impl SkillProgress {
    pub fn new(skill: &str) -> Self {
        Self {
            skill: skill.to_string(),
            lessons_completed: 0,
            quiz_scores: Vec::new(),
            current_difficulty: Difficulty::Beginner,
            streak_days: 0,
            mastery: 0.0,
            last_activity: None,
            recent_lessons: Vec::new(),
            counted_lessons: HashSet::new(),
        }
    }

    pub fn average_score(&self) -> f64 {
        if self.quiz_scores.is_empty() {
            return 0.0;
        }
        let total: u32 = self.quiz_scores.iter().map(|&s| u32::from(s)).sum();
        f64::from(total) / self.quiz_scores.len() as f64
    }

    pub fn perfect_scores(&self) -> usize {
        self.quiz_scores.iter().filter(|&&s| s == 100).count()
    }
}

/// One scored quiz, as handed to the tracker.
#[derive(Debug, Clone)]
pub struct QuizResult {
    pub lesson_id: Option<String>,
    pub lesson_title: Option<String>,
    pub score: u8,
    pub correct_answers: u32,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub skill: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SkillProgressResponse {
    pub user_id: String,
    pub skill: String,
    pub lessons_completed: u32,
    pub average_score: f64,
    pub mastery: f64,
    pub current_difficulty: Difficulty,
    pub streak_days: u32,
    pub quiz_scores: Vec<u8>,
    pub last_activity: Option<DateTime<Utc>>,
    pub recommendation: Recommendation,
    pub recommendations: String,
    pub mcp_server: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SkillSummary {
    pub lessons_completed: u32,
    pub average_score: f64,
    pub mastery: f64,
    pub current_difficulty: Difficulty,
    pub streak_days: u32,
    pub quiz_scores: Vec<u8>,
    pub last_activity: Option<DateTime<Utc>>,
}

impl From<&SkillProgress> for SkillSummary {
    fn from(progress: &SkillProgress) -> Self {
        Self {
            lessons_completed: progress.lessons_completed,
            average_score: progress.average_score(),
            mastery: progress.mastery,
            current_difficulty: progress.current_difficulty,
            streak_days: progress.streak_days,
            quiz_scores: progress.quiz_scores.clone(),
            last_activity: progress.last_activity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AllProgressResponse {
    pub user_id: String,
    pub skills_progress: BTreeMap<String, SkillSummary>,
    pub total_skills_learning: usize,
    pub mcp_server: &'static str,
    pub timestamp: DateTime<Utc>,
}
