use chrono::{DateTime, Utc};

use crate::metrics::ACHIEVEMENTS_UNLOCKED_TOTAL;
use crate::models::gamification::{Achievement, AchievementStatus, LearnerStats};
use crate::models::progress::UserProgress;
use crate::utils::time::{calendar_day_gap, next_streak};

pub const LESSON_POINTS: u32 = 10;
pub const CORRECT_ANSWER_POINTS: u32 = 5;
pub const ACHIEVEMENT_BONUS_POINTS: u32 = 50;

struct AchievementRule {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    unlocked: fn(&UserProgress) -> bool,
}

impl AchievementRule {
    fn to_achievement(&self) -> Achievement {
        Achievement {
            id: self.id.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            icon: self.icon.to_string(),
        }
    }
}

fn perfect_scores(progress: &UserProgress) -> usize {
    progress.skills.values().map(|s| s.perfect_scores()).sum()
}

static ACHIEVEMENTS: &[AchievementRule] = &[
    AchievementRule {
        id: "first_steps",
        name: "First Steps",
        description: "Complete your first lesson",
        icon: "🎯",
        unlocked: |p| p.stats.total_lessons >= 1,
    },
    AchievementRule {
        id: "quiz_master",
        name: "Quiz Master",
        description: "Score 100% on a quiz",
        icon: "🧠",
        unlocked: |p| perfect_scores(p) >= 1,
    },
    AchievementRule {
        id: "persistent",
        name: "Persistent Learner",
        description: "Complete 5 lessons",
        icon: "💪",
        unlocked: |p| p.stats.total_lessons >= 5,
    },
    AchievementRule {
        id: "scholar",
        name: "Scholar",
        description: "Complete 10 lessons",
        icon: "📚",
        unlocked: |p| p.stats.total_lessons >= 10,
    },
    AchievementRule {
        id: "expert",
        name: "Expert",
        description: "Complete 20 lessons",
        icon: "🏆",
        unlocked: |p| p.stats.total_lessons >= 20,
    },
    AchievementRule {
        id: "polyglot",
        name: "Polyglot",
        description: "Study 3 different skills",
        icon: "🌍",
        unlocked: |p| p.skills.len() >= 3,
    },
    AchievementRule {
        id: "perfectionist",
        name: "Perfectionist",
        description: "Get 5 perfect quiz scores",
        icon: "⭐",
        unlocked: |p| perfect_scores(p) >= 5,
    },
    AchievementRule {
        id: "speed",
        name: "Speed Learner",
        description: "Complete 3 quizzes in one day",
        icon: "⚡",
        unlocked: |p| p.stats.quizzes_today >= 3,
    },
    AchievementRule {
        id: "consistent",
        name: "Consistent",
        description: "Keep a 7-day learning streak",
        icon: "🔥",
        unlocked: |p| p.stats.streak_days >= 7,
    },
    AchievementRule {
        id: "explorer",
        name: "Explorer",
        description: "Study 5 different skills",
        icon: "🧭",
        unlocked: |p| p.skills.len() >= 5,
    },
];

pub fn achievement_statuses(stats: &LearnerStats) -> Vec<AchievementStatus> {
    ACHIEVEMENTS
        .iter()
        .map(|rule| AchievementStatus {
            achievement: rule.to_achievement(),
            unlocked: stats.has_achievement(rule.id),
        })
        .collect()
}

/// Folds one scored quiz into the learner-wide counters and awards activity points.
pub fn record_activity(
    stats: &mut LearnerStats,
    new_lesson: bool,
    correct_answers: u32,
    at: DateTime<Utc>,
) {
    stats.total_quizzes += 1;
    stats.correct_answers += correct_answers;
    if new_lesson {
        stats.total_lessons += 1;
        stats.add_points(LESSON_POINTS);
    }
    stats.add_points(correct_answers.saturating_mul(CORRECT_ANSWER_POINTS));

    stats.quizzes_today = match stats.last_activity.map(|prev| calendar_day_gap(prev, at)) {
        Some(0) => stats.quizzes_today + 1,
        Some(gap) if gap < 0 => stats.quizzes_today,
        _ => 1,
    };
    stats.streak_days = next_streak(stats.streak_days, stats.last_activity, at);
    stats.last_activity = Some(stats.last_activity.map_or(at, |prev| prev.max(at)));
}

/// Unlocks every achievement whose condition now holds. Each one pays its
/// bonus exactly once.
pub fn check_achievements(progress: &mut UserProgress) -> Vec<Achievement> {
    let newly_unlocked: Vec<&AchievementRule> = ACHIEVEMENTS
        .iter()
        .filter(|rule| !progress.stats.has_achievement(rule.id) && (rule.unlocked)(progress))
        .collect();

    for rule in &newly_unlocked {
        progress.stats.achievements.push(rule.id.to_string());
        progress.stats.add_points(ACHIEVEMENT_BONUS_POINTS);
        ACHIEVEMENTS_UNLOCKED_TOTAL
            .with_label_values(&[rule.id])
            .inc();
        tracing::info!(
            user_id = %progress.user_id,
            achievement = rule.id,
            "Achievement unlocked"
        );
    }

    newly_unlocked
        .into_iter()
        .map(AchievementRule::to_achievement)
        .collect()
}
