use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::gamification_service;
use crate::config::LearningConfig;
use crate::metrics::LEARNERS_TRACKED;
use crate::models::gamification::{Achievement, LearnerStats};
use crate::models::progress::{QuizResult, SkillProgress, UserProgress, RECENT_LESSONS_KEPT};
use crate::models::{Difficulty, Recommendation};
use crate::utils::time::next_streak;

/// In-place edit applied to a learner's record while it is held exclusively.
pub type ProgressMutation<'a> = Box<dyn FnOnce(&mut UserProgress) + Send + 'a>;

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Snapshot of the learner's record, `None` if nothing was recorded yet.
    async fn load(&self, user_id: &str) -> Option<UserProgress>;

    /// Applies `mutate` under the learner's lock, creating the record if
    /// needed, and returns the resulting snapshot.
    async fn update<'a>(&self, user_id: &str, mutate: ProgressMutation<'a>) -> UserProgress;

    async fn user_count(&self) -> usize;
}

/// Process-local store; one async mutex per learner.
#[derive(Default)]
pub struct InMemoryProgressStore {
    users: RwLock<HashMap<String, Arc<Mutex<UserProgress>>>>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, user_id: &str) -> Arc<Mutex<UserProgress>> {
        if let Some(slot) = self.users.read().await.get(user_id) {
            return slot.clone();
        }

        let mut users = self.users.write().await;
        users
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(UserProgress::new(user_id))))
            .clone()
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn load(&self, user_id: &str) -> Option<UserProgress> {
        let slot = self.users.read().await.get(user_id).cloned()?;
        let progress = slot.lock().await;
        Some(progress.clone())
    }

    async fn update<'a>(&self, user_id: &str, mutate: ProgressMutation<'a>) -> UserProgress {
        let slot = self.slot(user_id).await;
        let mut progress = slot.lock().await;
        mutate(&mut progress);
        progress.clone()
    }

    async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

/// Result of recording one quiz.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub skill: SkillProgress,
    pub stats: LearnerStats,
    pub recommendation: Recommendation,
    pub new_achievements: Vec<Achievement>,
}

#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn ProgressStore>,
    config: LearningConfig,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn ProgressStore>, config: LearningConfig) -> Self {
        Self { store, config }
    }

    pub async fn record_quiz_result(
        &self,
        user_id: &str,
        skill: &str,
        result: QuizResult,
    ) -> RecordOutcome {
        let config = &self.config;
        let mut recommendation = Recommendation::Hold;
        let mut new_achievements = Vec::new();

        let snapshot = self
            .store
            .update(
                user_id,
                Box::new(|progress: &mut UserProgress| {
                    let entry = progress
                        .skills
                        .entry(skill.to_string())
                        .or_insert_with(|| SkillProgress::new(skill));
                    let new_lesson = apply_result(entry, &result, config);
                    recommendation = recommend_from_scores(&entry.quiz_scores, config);

                    gamification_service::record_activity(
                        &mut progress.stats,
                        new_lesson,
                        result.correct_answers,
                        result.recorded_at,
                    );
                    new_achievements = gamification_service::check_achievements(progress);
                }),
            )
            .await;

        LEARNERS_TRACKED.set(self.learner_count().await as i64);

        let skill_progress = snapshot
            .skills
            .get(skill)
            .cloned()
            .unwrap_or_else(|| SkillProgress::new(skill));

        tracing::info!(
            user_id,
            skill,
            score = result.score,
            mastery = skill_progress.mastery,
            difficulty = skill_progress.current_difficulty.as_str(),
            recommendation = recommendation.as_str(),
            "Quiz result recorded"
        );

        RecordOutcome {
            skill: skill_progress,
            stats: snapshot.stats,
            recommendation,
            new_achievements,
        }
    }

    pub async fn recommend_difficulty(&self, user_id: &str, skill: &str) -> Recommendation {
        match self.skill_progress(user_id, skill).await {
            Some(progress) => recommend_from_scores(&progress.quiz_scores, &self.config),
            None => Recommendation::Hold,
        }
    }

    pub async fn learner_count(&self) -> usize {
        self.store.user_count().await
    }

    pub async fn get_progress(&self, user_id: &str) -> Option<UserProgress> {
        self.store.load(user_id).await
    }

    pub async fn skill_progress(&self, user_id: &str, skill: &str) -> Option<SkillProgress> {
        self.store
            .load(user_id)
            .await
            .and_then(|mut progress| progress.skills.remove(skill))
    }
}

/// Human-readable advice for a skill record.
pub fn recommendation_message(progress: &SkillProgress) -> String {
    let average = progress.average_score();

    if progress.quiz_scores.is_empty() {
        "🎯 Ready to start your learning journey! Begin with your first lesson.".to_string()
    } else if average >= 80.0 {
        format!(
            "🌟 Excellent work! You're mastering {}. Ready for the next challenge?",
            progress.skill
        )
    } else if average >= 60.0 {
        format!(
            "📈 Good progress! Keep practicing {} to build confidence.",
            progress.skill
        )
    } else {
        "💪 Don't give up! Review the concepts and try again. Practice makes perfect!".to_string()
    }
}

/// Folds one result into a skill record. Returns whether it counted as a new lesson.
fn apply_result(entry: &mut SkillProgress, result: &QuizResult, config: &LearningConfig) -> bool {
    let new_lesson = match &result.lesson_id {
        Some(id) => entry.counted_lessons.insert(id.clone()),
        None => true,
    };

    if new_lesson {
        entry.lessons_completed += 1;
        if let Some(title) = &result.lesson_title {
            entry.recent_lessons.push(title.clone());
            let overflow = entry.recent_lessons.len().saturating_sub(RECENT_LESSONS_KEPT);
            entry.recent_lessons.drain(..overflow);
        }
    }

    entry.quiz_scores.push(result.score.min(100));
    entry.mastery = mastery_from_scores(&entry.quiz_scores, config.mastery_decay);
    entry.current_difficulty = difficulty_from_scores(&entry.quiz_scores, config);

    entry.streak_days = next_streak(entry.streak_days, entry.last_activity, result.recorded_at);
    entry.last_activity = Some(
        entry
            .last_activity
            .map_or(result.recorded_at, |prev| prev.max(result.recorded_at)),
    );

    new_lesson
}

/// Adaptive rule over the trailing window of scores.
pub fn recommend_from_scores(scores: &[u8], config: &LearningConfig) -> Recommendation {
    let window = config.recommendation_window.max(1);
    if scores.len() < window {
        return Recommendation::Hold;
    }

    let recent = &scores[scores.len() - window..];
    let average = recent.iter().map(|&s| f64::from(s)).sum::<f64>() / window as f64;

    if average >= config.increase_threshold {
        Recommendation::Increase
    } else if average <= config.decrease_threshold {
        Recommendation::Decrease
    } else {
        Recommendation::Hold
    }
}

/// Replays the rule after every score, starting from beginner.
pub fn difficulty_from_scores(scores: &[u8], config: &LearningConfig) -> Difficulty {
    (1..=scores.len()).fold(Difficulty::Beginner, |difficulty, end| {
        difficulty.apply(recommend_from_scores(&scores[..end], config))
    })
}

/// Exponentially weighted mean, newest score weighted 1, each older one by a
/// further factor of `decay`. Always within 0..=100.
pub fn mastery_from_scores(scores: &[u8], decay: f64) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }

    let decay = if decay.is_finite() {
        decay.clamp(0.01, 1.0)
    } else {
        1.0
    };

    let mut weight = 1.0;
    let mut weighted = 0.0;
    let mut weights = 0.0;
    for &score in scores.iter().rev() {
        weighted += weight * f64::from(score.min(100));
        weights += weight;
        weight *= decay;
    }

    let mastery = (weighted / weights).clamp(0.0, 100.0);
    (mastery * 100.0).round() / 100.0
}
