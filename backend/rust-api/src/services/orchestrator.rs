use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;

use super::{
    gamification_service,
    lesson_service::{self, LessonInput},
    narration_service::AUDIO_CONTENT_TYPE,
    progress_service::recommendation_message,
    quiz_service, AppState,
};
use crate::metrics::{bool_label, NARRATIONS_TOTAL, QUIZ_SUBMISSIONS_TOTAL};
use crate::models::{
    gamification::LearnerStatsResponse,
    lesson::{LessonRequest, LessonResponse, NarrationBlock, UserContext},
    narration::NarrationResponse,
    progress::{AllProgressResponse, QuizResult, SkillProgress, SkillProgressResponse, SkillSummary},
    quiz::{
        GenerateQuizRequest, GenerateQuizResponse, QuestionView, QuizSubmission,
        QuizSubmissionResponse, UpdatedProgress,
    },
    DegradedNotice, MCP_SERVER_NAME,
};

pub const QUIZ_INSTRUCTIONS: &str =
    "Answer each question in order. Multiple choice accepts the option letter or its text; \
     true/false accepts true/false, t/f or yes/no.";

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Lesson {0} not found")]
    LessonNotFound(String),

    #[error("Quiz {0} not found")]
    QuizNotFound(String),
}

/// Audio, or the reason there is none.
#[derive(Debug)]
pub struct Narration {
    pub audio: Option<Vec<u8>>,
    pub notice: Option<DegradedNotice>,
}

/// Per-request sequencing over the shared components in `AppState`.
pub struct Orchestrator<'a> {
    state: &'a AppState,
}

impl<'a> Orchestrator<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn start_lesson(&self, request: LessonRequest) -> LessonResponse {
        let skill = request.skill.trim();
        let existing = self
            .state
            .progress
            .skill_progress(&request.user_id, skill)
            .await;

        let difficulty = request.difficulty.unwrap_or_else(|| {
            existing
                .as_ref()
                .map(|p| p.current_difficulty)
                .unwrap_or_default()
        });
        let recent_lessons = existing
            .as_ref()
            .map(|p| p.recent_lessons.clone())
            .unwrap_or_default();

        let outcome = lesson_service::generate_lesson(
            self.state.llm.as_ref(),
            &LessonInput {
                skill,
                difficulty,
                context: request.context.as_deref(),
                recent_lessons: &recent_lessons,
            },
        )
        .await;

        let lesson = self.state.content.put_lesson(outcome.lesson).await;

        tracing::info!(
            user_id = %request.user_id,
            skill,
            lesson_id = %lesson.id,
            difficulty = difficulty.as_str(),
            degraded = outcome.degraded.is_some(),
            "Lesson started"
        );

        let narration = if request.narrate {
            let narration = self.narrate(&lesson.content, None).await;
            Some(NarrationBlock {
                content_type: narration
                    .audio
                    .as_ref()
                    .map(|_| AUDIO_CONTENT_TYPE.to_string()),
                audio_base64: narration.audio.map(|audio| BASE64.encode(audio)),
                notice: narration.notice,
            })
        } else {
            None
        };

        LessonResponse {
            lesson: (*lesson).clone(),
            user_context: UserContext {
                user_id: request.user_id,
                current_difficulty: existing
                    .as_ref()
                    .map(|p| p.current_difficulty)
                    .unwrap_or_default(),
                lessons_completed: existing.as_ref().map_or(0, |p| p.lessons_completed),
            },
            degraded: outcome.degraded.is_some(),
            notice: outcome.degraded,
            narration,
            mcp_server: MCP_SERVER_NAME,
            timestamp: Utc::now(),
        }
    }

    pub async fn prepare_quiz(
        &self,
        request: GenerateQuizRequest,
    ) -> Result<GenerateQuizResponse, OrchestratorError> {
        let lesson = self
            .state
            .content
            .lesson(&request.lesson_id)
            .await
            .ok_or_else(|| OrchestratorError::LessonNotFound(request.lesson_id.clone()))?;

        // The tracked level already reflects every recorded score.
        let difficulty = match request.difficulty {
            Some(difficulty) => difficulty,
            None => self
                .state
                .progress
                .skill_progress(&request.user_id, &lesson.skill)
                .await
                .map_or(lesson.difficulty, |p| p.current_difficulty),
        };
        let count = request
            .question_count
            .unwrap_or(self.state.config.learning.quiz_questions);

        let outcome =
            quiz_service::generate_quiz(self.state.llm.as_ref(), &lesson, difficulty, count).await;
        let degraded = outcome.degraded;
        let quiz = self.state.content.put_quiz(outcome.quiz).await;

        tracing::info!(
            user_id = %request.user_id,
            lesson_id = %lesson.id,
            quiz_id = %quiz.id,
            questions = quiz.questions.len(),
            difficulty = difficulty.as_str(),
            degraded = degraded.is_some(),
            "Quiz prepared"
        );

        Ok(GenerateQuizResponse {
            quiz_id: quiz.id.clone(),
            lesson_id: quiz.lesson_id.clone(),
            lesson_title: quiz.lesson_title.clone(),
            skill: quiz.skill.clone(),
            difficulty: quiz.difficulty,
            questions: quiz
                .questions
                .iter()
                .enumerate()
                .map(|(i, q)| QuestionView::from_question(i + 1, q))
                .collect(),
            degraded: degraded.is_some(),
            notice: degraded,
            instructions: QUIZ_INSTRUCTIONS,
            mcp_server: MCP_SERVER_NAME,
            timestamp: Utc::now(),
        })
    }

    pub async fn submit_quiz(
        &self,
        submission: QuizSubmission,
    ) -> Result<QuizSubmissionResponse, OrchestratorError> {
        let quiz = self
            .state
            .content
            .quiz(&submission.quiz_id)
            .await
            .ok_or_else(|| OrchestratorError::QuizNotFound(submission.quiz_id.clone()))?;

        let skill = submission.skill.trim();
        if skill != quiz.skill {
            tracing::debug!(
                quiz_id = %quiz.id,
                quiz_skill = %quiz.skill,
                submitted_skill = skill,
                "Quiz submitted under a different skill"
            );
        }

        let score = quiz_service::score_quiz(&quiz, &submission.answers);
        let passed = score.score >= self.state.config.learning.pass_threshold;

        QUIZ_SUBMISSIONS_TOTAL
            .with_label_values(&[bool_label(passed)])
            .inc();

        let recorded = self
            .state
            .progress
            .record_quiz_result(
                &submission.user_id,
                skill,
                QuizResult {
                    lesson_id: Some(quiz.lesson_id.clone()),
                    lesson_title: Some(quiz.lesson_title.clone()),
                    score: score.score,
                    correct_answers: score.correct_answers as u32,
                    recorded_at: Utc::now(),
                },
            )
            .await;

        Ok(QuizSubmissionResponse {
            feedback: submission_feedback(score.score, &recorded.skill),
            user_id: submission.user_id,
            quiz_id: quiz.id.clone(),
            skill: skill.to_string(),
            score: score.score,
            passed,
            correct_answers: score.correct_answers,
            total_questions: score.total_questions,
            results: score.results,
            updated_progress: UpdatedProgress {
                lessons_completed: recorded.skill.lessons_completed,
                average_score: recorded.skill.average_score(),
                mastery: recorded.skill.mastery,
                current_difficulty: recorded.skill.current_difficulty,
                streak_days: recorded.skill.streak_days,
            },
            recommendation: recorded.recommendation,
            new_achievements: recorded.new_achievements,
            total_points: recorded.stats.total_points,
            level: recorded.stats.level,
            mcp_server: MCP_SERVER_NAME,
            timestamp: Utc::now(),
        })
    }

    /// Synthesizes `text`. Failures come back as a notice, never as an error.
    pub async fn narrate(&self, text: &str, voice: Option<&str>) -> Narration {
        match self.state.speech.synthesize(text, voice).await {
            Ok(audio) => {
                NARRATIONS_TOTAL.with_label_values(&["success"]).inc();
                Narration {
                    audio: Some(audio),
                    notice: None,
                }
            }
            Err(e) => {
                let kind = e.degraded_kind();
                NARRATIONS_TOTAL.with_label_values(&[kind.as_str()]).inc();
                tracing::warn!(kind = kind.as_str(), error = %e, "Narration unavailable");
                Narration {
                    audio: None,
                    notice: Some(DegradedNotice {
                        kind,
                        message: "Audio narration is unavailable; the lesson is text-only."
                            .to_string(),
                    }),
                }
            }
        }
    }

    pub async fn narration_response(&self, text: &str, voice: Option<&str>) -> NarrationResponse {
        let narration = self.narrate(text, voice).await;
        NarrationResponse {
            content_type: narration
                .audio
                .as_ref()
                .map(|_| AUDIO_CONTENT_TYPE.to_string()),
            audio_base64: narration.audio.map(|audio| BASE64.encode(audio)),
            degraded: narration.notice.is_some(),
            notice: narration.notice,
            mcp_server: MCP_SERVER_NAME,
        }
    }

    pub async fn skill_progress(&self, user_id: &str, skill: &str) -> SkillProgressResponse {
        let skill = skill.trim();
        let progress = self
            .state
            .progress
            .skill_progress(user_id, skill)
            .await
            .unwrap_or_else(|| SkillProgress::new(skill));
        let recommendation = self.state.progress.recommend_difficulty(user_id, skill).await;

        SkillProgressResponse {
            user_id: user_id.to_string(),
            skill: progress.skill.clone(),
            lessons_completed: progress.lessons_completed,
            average_score: progress.average_score(),
            mastery: progress.mastery,
            current_difficulty: progress.current_difficulty,
            streak_days: progress.streak_days,
            recommendations: recommendation_message(&progress),
            quiz_scores: progress.quiz_scores,
            last_activity: progress.last_activity,
            recommendation,
            mcp_server: MCP_SERVER_NAME,
            timestamp: Utc::now(),
        }
    }

    pub async fn all_progress(&self, user_id: &str) -> AllProgressResponse {
        let skills_progress: std::collections::BTreeMap<String, SkillSummary> = self
            .state
            .progress
            .get_progress(user_id)
            .await
            .map(|progress| {
                progress
                    .skills
                    .iter()
                    .map(|(skill, p)| (skill.clone(), SkillSummary::from(p)))
                    .collect()
            })
            .unwrap_or_default();

        AllProgressResponse {
            user_id: user_id.to_string(),
            total_skills_learning: skills_progress.len(),
            skills_progress,
            mcp_server: MCP_SERVER_NAME,
            timestamp: Utc::now(),
        }
    }

    pub async fn learner_stats(&self, user_id: &str) -> LearnerStatsResponse {
        let stats = self
            .state
            .progress
            .get_progress(user_id)
            .await
            .map(|progress| progress.stats)
            .unwrap_or_default();

        LearnerStatsResponse {
            user_id: user_id.to_string(),
            achievements: gamification_service::achievement_statuses(&stats),
            stats,
            mcp_server: MCP_SERVER_NAME,
            timestamp: Utc::now(),
        }
    }
}

fn submission_feedback(score: u8, progress: &SkillProgress) -> String {
    let performance = if score >= 80 {
        "🌟 Excellent!"
    } else if score >= 60 {
        "👍 Good work!"
    } else {
        "💪 Keep practicing!"
    };
    format!(
        "{} You scored {}%. {}",
        performance,
        score,
        recommendation_message(progress)
    )
}
