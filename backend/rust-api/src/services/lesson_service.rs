use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::llm_client::{parse_json_reply, ChatCompletion, ChatRequest, UpstreamError};
use crate::metrics::{bool_label, LESSONS_GENERATED_TOTAL};
use crate::models::{lesson::Lesson, DegradedNotice, Difficulty};

const LESSON_MAX_TOKENS: u32 = 1000;
const DEFAULT_DURATION_MINUTES: u32 = 4;
const FALLBACK_DURATION_MINUTES: u32 = 3;

pub const FALLBACK_APOLOGY: &str =
    "Sorry, we couldn't generate a personalised lesson right now, so here is a short starter instead.";

const SYSTEM_PROMPT: &str =
    "You are an expert educator creating micro-lessons. Always respond with valid JSON.";

pub struct LessonInput<'a> {
    pub skill: &'a str,
    pub difficulty: Difficulty,
    pub context: Option<&'a str>,
    pub recent_lessons: &'a [String],
}

#[derive(Debug)]
pub struct LessonOutcome {
    pub lesson: Lesson,
    pub degraded: Option<DegradedNotice>,
}

#[derive(Debug, Deserialize)]
struct LessonReply {
    title: String,
    content: String,
    #[serde(default)]
    duration_minutes: Option<u32>,
    #[serde(default)]
    key_concepts: Vec<String>,
    #[serde(default)]
    practice_items: Vec<String>,
}

/// Generates a lesson, falling back to canned content when the model fails.
pub async fn generate_lesson(llm: &dyn ChatCompletion, input: &LessonInput<'_>) -> LessonOutcome {
    let request = build_lesson_prompt(input);

    let result = match llm.complete(&request).await {
        Ok(reply) => lesson_from_reply(&reply, input),
        Err(e) => Err(e),
    };

    let outcome = match result {
        Ok(lesson) => LessonOutcome {
            lesson,
            degraded: None,
        },
        Err(e) => {
            let kind = e.degraded_kind();
            tracing::warn!(
                skill = input.skill,
                kind = kind.as_str(),
                error = %e,
                "Lesson generation degraded to fallback"
            );
            LessonOutcome {
                lesson: fallback_lesson(input),
                degraded: Some(DegradedNotice {
                    kind,
                    message: "The lesson generator is unavailable; showing a starter lesson."
                        .to_string(),
                }),
            }
        }
    };

    LESSONS_GENERATED_TOTAL
        .with_label_values(&[bool_label(outcome.degraded.is_some())])
        .inc();

    outcome
}

pub fn build_lesson_prompt(input: &LessonInput<'_>) -> ChatRequest {
    let mut user = format!(
        "Create a concise, engaging micro-lesson for the skill: {}\nDifficulty level: {}\n",
        input.skill, input.difficulty
    );

    if !input.recent_lessons.is_empty() {
        user.push_str(&format!(
            "Previous lessons covered: {}\nBuild on them without repeating them.\n",
            input.recent_lessons.join(", ")
        ));
    }

    if let Some(context) = input.context.map(str::trim).filter(|c| !c.is_empty()) {
        user.push_str(&format!("Learner context: {}\n", context));
    }

    user.push_str(
        r#"
Requirements:
- Lesson should be 3-5 minutes to read
- Include practical examples
- Focus on one key concept
- Make it actionable
- Include 3-5 key takeaways and 2-3 short practice items

Format your response as JSON with these fields:
{
    "title": "Lesson title",
    "content": "Main lesson content (200-400 words)",
    "duration_minutes": 4,
    "key_concepts": ["concept1", "concept2", "concept3"],
    "practice_items": ["exercise1", "exercise2"]
}"#,
    );

    ChatRequest {
        system: SYSTEM_PROMPT.to_string(),
        user,
        max_tokens: LESSON_MAX_TOKENS,
    }
}

pub fn lesson_from_reply(reply: &str, input: &LessonInput<'_>) -> Result<Lesson, UpstreamError> {
    let parsed: LessonReply = parse_json_reply(reply)?;

    if parsed.title.trim().is_empty() || parsed.content.trim().is_empty() {
        return Err(UpstreamError::Malformed(
            "Lesson reply has an empty title or content".to_string(),
        ));
    }

    Ok(Lesson {
        id: Uuid::new_v4().to_string(),
        skill: input.skill.to_string(),
        difficulty: input.difficulty,
        title: parsed.title.trim().to_string(),
        content: parsed.content.trim().to_string(),
        duration_minutes: parsed
            .duration_minutes
            .filter(|m| (1..=30).contains(m))
            .unwrap_or(DEFAULT_DURATION_MINUTES),
        key_concepts: clean_list(parsed.key_concepts),
        practice_items: clean_list(parsed.practice_items),
        created_at: Utc::now(),
    })
}

pub fn fallback_lesson(input: &LessonInput<'_>) -> Lesson {
    Lesson {
        id: Uuid::new_v4().to_string(),
        skill: input.skill.to_string(),
        difficulty: input.difficulty,
        title: format!("Introduction to {}", input.skill),
        content: format!(
            "{} Let's start learning about {}. This is a fundamental skill that can help you \
             grow professionally and personally.",
            FALLBACK_APOLOGY, input.skill
        ),
        duration_minutes: FALLBACK_DURATION_MINUTES,
        key_concepts: vec![
            "basics".to_string(),
            "fundamentals".to_string(),
            "getting started".to_string(),
        ],
        practice_items: vec![format!(
            "Write down three things you already know about {}.",
            input.skill
        )],
        created_at: Utc::now(),
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
