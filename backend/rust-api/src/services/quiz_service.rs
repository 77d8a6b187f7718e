use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::llm_client::{parse_json_reply, ChatCompletion, ChatRequest, UpstreamError};
use crate::metrics::{bool_label, QUIZZES_GENERATED_TOTAL};
use crate::models::{
    lesson::Lesson,
    quiz::{Question, QuestionKind, QuestionResult, Quiz, QuizScore},
    DegradedNotice, Difficulty,
};

const QUIZ_MAX_TOKENS: u32 = 1500;

const SYSTEM_PROMPT: &str =
    "You are an expert quiz creator. Create engaging, fair questions. Always respond with valid JSON.";

lazy_static! {
    static ref OPTION_LABEL: Regex = Regex::new(r"^\s*([A-Za-z])\s*[\)\.:]\s*(.*)$").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug)]
pub struct QuizOutcome {
    pub quiz: Quiz,
    pub degraded: Option<DegradedNotice>,
}

#[derive(Debug, Deserialize)]
struct QuizReply {
    #[serde(default)]
    questions: Vec<RawQuestion>,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    question: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    correct_answer: Value,
    #[serde(default)]
    explanation: Option<String>,
}

/// Generates a quiz of exactly `count` questions for `lesson`.
pub async fn generate_quiz(
    llm: &dyn ChatCompletion,
    lesson: &Lesson,
    difficulty: Difficulty,
    count: usize,
) -> QuizOutcome {
    let count = count.max(1);
    let request = build_quiz_prompt(lesson, difficulty, count);

    let result = match llm.complete(&request).await {
        Ok(reply) => questions_from_reply(&reply),
        Err(e) => Err(e),
    };

    let (questions, degraded) = match result {
        Ok(mut questions) => {
            if questions.len() != count {
                tracing::debug!(
                    lesson_id = %lesson.id,
                    returned = questions.len(),
                    wanted = count,
                    "Adjusting model quiz to requested size"
                );
            }
            questions.truncate(count);
            pad_questions(&mut questions, lesson, count);
            (questions, None)
        }
        Err(e) => {
            let kind = e.degraded_kind();
            tracing::warn!(
                lesson_id = %lesson.id,
                kind = kind.as_str(),
                error = %e,
                "Quiz generation degraded to fallback"
            );
            (
                fallback_questions(lesson, count),
                Some(DegradedNotice {
                    kind,
                    message: "The quiz generator is unavailable; showing review questions."
                        .to_string(),
                }),
            )
        }
    };

    QUIZZES_GENERATED_TOTAL
        .with_label_values(&[bool_label(degraded.is_some())])
        .inc();

    QuizOutcome {
        quiz: Quiz {
            id: Uuid::new_v4().to_string(),
            lesson_id: lesson.id.clone(),
            lesson_title: lesson.title.clone(),
            skill: lesson.skill.clone(),
            difficulty,
            questions,
            created_at: Utc::now(),
        },
        degraded,
    }
}

pub fn build_quiz_prompt(lesson: &Lesson, difficulty: Difficulty, count: usize) -> ChatRequest {
    let user = format!(
        r#"Based on this lesson, create a quiz with exactly {count} questions at the {difficulty} level:

Lesson Title: {title}
Lesson Content: {content}
Key Concepts: {concepts}

Create a mix of:
- Multiple choice questions (4 options labelled "A) ..." to "D) ...")
- True/false questions
- Short answer questions

Format as JSON:
{{
    "questions": [
        {{
            "type": "multiple_choice",
            "question": "Question text",
            "options": ["A) Option 1", "B) Option 2", "C) Option 3", "D) Option 4"],
            "correct_answer": "A",
            "explanation": "Why this is correct"
        }},
        {{
            "type": "true_false",
            "question": "Statement to evaluate",
            "correct_answer": true,
            "explanation": "Explanation"
        }}
    ]
}}"#,
        count = count,
        difficulty = difficulty,
        title = lesson.title,
        content = lesson.content,
        concepts = lesson.key_concepts.join(", "),
    );

    ChatRequest {
        system: SYSTEM_PROMPT.to_string(),
        user,
        max_tokens: QUIZ_MAX_TOKENS,
    }
}

fn questions_from_reply(reply: &str) -> Result<Vec<Question>, UpstreamError> {
    let parsed: QuizReply = parse_json_reply(reply)?;

    let questions: Vec<Question> = parsed
        .questions
        .into_iter()
        .filter_map(normalize_question)
        .collect();

    if questions.is_empty() {
        return Err(UpstreamError::Malformed(
            "Quiz reply contained no usable questions".to_string(),
        ));
    }

    Ok(questions)
}

fn normalize_question(raw: RawQuestion) -> Option<Question> {
    let text = raw.question.trim();
    let correct_answer = match &raw.correct_answer {
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() || correct_answer.is_empty() {
        return None;
    }

    let options: Vec<String> = raw
        .options
        .iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();

    let kind = match raw.kind.as_deref().map(|k| k.trim().to_lowercase()) {
        Some(k) if k.contains("multiple") || k == "mcq" => QuestionKind::MultipleChoice,
        Some(k) if k.contains("true") || k == "boolean" => QuestionKind::TrueFalse,
        Some(k) if k.contains("short") => QuestionKind::ShortAnswer,
        _ if raw.correct_answer.is_boolean() => QuestionKind::TrueFalse,
        _ if !options.is_empty() => QuestionKind::MultipleChoice,
        _ => QuestionKind::ShortAnswer,
    };

    match kind {
        QuestionKind::MultipleChoice if options.len() < 2 => return None,
        QuestionKind::TrueFalse if parse_bool(&correct_answer).is_none() => return None,
        _ => {}
    }

    Some(Question {
        kind,
        question: text.to_string(),
        options: if kind == QuestionKind::MultipleChoice {
            options
        } else {
            Vec::new()
        },
        correct_answer,
        explanation: raw.explanation.unwrap_or_default().trim().to_string(),
    })
}

fn pad_questions(questions: &mut Vec<Question>, lesson: &Lesson, count: usize) {
    if questions.len() >= count {
        return;
    }

    for filler in fallback_questions(lesson, count * 2) {
        if questions.len() == count {
            break;
        }
        if !questions.iter().any(|q| q.question == filler.question) {
            questions.push(filler);
        }
    }
}

/// Deterministic review questions built from the lesson itself.
pub fn fallback_questions(lesson: &Lesson, count: usize) -> Vec<Question> {
    let mut questions = Vec::with_capacity(count);

    questions.push(Question {
        kind: QuestionKind::MultipleChoice,
        question: "What is the main topic of this lesson?".to_string(),
        options: vec![
            format!("A) {}", lesson.skill),
            "B) Something unrelated".to_string(),
            "C) None of the above".to_string(),
            "D) All of the above".to_string(),
        ],
        correct_answer: "A".to_string(),
        explanation: format!("This lesson is about {}.", lesson.skill),
    });

    for concept in &lesson.key_concepts {
        questions.push(Question {
            kind: QuestionKind::TrueFalse,
            question: format!(
                "True or false: \"{}\" is a key concept of the lesson \"{}\".",
                concept, lesson.title
            ),
            options: Vec::new(),
            correct_answer: "true".to_string(),
            explanation: format!("\"{}\" is listed among the lesson's key concepts.", concept),
        });
    }

    let mut review = 1;
    while questions.len() < count {
        questions.push(Question {
            kind: QuestionKind::TrueFalse,
            question: format!(
                "Review {}: true or false, short daily practice helps you improve at {}.",
                review, lesson.skill
            ),
            options: Vec::new(),
            correct_answer: "true".to_string(),
            explanation: "Small, regular sessions build lasting skills.".to_string(),
        });
        review += 1;
    }

    questions.truncate(count);
    questions
}

/// Scores answers positionally; missing, blank and surplus answers earn nothing.
pub fn score_quiz(quiz: &Quiz, answers: &[String]) -> QuizScore {
    let results: Vec<QuestionResult> = quiz
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let answer = answers
                .get(index)
                .map(|a| a.trim())
                .filter(|a| !a.is_empty());
            QuestionResult {
                number: index + 1,
                question: question.question.clone(),
                your_answer: answer.map(str::to_string),
                correct_answer: question.correct_answer.clone(),
                is_correct: answer.is_some_and(|a| answer_matches(question, a)),
                explanation: question.explanation.clone(),
            }
        })
        .collect();

    let total_questions = results.len();
    let correct_answers = results.iter().filter(|r| r.is_correct).count();
    let score = if total_questions == 0 {
        0
    } else {
        (100.0 * correct_answers as f64 / total_questions as f64).round() as u8
    };

    QuizScore {
        score,
        correct_answers,
        total_questions,
        results,
    }
}

pub fn answer_matches(question: &Question, answer: &str) -> bool {
    let answer = answer.trim();
    if answer.is_empty() {
        return false;
    }

    match question.kind {
        QuestionKind::TrueFalse => {
            match (parse_bool(answer), parse_bool(&question.correct_answer)) {
                (Some(given), Some(expected)) => given == expected,
                _ => false,
            }
        }
        QuestionKind::MultipleChoice => multiple_choice_matches(question, answer),
        QuestionKind::ShortAnswer => normalize(answer) == normalize(&question.correct_answer),
    }
}

fn multiple_choice_matches(question: &Question, answer: &str) -> bool {
    let expected = expected_option_index(question);
    let (letter, text) = split_label(answer);

    if let (Some(letter), Some(expected)) = (letter, expected) {
        if letter_index(letter) == expected {
            return true;
        }
        if text.is_empty() {
            return false;
        }
    }

    let text = if text.is_empty() { answer } else { text };
    let expected_text = match expected.and_then(|i| question.options.get(i)) {
        Some(option) => split_label(option).1.to_string(),
        None => split_label(&question.correct_answer).1.to_string(),
    };

    normalize(text) == normalize(&expected_text)
        || normalize(answer) == normalize(&question.correct_answer)
}

fn expected_option_index(question: &Question) -> Option<usize> {
    let (letter, text) = split_label(&question.correct_answer);
    if let Some(letter) = letter {
        let index = letter_index(letter);
        if index < question.options.len() {
            return Some(index);
        }
    }

    let wanted = normalize(if text.is_empty() {
        &question.correct_answer
    } else {
        text
    });
    question
        .options
        .iter()
        .position(|option| {
            normalize(split_label(option).1) == wanted || normalize(option) == wanted
        })
}

/// Splits `"B) Paris"` into `(Some('B'), "Paris")`; a bare letter yields an empty text.
fn split_label(value: &str) -> (Option<char>, &str) {
    let value = value.trim();
    let mut chars = value.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphabetic() {
            return (Some(c.to_ascii_uppercase()), "");
        }
    }

    match OPTION_LABEL.captures(value) {
        Some(caps) => {
            let letter = caps
                .get(1)
                .and_then(|m| m.as_str().chars().next())
                .map(|c| c.to_ascii_uppercase());
            let text = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
            (letter, text)
        }
        None => (None, value),
    }
}

fn letter_index(letter: char) -> usize {
    (letter as u8).saturating_sub(b'A') as usize
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" => Some(true),
        "false" | "f" | "no" => Some(false),
        _ => None,
    }
}

fn normalize(value: &str) -> String {
    WHITESPACE
        .replace_all(value.trim(), " ")
        .trim_end_matches('.')
        .to_lowercase()
}
