#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tower::ServiceExt;

use skillsprout_api::{
    config::Config,
    create_router,
    services::{
        llm_client::{ChatCompletion, ChatRequest, UpstreamError},
        narration_service::{NarrationError, SpeechSynthesizer},
        AppState,
    },
};

pub const LESSON_REPLY: &str = r#"{
    "title": "Greetings in Spanish",
    "content": "Hola means hello and adiós means goodbye. Use buenos días in the morning.",
    "duration_minutes": 4,
    "key_concepts": ["hola", "adiós", "buenos días"],
    "practice_items": ["Greet a friend in Spanish"]
}"#;

/// Five questions; `QUIZ_ANSWERS` answers all of them correctly.
pub const QUIZ_REPLY: &str = r#"```json
{
    "questions": [
        {"type": "multiple_choice", "question": "What does hola mean?",
         "options": ["A) Hello", "B) Goodbye", "C) Thanks", "D) Please"],
         "correct_answer": "A", "explanation": "Hola is a greeting."},
        {"type": "true_false", "question": "Adiós means goodbye.", "correct_answer": true},
        {"type": "true_false", "question": "Buenos días is said at night.", "correct_answer": false},
        {"type": "short_answer", "question": "Say hello in Spanish.", "correct_answer": "Hola"},
        {"type": "multiple_choice", "question": "Which is a morning greeting?",
         "options": ["A) Buenas noches", "B) Adiós", "C) Buenos días"],
         "correct_answer": "C"}
    ]
}
```"#;

pub const QUIZ_ANSWERS: [&str; 5] = ["A", "yes", "false", "hola", "Buenos días"];

#[derive(Clone, Copy, Debug)]
pub enum ChatScript {
    Healthy,
    Unavailable,
    Malformed,
}

/// Chat model stand-in answering lesson and quiz prompts from fixtures.
pub struct FakeChat {
    script: ChatScript,
    pub calls: AtomicUsize,
}

impl FakeChat {
    pub fn new(script: ChatScript) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChatCompletion for FakeChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            ChatScript::Healthy if request.user.contains("create a quiz") => {
                Ok(QUIZ_REPLY.to_string())
            }
            ChatScript::Healthy => Ok(LESSON_REPLY.to_string()),
            ChatScript::Unavailable => Err(UpstreamError::Unavailable {
                message: "connection refused".to_string(),
                transient: false,
            }),
            ChatScript::Malformed => Ok("Sure! Here is a great lesson for you.".to_string()),
        }
    }
}

pub struct FakeSpeech {
    pub available: bool,
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(
        &self,
        _text: &str,
        _voice: Option<&str>,
    ) -> Result<Vec<u8>, NarrationError> {
        if self.available {
            Ok(b"ID3-fake-mp3".to_vec())
        } else {
            Err(NarrationError::SynthesisUnavailable)
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn test_config() -> Config {
    Config::default()
}

pub fn create_test_app() -> Router {
    create_app_with(ChatScript::Healthy, true)
}

pub fn create_app_with(script: ChatScript, speech_available: bool) -> Router {
    create_app_with_clients(
        test_config(),
        Arc::new(FakeChat::new(script)),
        Arc::new(FakeSpeech {
            available: speech_available,
        }),
    )
}

pub fn create_app_with_clients(
    config: Config,
    llm: Arc<dyn ChatCompletion>,
    speech: Arc<dyn SpeechSynthesizer>,
) -> Router {
    init_tracing();
    create_router(Arc::new(AppState::with_clients(config, llm, speech)))
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    (status, json)
}

pub async fn generate_lesson(app: &Router, user_id: &str, skill: &str) -> Value {
    let (status, json) = send(
        app,
        "POST",
        "/mcp/lesson/generate",
        Some(serde_json::json!({ "skill": skill, "user_id": user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "lesson generation failed: {json}");
    json
}

pub async fn generate_quiz(app: &Router, user_id: &str, lesson_id: &str) -> Value {
    let (status, json) = send(
        app,
        "POST",
        "/mcp/quiz/generate",
        Some(serde_json::json!({ "user_id": user_id, "lesson_id": lesson_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "quiz generation failed: {json}");
    json
}
