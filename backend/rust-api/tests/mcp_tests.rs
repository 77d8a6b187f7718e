mod common;

use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use common::{ChatScript, FakeSpeech, QUIZ_ANSWERS};
use skillsprout_api::{config::AzureOpenAiConfig, services::llm_client::AzureOpenAiClient};

fn unique_user(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

#[tokio::test]
async fn test_list_skills() {
    let app = common::create_test_app();

    let (status, json) = common::send(&app, "GET", "/mcp/skills", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["predefined_skills"].as_array().unwrap().len(), 10);
    assert_eq!(json["custom_skills_supported"], true);
}

#[tokio::test]
async fn test_generate_lesson_success() {
    let app = common::create_test_app();
    let user_id = unique_user("lesson");

    let json = common::generate_lesson(&app, &user_id, "Spanish Language").await;

    assert_eq!(json["degraded"], false);
    assert!(json.get("notice").is_none());
    assert_eq!(json["lesson"]["title"], "Greetings in Spanish");
    assert_eq!(json["lesson"]["skill"], "Spanish Language");
    assert_eq!(json["lesson"]["difficulty"], "beginner");
    assert_eq!(json["user_context"]["user_id"], user_id.as_str());
    assert_eq!(json["user_context"]["lessons_completed"], 0);
    assert_eq!(json["mcp_server"], "SkillSprout");
}

#[tokio::test]
async fn test_generate_lesson_defaults_user_id() {
    let app = common::create_test_app();

    let (status, json) = common::send(
        &app,
        "POST",
        "/mcp/lesson/generate",
        Some(json!({ "skill": "Photography" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user_context"]["user_id"], "default_user");
}

#[tokio::test]
async fn test_generate_lesson_missing_skill_is_422() {
    let app = common::create_test_app();

    let (status, json) = common::send(
        &app,
        "POST",
        "/mcp/lesson/generate",
        Some(json!({ "user_id": "someone" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["status"], 422);
}

#[tokio::test]
async fn test_generate_lesson_blank_skill_is_422() {
    let app = common::create_test_app();

    for skill in ["", "   "] {
        let (status, _) = common::send(
            &app,
            "POST",
            "/mcp/lesson/generate",
            Some(json!({ "skill": skill })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "skill {skill:?}");
    }
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = common::create_test_app();

    let response = tower::ServiceExt::oneshot(
        app,
        axum::http::Request::builder()
            .method("POST")
            .uri("/mcp/lesson/generate")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{\"skill\": "))
            .unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lesson_degrades_when_upstream_unavailable() {
    let app = common::create_app_with(ChatScript::Unavailable, true);

    let json = common::generate_lesson(&app, &unique_user("down"), "Public Speaking").await;

    assert_eq!(json["degraded"], true);
    assert_eq!(json["notice"]["kind"], "upstream_unavailable");
    assert_eq!(json["lesson"]["title"], "Introduction to Public Speaking");
}

#[tokio::test]
async fn test_lesson_degrades_when_reply_is_malformed() {
    let app = common::create_app_with(ChatScript::Malformed, true);

    let json = common::generate_lesson(&app, &unique_user("garbled"), "Data Science").await;

    assert_eq!(json["degraded"], true);
    assert_eq!(json["notice"]["kind"], "upstream_malformed");
}

#[tokio::test]
async fn test_upstream_timeout_still_returns_200() {
    // Accepts connections and never answers
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let mut config = common::test_config();
    config.azure_openai = AzureOpenAiConfig {
        endpoint: format!("http://{}", addr),
        api_key: "test-key".to_string(),
        timeout_secs: 1,
        max_attempts: 1,
        ..AzureOpenAiConfig::default()
    };
    let llm = Arc::new(AzureOpenAiClient::new(config.azure_openai.clone()).unwrap());
    let app =
        common::create_app_with_clients(config, llm, Arc::new(FakeSpeech { available: false }));

    let json = common::generate_lesson(&app, &unique_user("slow"), "Machine Learning").await;

    assert_eq!(json["degraded"], true);
    assert_eq!(json["notice"]["kind"], "upstream_unavailable");
    assert_eq!(json["lesson"]["title"], "Introduction to Machine Learning");
}

#[tokio::test]
async fn test_lesson_with_narration() {
    let app = common::create_test_app();

    let (status, json) = common::send(
        &app,
        "POST",
        "/mcp/lesson/generate",
        Some(json!({ "skill": "Creative Writing", "narrate": true })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["narration"]["content_type"], "audio/mpeg");
    assert!(!json["narration"]["audio_base64"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_narration_failure_does_not_block_lesson() {
    let app = common::create_app_with(ChatScript::Healthy, false);

    let (status, json) = common::send(
        &app,
        "POST",
        "/mcp/lesson/generate",
        Some(json!({ "skill": "Creative Writing", "narrate": true })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["degraded"], false);
    assert_eq!(json["lesson"]["title"], "Greetings in Spanish");
    assert!(json["narration"].get("audio_base64").is_none());
    assert_eq!(json["narration"]["notice"]["kind"], "synthesis_unavailable");
}

#[tokio::test]
async fn test_narrate_endpoint() {
    let app = common::create_test_app();

    let (status, json) = common::send(
        &app,
        "POST",
        "/mcp/lesson/narrate",
        Some(json!({ "text": "Hola, ¿qué tal?", "voice": "es-ES-ElviraNeural" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["degraded"], false);
    assert_eq!(json["content_type"], "audio/mpeg");

    let (status, _) = common::send(
        &app,
        "POST",
        "/mcp/lesson/narrate",
        Some(json!({ "text": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_generate_quiz_has_five_questions_by_default() {
    let app = common::create_test_app();
    let user_id = unique_user("quiz");

    let lesson = common::generate_lesson(&app, &user_id, "Spanish Language").await;
    let quiz =
        common::generate_quiz(&app, &user_id, lesson["lesson"]["id"].as_str().unwrap()).await;

    let questions = quiz["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 5);
    assert_eq!(quiz["degraded"], false);
    assert_eq!(quiz["difficulty"], "beginner");
    assert_eq!(questions[0]["number"], 1);
    assert_eq!(questions[0]["kind"], "multiple_choice");
    // answer keys stay server-side
    assert!(questions.iter().all(|q| q.get("correct_answer").is_none()));
}

#[tokio::test]
async fn test_generate_quiz_question_count_override() {
    let app = common::create_test_app();
    let user_id = unique_user("quiz-count");
    let lesson = common::generate_lesson(&app, &user_id, "Spanish Language").await;
    let lesson_id = lesson["lesson"]["id"].as_str().unwrap();

    let (status, json) = common::send(
        &app,
        "POST",
        "/mcp/quiz/generate",
        Some(json!({ "user_id": user_id, "lesson_id": lesson_id, "question_count": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["questions"].as_array().unwrap().len(), 3);

    let (status, json) = common::send(
        &app,
        "POST",
        "/mcp/quiz/generate",
        Some(json!({ "user_id": user_id, "lesson_id": lesson_id, "question_count": 8 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["questions"].as_array().unwrap().len(), 8);

    let (status, _) = common::send(
        &app,
        "POST",
        "/mcp/quiz/generate",
        Some(json!({ "user_id": user_id, "lesson_id": lesson_id, "question_count": 11 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_degraded_quiz_still_has_five_questions() {
    let app = common::create_app_with(ChatScript::Unavailable, false);
    let user_id = unique_user("quiz-down");

    let lesson = common::generate_lesson(&app, &user_id, "JavaScript").await;
    let quiz =
        common::generate_quiz(&app, &user_id, lesson["lesson"]["id"].as_str().unwrap()).await;

    assert_eq!(quiz["degraded"], true);
    assert_eq!(quiz["notice"]["kind"], "upstream_unavailable");
    assert_eq!(quiz["questions"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_generate_quiz_unknown_lesson_is_404() {
    let app = common::create_test_app();

    let (status, json) = common::send(
        &app,
        "POST",
        "/mcp/quiz/generate",
        Some(json!({ "user_id": "u", "lesson_id": "no-such-lesson" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_submit_quiz_empty_answers_scores_zero() {
    let app = common::create_test_app();
    let user_id = unique_user("empty");

    let lesson = common::generate_lesson(&app, &user_id, "Spanish Language").await;
    let quiz =
        common::generate_quiz(&app, &user_id, lesson["lesson"]["id"].as_str().unwrap()).await;

    let (status, json) = common::send(
        &app,
        "POST",
        "/mcp/quiz/submit",
        Some(json!({
            "user_id": user_id,
            "quiz_id": quiz["quiz_id"],
            "answers": [],
            "skill": "Spanish Language"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["score"], 0);
    assert_eq!(json["passed"], false);
    assert_eq!(json["correct_answers"], 0);
    assert_eq!(json["total_questions"], 5);
    assert!(json["feedback"].as_str().unwrap().contains("0%"));
}

#[tokio::test]
async fn test_submit_quiz_all_correct() {
    let app = common::create_test_app();
    let user_id = unique_user("ace");

    let lesson = common::generate_lesson(&app, &user_id, "Spanish Language").await;
    let quiz =
        common::generate_quiz(&app, &user_id, lesson["lesson"]["id"].as_str().unwrap()).await;

    let (status, json) = common::send(
        &app,
        "POST",
        "/mcp/quiz/submit",
        Some(json!({
            "user_id": user_id,
            "quiz_id": quiz["quiz_id"],
            "answers": QUIZ_ANSWERS,
            "skill": "Spanish Language"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["score"], 100);
    assert_eq!(json["passed"], true);
    assert_eq!(json["updated_progress"]["lessons_completed"], 1);
    assert_eq!(json["updated_progress"]["streak_days"], 1);
    assert_eq!(json["recommendation"], "hold");

    let achievements: Vec<&str> = json["new_achievements"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a["id"].as_str())
        .collect();
    assert!(achievements.contains(&"first_steps"));
    assert!(achievements.contains(&"quiz_master"));
    assert!(json["total_points"].as_u64().unwrap() >= 100);
}

#[tokio::test]
async fn test_submit_quiz_partial_answers() {
    let app = common::create_test_app();
    let user_id = unique_user("partial");

    let lesson = common::generate_lesson(&app, &user_id, "Spanish Language").await;
    let quiz =
        common::generate_quiz(&app, &user_id, lesson["lesson"]["id"].as_str().unwrap()).await;

    let (status, json) = common::send(
        &app,
        "POST",
        "/mcp/quiz/submit",
        Some(json!({
            "user_id": user_id,
            "quiz_id": quiz["quiz_id"],
            "answers": ["a", "T"],
            "skill": "Spanish Language"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["score"], 40);
    assert_eq!(json["results"][2]["your_answer"], serde_json::Value::Null);
    assert_eq!(json["results"][2]["is_correct"], false);
}

#[tokio::test]
async fn test_submit_quiz_unknown_quiz_is_404() {
    let app = common::create_test_app();

    let (status, _) = common::send(
        &app,
        "POST",
        "/mcp/quiz/submit",
        Some(json!({
            "user_id": "u",
            "quiz_id": "missing",
            "answers": ["A"],
            "skill": "Python Programming"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_quiz_missing_fields_is_422() {
    let app = common::create_test_app();

    let (status, _) = common::send(
        &app,
        "POST",
        "/mcp/quiz/submit",
        Some(json!({ "user_id": "u", "answers": ["A"] })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_progress_unknown_user_is_empty() {
    let app = common::create_test_app();
    let user_id = unique_user("ghost");

    let (status, json) =
        common::send(&app, "GET", &format!("/mcp/progress/{}", user_id), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_skills_learning"], 0);
    assert_eq!(json["skills_progress"], json!({}));

    let (status, json) = common::send(
        &app,
        "GET",
        &format!("/mcp/progress/{}?skill=Photography", user_id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["lessons_completed"], 0);
    assert_eq!(json["current_difficulty"], "beginner");
    assert_eq!(json["recommendation"], "hold");
}

#[tokio::test]
async fn test_progress_after_quiz() {
    let app = common::create_test_app();
    let user_id = unique_user("learner");

    let lesson = common::generate_lesson(&app, &user_id, "Spanish Language").await;
    let lesson_id = lesson["lesson"]["id"].as_str().unwrap().to_string();

    // same lesson retaken: counted once
    for _ in 0..2 {
        let quiz = common::generate_quiz(&app, &user_id, &lesson_id).await;
        let (status, _) = common::send(
            &app,
            "POST",
            "/mcp/quiz/submit",
            Some(json!({
                "user_id": user_id,
                "quiz_id": quiz["quiz_id"],
                "answers": QUIZ_ANSWERS,
                "skill": "Spanish Language"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = common::send(
        &app,
        "GET",
        &format!("/mcp/progress/{}?skill=Spanish%20Language", user_id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["lessons_completed"], 1);
    assert_eq!(json["quiz_scores"], json!([100, 100]));
    assert_eq!(json["average_score"], 100.0);
    assert_eq!(json["mastery"], 100.0);
    assert_eq!(json["streak_days"], 1);

    let (_, all) = common::send(&app, "GET", &format!("/mcp/progress/{}", user_id), None).await;
    assert_eq!(all["total_skills_learning"], 1);
    assert_eq!(all["skills_progress"]["Spanish Language"]["lessons_completed"], 1);

    // next lesson builds on the learner's level
    let next = common::generate_lesson(&app, &user_id, "Spanish Language").await;
    assert_eq!(next["user_context"]["lessons_completed"], 1);
}

#[tokio::test]
async fn test_stats_endpoint() {
    let app = common::create_test_app();
    let user_id = unique_user("stats");

    let (status, json) = common::send(&app, "GET", &format!("/mcp/stats/{}", user_id), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stats"]["level"], 1);
    assert_eq!(json["stats"]["total_points"], 0);
    let achievements = json["achievements"].as_array().unwrap();
    assert_eq!(achievements.len(), 10);
    assert!(achievements.iter().all(|a| a["unlocked"] == false));
}

#[tokio::test]
async fn test_quiz_targets_tracked_level_after_streak_of_high_scores() {
    let app = common::create_test_app();
    let user_id = unique_user("climber");
    let mut tracked = serde_json::Value::Null;

    for _ in 0..3 {
        let lesson = common::generate_lesson(&app, &user_id, "Spanish Language").await;
        let quiz =
            common::generate_quiz(&app, &user_id, lesson["lesson"]["id"].as_str().unwrap()).await;
        let (status, json) = common::send(
            &app,
            "POST",
            "/mcp/quiz/submit",
            Some(json!({
                "user_id": user_id,
                "quiz_id": quiz["quiz_id"],
                "answers": QUIZ_ANSWERS,
                "skill": "Spanish Language"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        tracked = json["updated_progress"]["current_difficulty"].clone();
    }
    assert_eq!(tracked, "intermediate");

    let lesson = common::generate_lesson(&app, &user_id, "Spanish Language").await;
    assert_eq!(lesson["lesson"]["difficulty"], tracked);

    let quiz =
        common::generate_quiz(&app, &user_id, lesson["lesson"]["id"].as_str().unwrap()).await;
    assert_eq!(quiz["difficulty"], tracked);
}

#[tokio::test]
async fn test_explicit_quiz_difficulty_wins() {
    let app = common::create_test_app();
    let user_id = unique_user("override");
    let lesson = common::generate_lesson(&app, &user_id, "Photography").await;

    let (status, json) = common::send(
        &app,
        "POST",
        "/mcp/quiz/generate",
        Some(json!({
            "user_id": user_id,
            "lesson_id": lesson["lesson"]["id"],
            "difficulty": "advanced"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["difficulty"], "advanced");
}

#[tokio::test]
async fn test_lesson_difficulty_is_case_insensitive() {
    let app = common::create_test_app();

    let (status, json) = common::send(
        &app,
        "POST",
        "/mcp/lesson/generate",
        Some(json!({ "skill": "Photography", "difficulty": "Intermediate" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["lesson"]["difficulty"], "intermediate");

    let (status, _) = common::send(
        &app,
        "POST",
        "/mcp/lesson/generate",
        Some(json!({ "skill": "Photography", "difficulty": "expert" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
