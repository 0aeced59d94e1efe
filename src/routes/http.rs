//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; failures map to JSON bodies via `AppError`.

use std::sync::Arc;
use axum::{extract::{State, Query}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::protocol::*;
use crate::state::AppState;
use crate::logic::*;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_create_learner(
  State(state): State<Arc<AppState>>,
) -> Result<Json<LearnerOut>, AppError> {
  let learner_id = mint_learner(&state).await?;
  Ok(Json(LearnerOut { learner_id }))
}

#[instrument(level = "info", skip(state, body), fields(%body.language))]
pub async fn http_start_language(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CourseIn>,
) -> Result<Json<StartLanguageOut>, AppError> {
  let out = start_language(&state, &body.learner_id, &body.language).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state), fields(%q.language))]
pub async fn http_get_training(
  State(state): State<Arc<AppState>>,
  Query(q): Query<CourseQuery>,
) -> Result<Json<TrainingDayOut>, AppError> {
  let out = produce_day(&state, &q.learner_id, &q.language).await?;
  info!(target: "training", language = %q.language, day = out.day, "HTTP training day served");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(%body.language, answers = body.answers.len()))]
pub async fn http_post_answers(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AnswersIn>,
) -> Result<Json<AnswersOut>, AppError> {
  let out = submit_answers(&state, &body.learner_id, &body.language, &body.answers).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state), fields(%q.language))]
pub async fn http_get_review(
  State(state): State<Arc<AppState>>,
  Query(q): Query<CourseQuery>,
) -> Result<Json<ReviewOut>, AppError> {
  let out = review_day(&state, &q.learner_id, &q.language).await?;
  info!(
    target: "training",
    language = %q.language,
    day = out.day,
    correct = %format!("{:.2}", out.correct_percentage),
    "HTTP review served"
  );
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(%body.language))]
pub async fn http_post_retake(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CourseIn>,
) -> Result<Json<RetakeOut>, AppError> {
  let out = retake_day(&state, &body.learner_id, &body.language).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(%body.language))]
pub async fn http_post_next(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CourseIn>,
) -> Result<Json<NextDayOut>, AppError> {
  let out = advance_day(&state, &body.learner_id, &body.language).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(%body.language))]
pub async fn http_post_reset(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CourseIn>,
) -> Result<Json<ResetOut>, AppError> {
  let out = reset_language(&state, &body.learner_id, &body.language).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_dashboard(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LearnerQuery>,
) -> Result<Json<DashboardOut>, AppError> {
  let out = dashboard(&state, &q.learner_id).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_summary(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LearnerQuery>,
) -> Result<Json<SummaryOut>, AppError> {
  let out = course_summaries(&state, &q.learner_id).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_days(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LearnerQuery>,
) -> Result<Json<DaysOut>, AppError> {
  let out = day_records(&state, &q.learner_id).await?;
  Ok(Json(out))
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::body::Body;
  use axum::http::{header, Request, StatusCode};
  use mockito::Matcher;
  use serde_json::{json, Value};
  use tower::util::ServiceExt;

  use crate::config::{GigachatSettings, RetrySettings};
  use crate::db::TrainingDb;
  use crate::gigachat::GigaChat;
  use crate::orchestrator::Orchestrator;
  use crate::routes::build_router;
  use crate::state::AppState;

  async fn test_router(base_url: &str) -> (axum::Router, Arc<AppState>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("http.db");
    let db = TrainingDb::new(path.to_str().unwrap()).await.unwrap();
    let settings = GigachatSettings {
      base_url: base_url.into(),
      insecure_tls: false,
      ..Default::default()
    };
    let client = GigaChat::new(&settings, "test-key".into()).unwrap();
    let retry = RetrySettings {
      material_attempts: 2,
      default_attempts: 2,
      rate_limit_wait_secs: 0,
      transient_wait_secs: 0,
    };
    let state = Arc::new(AppState { db, orchestrator: Orchestrator::new(client, &retry) });
    (build_router(state.clone()), state, dir)
  }

  fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
  }

  fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
      .method("POST")
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap()
  }

  async fn read_json(res: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn chat_body(content: &str) -> String {
    json!({"choices": [{"message": {"content": content}}]}).to_string()
  }

  #[tokio::test]
  async fn health_responds_ok() {
    let (app, _state, _dir) = test_router("http://127.0.0.1:9").await;
    let res = app.oneshot(get("/api/v1/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_json(res).await, json!({"ok": true}));
  }

  #[tokio::test]
  async fn unknown_learner_maps_to_not_found() {
    let (app, _state, _dir) = test_router("http://127.0.0.1:9").await;
    let res = app.oneshot(get("/api/v1/dashboard?learnerId=ghost")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = read_json(res).await;
    assert_eq!(body["status"], json!(404));
    assert!(body["error"].as_str().unwrap().contains("ghost"));
  }

  #[tokio::test]
  async fn full_training_day_flow() {
    let mut server = mockito::Server::new_async().await;
    // the three generation calls are told apart by their request texts
    let material_mock = server
      .mock("POST", "/chat/completions")
      .match_body(Matcher::Regex("материал (по синтаксису|для дня)".into()))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(chat_body("День 1: Переменные и типы"))
      .create_async()
      .await;
    let quiz_mock = server
      .mock("POST", "/chat/completions")
      .match_body(Matcher::Regex("тест из 15 вопросов".into()))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(chat_body(
        "### Тест\n1. Что такое переменная?\n   A) Имя\n   B) Значение\n   C) Тип\n   D) Блок\n\n2. Какой тип у 1.5?\n   A) int\n   B) float\n   C) str\n   D) bool",
      ))
      .create_async()
      .await;
    let grading_mock = server
      .mock("POST", "/chat/completions")
      .match_body(Matcher::Regex("Количество правильных: <число> из 15".into()))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(chat_body("Количество правильных: 12 из 15\nРекомендации: Повторите типы данных"))
      .create_async()
      .await;

    let (app, _state, _dir) = test_router(&server.url()).await;

    let res = app.clone().oneshot(post_json("/api/v1/learners", json!({}))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let learner = read_json(res).await["learnerId"].as_str().unwrap().to_string();

    let res = app
      .clone()
      .oneshot(post_json("/api/v1/languages/start", json!({"learnerId": learner, "language": "Rust"})))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["created"], json!(true));
    assert_eq!(body["day"], json!(1));

    let training_uri = format!("/api/v1/training?learnerId={learner}&language=Rust");
    let res = app.clone().oneshot(get(&training_uri)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["day"], json!(1));
    // the day prefix is stripped from material, headings from questions
    assert_eq!(body["material"], json!("Переменные и типы"));
    let questions = body["questions"].as_str().unwrap();
    assert!(questions.starts_with("1. Что такое переменная?"), "{questions}");
    assert!(!questions.contains("###"), "{questions}");

    // a second fetch re-serves the stored day without regenerating
    let res = app.clone().oneshot(get(&training_uri)).await.unwrap();
    assert_eq!(read_json(res).await["day"], json!(1));

    let res = app
      .clone()
      .oneshot(post_json(
        "/api/v1/training/answers",
        json!({"learnerId": learner, "language": "Rust", "answers": {"1": "A", "2": "B"}}),
      ))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["day"], json!(1));
    assert_eq!(body["answered"], json!(2));

    let res = app
      .clone()
      .oneshot(get(&format!("/api/v1/training/review?learnerId={learner}&language=Rust")))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["correctPercentage"], json!(80.0));
    assert_eq!(body["incorrectPercentage"], json!(20.0));
    assert_eq!(body["recommendation"], json!("Повторите типы данных"));
    assert_eq!(body["lastDay"], json!(false));

    material_mock.assert_async().await;
    quiz_mock.assert_async().await;
    grading_mock.assert_async().await;

    let res = app
      .clone()
      .oneshot(get(&format!("/api/v1/days?learnerId={learner}")))
      .await
      .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["languages"]["Rust"][0]["correctPercentage"], json!(80.0));
    assert_eq!(body["languages"]["Rust"][0]["answers"]["1"]["answer"], json!("A"));

    // graded day: next moves forward
    let course = json!({"learnerId": learner, "language": "Rust"});
    let res = app.clone().oneshot(post_json("/api/v1/training/next", course.clone())).await.unwrap();
    let body = read_json(res).await;
    assert_eq!(body["finished"], json!(false));
    assert_eq!(body["day"], json!(2));

    // retake clears the grade, so next repeats the day
    let res = app.clone().oneshot(post_json("/api/v1/training/retake", course.clone())).await.unwrap();
    assert_eq!(read_json(res).await["cleared"], json!(true));
    let res = app.clone().oneshot(post_json("/api/v1/training/next", course.clone())).await.unwrap();
    assert_eq!(read_json(res).await["day"], json!(1));

    let res = app.clone().oneshot(post_json("/api/v1/training/reset", course)).await.unwrap();
    assert_eq!(read_json(res).await["reset"], json!(true));
    let res = app
      .clone()
      .oneshot(get(&format!("/api/v1/dashboard?learnerId={learner}")))
      .await
      .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["active"], json!({}));
  }

  #[tokio::test]
  async fn exhausted_generation_maps_to_bad_gateway() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/chat/completions")
      .with_status(500)
      .with_body(r#"{"message":"flaky"}"#)
      .expect(2)
      .create_async()
      .await;

    let (app, _state, _dir) = test_router(&server.url()).await;
    let res = app.clone().oneshot(post_json("/api/v1/learners", json!({}))).await.unwrap();
    let learner = read_json(res).await["learnerId"].as_str().unwrap().to_string();

    let res = app
      .clone()
      .oneshot(get(&format!("/api/v1/training?learnerId={learner}&language=Rust")))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body = read_json(res).await;
    assert_eq!(body["status"], json!(502));
    assert!(body["error"].as_str().unwrap().contains("after 2 attempts"), "{body}");
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn final_day_review_builds_the_course_summary() {
    let mut server = mockito::Server::new_async().await;
    let grading_mock = server
      .mock("POST", "/chat/completions")
      .match_body(Matcher::Regex("Количество правильных: <число> из 15".into()))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(chat_body("Количество правильных: 15 из 15\nРекомендации: Отличная работа"))
      .create_async()
      .await;
    let summary_mock = server
      .mock("POST", "/chat/completions")
      .match_body(Matcher::Regex("% правильных".into()))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(chat_body("Поздравляю с завершением курса! Продолжайте практиковаться."))
      .create_async()
      .await;

    let (app, state, _dir) = test_router(&server.url()).await;
    let res = app.clone().oneshot(post_json("/api/v1/learners", json!({}))).await.unwrap();
    let learner = read_json(res).await["learnerId"].as_str().unwrap().to_string();

    state.db.save_day_content(&learner, "Rust", 30, "m", "1. q").await.unwrap();
    state
      .db
      .save_answers(&learner, "Rust", 30, r#"{"1":{"question":"1. q","answer":"ответ"}}"#)
      .await
      .unwrap();

    let res = app
      .clone()
      .oneshot(get(&format!("/api/v1/training/review?learnerId={learner}&language=Rust")))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["lastDay"], json!(true));
    assert_eq!(body["correctPercentage"], json!(100.0));
    grading_mock.assert_async().await;
    summary_mock.assert_async().await;

    let res = app
      .clone()
      .oneshot(get(&format!("/api/v1/summary?learnerId={learner}")))
      .await
      .unwrap();
    let body = read_json(res).await;
    let course = &body["courses"]["Rust"];
    assert_eq!(course["correctAvg"], json!(100.0));
    assert_eq!(
      course["recommendations"],
      json!("Поздравляю с завершением курса! Продолжайте практиковаться.")
    );
  }
}
