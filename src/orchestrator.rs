//! Content orchestrator: prompt selection, the retried chat call and
//! response cleanup for the four generation operations.
//!
//! Every operation follows the same shape: pick a prompt, drive it through
//! the retry loop, post-process the reply. Day material gets the large
//! attempt budget; everything else gets the standard one.

use thiserror::Error;
use tracing::{instrument, info, error};

use crate::config::RetrySettings;
use crate::domain::GradeReport;
use crate::gigachat::GigaChat;
use crate::postprocess;
use crate::prompts;
use crate::retry::{run_with_retry, RetryOutcome, RetryPolicy};
use crate::util::trunc_for_log;

/// Terminal failure of a generation operation. The last upstream error is
/// carried verbatim so callers can surface it.
#[derive(Debug, Error)]
pub enum OrchestratorError {
  #[error("generation failed after {attempts} attempts: {last_error}")]
  Exhausted { attempts: u32, last_error: String },
}

#[derive(Clone)]
pub struct Orchestrator {
  client: GigaChat,
  material_policy: RetryPolicy,
  standard_policy: RetryPolicy,
}

impl Orchestrator {
  pub fn new(client: GigaChat, retry: &RetrySettings) -> Self {
    Self {
      client,
      material_policy: RetryPolicy::material(retry),
      standard_policy: RetryPolicy::standard(retry),
    }
  }

  /// Day material for one language. A stray "День N:" header in the reply
  /// is stripped before the text is returned.
  #[instrument(level = "info", skip(self, language), fields(%language, day))]
  pub async fn generate_material(&self, language: &str, day: i64) -> Result<String, OrchestratorError> {
    let prompt = prompts::material_prompt(&mut rand::thread_rng(), language, day);
    let text = self.run("material", &self.material_policy, &prompt).await?;
    Ok(postprocess::strip_day_prefix(&text))
  }

  /// Fifteen-question quiz over already generated material.
  #[instrument(level = "info", skip(self, language, material), fields(%language, day, material_len = material.len()))]
  pub async fn generate_quiz(
    &self,
    language: &str,
    material: &str,
    day: i64,
  ) -> Result<String, OrchestratorError> {
    let prompt = prompts::quiz_prompt(language, material, day);
    let text = self.run("quiz", &self.standard_policy, &prompt).await?;
    Ok(postprocess::clean_quiz_text(&text))
  }

  /// Grade a submitted answer transcript. The parse never fails: a sloppy
  /// reply degrades to zero correct answers and a stock recommendation.
  #[instrument(level = "info", skip(self, language, transcript), fields(%language, transcript_len = transcript.len()))]
  pub async fn grade_answers(
    &self,
    language: &str,
    transcript: &str,
  ) -> Result<GradeReport, OrchestratorError> {
    let prompt = prompts::grading_prompt(language, transcript);
    let text = self.run("grading", &self.standard_policy, &prompt).await?;
    Ok(postprocess::parse_grade(&text))
  }

  /// Free-text course summary for the whole 30 days.
  #[instrument(level = "info", skip(self, language), fields(%language, correct_pct, incorrect_pct))]
  pub async fn summarize_course(
    &self,
    language: &str,
    correct_pct: f64,
    incorrect_pct: f64,
  ) -> Result<String, OrchestratorError> {
    let prompt =
      prompts::summary_prompt(&mut rand::thread_rng(), language, correct_pct, incorrect_pct);
    self.run("summary", &self.standard_policy, &prompt).await
  }

  async fn run(
    &self,
    op: &'static str,
    policy: &RetryPolicy,
    prompt: &str,
  ) -> Result<String, OrchestratorError> {
    let start = std::time::Instant::now();
    let outcome = run_with_retry(op, policy, || self.client.chat(prompt)).await;
    let elapsed = start.elapsed();
    match outcome {
      RetryOutcome::Success { text, attempts } => {
        info!(target: "kurso_backend", op, attempts, ?elapsed, reply_len = text.len(), "Generation succeeded");
        Ok(text)
      }
      RetryOutcome::Exhausted { attempts, last_error } => {
        error!(
          target: "kurso_backend",
          op,
          attempts,
          ?elapsed,
          error = %trunc_for_log(&last_error, 200),
          "Generation budget exhausted"
        );
        Err(OrchestratorError::Exhausted { attempts, last_error })
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::GigachatSettings;
  use mockito::Matcher;

  fn test_orchestrator(base_url: String) -> Orchestrator {
    let settings = GigachatSettings {
      base_url,
      insecure_tls: false,
      ..Default::default()
    };
    let client = GigaChat::new(&settings, "test-key".into()).unwrap();
    let retry = RetrySettings {
      material_attempts: 3,
      default_attempts: 2,
      rate_limit_wait_secs: 0,
      transient_wait_secs: 0,
    };
    Orchestrator::new(client, &retry)
  }

  #[tokio::test]
  async fn material_is_generated_and_stripped() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/chat/completions")
      .match_body(Matcher::Regex("для дня 3".into()))
      .with_status(200)
      .with_body(r#"{"choices":[{"message":{"content":"День 3: Переменные и типы"}}]}"#)
      .create_async()
      .await;

    let orch = test_orchestrator(server.url());
    let material = orch.generate_material("Rust", 3).await.unwrap();
    assert_eq!(material, "Переменные и типы");
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn quiz_prompt_embeds_material_and_reply_is_cleaned() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/chat/completions")
      .match_body(Matcher::AllOf(vec![
        Matcher::Regex("тест из 15 вопросов".into()),
        Matcher::Regex("Переменные и типы".into()),
      ]))
      .with_status(200)
      .with_body(r##"{"choices":[{"message":{"content":"# Тест\n\n1. Что такое тип?\n   A) а\n   B) б\n   C) в\n   D) г\n\n11. Напишите функцию\nлишний хвост"}}]}"##)
      .create_async()
      .await;

    let orch = test_orchestrator(server.url());
    let quiz = orch.generate_quiz("Rust", "Переменные и типы", 3).await.unwrap();
    assert!(quiz.starts_with("1. Что такое тип?"));
    assert!(quiz.contains("11. Напишите функцию"));
    assert!(!quiz.contains("# Тест"));
    assert!(!quiz.contains("лишний хвост"));
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn full_quiz_keeps_ten_choice_blocks_and_five_task_lines() {
    let mut raw = String::from("### Тест дня\n\n");
    for n in 1..=10 {
      raw.push_str(&format!(
        "{n}. Вопрос {n} по теме?\n   A) один\n   B) два\n   C) три\n   D) четыре\n\n"
      ));
    }
    for n in 11..=15 {
      raw.push_str(&format!("{n}. Задание {n}: напишите пример\nподсказка решения\n\n"));
    }

    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/chat/completions")
      .match_body(Matcher::Regex("тест из 15 вопросов".into()))
      .with_status(200)
      .with_body(serde_json::json!({"choices": [{"message": {"content": raw}}]}).to_string())
      .create_async()
      .await;

    let orch = test_orchestrator(server.url());
    let quiz = orch.generate_quiz("Python", "материал дня", 5).await.unwrap();

    let blocks: Vec<&str> = quiz.split("\n\n").collect();
    assert_eq!(blocks.len(), 15);
    for (i, block) in blocks.iter().enumerate() {
      assert!(block.starts_with(&format!("{}.", i + 1)), "{block}");
    }
    // choice questions keep their options, coding tasks shrink to one line
    assert!(blocks[..10].iter().all(|b| b.contains("D) четыре")));
    assert!(blocks[10..].iter().all(|b| b.lines().count() == 1));
    assert!(!quiz.contains("подсказка"));
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn grading_parses_the_reply() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("POST", "/chat/completions")
      .match_body(Matcher::Regex("Вопрос 1: что\\? Ответ: то".into()))
      .with_status(200)
      .with_body(r#"{"choices":[{"message":{"content":"Количество правильных: 9 из 15\nРекомендации: Повторите типы."}}]}"#)
      .create_async()
      .await;

    let orch = test_orchestrator(server.url());
    let grade = orch.grade_answers("Rust", "Вопрос 1: что? Ответ: то").await.unwrap();
    assert_eq!(grade.correct_count, 9);
    assert_eq!(grade.recommendation, "Повторите типы.");
  }

  #[tokio::test]
  async fn summary_passes_percentages_through() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("POST", "/chat/completions")
      .match_body(Matcher::Regex("80.00".into()))
      .with_status(200)
      .with_body(r#"{"choices":[{"message":{"content":"Поздравляю с завершением курса!"}}]}"#)
      .create_async()
      .await;

    let orch = test_orchestrator(server.url());
    let summary = orch.summarize_course("Rust", 80.0, 20.0).await.unwrap();
    assert_eq!(summary, "Поздравляю с завершением курса!");
  }

  #[tokio::test]
  async fn exhaustion_spends_exactly_the_budget() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/chat/completions")
      .with_status(429)
      .with_header("Retry-After", "0")
      .with_body(r#"{"message":"Too many requests"}"#)
      .expect(2)
      .create_async()
      .await;

    let orch = test_orchestrator(server.url());
    // quiz uses the standard budget of two attempts
    let err = orch.generate_quiz("Rust", "материал", 1).await.unwrap_err();
    let OrchestratorError::Exhausted { attempts, last_error } = err;
    assert_eq!(attempts, 2);
    assert!(last_error.contains("429"), "{last_error}");
    mock.assert_async().await;
  }
}
