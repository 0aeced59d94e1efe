//! Domain models used by the backend: day bounds, answer sheets, grade
//! reports, and aggregate course statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// First day of every course.
pub const FIRST_DAY: i64 = 1;
/// Last day of every course; grading it completes the language.
pub const LAST_DAY: i64 = 30;
/// Fixed quiz size: 10 multiple-choice questions followed by 5 coding tasks.
pub const QUIZ_QUESTIONS: u32 = 15;
/// Questions numbered above this are open coding tasks (no options).
pub const CHOICE_QUESTIONS: u32 = 10;

/// Suggestions shown on the dashboard before any course is started.
pub const POPULAR_LANGUAGES: &[&str] = &["Python", "JavaScript", "Java", "C++", "Ruby"];

/// One submitted answer paired with the question text it answers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuestionAnswer {
  pub question: String,
  pub answer: String,
}

/// Answers keyed by question number (1..=15). A BTreeMap keeps transcript
/// order numeric rather than lexicographic.
pub type AnswerSheet = BTreeMap<u32, QuestionAnswer>;

/// Grading verdict extracted from the model's free-text reply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradeReport {
  pub correct_count: u32,
  pub recommendation: String,
}

impl GradeReport {
  /// Percentage of correct answers implied by the count.
  pub fn correct_pct(&self) -> f64 {
    (self.correct_count as f64 / QUIZ_QUESTIONS as f64) * 100.0
  }
}

/// Averages across all graded days of one language.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct CourseStats {
  pub correct_avg: f64,
  pub incorrect_avg: f64,
}

/// Clamp a day index into the valid [1, 30] range.
pub fn clamp_day(day: i64) -> i64 {
  day.clamp(FIRST_DAY, LAST_DAY)
}

/// Render the grading transcript: one "Вопрос N: … Ответ: …" line per
/// question, ascending by number. This is the exact shape the grading
/// prompt expects on input.
pub fn build_transcript(sheet: &AnswerSheet) -> String {
  let mut lines = Vec::with_capacity(sheet.len());
  for (num, qa) in sheet {
    lines.push(format!("Вопрос {}: {} Ответ: {}", num, qa.question, qa.answer));
  }
  lines.join("\n")
}
