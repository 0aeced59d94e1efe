//! Core behaviors behind the HTTP handlers: course lifecycle, day
//! generation, answer submission, grading and aggregates.
//!
//! Every flow addresses one learner/language pair and leans on the
//! "latest day" record: days only move forward once the current one is
//! graded, so the newest row always describes where the learner stands.

use std::collections::BTreeMap;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::TrainingDayRow;
use crate::domain::{
  build_transcript, clamp_day, AnswerSheet, CourseStats, QuestionAnswer, FIRST_DAY, LAST_DAY,
  POPULAR_LANGUAGES, QUIZ_QUESTIONS,
};
use crate::error::AppError;
use crate::postprocess::{self, NO_RECOMMENDATION};
use crate::protocol::{
  AnswersOut, CourseSummaryOut, DashboardOut, DayRecordOut, DaysOut, NextDayOut, ResetOut,
  RetakeOut, ReviewOut, StartLanguageOut, SummaryOut, TrainingDayOut,
};
use crate::state::AppState;
use crate::util::round2;

/// Register a fresh learner and hand back its opaque id.
pub async fn mint_learner(state: &AppState) -> Result<String, AppError> {
  let id = Uuid::new_v4().to_string();
  state.db.create_learner(&id).await?;
  info!(target: "training", learner = %id, "Learner created");
  Ok(id)
}

async fn require_learner(state: &AppState, learner_id: &str) -> Result<(), AppError> {
  if state.db.learner_exists(learner_id).await? {
    Ok(())
  } else {
    Err(AppError::UnknownLearner(learner_id.to_string()))
  }
}

/// Begin (or resume) a language course. Starting an already-known language
/// is not an error: the existing course is simply resumed.
#[instrument(level = "info", skip(state, learner_id), fields(language))]
pub async fn start_language(
  state: &AppState,
  learner_id: &str,
  language: &str,
) -> Result<StartLanguageOut, AppError> {
  require_learner(state, learner_id).await?;
  let language = language.trim();
  if language.is_empty() {
    return Err(AppError::InvalidRequest("language must not be empty".into()));
  }

  match state.db.latest_day(learner_id, language).await? {
    Some(rec) => Ok(StartLanguageOut { language: language.to_string(), created: false, day: rec.day }),
    None => {
      state.db.create_day(learner_id, language, FIRST_DAY).await?;
      info!(target: "training", learner = %learner_id, %language, "Course started");
      Ok(StartLanguageOut { language: language.to_string(), created: true, day: FIRST_DAY })
    }
  }
}

/// Serve the learner's current day, generating material and quiz when the
/// stored row has none. Re-serving an ungraded day with content is free;
/// a graded day moves the course forward one day first.
#[instrument(level = "info", skip(state, learner_id), fields(language))]
pub async fn produce_day(
  state: &AppState,
  learner_id: &str,
  language: &str,
) -> Result<TrainingDayOut, AppError> {
  require_learner(state, learner_id).await?;
  let latest = state.db.latest_day(learner_id, language).await?;

  let current_day = match &latest {
    None => FIRST_DAY,
    Some(rec) if rec.is_graded() => rec.day + 1,
    Some(rec) => {
      if rec.has_content() {
        return Ok(TrainingDayOut {
          day: rec.day,
          material: rec.material.clone().unwrap_or_default(),
          questions: rec.questions.clone().unwrap_or_default(),
        });
      }
      rec.day
    }
  };

  if current_day > LAST_DAY {
    return Err(AppError::CourseFinished(language.to_string()));
  }
  let current_day = clamp_day(current_day);

  if let Some(existing) = state.db.day_record(learner_id, language, current_day).await? {
    if existing.has_content() {
      return Ok(TrainingDayOut {
        day: existing.day,
        material: existing.material.unwrap_or_default(),
        questions: existing.questions.unwrap_or_default(),
      });
    }
  }

  let material = state.orchestrator.generate_material(language, current_day).await?;
  let questions = state.orchestrator.generate_quiz(language, &material, current_day).await?;
  state
    .db
    .save_day_content(learner_id, language, current_day, &material, &questions)
    .await?;
  info!(target: "training", learner = %learner_id, %language, day = current_day, "Training day generated");

  Ok(TrainingDayOut { day: current_day, material, questions })
}

/// Store submitted answers against the current day, pairing each answer
/// with the first line of its question block. Missing answers are kept as
/// empty strings so the grading transcript always covers all 15 questions.
#[instrument(level = "info", skip(state, learner_id, provided), fields(language, provided = provided.len()))]
pub async fn submit_answers(
  state: &AppState,
  learner_id: &str,
  language: &str,
  provided: &BTreeMap<u32, String>,
) -> Result<AnswersOut, AppError> {
  require_learner(state, learner_id).await?;
  let current = state
    .db
    .latest_day(learner_id, language)
    .await?
    .ok_or_else(|| AppError::NoActiveCourse(learner_id.to_string()))?;
  let questions = current.questions.clone().ok_or(AppError::DayNotReached(current.day))?;

  let titles = postprocess::question_titles(&questions);
  let mut sheet = AnswerSheet::new();
  for n in 1..=QUIZ_QUESTIONS {
    let answer = provided.get(&n).cloned().unwrap_or_default();
    let question = titles.get((n - 1) as usize).cloned().unwrap_or_default();
    sheet.insert(n, QuestionAnswer { question, answer });
  }
  let answered = sheet.values().filter(|qa| !qa.answer.trim().is_empty()).count();

  let json = serde_json::to_string(&sheet)
    .map_err(|e| AppError::Internal(format!("answer sheet serialization: {e}")))?;
  state.db.save_answers(learner_id, language, current.day, &json).await?;
  info!(target: "training", learner = %learner_id, %language, day = current.day, answered, "Answers saved");

  Ok(AnswersOut { day: current.day, answered })
}

/// Grade the current day (or replay a stored grade) and, on day 30, build
/// and store the whole-course summary.
#[instrument(level = "info", skip(state, learner_id), fields(language))]
pub async fn review_day(
  state: &AppState,
  learner_id: &str,
  language: &str,
) -> Result<ReviewOut, AppError> {
  require_learner(state, learner_id).await?;
  let record = state
    .db
    .latest_day(learner_id, language)
    .await?
    .ok_or_else(|| AppError::NoActiveCourse(learner_id.to_string()))?;
  let answers_json = record
    .answers
    .clone()
    .ok_or_else(|| AppError::InvalidRequest("no submitted answers to grade".into()))?;

  let stored = match (
    record.correct_percentage,
    record.recommendation.as_deref().filter(|s| !s.is_empty()),
  ) {
    (Some(correct), Some(rec)) => Some((correct, rec.to_string())),
    _ => None,
  };

  let (correct, recommendation) = match stored {
    Some(v) => v,
    None => {
      let sheet: AnswerSheet = serde_json::from_str(&answers_json).unwrap_or_default();
      let transcript = build_transcript(&sheet);
      let grade = state.orchestrator.grade_answers(language, &transcript).await?;
      let correct = grade.correct_pct();
      state
        .db
        .save_grade(learner_id, language, record.day, correct, 100.0 - correct, &grade.recommendation)
        .await?;
      info!(
        target: "training",
        learner = %learner_id,
        %language,
        day = record.day,
        correct_count = grade.correct_count,
        "Day graded"
      );
      (correct, grade.recommendation)
    }
  };

  let last_day = record.day == LAST_DAY;
  if last_day {
    let days = state.db.days_for_language(learner_id, language).await?;
    let stats = graded_stats(&days);
    let summary = state
      .orchestrator
      .summarize_course(language, stats.correct_avg, stats.incorrect_avg)
      .await?;
    state
      .db
      .upsert_summary(learner_id, language, LAST_DAY, &summary, stats.correct_avg, stats.incorrect_avg)
      .await?;
    info!(target: "training", learner = %learner_id, %language, "Course summary stored");
  }

  Ok(ReviewOut {
    correct_percentage: correct,
    incorrect_percentage: 100.0 - correct,
    recommendation,
    day: record.day,
    last_day,
  })
}

/// Wipe the current day's grade so the quiz can be taken again. Material,
/// questions and previously submitted answers stay in place.
#[instrument(level = "info", skip(state, learner_id), fields(language))]
pub async fn retake_day(
  state: &AppState,
  learner_id: &str,
  language: &str,
) -> Result<RetakeOut, AppError> {
  require_learner(state, learner_id).await?;
  let record = state
    .db
    .latest_day(learner_id, language)
    .await?
    .ok_or_else(|| AppError::NoActiveCourse(learner_id.to_string()))?;
  state.db.clear_grade(learner_id, language, record.day).await?;
  info!(target: "training", learner = %learner_id, %language, day = record.day, "Grade cleared for retake");
  Ok(RetakeOut { day: record.day, cleared: true })
}

/// Tell the learner which day comes next. On the last day this finalizes
/// the course with a stock congratulation summary; otherwise the next day
/// is the one after the current day once it is graded.
#[instrument(level = "info", skip(state, learner_id), fields(language))]
pub async fn advance_day(
  state: &AppState,
  learner_id: &str,
  language: &str,
) -> Result<NextDayOut, AppError> {
  require_learner(state, learner_id).await?;
  let record = state
    .db
    .latest_day(learner_id, language)
    .await?
    .ok_or_else(|| AppError::NoActiveCourse(learner_id.to_string()))?;

  if record.day >= LAST_DAY {
    let days = state.db.days_for_language(learner_id, language).await?;
    let stats = graded_stats(&days);
    let summary = format!(
      "Поздравляем! Это был последний день обучения. Ваш средний процент правильных ответов: {:.2}%.",
      stats.correct_avg
    );
    state
      .db
      .upsert_summary(learner_id, language, LAST_DAY, &summary, stats.correct_avg, stats.incorrect_avg)
      .await?;
    info!(target: "training", learner = %learner_id, %language, "Course completed");
    return Ok(NextDayOut { finished: true, day: None });
  }

  let day = if record.is_graded() { record.day + 1 } else { record.day };
  Ok(NextDayOut { finished: false, day: Some(day) })
}

/// Delete every stored day and the summary for one language.
#[instrument(level = "info", skip(state, learner_id), fields(language))]
pub async fn reset_language(
  state: &AppState,
  learner_id: &str,
  language: &str,
) -> Result<ResetOut, AppError> {
  require_learner(state, learner_id).await?;
  state.db.reset_language(learner_id, language).await?;
  info!(target: "training", learner = %learner_id, %language, "Training reset");
  Ok(ResetOut { language: language.to_string(), reset: true })
}

/// Split the learner's languages into in-progress and finished, with the
/// stock suggestion list for newcomers.
pub async fn dashboard(state: &AppState, learner_id: &str) -> Result<DashboardOut, AppError> {
  require_learner(state, learner_id).await?;
  let mut active = BTreeMap::new();
  let mut completed = BTreeMap::new();

  for language in state.db.languages_for(learner_id).await? {
    let Some(last) = state.db.latest_day(learner_id, &language).await? else {
      continue;
    };
    // a course is done only once day 30 itself carries a grade
    if last.day < LAST_DAY || !last.is_graded() {
      active.insert(language, last.day);
    } else {
      completed.insert(language, last.day);
    }
  }

  Ok(DashboardOut {
    popular_languages: POPULAR_LANGUAGES.iter().map(|s| s.to_string()).collect(),
    active,
    completed,
  })
}

/// Stored course summaries enriched with per-language averages.
pub async fn course_summaries(state: &AppState, learner_id: &str) -> Result<SummaryOut, AppError> {
  require_learner(state, learner_id).await?;
  let mut courses = BTreeMap::new();

  for row in state.db.summaries_for(learner_id).await? {
    let days = state.db.days_for_language(learner_id, &row.language).await?;
    let stats = graded_stats(&days);
    courses.insert(
      row.language.clone(),
      CourseSummaryOut {
        correct_avg: round2(stats.correct_avg),
        incorrect_avg: round2(stats.incorrect_avg),
        recommendations: row.summary.unwrap_or_else(|| NO_RECOMMENDATION.to_string()),
      },
    );
  }

  Ok(SummaryOut { courses })
}

/// Full day-by-day history for every language the learner touched.
pub async fn day_records(state: &AppState, learner_id: &str) -> Result<DaysOut, AppError> {
  require_learner(state, learner_id).await?;
  let mut languages = BTreeMap::new();

  for language in state.db.languages_for(learner_id).await? {
    let records = state.db.days_for_language(learner_id, &language).await?;
    let out: Vec<DayRecordOut> = records
      .into_iter()
      .map(|r| {
        // stored answers may be absent or corrupt; show an empty sheet then
        let answers: AnswerSheet = r
          .answers
          .as_deref()
          .filter(|s| !s.trim().is_empty())
          .and_then(|s| serde_json::from_str(s).ok())
          .unwrap_or_default();
        DayRecordOut {
          day: r.day,
          language: r.language,
          material: r.material,
          answers,
          correct_percentage: r.correct_percentage,
          incorrect_percentage: r.incorrect_percentage,
        }
      })
      .collect();
    languages.insert(language, out);
  }

  Ok(DaysOut { languages })
}

/// Averages across graded days only. Ungraded days are excluded from both
/// the numerator and the denominator.
fn graded_stats(days: &[TrainingDayRow]) -> CourseStats {
  let graded: Vec<&TrainingDayRow> = days.iter().filter(|r| r.is_graded()).collect();
  if graded.is_empty() {
    return CourseStats::default();
  }
  let n = graded.len() as f64;
  CourseStats {
    correct_avg: graded.iter().map(|r| r.correct_percentage.unwrap_or_default()).sum::<f64>() / n,
    incorrect_avg: graded.iter().map(|r| r.incorrect_percentage.unwrap_or_default()).sum::<f64>() / n,
  }
}
