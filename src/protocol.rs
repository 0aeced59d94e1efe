//! Public request/response structs for the HTTP API (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::AnswerSheet;

//
// Shared query shape: most endpoints address one learner's course.
//

#[derive(Debug, Deserialize)]
pub struct CourseQuery {
    #[serde(rename = "learnerId")]
    pub learner_id: String,
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct LearnerQuery {
    #[serde(rename = "learnerId")]
    pub learner_id: String,
}

//
// Requests
//

/// Body shape shared by the course-level POST endpoints (start, retake,
/// next, reset): they all address one learner/language pair.
#[derive(Debug, Deserialize)]
pub struct CourseIn {
    #[serde(rename = "learnerId")]
    pub learner_id: String,
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswersIn {
    #[serde(rename = "learnerId")]
    pub learner_id: String,
    pub language: String,
    /// Answers keyed by question number. Missing numbers read as empty
    /// answers; unknown numbers beyond the quiz size are ignored.
    #[serde(default)]
    pub answers: BTreeMap<u32, String>,
}

//
// Responses
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct LearnerOut {
    #[serde(rename = "learnerId")]
    pub learner_id: String,
}

#[derive(Debug, Serialize)]
pub struct StartLanguageOut {
    pub language: String,
    /// False when the course already existed and is simply resumed.
    pub created: bool,
    pub day: i64,
}

#[derive(Debug, Serialize)]
pub struct TrainingDayOut {
    pub day: i64,
    pub material: String,
    pub questions: String,
}

#[derive(Debug, Serialize)]
pub struct AnswersOut {
    pub day: i64,
    /// How many of the submitted answers were non-empty.
    pub answered: usize,
}

#[derive(Debug, Serialize)]
pub struct ReviewOut {
    #[serde(rename = "correctPercentage")]
    pub correct_percentage: f64,
    #[serde(rename = "incorrectPercentage")]
    pub incorrect_percentage: f64,
    pub recommendation: String,
    pub day: i64,
    #[serde(rename = "lastDay")]
    pub last_day: bool,
}

#[derive(Serialize)]
pub struct RetakeOut {
    pub day: i64,
    pub cleared: bool,
}

#[derive(Serialize)]
pub struct NextDayOut {
    pub finished: bool,
    /// The day the learner should open next; absent once finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<i64>,
}

#[derive(Serialize)]
pub struct ResetOut {
    pub language: String,
    pub reset: bool,
}

#[derive(Debug, Serialize)]
pub struct DashboardOut {
    #[serde(rename = "popularLanguages")]
    pub popular_languages: Vec<String>,
    /// Language -> current day, for courses still in progress.
    pub active: BTreeMap<String, i64>,
    /// Language -> final day, for finished courses.
    pub completed: BTreeMap<String, i64>,
}

#[derive(Serialize)]
pub struct CourseSummaryOut {
    #[serde(rename = "correctAvg")]
    pub correct_avg: f64,
    #[serde(rename = "incorrectAvg")]
    pub incorrect_avg: f64,
    pub recommendations: String,
}

#[derive(Serialize)]
pub struct SummaryOut {
    pub courses: BTreeMap<String, CourseSummaryOut>,
}

#[derive(Serialize)]
pub struct DayRecordOut {
    pub day: i64,
    pub language: String,
    pub material: Option<String>,
    pub answers: AnswerSheet,
    #[serde(rename = "correctPercentage")]
    pub correct_percentage: Option<f64>,
    #[serde(rename = "incorrectPercentage")]
    pub incorrect_percentage: Option<f64>,
}

#[derive(Serialize)]
pub struct DaysOut {
    pub languages: BTreeMap<String, Vec<DayRecordOut>>,
}
