//! SQLite persistence for learners, their training days and course summaries.
//!
//! One row per (learner, language, day). Content columns start out NULL and
//! fill in as the day progresses: material/questions at generation time,
//! answers at submission, grade columns at review.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// One day of training for one learner and language.
#[derive(Debug, Clone, FromRow)]
pub struct TrainingDayRow {
    pub id: i64,
    pub learner_id: String,
    pub language: String,
    pub day: i64,
    pub material: Option<String>,
    pub questions: Option<String>,
    pub answers: Option<String>,
    pub recommendation: Option<String>,
    pub correct_percentage: Option<f64>,
    pub incorrect_percentage: Option<f64>,
}

impl TrainingDayRow {
    /// A day counts as graded once review stored a percentage.
    pub fn is_graded(&self) -> bool {
        self.correct_percentage.is_some()
    }

    /// Material and questions both present, i.e. the day can be served
    /// without calling the generator.
    pub fn has_content(&self) -> bool {
        self.material.is_some() && self.questions.is_some()
    }
}

/// Stored end-of-course summary. One per (learner, language).
#[derive(Debug, Clone, FromRow)]
pub struct SummaryRow {
    pub id: i64,
    pub learner_id: String,
    pub language: String,
    pub day: i64,
    pub summary: Option<String>,
    pub overall_correct_percentage: Option<f64>,
    pub overall_incorrect_percentage: Option<f64>,
}

/// Database connection pool for training state.
#[derive(Clone)]
pub struct TrainingDb {
    pool: SqlitePool,
}

impl TrainingDb {
    /// Open (or create) the database file and bring the schema up to date.
    pub async fn new(db_path: &str) -> Result<Self, sqlx::Error> {
        let connection_string = if db_path.starts_with("sqlite:") {
            db_path.to_string()
        } else {
            format!("sqlite:{}", db_path)
        };

        let options = SqliteConnectOptions::from_str(&connection_string)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!("Connected to SQLite database at: {}", db_path);

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        let migration_sql = include_str!("../migrations/001_create_training.sql");
        for statement in migration_sql.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Database migrations completed");
        Ok(())
    }

    // --- learners ---

    pub async fn create_learner(&self, id: &str) -> Result<(), sqlx::Error> {
        let created_at = chrono::Utc::now().timestamp();
        sqlx::query("INSERT OR IGNORE INTO learners (id, created_at) VALUES (?, ?)")
            .bind(id)
            .bind(created_at)
            .execute(&self.pool)
            .await?;
        debug!("Created learner: {}", id);
        Ok(())
    }

    pub async fn learner_exists(&self, id: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM learners WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    // --- training days ---

    /// Most advanced day for a learner/language pair, if any.
    pub async fn latest_day(
        &self,
        learner_id: &str,
        language: &str,
    ) -> Result<Option<TrainingDayRow>, sqlx::Error> {
        sqlx::query_as::<_, TrainingDayRow>(
            "SELECT id, learner_id, language, day, material, questions, answers, recommendation, correct_percentage, incorrect_percentage \
             FROM training_days WHERE learner_id = ? AND language = ? ORDER BY day DESC LIMIT 1",
        )
        .bind(learner_id)
        .bind(language)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn day_record(
        &self,
        learner_id: &str,
        language: &str,
        day: i64,
    ) -> Result<Option<TrainingDayRow>, sqlx::Error> {
        sqlx::query_as::<_, TrainingDayRow>(
            "SELECT id, learner_id, language, day, material, questions, answers, recommendation, correct_percentage, incorrect_percentage \
             FROM training_days WHERE learner_id = ? AND language = ? AND day = ?",
        )
        .bind(learner_id)
        .bind(language)
        .bind(day)
        .fetch_optional(&self.pool)
        .await
    }

    /// All days for one language, ascending.
    pub async fn days_for_language(
        &self,
        learner_id: &str,
        language: &str,
    ) -> Result<Vec<TrainingDayRow>, sqlx::Error> {
        sqlx::query_as::<_, TrainingDayRow>(
            "SELECT id, learner_id, language, day, material, questions, answers, recommendation, correct_percentage, incorrect_percentage \
             FROM training_days WHERE learner_id = ? AND language = ? ORDER BY day ASC",
        )
        .bind(learner_id)
        .bind(language)
        .fetch_all(&self.pool)
        .await
    }

    /// Languages with at least one day in the course range.
    pub async fn languages_for(&self, learner_id: &str) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT language FROM training_days \
             WHERE learner_id = ? AND day BETWEEN 1 AND 30 ORDER BY language ASC",
        )
        .bind(learner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(language,)| language).collect())
    }

    /// Blank row for a fresh day. Does nothing if the day already exists.
    pub async fn create_day(
        &self,
        learner_id: &str,
        language: &str,
        day: i64,
    ) -> Result<(), sqlx::Error> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "INSERT OR IGNORE INTO training_days (learner_id, language, day, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(learner_id)
        .bind(language)
        .bind(day)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        debug!("Created training day {} for {} / {}", day, learner_id, language);
        Ok(())
    }

    /// Store generated material and questions, inserting the row if needed.
    pub async fn save_day_content(
        &self,
        learner_id: &str,
        language: &str,
        day: i64,
        material: &str,
        questions: &str,
    ) -> Result<(), sqlx::Error> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO training_days (learner_id, language, day, material, questions, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(learner_id, language, day) \
             DO UPDATE SET material = excluded.material, questions = excluded.questions, \
                           updated_at = excluded.updated_at",
        )
        .bind(learner_id)
        .bind(language)
        .bind(day)
        .bind(material)
        .bind(questions)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        debug!("Saved content for {} / {} day {}", learner_id, language, day);
        Ok(())
    }

    pub async fn save_answers(
        &self,
        learner_id: &str,
        language: &str,
        day: i64,
        answers_json: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE training_days SET answers = ?, updated_at = ? \
             WHERE learner_id = ? AND language = ? AND day = ?",
        )
        .bind(answers_json)
        .bind(chrono::Utc::now().timestamp())
        .bind(learner_id)
        .bind(language)
        .bind(day)
        .execute(&self.pool)
        .await?;
        debug!("Saved answers for {} / {} day {}", learner_id, language, day);
        Ok(())
    }

    pub async fn save_grade(
        &self,
        learner_id: &str,
        language: &str,
        day: i64,
        correct_percentage: f64,
        incorrect_percentage: f64,
        recommendation: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE training_days SET correct_percentage = ?, incorrect_percentage = ?, recommendation = ?, updated_at = ? \
             WHERE learner_id = ? AND language = ? AND day = ?",
        )
        .bind(correct_percentage)
        .bind(incorrect_percentage)
        .bind(recommendation)
        .bind(chrono::Utc::now().timestamp())
        .bind(learner_id)
        .bind(language)
        .bind(day)
        .execute(&self.pool)
        .await?;
        debug!("Saved grade for {} / {} day {}", learner_id, language, day);
        Ok(())
    }

    /// Drop the grade columns so the learner can retake the day's quiz.
    pub async fn clear_grade(
        &self,
        learner_id: &str,
        language: &str,
        day: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE training_days SET correct_percentage = NULL, incorrect_percentage = NULL, recommendation = NULL, \
             updated_at = ? \
             WHERE learner_id = ? AND language = ? AND day = ?",
        )
        .bind(chrono::Utc::now().timestamp())
        .bind(learner_id)
        .bind(language)
        .bind(day)
        .execute(&self.pool)
        .await?;
        debug!("Cleared grade for {} / {} day {}", learner_id, language, day);
        Ok(())
    }

    // --- course summaries ---

    /// Write the end-of-course summary, replacing any previous one for the
    /// same learner/language pair.
    pub async fn upsert_summary(
        &self,
        learner_id: &str,
        language: &str,
        day: i64,
        summary: &str,
        overall_correct: f64,
        overall_incorrect: f64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO course_summaries (learner_id, language, day, summary, overall_correct_percentage, overall_incorrect_percentage, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(learner_id, language) \
             DO UPDATE SET day = excluded.day, summary = excluded.summary, \
                           overall_correct_percentage = excluded.overall_correct_percentage, \
                           overall_incorrect_percentage = excluded.overall_incorrect_percentage",
        )
        .bind(learner_id)
        .bind(language)
        .bind(day)
        .bind(summary)
        .bind(overall_correct)
        .bind(overall_incorrect)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        debug!("Upserted summary for {} / {}", learner_id, language);
        Ok(())
    }

    pub async fn summaries_for(&self, learner_id: &str) -> Result<Vec<SummaryRow>, sqlx::Error> {
        sqlx::query_as::<_, SummaryRow>(
            "SELECT id, learner_id, language, day, summary, overall_correct_percentage, overall_incorrect_percentage \
             FROM course_summaries WHERE learner_id = ? ORDER BY language ASC",
        )
        .bind(learner_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Remove every trace of one language's course: days and summary.
    pub async fn reset_language(
        &self,
        learner_id: &str,
        language: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM training_days WHERE learner_id = ? AND language = ?")
            .bind(learner_id)
            .bind(language)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM course_summaries WHERE learner_id = ? AND language = ?")
            .bind(learner_id)
            .bind(language)
            .execute(&self.pool)
            .await?;
        debug!("Reset training for {} / {}", learner_id, language);
        Ok(())
    }
}
