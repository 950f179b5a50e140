// src/models/attempt.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

/// Attempt lifecycle: IN_PROGRESS -> SUBMITTED -> GRADED, or IN_PROGRESS -> GRADED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    Graded,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "IN_PROGRESS",
            AttemptStatus::Submitted => "SUBMITTED",
            AttemptStatus::Graded => "GRADED",
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttemptStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(AttemptStatus::InProgress),
            "SUBMITTED" => Ok(AttemptStatus::Submitted),
            "GRADED" => Ok(AttemptStatus::Graded),
            other => Err(AppError::InternalServerError(format!("Corrupt attempt status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub student_id: String,
    pub status: AttemptStatus,
    pub score: Option<f64>,
    pub percentage: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub graded_at: Option<DateTime<Utc>>,
}

impl QuizAttempt {
    pub fn start(quiz_id: Uuid, student_id: &str, now: DateTime<Utc>) -> Self {
        QuizAttempt {
            id: Uuid::new_v4(),
            quiz_id,
            student_id: student_id.to_string(),
            status: AttemptStatus::InProgress,
            score: None,
            percentage: None,
            started_at: now,
            submitted_at: None,
            graded_at: None,
        }
    }
}

/// Represents the 'quiz_attempts' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct AttemptRow {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub student_id: String,
    pub status: String,
    pub score: Option<f64>,
    pub percentage: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub graded_at: Option<DateTime<Utc>>,
}

impl TryFrom<AttemptRow> for QuizAttempt {
    type Error = AppError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        Ok(QuizAttempt {
            id: row.id,
            quiz_id: row.quiz_id,
            student_id: row.student_id,
            status: row.status.parse()?,
            score: row.score,
            percentage: row.percentage,
            started_at: row.started_at,
            submitted_at: row.submitted_at,
            graded_at: row.graded_at,
        })
    }
}

/// Represents the 'answers' table. One row per (attempt, question).
///
/// `is_correct` and `points_earned` are `None` until graded.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub selected_option_id: Option<Uuid>,
    pub text_answer: Option<String>,
    pub is_correct: Option<bool>,
    pub points_earned: Option<f64>,
    pub feedback: Option<String>,
    pub graded_by: Option<String>,
    pub answered_at: DateTime<Utc>,
    pub graded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptDetail {
    #[serde(flatten)]
    pub attempt: QuizAttempt,
    pub answers: Vec<Answer>,
}

/// What the student picked. Exactly one variant drives grading.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// An option of an option-based question; `text` is kept alongside but never graded.
    SingleOption { option_id: Uuid, text: Option<String> },
    /// Free text for a short-answer question.
    FreeText(String),
}

impl Selection {
    pub fn option_id(&self) -> Option<Uuid> {
        match self {
            Selection::SingleOption { option_id, .. } => Some(*option_id),
            Selection::FreeText(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Selection::SingleOption { text, .. } => text.as_deref(),
            Selection::FreeText(text) => Some(text),
        }
    }
}

/// DTO for saving one answer.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub question_id: Uuid,
    pub selected_option_id: Option<Uuid>,
    #[validate(length(max = 10000))]
    pub text_answer: Option<String>,
}

impl SubmitAnswerRequest {
    pub fn selection(&self) -> Result<Selection, AppError> {
        self.validate()?;
        // Stored as typed; renderers escape on output.
        let text = self.text_answer.clone();
        match (self.selected_option_id, text) {
            (Some(option_id), text) => Ok(Selection::SingleOption { option_id, text }),
            (None, Some(text)) if !text.trim().is_empty() => Ok(Selection::FreeText(text)),
            _ => Err(AppError::Validation(
                "An answer needs selected_option_id or a non-empty text_answer".to_string(),
            )),
        }
    }
}

/// DTO for grading a short answer.
#[derive(Debug, Deserialize, Validate)]
pub struct GradeAnswerRequest {
    pub points_earned: f64,
    #[validate(length(max = 2000))]
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartAttemptResponse {
    pub attempt_id: Uuid,
}
