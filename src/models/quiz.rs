// src/models/quiz.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{PublicQuestion, QuestionWithOptions},
};

/// Lifecycle status of a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizStatus {
    Draft,
    Published,
    Closed,
}

impl QuizStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizStatus::Draft => "DRAFT",
            QuizStatus::Published => "PUBLISHED",
            QuizStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for QuizStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuizStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(QuizStatus::Draft),
            "PUBLISHED" => Ok(QuizStatus::Published),
            "CLOSED" => Ok(QuizStatus::Closed),
            other => Err(AppError::Validation(format!("Unknown quiz status '{}'", other))),
        }
    }
}

/// Whether the row is live or soft-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordState {
    #[default]
    Active,
    Deleted { at: DateTime<Utc> },
}

impl RecordState {
    pub fn from_deleted_at(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            Some(at) => RecordState::Deleted { at },
            None => RecordState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, RecordState::Active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: String,
    pub status: QuizStatus,

    /// Minutes. Informational: the timer is enforced by the client.
    pub duration: i32,

    /// Sum of the current questions' points.
    pub total_points: f64,

    /// Percentage threshold, informational.
    pub passing_score: f64,

    pub shuffle_questions: bool,
    pub shuffle_options: bool,
    pub show_results: bool,
    pub allow_review: bool,

    /// Attempts may only be started inside `[start_time, end_time]`; a missing bound is open.
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    #[serde(skip)]
    pub record_state: RecordState,
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct QuizRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: String,
    pub status: String,
    pub duration: i32,
    pub total_points: f64,
    pub passing_score: f64,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
    pub show_results: bool,
    pub allow_review: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<QuizRow> for Quiz {
    type Error = AppError;

    fn try_from(row: QuizRow) -> Result<Self, Self::Error> {
        Ok(Quiz {
            id: row.id,
            title: row.title,
            description: row.description,
            creator_id: row.creator_id,
            status: row
                .status
                .parse()
                .map_err(|_| AppError::InternalServerError(format!("Corrupt quiz status '{}'", row.status)))?,
            duration: row.duration,
            total_points: row.total_points,
            passing_score: row.passing_score,
            shuffle_questions: row.shuffle_questions,
            shuffle_options: row.shuffle_options,
            show_results: row.show_results,
            allow_review: row.allow_review,
            start_time: row.start_time,
            end_time: row.end_time,
            created_at: row.created_at,
            record_state: RecordState::from_deleted_at(row.deleted_at),
        })
    }
}

/// List item with question and attempt counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSummary {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub question_count: i64,
    pub attempt_count: i64,
}

/// Full quiz including the answer key. Only returned to editors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuestionWithOptions>,
}

/// Quiz as shown to takers: no `is_correct`, no explanations.
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<PublicQuestion>,
}

impl From<QuizDetail> for PublicQuizDetail {
    fn from(detail: QuizDetail) -> Self {
        PublicQuizDetail {
            quiz: detail.quiz,
            questions: detail.questions.into_iter().map(PublicQuestion::from).collect(),
        }
    }
}

/// Query string for listing quizzes. `status=ALL` or absent means no filter.
#[derive(Debug, Default, Deserialize)]
pub struct QuizListQuery {
    pub status: Option<String>,
}

impl QuizListQuery {
    pub fn status_filter(&self) -> Result<Option<QuizStatus>, AppError> {
        match self.status.as_deref() {
            None | Some("ALL") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }
}

/// DTO for creating a new quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 2, max = 200, message = "Title must be between 2 and 200 characters."))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 5, max = 300, message = "Duration must be between 5 and 300 minutes."))]
    pub duration: i32,
    #[validate(range(min = 0.0, max = 100.0, message = "Passing score must be between 0 and 100."))]
    pub passing_score: f64,
    pub shuffle_questions: Option<bool>,
    pub shuffle_options: Option<bool>,
    pub show_results: Option<bool>,
    pub allow_review: Option<bool>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl CreateQuizRequest {
    /// Field rules plus the cross-field window check.
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()?;
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start >= end {
                return Err(AppError::Validation("start_time must be before end_time".to_string()));
            }
        }
        Ok(())
    }

    pub fn into_new_quiz(self, creator_id: &str) -> NewQuiz {
        NewQuiz {
            title: self.title.trim().to_string(),
            description: self.description,
            creator_id: creator_id.to_string(),
            duration: self.duration,
            passing_score: self.passing_score,
            shuffle_questions: self.shuffle_questions.unwrap_or(false),
            shuffle_options: self.shuffle_options.unwrap_or(false),
            show_results: self.show_results.unwrap_or(true),
            allow_review: self.allow_review.unwrap_or(true),
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// Validated input handed to the store.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub title: String,
    pub description: Option<String>,
    pub creator_id: String,
    pub duration: i32,
    pub passing_score: f64,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
    pub show_results: bool,
    pub allow_review: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl NewQuiz {
    pub fn into_quiz(self, id: Uuid, now: DateTime<Utc>) -> Quiz {
        Quiz {
            id,
            title: self.title,
            description: self.description,
            creator_id: self.creator_id,
            status: QuizStatus::Draft,
            duration: self.duration,
            total_points: 0.0,
            passing_score: self.passing_score,
            shuffle_questions: self.shuffle_questions,
            shuffle_options: self.shuffle_options,
            show_results: self.show_results,
            allow_review: self.allow_review,
            start_time: self.start_time,
            end_time: self.end_time,
            created_at: now,
            record_state: RecordState::Active,
        }
    }
}
