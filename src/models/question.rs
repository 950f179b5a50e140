// src/models/question.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::{error::AppError, utils::html::clean_html};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "MULTIPLE_CHOICE",
            QuestionType::TrueFalse => "TRUE_FALSE",
            QuestionType::ShortAnswer => "SHORT_ANSWER",
        }
    }

    /// Option-based questions are graded automatically from the selected option.
    pub fn is_option_based(&self) -> bool {
        !matches!(self, QuestionType::ShortAnswer)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MULTIPLE_CHOICE" => Ok(QuestionType::MultipleChoice),
            "TRUE_FALSE" => Ok(QuestionType::TrueFalse),
            "SHORT_ANSWER" => Ok(QuestionType::ShortAnswer),
            other => Err(AppError::Validation(format!("Unknown question type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Medium => "MEDIUM",
            Difficulty::Hard => "HARD",
        }
    }
}

impl FromStr for Difficulty {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EASY" => Ok(Difficulty::Easy),
            "MEDIUM" => Ok(Difficulty::Medium),
            "HARD" => Ok(Difficulty::Hard),
            other => Err(AppError::Validation(format!("Unknown difficulty '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,

    #[serde(rename = "type")]
    pub question_type: QuestionType,

    pub difficulty: Difficulty,
    pub text: String,
    pub explanation: Option<String>,
    pub points: f64,

    /// 1-based position inside the quiz, assigned as max + 1.
    #[serde(rename = "order")]
    pub position: i32,

    pub created_at: DateTime<Utc>,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub question_type: String,
    pub difficulty: String,
    pub text: String,
    pub explanation: Option<String>,
    pub points: f64,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = AppError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, value: &str| AppError::InternalServerError(format!("Corrupt question {} '{}'", what, value));
        Ok(Question {
            id: row.id,
            quiz_id: row.quiz_id,
            question_type: row.question_type.parse().map_err(|_| corrupt("type", &row.question_type))?,
            difficulty: row.difficulty.parse().map_err(|_| corrupt("difficulty", &row.difficulty))?,
            text: row.text,
            explanation: row.explanation,
            points: row.points,
            position: row.position,
            created_at: row.created_at,
        })
    }
}

/// Represents the 'question_options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: Uuid,
    pub question_id: Uuid,
    pub text: String,
    pub is_correct: bool,
    #[serde(rename = "order")]
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<AnswerOption>,
}

/// DTO for sending question to a taker (excludes answer key and explanation).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    pub points: f64,
    pub order: i32,
    pub options: Vec<PublicOption>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicOption {
    pub id: Uuid,
    pub text: String,
    pub order: i32,
}

impl From<QuestionWithOptions> for PublicQuestion {
    fn from(q: QuestionWithOptions) -> Self {
        PublicQuestion {
            id: q.question.id,
            question_type: q.question.question_type,
            text: q.question.text,
            points: q.question.points,
            order: q.question.position,
            options: q
                .options
                .into_iter()
                .map(|o| PublicOption {
                    id: o.id,
                    text: o.text,
                    order: o.position,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OptionInput {
    #[validate(length(min = 1, max = 500, message = "Option text is required."))]
    pub text: String,
    pub is_correct: bool,
}

/// DTO for adding a question to a quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct AddQuestionRequest {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[validate(length(min = 3, max = 2000, message = "Question text must be at least 3 characters."))]
    pub text: String,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    #[validate(range(min = 0.5, max = 1000.0, message = "Points must be at least 0.5."))]
    pub points: f64,
    pub difficulty: Option<Difficulty>,
    #[validate(nested)]
    pub options: Option<Vec<OptionInput>>,
}

impl AddQuestionRequest {
    /// Field rules plus the per-type option shape, then sanitises free text.
    pub fn into_new_question(self) -> Result<NewQuestion, AppError> {
        self.validate()?;

        let options = self.options.unwrap_or_default();
        match self.question_type {
            QuestionType::ShortAnswer if !options.is_empty() => {
                return Err(AppError::Validation("Short answer questions take no options".to_string()));
            }
            QuestionType::MultipleChoice if options.len() < 2 => {
                return Err(AppError::Validation("Multiple choice questions need at least 2 options".to_string()));
            }
            QuestionType::TrueFalse if options.len() != 2 => {
                return Err(AppError::Validation("True/false questions need exactly 2 options".to_string()));
            }
            t if t.is_option_based() && !options.iter().any(|o| o.is_correct) => {
                return Err(AppError::Validation("At least one option must be marked correct".to_string()));
            }
            _ => {}
        }

        Ok(NewQuestion {
            question_type: self.question_type,
            difficulty: self.difficulty.unwrap_or_default(),
            text: clean_html(&self.text),
            explanation: self.explanation.as_deref().map(clean_html),
            points: self.points,
            options: options
                .into_iter()
                .map(|o| NewOption {
                    text: clean_html(&o.text),
                    is_correct: o.is_correct,
                })
                .collect(),
        })
    }
}

/// Validated question handed to the store.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub text: String,
    pub explanation: Option<String>,
    pub points: f64,
    pub options: Vec<NewOption>,
}

#[derive(Debug, Clone)]
pub struct NewOption {
    pub text: String,
    pub is_correct: bool,
}

impl NewQuestion {
    /// Materialises the question and its options; options are ordered 1..n in input order.
    pub fn build(self, quiz_id: Uuid, position: i32, now: DateTime<Utc>) -> QuestionWithOptions {
        let question_id = Uuid::new_v4();
        let options = self
            .options
            .into_iter()
            .enumerate()
            .map(|(idx, o)| AnswerOption {
                id: Uuid::new_v4(),
                question_id,
                text: o.text,
                is_correct: o.is_correct,
                position: idx as i32 + 1,
            })
            .collect();

        QuestionWithOptions {
            question: Question {
                id: question_id,
                quiz_id,
                question_type: self.question_type,
                difficulty: self.difficulty,
                text: self.text,
                explanation: self.explanation,
                points: self.points,
                position,
                created_at: now,
            },
            options,
        }
    }
}
