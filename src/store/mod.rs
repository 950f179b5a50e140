// src/store/mod.rs

//! Transactional store seam. Each method is one atomic unit of work: either
//! every write it performs commits, or none does.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        attempt::{Answer, AttemptDetail, QuizAttempt, Selection},
        question::{NewQuestion, QuestionWithOptions},
        quiz::{NewQuiz, Quiz, QuizDetail, QuizStatus, QuizSummary},
    },
};

pub use memory::MemoryQuizStore;
pub use postgres::PgQuizStore;

/// Result of `start_attempt`: the attempt, and whether it already existed.
#[derive(Debug, Clone)]
pub struct StartedAttempt {
    pub attempt: QuizAttempt,
    pub resumed: bool,
}

/// A grader's verdict on one answer.
#[derive(Debug, Clone)]
pub struct ManualGrade {
    pub points_earned: f64,
    pub feedback: Option<String>,
    pub grader_id: String,
}

#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn create_quiz(&self, quiz: NewQuiz, now: DateTime<Utc>) -> AppResult<Quiz>;

    /// Live quizzes, newest first.
    async fn list_quizzes(&self, status: Option<QuizStatus>) -> AppResult<Vec<QuizSummary>>;

    async fn get_quiz(&self, quiz_id: Uuid) -> AppResult<QuizDetail>;

    /// Moves the quiz to PUBLISHED and recomputes `total_points`.
    async fn publish_quiz(&self, quiz_id: Uuid) -> AppResult<Quiz>;

    async fn close_quiz(&self, quiz_id: Uuid) -> AppResult<Quiz>;

    /// Soft delete. Refused once any attempt exists.
    async fn delete_quiz(&self, quiz_id: Uuid, now: DateTime<Utc>) -> AppResult<()>;

    /// Inserts the question at max + 1 and recomputes `total_points` in the same unit of work.
    async fn add_question(
        &self,
        quiz_id: Uuid,
        question: NewQuestion,
        now: DateTime<Utc>,
    ) -> AppResult<QuestionWithOptions>;

    /// Removes the question (with its options and answers) and recomputes `total_points`.
    async fn delete_question(&self, question_id: Uuid) -> AppResult<Quiz>;

    /// Creates the (quiz, student) attempt or resumes the in-progress one.
    /// Concurrent calls for the same pair never produce two attempts.
    async fn start_attempt(&self, quiz_id: Uuid, student_id: &str, now: DateTime<Utc>) -> AppResult<StartedAttempt>;

    /// Grades and upserts the (attempt, question) answer; last write wins.
    async fn submit_answer(
        &self,
        attempt_id: Uuid,
        student_id: &str,
        question_id: Uuid,
        selection: Selection,
        now: DateTime<Utc>,
    ) -> AppResult<Answer>;

    /// Terminal transition out of IN_PROGRESS with the score computed.
    async fn submit_attempt(&self, attempt_id: Uuid, student_id: &str, now: DateTime<Utc>) -> AppResult<QuizAttempt>;

    /// Sets a grader's points on an answer and recomputes the attempt aggregate,
    /// serialized per attempt.
    async fn grade_answer(&self, answer_id: Uuid, grade: ManualGrade, now: DateTime<Utc>) -> AppResult<QuizAttempt>;

    async fn get_attempt(&self, attempt_id: Uuid) -> AppResult<AttemptDetail>;

    /// Attempts of a quiz, most recently started first.
    async fn list_attempts(&self, quiz_id: Uuid) -> AppResult<Vec<QuizAttempt>>;
}
