// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    config::PendingReviewPolicy,
    engine::{
        lifecycle::{self, AttemptUpdate},
        scoring,
    },
    error::{AppError, AppResult},
    models::{
        attempt::{Answer, AttemptDetail, AttemptRow, QuizAttempt, Selection},
        question::{AnswerOption, NewQuestion, Question, QuestionRow, QuestionWithOptions},
        quiz::{NewQuiz, Quiz, QuizDetail, QuizRow, QuizStatus, QuizSummary},
    },
    store::{ManualGrade, QuizStore, StartedAttempt},
};

const QUIZ_COLUMNS: &str = "id, title, description, creator_id, status, duration, total_points, passing_score, \
     shuffle_questions, shuffle_options, show_results, allow_review, start_time, end_time, created_at, deleted_at";

const QUESTION_COLUMNS: &str = "id, quiz_id, question_type, difficulty, text, explanation, points, position, created_at";

const ATTEMPT_COLUMNS: &str = "id, quiz_id, student_id, status, score, percentage, started_at, submitted_at, graded_at";

const ANSWER_COLUMNS: &str = "id, attempt_id, question_id, selected_option_id, text_answer, is_correct, points_earned, \
     feedback, graded_by, answered_at, graded_at";

/// Row lock taken when reading a quiz or attempt inside a transaction.
#[derive(Debug, Clone, Copy)]
enum Lock {
    None,
    Share,
    Update,
}

impl Lock {
    fn clause(self) -> &'static str {
        match self {
            Lock::None => "",
            Lock::Share => " FOR SHARE",
            Lock::Update => " FOR UPDATE",
        }
    }
}

#[derive(FromRow)]
struct QuizSummaryRow {
    #[sqlx(flatten)]
    quiz: QuizRow,
    question_count: i64,
    attempt_count: i64,
}

/// Logs a database failure and maps it to a 500.
fn db_err(context: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| {
        tracing::error!("{}: {:?}", context, e);
        AppError::InternalServerError(e.to_string())
    }
}

/// Postgres-backed store. Every method runs in one transaction; the (quiz, student)
/// and (attempt, question) unique constraints back the attempt/answer upserts.
#[derive(Clone)]
pub struct PgQuizStore {
    pool: PgPool,
    policy: PendingReviewPolicy,
}

impl PgQuizStore {
    pub fn new(pool: PgPool, policy: PendingReviewPolicy) -> Self {
        Self { pool, policy }
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

async fn fetch_quiz(conn: &mut PgConnection, quiz_id: Uuid, lock: Lock) -> AppResult<Quiz> {
    let sql = format!("SELECT {} FROM quizzes WHERE id = $1{}", QUIZ_COLUMNS, lock.clause());
    let row = sqlx::query_as::<_, QuizRow>(&sql)
        .bind(quiz_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_err("Failed to fetch quiz"))?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;
    Quiz::try_from(row)
}

async fn fetch_attempt(conn: &mut PgConnection, attempt_id: Uuid, lock: Lock) -> AppResult<QuizAttempt> {
    let sql = format!("SELECT {} FROM quiz_attempts WHERE id = $1{}", ATTEMPT_COLUMNS, lock.clause());
    let row = sqlx::query_as::<_, AttemptRow>(&sql)
        .bind(attempt_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_err("Failed to fetch attempt"))?
        .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;
    QuizAttempt::try_from(row)
}

async fn fetch_questions(conn: &mut PgConnection, quiz_id: Uuid) -> AppResult<Vec<Question>> {
    let sql = format!("SELECT {} FROM questions WHERE quiz_id = $1 ORDER BY position", QUESTION_COLUMNS);
    sqlx::query_as::<_, QuestionRow>(&sql)
        .bind(quiz_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_err("Failed to fetch questions"))?
        .into_iter()
        .map(Question::try_from)
        .collect()
}

async fn fetch_options(conn: &mut PgConnection, question_ids: Vec<Uuid>) -> AppResult<Vec<AnswerOption>> {
    let options = sqlx::query_as::<_, AnswerOption>(
        r#"
        SELECT id, question_id, text, is_correct, position
        FROM question_options
        WHERE question_id = ANY($1)
        ORDER BY question_id, position
        "#,
    )
    .bind(question_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err("Failed to fetch options"))?;
    Ok(options)
}

async fn fetch_answers(conn: &mut PgConnection, attempt_id: Uuid) -> AppResult<Vec<Answer>> {
    let answers = sqlx::query_as::<_, Answer>(
        r#"
        SELECT
            a.id, a.attempt_id, a.question_id, a.selected_option_id, a.text_answer,
            a.is_correct, a.points_earned, a.feedback, a.graded_by, a.answered_at, a.graded_at
        FROM answers a
        JOIN questions q ON q.id = a.question_id
        WHERE a.attempt_id = $1
        ORDER BY q.position
        "#,
    )
    .bind(attempt_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err("Failed to fetch answers"))?;
    Ok(answers)
}

/// Rewrites `total_points` as the sum of the quiz's current questions.
async fn recompute_total(conn: &mut PgConnection, quiz_id: Uuid) -> AppResult<Quiz> {
    let sql = format!(
        "UPDATE quizzes \
         SET total_points = COALESCE((SELECT SUM(points) FROM questions WHERE quiz_id = $1), 0) \
         WHERE id = $1 RETURNING {}",
        QUIZ_COLUMNS
    );
    let row = sqlx::query_as::<_, QuizRow>(&sql)
        .bind(quiz_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(db_err("Failed to recompute total points"))?;
    Quiz::try_from(row)
}

async fn write_attempt(conn: &mut PgConnection, attempt_id: Uuid, update: &AttemptUpdate) -> AppResult<QuizAttempt> {
    let sql = format!(
        "UPDATE quiz_attempts \
         SET status = $2, score = $3, percentage = $4, submitted_at = $5, graded_at = $6 \
         WHERE id = $1 RETURNING {}",
        ATTEMPT_COLUMNS
    );
    let row = sqlx::query_as::<_, AttemptRow>(&sql)
        .bind(attempt_id)
        .bind(update.status.as_str())
        .bind(update.score)
        .bind(update.percentage)
        .bind(update.submitted_at)
        .bind(update.graded_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(db_err("Failed to update attempt"))?;
    QuizAttempt::try_from(row)
}

fn group_options(questions: Vec<Question>, options: Vec<AnswerOption>) -> Vec<QuestionWithOptions> {
    let mut by_question: HashMap<Uuid, Vec<AnswerOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id).or_default().push(option);
    }

    questions
        .into_iter()
        .map(|question| QuestionWithOptions {
            options: by_question.remove(&question.id).unwrap_or_default(),
            question,
        })
        .collect()
}

#[async_trait]
impl QuizStore for PgQuizStore {
    async fn create_quiz(&self, quiz: NewQuiz, now: DateTime<Utc>) -> AppResult<Quiz> {
        let sql = format!(
            "INSERT INTO quizzes \
             (id, title, description, creator_id, status, duration, passing_score, \
              shuffle_questions, shuffle_options, show_results, allow_review, start_time, end_time, created_at) \
             VALUES ($1, $2, $3, $4, 'DRAFT', $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {}",
            QUIZ_COLUMNS
        );
        let row = sqlx::query_as::<_, QuizRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&quiz.title)
            .bind(&quiz.description)
            .bind(&quiz.creator_id)
            .bind(quiz.duration)
            .bind(quiz.passing_score)
            .bind(quiz.shuffle_questions)
            .bind(quiz.shuffle_options)
            .bind(quiz.show_results)
            .bind(quiz.allow_review)
            .bind(quiz.start_time)
            .bind(quiz.end_time)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to create quiz"))?;
        Quiz::try_from(row)
    }

    async fn list_quizzes(&self, status: Option<QuizStatus>) -> AppResult<Vec<QuizSummary>> {
        let sql = format!(
            "SELECT {}, \
                (SELECT COUNT(*) FROM questions qs WHERE qs.quiz_id = quizzes.id) AS question_count, \
                (SELECT COUNT(*) FROM quiz_attempts qa WHERE qa.quiz_id = quizzes.id) AS attempt_count \
             FROM quizzes \
             WHERE deleted_at IS NULL AND ($1::TEXT IS NULL OR status = $1) \
             ORDER BY created_at DESC",
            QUIZ_COLUMNS
        );
        let rows = sqlx::query_as::<_, QuizSummaryRow>(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list quizzes"))?;

        rows.into_iter()
            .map(|row| -> AppResult<QuizSummary> {
                Ok(QuizSummary {
                    quiz: Quiz::try_from(row.quiz)?,
                    question_count: row.question_count,
                    attempt_count: row.attempt_count,
                })
            })
            .collect()
    }

    async fn get_quiz(&self, quiz_id: Uuid) -> AppResult<QuizDetail> {
        let mut conn = self.pool.acquire().await.map_err(db_err("Failed to acquire connection"))?;
        let quiz = fetch_quiz(&mut conn, quiz_id, Lock::None).await?;
        lifecycle::ensure_live(&quiz)?;

        let questions = fetch_questions(&mut conn, quiz_id).await?;
        let options = fetch_options(&mut conn, questions.iter().map(|q| q.id).collect()).await?;

        Ok(QuizDetail {
            quiz,
            questions: group_options(questions, options),
        })
    }

    async fn publish_quiz(&self, quiz_id: Uuid) -> AppResult<Quiz> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;

        let quiz = fetch_quiz(&mut tx, quiz_id, Lock::Update).await?;
        let question_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err("Failed to count questions"))?;
        lifecycle::ensure_publishable(&quiz, question_count as usize)?;

        sqlx::query("UPDATE quizzes SET status = $2 WHERE id = $1")
            .bind(quiz_id)
            .bind(QuizStatus::Published.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to publish quiz"))?;
        let quiz = recompute_total(&mut tx, quiz_id).await?;

        tx.commit().await.map_err(db_err("Failed to commit publish"))?;
        Ok(quiz)
    }

    async fn close_quiz(&self, quiz_id: Uuid) -> AppResult<Quiz> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;

        let quiz = fetch_quiz(&mut tx, quiz_id, Lock::Update).await?;
        lifecycle::ensure_live(&quiz)?;

        let sql = format!("UPDATE quizzes SET status = $2 WHERE id = $1 RETURNING {}", QUIZ_COLUMNS);
        let row = sqlx::query_as::<_, QuizRow>(&sql)
            .bind(quiz_id)
            .bind(QuizStatus::Closed.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err("Failed to close quiz"))?;

        tx.commit().await.map_err(db_err("Failed to commit close"))?;
        Quiz::try_from(row)
    }

    async fn delete_quiz(&self, quiz_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;

        let quiz = fetch_quiz(&mut tx, quiz_id, Lock::Update).await?;
        let attempt_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_attempts WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err("Failed to count attempts"))?;
        lifecycle::ensure_deletable(&quiz, attempt_count as usize)?;

        sqlx::query("UPDATE quizzes SET deleted_at = $2 WHERE id = $1")
            .bind(quiz_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to delete quiz"))?;

        tx.commit().await.map_err(db_err("Failed to commit delete"))?;
        Ok(())
    }

    async fn add_question(
        &self,
        quiz_id: Uuid,
        question: NewQuestion,
        now: DateTime<Utc>,
    ) -> AppResult<QuestionWithOptions> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;

        let quiz = fetch_quiz(&mut tx, quiz_id, Lock::Update).await?;
        lifecycle::ensure_questions_editable(&quiz)?;

        let current_max: Option<i32> = sqlx::query_scalar("SELECT MAX(position) FROM questions WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err("Failed to read question order"))?;
        let built = question.build(quiz_id, lifecycle::next_position(current_max), now);

        sqlx::query(
            r#"
            INSERT INTO questions (id, quiz_id, question_type, difficulty, text, explanation, points, position, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(built.question.id)
        .bind(quiz_id)
        .bind(built.question.question_type.as_str())
        .bind(built.question.difficulty.as_str())
        .bind(&built.question.text)
        .bind(&built.question.explanation)
        .bind(built.question.points)
        .bind(built.question.position)
        .bind(built.question.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to insert question"))?;

        for option in &built.options {
            sqlx::query(
                "INSERT INTO question_options (id, question_id, text, is_correct, position) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(option.id)
            .bind(option.question_id)
            .bind(&option.text)
            .bind(option.is_correct)
            .bind(option.position)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to insert option"))?;
        }

        recompute_total(&mut tx, quiz_id).await?;
        tx.commit().await.map_err(db_err("Failed to commit question"))?;
        Ok(built)
    }

    async fn delete_question(&self, question_id: Uuid) -> AppResult<Quiz> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;

        let quiz_id: Uuid = sqlx::query_scalar("SELECT quiz_id FROM questions WHERE id = $1")
            .bind(question_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err("Failed to fetch question"))?
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

        let quiz = fetch_quiz(&mut tx, quiz_id, Lock::Update).await?;
        lifecycle::ensure_questions_editable(&quiz)?;

        // Options and answers go with it (ON DELETE CASCADE).
        sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(question_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to delete question"))?;

        let quiz = recompute_total(&mut tx, quiz_id).await?;
        tx.commit().await.map_err(db_err("Failed to commit question delete"))?;
        Ok(quiz)
    }

    async fn start_attempt(&self, quiz_id: Uuid, student_id: &str, now: DateTime<Utc>) -> AppResult<StartedAttempt> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;

        let quiz = fetch_quiz(&mut tx, quiz_id, Lock::Share).await?;
        let question_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err("Failed to count questions"))?;
        lifecycle::ensure_accepting_attempts(&quiz, question_count as usize, now)?;

        // A concurrent insert for the same pair makes this a no-op instead of a duplicate.
        let sql = format!(
            "INSERT INTO quiz_attempts (id, quiz_id, student_id, status, started_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (quiz_id, student_id) DO NOTHING \
             RETURNING {}",
            ATTEMPT_COLUMNS
        );
        let fresh = QuizAttempt::start(quiz_id, student_id, now);
        let inserted = sqlx::query_as::<_, AttemptRow>(&sql)
            .bind(fresh.id)
            .bind(quiz_id)
            .bind(student_id)
            .bind(fresh.status.as_str())
            .bind(fresh.started_at)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err("Failed to create attempt"))?;

        let started = match inserted {
            Some(row) => StartedAttempt {
                attempt: QuizAttempt::try_from(row)?,
                resumed: false,
            },
            None => {
                let sql = format!(
                    "SELECT {} FROM quiz_attempts WHERE quiz_id = $1 AND student_id = $2",
                    ATTEMPT_COLUMNS
                );
                let row = sqlx::query_as::<_, AttemptRow>(&sql)
                    .bind(quiz_id)
                    .bind(student_id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(db_err("Failed to load existing attempt"))?;
                let existing = QuizAttempt::try_from(row)?;
                lifecycle::resume_existing(&existing)?;
                StartedAttempt {
                    attempt: existing,
                    resumed: true,
                }
            }
        };

        tx.commit().await.map_err(db_err("Failed to commit attempt"))?;
        Ok(started)
    }

    async fn submit_answer(
        &self,
        attempt_id: Uuid,
        student_id: &str,
        question_id: Uuid,
        selection: Selection,
        now: DateTime<Utc>,
    ) -> AppResult<Answer> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;

        // FOR SHARE blocks a concurrent final submission until this answer commits.
        let attempt = fetch_attempt(&mut tx, attempt_id, Lock::Share).await?;
        lifecycle::ensure_owner(&attempt, student_id)?;
        lifecycle::ensure_in_progress(&attempt)?;

        let sql = format!("SELECT {} FROM questions WHERE id = $1 AND quiz_id = $2", QUESTION_COLUMNS);
        let question = sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(question_id)
            .bind(attempt.quiz_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err("Failed to fetch question"))?
            .ok_or_else(|| AppError::NotFound("Question not found in this quiz".to_string()))
            .and_then(Question::try_from)?;
        let options = fetch_options(&mut tx, vec![question_id]).await?;
        let grade = scoring::grade_selection(&question, &options, &selection)?;

        let sql = format!(
            "INSERT INTO answers \
             (id, attempt_id, question_id, selected_option_id, text_answer, is_correct, points_earned, answered_at, graded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (attempt_id, question_id) DO UPDATE SET \
                selected_option_id = EXCLUDED.selected_option_id, \
                text_answer = EXCLUDED.text_answer, \
                is_correct = EXCLUDED.is_correct, \
                points_earned = EXCLUDED.points_earned, \
                feedback = NULL, \
                graded_by = NULL, \
                answered_at = EXCLUDED.answered_at, \
                graded_at = EXCLUDED.graded_at \
             RETURNING {}",
            ANSWER_COLUMNS
        );
        let answer = sqlx::query_as::<_, Answer>(&sql)
            .bind(Uuid::new_v4())
            .bind(attempt_id)
            .bind(question_id)
            .bind(selection.option_id())
            .bind(selection.text())
            .bind(grade.is_correct)
            .bind(grade.points_earned)
            .bind(now)
            .bind(grade.points_earned.map(|_| now))
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err("Failed to save answer"))?;

        tx.commit().await.map_err(db_err("Failed to commit answer"))?;
        Ok(answer)
    }

    async fn submit_attempt(&self, attempt_id: Uuid, student_id: &str, now: DateTime<Utc>) -> AppResult<QuizAttempt> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;

        let attempt = fetch_attempt(&mut tx, attempt_id, Lock::Update).await?;
        lifecycle::ensure_owner(&attempt, student_id)?;
        lifecycle::ensure_in_progress(&attempt)?;

        // Same snapshot for total_points and the answers being summed.
        let quiz = fetch_quiz(&mut tx, attempt.quiz_id, Lock::Share).await?;
        let question_types: Vec<_> = fetch_questions(&mut tx, quiz.id)
            .await?
            .into_iter()
            .map(|q| q.question_type)
            .collect();
        let answers = fetch_answers(&mut tx, attempt_id).await?;

        let update = lifecycle::finalize_submission(self.policy, &answers, &question_types, quiz.total_points, now);
        let attempt = write_attempt(&mut tx, attempt_id, &update).await?;

        tx.commit().await.map_err(db_err("Failed to commit submission"))?;
        Ok(attempt)
    }

    async fn grade_answer(&self, answer_id: Uuid, grade: ManualGrade, now: DateTime<Utc>) -> AppResult<QuizAttempt> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;

        let sql = format!("SELECT {} FROM answers WHERE id = $1", ANSWER_COLUMNS);
        let answer = sqlx::query_as::<_, Answer>(&sql)
            .bind(answer_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err("Failed to fetch answer"))?
            .ok_or_else(|| AppError::NotFound("Answer not found".to_string()))?;

        // Per-attempt serialization point: concurrent graders of the same attempt queue here,
        // so each recompute sees every committed answer.
        let attempt = fetch_attempt(&mut tx, answer.attempt_id, Lock::Update).await?;
        lifecycle::ensure_gradable(&attempt)?;
        let quiz = fetch_quiz(&mut tx, attempt.quiz_id, Lock::Share).await?;

        let max_points: f64 = sqlx::query_scalar("SELECT points FROM questions WHERE id = $1")
            .bind(answer.question_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err("Failed to fetch question points"))?
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
        let verdict = scoring::grade_manual(max_points, grade.points_earned)?;

        let updated = sqlx::query(
            r#"
            UPDATE answers
            SET is_correct = $2, points_earned = $3, feedback = $4, graded_by = $5, graded_at = $6
            WHERE id = $1
            "#,
        )
        .bind(answer_id)
        .bind(verdict.is_correct)
        .bind(verdict.points_earned)
        .bind(&grade.feedback)
        .bind(&grade.grader_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to grade answer"))?;
        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Answer not found".to_string()));
        }

        let answers = fetch_answers(&mut tx, attempt.id).await?;
        let update = lifecycle::regrade(&attempt, &answers, quiz.total_points, now);
        let attempt = write_attempt(&mut tx, attempt.id, &update).await?;

        tx.commit().await.map_err(db_err("Failed to commit grade"))?;
        Ok(attempt)
    }

    async fn get_attempt(&self, attempt_id: Uuid) -> AppResult<AttemptDetail> {
        let mut conn = self.pool.acquire().await.map_err(db_err("Failed to acquire connection"))?;
        let attempt = fetch_attempt(&mut conn, attempt_id, Lock::None).await?;
        let answers = fetch_answers(&mut conn, attempt_id).await?;
        Ok(AttemptDetail { attempt, answers })
    }

    async fn list_attempts(&self, quiz_id: Uuid) -> AppResult<Vec<QuizAttempt>> {
        let mut conn = self.pool.acquire().await.map_err(db_err("Failed to acquire connection"))?;
        let quiz = fetch_quiz(&mut conn, quiz_id, Lock::None).await?;
        lifecycle::ensure_live(&quiz)?;

        let sql = format!(
            "SELECT {} FROM quiz_attempts WHERE quiz_id = $1 ORDER BY started_at DESC",
            ATTEMPT_COLUMNS
        );
        sqlx::query_as::<_, AttemptRow>(&sql)
            .bind(quiz_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(db_err("Failed to list attempts"))?
            .into_iter()
            .map(QuizAttempt::try_from)
            .collect()
    }
}
