// src/handlers/attempt.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    engine::lifecycle,
    error::AppError,
    models::{
        attempt::{AttemptDetail, StartAttemptResponse, SubmitAnswerRequest},
        quiz::Quiz,
        response::{ApiResponse, ack},
    },
    state::DynStore,
    utils::{
        jwt::Claims,
        permissions::{Permission, authorize, can},
    },
};

/// Starts (or resumes) the caller's attempt on a quiz.
///
/// * 201 with a new attempt id, or 200 with the in-progress one.
/// * A finished attempt is final: 409.
pub async fn start_attempt(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&claims, Permission::QuizTake)?;

    let started = store.start_attempt(quiz_id, claims.user_id(), Utc::now()).await?;
    let status = if started.resumed {
        tracing::debug!(attempt_id = %started.attempt.id, "attempt resumed");
        StatusCode::OK
    } else {
        tracing::info!(attempt_id = %started.attempt.id, quiz_id = %quiz_id, student = %claims.sub, "attempt started");
        StatusCode::CREATED
    };

    Ok((
        status,
        ApiResponse::ok(StartAttemptResponse {
            attempt_id: started.attempt.id,
        }),
    ))
}

/// Saves one answer of an in-progress attempt. Re-answering a question overwrites it.
pub async fn submit_answer(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&claims, Permission::QuizTake)?;
    let selection = payload.selection()?;

    let answer = store
        .submit_answer(attempt_id, claims.user_id(), payload.question_id, selection, Utc::now())
        .await?;
    tracing::debug!(attempt_id = %attempt_id, question_id = %answer.question_id, "answer saved");

    Ok(ack())
}

/// Final submission. Scores the attempt and closes it to further answers.
pub async fn submit_attempt(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&claims, Permission::QuizTake)?;

    let attempt = store.submit_attempt(attempt_id, claims.user_id(), Utc::now()).await?;
    tracing::info!(
        attempt_id = %attempt.id,
        status = %attempt.status,
        score = attempt.score.unwrap_or_default(),
        "attempt submitted"
    );

    Ok(ack())
}

/// Returns an attempt with its answers to its student or to a grader.
///
/// Students only see what the quiz allows: no score unless `show_results`,
/// no per-answer grading unless `allow_review`.
pub async fn get_attempt(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if can(&claims, Permission::QuizGrade) {
        return Ok(ApiResponse::ok(store.get_attempt(attempt_id).await?));
    }

    authorize(&claims, Permission::QuizTake)?;
    let detail = store.get_attempt(attempt_id).await?;
    lifecycle::ensure_owner(&detail.attempt, claims.user_id())?;
    let quiz = store.get_quiz(detail.attempt.quiz_id).await?.quiz;

    Ok(ApiResponse::ok(redact_for_student(detail, &quiz)))
}

fn redact_for_student(mut detail: AttemptDetail, quiz: &Quiz) -> AttemptDetail {
    if !quiz.show_results {
        detail.attempt.score = None;
        detail.attempt.percentage = None;
    }
    if !quiz.allow_review {
        for answer in &mut detail.answers {
            answer.is_correct = None;
            answer.points_earned = None;
            answer.feedback = None;
        }
    }
    detail
}
