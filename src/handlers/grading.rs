// src/handlers/grading.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::{attempt::GradeAnswerRequest, response::ApiResponse},
    state::DynStore,
    store::ManualGrade,
    utils::{
        html::clean_html,
        jwt::Claims,
        permissions::{Permission, authorize},
    },
};

/// Grades one (usually short-answer) answer and returns the recomputed attempt.
pub async fn grade_answer(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(answer_id): Path<Uuid>,
    Json(payload): Json<GradeAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&claims, Permission::QuizGrade)?;
    payload.validate()?;

    let grade = ManualGrade {
        points_earned: payload.points_earned,
        feedback: payload.feedback.as_deref().map(clean_html),
        grader_id: claims.user_id().to_string(),
    };
    let attempt = store.grade_answer(answer_id, grade, Utc::now()).await?;
    tracing::info!(
        answer_id = %answer_id,
        attempt_id = %attempt.id,
        status = %attempt.status,
        score = attempt.score.unwrap_or_default(),
        grader = %claims.sub,
        "answer graded"
    );

    Ok(ApiResponse::ok(attempt))
}

/// Attempt summaries of a quiz, most recently started first.
pub async fn list_attempts(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&claims, Permission::QuizGrade)?;

    let attempts = store.list_attempts(quiz_id).await?;
    Ok(ApiResponse::ok(attempts))
}
