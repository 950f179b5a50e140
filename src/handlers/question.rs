// src/handlers/question.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{question::AddQuestionRequest, response::ApiResponse},
    state::DynStore,
    utils::{
        jwt::Claims,
        permissions::{Permission, authorize},
    },
};

/// Appends a question to the quiz and refreshes its total points.
pub async fn add_question(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<Uuid>,
    Json(payload): Json<AddQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&claims, Permission::QuizEdit)?;
    let question = payload.into_new_question()?;

    let created = store.add_question(quiz_id, question, Utc::now()).await?;
    tracing::info!(
        quiz_id = %quiz_id,
        question_id = %created.question.id,
        order = created.question.position,
        "question added"
    );

    Ok((StatusCode::CREATED, ApiResponse::ok(created)))
}

/// Removes a question; returns the quiz with its new total.
pub async fn delete_question(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&claims, Permission::QuizEdit)?;

    let quiz = store.delete_question(question_id).await?;
    tracing::info!(quiz_id = %quiz.id, question_id = %question_id, "question deleted");

    Ok(ApiResponse::ok(quiz))
}
