// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        quiz::{CreateQuizRequest, PublicQuizDetail, QuizListQuery},
        response::{ApiResponse, ack},
    },
    state::DynStore,
    utils::{
        jwt::Claims,
        permissions::{Permission, authorize, can},
    },
};

/// Lists live quizzes, newest first. `?status=DRAFT|PUBLISHED|CLOSED|ALL`.
pub async fn list_quizzes(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<QuizListQuery>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&claims, Permission::QuizView)?;
    let status = query.status_filter()?;

    let quizzes = store.list_quizzes(status).await?;
    Ok(ApiResponse::ok(quizzes))
}

/// Returns a quiz with its questions.
///
/// Editors get the answer key; everyone else gets the public view.
pub async fn get_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<Uuid>,
) -> Result<Response, AppError> {
    authorize(&claims, Permission::QuizView)?;

    let detail = store.get_quiz(quiz_id).await?;
    if can(&claims, Permission::QuizEdit) {
        Ok(ApiResponse::ok(detail).into_response())
    } else {
        Ok(ApiResponse::ok(PublicQuizDetail::from(detail)).into_response())
    }
}

/// Creates a DRAFT quiz owned by the caller.
pub async fn create_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&claims, Permission::QuizCreate)?;
    payload.check()?;

    let quiz = store
        .create_quiz(payload.into_new_quiz(claims.user_id()), Utc::now())
        .await?;
    tracing::info!(quiz_id = %quiz.id, creator = %quiz.creator_id, "quiz created");

    Ok((StatusCode::CREATED, ApiResponse::ok(quiz)))
}

pub async fn publish_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&claims, Permission::QuizPublish)?;

    let quiz = store.publish_quiz(quiz_id).await?;
    tracing::info!(quiz_id = %quiz.id, total_points = quiz.total_points, "quiz published");

    Ok(ApiResponse::ok(quiz))
}

pub async fn close_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&claims, Permission::QuizEdit)?;

    let quiz = store.close_quiz(quiz_id).await?;
    tracing::info!(quiz_id = %quiz.id, "quiz closed");

    Ok(ApiResponse::ok(quiz))
}

/// Soft-deletes a quiz that nobody has attempted.
pub async fn delete_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&claims, Permission::QuizDelete)?;

    store.delete_quiz(quiz_id, Utc::now()).await?;
    tracing::info!(quiz_id = %quiz_id, "quiz deleted");

    Ok(ack())
}
