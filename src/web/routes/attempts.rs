use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    model::{
        ResourceTyped,
        entity::{QuizAnswer, QuizAnswerSubmit, QuizAttempt},
    },
    web::{AppState, RequestContext, WebError, WebResult, error::ErrorResponse, middlewares},
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/{id}/answers",
            get(attempts_answers_handler).post(attempts_submit_answer_handler),
        )
        .route("/{id}/complete", post(attempts_complete_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/attempts/{id}/answers",
    description = "Grades and stores one answer. Answering the same question again replaces it",
    request_body = QuizAnswerSubmit,
    params(("id" = Uuid, Path, description = "Attempt id")),
    responses(
        (status = 200, description = "Answer stored", body = QuizAnswer),
        (status = 400, description = "Empty answer", body = ErrorResponse),
        (status = 403, description = "Attempt completed or not yours", body = ErrorResponse),
        (status = 404, description = "Attempt or question not found", body = ErrorResponse),
    ),
    tag = "attempts",
    security(("cookie" = []))
)]
async fn attempts_submit_answer_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuizAnswerSubmit>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let answer = QuizAttempt::submit_answer(state.pool(), user, id, payload)
        .await
        .map_err(|e| WebError::from_database(QuizAnswer::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(answer)))
}

#[utoipa::path(
    get,
    path = "/api/v1/attempts/{id}/answers",
    params(("id" = Uuid, Path, description = "Attempt id")),
    responses(
        (status = 200, description = "Answers", body = Vec<QuizAnswer>),
        (status = 403, description = "Not your attempt", body = ErrorResponse),
        (status = 404, description = "Attempt not found", body = ErrorResponse),
    ),
    tag = "attempts",
    security(("cookie" = []))
)]
async fn attempts_answers_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let answers = QuizAttempt::answers(state.pool(), user, id)
        .await
        .map_err(|e| WebError::from_database(QuizAnswer::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(answers)))
}

#[utoipa::path(
    post,
    path = "/api/v1/attempts/{id}/complete",
    description = "Scores the attempt. Completing again returns the stored result",
    params(("id" = Uuid, Path, description = "Attempt id")),
    responses(
        (status = 200, description = "Attempt scored", body = QuizAttempt),
        (status = 403, description = "Not your attempt", body = ErrorResponse),
        (status = 404, description = "Attempt not found", body = ErrorResponse),
    ),
    tag = "attempts",
    security(("cookie" = []))
)]
async fn attempts_complete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let attempt = QuizAttempt::complete(state.pool(), user, id)
        .await
        .map_err(|e| WebError::from_database(QuizAttempt::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(attempt)))
}
