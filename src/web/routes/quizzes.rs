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
        entity::{AttemptStart, Quiz, QuizAttempt, QuizCreate, QuizView, QuizWithQuestions},
    },
    web::{AppState, RequestContext, WebError, WebResult, error::ErrorResponse, middlewares},
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(quizzes_create_handler))
        .route("/{id}", get(quizzes_get_handler))
        .route("/{id}/questions", get(quizzes_questions_handler))
        .route(
            "/{id}/attempts",
            get(quizzes_own_attempts_handler).post(quizzes_start_attempt_handler),
        )
        .route("/{id}/attempts/all", get(quizzes_all_attempts_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/quizzes/",
    description = "Creates a quiz with its questions in one step",
    request_body = QuizCreate,
    responses(
        (status = 201, description = "Quiz created", body = QuizWithQuestions),
        (status = 400, description = "Invalid quiz", body = ErrorResponse),
        (status = 403, description = "Not the course's instructor", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(("cookie" = []))
)]
async fn quizzes_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<QuizCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let quiz = Quiz::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::from_database(Quiz::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(quiz)))
}

#[utoipa::path(
    get,
    path = "/api/v1/quizzes/{id}",
    description = "Quiz with its questions. Correct answers are never included",
    params(("id" = Uuid, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Quiz found", body = QuizView),
        (status = 403, description = "Not enrolled", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(("cookie" = []))
)]
async fn quizzes_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let quiz = Quiz::view(state.pool(), user, id)
        .await
        .map_err(|e| WebError::from_database(Quiz::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(quiz)))
}

#[utoipa::path(
    get,
    path = "/api/v1/quizzes/{id}/questions",
    description = "Questions including correct answers, for the course's instructor",
    params(("id" = Uuid, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Quiz with answers", body = QuizWithQuestions),
        (status = 403, description = "Not the course's instructor", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(("cookie" = []))
)]
async fn quizzes_questions_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let quiz = Quiz::with_answers(state.pool(), user, id)
        .await
        .map_err(|e| WebError::from_database(Quiz::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(quiz)))
}

#[utoipa::path(
    post,
    path = "/api/v1/quizzes/{id}/attempts",
    description = "Starts an attempt and returns it with the sanitized questions",
    params(("id" = Uuid, Path, description = "Quiz id")),
    responses(
        (status = 201, description = "Attempt started", body = AttemptStart),
        (status = 403, description = "Quiz unpublished or not enrolled", body = ErrorResponse),
        (status = 409, description = "Attempt limit reached", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(("cookie" = []))
)]
async fn quizzes_start_attempt_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let start = QuizAttempt::start(state.pool(), user, id)
        .await
        .map_err(|e| WebError::from_database(QuizAttempt::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(start)))
}

#[utoipa::path(
    get,
    path = "/api/v1/quizzes/{id}/attempts",
    description = "The caller's attempts at this quiz, newest first",
    params(("id" = Uuid, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Attempts", body = Vec<QuizAttempt>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(("cookie" = []))
)]
async fn quizzes_own_attempts_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let attempts = QuizAttempt::list_own(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuizAttempt::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(attempts)))
}

#[utoipa::path(
    get,
    path = "/api/v1/quizzes/{id}/attempts/all",
    description = "Every student's attempts, for the course's instructor",
    params(("id" = Uuid, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Attempts", body = Vec<QuizAttempt>),
        (status = 403, description = "Not the course's instructor", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
    ),
    tag = "quizzes",
    security(("cookie" = []))
)]
async fn quizzes_all_attempts_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let attempts = QuizAttempt::list_all(state.pool(), user, id)
        .await
        .map_err(|e| WebError::from_database(QuizAttempt::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(attempts)))
}
