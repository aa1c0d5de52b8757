use axum::{
    Json, Router, extract::State, http::StatusCode, middleware, response::IntoResponse,
    routing::{get, put},
};

use crate::{
    model::{
        ResourceTyped,
        entity::{Dashboard, Enrollment, LessonProgress, LessonProgressUpdate},
    },
    web::{
        AppState, RequestContext, WebError, WebResult, dto::progress::ProgressResponse,
        error::ErrorResponse, middlewares, milestones,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/lesson", put(progress_lesson_handler))
        .route("/dashboard", get(progress_dashboard_handler))
        .route("/enrollments", get(progress_enrollments_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    put,
    path = "/api/v1/progress/lesson",
    description = "Records lesson progress. When course_id is given it must be the lesson's course",
    request_body = LessonProgressUpdate,
    responses(
        (status = 200, description = "Progress recorded", body = ProgressResponse),
        (status = 400, description = "Negative time", body = ErrorResponse),
        (status = 403, description = "Not enrolled", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = [])
    )
)]
async fn progress_lesson_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<LessonProgressUpdate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let update = LessonProgress::record(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::from_database(LessonProgress::get_resource_type(), e))?;

    if update.course_completed {
        milestones::course_completed(&state, user.user_id(), update.enrollment.course_id()).await;
    }

    Ok((StatusCode::OK, Json(ProgressResponse::from(update))))
}

#[utoipa::path(
    get,
    path = "/api/v1/progress/dashboard",
    description = "Get current user's learning summary",
    responses(
        (status = 200, description = "Dashboard", body = Dashboard),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = [])
    )
)]
async fn progress_dashboard_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let dashboard = Dashboard::for_user(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(dashboard)))
}

#[utoipa::path(
    get,
    path = "/api/v1/progress/enrollments",
    description = "Current user's enrollments, most recently active first",
    responses(
        (status = 200, description = "Enrollments", body = Vec<Enrollment>),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = [])
    )
)]
async fn progress_enrollments_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let enrollments = Enrollment::list_for_user(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Enrollment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(enrollments)))
}
