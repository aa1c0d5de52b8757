use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped,
        entity::{Lesson, LessonCreate, LessonProgress, LessonProgressUpdate, LessonWithProgressRow},
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::{
            lessons::LessonResponse,
            progress::{LessonProgressBody, ProgressResponse},
        },
        error::ErrorResponse,
        middlewares, milestones,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(lessons_create_handler))
        .route(
            "/{id}",
            get(lessons_get_handler)
                .put(lessons_update_handler)
                .delete(lessons_delete_handler),
        )
        .route("/{id}/progress", put(lessons_progress_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/",
    request_body = LessonCreate,
    responses(
        (status = 201, description = "Lesson created", body = Lesson),
        (status = 403, description = "Not the course's instructor", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(("cookie" = []))
)]
async fn lessons_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<LessonCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = Lesson::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::from_database(Lesson::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(lesson)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{lesson_id}",
    description = "Fetch comprehensive info about lesson including its content and the caller's progress",
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson to get")
    ),
    responses(
        (status = 200, description = "Lesson found", body = LessonResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_get_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = LessonWithProgressRow::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .map(LessonResponse::from)
        .ok_or(WebError::resource_not_found(Lesson::get_resource_type()))?;

    Ok((StatusCode::OK, Json(lesson)))
}

#[utoipa::path(
    put,
    path = "/api/v1/lessons/{lesson_id}",
    description = "Updates a lesson in place. Lessons don't move between modules",
    request_body = LessonCreate,
    params(("lesson_id" = Uuid, Path, description = "ID of the lesson to update")),
    responses(
        (status = 200, description = "Lesson updated", body = Lesson),
        (status = 400, description = "Different module given", body = ErrorResponse),
        (status = 403, description = "Not the course's instructor", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(("cookie" = []))
)]
async fn lessons_update_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
    Json(payload): Json<LessonCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = Lesson::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Lesson::get_resource_type()))?;

    if payload.module_id != lesson.module_id() {
        return Err(WebError::resource_bad_request(
            Lesson::get_resource_type(),
            "lessons cannot move between modules",
        ));
    }

    let updated = lesson
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::from_database(Lesson::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/lessons/{lesson_id}",
    params(("lesson_id" = Uuid, Path, description = "ID of the lesson to delete")),
    responses(
        (status = 200, description = "Lesson deleted"),
        (status = 403, description = "Not the course's instructor", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(("cookie" = []))
)]
async fn lessons_delete_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = Lesson::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Lesson::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Lesson::get_resource_type()))?;

    lesson
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::from_database(Lesson::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    put,
    path = "/api/v1/lessons/{lesson_id}/progress",
    description = "Adds study time and optionally marks the lesson completed. Completion is sticky",
    request_body = LessonProgressBody,
    params(
        ("lesson_id" = Uuid, Path, description = "ID of the lesson")
    ),
    responses(
        (status = 200, description = "Progress recorded", body = ProgressResponse),
        (status = 400, description = "Negative time", body = ErrorResponse),
        (status = 403, description = "Not enrolled in the lesson's course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    security(
        ("cookie" = [])
    ),
    tag = "lessons"
)]
async fn lessons_progress_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ctx: RequestContext,
    Json(payload): Json<LessonProgressBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let data = LessonProgressUpdate {
        lesson_id: id,
        course_id: None,
        time_spent: payload.time_spent,
        completed: payload.completed,
    };

    let update = LessonProgress::record(state.pool(), user, data)
        .await
        .map_err(|e| WebError::from_database(LessonProgress::get_resource_type(), e))?;

    if update.course_completed {
        milestones::course_completed(&state, user.user_id(), update.enrollment.course_id()).await;
    }

    Ok((StatusCode::OK, Json(ProgressResponse::from(update))))
}
