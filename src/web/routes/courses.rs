use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, PaginatableRepository, ResourceTyped,
        entity::{
            Certificate, Course, CourseCreate, CourseProgress, CourseReview, Enrollment, Module,
            ModuleCreate, ModuleWithLessonsRow, ReviewSubmit, ReviewWithAuthor,
        },
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::modules::{ModuleCreateBody, ModuleWithLessons},
        error::ErrorResponse,
        middlewares, milestones,
        routes::PaginationQuery,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(courses_page_handler).post(courses_create_handler))
        .route(
            "/{id}",
            get(courses_get_handler)
                .put(courses_update_handler)
                .delete(courses_delete_handler),
        )
        .route("/{id}/enroll", post(courses_enroll_handler))
        .route(
            "/{id}/modules",
            get(courses_modules_handler).post(courses_create_module_handler),
        )
        .route("/{id}/progress", get(courses_progress_handler))
        .route("/{id}/certificate", post(courses_issue_certificate_handler))
        .route(
            "/{id}/reviews",
            get(courses_reviews_handler).post(courses_review_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

async fn find_course(state: &AppState, ctx: &RequestContext, id: Uuid) -> WebResult<Course> {
    let user = ctx.user()?;
    Course::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Course::get_resource_type()))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/",
    description = "Published courses plus the caller's own drafts",
    params(
        ("limit" = i64, Query, description = "Page size"),
        ("offset" = i64, Query, description = "Rows to skip"),
    ),
    responses(
        (status = 200, description = "Page of courses", body = crate::model::Page<Course>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []))
)]
async fn courses_page_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let courses = Course::page(state.pool(), user, page.limit, page.offset)
        .await
        .map_err(|e| WebError::resource_fetch_error(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(courses)))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/",
    request_body = CourseCreate,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "Invalid course", body = ErrorResponse),
        (status = 403, description = "Only instructors create courses", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []))
)]
async fn courses_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<CourseCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = Course::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::from_database(Course::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course found", body = Course),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []))
)]
async fn courses_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let course = find_course(&state, &ctx, id).await?;
    Ok((StatusCode::OK, Json(course)))
}

#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    request_body = CourseCreate,
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 403, description = "Not the course's instructor", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []))
)]
async fn courses_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CourseCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = find_course(&state, &ctx, id).await?;
    let updated = course
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::from_database(Course::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course deleted"),
        (status = 403, description = "Not the course's instructor", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []))
)]
async fn courses_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = find_course(&state, &ctx, id).await?;
    course
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::from_database(Course::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/enroll",
    description = "Enrolls the caller in a free, published course",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 201, description = "Enrolled", body = Enrollment),
        (status = 400, description = "Course requires payment", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 409, description = "Already enrolled", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []))
)]
async fn courses_enroll_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let enrollment = Enrollment::enroll(state.pool(), user, id)
        .await
        .map_err(|e| WebError::from_database(Enrollment::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(enrollment)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/modules",
    description = "Modules of the course with their lessons and the caller's completion flags",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Successfully collected modules", body = Vec<ModuleWithLessons>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []))
)]
async fn courses_modules_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    find_course(&state, &ctx, id).await?;

    let rows = ModuleWithLessonsRow::fetch_by_course(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;
    let modules = ModuleWithLessons::from_rows(rows)
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(modules)))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/modules",
    request_body = ModuleCreateBody,
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 201, description = "Module created", body = Module),
        (status = 403, description = "Not the course's instructor", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []))
)]
async fn courses_create_module_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModuleCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let data = ModuleCreate {
        course_id: id,
        title: payload.title,
        description: payload.description,
        order_index: payload.order_index,
    };

    let module = Module::create(state.pool(), user, data)
        .await
        .map_err(|e| WebError::from_database(Module::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(module)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/progress",
    description = "The caller's enrollment in the course with a detailed progress breakdown",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Progress", body = CourseProgress),
        (status = 403, description = "Not enrolled", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []))
)]
async fn courses_progress_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let progress = CourseProgress::load(state.pool(), user, id)
        .await
        .map_err(|e| WebError::from_database(Enrollment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(progress)))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/certificate",
    description = "Issues the caller's certificate for a completed course. One per enrollment",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 201, description = "Certificate issued", body = Certificate),
        (status = 400, description = "Course not completed yet", body = ErrorResponse),
        (status = 403, description = "Not enrolled", body = ErrorResponse),
        (status = 409, description = "Certificate already issued", body = ErrorResponse),
    ),
    tag = "certificates",
    security(("cookie" = []))
)]
async fn courses_issue_certificate_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let certificate = Certificate::issue(state.pool(), user, id)
        .await
        .map_err(|e| WebError::from_database(Certificate::get_resource_type(), e))?;

    milestones::certificate_issued(&state, user.user_id(), id, certificate.verification_code())
        .await;

    Ok((StatusCode::CREATED, Json(certificate)))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/reviews",
    description = "Rates the course. Submitting again replaces the caller's earlier review",
    request_body = ReviewSubmit,
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Review stored", body = CourseReview),
        (status = 400, description = "Rating outside 1..5", body = ErrorResponse),
        (status = 403, description = "Not enrolled", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(("cookie" = []))
)]
async fn courses_review_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewSubmit>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let review = CourseReview::submit(state.pool(), user, id, payload)
        .await
        .map_err(|e| WebError::from_database(CourseReview::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(review)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/reviews",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Reviews, newest first", body = Vec<ReviewWithAuthor>),
    ),
    tag = "courses"
)]
async fn courses_reviews_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let reviews = CourseReview::list_for_course(state.pool(), id)
        .await
        .map_err(|e| WebError::from_database(CourseReview::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(reviews)))
}
