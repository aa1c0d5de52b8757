use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, put},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped, ResourceType,
        entity::{
            AllowedEmailDomain, CourseAnalytics, PlatformStats, RecentEnrollment, RecentPayment,
            UserEntity,
        },
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::account::{DomainBody, RoleBody},
        error::ErrorResponse,
        middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/stats", get(admin_stats_handler))
        .route("/courses/{id}/analytics", get(admin_course_analytics_handler))
        .route("/payments/recent", get(admin_recent_payments_handler))
        .route("/enrollments/recent", get(admin_recent_enrollments_handler))
        .route(
            "/email-domains",
            get(admin_domains_list_handler).post(admin_domains_add_handler),
        )
        .route("/email-domains/{domain}", delete(admin_domains_remove_handler))
        .route("/users/{id}/role", put(admin_set_role_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    responses(
        (status = 200, description = "Platform counters", body = PlatformStats),
        (status = 403, description = "Administrators only", body = ErrorResponse),
    ),
    tag = "admin",
    security(("cookie" = []))
)]
async fn admin_stats_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let stats = PlatformStats::collect(state.pool(), user)
        .await
        .map_err(|e| WebError::from_database(ResourceType::User, e))?;

    Ok((StatusCode::OK, Json(stats)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/email-domains",
    responses(
        (status = 200, description = "Domains accepted at signup", body = Vec<AllowedEmailDomain>),
        (status = 403, description = "Administrators only", body = ErrorResponse),
    ),
    tag = "admin",
    security(("cookie" = []))
)]
async fn admin_domains_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let domains = AllowedEmailDomain::list(state.pool(), user)
        .await
        .map_err(|e| WebError::from_database(AllowedEmailDomain::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(domains)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/email-domains",
    request_body = DomainBody,
    responses(
        (status = 201, description = "Domain allowed", body = AllowedEmailDomain),
        (status = 400, description = "Invalid domain", body = ErrorResponse),
        (status = 403, description = "Administrators only", body = ErrorResponse),
        (status = 409, description = "Domain already allowed", body = ErrorResponse),
    ),
    tag = "admin",
    security(("cookie" = []))
)]
async fn admin_domains_add_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<DomainBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let domain = AllowedEmailDomain::add(state.pool(), user, &payload.domain)
        .await
        .map_err(|e| WebError::from_database(AllowedEmailDomain::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(domain)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/email-domains/{domain}",
    params(("domain" = String, Path, description = "Domain to remove")),
    responses(
        (status = 200, description = "Domain removed"),
        (status = 403, description = "Administrators only", body = ErrorResponse),
        (status = 404, description = "Domain not in the list", body = ErrorResponse),
    ),
    tag = "admin",
    security(("cookie" = []))
)]
async fn admin_domains_remove_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    AllowedEmailDomain::remove(state.pool(), user, &domain)
        .await
        .map_err(|e| WebError::from_database(AllowedEmailDomain::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/role",
    request_body = RoleBody,
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Role changed", body = UserEntity),
        (status = 403, description = "Administrators only", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tag = "admin",
    security(("cookie" = []))
)]
async fn admin_set_role_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let target = UserEntity::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::from_database(UserEntity::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(UserEntity::get_resource_type()))?;

    let updated = target
        .set_role(state.pool(), user, payload.role)
        .await
        .map_err(|e| WebError::from_database(UserEntity::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/courses/{id}/analytics",
    description = "Enrollment, revenue, rating and completion figures of one course",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course analytics", body = CourseAnalytics),
        (status = 403, description = "Not the course's instructor", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "admin",
    security(("cookie" = []))
)]
async fn admin_course_analytics_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let analytics = CourseAnalytics::collect(state.pool(), user, id)
        .await
        .map_err(|e| WebError::from_database(ResourceType::Course, e))?;

    Ok((StatusCode::OK, Json(analytics)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/payments/recent",
    responses(
        (status = 200, description = "Latest payments with payer and course", body = Vec<RecentPayment>),
        (status = 403, description = "Administrators only", body = ErrorResponse),
    ),
    tag = "admin",
    security(("cookie" = []))
)]
async fn admin_recent_payments_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let payments = RecentPayment::list(state.pool(), user)
        .await
        .map_err(|e| WebError::from_database(ResourceType::Payment, e))?;

    Ok((StatusCode::OK, Json(payments)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/enrollments/recent",
    responses(
        (status = 200, description = "Latest enrollments with student, course and instructor", body = Vec<RecentEnrollment>),
        (status = 403, description = "Administrators only", body = ErrorResponse),
    ),
    tag = "admin",
    security(("cookie" = []))
)]
async fn admin_recent_enrollments_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let enrollments = RecentEnrollment::list(state.pool(), user)
        .await
        .map_err(|e| WebError::from_database(ResourceType::Enrollment, e))?;

    Ok((StatusCode::OK, Json(enrollments)))
}
