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
        entity::{Payment, PaymentConfirmation, PaymentSignal},
    },
    web::{
        AppState, RequestContext, WebError, WebResult, dto::progress::CourseRef,
        error::ErrorResponse, middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(payments_list_handler))
        .route("/{id}", get(payments_get_handler))
        .route("/initiate", post(payments_initiate_handler))
        .route("/confirm", post(payments_confirm_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/initiate",
    description = "Opens a pending payment for a paid course and returns its transaction reference",
    request_body = CourseRef,
    responses(
        (status = 201, description = "Payment pending", body = Payment),
        (status = 400, description = "Course is free", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 409, description = "Already enrolled", body = ErrorResponse),
    ),
    tag = "payments",
    security(("cookie" = []))
)]
async fn payments_initiate_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<CourseRef>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let payment = Payment::initiate(state.pool(), user, payload.course_id)
        .await
        .map_err(|e| WebError::from_database(Payment::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(payment)))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/confirm",
    description = "Applies the gateway outcome for a transaction. A successful payment enrolls the payer. \
                   Repeated signals for a settled payment change nothing",
    request_body = PaymentSignal,
    responses(
        (status = 200, description = "Payment settled", body = PaymentConfirmation),
        (status = 403, description = "Administrators only", body = ErrorResponse),
        (status = 404, description = "Unknown transaction", body = ErrorResponse),
    ),
    tag = "payments",
    security(("cookie" = []))
)]
async fn payments_confirm_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<PaymentSignal>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let confirmation = Payment::confirm(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::from_database(Payment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(confirmation)))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/",
    responses(
        (status = 200, description = "The caller's payments, newest first", body = Vec<Payment>),
    ),
    tag = "payments",
    security(("cookie" = []))
)]
async fn payments_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let payments = Payment::list_own(state.pool(), user)
        .await
        .map_err(|e| WebError::from_database(Payment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(payments)))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}",
    description = "A payment and its status. Visible to the payer and administrators",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment found", body = Payment),
        (status = 403, description = "Another user's payment", body = ErrorResponse),
        (status = 404, description = "Payment not found", body = ErrorResponse),
    ),
    tag = "payments",
    security(("cookie" = []))
)]
async fn payments_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let payment = Payment::find_visible(state.pool(), user, id)
        .await
        .map_err(|e| WebError::from_database(Payment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(payment)))
}
