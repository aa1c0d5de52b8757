use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;

use crate::{
    model::{
        ResourceTyped,
        entity::{Certificate, CertificateVerification},
    },
    web::{AppState, RequestContext, WebError, WebResult, error::ErrorResponse, middlewares},
};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyQuery {
    /// Verification code printed on the certificate
    code: Option<String>,
    /// Certificate id
    id: Option<String>,
}

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/verify", get(certificates_verify_handler))
        .route("/{id}", get(certificates_get_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/certificates/verify",
    description = "Public certificate check by verification code or certificate id. \
                   Unknown certificates are reported as invalid, not as an error",
    params(VerifyQuery),
    responses(
        (status = 200, description = "Verification result", body = CertificateVerification),
        (status = 400, description = "Neither code nor id given", body = ErrorResponse),
    ),
    tag = "certificates"
)]
async fn certificates_verify_handler(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> WebResult<impl IntoResponse> {
    let verification =
        Certificate::verify(state.pool(), query.code.as_deref(), query.id.as_deref())
            .await
            .map_err(|e| WebError::from_database(Certificate::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(verification)))
}

#[utoipa::path(
    get,
    path = "/api/v1/certificates/{id}",
    params(("id" = String, Path, description = "Certificate id")),
    responses(
        (status = 200, description = "Certificate found", body = Certificate),
        (status = 403, description = "Not your certificate", body = ErrorResponse),
        (status = 404, description = "Certificate not found", body = ErrorResponse),
    ),
    tag = "certificates",
    security(("cookie" = []))
)]
async fn certificates_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let certificate = Certificate::find_by_id(state.pool(), user, &id)
        .await
        .map_err(|e| WebError::from_database(Certificate::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(certificate)))
}
