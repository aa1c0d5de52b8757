use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped,
        entity::{Module, ModuleCreate},
    },
    web::{
        AppState, RequestContext, WebError, WebResult, dto::modules::ModuleCreateBody,
        error::ErrorResponse, middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/{id}",
            get(modules_get_handler)
                .put(modules_update_handler)
                .delete(modules_delete_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/modules/{id}",
    params(("id" = Uuid, Path, description = "Module id")),
    responses(
        (status = 200, description = "Module found", body = Module),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
    ),
    tag = "modules",
    security(("cookie" = []))
)]
async fn modules_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let module = Module::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Module::get_resource_type()))?;

    Ok((StatusCode::OK, Json(module)))
}

#[utoipa::path(
    put,
    path = "/api/v1/modules/{id}",
    request_body = ModuleCreateBody,
    params(("id" = Uuid, Path, description = "Module id")),
    responses(
        (status = 200, description = "Module updated", body = Module),
        (status = 403, description = "Not the course's instructor", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
    ),
    tag = "modules",
    security(("cookie" = []))
)]
async fn modules_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModuleCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let module = Module::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Module::get_resource_type()))?;

    let data = ModuleCreate {
        course_id: module.course_id(),
        title: payload.title,
        description: payload.description,
        order_index: payload.order_index,
    };
    let updated = module
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::from_database(Module::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/modules/{id}",
    description = "Deletes the module together with its lessons",
    params(("id" = Uuid, Path, description = "Module id")),
    responses(
        (status = 200, description = "Module deleted"),
        (status = 403, description = "Not the course's instructor", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse),
    ),
    tag = "modules",
    security(("cookie" = []))
)]
async fn modules_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let module = Module::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Module::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(Module::get_resource_type()))?;

    module
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::from_database(Module::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}
