use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    model::{
        ResourceTyped,
        entity::{Assignment, AssignmentCreate, AssignmentSubmission},
    },
    web::{AppState, RequestContext, WebError, WebResult, error::ErrorResponse, middlewares},
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(assignments_create_handler))
        .route(
            "/{id}/submissions",
            get(assignments_own_submissions_handler).post(assignments_submit_handler),
        )
        .route("/{id}/submissions/all", get(assignments_all_submissions_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

/// Collected multipart fields of a submission.
#[derive(Default)]
struct SubmissionForm {
    file: Option<(String, Vec<u8>)>,
    text: Option<String>,
}

async fn read_submission_form(mut multipart: Multipart) -> WebResult<SubmissionForm> {
    let resource = AssignmentSubmission::get_resource_type();
    let mut form = SubmissionForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebError::resource_bad_request(resource.clone(), e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("submission").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| WebError::resource_bad_request(resource.clone(), e.body_text()))?;
                if !bytes.is_empty() {
                    form.file = Some((filename, bytes.to_vec()));
                }
            }
            Some("text") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| WebError::resource_bad_request(resource.clone(), e.body_text()))?;
                form.text = Some(text);
            }
            _ => {}
        }
    }

    Ok(form)
}

#[utoipa::path(
    post,
    path = "/api/v1/assignments/",
    request_body = AssignmentCreate,
    responses(
        (status = 201, description = "Assignment created", body = Assignment),
        (status = 400, description = "Invalid assignment", body = ErrorResponse),
        (status = 403, description = "Not the course's instructor", body = ErrorResponse),
    ),
    tag = "assignments",
    security(("cookie" = []))
)]
async fn assignments_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<AssignmentCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let assignment = Assignment::create(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::from_database(Assignment::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(assignment)))
}

#[utoipa::path(
    post,
    path = "/api/v1/assignments/{id}/submissions",
    description = "Multipart submission with an optional `file` part and an optional `text` part. \
                   At least one is required and each student submits once",
    params(("id" = Uuid, Path, description = "Assignment id")),
    responses(
        (status = 201, description = "Submitted", body = AssignmentSubmission),
        (status = 400, description = "Neither file nor text", body = ErrorResponse),
        (status = 403, description = "Unpublished or not enrolled", body = ErrorResponse),
        (status = 409, description = "Already submitted", body = ErrorResponse),
    ),
    tag = "assignments",
    security(("cookie" = []))
)]
async fn assignments_submit_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let resource = AssignmentSubmission::get_resource_type();

    AssignmentSubmission::check_can_submit(state.pool(), user, id)
        .await
        .map_err(|e| WebError::from_database(resource.clone(), e))?;

    let form = read_submission_form(multipart).await?;

    let file_url = match form.file {
        Some((filename, bytes)) => Some(
            state
                .blobs()
                .store("submissions", &filename, &bytes)
                .await
                .map_err(WebError::server_blob_error)?,
        ),
        None => None,
    };

    let submission = AssignmentSubmission::submit(state.pool(), user, id, file_url, form.text)
        .await
        .map_err(|e| WebError::from_database(resource, e))?;

    Ok((StatusCode::CREATED, Json(submission)))
}

#[utoipa::path(
    get,
    path = "/api/v1/assignments/{id}/submissions",
    params(("id" = Uuid, Path, description = "Assignment id")),
    responses(
        (status = 200, description = "The caller's submissions", body = Vec<AssignmentSubmission>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
    ),
    tag = "assignments",
    security(("cookie" = []))
)]
async fn assignments_own_submissions_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let submissions = AssignmentSubmission::list_own(state.pool(), user, id)
        .await
        .map_err(|e| {
            WebError::resource_fetch_error(AssignmentSubmission::get_resource_type(), e)
        })?;

    Ok((StatusCode::OK, Json(submissions)))
}

#[utoipa::path(
    get,
    path = "/api/v1/assignments/{id}/submissions/all",
    params(("id" = Uuid, Path, description = "Assignment id")),
    responses(
        (status = 200, description = "Every submission", body = Vec<AssignmentSubmission>),
        (status = 403, description = "Not the course's instructor", body = ErrorResponse),
        (status = 404, description = "Assignment not found", body = ErrorResponse),
    ),
    tag = "assignments",
    security(("cookie" = []))
)]
async fn assignments_all_submissions_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let submissions = AssignmentSubmission::list_all(state.pool(), user, id)
        .await
        .map_err(|e| WebError::from_database(AssignmentSubmission::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(submissions)))
}
