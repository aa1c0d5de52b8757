use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::put,
};
use uuid::Uuid;

use crate::{
    model::{
        ResourceTyped,
        entity::{AssignmentSubmission, SubmissionGrade},
    },
    web::{
        AppState, RequestContext, WebError, WebResult, error::ErrorResponse, middlewares,
        milestones,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/{id}/grade", put(submissions_grade_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    put,
    path = "/api/v1/submissions/{id}/grade",
    description = "Grades a submission between 0 and the assignment's max points. Regrading overwrites",
    request_body = SubmissionGrade,
    params(("id" = Uuid, Path, description = "Submission id")),
    responses(
        (status = 200, description = "Graded", body = AssignmentSubmission),
        (status = 400, description = "Grade out of range", body = ErrorResponse),
        (status = 403, description = "Not the course's instructor", body = ErrorResponse),
        (status = 404, description = "Submission not found", body = ErrorResponse),
    ),
    tag = "assignments",
    security(("cookie" = []))
)]
async fn submissions_grade_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmissionGrade>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let grade = payload.grade;
    let (submission, recipient) = AssignmentSubmission::grade(state.pool(), user, id, payload)
        .await
        .map_err(|e| WebError::from_database(AssignmentSubmission::get_resource_type(), e))?;

    milestones::submission_graded(&state, recipient, grade);

    Ok((StatusCode::OK, Json(submission)))
}
