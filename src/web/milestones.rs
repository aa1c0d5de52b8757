//! Post-commit milestone notifications. Lookups that fail are logged and the
//! notification is dropped; the request has already succeeded.

use uuid::Uuid;

use crate::{
    error::log_error,
    model::{
        CrudRepository, DatabaseResult,
        entity::{Course, GradeRecipient, UserEntity},
    },
    notify::{self, Notification},
    web::{AppState, AuthenticatedUser},
};

async fn recipient(state: &AppState, user_id: Uuid, course_id: Uuid) -> DatabaseResult<Option<(UserEntity, Course)>> {
    let admin = AuthenticatedUser::admin();
    let user = UserEntity::find_by_id(state.pool(), &admin, user_id).await?;
    let course = Course::find_by_id(state.pool(), &admin, course_id).await?;
    Ok(user.zip(course))
}

pub async fn course_completed(state: &AppState, user_id: Uuid, course_id: Uuid) {
    match recipient(state, user_id, course_id).await {
        Ok(Some((user, course))) => notify::dispatch(
            state.notifier(),
            Notification::CourseCompleted {
                email: user.email().to_string(),
                name: user.name().to_string(),
                course_title: course.title().to_string(),
            },
        ),
        Ok(None) => {}
        Err(e) => log_error(&e),
    }
}

pub async fn certificate_issued(
    state: &AppState,
    user_id: Uuid,
    course_id: Uuid,
    verification_code: &str,
) {
    match recipient(state, user_id, course_id).await {
        Ok(Some((user, course))) => notify::dispatch(
            state.notifier(),
            Notification::CertificateIssued {
                email: user.email().to_string(),
                name: user.name().to_string(),
                course_title: course.title().to_string(),
                verification_code: verification_code.to_string(),
            },
        ),
        Ok(None) => {}
        Err(e) => log_error(&e),
    }
}

pub fn submission_graded(state: &AppState, recipient: GradeRecipient, grade: f64) {
    notify::dispatch(
        state.notifier(),
        Notification::SubmissionGraded {
            email: recipient.email,
            name: recipient.name,
            assignment_title: recipient.assignment_title,
            grade,
            max_points: recipient.max_points,
        },
    );
}
