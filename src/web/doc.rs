use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub struct CookieAuthModifier;

impl Modify for CookieAuthModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(schema) = openapi.components.as_mut() {
            schema.add_security_scheme(
                "cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "SID",
                    "JWT token for current user",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "LearnHub API"),
    paths(
        crate::web::routes::user::user_signup_handler,
        crate::web::routes::user::user_signin_handler,
        crate::web::routes::user::user_list_handler,
        crate::web::routes::user::user_update_handler,
        crate::web::routes::user::user_delete_handler,
        crate::web::routes::courses::courses_page_handler,
        crate::web::routes::courses::courses_create_handler,
        crate::web::routes::courses::courses_get_handler,
        crate::web::routes::courses::courses_update_handler,
        crate::web::routes::courses::courses_delete_handler,
        crate::web::routes::courses::courses_enroll_handler,
        crate::web::routes::courses::courses_modules_handler,
        crate::web::routes::courses::courses_create_module_handler,
        crate::web::routes::courses::courses_progress_handler,
        crate::web::routes::courses::courses_issue_certificate_handler,
        crate::web::routes::courses::courses_review_handler,
        crate::web::routes::courses::courses_reviews_handler,
        crate::web::routes::modules::modules_get_handler,
        crate::web::routes::modules::modules_update_handler,
        crate::web::routes::modules::modules_delete_handler,
        crate::web::routes::lessons::lessons_create_handler,
        crate::web::routes::lessons::lessons_get_handler,
        crate::web::routes::lessons::lessons_update_handler,
        crate::web::routes::lessons::lessons_delete_handler,
        crate::web::routes::lessons::lessons_progress_handler,
        crate::web::routes::progress::progress_lesson_handler,
        crate::web::routes::progress::progress_dashboard_handler,
        crate::web::routes::progress::progress_enrollments_handler,
        crate::web::routes::certificates::certificates_verify_handler,
        crate::web::routes::certificates::certificates_get_handler,
        crate::web::routes::quizzes::quizzes_create_handler,
        crate::web::routes::quizzes::quizzes_get_handler,
        crate::web::routes::quizzes::quizzes_questions_handler,
        crate::web::routes::quizzes::quizzes_start_attempt_handler,
        crate::web::routes::quizzes::quizzes_own_attempts_handler,
        crate::web::routes::quizzes::quizzes_all_attempts_handler,
        crate::web::routes::attempts::attempts_submit_answer_handler,
        crate::web::routes::attempts::attempts_answers_handler,
        crate::web::routes::attempts::attempts_complete_handler,
        crate::web::routes::assignments::assignments_create_handler,
        crate::web::routes::assignments::assignments_submit_handler,
        crate::web::routes::assignments::assignments_own_submissions_handler,
        crate::web::routes::assignments::assignments_all_submissions_handler,
        crate::web::routes::submissions::submissions_grade_handler,
        crate::web::routes::payments::payments_initiate_handler,
        crate::web::routes::payments::payments_confirm_handler,
        crate::web::routes::payments::payments_list_handler,
        crate::web::routes::payments::payments_get_handler,
        crate::web::routes::admin::admin_stats_handler,
        crate::web::routes::admin::admin_domains_list_handler,
        crate::web::routes::admin::admin_domains_add_handler,
        crate::web::routes::admin::admin_domains_remove_handler,
        crate::web::routes::admin::admin_set_role_handler,
        crate::web::routes::admin::admin_course_analytics_handler,
        crate::web::routes::admin::admin_recent_payments_handler,
        crate::web::routes::admin::admin_recent_enrollments_handler,
    ),
    modifiers(&CookieAuthModifier),
)]
pub struct ApiDoc;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn openapi_lists_core_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        for path in [
            "/api/v1/progress/lesson",
            "/api/v1/courses/{id}/certificate",
            "/api/v1/certificates/verify",
            "/api/v1/attempts/{id}/complete",
            "/api/v1/submissions/{id}/grade",
            "/api/v1/courses/{id}/reviews",
            "/api/v1/admin/courses/{id}/analytics",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }
}
