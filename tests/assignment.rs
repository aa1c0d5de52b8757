mod common;
use axum::http::StatusCode;
use serde_json::json;

use crate::common::{
    Action, Flow, FlowContext, create_course_action, enroll_action, setup_server, setup_test_db,
    signin_instructor_action, signin_student_action, stored_str, with_instructor_and_student,
};

fn submissions_path(ctx: &FlowContext) -> String {
    format!("/api/v1/assignments/{}/submissions", stored_str(ctx, "assignment", "id"))
}

fn grade_path(ctx: &FlowContext) -> String {
    format!("/api/v1/submissions/{}/grade", stored_str(ctx, "submission", "id"))
}

#[tokio::test]
async fn assignment_submit_and_grade_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    with_instructor_and_student(Flow::new())
        .step(create_course_action("Other course", 0.0))
        .step(
            Action::new("foreign_module", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/modules", stored_str(ctx, "course", "id")))
                .with_body(json!({ "title": "Elsewhere" }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("foreign_module"),
        )
        .step(create_course_action("Essays", 0.0))
        .step(
            Action::new("assignment_in_foreign_module", "POST", "/api/v1/assignments/")
                .with_dyn_body(|ctx| {
                    json!({
                        "course_id": stored_str(ctx, "course", "id"),
                        "module_id": stored_str(ctx, "foreign_module", "id"),
                        "title": "Misplaced",
                        "due_date": "2030-01-01T00:00:00Z",
                    })
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("create_assignment", "POST", "/api/v1/assignments/")
                .with_dyn_body(|ctx| {
                    json!({
                        "course_id": stored_str(ctx, "course", "id"),
                        "title": "First essay",
                        "due_date": "2030-01-01T00:00:00Z",
                        "published": true,
                    })
                })
                .with_expect(StatusCode::CREATED)
                .assert_body(|body| assert!(body.contains("\"max_points\":100")))
                .with_save_as("assignment"),
        )
        .step(signin_student_action())
        .step(
            Action::new("submit_unenrolled", "POST", "dynamic")
                .with_dyn_path(submissions_path)
                .with_form_text("text", "My essay")
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(enroll_action())
        .step(
            Action::new("submit_empty", "POST", "dynamic")
                .with_dyn_path(submissions_path)
                .with_form_text("text", "   ")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("submit", "POST", "dynamic")
                .with_dyn_path(submissions_path)
                .with_form_text("text", "My essay")
                .with_expect(StatusCode::CREATED)
                .assert_body(|body| {
                    assert!(body.contains("My essay"));
                    assert!(body.contains("\"graded\":false"));
                })
                .with_save_as("submission"),
        )
        .step(
            Action::new("resubmit", "POST", "dynamic")
                .with_dyn_path(submissions_path)
                .with_form_text("text", "Second try")
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            Action::new("student_grades_self", "PUT", "dynamic")
                .with_dyn_path(grade_path)
                .with_body(json!({ "grade": 100 }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(signin_instructor_action())
        .step(
            Action::new("grade_out_of_range", "PUT", "dynamic")
                .with_dyn_path(grade_path)
                .with_body(json!({ "grade": 150 }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("grade", "PUT", "dynamic")
                .with_dyn_path(grade_path)
                .with_body(json!({ "grade": 85, "feedback": "Solid work" }))
                .assert_body(|body| {
                    assert!(body.contains("\"grade\":85.0"));
                    assert!(body.contains("\"graded\":true"));
                    assert!(body.contains("Solid work"));
                }),
        )
        .step(
            Action::new("all_submissions", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("{}/all", submissions_path(ctx)))
                .assert_body(|body| assert!(body.contains("Solid work"))),
        )
        .run(&mut server, pool)
        .await;
}
