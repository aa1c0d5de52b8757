mod common;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::common::{
    Action, Flow, FlowContext, create_course_action, enroll_action, setup_server, setup_test_db,
    signin_admin_action, signin_instructor_action, signin_student_action, stored_str,
    with_instructor_and_student,
};

fn payment_path(ctx: &FlowContext) -> String {
    format!("/api/v1/payments/{}", stored_str(ctx, "payment", "id"))
}

fn analytics_path(ctx: &FlowContext) -> String {
    format!("/api/v1/admin/courses/{}/analytics", stored_str(ctx, "course", "id"))
}

#[tokio::test]
async fn paid_enrollment_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    with_instructor_and_student(Flow::new())
        .step(create_course_action("Advanced Rust", 499.0))
        .step(signin_student_action())
        .step(
            Action::new("initiate", "POST", "/api/v1/payments/initiate")
                .with_dyn_body(|ctx| json!({ "course_id": stored_str(ctx, "course", "id") }))
                .with_expect(StatusCode::CREATED)
                .assert_body(|body| {
                    assert!(body.contains("\"status\":\"pending\""));
                    assert!(body.contains("\"currency\":\"ETB\""));
                })
                .with_save_as("payment"),
        )
        // only the payment confirmation may enroll
        .step(
            Action::new("self_confirm", "POST", "/api/v1/payments/confirm")
                .with_dyn_body(|ctx| json!({ "tx_ref": stored_str(ctx, "payment", "tx_ref"), "success": true }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(signin_admin_action().with_clear_cookies(true))
        .step(
            Action::new("confirm", "POST", "/api/v1/payments/confirm")
                .with_dyn_body(|ctx| json!({ "tx_ref": stored_str(ctx, "payment", "tx_ref"), "success": true }))
                .assert_body(|body| {
                    assert!(body.contains("\"status\":\"success\""));
                    assert!(body.contains("\"is_active\":true"));
                }),
        )
        // duplicate gateway signals don't change anything
        .step(
            Action::new("confirm_again", "POST", "/api/v1/payments/confirm")
                .with_dyn_body(|ctx| json!({ "tx_ref": stored_str(ctx, "payment", "tx_ref"), "success": false }))
                .assert_body(|body| assert!(body.contains("\"status\":\"success\""))),
        )
        .step(
            Action::new("recent_payments", "GET", "/api/v1/admin/payments/recent")
                .assert_body(|body| {
                    assert!(body.contains("Advanced Rust"));
                    assert!(body.contains("ada@gmail.com"));
                }),
        )
        .step(
            Action::new("recent_enrollments", "GET", "/api/v1/admin/enrollments/recent")
                .assert_body(|body| {
                    assert!(body.contains("Ada Student"));
                    assert!(body.contains("\"instructor_name\":\"Grace Teacher\""));
                }),
        )
        .step(
            Action::new("course_analytics", "GET", "dynamic")
                .with_dyn_path(analytics_path)
                .assert_body(|body| {
                    assert!(body.contains("\"total_enrollments\":1"));
                    assert!(body.contains("\"total_revenue\":499.0"));
                    assert!(body.contains("\"completion_rate\":0.0"));
                }),
        )
        .step(
            Action::new("confirm_unknown", "POST", "/api/v1/payments/confirm")
                .with_body(json!({ "tx_ref": "learnhub-0-missing", "success": true }))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(signin_student_action())
        .step(enroll_action().with_expect(StatusCode::BAD_REQUEST))
        .step(
            Action::new("progress_after_payment", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/courses/{}/progress", stored_str(ctx, "course", "id")))
                .assert_body(|body| assert!(body.contains("\"percentage\":0.0"))),
        )
        .step(
            Action::new("initiate_when_enrolled", "POST", "/api/v1/payments/initiate")
                .with_dyn_body(|ctx| json!({ "course_id": stored_str(ctx, "course", "id") }))
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            Action::new("payment_history", "GET", "/api/v1/payments/")
                .assert_body(|body| {
                    let v: Value = serde_json::from_str(body).expect("Invalid JSON format");
                    assert_eq!(v.as_array().map(Vec::len), Some(1));
                    assert_eq!(v[0]["status"], "success");
                }),
        )
        .step(
            Action::new("payment_status", "GET", "dynamic")
                .with_dyn_path(payment_path)
                .assert_body(|body| assert!(body.contains("\"status\":\"success\""))),
        )
        .step(
            Action::new("student_analytics", "GET", "dynamic")
                .with_dyn_path(analytics_path)
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(signin_instructor_action())
        .step(
            Action::new("foreign_payment", "GET", "dynamic")
                .with_dyn_path(payment_path)
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("instructor_recent_payments", "GET", "/api/v1/admin/payments/recent")
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("instructor_analytics", "GET", "dynamic")
                .with_dyn_path(analytics_path)
                .assert_body(|body| assert!(body.contains("\"total_enrollments\":1"))),
        )
        .run(&mut server, pool)
        .await;
}
