mod common;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::common::{
    Action, Flow, FlowContext, create_course_action, enroll_action, setup_server, setup_test_db,
    signin_instructor_action, signin_student_action, stored_str, with_instructor_and_student,
};

fn reviews_path(ctx: &FlowContext) -> String {
    format!("/api/v1/courses/{}/reviews", stored_str(ctx, "course", "id"))
}

#[tokio::test]
async fn course_review_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    with_instructor_and_student(Flow::new())
        .step(create_course_action("Rust 101", 0.0))
        .step(signin_student_action())
        .step(
            Action::new("review_unenrolled", "POST", "dynamic")
                .with_dyn_path(reviews_path)
                .with_body(json!({ "rating": 4 }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(enroll_action())
        .step(
            Action::new("rating_too_high", "POST", "dynamic")
                .with_dyn_path(reviews_path)
                .with_body(json!({ "rating": 6, "comment": "wow" }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("review", "POST", "dynamic")
                .with_dyn_path(reviews_path)
                .with_body(json!({ "rating": 3, "comment": "Good start" }))
                .assert_body(|body| assert!(body.contains("\"rating\":3"))),
        )
        // a second review replaces the first
        .step(
            Action::new("review_again", "POST", "dynamic")
                .with_dyn_path(reviews_path)
                .with_body(json!({ "rating": 5, "comment": "Great by the end" }))
                .assert_body(|body| assert!(body.contains("\"rating\":5"))),
        )
        .step(
            Action::new("list_reviews", "GET", "dynamic")
                .with_clear_cookies(true)
                .with_dyn_path(reviews_path)
                .assert_body(|body| {
                    let v: Value = serde_json::from_str(body).expect("Invalid JSON format");
                    assert_eq!(v.as_array().map(Vec::len), Some(1));
                    assert_eq!(v[0]["reviewer_name"], "Ada Student");
                    assert_eq!(v[0]["comment"], "Great by the end");
                }),
        )
        .step(signin_instructor_action())
        .step(
            Action::new("analytics_rating", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/admin/courses/{}/analytics", stored_str(ctx, "course", "id")))
                .assert_body(|body| {
                    assert!(body.contains("\"average_rating\":5.0"));
                    assert!(body.contains("\"total_reviews\":1"));
                    assert!(body.contains("\"total_revenue\":0.0"));
                }),
        )
        .run(&mut server, pool)
        .await;
}
