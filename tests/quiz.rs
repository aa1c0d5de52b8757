mod common;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::common::{
    Action, Flow, FlowContext, create_course_action, enroll_action, setup_server, setup_test_db,
    signin_instructor_action, signin_student_action, stored_str, with_instructor_and_student,
};

fn question_id(ctx: &FlowContext, index: usize) -> String {
    ctx.get("quiz")["questions"][index]["id"]
        .as_str()
        .expect("question id")
        .to_string()
}

fn attempt_path(ctx: &FlowContext, suffix: &str) -> String {
    let id = ctx.get("attempt")["attempt"]["id"].as_str().expect("attempt id");
    format!("/api/v1/attempts/{id}/{suffix}")
}

fn score_of(body: &str) -> f64 {
    let v: Value = serde_json::from_str(body).expect("Invalid JSON format");
    v["score"].as_f64().expect("score")
}

#[tokio::test]
async fn quiz_attempt_scoring_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    with_instructor_and_student(Flow::new())
        .step(create_course_action("Biology", 0.0))
        .step(
            Action::new("create_quiz", "POST", "/api/v1/quizzes/")
                .with_dyn_body(|ctx| {
                    json!({
                        "course_id": stored_str(ctx, "course", "id"),
                        "title": "Cells",
                        "passing_score": 60,
                        "max_attempts": 2,
                        "published": true,
                        "questions": [
                            {
                                "question": "Pick the first letter",
                                "question_type": "multiple_choice",
                                "options": ["A", "B", "C"],
                                "correct_answer": "A",
                                "points": 5,
                                "order_index": 0
                            },
                            {
                                "question": "Powerhouse of the cell?",
                                "question_type": "short_answer",
                                "correct_answer": "mitochondria",
                                "points": 10,
                                "order_index": 1
                            }
                        ]
                    })
                })
                .with_expect(StatusCode::CREATED)
                .with_save_as("quiz"),
        )
        .step(signin_student_action())
        // not enrolled yet
        .step(
            Action::new("view_unenrolled", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/quizzes/{}", ctx.get("quiz")["quiz"]["id"].as_str().unwrap()))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(enroll_action())
        .step(
            Action::new("view_quiz", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/quizzes/{}", ctx.get("quiz")["quiz"]["id"].as_str().unwrap()))
                .assert_body(|body| {
                    assert!(body.contains("Powerhouse of the cell?"));
                    assert!(!body.contains("mitochondria"));
                    assert!(!body.contains("correct_answer"));
                }),
        )
        .step(
            Action::new("answers_are_instructor_only", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/quizzes/{}/questions", ctx.get("quiz")["quiz"]["id"].as_str().unwrap()))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("start_attempt", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/quizzes/{}/attempts", ctx.get("quiz")["quiz"]["id"].as_str().unwrap()))
                .with_expect(StatusCode::CREATED)
                .assert_body(|body| assert!(!body.contains("mitochondria")))
                .with_save_as("attempt"),
        )
        .step(
            Action::new("empty_answer", "POST", "dynamic")
                .with_dyn_path(|ctx| attempt_path(ctx, "answers"))
                .with_dyn_body(|ctx| json!({ "question_id": question_id(ctx, 0), "answer": "   " }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("answer_first", "POST", "dynamic")
                .with_dyn_path(|ctx| attempt_path(ctx, "answers"))
                .with_dyn_body(|ctx| json!({ "question_id": question_id(ctx, 0), "answer": " a " }))
                .assert_body(|body| assert!(body.contains("\"is_correct\":true"))),
        )
        .step(
            Action::new("answer_second", "POST", "dynamic")
                .with_dyn_path(|ctx| attempt_path(ctx, "answers"))
                .with_dyn_body(|ctx| json!({ "question_id": question_id(ctx, 1), "answer": "ribosome" }))
                .assert_body(|body| assert!(body.contains("\"is_correct\":false"))),
        )
        .step(
            Action::new("complete", "POST", "dynamic")
                .with_dyn_path(|ctx| attempt_path(ctx, "complete"))
                .assert_body(|body| {
                    assert!((score_of(body) - 100.0 / 3.0).abs() < 0.01);
                    assert!(body.contains("\"passed\":false"));
                    assert!(body.contains("\"completed\":true"));
                }),
        )
        // completing again returns the stored result
        .step(
            Action::new("complete_again", "POST", "dynamic")
                .with_dyn_path(|ctx| attempt_path(ctx, "complete"))
                .assert_body(|body| {
                    assert!((score_of(body) - 100.0 / 3.0).abs() < 0.01);
                    assert!(body.contains("\"passed\":false"));
                }),
        )
        .step(
            Action::new("answer_after_complete", "POST", "dynamic")
                .with_dyn_path(|ctx| attempt_path(ctx, "answers"))
                .with_dyn_body(|ctx| json!({ "question_id": question_id(ctx, 1), "answer": "mitochondria" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("second_attempt", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/quizzes/{}/attempts", ctx.get("quiz")["quiz"]["id"].as_str().unwrap()))
                .with_expect(StatusCode::CREATED),
        )
        .step(
            Action::new("attempt_limit", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/quizzes/{}/attempts", ctx.get("quiz")["quiz"]["id"].as_str().unwrap()))
                .with_expect(StatusCode::CONFLICT),
        )
        .step(signin_instructor_action())
        .step(
            Action::new("all_attempts", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/quizzes/{}/attempts/all", ctx.get("quiz")["quiz"]["id"].as_str().unwrap()))
                .assert_body(|body| {
                    let v: Value = serde_json::from_str(body).expect("Invalid JSON format");
                    assert_eq!(v.as_array().map(Vec::len), Some(2));
                }),
        )
        .run(&mut server, pool)
        .await;
}

fn quiz_path(ctx: &FlowContext, key: &str, suffix: &str) -> String {
    let id = ctx.get(key)["quiz"]["id"].as_str().expect("quiz id");
    format!("/api/v1/quizzes/{id}{suffix}")
}

fn create_quiz_action(title: &'static str, published: bool, save_as: &'static str) -> Action {
    Action::new("create_quiz", "POST", "/api/v1/quizzes/")
        .with_dyn_body(move |ctx| {
            json!({
                "course_id": stored_str(ctx, "course", "id"),
                "title": title,
                "max_attempts": 0,
                "published": published,
                "questions": [
                    {
                        "question": "Powerhouse of the cell?",
                        "question_type": "short_answer",
                        "correct_answer": "the mitochondria",
                        "points": 4
                    },
                    {
                        "question": "Cells have membranes",
                        "question_type": "true_false",
                        "options": ["true", "false"],
                        "correct_answer": "true",
                        "points": 1
                    }
                ]
            })
        })
        .with_expect(StatusCode::CREATED)
        .with_save_as(save_as)
}

#[tokio::test]
async fn quiz_answer_rules_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    with_instructor_and_student(Flow::new())
        .step(create_course_action("Biology", 0.0))
        .step(create_quiz_action("Cells", true, "quiz"))
        .step(create_quiz_action("Draft", false, "draft"))
        .step(signin_student_action())
        .step(enroll_action())
        .step(
            Action::new("start_unpublished", "POST", "dynamic")
                .with_dyn_path(|ctx| quiz_path(ctx, "draft", "/attempts"))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("start_attempt", "POST", "dynamic")
                .with_dyn_path(|ctx| quiz_path(ctx, "quiz", "/attempts"))
                .with_expect(StatusCode::CREATED)
                .with_save_as("attempt"),
        )
        // a question of another quiz is not part of this attempt
        .step(
            Action::new("foreign_question", "POST", "dynamic")
                .with_dyn_path(|ctx| attempt_path(ctx, "answers"))
                .with_dyn_body(|ctx| {
                    let foreign = ctx.get("draft")["questions"][0]["id"]
                        .as_str()
                        .expect("question id")
                        .to_string();
                    json!({ "question_id": foreign, "answer": "mitochondria" })
                })
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            Action::new("wrong_answer", "POST", "dynamic")
                .with_dyn_path(|ctx| attempt_path(ctx, "answers"))
                .with_dyn_body(|ctx| json!({ "question_id": question_id(ctx, 0), "answer": "ribosome" }))
                .assert_body(|body| assert!(body.contains("\"is_correct\":false"))),
        )
        // overwritten, and the substring is accepted
        .step(
            Action::new("corrected_answer", "POST", "dynamic")
                .with_dyn_path(|ctx| attempt_path(ctx, "answers"))
                .with_dyn_body(|ctx| json!({ "question_id": question_id(ctx, 0), "answer": "Mitochondria" }))
                .assert_body(|body| {
                    assert!(body.contains("\"is_correct\":true"));
                    assert!(body.contains("\"points_earned\":4.0"));
                }),
        )
        .step(
            Action::new("true_false_answer", "POST", "dynamic")
                .with_dyn_path(|ctx| attempt_path(ctx, "answers"))
                .with_dyn_body(|ctx| json!({ "question_id": question_id(ctx, 1), "answer": "TRUE" }))
                .assert_body(|body| assert!(body.contains("\"is_correct\":true"))),
        )
        .step(
            Action::new("one_row_per_question", "GET", "dynamic")
                .with_dyn_path(|ctx| attempt_path(ctx, "answers"))
                .assert_body(|body| {
                    let v: Value = serde_json::from_str(body).expect("Invalid JSON format");
                    assert_eq!(v.as_array().map(Vec::len), Some(2));
                }),
        )
        .step(
            Action::new("complete", "POST", "dynamic")
                .with_dyn_path(|ctx| attempt_path(ctx, "complete"))
                .assert_body(|body| {
                    assert_eq!(score_of(body), 100.0);
                    assert!(body.contains("\"passed\":true"));
                }),
        )
        .run(&mut server, pool)
        .await;
}
