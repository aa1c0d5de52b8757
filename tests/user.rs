mod common;
use axum::http::StatusCode;
use learnhub::model::entity::UserEntity;
use learnhub::web::middlewares::AUTH_TOKEN;
use serde_json::json;
use tower_cookies::cookie::SameSite;

use crate::common::{
    Action, Flow, setup_server, setup_test_db, signin_action, signin_admin_action, signup_action,
};

#[tokio::test]
async fn route_signup_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            signup_action("foobar@gmail.com", "Foo Bar", "foobaz")
                .assert_cookie(AUTH_TOKEN, |cookie| {
                    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
                    assert_eq!(cookie.path(), Some("/"));
                    assert_eq!(cookie.http_only(), Some(true));
                })
                .assert_body(|body| {
                    let ent: UserEntity = serde_json::from_str(body).expect("Invalid body format");
                    assert_eq!(ent.email(), "foobar@gmail.com");
                    assert_eq!(ent.name(), "Foo Bar");
                    assert!(!body.contains("password"));
                })
                .with_expect(StatusCode::OK),
        )
        // try to signup twice, case differences included
        .step(
            signup_action("FooBar@Gmail.com", "Foo Bar", "foobaz")
                .with_expect(StatusCode::CONFLICT),
        )
        // domain outside the allow-list
        .step(
            signup_action("someone@unknown-domain.test", "Someone", "foobaz")
                .with_expect(StatusCode::BAD_REQUEST)
                .assert_body(|body| assert!(body.contains("not allowed"))),
        )
        // password too short
        .step(
            signup_action("short@gmail.com", "Short", "abc")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_signin_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            signup_action("signin@gmail.com", "Sign In", "SIGNINTEST").with_save_cookies(false),
        )
        .step(
            signin_action("signin@gmail.com", "SIGNINTEST")
                .assert_cookie(AUTH_TOKEN, |cookie| {
                    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
                    assert_eq!(cookie.path(), Some("/"));
                    assert_eq!(cookie.http_only(), Some(true));
                })
                .assert_body(|body| {
                    let ent: UserEntity = serde_json::from_str(body).expect("Invalid JSON format");
                    assert_eq!(ent.email(), "signin@gmail.com");
                })
                .with_expect(StatusCode::OK)
                .with_clear_cookies(true),
        )
        // wrong credentials
        .step(
            signin_action("signin@gmail.com", "WRONGPASSWORD")
                .with_save_cookies(false)
                .with_clear_cookies(true)
                .assert_body(|body| {
                    assert!(body.contains("Authentication error"));
                    assert!(body.contains("\"kind\":\"authentication\""));
                })
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        // non-existing account
        .step(
            signin_action("nonexisting@gmail.com", "nvm")
                .with_expect(StatusCode::UNAUTHORIZED)
                .assert_body(|body| assert!(body.contains("Authentication error"))),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_user_list_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signup_action("foobar@gmail.com", "Foo", "FOOBAZ").with_save_cookies(true))
        // try to request without admin perms
        .step(
            Action::new("user_list", "GET", "/api/v1/account/page")
                .assert_body(|body| {
                    assert!(body.contains("forbidden"));
                })
                .with_param("limit", "5")
                .with_param("offset", "0")
                .with_expect(StatusCode::FORBIDDEN)
                .with_save_cookies(true),
        )
        // acquire admin account
        .step(signin_admin_action())
        .step(
            Action::new("user_list", "GET", "/api/v1/account/page")
                .with_param("limit", "5")
                .with_param("offset", "0")
                .assert_body(|body| {
                    assert!(body.contains("total"));
                    assert!(body.contains("items"));
                })
                .with_expect(StatusCode::OK),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_user_update_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        // create a pair of users and save their data to `foobar_user` and `foobar2_user`
        .step(
            signup_action("foobar@gmail.com", "Foo", "FOOBAZ")
                .with_save_cookies(false)
                .with_save_as("foobar_user"),
        )
        .step(
            signup_action("foobar2@gmail.com", "Foo2", "FOOBAZ2")
                .with_save_cookies(true)
                .with_save_as("foobar2_user"),
        )
        // try to update `foobar_user` without permissions
        .step(
            Action::new("user_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| {
                    let user = ctx.get_json::<UserEntity>("foobar_user");
                    format!("/api/v1/account/{}", user.id())
                })
                .with_body(json!({
                    "name": "should fail",
                }))
                .with_expect(StatusCode::FORBIDDEN)
                .assert_body(|body| {
                    assert!(body.contains("forbidden"));
                }),
        )
        // try to update self, this one should work
        .step(
            Action::new("user_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| {
                    let user = ctx.get_json::<UserEntity>("foobar2_user");
                    format!("/api/v1/account/{}", user.id())
                })
                .with_expect(StatusCode::OK)
                .with_body(json!({
                    "name": "FOOBAR3",
                    "password": "a brand new password",
                }))
                .assert_body(|body| {
                    assert!(body.contains("FOOBAR3"));
                }),
        )
        // login as admin to test admin perms
        .step(
            signin_admin_action()
                .with_save_cookies(true)
                .with_clear_cookies(true),
        )
        // try to update foobar with admin perms
        .step(
            Action::new("user_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| {
                    let foobar = ctx.get_json::<UserEntity>("foobar_user");
                    format!("/api/v1/account/{}", foobar.id())
                })
                .with_body(json!({
                    "name": "FOOBAR4",
                }))
                .with_expect(StatusCode::OK)
                .assert_body(|body| {
                    assert!(body.contains("FOOBAR4"));
                }),
        )
        // try to take the e-mail of the existing user. This one should fail.
        .step(
            Action::new("user_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| {
                    let foobar = ctx.get_json::<UserEntity>("foobar_user");
                    format!("/api/v1/account/{}", foobar.id())
                })
                .with_body(json!({
                    "email": "foobar2@gmail.com",
                }))
                .with_expect(StatusCode::CONFLICT)
                .assert_body(|body| {
                    assert!(body.contains("conflict"));
                }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_user_delete_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            signup_action("foobar@gmail.com", "Foo", "FOOBAZ")
                .with_save_cookies(false)
                .with_save_as("foobar"),
        )
        .step(
            signup_action("foobaz@gmail.com", "Baz", "FOOBAR")
                .with_save_cookies(true)
                .with_save_as("foobaz"),
        )
        // we can't allow everybody to delete anybody
        .step(
            Action::new("user_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| {
                    let foobar = ctx.get_json::<UserEntity>("foobar");
                    format!("/api/v1/account/{}", foobar.id())
                })
                .with_expect(StatusCode::FORBIDDEN)
                .assert_body(|body| {
                    assert!(body.contains("error"));
                }),
        )
        // self deletion is allowed
        .step(
            Action::new("user_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| {
                    let foobaz = ctx.get_json::<UserEntity>("foobaz");
                    format!("/api/v1/account/{}", foobaz.id())
                })
                .with_expect(StatusCode::OK),
        )
        .step(signin_admin_action())
        // even admin cannot delete the user which doesn't exist
        .step(
            Action::new("user_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| {
                    let foobaz = ctx.get_json::<UserEntity>("foobaz");
                    format!("/api/v1/account/{}", foobaz.id())
                })
                .with_expect(StatusCode::NOT_FOUND),
        )
        // admin can delete any user
        .step(
            Action::new("user_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| {
                    let foobar = ctx.get_json::<UserEntity>("foobar");
                    format!("/api/v1/account/{}", foobar.id())
                })
                .with_expect(StatusCode::OK),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_admin_email_domains_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            signup_action("late@newschool.edu", "Late", "password")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(signin_admin_action())
        .step(
            Action::new("add_domain", "POST", "/api/v1/admin/email-domains")
                .with_body(json!({ "domain": "NewSchool.edu" }))
                .with_expect(StatusCode::CREATED)
                .assert_body(|body| assert!(body.contains("newschool.edu"))),
        )
        .step(
            Action::new("add_domain_again", "POST", "/api/v1/admin/email-domains")
                .with_body(json!({ "domain": "newschool.edu" }))
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            signup_action("late@newschool.edu", "Late", "password")
                .with_clear_cookies(true)
                .with_save_cookies(false),
        )
        .step(signin_admin_action())
        .step(
            Action::new("remove_domain", "DELETE", "/api/v1/admin/email-domains/newschool.edu"),
        )
        .step(
            Action::new("remove_missing", "DELETE", "/api/v1/admin/email-domains/newschool.edu")
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            Action::new("stats", "GET", "/api/v1/admin/stats")
                .assert_body(|body| assert!(body.contains("\"students\":1"))),
        )
        .run(&mut server, pool)
        .await;
}
