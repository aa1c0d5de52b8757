use crate::{
    Config,
    web::{AppState, doc::ApiDoc},
};
use axum::Router;
use serde::Deserialize;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, services::ServeDir};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod admin;
pub mod assignments;
pub mod attempts;
pub mod certificates;
pub mod courses;
pub mod lessons;
pub mod modules;
pub mod payments;
pub mod progress;
pub mod quizzes;
pub mod submissions;
pub mod user;

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct PaginationQuery {
    limit: i64,
    offset: i64,
}

pub fn build_app<S: Send + Sync + Clone + 'static>(
    state: AppState,
    config: &'static Config,
) -> Router<S> {
    let mut router = Router::new()
        .nest("/api/v1/account/", user::routes(state.clone()))
        .nest("/api/v1/courses/", courses::routes(state.clone()))
        .nest("/api/v1/modules/", modules::routes(state.clone()))
        .nest("/api/v1/lessons/", lessons::routes(state.clone()))
        .nest("/api/v1/progress/", progress::routes(state.clone()))
        .nest("/api/v1/certificates/", certificates::routes(state.clone()))
        .nest("/api/v1/quizzes/", quizzes::routes(state.clone()))
        .nest("/api/v1/attempts/", attempts::routes(state.clone()))
        .nest("/api/v1/assignments/", assignments::routes(state.clone()))
        .nest("/api/v1/submissions/", submissions::routes(state.clone()))
        .nest("/api/v1/payments/", payments::routes(state.clone()))
        .nest("/api/v1/admin/", admin::routes(state.clone()))
        .nest_service(
            "/api/v1/static/",
            ServeDir::new(config.app().uploads_dir()),
        )
        .layer(CookieManagerLayer::default())
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    if config.app().docs() {
        let openapi = ApiDoc::openapi();

        router = router.merge(SwaggerUi::new("/api/v1/docs").url("/api-doc/openapi.json", openapi));
    }

    router
}
