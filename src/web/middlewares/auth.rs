use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{
    Config, auth,
    model::{CrudRepository, ResourceTyped, entity::UserEntity},
    web::{AppState, RequestContext, context::AuthenticatedUser, error::WebError},
};

pub static AUTH_TOKEN: &str = "SID";

/// Resolves the `SID` cookie into a [`RequestContext`].
///
/// A missing cookie or a token whose user no longer exists yields an anonymous
/// context; handlers decide whether that is acceptable.
pub async fn extract_context_fn(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, WebError> {
    let token = match cookies.get(AUTH_TOKEN) {
        Some(token) => token,
        None => {
            req.extensions_mut().insert(RequestContext::new(None));
            return Ok(next.run(req).await);
        }
    };

    let claims = auth::process_token(token.value(), Config::get_or_init(false).await.app().jwt())
        .map_err(|e| WebError::auth_cookie_invalid(AUTH_TOKEN, e))?;

    let Some(id) = claims.claims.user_id() else {
        req.extensions_mut().insert(RequestContext::new(None));
        return Ok(next.run(req).await);
    };

    let user = UserEntity::find_by_id(state.pool(), &AuthenticatedUser::admin(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    let ctx = match user {
        Some(user) => RequestContext::new(Some(AuthenticatedUser::new(id, user.role()))),
        None => RequestContext::new(None),
    };
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}
