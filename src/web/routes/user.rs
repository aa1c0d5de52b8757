use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::Duration;
use tower_cookies::{Cookie, Cookies, cookie::SameSite};
use uuid::Uuid;

use crate::{
    Config,
    auth::{self, UserClaims, hash_password, verify_password},
    model::{
        CrudRepository, DatabaseError, PaginatableRepository, ResourceTyped, check_access,
        entity::{AllowedEmailDomain, UserEntity, UserEntityCreateUpdate},
    },
    utils::validation::{email_domain, is_valid_email},
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::account::{AccountUpdateBody, SigninBody, SignupBody},
        error::ErrorResponse,
        middlewares::{self, AUTH_TOKEN},
        routes::PaginationQuery,
    },
};

const MIN_PASSWORD_LEN: usize = 6;

pub fn routes<S>(state: AppState) -> Router<S> {
    let protected = Router::new()
        .route("/page", get(user_list_handler))
        .route("/verify", get(user_verify_handler))
        .route("/{id}", put(user_update_handler).delete(user_delete_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ));

    Router::new()
        .route("/signup", post(user_signup_handler))
        .route("/signin", post(user_signin_handler))
        .merge(protected)
        .with_state(state)
}

async fn set_session_cookie(cookies: &Cookies, user_id: Uuid) -> WebResult<()> {
    let jwt_token = Config::get_or_init(false).await.app().jwt();
    let claims = UserClaims::new(user_id, Duration::days(1));

    let token = auth::generate_token(claims, jwt_token)
        .map_err(|e| WebError::server_crypt_error(e.into()))?;

    let mut cookie = Cookie::new(AUTH_TOKEN, token);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookies.add(cookie);
    Ok(())
}

fn validate_password(password: &str) -> WebResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(WebError::resource_bad_request(
            UserEntity::get_resource_type(),
            format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/account/signup",
    request_body = SignupBody,
    description = "Creates a student account. The e-mail domain must be on the allowed list",
    responses(
        (status = 200, description = "User created successfully", body = UserEntity),
        (status = 400, description = "E-mail, domain or password rejected", body = ErrorResponse),
        (status = 409, description = "User already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account"
)]
async fn user_signup_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<SignupBody>,
) -> WebResult<impl IntoResponse> {
    let email = payload.email.trim().to_lowercase();
    let domain = email_domain(&email)
        .ok_or(WebError::registration_email_rejected("invalid e-mail address"))?;

    let allowed = AllowedEmailDomain::contains(state.pool(), &domain)
        .await
        .map_err(|e| WebError::from_database(AllowedEmailDomain::get_resource_type(), e))?;
    if !allowed {
        return Err(WebError::registration_email_rejected(format!(
            "e-mail domain {domain} is not allowed"
        )));
    }
    if payload.name.trim().is_empty() {
        return Err(WebError::registration_email_rejected("name is required"));
    }
    validate_password(&payload.password)?;

    let admin = AuthenticatedUser::admin();
    let found = UserEntity::find_by_email(state.pool(), &admin, &email)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    if found.is_some() {
        return Err(WebError::registration_conflict());
    }

    let hash = hash_password(&payload.password).map_err(WebError::server_crypt_error)?;
    let payload = UserEntityCreateUpdate {
        email,
        name: payload.name.trim().to_string(),
        password_hash: hash,
    };

    let created = UserEntity::create(state.pool(), &admin, payload)
        .await
        .map_err(|e| match e {
            DatabaseError::Conflict(_) => WebError::registration_conflict(),
            e => WebError::from_database(UserEntity::get_resource_type(), e),
        })?;

    set_session_cookie(&cookies, created.id()).await?;
    tracing::info!("user {} signed up", created.id());

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/signin",
    description = "Authorizes user in the system",
    request_body = SigninBody,
    responses(
        (status = 200, description = "User signed in", body = UserEntity),
        (status = 401, description = "Credentials invalid", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
)]
async fn user_signin_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<SigninBody>,
) -> WebResult<impl IntoResponse> {
    let admin = AuthenticatedUser::admin();
    let found = UserEntity::find_by_email(state.pool(), &admin, payload.email.trim())
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or(WebError::auth_invalid_credentials())?;

    let is_verified =
        verify_password(found.hash(), &payload.password).map_err(WebError::server_crypt_error)?;

    if !is_verified {
        return Err(WebError::auth_invalid_credentials());
    }

    set_session_cookie(&cookies, found.id()).await?;

    Ok((StatusCode::OK, Json(found)))
}

async fn user_verify_handler(ctx: RequestContext) -> WebResult<impl IntoResponse> {
    let user = ctx.maybe_user();

    if user.is_none() {
        return Ok(StatusCode::UNAUTHORIZED);
    }

    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/v1/account/page",
    params(
        ("limit" = i64, Query, description = "Page size"),
        ("offset" = i64, Query, description = "Rows to skip"),
    ),
    responses(
        (status = 200, description = "Returns requested page", body = crate::model::Page<UserEntity>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn user_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    if !user.is_admin() {
        return Err(WebError::resource_forbidden(
            UserEntity::get_resource_type(),
            "administrators only",
        ));
    }

    let users = UserEntity::page(state.pool(), user, page.limit, page.offset)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(users)))
}

#[utoipa::path(
    put,
    path = "/api/v1/account/{id}",
    request_body = AccountUpdateBody,
    params(
        ("id" = Uuid, Path, description = "User to update")
    ),
    responses(
        (status = 200, description = "User updated successfully", body = UserEntity),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "You doesn't have enough permissions to do this", body = ErrorResponse),
        (status = 409, description = "E-mail already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn user_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AccountUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let found = UserEntity::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(UserEntity::get_resource_type()))?;

    check_access(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| WebError::from_database(UserEntity::get_resource_type(), e))?;

    let email = match payload.email {
        Some(email) => {
            let email = email.trim().to_lowercase();
            if !is_valid_email(&email) {
                return Err(WebError::resource_bad_request(
                    UserEntity::get_resource_type(),
                    "invalid e-mail address",
                ));
            }
            email
        }
        None => found.email().to_string(),
    };
    let password_hash = match payload.password {
        Some(password) => {
            validate_password(&password)?;
            hash_password(&password).map_err(WebError::server_crypt_error)?
        }
        None => found.hash().to_string(),
    };
    let payload = UserEntityCreateUpdate {
        email,
        name: payload.name.unwrap_or_else(|| found.name().to_string()),
        password_hash,
    };

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(|e| WebError::from_database(UserEntity::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/account/{id}",
    description = "Deletes specified user",
    params(
        ("id" = Uuid, Path, description = "User to delete")
    ),
    responses(
        (status = 200, description = "User deleted successfully"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn user_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let found = UserEntity::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or(WebError::resource_not_found(UserEntity::get_resource_type()))?;

    check_access(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| WebError::from_database(UserEntity::get_resource_type(), e))?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}
