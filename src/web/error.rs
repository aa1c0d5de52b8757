use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::{
    auth::CryptError,
    error::log_error,
    model::{DatabaseError, ResourceType},
    utils::uploads::BlobError,
};

pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("RegistrationUserConflict")]
    RegistrationUserConflict,

    #[error("RegistrationEmailRejected: {reason}")]
    RegistrationEmailRejected { reason: String },
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("AuthenticationCookieInvalid, cookie: {cookie}. Error: {error}")]
    AuthenticationCookieInvalid {
        cookie: String,
        error: jsonwebtoken::errors::Error,
    },

    #[error("AuthenticationRequired")]
    AuthenticationRequired,

    #[error("AuthenticationInvalidCredentials")]
    AuthenticationInvalidCredentials,
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("ResourceNotFound: {resource_type:?}")]
    ResourceNotFound { resource_type: ResourceType },

    #[error("ResourceForbidden: {resource_type:?}. Reason: {reason}")]
    ResourceForbidden {
        resource_type: ResourceType,
        reason: String,
    },

    #[error("ResourceFetchError: {resource_type:?}. Error: {error}")]
    ResourceFetchError {
        resource_type: ResourceType,
        error: DatabaseError,
    },

    #[error("ResourceBadRequest: {resource_type:?}. Details: {details}")]
    ResourceBadRequest {
        resource_type: ResourceType,
        details: String,
    },

    #[error("ResourceConflict: {resource_type:?}. Details: {details}")]
    ResourceConflict {
        resource_type: ResourceType,
        details: String,
    },
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("ServerCryptError: {0}")]
    ServerCryptError(#[from] crate::auth::CryptError),

    #[error("ServerBlobError: {0}")]
    ServerBlobError(#[from] BlobError),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn client_display(&self) -> String {
        String::from("Internal server error.")
    }
}

impl RegistrationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RegistrationUserConflict => StatusCode::CONFLICT,
            Self::RegistrationEmailRejected { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::RegistrationUserConflict => {
                String::from("Registration error, user already exists.")
            }
            Self::RegistrationEmailRejected { reason } => {
                format!("Registration error, {reason}.")
            }
        }
    }
}

impl AuthenticationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::AuthenticationInvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::AuthenticationCookieInvalid { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::AuthenticationCookieInvalid { .. } => {
                String::from("Authentication error, cookie invalid.")
            }
            Self::AuthenticationRequired => String::from("Authentication required."),
            Self::AuthenticationInvalidCredentials => {
                String::from("Authentication error, user not found or password is invalid.")
            }
        }
    }
}

impl ResourceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Self::ResourceForbidden { .. } => StatusCode::FORBIDDEN,
            Self::ResourceFetchError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ResourceBadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::ResourceConflict { .. } => StatusCode::CONFLICT,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceNotFound { .. } => String::from("Resource error, resource not found."),
            Self::ResourceForbidden { reason, .. } => {
                format!("Resource error, resource forbidden: {reason}.")
            }
            Self::ResourceFetchError { .. } => {
                String::from("Resource error, unable to fetch resource. Retry later.")
            }
            Self::ResourceBadRequest { details, .. } => {
                format!("Resource error, bad request: {details}.")
            }
            Self::ResourceConflict { details, .. } => {
                format!("Resource error, conflict: {details}.")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("ResourceError - {0}")]
    ResourceError(#[from] ResourceError),
    #[error("AuthenticationError - {0}")]
    AuthenticationError(#[from] AuthenticationError),
    #[error("RegistrationError - {0}")]
    RegistrationError(#[from] RegistrationError),
    #[error("ServerError - {0}")]
    ServerError(#[from] ServerError),
}

impl WebError {
    pub fn resource_not_found(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceNotFound {
            resource_type: r#type,
        })
    }

    pub fn resource_forbidden<S: Into<String>>(r#type: ResourceType, reason: S) -> Self {
        Self::ResourceError(ResourceError::ResourceForbidden {
            resource_type: r#type,
            reason: reason.into(),
        })
    }

    pub fn resource_fetch_error(r#type: ResourceType, error: DatabaseError) -> Self {
        Self::ResourceError(ResourceError::ResourceFetchError {
            resource_type: r#type,
            error,
        })
    }

    pub fn resource_bad_request<S: Into<String>>(r#type: ResourceType, details: S) -> Self {
        Self::ResourceError(ResourceError::ResourceBadRequest {
            resource_type: r#type,
            details: details.into(),
        })
    }

    pub fn resource_conflict<S: Into<String>>(r#type: ResourceType, details: S) -> Self {
        Self::ResourceError(ResourceError::ResourceConflict {
            resource_type: r#type,
            details: details.into(),
        })
    }

    /// Maps the model error taxonomy onto HTTP semantics for `r#type`.
    pub fn from_database(r#type: ResourceType, error: DatabaseError) -> Self {
        match error {
            DatabaseError::Forbidden(reason) => Self::resource_forbidden(r#type, reason),
            DatabaseError::NotFound => Self::resource_not_found(r#type),
            DatabaseError::Conflict(details) => Self::resource_conflict(r#type, details),
            DatabaseError::Validation(details) => Self::resource_bad_request(r#type, details),
            other => Self::resource_fetch_error(r#type, other),
        }
    }

    pub fn auth_cookie_invalid<S: Into<String>>(
        cookie: S,
        error: jsonwebtoken::errors::Error,
    ) -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationCookieInvalid {
            cookie: cookie.into(),
            error,
        })
    }

    pub fn auth_required() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationRequired)
    }

    pub fn auth_invalid_credentials() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationInvalidCredentials)
    }

    pub fn registration_conflict() -> Self {
        Self::RegistrationError(RegistrationError::RegistrationUserConflict)
    }

    pub fn registration_email_rejected<S: Into<String>>(reason: S) -> Self {
        Self::RegistrationError(RegistrationError::RegistrationEmailRejected {
            reason: reason.into(),
        })
    }

    pub fn server_crypt_error(e: CryptError) -> Self {
        Self::ServerError(ServerError::ServerCryptError(e))
    }

    pub fn server_blob_error(e: BlobError) -> Self {
        Self::ServerError(ServerError::ServerBlobError(e))
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            Self::ResourceError(e) => e.status_code(),
            Self::RegistrationError(e) => e.status_code(),
            Self::AuthenticationError(e) => e.status_code(),
            Self::ServerError(e) => e.status_code(),
        }
    }

    /// Stable, machine readable error class: fix input, retry later, or not allowed.
    pub fn kind(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "validation",
            StatusCode::UNAUTHORIZED => "authentication",
            StatusCode::FORBIDDEN => "forbidden",
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::CONFLICT => "conflict",
            _ => "server",
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceError(e) => e.client_display(),
            Self::RegistrationError(e) => e.client_display(),
            Self::AuthenticationError(e) => e.client_display(),
            Self::ServerError(e) => e.client_display(),
        }
    }
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message for the client
    pub message: String,
    /// Error class: validation, authentication, forbidden, not_found, conflict or server
    pub kind: String,
    /// HTTP status code (stringified)
    pub status_code: String,
    /// Optional debug details (only in debug mode)
    pub details: Option<String>,
}

impl IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        log_error(&self);

        let status_code = self.status_code();
        let display = self.client_display();

        let body = ErrorResponse {
            message: display,
            kind: self.kind().to_string(),
            status_code: status_code.as_str().to_string(),
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        };

        (status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn database_taxonomy_maps_to_statuses() {
        let cases = [
            (DatabaseError::forbidden("not enrolled"), StatusCode::FORBIDDEN, "forbidden"),
            (DatabaseError::NotFound, StatusCode::NOT_FOUND, "not_found"),
            (DatabaseError::conflict("already issued"), StatusCode::CONFLICT, "conflict"),
            (DatabaseError::validation("grade out of range"), StatusCode::BAD_REQUEST, "validation"),
            (
                DatabaseError::SqlxError(sqlx::Error::PoolTimedOut),
                StatusCode::INTERNAL_SERVER_ERROR,
                "server",
            ),
        ];

        for (error, status, kind) in cases {
            let e = WebError::from_database(ResourceType::Certificate, error);
            assert_eq!(e.status_code(), status);
            assert_eq!(e.kind(), kind);
        }
    }

    #[test]
    fn conflict_message_carries_details() {
        let e = WebError::resource_conflict(ResourceType::Certificate, "certificate already issued");
        assert!(e.client_display().contains("certificate already issued"));
    }
}
