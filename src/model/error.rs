use thiserror::Error;

pub type DatabaseResult<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("sqlx migrate error: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),
    #[error("sqlx error: {0}")]
    SqlxError(#[from] sqlx::Error),
    #[error("json error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("access to this resource is forbidden: {0}")]
    Forbidden(String),
    #[error("resource not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation failed: {0}")]
    Validation(String),
}

impl DatabaseError {
    pub fn forbidden<S: Into<String>>(reason: S) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn conflict<S: Into<String>>(reason: S) -> Self {
        Self::Conflict(reason.into())
    }

    pub fn validation<S: Into<String>>(reason: S) -> Self {
        Self::Validation(reason.into())
    }

    /// Name of the unique/foreign key constraint that rejected the statement, if any.
    pub fn violated_constraint(&self) -> Option<&str> {
        match self {
            Self::SqlxError(e) => e.as_database_error().and_then(|d| d.constraint()),
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::SqlxError(e) => e
                .as_database_error()
                .is_some_and(|d| d.is_unique_violation()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn domain_errors_have_no_constraint() {
        let e = DatabaseError::conflict("certificate already issued");
        assert!(!e.is_unique_violation());
        assert_eq!(e.violated_constraint(), None);
        assert_eq!(e.to_string(), "conflict: certificate already issued");
    }
}
