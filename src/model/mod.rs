mod access;
pub use access::{HasOwner, check_access};

mod database;
pub use database::DbConnection;

pub mod entity;

mod error;
pub use error::{DatabaseError, DatabaseResult};

mod repo;
pub use repo::{CrudRepository, Page, PaginatableRepository, ResourceType, ResourceTyped};

pub mod scoring;

use sqlx::{PgPool, Postgres, Transaction};

#[derive(Debug, Clone)]
pub struct ModelManager {
    database: DbConnection,
}

impl ModelManager {
    pub fn new(conn: DbConnection) -> Self {
        Self { database: conn }
    }

    pub fn executor(&self) -> &PgPool {
        self.database.pool()
    }

    /// Opens a transaction; dropping it without `commit` rolls everything back.
    pub async fn begin(&self) -> DatabaseResult<Transaction<'static, Postgres>> {
        self.database.begin().await
    }
}
