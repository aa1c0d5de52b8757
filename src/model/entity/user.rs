use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::web::AuthenticatedUser;
use crate::web::UserRole;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::{
    ModelManager,
    error::{DatabaseError, DatabaseResult},
    repo::CrudRepository,
};

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct UserEntity {
    id: uuid::Uuid,
    email: String,
    name: String,
    #[serde(skip)]
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UserEntityCreateUpdate {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

impl ResourceTyped for UserEntity {
    fn get_resource_type() -> crate::model::repo::ResourceType {
        crate::model::repo::ResourceType::User
    }
}

impl UserEntity {
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> &str {
        &self.password_hash
    }

    pub fn role(&self) -> UserRole {
        UserRole::from(self.role.as_str())
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[async_trait::async_trait]
impl CrudRepository<UserEntity, UserEntityCreateUpdate, uuid::Uuid> for UserEntity {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserEntityCreateUpdate,
    ) -> DatabaseResult<Self> {
        let result = sqlx::query_as(
            "INSERT INTO users (id, email, name, password_hash, role) VALUES ($1,$2,$3,$4,$5) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.email.to_lowercase())
        .bind(&data.name)
        .bind(&data.password_hash)
        .bind(UserRole::Student.to_string())
        .fetch_one(mm.executor())
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(e) => {
                let e = DatabaseError::from(e);
                if e.is_unique_violation() {
                    Err(DatabaseError::conflict("e-mail already registered"))
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserEntityCreateUpdate,
    ) -> DatabaseResult<Self> {
        let email = data.email.to_lowercase();
        let result = sqlx::query("UPDATE users SET email = $1, name = $2, password_hash = $3 WHERE id = $4")
            .bind(&email)
            .bind(&data.name)
            .bind(&data.password_hash)
            .bind(self.id)
            .execute(mm.executor())
            .await;

        if let Err(e) = result {
            let e = DatabaseError::from(e);
            return Err(if e.is_unique_violation() {
                DatabaseError::conflict("e-mail already registered")
            } else {
                e
            });
        }

        self.email = email;
        self.name = data.name;
        self.password_hash = data.password_hash;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: uuid::Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_one(mm.executor())
            .await;
        if let Err(sqlx::Error::RowNotFound) = result {
            return Ok(None);
        }

        Ok(Some(result?))
    }

    async fn list(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM users ORDER BY created_at LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(UserEntity, UserEntityCreateUpdate, Uuid);

#[async_trait]
impl HasOwner for UserEntity {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.id) // owners of users are themselves
    }
}

impl UserEntity {
    pub async fn find_by_email(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        email: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_one(mm.executor())
            .await;
        if let Err(sqlx::Error::RowNotFound) = result {
            return Ok(None);
        }
        Ok(Some(result?))
    }

    pub async fn set_role(
        mut self,
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        role: UserRole,
    ) -> DatabaseResult<Self> {
        if !actor.is_admin() {
            return Err(DatabaseError::forbidden("only administrators can change roles"));
        }

        sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(role.to_string())
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.role = role.to_string();
        Ok(self)
    }

    /// Creates the bootstrap administrator unless the e-mail is already taken.
    pub async fn ensure_admin(
        mm: &ModelManager,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> DatabaseResult<()> {
        let inserted = sqlx::query(
            "INSERT INTO users (id, email, name, password_hash, role) VALUES ($1,$2,$3,$4,$5) ON CONFLICT (email) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(email.to_lowercase())
        .bind(name)
        .bind(password_hash)
        .bind(UserRole::Admin.to_string())
        .execute(mm.executor())
        .await?;

        if inserted.rows_affected() > 0 {
            tracing::info!("bootstrap administrator {} created", email);
        }
        Ok(())
    }
}
