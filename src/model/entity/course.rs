use crate::impl_paginatable_for;
use crate::model::access::{HasOwner, check_access};
use crate::model::repo::ResourceTyped;
use crate::model::{
    ModelManager,
    error::{DatabaseError, DatabaseResult},
    repo::CrudRepository,
};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Course {
    id: Uuid,
    instructor_id: Uuid,
    title: String,
    description: String,
    price: f64,
    level: String,
    published: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CourseCreate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Option<f64>,
    pub level: Option<String>,
    pub published: Option<bool>,
}

impl ResourceTyped for Course {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Course
    }
}

impl Course {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn instructor_id(&self) -> Uuid {
        self.instructor_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn published(&self) -> bool {
        self.published
    }

    pub fn is_free(&self) -> bool {
        self.price <= 0.0
    }
}

fn validate(data: &CourseCreate) -> DatabaseResult<()> {
    if data.title.trim().is_empty() {
        return Err(DatabaseError::validation("title is required"));
    }
    if data.price.is_some_and(|p| p < 0.0 || !p.is_finite()) {
        return Err(DatabaseError::validation("price must be a non-negative number"));
    }
    Ok(())
}

#[async_trait]
impl CrudRepository<Course, CourseCreate, uuid::Uuid> for Course {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: CourseCreate,
    ) -> DatabaseResult<Self> {
        if !actor.user_role().can_author() {
            return Err(DatabaseError::forbidden("only instructors can create courses"));
        }
        validate(&data)?;

        let result = sqlx::query_as(
            "INSERT INTO courses (id, instructor_id, title, description, price, level, published) VALUES ($1,$2,$3,$4,$5,$6,$7) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(data.title.trim())
        .bind(&data.description)
        .bind(data.price.unwrap_or(0.0))
        .bind(data.level.as_deref().unwrap_or("beginner"))
        .bind(data.published.unwrap_or(false))
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: CourseCreate,
    ) -> DatabaseResult<Self> {
        check_access(mm, actor, &self, actor.user_id()).await?;
        validate(&data)?;

        self.title = data.title.trim().to_string();
        self.description = data.description;
        self.price = data.price.unwrap_or(self.price);
        self.level = data.level.unwrap_or(self.level);
        self.published = data.published.unwrap_or(self.published);

        sqlx::query(
            "UPDATE courses SET title = $1, description = $2, price = $3, level = $4, published = $5 WHERE id = $6",
        )
        .bind(&self.title)
        .bind(&self.description)
        .bind(self.price)
        .bind(&self.level)
        .bind(self.published)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<()> {
        check_access(mm, actor, &self, actor.user_id()).await?;
        sqlx::query("DELETE FROM courses WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_one(mm.executor())
            .await;
        if let Err(sqlx::Error::RowNotFound) = result {
            return Ok(None);
        }

        Ok(Some(result?))
    }

    /// Published courses, plus the caller's own drafts. Admins see everything.
    async fn list(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM courses WHERE published OR instructor_id = $1 OR $2 ORDER BY created_at DESC LIMIT $3 OFFSET $4",
        )
        .bind(actor.user_id())
        .bind(actor.is_admin())
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM courses WHERE published OR instructor_id = $1 OR $2",
        )
        .bind(actor.user_id())
        .bind(actor.is_admin())
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Course, CourseCreate, Uuid);

#[async_trait]
impl HasOwner for Course {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.instructor_id)
    }
}

// Utils

impl Course {
    /// Loads a course the caller is allowed to author (its instructor, or an admin).
    pub async fn find_authored(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Self> {
        let course = Self::find_by_id(mm, actor, id)
            .await?
            .ok_or(DatabaseError::NotFound)?;
        check_access(mm, actor, &course, actor.user_id()).await?;
        Ok(course)
    }
}
