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
use sqlx::PgConnection;
use sqlx::prelude::FromRow;
use uuid::Uuid;

use super::{Course, Module};

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Lesson {
    id: Uuid,
    module_id: Uuid,
    title: String,
    content: String,
    /// Minutes.
    duration: i32,
    order_index: i32,
}

impl ResourceTyped for Lesson {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Lesson
    }
}

impl Lesson {
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn module_id(&self) -> uuid::Uuid {
        self.module_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn duration(&self) -> i32 {
        self.duration
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct LessonCreate {
    pub module_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub duration: Option<i32>,
    pub order_index: Option<i32>,
}

#[async_trait]
impl CrudRepository<Lesson, LessonCreate, uuid::Uuid> for Lesson {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: LessonCreate,
    ) -> DatabaseResult<Self> {
        let module = Module::find_by_id(mm, actor, data.module_id)
            .await?
            .ok_or(DatabaseError::NotFound)?;
        Course::find_authored(mm, actor, module.course_id()).await?;

        if data.title.trim().is_empty() {
            return Err(DatabaseError::validation("title is required"));
        }
        if data.duration.is_some_and(|d| d < 0) {
            return Err(DatabaseError::validation("duration must not be negative"));
        }

        let result = sqlx::query_as(
            "INSERT INTO lessons (id, module_id, title, content, duration, order_index) VALUES ($1,$2,$3,$4,$5,$6) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.module_id)
        .bind(data.title.trim())
        .bind(&data.content)
        .bind(data.duration.unwrap_or(0))
        .bind(data.order_index.unwrap_or(0))
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: LessonCreate,
    ) -> DatabaseResult<Self> {
        check_access(mm, actor, &self, actor.user_id()).await?;

        sqlx::query("UPDATE lessons SET title = $1, content = $2, duration = $3, order_index = $4 WHERE id = $5")
            .bind(&data.title)
            .bind(&data.content)
            .bind(data.duration.unwrap_or(self.duration))
            .bind(data.order_index.unwrap_or(self.order_index))
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.title = data.title;
        self.content = data.content;
        self.duration = data.duration.unwrap_or(self.duration);
        self.order_index = data.order_index.unwrap_or(self.order_index);
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<()> {
        check_access(mm, actor, &self, actor.user_id()).await?;
        sqlx::query("DELETE FROM lessons WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM lessons WHERE id = $1")
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
        let result = sqlx::query_as(
            "SELECT * FROM lessons ORDER BY module_id, order_index LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Lesson, LessonCreate, Uuid);

#[async_trait]
impl HasOwner for Lesson {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let owner: Uuid = sqlx::query_scalar(
            "SELECT c.instructor_id FROM modules m JOIN courses c ON c.id = m.course_id WHERE m.id = $1",
        )
        .bind(self.module_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(owner)
    }
}

// Utils

/// Where a lesson sits in the catalogue.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LessonLocation {
    pub lesson_id: Uuid,
    pub module_id: Uuid,
    pub course_id: Uuid,
}

impl LessonLocation {
    pub async fn find(conn: &mut PgConnection, lesson_id: Uuid) -> DatabaseResult<Self> {
        let result = sqlx::query_as(
            r#"
            SELECT l.id AS lesson_id, l.module_id, m.course_id
            FROM lessons l
            JOIN modules m ON m.id = l.module_id
            WHERE l.id = $1
            "#,
        )
        .bind(lesson_id)
        .fetch_optional(&mut *conn)
        .await?;

        result.ok_or(DatabaseError::NotFound)
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct LessonWithProgressRow {
    pub id: Uuid,
    pub module_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub content: String,
    pub duration: i32,
    pub order_index: i32,
    pub completed: bool,
    pub time_spent: i64,
    pub completed_at: Option<DateTime<Utc>>,
}

impl LessonWithProgressRow {
    pub async fn find_by_id(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        lesson_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as(
            r#"
            SELECT
                l.id,
                l.module_id,
                m.course_id,
                l.title,
                l.content,
                l.duration,
                l.order_index,
                COALESCE(lp.completed, false) AS completed,
                COALESCE(lp.time_spent, 0) AS time_spent,
                lp.completed_at
            FROM lessons l
            JOIN modules m ON m.id = l.module_id
            LEFT JOIN lesson_progress lp
                ON l.id = lp.lesson_id AND lp.user_id = $2
            WHERE l.id = $1
            "#,
        )
        .bind(lesson_id)
        .bind(actor.user_id())
        .fetch_optional(mm.executor())
        .await?;

        Ok(row)
    }
}
