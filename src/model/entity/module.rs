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
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use super::Course;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Module {
    id: uuid::Uuid,
    course_id: uuid::Uuid,
    title: String,
    description: String,
    order_index: i32,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ModuleCreate {
    pub course_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order_index: Option<i32>,
}

impl ResourceTyped for Module {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Module
    }
}

impl Module {
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn course_id(&self) -> uuid::Uuid {
        self.course_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }
}

#[async_trait]
impl CrudRepository<Module, ModuleCreate, uuid::Uuid> for Module {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: ModuleCreate,
    ) -> DatabaseResult<Self> {
        Course::find_authored(mm, actor, data.course_id).await?;
        if data.title.trim().is_empty() {
            return Err(DatabaseError::validation("title is required"));
        }

        let result = sqlx::query_as(
            "INSERT INTO modules (id, course_id, title, description, order_index) VALUES ($1,$2,$3,$4,$5) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.course_id)
        .bind(data.title.trim())
        .bind(&data.description)
        .bind(data.order_index.unwrap_or(0))
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: ModuleCreate,
    ) -> DatabaseResult<Self> {
        check_access(mm, actor, &self, actor.user_id()).await?;

        sqlx::query(
            "UPDATE modules SET title = $1, description = $2, order_index = $3 WHERE id = $4",
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.order_index.unwrap_or(self.order_index))
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.title = data.title;
        self.description = data.description;
        self.order_index = data.order_index.unwrap_or(self.order_index);
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<()> {
        check_access(mm, actor, &self, actor.user_id()).await?;
        sqlx::query("DELETE FROM modules WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM modules WHERE id = $1")
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
            "SELECT * FROM modules ORDER BY course_id, order_index LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM modules")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Module, ModuleCreate, Uuid);

#[async_trait]
impl HasOwner for Module {
    type OwnerId = uuid::Uuid;

    /// Modules belong to whoever teaches the course.
    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let owner: Uuid = sqlx::query_scalar("SELECT instructor_id FROM courses WHERE id = $1")
            .bind(self.course_id)
            .fetch_one(mm.executor())
            .await?;
        Ok(owner)
    }
}

// Utils

#[derive(sqlx::FromRow)]
pub struct ModuleWithLessonsRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub order_index: i32,
    pub lessons: serde_json::Value,
}

impl ModuleWithLessonsRow {
    /// Modules of a course, each with its ordered lessons and the caller's completion flag.
    pub async fn fetch_by_course(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows: Vec<ModuleWithLessonsRow> = sqlx::query_as(
            r#"
            SELECT
            m.id,
            m.title,
            m.description,
            m.order_index,
            COALESCE(
                json_agg(
                    json_build_object(
                        'id', l.id,
                        'title', l.title,
                        'duration', l.duration,
                        'order_index', l.order_index,
                        'completed', COALESCE(lp.completed, false)
                    ) ORDER BY l.order_index
                ) FILTER (WHERE l.id IS NOT NULL),
                '[]'
            ) AS lessons
            FROM modules m
            LEFT JOIN lessons l ON l.module_id = m.id
            LEFT JOIN lesson_progress lp
            ON lp.lesson_id = l.id
            AND lp.user_id = $1
            WHERE m.course_id = $2
            GROUP BY m.id
            ORDER BY m.order_index;
        "#,
        )
        .bind(actor.user_id())
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;

        Ok(rows)
    }
}
