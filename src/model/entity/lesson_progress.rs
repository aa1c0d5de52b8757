use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::{
    model::{
        ModelManager, ResourceType,
        error::{DatabaseError, DatabaseResult},
        repo::ResourceTyped,
    },
    web::AuthenticatedUser,
};

use super::{AggregateUpdate, Enrollment, LessonLocation};

/// Upper bound for a single progress event, one day of study.
pub const MAX_TIME_DELTA_MINUTES: i32 = 24 * 60;

fn validate_time_delta(minutes: i32) -> DatabaseResult<()> {
    if !(0..=MAX_TIME_DELTA_MINUTES).contains(&minutes) {
        return Err(DatabaseError::validation(format!(
            "time_spent must be between 0 and {MAX_TIME_DELTA_MINUTES} minutes"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct LessonProgress {
    id: Uuid,
    user_id: Uuid,
    lesson_id: Uuid,
    course_id: Uuid,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    /// Minutes, cumulative.
    time_spent: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ResourceTyped for LessonProgress {
    fn get_resource_type() -> ResourceType {
        ResourceType::LessonProgress
    }
}

impl LessonProgress {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn lesson_id(&self) -> Uuid {
        self.lesson_id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn time_spent(&self) -> i64 {
        self.time_spent
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct LessonProgressUpdate {
    pub lesson_id: Uuid,
    /// When given, must be the lesson's course.
    pub course_id: Option<Uuid>,
    /// Minutes to add to the stored total.
    #[serde(default)]
    pub time_spent: i32,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug)]
pub struct ProgressUpdate {
    pub progress: LessonProgress,
    pub enrollment: Enrollment,
    pub course_completed: bool,
}

impl LessonProgress {
    /// Records a progress event for one lesson and refreshes the enrollment aggregate.
    ///
    /// Time spent is always added. `completed` only ever moves from false to true,
    /// and `completed_at` is stamped on that transition alone. Both rows are
    /// written in one transaction.
    pub async fn record(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: LessonProgressUpdate,
    ) -> DatabaseResult<ProgressUpdate> {
        validate_time_delta(data.time_spent)?;

        let mut tx = mm.begin().await?;

        let location = LessonLocation::find(&mut tx, data.lesson_id).await?;
        if data.course_id.is_some_and(|c| c != location.course_id) {
            return Err(DatabaseError::NotFound);
        }
        let enrollment =
            Enrollment::lock_active(&mut tx, actor.user_id(), location.course_id).await?;

        let progress: LessonProgress = sqlx::query_as(
            r#"
            INSERT INTO lesson_progress
                (id, user_id, lesson_id, course_id, completed, completed_at, time_spent)
            VALUES ($1, $2, $3, $4, $5, CASE WHEN $5 THEN now() END, $6)
            ON CONFLICT (user_id, lesson_id) DO UPDATE SET
                completed = lesson_progress.completed OR EXCLUDED.completed,
                completed_at = COALESCE(lesson_progress.completed_at, EXCLUDED.completed_at),
                time_spent = lesson_progress.time_spent + EXCLUDED.time_spent,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(location.lesson_id)
        .bind(location.course_id)
        .bind(data.completed)
        .bind(i64::from(data.time_spent))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE enrollments SET current_module_id = $1, current_lesson_id = $2 WHERE id = $3",
        )
        .bind(location.module_id)
        .bind(location.lesson_id)
        .bind(enrollment.id())
        .execute(&mut *tx)
        .await?;

        let AggregateUpdate {
            enrollment,
            first_completion,
        } = Enrollment::recompute_aggregate(&mut tx, actor.user_id(), location.course_id).await?;

        tx.commit().await?;

        tracing::debug!(
            "progress recorded: user {} lesson {} course at {:.2}%",
            actor.user_id(),
            location.lesson_id,
            enrollment.progress()
        );

        Ok(ProgressUpdate {
            progress,
            enrollment,
            course_completed: first_completion,
        })
    }

    pub async fn recent_for_user(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        limit: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM lesson_progress WHERE user_id = $1 ORDER BY updated_at DESC LIMIT $2",
        )
        .bind(actor.user_id())
        .bind(limit)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}
