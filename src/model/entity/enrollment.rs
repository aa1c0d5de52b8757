//! Enrollment ledger.
//!
//! One row per (user, course). Its aggregate columns are only ever written by
//! [`Enrollment::recompute_aggregate`], which derives them from lesson progress rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::{
    model::{
        ModelManager, ResourceType,
        error::{DatabaseError, DatabaseResult},
        repo::{CrudRepository, ResourceTyped},
        scoring::{completion_percentage, is_course_complete},
    },
    web::AuthenticatedUser,
};

use super::{Course, LessonProgress};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Enrollment {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    payment_id: Option<Uuid>,
    is_active: bool,
    progress: f64,
    total_lessons: i32,
    completed_lessons: i32,
    /// Minutes.
    time_spent: i64,
    current_module_id: Option<Uuid>,
    current_lesson_id: Option<Uuid>,
    certificate_id: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    certificate_issued_at: Option<DateTime<Utc>>,
    enrolled_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl ResourceTyped for Enrollment {
    fn get_resource_type() -> ResourceType {
        ResourceType::Enrollment
    }
}

impl Enrollment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn payment_id(&self) -> Option<Uuid> {
        self.payment_id
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn total_lessons(&self) -> i32 {
        self.total_lessons
    }

    pub fn completed_lessons(&self) -> i32 {
        self.completed_lessons
    }

    pub fn time_spent(&self) -> i64 {
        self.time_spent
    }

    pub fn current_lesson_id(&self) -> Option<Uuid> {
        self.current_lesson_id
    }

    pub fn certificate_id(&self) -> Option<&str> {
        self.certificate_id.as_deref()
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }
}

/// Counts a user's lesson progress against the course's current lesson set.
#[derive(Debug, Clone, Copy, PartialEq, FromRow)]
pub struct Aggregate {
    pub total: i64,
    pub completed: i64,
    pub time_spent: i64,
}

impl Aggregate {
    pub async fn load(
        conn: &mut PgConnection,
        user_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<Self> {
        let mut aggregate: Aggregate = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*)
                   FROM lessons l
                   JOIN modules m ON m.id = l.module_id
                  WHERE m.course_id = $2) AS total,
                (SELECT COUNT(*)
                   FROM lesson_progress
                  WHERE user_id = $1 AND course_id = $2 AND completed) AS completed,
                (SELECT COALESCE(SUM(time_spent), 0)::BIGINT
                   FROM lesson_progress
                  WHERE user_id = $1 AND course_id = $2) AS time_spent
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&mut *conn)
        .await?;

        // keeps completed_lessons <= total_lessons when the course lost lessons
        aggregate.completed = aggregate.completed.min(aggregate.total);
        Ok(aggregate)
    }

    pub fn progress(&self) -> f64 {
        completion_percentage(self.completed, self.total)
    }
}

/// Result of a recompute; `first_completion` is true only for the write that
/// stamped `completed_at`.
#[derive(Debug)]
pub struct AggregateUpdate {
    pub enrollment: Enrollment,
    pub first_completion: bool,
}

impl Enrollment {
    /// Loads and row-locks the caller's active enrollment for the rest of the transaction.
    pub async fn lock_active(
        conn: &mut PgConnection,
        user_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<Self> {
        let result: Option<Self> = sqlx::query_as(
            "SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&mut *conn)
        .await?;

        match result {
            Some(enrollment) if enrollment.is_active => Ok(enrollment),
            _ => Err(DatabaseError::forbidden("not enrolled in this course")),
        }
    }

    pub async fn find_active(
        mm: &ModelManager,
        user_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<Self> {
        let result: Option<Self> = sqlx::query_as(
            "SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(mm.executor())
        .await?;

        match result {
            Some(enrollment) if enrollment.is_active => Ok(enrollment),
            _ => Err(DatabaseError::forbidden("not enrolled in this course")),
        }
    }

    pub async fn find_for(
        conn: &mut PgConnection,
        user_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(result)
    }

    /// Inserts a fresh enrollment with the lesson count snapshotted.
    pub async fn create_in(
        conn: &mut PgConnection,
        user_id: Uuid,
        course_id: Uuid,
        payment_id: Option<Uuid>,
    ) -> DatabaseResult<Self> {
        let aggregate = Aggregate::load(conn, user_id, course_id).await?;

        let result = sqlx::query_as(
            r#"
            INSERT INTO enrollments (id, user_id, course_id, payment_id, total_lessons)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(course_id)
        .bind(payment_id)
        .bind(to_i32(aggregate.total))
        .fetch_one(&mut *conn)
        .await;

        match result {
            Ok(enrollment) => Ok(enrollment),
            Err(e) => {
                let e = DatabaseError::from(e);
                if e.is_unique_violation() {
                    Err(DatabaseError::conflict("already enrolled in this course"))
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Free enrollment. Paid courses go through [`super::Payment`].
    pub async fn enroll(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Self> {
        let course = Course::find_by_id(mm, actor, course_id)
            .await?
            .ok_or(DatabaseError::NotFound)?;
        if !course.published() {
            return Err(DatabaseError::forbidden("course is not published"));
        }
        if !course.is_free() {
            return Err(DatabaseError::validation("course requires payment"));
        }

        let mut tx = mm.begin().await?;
        let enrollment = Self::create_in(&mut tx, actor.user_id(), course_id, None).await?;
        tx.commit().await?;

        tracing::info!("user {} enrolled in course {}", actor.user_id(), course_id);
        Ok(enrollment)
    }

    /// Rewrites the aggregate columns from persisted lesson progress.
    ///
    /// Must run on the connection that holds the enrollment row lock. Re-running
    /// it without intervening writes leaves the aggregate unchanged and never
    /// moves `completed_at` once set.
    pub async fn recompute_aggregate(
        conn: &mut PgConnection,
        user_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<AggregateUpdate> {
        let before = Self::lock_active(conn, user_id, course_id).await?;
        let aggregate = Aggregate::load(conn, user_id, course_id).await?;
        let progress = aggregate.progress();

        let enrollment: Enrollment = sqlx::query_as(
            r#"
            UPDATE enrollments
               SET total_lessons = $1,
                   completed_lessons = $2,
                   time_spent = $3,
                   progress = $4,
                   last_activity_at = now(),
                   completed_at = CASE
                       WHEN completed_at IS NULL AND $5 THEN now()
                       ELSE completed_at
                   END
             WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(to_i32(aggregate.total))
        .bind(to_i32(aggregate.completed))
        .bind(aggregate.time_spent)
        .bind(progress)
        .bind(is_course_complete(progress))
        .bind(before.id)
        .fetch_one(&mut *conn)
        .await?;

        let first_completion = before.completed_at.is_none() && enrollment.completed_at.is_some();
        if first_completion {
            tracing::info!("user {} completed course {}", user_id, course_id);
        }

        Ok(AggregateUpdate {
            enrollment,
            first_completion,
        })
    }

    pub async fn list_for_user(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM enrollments WHERE user_id = $1 ORDER BY last_activity_at DESC",
        )
        .bind(actor.user_id())
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}

fn to_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

// Read models

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProgressBreakdown {
    pub percentage: f64,
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub remaining_lessons: i64,
    pub time_spent_minutes: i64,
    pub time_spent_hours: f64,
}

impl From<Aggregate> for ProgressBreakdown {
    fn from(a: Aggregate) -> Self {
        Self {
            percentage: a.progress(),
            completed_lessons: a.completed,
            total_lessons: a.total,
            remaining_lessons: a.total - a.completed,
            time_spent_minutes: a.time_spent,
            time_spent_hours: a.time_spent as f64 / 60.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CourseProgress {
    pub enrollment: Enrollment,
    pub breakdown: ProgressBreakdown,
}

impl CourseProgress {
    pub async fn load(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Self> {
        let enrollment = Enrollment::find_active(mm, actor.user_id(), course_id).await?;

        let mut conn = mm.executor().acquire().await?;
        let aggregate = Aggregate::load(&mut conn, actor.user_id(), course_id).await?;

        Ok(Self {
            enrollment,
            breakdown: aggregate.into(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct DashboardStats {
    pub total_enrollments: i64,
    pub completed_courses: i64,
    pub in_progress_courses: i64,
    pub total_minutes: i64,
    pub average_progress: f64,
    pub certificates: i64,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent_activity: Vec<LessonProgress>,
}

impl Dashboard {
    pub async fn for_user(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<Self> {
        let stats = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total_enrollments,
                COUNT(*) FILTER (WHERE completed_at IS NOT NULL) AS completed_courses,
                COUNT(*) FILTER (WHERE completed_at IS NULL AND progress > 0) AS in_progress_courses,
                COALESCE(SUM(time_spent), 0)::BIGINT AS total_minutes,
                COALESCE(AVG(progress), 0)::DOUBLE PRECISION AS average_progress,
                COUNT(certificate_id) AS certificates
            FROM enrollments
            WHERE user_id = $1 AND is_active
            "#,
        )
        .bind(actor.user_id())
        .fetch_one(mm.executor())
        .await?;

        let recent_activity = LessonProgress::recent_for_user(mm, actor, 10).await?;

        Ok(Self {
            stats,
            recent_activity,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn breakdown_from_aggregate() {
        let breakdown = ProgressBreakdown::from(Aggregate {
            total: 4,
            completed: 1,
            time_spent: 90,
        });
        assert_eq!(breakdown.percentage, 25.0);
        assert_eq!(breakdown.remaining_lessons, 3);
        assert_eq!(breakdown.time_spent_hours, 1.5);
    }

    #[test]
    fn empty_course_has_zero_progress() {
        let a = Aggregate {
            total: 0,
            completed: 0,
            time_spent: 0,
        };
        assert_eq!(a.progress(), 0.0);
    }
}
