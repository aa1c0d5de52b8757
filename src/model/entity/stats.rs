use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::{
    model::{
        ModelManager,
        error::{DatabaseError, DatabaseResult},
    },
    web::AuthenticatedUser,
};

use super::Course;

/// How many rows the admin "recent" feeds return.
pub const RECENT_LIMIT: i64 = 20;

fn ensure_admin(actor: &AuthenticatedUser) -> DatabaseResult<()> {
    if !actor.is_admin() {
        return Err(DatabaseError::forbidden("administrators only"));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct PlatformStats {
    pub students: i64,
    pub instructors: i64,
    pub admins: i64,
    pub courses: i64,
    pub published_courses: i64,
    pub enrollments: i64,
    pub completed_enrollments: i64,
    pub certificates: i64,
    pub revenue: f64,
}

impl PlatformStats {
    pub async fn collect(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<Self> {
        ensure_admin(actor)?;

        let stats = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE role = 'student') AS students,
                (SELECT COUNT(*) FROM users WHERE role = 'instructor') AS instructors,
                (SELECT COUNT(*) FROM users WHERE role = 'admin') AS admins,
                (SELECT COUNT(*) FROM courses) AS courses,
                (SELECT COUNT(*) FROM courses WHERE published) AS published_courses,
                (SELECT COUNT(*) FROM enrollments) AS enrollments,
                (SELECT COUNT(*) FROM enrollments WHERE completed_at IS NOT NULL) AS completed_enrollments,
                (SELECT COUNT(*) FROM certificates) AS certificates,
                (SELECT COALESCE(SUM(amount), 0)::DOUBLE PRECISION FROM payments WHERE status = 'success') AS revenue
            "#,
        )
        .fetch_one(mm.executor())
        .await?;

        Ok(stats)
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct CourseAnalytics {
    pub course_id: Uuid,
    pub total_enrollments: i64,
    pub completed_enrollments: i64,
    /// Percentage of enrollments that reached completion.
    pub completion_rate: f64,
    pub total_revenue: f64,
    pub average_rating: f64,
    pub total_reviews: i64,
}

pub fn completion_rate(completed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    completed as f64 / total as f64 * 100.0
}

impl CourseAnalytics {
    /// Admins, or the instructor of the course.
    pub async fn collect(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Self> {
        Course::find_authored(mm, actor, course_id).await?;

        let mut analytics: CourseAnalytics = sqlx::query_as(
            r#"
            SELECT
                $1::UUID AS course_id,
                (SELECT COUNT(*) FROM enrollments WHERE course_id = $1) AS total_enrollments,
                (SELECT COUNT(*) FROM enrollments
                  WHERE course_id = $1 AND completed_at IS NOT NULL) AS completed_enrollments,
                0::DOUBLE PRECISION AS completion_rate,
                (SELECT COALESCE(SUM(amount), 0)::DOUBLE PRECISION
                   FROM payments WHERE course_id = $1 AND status = 'success') AS total_revenue,
                (SELECT COALESCE(AVG(rating), 0)::DOUBLE PRECISION
                   FROM course_reviews WHERE course_id = $1) AS average_rating,
                (SELECT COUNT(*) FROM course_reviews WHERE course_id = $1) AS total_reviews
            "#,
        )
        .bind(course_id)
        .fetch_one(mm.executor())
        .await?;

        analytics.completion_rate =
            completion_rate(analytics.completed_enrollments, analytics.total_enrollments);
        Ok(analytics)
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct RecentPayment {
    pub id: Uuid,
    pub tx_ref: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub course_id: Uuid,
    pub course_title: String,
}

impl RecentPayment {
    pub async fn list(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<Vec<Self>> {
        ensure_admin(actor)?;

        let result = sqlx::query_as(
            r#"
            SELECT p.id, p.tx_ref, p.amount, p.currency, p.status, p.created_at,
                   u.id AS user_id, u.name AS user_name, u.email AS user_email,
                   c.id AS course_id, c.title AS course_title
            FROM payments p
            JOIN users u ON u.id = p.user_id
            JOIN courses c ON c.id = p.course_id
            ORDER BY p.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(RECENT_LIMIT)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct RecentEnrollment {
    pub id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    pub progress: f64,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub course_id: Uuid,
    pub course_title: String,
    pub instructor_name: String,
}

impl RecentEnrollment {
    pub async fn list(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<Vec<Self>> {
        ensure_admin(actor)?;

        let result = sqlx::query_as(
            r#"
            SELECT e.id, e.enrolled_at, e.progress,
                   u.id AS user_id, u.name AS user_name, u.email AS user_email,
                   c.id AS course_id, c.title AS course_title,
                   i.name AS instructor_name
            FROM enrollments e
            JOIN users u ON u.id = e.user_id
            JOIN courses c ON c.id = e.course_id
            JOIN users i ON i.id = c.instructor_id
            ORDER BY e.enrolled_at DESC
            LIMIT $1
            "#,
        )
        .bind(RECENT_LIMIT)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn completion_rate_handles_empty_courses() {
        assert_eq!(completion_rate(0, 0), 0.0);
        assert_eq!(completion_rate(1, 4), 25.0);
        assert_eq!(completion_rate(3, 3), 100.0);
    }
}
