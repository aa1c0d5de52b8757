use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::{
    model::{
        ModelManager, ResourceType,
        error::{DatabaseError, DatabaseResult},
        repo::{CrudRepository, ResourceTyped},
    },
    web::AuthenticatedUser,
};

use super::{Course, Enrollment};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct CourseReview {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    rating: i32,
    comment: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ResourceTyped for CourseReview {
    fn get_resource_type() -> ResourceType {
        ResourceType::Review
    }
}

impl CourseReview {
    pub fn rating(&self) -> i32 {
        self.rating
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ReviewSubmit {
    /// 1 to 5.
    pub rating: i32,
    #[serde(default)]
    pub comment: String,
}

/// A review as listed on the course page.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct ReviewWithAuthor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reviewer_name: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

fn validate_rating(rating: i32) -> DatabaseResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(DatabaseError::validation("rating must be between 1 and 5"));
    }
    Ok(())
}

impl CourseReview {
    /// Enrolled students only. One review per (user, course); submitting
    /// again replaces the earlier rating and comment.
    pub async fn submit(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
        data: ReviewSubmit,
    ) -> DatabaseResult<Self> {
        validate_rating(data.rating)?;
        Course::find_by_id(mm, actor, course_id)
            .await?
            .ok_or(DatabaseError::NotFound)?;
        Enrollment::find_active(mm, actor.user_id(), course_id).await?;

        let review: CourseReview = sqlx::query_as(
            r#"
            INSERT INTO course_reviews (id, user_id, course_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, course_id) DO UPDATE SET
                rating = EXCLUDED.rating,
                comment = EXCLUDED.comment,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(course_id)
        .bind(data.rating)
        .bind(data.comment.trim())
        .fetch_one(mm.executor())
        .await?;

        tracing::info!(
            "user {} rated course {} with {}",
            actor.user_id(),
            course_id,
            review.rating()
        );
        Ok(review)
    }

    pub async fn list_for_course(
        mm: &ModelManager,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<ReviewWithAuthor>> {
        let result = sqlx::query_as(
            r#"
            SELECT r.id, r.user_id, u.name AS reviewer_name, r.rating, r.comment, r.created_at
            FROM course_reviews r
            JOIN users u ON u.id = r.user_id
            WHERE r.course_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rating_is_one_to_five() {
        for ok in 1..=5 {
            assert!(validate_rating(ok).is_ok());
        }
        assert!(matches!(validate_rating(0), Err(DatabaseError::Validation(_))));
        assert!(matches!(validate_rating(6), Err(DatabaseError::Validation(_))));
    }
}
