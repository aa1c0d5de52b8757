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

use super::{Course, Enrollment, quiz::ensure_in_course};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Assignment {
    id: Uuid,
    course_id: Uuid,
    module_id: Option<Uuid>,
    title: String,
    description: String,
    instructions: String,
    due_date: DateTime<Utc>,
    max_points: i32,
    published: bool,
    created_at: DateTime<Utc>,
}

impl ResourceTyped for Assignment {
    fn get_resource_type() -> ResourceType {
        ResourceType::Assignment
    }
}

impl Assignment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    pub fn max_points(&self) -> i32 {
        self.max_points
    }

    pub fn published(&self) -> bool {
        self.published
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AssignmentCreate {
    pub course_id: Uuid,
    pub module_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instructions: String,
    pub due_date: DateTime<Utc>,
    pub max_points: Option<i32>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct AssignmentSubmission {
    id: Uuid,
    assignment_id: Uuid,
    user_id: Uuid,
    file_url: Option<String>,
    submission_text: Option<String>,
    submitted_at: DateTime<Utc>,
    grade: Option<f64>,
    feedback: Option<String>,
    graded: bool,
    graded_at: Option<DateTime<Utc>>,
}

impl ResourceTyped for AssignmentSubmission {
    fn get_resource_type() -> ResourceType {
        ResourceType::AssignmentSubmission
    }
}

impl AssignmentSubmission {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn assignment_id(&self) -> Uuid {
        self.assignment_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn file_url(&self) -> Option<&str> {
        self.file_url.as_deref()
    }

    pub fn submission_text(&self) -> Option<&str> {
        self.submission_text.as_deref()
    }

    pub fn awarded_grade(&self) -> Option<f64> {
        self.grade
    }

    pub fn graded(&self) -> bool {
        self.graded
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmissionGrade {
    pub grade: f64,
    pub feedback: Option<String>,
}

/// Who gets told about a grade.
#[derive(Debug, FromRow)]
pub struct GradeRecipient {
    pub email: String,
    pub name: String,
    pub assignment_title: String,
    pub max_points: i32,
}

pub fn validate_grade(grade: f64, max_points: i32) -> DatabaseResult<()> {
    if !grade.is_finite() || grade < 0.0 || grade > f64::from(max_points) {
        return Err(DatabaseError::validation(format!(
            "grade must be between 0 and {max_points}"
        )));
    }
    Ok(())
}

impl Assignment {
    pub async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: AssignmentCreate,
    ) -> DatabaseResult<Self> {
        Course::find_authored(mm, actor, data.course_id).await?;
        if data.title.trim().is_empty() {
            return Err(DatabaseError::validation("title is required"));
        }
        if data.max_points.is_some_and(|p| p <= 0) {
            return Err(DatabaseError::validation("max_points must be positive"));
        }
        if let Some(module_id) = data.module_id {
            let mut conn = mm.executor().acquire().await?;
            ensure_in_course(
                &mut conn,
                "SELECT EXISTS (SELECT 1 FROM modules WHERE id = $1 AND course_id = $2)",
                module_id,
                data.course_id,
            )
            .await?;
        }

        let result = sqlx::query_as(
            r#"
            INSERT INTO assignments
                (id, course_id, module_id, title, description, instructions, due_date, max_points, published)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.course_id)
        .bind(data.module_id)
        .bind(data.title.trim())
        .bind(&data.description)
        .bind(&data.instructions)
        .bind(data.due_date)
        .bind(data.max_points.unwrap_or(100))
        .bind(data.published)
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    pub async fn find(mm: &ModelManager, id: Uuid) -> DatabaseResult<Self> {
        let result = sqlx::query_as("SELECT * FROM assignments WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        result.ok_or(DatabaseError::NotFound)
    }

    async fn ensure_author(&self, mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<()> {
        Course::find_authored(mm, actor, self.course_id).await?;
        Ok(())
    }
}

impl AssignmentSubmission {
    /// Everything `submit` checks short of the insert itself. Lets the caller
    /// reject early, before storing an uploaded file.
    pub async fn check_can_submit(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        assignment_id: Uuid,
    ) -> DatabaseResult<Assignment> {
        let assignment = Assignment::find(mm, assignment_id).await?;
        if !assignment.published {
            return Err(DatabaseError::forbidden("assignment is not published"));
        }
        Enrollment::find_active(mm, actor.user_id(), assignment.course_id).await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM assignment_submissions WHERE assignment_id = $1 AND user_id = $2)",
        )
        .bind(assignment_id)
        .bind(actor.user_id())
        .fetch_one(mm.executor())
        .await?;
        if exists {
            return Err(DatabaseError::conflict("assignment already submitted"));
        }

        Ok(assignment)
    }

    /// One submission per (assignment, user); a second one is a conflict.
    pub async fn submit(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        assignment_id: Uuid,
        file_url: Option<String>,
        submission_text: Option<String>,
    ) -> DatabaseResult<Self> {
        let submission_text = submission_text.filter(|t| !t.trim().is_empty());
        if file_url.is_none() && submission_text.is_none() {
            return Err(DatabaseError::validation("a file or a text submission is required"));
        }

        Self::check_can_submit(mm, actor, assignment_id).await?;

        let result = sqlx::query_as(
            r#"
            INSERT INTO assignment_submissions (id, assignment_id, user_id, file_url, submission_text)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(assignment_id)
        .bind(actor.user_id())
        .bind(&file_url)
        .bind(&submission_text)
        .fetch_one(mm.executor())
        .await;

        match result {
            Ok(submission) => {
                tracing::info!("user {} submitted assignment {}", actor.user_id(), assignment_id);
                Ok(submission)
            }
            Err(e) => {
                let e = DatabaseError::from(e);
                if e.is_unique_violation() {
                    Err(DatabaseError::conflict("assignment already submitted"))
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Grades (or re-grades) a submission. Only the course's instructor or an admin.
    pub async fn grade(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        submission_id: Uuid,
        data: SubmissionGrade,
    ) -> DatabaseResult<(Self, GradeRecipient)> {
        let submission: AssignmentSubmission =
            sqlx::query_as("SELECT * FROM assignment_submissions WHERE id = $1")
                .bind(submission_id)
                .fetch_optional(mm.executor())
                .await?
                .ok_or(DatabaseError::NotFound)?;

        let assignment = Assignment::find(mm, submission.assignment_id).await?;
        assignment.ensure_author(mm, actor).await?;
        validate_grade(data.grade, assignment.max_points)?;

        let submission: AssignmentSubmission = sqlx::query_as(
            r#"
            UPDATE assignment_submissions
               SET grade = $1, feedback = $2, graded = TRUE, graded_at = now()
             WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(data.grade)
        .bind(&data.feedback)
        .bind(submission.id)
        .fetch_one(mm.executor())
        .await?;

        let recipient: GradeRecipient = sqlx::query_as(
            r#"
            SELECT u.email, u.name, a.title AS assignment_title, a.max_points
            FROM assignment_submissions s
            JOIN users u ON u.id = s.user_id
            JOIN assignments a ON a.id = s.assignment_id
            WHERE s.id = $1
            "#,
        )
        .bind(submission.id)
        .fetch_one(mm.executor())
        .await?;

        tracing::info!(
            "submission {} graded {}/{}",
            submission.id,
            data.grade,
            assignment.max_points
        );
        Ok((submission, recipient))
    }

    pub async fn list_own(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        assignment_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM assignment_submissions WHERE assignment_id = $1 AND user_id = $2",
        )
        .bind(assignment_id)
        .bind(actor.user_id())
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn list_all(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        assignment_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let assignment = Assignment::find(mm, assignment_id).await?;
        assignment.ensure_author(mm, actor).await?;

        let result = sqlx::query_as(
            "SELECT * FROM assignment_submissions WHERE assignment_id = $1 ORDER BY submitted_at",
        )
        .bind(assignment_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn grade_must_fit_max_points() {
        assert!(validate_grade(85.0, 100).is_ok());
        assert!(validate_grade(0.0, 100).is_ok());
        assert!(validate_grade(100.0, 100).is_ok());
        assert!(matches!(validate_grade(150.0, 100), Err(DatabaseError::Validation(_))));
        assert!(matches!(validate_grade(-1.0, 100), Err(DatabaseError::Validation(_))));
        assert!(validate_grade(f64::NAN, 100).is_err());
    }

    #[test]
    fn awarded_grade_reads_stored_grade() {
        let submission = AssignmentSubmission {
            id: Uuid::new_v4(),
            assignment_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            file_url: None,
            submission_text: Some(String::from("essay")),
            submitted_at: Utc::now(),
            grade: Some(85.0),
            feedback: None,
            graded: true,
            graded_at: Some(Utc::now()),
        };
        assert_eq!(submission.awarded_grade(), Some(85.0));
        assert!(submission.graded());
    }
}
