//! Quiz attempt lifecycle: start, answer, complete.
//!
//! An attempt is in progress until `complete` flips `completed`; after that its
//! answers and score are frozen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::{
    model::{
        ModelManager, ResourceType,
        error::{DatabaseError, DatabaseResult},
        repo::ResourceTyped,
        scoring::{check_answer, is_passed, points_earned, score_percentage},
    },
    web::AuthenticatedUser,
};

use super::{Enrollment, Quiz, QuizQuestion, QuizView};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuizAttempt {
    id: Uuid,
    user_id: Uuid,
    quiz_id: Uuid,
    /// Snapshot of the question points when the attempt started.
    total_points: f64,
    earned_points: f64,
    score: f64,
    passed: bool,
    completed: bool,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    /// Seconds.
    time_spent: i32,
}

impl ResourceTyped for QuizAttempt {
    fn get_resource_type() -> ResourceType {
        ResourceType::QuizAttempt
    }
}

impl QuizAttempt {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn quiz_id(&self) -> Uuid {
        self.quiz_id
    }

    pub fn total_points(&self) -> f64 {
        self.total_points
    }

    pub fn earned_points(&self) -> f64 {
        self.earned_points
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuizAnswer {
    id: Uuid,
    attempt_id: Uuid,
    question_id: Uuid,
    answer: String,
    is_correct: bool,
    points_earned: f64,
    updated_at: DateTime<Utc>,
}

impl ResourceTyped for QuizAnswer {
    fn get_resource_type() -> ResourceType {
        ResourceType::QuizAnswer
    }
}

impl QuizAnswer {
    pub fn question_id(&self) -> Uuid {
        self.question_id
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    pub fn points_earned(&self) -> f64 {
        self.points_earned
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QuizAnswerSubmit {
    pub question_id: Uuid,
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AttemptStart {
    pub attempt: QuizAttempt,
    pub quiz: QuizView,
}

impl QuizAttempt {
    /// Opens a new attempt. The enrollment row lock serializes concurrent starts
    /// so the attempt limit holds.
    pub async fn start(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        quiz_id: Uuid,
    ) -> DatabaseResult<AttemptStart> {
        let quiz = Quiz::find(mm, quiz_id).await?;
        if !quiz.published() {
            return Err(DatabaseError::forbidden("quiz is not published"));
        }

        let mut tx = mm.begin().await?;
        Enrollment::lock_active(&mut tx, actor.user_id(), quiz.course_id()).await?;

        if quiz.max_attempts() > 0 {
            let used: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM quiz_attempts WHERE user_id = $1 AND quiz_id = $2",
            )
            .bind(actor.user_id())
            .bind(quiz_id)
            .fetch_one(&mut *tx)
            .await?;

            if used >= i64::from(quiz.max_attempts()) {
                return Err(DatabaseError::conflict("maximum number of attempts reached"));
            }
        }

        let questions = Quiz::questions(&mut tx, quiz_id).await?;
        let total_points: f64 = questions.iter().map(|q| f64::from(q.points())).sum();

        let attempt: QuizAttempt = sqlx::query_as(
            "INSERT INTO quiz_attempts (id, user_id, quiz_id, total_points) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(quiz_id)
        .bind(total_points)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!("attempt {} started on quiz {}", attempt.id, quiz_id);
        Ok(AttemptStart {
            attempt,
            quiz: quiz.into_view(questions),
        })
    }

    /// Grades one answer and upserts it. Last write wins per (attempt, question).
    pub async fn submit_answer(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        attempt_id: Uuid,
        data: QuizAnswerSubmit,
    ) -> DatabaseResult<QuizAnswer> {
        if data.answer.trim().is_empty() {
            return Err(DatabaseError::validation("answer must not be empty"));
        }

        let mut tx = mm.begin().await?;

        // FOR SHARE lets answers run in parallel but waits for a concurrent complete
        let attempt = Self::lock_owned(&mut tx, actor, attempt_id, "FOR SHARE").await?;
        if attempt.completed {
            return Err(DatabaseError::forbidden("attempt already completed"));
        }

        let question: QuizQuestion = sqlx::query_as(
            "SELECT * FROM quiz_questions WHERE id = $1 AND quiz_id = $2",
        )
        .bind(data.question_id)
        .bind(attempt.quiz_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DatabaseError::NotFound)?;

        let is_correct = check_answer(
            &question.question_type(),
            question.correct_answer(),
            &data.answer,
        );

        let answer: QuizAnswer = sqlx::query_as(
            r#"
            INSERT INTO quiz_answers (id, attempt_id, question_id, answer, is_correct, points_earned)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (attempt_id, question_id) DO UPDATE SET
                answer = EXCLUDED.answer,
                is_correct = EXCLUDED.is_correct,
                points_earned = EXCLUDED.points_earned,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(attempt.id)
        .bind(question.id())
        .bind(data.answer.trim())
        .bind(is_correct)
        .bind(points_earned(is_correct, question.points()))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(answer)
    }

    /// Scores the attempt. Completing twice returns the stored result unchanged.
    pub async fn complete(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        attempt_id: Uuid,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.begin().await?;

        let attempt = Self::lock_owned(&mut tx, actor, attempt_id, "FOR UPDATE").await?;
        if attempt.completed {
            return Ok(attempt);
        }

        let earned: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(points_earned), 0)::DOUBLE PRECISION FROM quiz_answers WHERE attempt_id = $1",
        )
        .bind(attempt.id)
        .fetch_one(&mut *tx)
        .await?;

        let passing_score: i32 =
            sqlx::query_scalar("SELECT passing_score FROM quizzes WHERE id = $1")
                .bind(attempt.quiz_id)
                .fetch_one(&mut *tx)
                .await?;

        let score = score_percentage(earned, attempt.total_points);
        let passed = is_passed(score, passing_score);
        let completed_at = Utc::now();
        let time_spent = (completed_at - attempt.started_at).num_seconds().max(0);

        let attempt: QuizAttempt = sqlx::query_as(
            r#"
            UPDATE quiz_attempts
               SET earned_points = $1,
                   score = $2,
                   passed = $3,
                   completed = TRUE,
                   completed_at = $4,
                   time_spent = $5
             WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(earned)
        .bind(score)
        .bind(passed)
        .bind(completed_at)
        .bind(i32::try_from(time_spent).unwrap_or(i32::MAX))
        .bind(attempt.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "attempt {} completed: {:.2}% ({})",
            attempt.id,
            attempt.score,
            if attempt.passed { "passed" } else { "failed" }
        );
        Ok(attempt)
    }

    async fn lock_owned(
        conn: &mut PgConnection,
        actor: &AuthenticatedUser,
        attempt_id: Uuid,
        lock: &str,
    ) -> DatabaseResult<Self> {
        let attempt: QuizAttempt =
            sqlx::query_as(&format!("SELECT * FROM quiz_attempts WHERE id = $1 {lock}"))
                .bind(attempt_id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or(DatabaseError::NotFound)?;

        if attempt.user_id != actor.user_id() {
            return Err(DatabaseError::forbidden("attempt belongs to another user"));
        }
        Ok(attempt)
    }

    pub async fn answers(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        attempt_id: Uuid,
    ) -> DatabaseResult<Vec<QuizAnswer>> {
        let mut conn = mm.executor().acquire().await?;
        Self::lock_owned(&mut conn, actor, attempt_id, "").await?;

        let result = sqlx::query_as(
            "SELECT * FROM quiz_answers WHERE attempt_id = $1 ORDER BY updated_at",
        )
        .bind(attempt_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(result)
    }

    pub async fn list_own(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        quiz_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM quiz_attempts WHERE user_id = $1 AND quiz_id = $2 ORDER BY started_at DESC",
        )
        .bind(actor.user_id())
        .bind(quiz_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    /// Every attempt on the quiz. Course author or admin only.
    pub async fn list_all(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        quiz_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let quiz = Quiz::find(mm, quiz_id).await?;
        quiz.ensure_author(mm, actor).await?;

        let result = sqlx::query_as(
            "SELECT * FROM quiz_attempts WHERE quiz_id = $1 ORDER BY started_at DESC",
        )
        .bind(quiz_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }
}
