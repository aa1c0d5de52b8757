use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    model::{
        ModelManager, ResourceType,
        access::check_access,
        error::{DatabaseError, DatabaseResult},
        repo::{CrudRepository, ResourceTyped},
        scoring::QuestionType,
    },
    web::AuthenticatedUser,
};

use super::{Course, Enrollment};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Quiz {
    id: Uuid,
    course_id: Uuid,
    module_id: Option<Uuid>,
    lesson_id: Option<Uuid>,
    title: String,
    description: String,
    instructions: String,
    /// Minutes, 0 means unlimited.
    time_limit: i32,
    /// 0 means unlimited.
    max_attempts: i32,
    /// Percentage needed to pass.
    passing_score: i32,
    published: bool,
    created_at: DateTime<Utc>,
}

impl ResourceTyped for Quiz {
    fn get_resource_type() -> ResourceType {
        ResourceType::Quiz
    }
}

impl Quiz {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn time_limit(&self) -> i32 {
        self.time_limit
    }

    pub fn max_attempts(&self) -> i32 {
        self.max_attempts
    }

    pub fn passing_score(&self) -> i32 {
        self.passing_score
    }

    pub fn published(&self) -> bool {
        self.published
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuizQuestion {
    id: Uuid,
    quiz_id: Uuid,
    question: String,
    question_type: String,
    #[schema(value_type = Vec<String>)]
    options: Json<Vec<String>>,
    correct_answer: String,
    points: i32,
    explanation: String,
    order_index: i32,
}

impl ResourceTyped for QuizQuestion {
    fn get_resource_type() -> ResourceType {
        ResourceType::QuizQuestion
    }
}

impl QuizQuestion {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn quiz_id(&self) -> Uuid {
        self.quiz_id
    }

    pub fn question_type(&self) -> QuestionType {
        QuestionType::from(self.question_type.as_str())
    }

    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    pub fn points(&self) -> i32 {
        self.points
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QuizQuestionCreate {
    pub question: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    pub points: Option<i32>,
    #[serde(default)]
    pub explanation: String,
    pub order_index: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QuizCreate {
    pub course_id: Uuid,
    pub module_id: Option<Uuid>,
    pub lesson_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instructions: String,
    pub time_limit: Option<i32>,
    pub max_attempts: Option<i32>,
    pub passing_score: Option<i32>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub questions: Vec<QuizQuestionCreate>,
}

impl QuizCreate {
    fn validate(&self) -> DatabaseResult<()> {
        if self.title.trim().is_empty() {
            return Err(DatabaseError::validation("title is required"));
        }
        if self.time_limit.is_some_and(|t| t < 0) || self.max_attempts.is_some_and(|m| m < 0) {
            return Err(DatabaseError::validation(
                "time_limit and max_attempts must not be negative",
            ));
        }
        if self.passing_score.is_some_and(|p| !(0..=100).contains(&p)) {
            return Err(DatabaseError::validation("passing_score must be within 0..=100"));
        }

        for (i, q) in self.questions.iter().enumerate() {
            if q.question.trim().is_empty() || q.correct_answer.trim().is_empty() {
                return Err(DatabaseError::validation(format!(
                    "question {} needs a text and a correct answer",
                    i + 1
                )));
            }
            if q.question_type == QuestionType::Unknown {
                return Err(DatabaseError::validation(format!(
                    "question {} has an unsupported type",
                    i + 1
                )));
            }
            if q.points.is_some_and(|p| p < 0) {
                return Err(DatabaseError::validation(format!(
                    "question {} has negative points",
                    i + 1
                )));
            }
        }
        Ok(())
    }
}

/// A question as students see it: no correct answer, no explanation.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuizQuestionView {
    pub id: Uuid,
    pub question: String,
    pub question_type: String,
    pub options: Vec<String>,
    pub points: i32,
    pub order_index: i32,
}

impl From<QuizQuestion> for QuizQuestionView {
    fn from(q: QuizQuestion) -> Self {
        Self {
            id: q.id,
            question: q.question,
            question_type: q.question_type,
            options: q.options.0,
            points: q.points,
            order_index: q.order_index,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuizView {
    pub quiz: Quiz,
    pub questions: Vec<QuizQuestionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuizWithQuestions {
    pub quiz: Quiz,
    pub questions: Vec<QuizQuestion>,
}

impl Quiz {
    pub async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: QuizCreate,
    ) -> DatabaseResult<QuizWithQuestions> {
        Course::find_authored(mm, actor, data.course_id).await?;
        data.validate()?;

        let mut tx = mm.begin().await?;

        if let Some(module_id) = data.module_id {
            ensure_in_course(
                &mut tx,
                "SELECT EXISTS (SELECT 1 FROM modules WHERE id = $1 AND course_id = $2)",
                module_id,
                data.course_id,
            )
            .await?;
        }
        if let Some(lesson_id) = data.lesson_id {
            ensure_in_course(
                &mut tx,
                "SELECT EXISTS (SELECT 1 FROM lessons l JOIN modules m ON m.id = l.module_id WHERE l.id = $1 AND m.course_id = $2)",
                lesson_id,
                data.course_id,
            )
            .await?;
        }

        let quiz: Quiz = sqlx::query_as(
            r#"
            INSERT INTO quizzes
                (id, course_id, module_id, lesson_id, title, description, instructions,
                 time_limit, max_attempts, passing_score, published)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.course_id)
        .bind(data.module_id)
        .bind(data.lesson_id)
        .bind(data.title.trim())
        .bind(&data.description)
        .bind(&data.instructions)
        .bind(data.time_limit.unwrap_or(0))
        .bind(data.max_attempts.unwrap_or(1))
        .bind(data.passing_score.unwrap_or(70))
        .bind(data.published)
        .fetch_one(&mut *tx)
        .await?;

        let mut questions = Vec::with_capacity(data.questions.len());
        for (i, q) in data.questions.into_iter().enumerate() {
            let question: QuizQuestion = sqlx::query_as(
                r#"
                INSERT INTO quiz_questions
                    (id, quiz_id, question, question_type, options, correct_answer,
                     points, explanation, order_index)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(quiz.id)
            .bind(q.question.trim())
            .bind(q.question_type.to_string())
            .bind(Json(&q.options))
            .bind(q.correct_answer.trim())
            .bind(q.points.unwrap_or(1))
            .bind(&q.explanation)
            .bind(q.order_index.unwrap_or(i as i32))
            .fetch_one(&mut *tx)
            .await?;
            questions.push(question);
        }

        tx.commit().await?;

        tracing::info!("quiz {} created with {} questions", quiz.id, questions.len());
        Ok(QuizWithQuestions { quiz, questions })
    }

    pub async fn find(mm: &ModelManager, id: Uuid) -> DatabaseResult<Self> {
        let result = sqlx::query_as("SELECT * FROM quizzes WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        result.ok_or(DatabaseError::NotFound)
    }

    pub async fn questions(conn: &mut PgConnection, quiz_id: Uuid) -> DatabaseResult<Vec<QuizQuestion>> {
        let result = sqlx::query_as(
            "SELECT * FROM quiz_questions WHERE quiz_id = $1 ORDER BY order_index, id",
        )
        .bind(quiz_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(result)
    }

    /// Sanitized quiz for an enrolled student, or for the course's author.
    pub async fn view(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<QuizView> {
        let quiz = Self::find(mm, id).await?;
        if !quiz.is_author(mm, actor).await? {
            if !quiz.published {
                return Err(DatabaseError::NotFound);
            }
            Enrollment::find_active(mm, actor.user_id(), quiz.course_id).await?;
        }

        let mut conn = mm.executor().acquire().await?;
        let questions = Self::questions(&mut conn, id).await?;
        Ok(quiz.into_view(questions))
    }

    /// Full quiz with answers. Course author or admin only.
    pub async fn with_answers(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<QuizWithQuestions> {
        let quiz = Self::find(mm, id).await?;
        quiz.ensure_author(mm, actor).await?;

        let mut conn = mm.executor().acquire().await?;
        let questions = Self::questions(&mut conn, id).await?;
        Ok(QuizWithQuestions { quiz, questions })
    }

    pub fn into_view(self, questions: Vec<QuizQuestion>) -> QuizView {
        QuizView {
            quiz: self,
            questions: questions.into_iter().map(QuizQuestionView::from).collect(),
        }
    }

    pub async fn ensure_author(&self, mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<()> {
        let course = Course::find_by_id(mm, actor, self.course_id)
            .await?
            .ok_or(DatabaseError::NotFound)?;
        check_access(mm, actor, &course, actor.user_id()).await
    }

    async fn is_author(&self, mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<bool> {
        match self.ensure_author(mm, actor).await {
            Ok(()) => Ok(true),
            Err(DatabaseError::Forbidden(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

pub(super) async fn ensure_in_course(
    conn: &mut PgConnection,
    sql: &str,
    id: Uuid,
    course_id: Uuid,
) -> DatabaseResult<()> {
    let exists: bool = sqlx::query_scalar(sql)
        .bind(id)
        .bind(course_id)
        .fetch_one(&mut *conn)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(DatabaseError::validation("module or lesson does not belong to this course"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn question(points: i32) -> QuizQuestion {
        QuizQuestion {
            id: Uuid::new_v4(),
            quiz_id: Uuid::nil(),
            question: String::from("2 + 2?"),
            question_type: String::from("multiple_choice"),
            options: Json(vec![String::from("3"), String::from("4")]),
            correct_answer: String::from("4"),
            points,
            explanation: String::from("arithmetic"),
            order_index: 0,
        }
    }

    #[test]
    fn student_view_hides_answers() {
        let view = QuizQuestionView::from(question(5));
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("correct_answer").is_none());
        assert!(json.get("explanation").is_none());
        assert_eq!(json["options"], serde_json::json!(["3", "4"]));
    }

    #[test]
    fn create_rejects_bad_passing_score_and_unknown_types() {
        let mut data = QuizCreate {
            course_id: Uuid::nil(),
            module_id: None,
            lesson_id: None,
            title: String::from("Checkpoint"),
            description: String::new(),
            instructions: String::new(),
            time_limit: None,
            max_attempts: None,
            passing_score: Some(120),
            published: true,
            questions: vec![],
        };
        assert!(matches!(data.validate(), Err(DatabaseError::Validation(_))));

        data.passing_score = Some(60);
        assert!(data.validate().is_ok());

        data.questions.push(QuizQuestionCreate {
            question: String::from("Explain"),
            question_type: QuestionType::Unknown,
            options: vec![],
            correct_answer: String::from("x"),
            points: None,
            explanation: String::new(),
            order_index: None,
        });
        assert!(matches!(data.validate(), Err(DatabaseError::Validation(_))));
    }
}
