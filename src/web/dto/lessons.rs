use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::model::entity::LessonWithProgressRow;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct LessonProgressShort {
    completed: bool,
    time_spent: i64,
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct LessonResponse {
    id: Uuid,
    module_id: Uuid,
    course_id: Uuid,
    title: String,
    content: String,
    duration: i32,
    order_index: i32,
    progress: LessonProgressShort,
}

impl From<LessonWithProgressRow> for LessonResponse {
    fn from(row: LessonWithProgressRow) -> Self {
        Self {
            id: row.id,
            module_id: row.module_id,
            course_id: row.course_id,
            title: row.title,
            content: row.content,
            duration: row.duration,
            order_index: row.order_index,
            progress: LessonProgressShort {
                completed: row.completed,
                time_spent: row.time_spent,
                completed_at: row.completed_at,
            },
        }
    }
}
