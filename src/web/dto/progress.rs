use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{Enrollment, LessonProgress, ProgressUpdate};

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProgressResponse {
    progress: LessonProgress,
    enrollment: Enrollment,
    course_completed: bool,
}

impl From<ProgressUpdate> for ProgressResponse {
    fn from(update: ProgressUpdate) -> Self {
        Self {
            progress: update.progress,
            enrollment: update.enrollment,
            course_completed: update.course_completed,
        }
    }
}

/// Body of `PUT /lessons/{id}/progress`; the lesson comes from the path.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LessonProgressBody {
    #[serde(default)]
    pub time_spent: i32,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CourseRef {
    pub course_id: Uuid,
}
