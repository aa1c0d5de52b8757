use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{DatabaseResult, entity::ModuleWithLessonsRow};

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct LessonShort {
    pub id: Uuid,
    pub title: String,
    pub duration: i32,
    pub completed: bool,
    pub order_index: i32,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ModuleWithLessons {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub order_index: i32,
    pub lessons: Vec<LessonShort>,
}

impl TryFrom<ModuleWithLessonsRow> for ModuleWithLessons {
    type Error = serde_json::Error;

    fn try_from(value: ModuleWithLessonsRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            title: value.title,
            description: value.description,
            order_index: value.order_index,
            lessons: serde_json::from_value(value.lessons)?,
        })
    }
}

impl ModuleWithLessons {
    pub fn from_rows(rows: Vec<ModuleWithLessonsRow>) -> DatabaseResult<Vec<Self>> {
        Ok(rows
            .into_iter()
            .map(ModuleWithLessons::try_from)
            .collect::<Result<_, _>>()?)
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ModuleCreateBody {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order_index: Option<i32>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn aggregated_lessons_decode() {
        let row = ModuleWithLessonsRow {
            id: Uuid::nil(),
            title: String::from("Basics"),
            description: String::new(),
            order_index: 0,
            lessons: serde_json::json!([
                { "id": Uuid::nil(), "title": "Intro", "duration": 10, "order_index": 0, "completed": true }
            ]),
        };
        let module = ModuleWithLessons::try_from(row).unwrap();
        assert_eq!(module.lessons.len(), 1);
        assert!(module.lessons[0].completed);
    }
}
