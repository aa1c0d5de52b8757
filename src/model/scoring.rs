//! Deterministic arithmetic shared by progress aggregation and quiz grading.
//!
//! Everything that decides "is the course complete" or "was this answer right"
//! lives here so no caller computes it with a different rounding or matching rule.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Coding,
    #[serde(other)]
    Unknown,
}

impl From<&str> for QuestionType {
    fn from(value: &str) -> Self {
        match value {
            "multiple_choice" => Self::MultipleChoice,
            "true_false" => Self::TrueFalse,
            "short_answer" => Self::ShortAnswer,
            "coding" => Self::Coding,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MultipleChoice => write!(f, "multiple_choice"),
            Self::TrueFalse => write!(f, "true_false"),
            Self::ShortAnswer => write!(f, "short_answer"),
            Self::Coding => write!(f, "coding"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

pub fn normalize_answer(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Grades a single submitted answer.
///
/// Choice questions need an exact (normalized) match. Short answers accept a
/// substring match in either direction. Coding and unknown types fall back to
/// exact match; nothing is executed.
pub fn check_answer(question_type: &QuestionType, correct: &str, submitted: &str) -> bool {
    let correct = normalize_answer(correct);
    let submitted = normalize_answer(submitted);

    match question_type {
        QuestionType::ShortAnswer => correct.contains(&submitted) || submitted.contains(&correct),
        QuestionType::MultipleChoice
        | QuestionType::TrueFalse
        | QuestionType::Coding
        | QuestionType::Unknown => correct == submitted,
    }
}

/// All or nothing, there is no partial credit.
pub fn points_earned(is_correct: bool, question_points: i32) -> f64 {
    if is_correct {
        f64::from(question_points)
    } else {
        0.0
    }
}

pub fn score_percentage(earned: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    earned / total * 100.0
}

pub fn is_passed(score: f64, passing_score: i32) -> bool {
    score >= f64::from(passing_score)
}

pub fn completion_percentage(completed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    completed as f64 / total as f64 * 100.0
}

pub fn is_course_complete(progress: f64) -> bool {
    progress >= 100.0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn question_type_parsing() {
        assert_eq!(QuestionType::from("multiple_choice"), QuestionType::MultipleChoice);
        assert_eq!(QuestionType::from("true_false"), QuestionType::TrueFalse);
        assert_eq!(QuestionType::from("short_answer"), QuestionType::ShortAnswer);
        assert_eq!(QuestionType::from("coding"), QuestionType::Coding);
        assert_eq!(QuestionType::from("essay"), QuestionType::Unknown);
        assert_eq!(QuestionType::ShortAnswer.to_string(), "short_answer");
    }

    #[test]
    fn choice_answers_match_exactly_after_normalizing() {
        let t = QuestionType::MultipleChoice;
        assert!(check_answer(&t, "Paris", "  paris "));
        assert!(!check_answer(&t, "Paris", "Paris, France"));
        assert!(check_answer(&QuestionType::TrueFalse, "true", "TRUE"));
        assert!(!check_answer(&QuestionType::TrueFalse, "true", "false"));
    }

    #[test]
    fn short_answers_match_substrings_both_ways() {
        let t = QuestionType::ShortAnswer;
        assert!(check_answer(&t, "photosynthesis", "Photosynthesis in plants"));
        assert!(check_answer(&t, "the mitochondria", "Mitochondria"));
        assert!(!check_answer(&t, "mitochondria", "ribosome"));
    }

    #[test]
    fn coding_and_unknown_fall_back_to_exact_match() {
        assert!(check_answer(&QuestionType::Coding, "print(1)", " PRINT(1)"));
        assert!(!check_answer(&QuestionType::Coding, "print(1)", "print(2)"));
        assert!(!check_answer(&QuestionType::Unknown, "abc", "abcd"));
    }

    #[test]
    fn points_are_all_or_nothing() {
        assert_eq!(points_earned(true, 10), 10.0);
        assert_eq!(points_earned(false, 10), 0.0);
    }

    #[test]
    fn quiz_score_example() {
        let earned = points_earned(true, 5) + points_earned(false, 10);
        let score = score_percentage(earned, 15.0);
        assert!((score - 33.333_333).abs() < 1e-4);
        assert!(!is_passed(score, 60));
        assert!(is_passed(60.0, 60));
    }

    #[test]
    fn score_guards_empty_quiz() {
        assert_eq!(score_percentage(0.0, 0.0), 0.0);
    }

    #[test]
    fn completion_percentage_is_ratio_of_lessons() {
        assert_eq!(completion_percentage(0, 0), 0.0);
        assert_eq!(completion_percentage(1, 2), 50.0);
        assert_eq!(completion_percentage(2, 2), 100.0);
        assert!(is_course_complete(completion_percentage(3, 3)));
        assert!(!is_course_complete(completion_percentage(2, 3)));
    }
}
