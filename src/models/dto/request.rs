use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::domain::Difficulty;
use crate::services::scoring::AnswerCounts;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200), custom(function = "not_blank"))]
    pub title: String,

    pub date: DateTime<Utc>,

    #[serde(default)]
    pub difficulty: Difficulty,

    #[validate(length(min = 1))]
    pub class_id: String,

    #[validate(length(min = 1, message = "An exam needs at least one subject"), nested)]
    pub subjects: Vec<ExamSubjectRequest>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ExamSubjectRequest {
    #[validate(length(min = 1))]
    pub subject_id: String,

    #[validate(range(min = 1))]
    pub question_count: u32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddExamResultRequest {
    #[validate(length(min = 1))]
    pub student_id: String,

    #[validate(
        length(min = 1, message = "At least one subject entry is required"),
        nested
    )]
    pub results_by_subject: Vec<SubjectScoreRequest>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SubjectScoreRequest {
    #[validate(length(min = 1))]
    pub subject_id: String,

    #[serde(flatten)]
    pub counts: AnswerCounts,
}

/// One already-parsed row of a bulk import: the student's email and the
/// answer counts keyed by subject label.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BulkResultRow {
    #[validate(email(message = "Invalid email format"))]
    pub student_email: String,

    #[serde(default)]
    pub scores: HashMap<String, AnswerCounts>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct FinalizeExamRequest {
    #[validate(length(min = 1, max = 100))]
    pub finalized_by: Option<String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}
