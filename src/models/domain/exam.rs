use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Lifecycle of an exam. Transitions only ever move forward:
/// `Draft -> ResultEntry -> Finalized`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamStatus {
    #[default]
    Draft,
    ResultEntry,
    Finalized,
}

impl ExamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamStatus::Draft => "DRAFT",
            ExamStatus::ResultEntry => "RESULT_ENTRY",
            ExamStatus::Finalized => "FINALIZED",
        }
    }
}

impl fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ExamSubject {
    pub subject_id: String,
    pub question_count: u32,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SubjectAverage {
    pub subject_id: String,
    pub subject: String,
    pub avg_net: f64,
}

/// Class-wide snapshot written exactly once, when the exam is finalized.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ExamAnalytics {
    pub student_count: u32,
    pub class_avg_total_net: f64,
    pub subject_averages: Vec<SubjectAverage>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Exam {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub difficulty: Difficulty,
    pub class_id: String,
    pub subjects: Vec<ExamSubject>,
    pub status: ExamStatus,
    pub finalized_at: Option<DateTime<Utc>>,
    pub finalized_by: Option<String>,
    pub analytics: Option<ExamAnalytics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Exam {
    pub fn new_draft(
        title: &str,
        date: DateTime<Utc>,
        difficulty: Difficulty,
        class_id: &str,
        subjects: Vec<ExamSubject>,
    ) -> Self {
        Exam {
            id: Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            date,
            difficulty,
            class_id: class_id.to_string(),
            subjects,
            status: ExamStatus::Draft,
            finalized_at: None,
            finalized_by: None,
            analytics: None,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }
}
