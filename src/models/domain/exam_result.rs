use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-subject row of a result. `subject` is the label at ingestion time and
/// stays readable after the subject record itself is deleted.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SubjectResult {
    pub subject_id: String,
    pub subject: String,
    pub correct: u32,
    pub wrong: u32,
    pub blank: u32,
    pub net: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ExamResult {
    pub id: String,
    pub exam_id: String,
    pub student_id: String,
    pub results_by_subject: Vec<SubjectResult>,
    pub total_net: f64,
    pub created_at: DateTime<Utc>,
    /// When the last analysis report for this result was saved.
    #[serde(default)]
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl ExamResult {
    pub fn new(exam_id: &str, student_id: &str, results_by_subject: Vec<SubjectResult>) -> Self {
        let total_net = results_by_subject.iter().map(|s| s.net).sum();
        ExamResult {
            id: Uuid::new_v4().to_string(),
            exam_id: exam_id.to_string(),
            student_id: student_id.to_string(),
            results_by_subject,
            total_net,
            created_at: Utc::now(),
            analyzed_at: None,
        }
    }
}
