use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SubjectComparison {
    pub subject_id: String,
    pub subject: String,
    pub student_net: f64,
    pub class_avg_net: f64,
    pub delta: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ReportMetrics {
    pub student_total_net: f64,
    pub class_avg_total_net: f64,
    pub subject_comparisons: Vec<SubjectComparison>,
    /// Metrics object returned by the analysis service, stored as received.
    #[serde(default)]
    pub details: serde_json::Value,
}

/// Narrative analysis of one student's performance in one exam.
/// At most one exists per (exam, student); regeneration replaces it.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AnalysisReport {
    pub id: String,
    pub exam_id: String,
    pub student_id: String,
    pub class_id: String,
    pub summary: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
    pub metrics: ReportMetrics,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl AnalysisReport {
    pub fn new(exam_id: &str, student_id: &str, class_id: &str, metrics: ReportMetrics) -> Self {
        let now = Utc::now();
        AnalysisReport {
            id: Uuid::new_v4().to_string(),
            exam_id: exam_id.to_string(),
            student_id: student_id.to_string(),
            class_id: class_id.to_string(),
            summary: String::new(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            recommendations: Vec::new(),
            metrics,
            created_at: now,
            modified_at: now,
        }
    }
}
