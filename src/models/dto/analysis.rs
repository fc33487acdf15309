//! Wire contract of the external analysis service (`POST /analyze-exam`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::Difficulty;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub student_id: String,
    pub exam_id: String,
    pub current_exam: CurrentExam,
    /// At most five, most recent first.
    pub previous_exams: Vec<PreviousExam>,
    pub difficulty_weights: DifficultyWeights,
    pub class_context: ClassContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentExam {
    pub date: DateTime<Utc>,
    pub difficulty: Difficulty,
    pub total_net: f64,
    pub subjects: Vec<SubjectNet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectNet {
    pub subject_id: String,
    pub label: String,
    pub net: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousExam {
    pub date: DateTime<Utc>,
    pub difficulty: Difficulty,
    pub total_net: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyWeights {
    pub easy: f64,
    pub medium: f64,
    pub hard: f64,
}

impl Default for DifficultyWeights {
    fn default() -> Self {
        Self {
            easy: 0.9,
            medium: 1.0,
            hard: 1.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassContext {
    pub class_avg_total_net: f64,
    pub student_rank: u32,
    pub student_count: u32,
    pub percentile: u32,
    pub subjects: Vec<SubjectContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectContext {
    pub subject_id: String,
    pub label: String,
    pub student_net: f64,
    pub class_avg_net: f64,
    pub delta: f64,
}

/// What the analysis service returns. A response that fails validation is
/// treated the same as a transport failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AnalysisResponse {
    #[validate(length(min = 1, message = "summary must not be empty"))]
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub metrics: serde_json::Value,
}
