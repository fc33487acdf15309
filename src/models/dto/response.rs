use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::domain::Exam;

/// Only the first few failures are carried back to the caller.
pub const MAX_REPORTED_FAILURES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamDetail {
    #[serde(flatten)]
    pub exam: Exam,
    pub result_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkIngestOutcome {
    pub created_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    pub student_id: String,
    pub error: String,
}

/// Result of finalizing an exam. Analysis failures are reported here as data;
/// the exam is finalized regardless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeOutcome {
    pub exam_id: String,
    pub student_count: u32,
    pub analysis_ok: usize,
    pub analysis_failed: usize,
    pub failures: Vec<AnalysisFailure>,
}

/// What a cascading delete removed. `deleted` has one entry for every
/// collection the cascade visited, zero counts included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeReport {
    pub entity: String,
    pub deleted_id: String,
    pub deleted: BTreeMap<String, u64>,
}

impl CascadeReport {
    pub fn count(&self, collection: &str) -> u64 {
        self.deleted.get(collection).copied().unwrap_or(0)
    }
}
