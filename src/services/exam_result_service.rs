use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono::Utc;
use validator::Validate;

use crate::{
    db::{finish, EntityStore, StoreSession},
    errors::{AppError, AppResult},
    models::{
        domain::{Exam, ExamResult, Subject, SubjectResult},
        dto::{
            request::SubjectScoreRequest, AddExamResultRequest, BulkIngestOutcome, BulkResultRow,
        },
    },
    repositories::{
        self, exam_repository,
        roster_repository::{self, StudentLookup},
    },
    services::{exam_lifecycle, retry_on_conflict, scoring::AnswerCounts},
};

/// Result Ingestion Service: adds, bulk-adds, lists and removes exam results.
pub struct ExamResultService {
    store: Arc<dyn EntityStore>,
}

impl ExamResultService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    pub async fn add_result(
        &self,
        exam_id: &str,
        request: &AddExamResultRequest,
    ) -> AppResult<ExamResult> {
        request.validate()?;

        let store = &self.store;
        retry_on_conflict("Adding exam result", move || async move {
            let mut session = store.begin().await?;
            let outcome = add_in_session(session.as_mut(), exam_id, request).await;
            finish(session, outcome).await
        })
        .await
    }

    /// All-or-nothing: every row is resolved before anything is written, and
    /// any unresolvable row fails the whole batch.
    pub async fn bulk_add(
        &self,
        exam_id: &str,
        rows: &[BulkResultRow],
    ) -> AppResult<BulkIngestOutcome> {
        if rows.is_empty() {
            return Err(AppError::ValidationError(
                "Bulk import contains no rows".to_string(),
            ));
        }
        for (index, row) in rows.iter().enumerate() {
            row.validate()
                .map_err(|e| AppError::ValidationError(format!("Row {}: {}", index + 1, e)))?;
        }

        let store = &self.store;
        let outcome = retry_on_conflict("Bulk result import", move || async move {
            let mut session = store.begin().await?;
            let outcome = bulk_add_in_session(session.as_mut(), exam_id, rows).await;
            finish(session, outcome).await
        })
        .await?;

        log::info!(
            "Imported {} results into exam '{}'",
            outcome.created_count,
            exam_id
        );
        Ok(outcome)
    }

    pub async fn delete_result(&self, result_id: &str) -> AppResult<()> {
        let store = &self.store;
        retry_on_conflict("Deleting exam result", move || async move {
            let mut session = store.begin().await?;
            let outcome = delete_in_session(session.as_mut(), result_id).await;
            finish(session, outcome).await
        })
        .await
    }

    /// Results of an exam, best total net first.
    pub async fn list_results(&self, exam_id: &str) -> AppResult<Vec<ExamResult>> {
        let mut session = self.store.begin().await?;
        let outcome = list_in_session(session.as_mut(), exam_id).await;
        finish(session, outcome).await
    }
}

async fn add_in_session(
    session: &mut dyn StoreSession,
    exam_id: &str,
    request: &AddExamResultRequest,
) -> AppResult<ExamResult> {
    let mut exam = exam_repository::require_exam(session, exam_id).await?;
    exam_lifecycle::ensure_mutable(&exam)?;

    roster_repository::find_student(session, &request.student_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Student with id '{}' not found", request.student_id))
        })?;

    let subject_results = resolve_manual_entries(session, &request.results_by_subject).await?;
    let result = ExamResult::new(&exam.id, &request.student_id, subject_results);
    exam_repository::insert_result(session, &result).await?;

    let expected = exam_lifecycle::record_result(&mut exam, Utc::now())?;
    exam_repository::save_exam_if_status(session, &exam, expected).await?;

    log::debug!(
        "Recorded result for student '{}' in exam '{}' (total net {})",
        result.student_id,
        exam.id,
        result.total_net
    );
    Ok(result)
}

/// Labels for manual entries come from the subject records.
async fn resolve_manual_entries(
    session: &mut dyn StoreSession,
    entries: &[SubjectScoreRequest],
) -> AppResult<Vec<SubjectResult>> {
    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(entry.subject_id.as_str()) {
            return Err(AppError::ValidationError(format!(
                "Subject '{}' appears more than once",
                entry.subject_id
            )));
        }
    }

    let ids: Vec<String> = entries.iter().map(|e| e.subject_id.clone()).collect();
    let subjects = roster_repository::subjects_by_ids(session, &ids).await?;

    entries
        .iter()
        .map(|entry| {
            let subject = subjects.get(&entry.subject_id).ok_or_else(|| {
                AppError::ValidationError(format!("Unknown subject '{}'", entry.subject_id))
            })?;
            Ok(subject_result(subject, entry.counts))
        })
        .collect()
}

fn subject_result(subject: &Subject, counts: AnswerCounts) -> SubjectResult {
    SubjectResult {
        subject_id: subject.id.clone(),
        subject: subject.name.clone(),
        correct: counts.correct,
        wrong: counts.wrong,
        blank: counts.blank,
        net: counts.net(),
    }
}

async fn bulk_add_in_session(
    session: &mut dyn StoreSession,
    exam_id: &str,
    rows: &[BulkResultRow],
) -> AppResult<BulkIngestOutcome> {
    let mut exam = exam_repository::require_exam(session, exam_id).await?;
    exam_lifecycle::ensure_mutable(&exam)?;

    let exam_subjects = exam_subjects_in_order(session, &exam).await?;

    let mut pending = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let row_number = index + 1;
        let student = match roster_repository::find_student_in_class_by_email(
            session,
            &row.student_email,
            &exam.class_id,
        )
        .await?
        {
            StudentLookup::Found(student) => student,
            StudentLookup::UnknownEmail => {
                return Err(AppError::ValidationError(format!(
                    "Row {}: no student account for '{}'",
                    row_number, row.student_email
                )))
            }
            StudentLookup::NotInClass => {
                return Err(AppError::ValidationError(format!(
                    "Row {}: student '{}' is not enrolled in the exam's class",
                    row_number, row.student_email
                )))
            }
        };

        let subject_results = scores_for_row(&exam_subjects, row, row_number)?;
        if subject_results.is_empty() {
            return Err(AppError::ValidationError(format!(
                "Row {}: no subject data for '{}'",
                row_number, row.student_email
            )));
        }

        log::debug!(
            "Row {} resolved to student '{}' with {} subjects",
            row_number,
            student.id,
            subject_results.len()
        );
        pending.push(ExamResult::new(&exam.id, &student.id, subject_results));
    }

    for result in &pending {
        exam_repository::insert_result(session, result).await?;
    }

    let expected = exam_lifecycle::record_result(&mut exam, Utc::now())?;
    exam_repository::save_exam_if_status(session, &exam, expected).await?;

    Ok(BulkIngestOutcome {
        created_count: pending.len(),
    })
}

/// The exam's subjects in exam order. Subjects whose record is gone are left out.
async fn exam_subjects_in_order(
    session: &mut dyn StoreSession,
    exam: &Exam,
) -> AppResult<Vec<Subject>> {
    let ids: Vec<String> = exam.subjects.iter().map(|s| s.subject_id.clone()).collect();
    let mut by_id = roster_repository::subjects_by_ids(session, &ids).await?;
    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

fn label_key(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Matches a row's labels to the exam's subjects, case-insensitively.
/// Subjects with all-zero counts were not attempted and produce no entry.
/// Two labels that only differ in case or surrounding spaces make the row
/// ambiguous and fail it.
fn scores_for_row(
    exam_subjects: &[Subject],
    row: &BulkResultRow,
    row_number: usize,
) -> AppResult<Vec<SubjectResult>> {
    let mut by_label: HashMap<String, AnswerCounts> = HashMap::with_capacity(row.scores.len());
    for (label, counts) in &row.scores {
        let key = label_key(label);
        if by_label.insert(key.clone(), *counts).is_some() {
            return Err(AppError::ValidationError(format!(
                "Row {}: subject '{}' is given more than once",
                row_number, key
            )));
        }
    }

    Ok(exam_subjects
        .iter()
        .filter_map(|subject| {
            by_label
                .get(&label_key(&subject.name))
                .copied()
                .filter(|counts| !counts.is_empty())
                .map(|counts| subject_result(subject, counts))
        })
        .collect())
}

async fn delete_in_session(session: &mut dyn StoreSession, result_id: &str) -> AppResult<()> {
    let result: ExamResult = repositories::find_by_id(session, result_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Exam result with id '{}' not found", result_id)))?;

    let mut exam = exam_repository::require_exam(session, &result.exam_id).await?;
    let expected = exam_lifecycle::remove_result(&mut exam, Utc::now())?;

    exam_repository::delete_result(session, &result.id).await?;
    exam_repository::save_exam_if_status(session, &exam, expected).await?;

    log::debug!("Deleted result '{}' from exam '{}'", result.id, exam.id);
    Ok(())
}

async fn list_in_session(
    session: &mut dyn StoreSession,
    exam_id: &str,
) -> AppResult<Vec<ExamResult>> {
    exam_repository::require_exam(session, exam_id).await?;
    let mut results = exam_repository::results_for_exam(session, exam_id).await?;
    results.sort_by(|a, b| b.total_net.total_cmp(&a.total_net));
    Ok(results)
}
