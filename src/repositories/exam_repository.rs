use chrono::{DateTime, Utc};
use mongodb::bson::doc;

use crate::{
    db::StoreSession,
    errors::{AppError, AppResult},
    models::domain::{AnalysisReport, Exam, ExamResult, ExamStatus},
    repositories::{self, field_eq, field_in, to_document, Entity},
};

pub async fn require_exam(session: &mut dyn StoreSession, exam_id: &str) -> AppResult<Exam> {
    repositories::find_by_id::<Exam>(session, exam_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Exam with id '{}' not found", exam_id)))
}

/// Writes `exam` only if the stored copy is still in `expected` status.
pub async fn save_exam_if_status(
    session: &mut dyn StoreSession,
    exam: &Exam,
    expected: ExamStatus,
) -> AppResult<()> {
    let matched = session
        .replace_one(
            Exam::COLLECTION,
            doc! { "id": exam.id.as_str(), "status": expected.as_str() },
            to_document(exam)?,
            false,
        )
        .await?;

    if matched == 0 {
        return Err(AppError::InvalidState(format!(
            "Exam '{}' is no longer {}",
            exam.id, expected
        )));
    }
    Ok(())
}

/// All results of an exam in ingestion order.
pub async fn results_for_exam(
    session: &mut dyn StoreSession,
    exam_id: &str,
) -> AppResult<Vec<ExamResult>> {
    let mut results: Vec<ExamResult> =
        repositories::find_where(session, field_eq("exam_id", exam_id)).await?;
    results.sort_by_key(|r| r.created_at);
    Ok(results)
}

pub async fn count_results(session: &mut dyn StoreSession, exam_id: &str) -> AppResult<u64> {
    session
        .count(ExamResult::COLLECTION, field_eq("exam_id", exam_id))
        .await
}

pub async fn find_result(
    session: &mut dyn StoreSession,
    exam_id: &str,
    student_id: &str,
) -> AppResult<Option<ExamResult>> {
    repositories::find_one_where(session, doc! { "exam_id": exam_id, "student_id": student_id })
        .await
}

/// Stamps the (exam, student) result as analyzed at `at`. The write makes a
/// concurrent delete of the result collide with this transaction. Fails with
/// `NotFound` when the result is gone.
pub async fn mark_analyzed(
    session: &mut dyn StoreSession,
    exam_id: &str,
    student_id: &str,
    at: DateTime<Utc>,
) -> AppResult<ExamResult> {
    let not_found = || {
        AppError::NotFound(format!(
            "Result of student '{}' in exam '{}' no longer exists",
            student_id, exam_id
        ))
    };
    let mut result = find_result(session, exam_id, student_id)
        .await?
        .ok_or_else(not_found)?;
    result.analyzed_at = Some(at);

    let matched = session
        .replace_one(
            ExamResult::COLLECTION,
            field_eq("id", &result.id),
            to_document(&result)?,
            false,
        )
        .await?;
    if matched == 0 {
        return Err(not_found());
    }
    Ok(result)
}

/// Inserts a result; a second result for the same (exam, student) pair is a
/// `DuplicateResult`.
pub async fn insert_result(session: &mut dyn StoreSession, result: &ExamResult) -> AppResult<()> {
    match repositories::insert(session, result).await {
        Err(AppError::AlreadyExists(_)) => Err(AppError::DuplicateResult(format!(
            "Student '{}' already has a result for exam '{}'",
            result.student_id, result.exam_id
        ))),
        other => other,
    }
}

pub async fn delete_result(session: &mut dyn StoreSession, result_id: &str) -> AppResult<u64> {
    session
        .delete_many(ExamResult::COLLECTION, field_eq("id", result_id))
        .await
}

pub async fn results_for_student(
    session: &mut dyn StoreSession,
    student_id: &str,
) -> AppResult<Vec<ExamResult>> {
    repositories::find_where(session, field_eq("student_id", student_id)).await
}

pub async fn exams_by_ids(session: &mut dyn StoreSession, ids: &[String]) -> AppResult<Vec<Exam>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    repositories::find_where(session, field_in("id", ids)).await
}

pub async fn find_report(
    session: &mut dyn StoreSession,
    exam_id: &str,
    student_id: &str,
) -> AppResult<Option<AnalysisReport>> {
    repositories::find_one_where(session, doc! { "exam_id": exam_id, "student_id": student_id })
        .await
}

/// Replaces the report for the same (exam, student) pair, keeping its id and
/// creation time, or inserts it when none exists.
pub async fn upsert_report(
    session: &mut dyn StoreSession,
    mut report: AnalysisReport,
) -> AppResult<AnalysisReport> {
    if let Some(existing) = find_report(session, &report.exam_id, &report.student_id).await? {
        report.id = existing.id;
        report.created_at = existing.created_at;
    }

    session
        .replace_one(
            AnalysisReport::COLLECTION,
            doc! { "exam_id": report.exam_id.as_str(), "student_id": report.student_id.as_str() },
            to_document(&report)?,
            true,
        )
        .await?;
    Ok(report)
}
