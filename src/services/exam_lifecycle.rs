//! Exam state machine. Every status change goes through one of these
//! functions; callers persist the exam with a compare-and-set on the status
//! returned, so two racing writers cannot both apply a transition.

use chrono::{DateTime, Utc};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Exam, ExamAnalytics, ExamStatus},
};

/// Fails with `InvalidState` once the exam is finalized.
pub fn ensure_mutable(exam: &Exam) -> AppResult<()> {
    if exam.status == ExamStatus::Finalized {
        return Err(AppError::InvalidState(format!(
            "Exam '{}' is finalized; its results can no longer change",
            exam.id
        )));
    }
    Ok(())
}

/// Analysis reports are only written for a finalized exam.
pub fn ensure_finalized(exam: &Exam) -> AppResult<()> {
    if exam.status != ExamStatus::Finalized {
        return Err(AppError::InvalidState(format!(
            "Exam '{}' is {}; reports are written only after finalization",
            exam.id, exam.status
        )));
    }
    Ok(())
}

/// Applied after a result is written. Moves a `Draft` exam to `ResultEntry`
/// and bumps `modified_at`. Returns the status the stored exam must still
/// have for the write to be valid.
pub fn record_result(exam: &mut Exam, now: DateTime<Utc>) -> AppResult<ExamStatus> {
    ensure_mutable(exam)?;
    let previous = exam.status;
    if previous == ExamStatus::Draft {
        exam.status = ExamStatus::ResultEntry;
        log::info!("Exam '{}' moved from {} to {}", exam.id, previous, exam.status);
    }
    exam.modified_at = Some(now);
    Ok(previous)
}

/// Applied after a result is removed. The status never moves back, even when
/// the last result goes.
pub fn remove_result(exam: &mut Exam, now: DateTime<Utc>) -> AppResult<ExamStatus> {
    ensure_mutable(exam)?;
    exam.modified_at = Some(now);
    Ok(exam.status)
}

/// `ResultEntry -> Finalized`, storing the analytics snapshot exactly once.
pub fn finalize(
    exam: &mut Exam,
    analytics: ExamAnalytics,
    finalized_by: Option<String>,
    now: DateTime<Utc>,
) -> AppResult<ExamStatus> {
    if exam.status != ExamStatus::ResultEntry {
        return Err(AppError::InvalidState(format!(
            "Exam '{}' is {}; only an exam in {} can be finalized",
            exam.id,
            exam.status,
            ExamStatus::ResultEntry
        )));
    }

    let previous = exam.status;
    exam.status = ExamStatus::Finalized;
    exam.analytics = Some(analytics);
    exam.finalized_at = Some(now);
    exam.finalized_by = finalized_by;
    exam.modified_at = Some(now);
    Ok(previous)
}
