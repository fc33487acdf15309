use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use validator::Validate;

use crate::{
    db::{finish, EntityStore, StoreSession},
    errors::{AppError, AppResult},
    models::{
        domain::{AnalysisReport, Exam, ExamResult, ExamSubject},
        dto::{CreateExamRequest, ExamDetail, FinalizeExamRequest, FinalizeOutcome},
    },
    repositories::{self, exam_repository, roster_repository},
    services::{
        aggregation, analysis_orchestrator::AnalysisOrchestrator, exam_lifecycle,
        retry_on_conflict,
    },
};

/// Exam Lifecycle Manager: creation, lookup and finalization of exams.
pub struct ExamService {
    store: Arc<dyn EntityStore>,
    orchestrator: Arc<AnalysisOrchestrator>,
}

impl ExamService {
    pub fn new(store: Arc<dyn EntityStore>, orchestrator: Arc<AnalysisOrchestrator>) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    pub async fn create_exam(&self, request: &CreateExamRequest) -> AppResult<Exam> {
        request.validate()?;

        let mut session = self.store.begin().await?;
        let outcome = create_in_session(session.as_mut(), request).await;
        let exam = finish(session, outcome).await?;

        log::info!("Created exam '{}' ({}) for class '{}'", exam.title, exam.id, exam.class_id);
        Ok(exam)
    }

    pub async fn get_exam_detail(&self, exam_id: &str) -> AppResult<ExamDetail> {
        let mut session = self.store.begin().await?;
        let outcome = detail_in_session(session.as_mut(), exam_id).await;
        finish(session, outcome).await
    }

    /// Flips the exam to `Finalized` with its analytics snapshot, commits, and
    /// only then runs the per-student analysis. Analysis failures are reported
    /// in the outcome and never undo the finalization.
    pub async fn finalize(
        &self,
        exam_id: &str,
        request: &FinalizeExamRequest,
    ) -> AppResult<FinalizeOutcome> {
        request.validate()?;

        let store = &self.store;
        let finalized_by = &request.finalized_by;
        let (exam, results) = retry_on_conflict("Finalizing exam", move || async move {
            let mut session = store.begin().await?;
            let outcome = finalize_in_session(session.as_mut(), exam_id, finalized_by.clone()).await;
            finish(session, outcome).await
        })
        .await?;

        log::info!(
            "Exam '{}' finalized with {} results by {}",
            exam.id,
            results.len(),
            exam.finalized_by.as_deref().unwrap_or("unknown")
        );

        let run = self.orchestrator.run(&exam, &results).await;

        Ok(FinalizeOutcome {
            exam_id: exam.id,
            student_count: results.len() as u32,
            analysis_ok: run.succeeded,
            analysis_failed: run.failed,
            failures: run.failures,
        })
    }

    pub async fn get_report(&self, exam_id: &str, student_id: &str) -> AppResult<AnalysisReport> {
        let mut session = self.store.begin().await?;
        let outcome = exam_repository::find_report(session.as_mut(), exam_id, student_id).await;
        finish(session, outcome).await?.ok_or_else(|| {
            AppError::NotFound(format!(
                "No analysis report for student '{}' in exam '{}'",
                student_id, exam_id
            ))
        })
    }
}

async fn create_in_session(
    session: &mut dyn StoreSession,
    request: &CreateExamRequest,
) -> AppResult<Exam> {
    roster_repository::find_class(session, &request.class_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Class with id '{}' not found", request.class_id)))?;

    let mut seen = HashSet::new();
    if let Some(repeated) = request
        .subjects
        .iter()
        .find(|s| !seen.insert(s.subject_id.as_str()))
    {
        return Err(AppError::ValidationError(format!(
            "Subject '{}' is listed more than once",
            repeated.subject_id
        )));
    }

    let ids: Vec<String> = request.subjects.iter().map(|s| s.subject_id.clone()).collect();
    let known = roster_repository::subjects_by_ids(session, &ids).await?;
    if let Some(missing) = ids.iter().find(|id| !known.contains_key(*id)) {
        return Err(AppError::NotFound(format!("Subject with id '{}' not found", missing)));
    }

    let exam = Exam::new_draft(
        &request.title,
        request.date,
        request.difficulty,
        &request.class_id,
        request
            .subjects
            .iter()
            .map(|s| ExamSubject {
                subject_id: s.subject_id.clone(),
                question_count: s.question_count,
            })
            .collect(),
    );
    repositories::insert(session, &exam).await?;
    Ok(exam)
}

async fn detail_in_session(session: &mut dyn StoreSession, exam_id: &str) -> AppResult<ExamDetail> {
    let exam = exam_repository::require_exam(session, exam_id).await?;
    let result_count = exam_repository::count_results(session, exam_id).await?;
    Ok(ExamDetail { exam, result_count })
}

/// Reads the full result set and flips the status in the same transaction, so
/// a concurrent ingestion either lands before the snapshot or fails.
async fn finalize_in_session(
    session: &mut dyn StoreSession,
    exam_id: &str,
    finalized_by: Option<String>,
) -> AppResult<(Exam, Vec<ExamResult>)> {
    let mut exam = exam_repository::require_exam(session, exam_id).await?;
    let results = exam_repository::results_for_exam(session, exam_id).await?;

    let analytics = aggregation::summarize(&results);
    let expected = exam_lifecycle::finalize(&mut exam, analytics, finalized_by, Utc::now())?;
    if results.is_empty() {
        return Err(AppError::NoResults(format!(
            "Exam '{}' has no results to finalize",
            exam_id
        )));
    }

    exam_repository::save_exam_if_status(session, &exam, expected).await?;
    Ok((exam, results))
}
