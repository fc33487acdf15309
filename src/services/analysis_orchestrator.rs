use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use futures::{stream, StreamExt};

use crate::{
    db::{finish, EntityStore, StoreSession},
    errors::{AppError, AppResult},
    models::{
        domain::{AnalysisReport, Exam, ExamAnalytics, ExamResult, ReportMetrics},
        dto::{
            analysis::{
                ClassContext, CurrentExam, DifficultyWeights, PreviousExam, SubjectContext,
                SubjectNet,
            },
            AnalysisFailure, AnalysisRequest, AnalysisResponse, MAX_REPORTED_FAILURES,
        },
    },
    repositories::exam_repository,
    services::{
        aggregation::{self, Standing},
        analysis_client::AnalysisClient,
        exam_lifecycle, retry_on_conflict,
    },
};

/// How many earlier exams are sent along with the current one.
pub const HISTORY_LIMIT: usize = 5;

/// Tally of one analysis pass over an exam's results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisRun {
    pub succeeded: usize,
    pub failed: usize,
    /// The first `MAX_REPORTED_FAILURES` failures, in result order.
    pub failures: Vec<AnalysisFailure>,
}

pub struct AnalysisOrchestrator {
    store: Arc<dyn EntityStore>,
    client: Arc<dyn AnalysisClient>,
    concurrency: usize,
}

impl AnalysisOrchestrator {
    pub fn new(
        store: Arc<dyn EntityStore>,
        client: Arc<dyn AnalysisClient>,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// Analyzes every result of a finalized exam. A failing student is
    /// recorded and skipped; it never stops the others. Students are started
    /// as soon as a slot frees up, and outcomes are tallied in result order.
    pub async fn run(&self, exam: &Exam, results: &[ExamResult]) -> AnalysisRun {
        let analytics = exam.analytics.clone().unwrap_or_else(|| aggregation::summarize(results));
        let standings = aggregation::standings(results);
        let analytics = &analytics;
        let standings = &standings;

        let mut outcomes: Vec<(usize, AppResult<()>)> = stream::iter(results.iter().enumerate())
            .map(move |(index, result)| async move {
                let outcome = self.analyze_student(exam, analytics, standings, result).await;
                (index, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        outcomes.sort_by_key(|(index, _)| *index);

        let mut run = AnalysisRun::default();
        for (result, (_, outcome)) in results.iter().zip(outcomes) {
            match outcome {
                Ok(()) => run.succeeded += 1,
                Err(err) => {
                    log::warn!(
                        "Analysis failed for student '{}' in exam '{}': {}",
                        result.student_id,
                        exam.id,
                        err
                    );
                    run.failed += 1;
                    if run.failures.len() < MAX_REPORTED_FAILURES {
                        run.failures.push(AnalysisFailure {
                            student_id: result.student_id.clone(),
                            error: err.to_string(),
                        });
                    }
                }
            }
        }

        log::info!(
            "Analysis for exam '{}' finished: {} succeeded, {} failed",
            exam.id,
            run.succeeded,
            run.failed
        );
        run
    }

    async fn analyze_student(
        &self,
        exam: &Exam,
        analytics: &ExamAnalytics,
        standings: &HashMap<String, Standing>,
        result: &ExamResult,
    ) -> AppResult<()> {
        let standing = standings.get(&result.student_id).copied().ok_or_else(|| {
            AppError::InternalError(format!("No standing for student '{}'", result.student_id))
        })?;

        let previous = self.previous_exams(result).await?;
        let request = build_request(exam, analytics, standing, result, previous);

        // No store session is open while the collaborator is working.
        let response = self.client.analyze(&request).await?;
        let report = build_report(exam, analytics, result, response);

        let store = &self.store;
        let report = &report;
        retry_on_conflict("Saving analysis report", move || async move {
            let mut session = store.begin().await?;
            let outcome = save_report_in_session(session.as_mut(), report).await;
            finish(session, outcome).await
        })
        .await?;
        Ok(())
    }

    async fn previous_exams(&self, result: &ExamResult) -> AppResult<Vec<PreviousExam>> {
        let mut session = self.store.begin().await?;
        let outcome = load_history(session.as_mut(), result).await;
        finish(session, outcome).await
    }
}

/// Writes the report only while its exam is still finalized and its result
/// still exists, so a cascade that removed the exam mid-analysis leaves no
/// report behind. Stamping the result makes a concurrent delete of it
/// conflict with this transaction.
async fn save_report_in_session(
    session: &mut dyn StoreSession,
    report: &AnalysisReport,
) -> AppResult<AnalysisReport> {
    let exam = exam_repository::require_exam(session, &report.exam_id).await?;
    exam_lifecycle::ensure_finalized(&exam)?;
    exam_repository::mark_analyzed(session, &report.exam_id, &report.student_id, report.modified_at)
        .await?;
    exam_repository::upsert_report(session, report.clone()).await
}

/// The student's results created strictly before `current`, newest first,
/// joined to their exams' date and difficulty.
pub async fn load_history(
    session: &mut dyn StoreSession,
    current: &ExamResult,
) -> AppResult<Vec<PreviousExam>> {
    let mut earlier: Vec<ExamResult> =
        exam_repository::results_for_student(session, &current.student_id)
            .await?
            .into_iter()
            .filter(|r| r.id != current.id && r.created_at < current.created_at)
            .collect();
    earlier.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    earlier.truncate(HISTORY_LIMIT);

    let exam_ids: Vec<String> = earlier.iter().map(|r| r.exam_id.clone()).collect();
    let exams: HashMap<String, Exam> = exam_repository::exams_by_ids(session, &exam_ids)
        .await?
        .into_iter()
        .map(|e| (e.id.clone(), e))
        .collect();

    Ok(earlier
        .iter()
        .filter_map(|r| {
            exams.get(&r.exam_id).map(|exam| PreviousExam {
                date: exam.date,
                difficulty: exam.difficulty,
                total_net: r.total_net,
            })
        })
        .collect())
}

pub fn build_request(
    exam: &Exam,
    analytics: &ExamAnalytics,
    standing: Standing,
    result: &ExamResult,
    previous_exams: Vec<PreviousExam>,
) -> AnalysisRequest {
    let subjects = result
        .results_by_subject
        .iter()
        .map(|row| SubjectNet {
            subject_id: row.subject_id.clone(),
            label: row.subject.clone(),
            net: row.net,
        })
        .collect();

    let context_subjects = aggregation::subject_comparisons(result, analytics)
        .into_iter()
        .map(|c| SubjectContext {
            subject_id: c.subject_id,
            label: c.subject,
            student_net: c.student_net,
            class_avg_net: c.class_avg_net,
            delta: c.delta,
        })
        .collect();

    AnalysisRequest {
        student_id: result.student_id.clone(),
        exam_id: exam.id.clone(),
        current_exam: CurrentExam {
            date: exam.date,
            difficulty: exam.difficulty,
            total_net: result.total_net,
            subjects,
        },
        previous_exams,
        difficulty_weights: DifficultyWeights::default(),
        class_context: ClassContext {
            class_avg_total_net: analytics.class_avg_total_net,
            student_rank: standing.rank,
            student_count: standing.student_count,
            percentile: standing.percentile,
            subjects: context_subjects,
        },
    }
}

fn build_report(
    exam: &Exam,
    analytics: &ExamAnalytics,
    result: &ExamResult,
    response: AnalysisResponse,
) -> AnalysisReport {
    let metrics = ReportMetrics {
        student_total_net: result.total_net,
        class_avg_total_net: analytics.class_avg_total_net,
        subject_comparisons: aggregation::subject_comparisons(result, analytics),
        details: response.metrics,
    };

    let mut report = AnalysisReport::new(&exam.id, &result.student_id, &exam.class_id, metrics);
    report.summary = response.summary;
    report.strengths = response.strengths;
    report.weaknesses = response.weaknesses;
    report.recommendations = response.recommendations;
    report.modified_at = Utc::now();
    report
}
