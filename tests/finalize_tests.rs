mod common;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Notify;

use common::{cooperative_analyst, narrative, MockAnalyst, School};
use exam_engine_server::{
    db::Collection,
    errors::{AppError, AppResult},
    models::{
        domain::{AnalysisReport, Difficulty, Exam, ExamStatus},
        dto::{AnalysisRequest, AnalysisResponse, FinalizeExamRequest},
    },
    repositories,
    services::{
        analysis_client::AnalysisClient, analysis_orchestrator::AnalysisOrchestrator,
        cascade_service::CascadeService, exam_result_service::ExamResultService,
        exam_service::ExamService,
    },
};

struct Harness {
    school: School,
    results: ExamResultService,
    exams: ExamService,
    orchestrator: Arc<AnalysisOrchestrator>,
}

impl Harness {
    async fn new(analyst: MockAnalyst) -> Self {
        Self::with_client(School::seed().await, Arc::new(analyst))
    }

    /// Analysis runs with two students in flight.
    fn with_client(school: School, client: Arc<dyn AnalysisClient>) -> Self {
        let orchestrator = Arc::new(AnalysisOrchestrator::new(school.store(), client, 2));
        Self {
            results: ExamResultService::new(school.store()),
            exams: ExamService::new(school.store(), orchestrator.clone()),
            orchestrator,
            school,
        }
    }

    /// A RESULT_ENTRY exam with the given (math correct, physics correct)
    /// per pupil, in pupil order.
    async fn exam_with_results(&self, correct: &[(u32, u32)]) -> Exam {
        let exam = self.school.draft_exam().await;
        for (i, (math, physics)) in correct.iter().enumerate() {
            self.results
                .add_result(
                    &exam.id,
                    &self.school.scores(&self.school.pupil(i).id(), (*math, 0, 0), (*physics, 0, 0)),
                )
                .await
                .expect("add result");
        }
        exam
    }

    async fn stored_exam(&self, exam_id: &str) -> Exam {
        let mut session = self.school.store().begin().await.expect("session");
        let exam: Option<Exam> = repositories::find_by_id(session.as_mut(), exam_id)
            .await
            .expect("read exam");
        exam.expect("exam exists")
    }
}

/// Holds the `waiting` student's call until the `opener` student has been
/// started, and fails the `failing` students once their call completes.
struct GatedAnalyst {
    waiting: String,
    opener: String,
    failing: Vec<String>,
    gate: Notify,
    completed: Mutex<Vec<String>>,
}

#[async_trait]
impl AnalysisClient for GatedAnalyst {
    async fn analyze(&self, request: &AnalysisRequest) -> AppResult<AnalysisResponse> {
        if request.student_id == self.opener {
            self.gate.notify_one();
        }
        if request.student_id == self.waiting {
            self.gate.notified().await;
        }
        self.completed
            .lock()
            .expect("lock")
            .push(request.student_id.clone());

        if self.failing.contains(&request.student_id) {
            Err(AppError::UpstreamFailure(format!(
                "analysis of {} failed",
                request.student_id
            )))
        } else {
            Ok(narrative(&request.student_id))
        }
    }
}

/// Deletes the exam under analysis during its first call, then answers
/// normally.
struct ExamDeletingAnalyst {
    cascade: CascadeService,
    deleted: AtomicBool,
}

#[async_trait]
impl AnalysisClient for ExamDeletingAnalyst {
    async fn analyze(&self, request: &AnalysisRequest) -> AppResult<AnalysisResponse> {
        if !self.deleted.swap(true, Ordering::SeqCst) {
            self.cascade.delete_exam(&request.exam_id).await?;
        }
        Ok(narrative(&request.student_id))
    }
}

fn by(actor: &str) -> FinalizeExamRequest {
    FinalizeExamRequest {
        finalized_by: Some(actor.to_string()),
    }
}

#[tokio::test]
async fn finalizing_a_draft_exam_is_invalid() {
    let harness = Harness::new(MockAnalyst::new()).await;
    let exam = harness.school.draft_exam().await;

    let outcome = harness.exams.finalize(&exam.id, &by("admin")).await;

    assert!(matches!(outcome, Err(AppError::InvalidState(_))));
    assert_eq!(harness.stored_exam(&exam.id).await.status, ExamStatus::Draft);
}

#[tokio::test]
async fn finalizing_without_results_is_no_results() {
    let harness = Harness::new(MockAnalyst::new()).await;
    let exam = harness.exam_with_results(&[(10, 5)]).await;
    let only = harness.results.list_results(&exam.id).await.expect("list");
    harness.results.delete_result(&only[0].id).await.expect("delete");

    let outcome = harness.exams.finalize(&exam.id, &by("admin")).await;

    assert!(matches!(outcome, Err(AppError::NoResults(_))));
    let stored = harness.stored_exam(&exam.id).await;
    assert_eq!(stored.status, ExamStatus::ResultEntry);
    assert!(stored.analytics.is_none());
}

#[tokio::test]
async fn finalize_stores_analytics_and_analyzes_every_student() {
    let harness = Harness::new(cooperative_analyst()).await;
    let exam = harness.exam_with_results(&[(30, 0), (20, 4), (10, 0)]).await;

    let outcome = harness
        .exams
        .finalize(&exam.id, &by("admin-7"))
        .await
        .expect("finalize");

    assert_eq!(outcome.student_count, 3);
    assert_eq!(outcome.analysis_ok, 3);
    assert_eq!(outcome.analysis_failed, 0);
    assert!(outcome.failures.is_empty());

    let stored = harness.stored_exam(&exam.id).await;
    assert_eq!(stored.status, ExamStatus::Finalized);
    assert_eq!(stored.finalized_by.as_deref(), Some("admin-7"));
    assert!(stored.finalized_at.is_some());
    let analytics = stored.analytics.expect("analytics");
    assert_eq!(analytics.student_count, 3);
    assert_eq!(analytics.class_avg_total_net, 64.0 / 3.0);
    assert_eq!(analytics.subject_averages[0].subject, "Mathematics");
    assert_eq!(analytics.subject_averages[0].avg_net, 20.0);
    assert_eq!(analytics.subject_averages[1].avg_net, 4.0 / 3.0);

    assert_eq!(harness.school.count(Collection::AnalysisReports).await, 3);
    let report = harness
        .exams
        .get_report(&exam.id, &harness.school.pupil(0).id())
        .await
        .expect("report");
    assert_eq!(report.class_id, harness.school.class.id);
    assert_eq!(report.summary, format!("Steady work from {}", harness.school.pupil(0).id()));
    assert_eq!(report.metrics.student_total_net, 30.0);
    assert_eq!(report.metrics.details["trend"], "up");
}

#[tokio::test]
async fn second_finalize_is_invalid_and_results_are_frozen() {
    let harness = Harness::new(cooperative_analyst()).await;
    let exam = harness.exam_with_results(&[(30, 0), (20, 0)]).await;
    harness.exams.finalize(&exam.id, &by("admin")).await.expect("first finalize");
    let existing = harness.results.list_results(&exam.id).await.expect("list");

    let again = harness.exams.finalize(&exam.id, &by("admin")).await;
    let add = harness
        .results
        .add_result(&exam.id, &harness.school.scores(&harness.school.pupil(2).id(), (1, 0, 0), (1, 0, 0)))
        .await;
    let delete = harness.results.delete_result(&existing[0].id).await;

    assert!(matches!(again, Err(AppError::InvalidState(_))));
    assert!(matches!(add, Err(AppError::InvalidState(_))));
    assert!(matches!(delete, Err(AppError::InvalidState(_))));
    assert_eq!(harness.school.count(Collection::ExamResults).await, 2);
}

#[tokio::test]
async fn one_failing_analysis_does_not_block_the_others() {
    let mut analyst = MockAnalyst::new();
    let failing = Arc::new(Mutex::new(String::new()));
    let failing_id = failing.clone();
    analyst.expect_analyze().times(2).returning(move |request| {
        if *failing_id.lock().expect("lock") == request.student_id {
            Err(AppError::UpstreamFailure("analysis service timed out".to_string()))
        } else {
            Ok(narrative(&request.student_id))
        }
    });
    let harness = Harness::new(analyst).await;
    let student_a = harness.school.pupil(0).id();
    let student_b = harness.school.pupil(1).id();
    *failing.lock().expect("lock") = student_a.clone();
    let exam = harness.exam_with_results(&[(30, 0), (20, 0)]).await;

    let outcome = harness
        .exams
        .finalize(&exam.id, &by("admin"))
        .await
        .expect("finalize still succeeds");

    assert_eq!(outcome.analysis_ok, 1);
    assert_eq!(outcome.analysis_failed, 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].student_id, student_a);
    assert!(outcome.failures[0].error.contains("timed out"));

    assert_eq!(harness.stored_exam(&exam.id).await.status, ExamStatus::Finalized);
    assert!(harness.exams.get_report(&exam.id, &student_b).await.is_ok());
    assert!(matches!(
        harness.exams.get_report(&exam.id, &student_a).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn rerunning_analysis_replaces_reports() {
    let harness = Harness::new(cooperative_analyst()).await;
    let exam = harness.exam_with_results(&[(30, 0), (20, 0)]).await;
    harness.exams.finalize(&exam.id, &by("admin")).await.expect("finalize");
    let first: AnalysisReport = harness
        .exams
        .get_report(&exam.id, &harness.school.pupil(0).id())
        .await
        .expect("report");

    let finalized = harness.stored_exam(&exam.id).await;
    let results = harness.results.list_results(&exam.id).await.expect("list");
    let run = harness.orchestrator.run(&finalized, &results).await;

    assert_eq!(run.succeeded, 2);
    assert_eq!(harness.school.count(Collection::AnalysisReports).await, 2);
    let second = harness
        .exams
        .get_report(&exam.id, &harness.school.pupil(0).id())
        .await
        .expect("report");
    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert!(second.modified_at >= first.modified_at);
}

#[tokio::test]
async fn payload_carries_history_and_class_context() {
    let captured: Arc<Mutex<Vec<AnalysisRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    let mut analyst = MockAnalyst::new();
    analyst.expect_analyze().returning(move |request| {
        sink.lock().expect("lock").push(request.clone());
        Ok(narrative(&request.student_id))
    });
    let harness = Harness::new(analyst).await;
    let ada = harness.school.pupil(0).id();

    // Seven earlier exams; only the five most recent are sent.
    for days_ago in 2..9 {
        let mut earlier = Exam::new_draft(
            &format!("Mock -{}", days_ago),
            chrono::Utc::now() - chrono::Duration::days(days_ago),
            if days_ago == 2 { Difficulty::Hard } else { Difficulty::Easy },
            &harness.school.class.id,
            Vec::new(),
        );
        earlier.status = ExamStatus::Finalized;
        harness
            .school
            .store
            .seed(Collection::Exams, &earlier)
            .await
            .expect("seed exam");
        let result = harness
            .school
            .past_result(&earlier.id, &ada, days_ago as f64, days_ago);
        harness
            .school
            .store
            .seed(Collection::ExamResults, &result)
            .await
            .expect("seed result");
    }

    let exam = harness.exam_with_results(&[(30, 0), (20, 0), (10, 0)]).await;
    harness.exams.finalize(&exam.id, &by("admin")).await.expect("finalize");

    let requests = captured.lock().expect("lock").clone();
    assert_eq!(requests.len(), 3);
    let request = requests
        .iter()
        .find(|r| r.student_id == ada)
        .expect("ada request");

    assert_eq!(request.exam_id, exam.id);
    assert_eq!(request.current_exam.total_net, 30.0);
    assert_eq!(request.current_exam.subjects.len(), 2);
    assert_eq!(request.previous_exams.len(), 5);
    let history: Vec<f64> = request.previous_exams.iter().map(|p| p.total_net).collect();
    assert_eq!(history, vec![2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(request.previous_exams[0].difficulty, Difficulty::Hard);

    assert_eq!(request.class_context.student_rank, 1);
    assert_eq!(request.class_context.student_count, 3);
    assert_eq!(request.class_context.percentile, 67);
    assert_eq!(request.class_context.class_avg_total_net, 20.0);
    assert_eq!(request.class_context.subjects[0].delta, 10.0);
    assert_eq!(request.difficulty_weights.medium, 1.0);

    let grace = requests
        .iter()
        .find(|r| r.student_id == harness.school.pupil(1).id())
        .expect("grace request");
    assert!(grace.previous_exams.is_empty());
}

#[tokio::test]
async fn slow_student_does_not_hold_up_free_slots() {
    let school = School::seed().await;
    let ids: Vec<String> = (0..3).map(|i| school.pupil(i).id()).collect();
    let analyst = Arc::new(GatedAnalyst {
        waiting: ids[0].clone(),
        opener: ids[2].clone(),
        failing: vec![ids[0].clone(), ids[1].clone()],
        gate: Notify::new(),
        completed: Mutex::new(Vec::new()),
    });
    let harness = Harness::with_client(school, analyst.clone());
    let exam = harness.exam_with_results(&[(30, 0), (20, 0), (10, 0)]).await;

    // The first student only finishes once the third has been started, which
    // needs the slot freed by the second while the first is still out.
    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        harness.exams.finalize(&exam.id, &by("admin")),
    )
    .await
    .expect("third student started while the first was still running")
    .expect("finalize");

    assert_eq!(outcome.analysis_ok, 1);
    assert_eq!(outcome.analysis_failed, 2);
    let completed = analyst.completed.lock().expect("lock").clone();
    assert_eq!(completed, vec![ids[1].clone(), ids[2].clone(), ids[0].clone()]);
    let failed: Vec<&str> = outcome
        .failures
        .iter()
        .map(|f| f.student_id.as_str())
        .collect();
    assert_eq!(failed, vec![ids[0].as_str(), ids[1].as_str()]);
    assert!(harness.exams.get_report(&exam.id, &ids[2]).await.is_ok());
}

#[tokio::test]
async fn exam_deleted_during_analysis_leaves_no_reports() {
    let school = School::seed().await;
    let analyst = Arc::new(ExamDeletingAnalyst {
        cascade: CascadeService::new(school.store()),
        deleted: AtomicBool::new(false),
    });
    let harness = Harness::with_client(school, analyst);
    let exam = harness.exam_with_results(&[(30, 0), (20, 0), (10, 0)]).await;

    let outcome = harness
        .exams
        .finalize(&exam.id, &by("admin"))
        .await
        .expect("finalize committed before the delete");

    assert_eq!(outcome.student_count, 3);
    assert_eq!(outcome.analysis_ok, 0);
    assert_eq!(outcome.analysis_failed, 3);
    assert!(outcome
        .failures
        .iter()
        .all(|f| f.error.starts_with("Not found")));
    assert_eq!(harness.school.count(Collection::Exams).await, 0);
    assert_eq!(harness.school.count(Collection::ExamResults).await, 0);
    assert_eq!(harness.school.count(Collection::AnalysisReports).await, 0);
}

#[tokio::test]
async fn reports_are_not_written_for_an_exam_still_taking_results() {
    let harness = Harness::new(cooperative_analyst()).await;
    let exam = harness.exam_with_results(&[(30, 0), (20, 0)]).await;
    let open_exam = harness.stored_exam(&exam.id).await;
    let results = harness.results.list_results(&exam.id).await.expect("list");

    let run = harness.orchestrator.run(&open_exam, &results).await;

    assert_eq!(run.succeeded, 0);
    assert_eq!(run.failed, 2);
    assert!(run.failures[0].error.starts_with("Invalid state"));
    assert_eq!(harness.school.count(Collection::AnalysisReports).await, 0);
}
