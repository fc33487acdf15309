#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use mockall::mock;

use exam_engine_server::{
    db::{Collection, EntityStore, InMemoryStore},
    errors::AppResult,
    models::{
        domain::{
            Class, Difficulty, Exam, ExamResult, ExamSubject, Student, Subject, SubjectResult,
            User, UserRole,
        },
        dto::{
            request::SubjectScoreRequest, AddExamResultRequest, AnalysisRequest,
            AnalysisResponse,
        },
    },
    services::{analysis_client::AnalysisClient, scoring::AnswerCounts},
};

mock! {
    pub Analyst {}

    #[async_trait]
    impl AnalysisClient for Analyst {
        async fn analyze(&self, request: &AnalysisRequest) -> AppResult<AnalysisResponse>;
    }
}

pub fn narrative(student_id: &str) -> AnalysisResponse {
    AnalysisResponse {
        summary: format!("Steady work from {}", student_id),
        strengths: vec!["Mathematics".to_string()],
        weaknesses: vec!["Physics".to_string()],
        recommendations: vec!["Review kinematics".to_string()],
        metrics: serde_json::json!({ "trend": "up" }),
    }
}

/// An analyst that answers every request successfully.
pub fn cooperative_analyst() -> MockAnalyst {
    let mut analyst = MockAnalyst::new();
    analyst
        .expect_analyze()
        .returning(|request| Ok(narrative(&request.student_id)));
    analyst
}

pub struct Pupil {
    pub user: User,
    pub student: Student,
}

impl Pupil {
    pub fn id(&self) -> String {
        self.student.id.clone()
    }
}

/// A small school: one class with three students, an empty class, one
/// student enrolled elsewhere and two subjects.
pub struct School {
    pub store: InMemoryStore,
    pub class: Class,
    pub empty_class: Class,
    pub other_class: Class,
    pub math: Subject,
    pub physics: Subject,
    pub pupils: Vec<Pupil>,
    pub outsider: Pupil,
}

impl School {
    pub async fn seed() -> Self {
        let store = InMemoryStore::new();

        let class = Class::new("12-A", 12, "2025-2026");
        let empty_class = Class::new("12-B", 12, "2025-2026");
        let other_class = Class::new("11-A", 11, "2025-2026");
        for c in [&class, &empty_class, &other_class] {
            store.seed(Collection::Classes, c).await.expect("seed class");
        }

        let math = Subject::new("Mathematics");
        let physics = Subject::new("Physics");
        store.seed(Collection::Subjects, &math).await.expect("seed math");
        store.seed(Collection::Subjects, &physics).await.expect("seed physics");

        let mut pupils = Vec::new();
        for name in ["ada", "grace", "alan"] {
            pupils.push(enroll(&store, name, &class.id).await);
        }
        let outsider = enroll(&store, "edsger", &other_class.id).await;

        Self {
            store,
            class,
            empty_class,
            other_class,
            math,
            physics,
            pupils,
            outsider,
        }
    }

    pub fn store(&self) -> Arc<dyn EntityStore> {
        Arc::new(self.store.clone())
    }

    pub fn pupil(&self, index: usize) -> &Pupil {
        &self.pupils[index]
    }

    /// A DRAFT exam over both subjects for `class_id`.
    pub async fn exam_for(&self, class_id: &str) -> Exam {
        let exam = Exam::new_draft(
            "Mock TYT",
            Utc::now() - Duration::days(1),
            Difficulty::Medium,
            class_id,
            vec![
                ExamSubject {
                    subject_id: self.math.id.clone(),
                    question_count: 40,
                },
                ExamSubject {
                    subject_id: self.physics.id.clone(),
                    question_count: 14,
                },
            ],
        );
        self.store
            .seed(Collection::Exams, &exam)
            .await
            .expect("seed exam");
        exam
    }

    pub async fn draft_exam(&self) -> Exam {
        self.exam_for(&self.class.id).await
    }

    /// A manual result request with math and physics counts.
    pub fn scores(&self, student_id: &str, math: (u32, u32, u32), physics: (u32, u32, u32)) -> AddExamResultRequest {
        AddExamResultRequest {
            student_id: student_id.to_string(),
            results_by_subject: vec![
                SubjectScoreRequest {
                    subject_id: self.math.id.clone(),
                    counts: AnswerCounts::new(math.0, math.1, math.2),
                },
                SubjectScoreRequest {
                    subject_id: self.physics.id.clone(),
                    counts: AnswerCounts::new(physics.0, physics.1, physics.2),
                },
            ],
        }
    }

    /// A stored result for an exam that is not under test, dated `days_ago`.
    pub fn past_result(&self, exam_id: &str, student_id: &str, net: f64, days_ago: i64) -> ExamResult {
        let mut result = ExamResult::new(
            exam_id,
            student_id,
            vec![SubjectResult {
                subject_id: self.math.id.clone(),
                subject: self.math.name.clone(),
                correct: 0,
                wrong: 0,
                blank: 0,
                net,
            }],
        );
        result.created_at = Utc::now() - Duration::days(days_ago);
        result
    }

    pub async fn count(&self, collection: Collection) -> usize {
        self.store.count(collection).await
    }
}

pub async fn enroll(store: &InMemoryStore, name: &str, class_id: &str) -> Pupil {
    let user = User::new(name, &format!("{}@school.test", name), UserRole::Student);
    let student = Student::new(&user.id, class_id);
    store.seed(Collection::Users, &user).await.expect("seed user");
    store
        .seed(Collection::Students, &student)
        .await
        .expect("seed student");
    Pupil { user, student }
}
