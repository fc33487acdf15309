pub mod analysis_report;
pub mod curriculum;
pub mod exam;
pub mod exam_result;
pub mod people;

pub use analysis_report::{AnalysisReport, ReportMetrics, SubjectComparison};
pub use curriculum::{Class, CoverageStatus, Subject, Topic, TopicCoverage};
pub use exam::{Difficulty, Exam, ExamAnalytics, ExamStatus, ExamSubject, SubjectAverage};
pub use exam_result::{ExamResult, SubjectResult};
pub use people::{Student, TeacherAssignment, TeacherProfile, User, UserRole};
