use std::fmt;

/// Every persisted collection, with the unique keys the store must enforce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Classes,
    Subjects,
    Topics,
    TopicCoverages,
    TeacherAssignments,
    TeacherProfiles,
    Users,
    Students,
    Exams,
    ExamResults,
    AnalysisReports,
}

impl Collection {
    pub const ALL: [Collection; 11] = [
        Collection::Classes,
        Collection::Subjects,
        Collection::Topics,
        Collection::TopicCoverages,
        Collection::TeacherAssignments,
        Collection::TeacherProfiles,
        Collection::Users,
        Collection::Students,
        Collection::Exams,
        Collection::ExamResults,
        Collection::AnalysisReports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Classes => "classes",
            Collection::Subjects => "subjects",
            Collection::Topics => "topics",
            Collection::TopicCoverages => "topic_coverages",
            Collection::TeacherAssignments => "teacher_assignments",
            Collection::TeacherProfiles => "teacher_profiles",
            Collection::Users => "users",
            Collection::Students => "students",
            Collection::Exams => "exams",
            Collection::ExamResults => "exam_results",
            Collection::AnalysisReports => "analysis_reports",
        }
    }

    /// Compound unique keys in addition to the `id` key every collection carries.
    pub fn unique_keys(&self) -> &'static [&'static [&'static str]] {
        match self {
            Collection::Classes => &[&["year", "name"]],
            Collection::Subjects => &[&["name"]],
            Collection::Topics => &[&["subject_id", "grade_level", "name"]],
            Collection::TopicCoverages => &[&["class_id", "topic_id"]],
            Collection::TeacherAssignments => &[&["class_id", "subject_id"]],
            Collection::TeacherProfiles => &[&["user_id"]],
            Collection::Users => &[&["email"]],
            Collection::Students => &[&["user_id"]],
            Collection::Exams => &[],
            Collection::ExamResults => &[&["exam_id", "student_id"]],
            Collection::AnalysisReports => &[&["exam_id", "student_id"]],
        }
    }

    /// Non-unique lookup keys used by cascades and history queries.
    pub fn lookup_keys(&self) -> &'static [&'static str] {
        match self {
            Collection::Topics => &["subject_id"],
            Collection::TopicCoverages => &["subject_id", "topic_id"],
            Collection::TeacherAssignments => &["teacher_id"],
            Collection::Students => &["class_id"],
            Collection::Exams => &["class_id", "status"],
            Collection::ExamResults => &["student_id"],
            _ => &[],
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
