pub mod analysis;
pub mod request;
pub mod response;

pub use analysis::{AnalysisRequest, AnalysisResponse};
pub use request::{AddExamResultRequest, BulkResultRow, CreateExamRequest, FinalizeExamRequest};
pub use response::{
    AnalysisFailure, BulkIngestOutcome, CascadeReport, ExamDetail, FinalizeOutcome,
    MAX_REPORTED_FAILURES,
};
