pub mod aggregation;
pub mod analysis_client;
pub mod analysis_orchestrator;
pub mod cascade_service;
pub mod exam_lifecycle;
pub mod exam_result_service;
pub mod exam_service;
pub mod scoring;

use std::future::Future;

use crate::errors::{AppError, AppResult};

/// Runs `attempt` and, if the store reports a transient write conflict, runs
/// it once more. A second conflict is returned to the caller.
pub(crate) async fn retry_on_conflict<T, F, Fut>(operation: &str, mut attempt: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    match attempt().await {
        Err(AppError::TransactionConflict(reason)) => {
            log::warn!("{} hit a write conflict ({}), retrying once", operation, reason);
            attempt().await
        }
        outcome => outcome,
    }
}
