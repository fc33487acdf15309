use std::sync::Arc;

use crate::{
    config::{Config, StoreBackend},
    db::{Database, EntityStore, InMemoryStore, MongoStore},
    errors::AppResult,
    services::{
        analysis_client::{AnalysisClient, HttpAnalysisClient},
        analysis_orchestrator::AnalysisOrchestrator,
        cascade_service::CascadeService,
        exam_result_service::ExamResultService,
        exam_service::ExamService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub exam_service: Arc<ExamService>,
    pub exam_result_service: Arc<ExamResultService>,
    pub cascade_service: Arc<CascadeService>,
    pub store: Arc<dyn EntityStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let store: Arc<dyn EntityStore> = match config.store_backend {
            StoreBackend::Mongo => {
                let db = Database::connect(&config).await?;
                Arc::new(MongoStore::new(db))
            }
            StoreBackend::Memory => {
                log::warn!(
                    "Using the in-memory store: transactions run one at a time and data is lost on shutdown"
                );
                Arc::new(InMemoryStore::new())
            }
        };
        store.ensure_indexes().await?;

        let analysis_client = Arc::new(HttpAnalysisClient::new(&config)?);
        Ok(Self::from_parts(config, store, analysis_client))
    }

    /// Wires the services over an already-built store and analysis client.
    pub fn from_parts(
        config: Config,
        store: Arc<dyn EntityStore>,
        analysis_client: Arc<dyn AnalysisClient>,
    ) -> Self {
        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            store.clone(),
            analysis_client,
            config.analysis_concurrency,
        ));

        Self {
            exam_service: Arc::new(ExamService::new(store.clone(), orchestrator)),
            exam_result_service: Arc::new(ExamResultService::new(store.clone())),
            cascade_service: Arc::new(CascadeService::new(store.clone())),
            store,
            config: Arc::new(config),
        }
    }
}
