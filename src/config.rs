use secrecy::SecretString;
use std::env;

use crate::errors::{AppError, AppResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    /// MongoDB replica set; transactions on different exams run in parallel.
    Mongo,
    /// Process-local store for tests and local runs. It holds one lock per
    /// open session, so every transaction in the process runs one at a time
    /// and nothing survives a restart. Not for deployment.
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Mongo => "mongo",
            StoreBackend::Memory => "memory",
        }
    }


    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => StoreBackend::Memory,
            _ => StoreBackend::Mongo,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub store_backend: StoreBackend,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub ai_service_url: String,
    pub ai_service_timeout_secs: u64,
    pub ai_service_api_key: Option<SecretString>,
    pub analysis_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .unwrap_or_else(|_| "mongodb://localhost:27017/?replicaSet=rs0".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME")
                .unwrap_or_else(|_| "exam-engine-local".to_string()),
            store_backend: env::var("STORE_BACKEND")
                .map(|v| StoreBackend::parse(&v))
                .unwrap_or(StoreBackend::Mongo),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: env::var("WEB_SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            ai_service_url: env::var("AI_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            ai_service_timeout_secs: env::var("AI_SERVICE_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(10),
            ai_service_api_key: env::var("AI_SERVICE_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from),
            analysis_concurrency: env::var("ANALYSIS_CONCURRENCY")
                .ok()
                .and_then(|c| c.parse().ok())
                .unwrap_or(4),
        }
    }

    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        reqwest::Url::parse(&self.ai_service_url).map_err(|e| {
            AppError::ValidationError(format!(
                "AI_SERVICE_URL '{}' is not a valid URL: {}",
                self.ai_service_url, e
            ))
        })?;

        if self.analysis_concurrency == 0 {
            return Err(AppError::ValidationError(
                "ANALYSIS_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        if self.ai_service_timeout_secs == 0 {
            return Err(AppError::ValidationError(
                "AI_SERVICE_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: "mongodb://localhost:27017/?replicaSet=rs0".to_string(),
            mongo_db_name: "exam-engine-test".to_string(),
            store_backend: StoreBackend::Memory,
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            ai_service_url: "http://localhost:8000".to_string(),
            ai_service_timeout_secs: 1,
            ai_service_api_key: None,
            analysis_concurrency: 2,
        }
    }
}
