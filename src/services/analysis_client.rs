use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use validator::Validate;

use crate::{
    config::Config,
    errors::{AppError, AppResult},
    models::dto::{AnalysisRequest, AnalysisResponse},
};

/// The external service that turns one student's numbers into a narrative.
/// Every failure it reports is an `UpstreamFailure`.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> AppResult<AnalysisResponse>;
}

pub struct HttpAnalysisClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl HttpAnalysisClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ai_service_timeout_secs))
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/analyze-exam", config.ai_service_url.trim_end_matches('/')),
            api_key: config.ai_service_api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn analyze(&self, request: &AnalysisRequest) -> AppResult<AnalysisResponse> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                AppError::UpstreamFailure(format!("Analysis service request failed: {}", e))
            })?;

        let analysis: AnalysisResponse = response.json().await.map_err(|e| {
            AppError::UpstreamFailure(format!("Analysis service returned an unusable body: {}", e))
        })?;

        analysis.validate().map_err(|e| {
            AppError::UpstreamFailure(format!("Analysis service response is invalid: {}", e))
        })?;

        Ok(analysis)
    }
}
