//! Legacy write-back endpoint on a local development server.
//!
//! The endpoint accepts the whole catalog as a JSON POST body and answers
//! `{"success": true}` once it has written the file. Any other answer means
//! "not available here" and the chain moves on.

use async_trait::async_trait;
use herbari_core::environment::Environment;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::error::PersistError;
use crate::strategy::{Attempt, PersistStrategy, SaveOutcome, StrategyKind};

/// Default endpoint path, relative to the origin.
pub const DEFAULT_LEGACY_ENDPOINT: &str = "save_json.php";

#[derive(Debug, Deserialize)]
struct LegacyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

pub struct LegacyEndpointStrategy {
    client: reqwest::Client,
    endpoint: String,
}

impl LegacyEndpointStrategy {
    /// * `endpoint` - Absolute URL, e.g. `http://localhost:8000/save_json.php`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, payload: &str) -> Result<(), PersistError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_owned())
            .send()
            .await?;
        let body: LegacyResponse = Self::parse_response(response).await?;
        if body.success {
            Ok(())
        } else {
            Err(PersistError::NotConfirmed {
                message: body.message,
            })
        }
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PersistError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(PersistError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl PersistStrategy for LegacyEndpointStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LegacyEndpoint
    }

    fn is_applicable(&self, environment: &Environment) -> bool {
        environment.legacy_endpoint_eligible()
    }

    async fn attempt(&self, payload: &str) -> Attempt {
        match self.post(payload).await {
            Ok(()) => Attempt::Saved(SaveOutcome::LegacyEndpoint {
                endpoint: self.endpoint.clone(),
            }),
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Legacy endpoint unavailable");
                Attempt::Fallthrough(e.to_string())
            }
        }
    }
}
