//! HTTP client for a remote workflow store.
//!
//! Speaks the store's REST surface:
//! `GET /api/workflows`, `GET /api/workflows/{id}`,
//! `POST /api/workflows/parse`, `PUT /api/workflows/{id}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::{StoreError, WorkflowStore, WorkflowSummary};
use crate::workflow::Workflow;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Workflow store client backed by a remote REST service.
pub struct HttpWorkflowStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpWorkflowStore {
    /// New client against `base_url` (e.g. `http://localhost:8080`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// New client with an explicit request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Unavailable(format!("invalid store response: {e}")))
    }
}

fn transport_error(err: reqwest::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl WorkflowStore for HttpWorkflowStore {
    async fn list(&self) -> Result<Vec<WorkflowSummary>, StoreError> {
        let response = self
            .client
            .get(self.url("/api/workflows"))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(StoreError::Unavailable(format!(
                "list returned {}",
                response.status()
            )));
        }
        Self::decode(response).await
    }

    async fn fetch(&self, id: &str) -> Result<Workflow, StoreError> {
        let response = self
            .client
            .get(self.url(&format!("/api/workflows/{id}")))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(id.to_string())),
            status if status.is_success() => Self::decode(response).await,
            status => Err(StoreError::Unavailable(format!("fetch returned {status}"))),
        }
    }

    async fn create(&self, request_text: &str) -> Result<String, StoreError> {
        let response = self
            .client
            .post(self.url("/api/workflows/parse"))
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(request_text.to_string())
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => {
                Err(StoreError::ParseFailure(format!(
                    "store rejected booking request ({})",
                    response.status()
                )))
            }
            status if status.is_success() => {
                let workflow: Workflow = Self::decode(response).await?;
                Ok(workflow.id)
            }
            status => Err(StoreError::Unavailable(format!("create returned {status}"))),
        }
    }

    async fn replace(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.url(&format!("/api/workflows/{}", workflow.id)))
            .json(workflow)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(workflow.id.clone())),
            status if status.is_success() => Ok(()),
            status => Err(StoreError::Unavailable(format!("replace returned {status}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let store = HttpWorkflowStore::new("http://localhost:8080/");
        assert_eq!(
            store.url("/api/workflows/w1"),
            "http://localhost:8080/api/workflows/w1"
        );
    }
}
