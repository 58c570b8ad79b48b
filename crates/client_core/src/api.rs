use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    domain::{ToolId, ToolRecord, ToolStatus},
    error::ErrorBody,
    protocol::UpdateStatusRequest,
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolApiError {
    #[error("tool {0} not found")]
    NotFound(ToolId),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Network(String),
}

/// The two backend operations the session consumes.
#[async_trait]
pub trait ToolApi: Send + Sync {
    async fn fetch_tool_by_id(&self, id: &ToolId) -> Result<ToolRecord, ToolApiError>;
    async fn update_tool_status(
        &self,
        id: &ToolId,
        status: ToolStatus,
    ) -> Result<ToolRecord, ToolApiError>;
}

pub struct HttpToolApi {
    http: Client,
    base_url: Url,
}

impl HttpToolApi {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("api base url must be hierarchical: {base_url}");
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    fn tool_url(&self, id: &ToolId, trailing: Option<&str>) -> Result<Url, ToolApiError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ToolApiError::Network("invalid api base url".to_string()))?;
            segments.pop_if_empty().push("tools").push(id.as_str());
            if let Some(trailing) = trailing {
                segments.push(trailing);
            }
        }
        Ok(url)
    }
}

fn transport_error(err: reqwest::Error) -> ToolApiError {
    if err.is_timeout() {
        ToolApiError::Network("request timed out".to_string())
    } else if err.is_decode() {
        ToolApiError::Network(format!("unexpected response body: {err}"))
    } else {
        ToolApiError::Network(err.to_string())
    }
}

#[async_trait]
impl ToolApi for HttpToolApi {
    async fn fetch_tool_by_id(&self, id: &ToolId) -> Result<ToolRecord, ToolApiError> {
        let url = self.tool_url(id, None)?;
        debug!(tool_id = %id, "api: fetching tool");
        let res = self.http.get(url).send().await.map_err(transport_error)?;

        match res.status() {
            status if status.is_success() => res.json().await.map_err(transport_error),
            StatusCode::NOT_FOUND => Err(ToolApiError::NotFound(id.clone())),
            status => {
                let body = res.text().await.unwrap_or_default();
                warn!(tool_id = %id, %status, "api: tool fetch failed");
                Err(ToolApiError::Network(format!(
                    "server returned {status}: {}",
                    ErrorBody::render_raw(&body)
                )))
            }
        }
    }

    async fn update_tool_status(
        &self,
        id: &ToolId,
        status: ToolStatus,
    ) -> Result<ToolRecord, ToolApiError> {
        let url = self.tool_url(id, Some("status"))?;
        debug!(tool_id = %id, %status, "api: updating tool status");
        let res = self
            .http
            .put(url)
            .json(&UpdateStatusRequest { status })
            .send()
            .await
            .map_err(transport_error)?;

        match res.status() {
            code if code.is_success() => res.json().await.map_err(transport_error),
            StatusCode::NOT_FOUND => Err(ToolApiError::NotFound(id.clone())),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                let body = res.text().await.unwrap_or_default();
                Err(ToolApiError::Validation(ErrorBody::render_raw(&body)))
            }
            code => {
                let body = res.text().await.unwrap_or_default();
                warn!(tool_id = %id, status = %code, "api: status update failed");
                Err(ToolApiError::Network(format!(
                    "server returned {code}: {}",
                    ErrorBody::render_raw(&body)
                )))
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
