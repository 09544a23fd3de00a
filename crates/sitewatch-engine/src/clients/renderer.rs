//! `RendererClient` — the external headless-browser service contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use sitewatch_core::errors::{ErrorKind, Result, WatchError};

#[derive(Debug, Clone, Serialize)]
pub struct RenderRequest {
    pub url: String,
    pub wait_ms: u64,
    pub viewport_w: u32,
    pub viewport_h: u32,
    pub remove_scripts: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderResponse {
    pub html: String,
    pub title: Option<String>,
}

#[async_trait]
pub trait RendererClient: Send + Sync {
    async fn render(&self, request: RenderRequest) -> Result<RenderResponse>;
}

/// Bearer-authenticated HTTP implementation. Accepts either a JSON body of
/// the shape `{html, title?}` or a raw HTML response body.
pub struct HttpRendererClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRendererClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: std::time::Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client configuration is valid");
        Self {
            http,
            base_url: base_url.into(),
            token,
        }
    }
}

#[async_trait]
impl RendererClient for HttpRendererClient {
    async fn render(&self, request: RenderRequest) -> Result<RenderResponse> {
        let mut req = self.http.post(&self.base_url).json(&request);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await.map_err(|e| {
            WatchError::new(ErrorKind::RenderUnavailable)
                .with_op("renderer_http_call")
                .with_message(e.to_string())
        })?;

        if !response.status().is_success() {
            return Err(WatchError::new(ErrorKind::RenderUnavailable)
                .with_op("renderer_http_call")
                .with_message(format!("renderer returned status {}", response.status())));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response.text().await.map_err(|e| {
            WatchError::new(ErrorKind::RenderUnavailable)
                .with_op("renderer_http_call")
                .with_message(e.to_string())
        })?;

        if content_type.contains("application/json") {
            serde_json::from_str::<RenderResponse>(&body).map_err(|e| {
                WatchError::new(ErrorKind::RenderUnavailable)
                    .with_op("renderer_http_call")
                    .with_message(format!("invalid renderer response json: {e}"))
            })
        } else {
            Ok(RenderResponse {
                html: body,
                title: None,
            })
        }
    }
}

/// Test double that returns pre-seeded HTML, used by the CLI's manual
/// capture path when an operator supplies HTML inline instead of invoking
/// a live renderer.
pub struct StaticRendererClient {
    html: String,
    title: Option<String>,
}

impl StaticRendererClient {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[async_trait]
impl RendererClient for StaticRendererClient {
    async fn render(&self, _request: RenderRequest) -> Result<RenderResponse> {
        Ok(RenderResponse {
            html: self.html.clone(),
            title: self.title.clone(),
        })
    }
}

/// Fallback used when no renderer base URL is configured. Always fails
/// with `RenderUnavailable` so the scheduler's retry/backoff path is
/// exercised the same way a genuinely unreachable service would.
pub struct UnconfiguredRendererClient;

#[async_trait]
impl RendererClient for UnconfiguredRendererClient {
    async fn render(&self, _request: RenderRequest) -> Result<RenderResponse> {
        Err(WatchError::new(ErrorKind::RenderUnavailable)
            .with_op("render")
            .with_message("no renderer_url configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_client_always_fails() {
        let client = UnconfiguredRendererClient;
        let result = client
            .render(RenderRequest {
                url: "https://ex.test".to_string(),
                wait_ms: 0,
                viewport_w: 1280,
                viewport_h: 720,
                remove_scripts: true,
            })
            .await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::RenderUnavailable);
    }

    #[tokio::test]
    async fn static_client_returns_seeded_html() {
        let client = StaticRendererClient::new("<html></html>").with_title("Example");
        let response = client
            .render(RenderRequest {
                url: "https://ex.test".to_string(),
                wait_ms: 0,
                viewport_w: 1280,
                viewport_h: 720,
                remove_scripts: true,
            })
            .await
            .unwrap();
        assert_eq!(response.html, "<html></html>");
        assert_eq!(response.title.as_deref(), Some("Example"));
    }
}
