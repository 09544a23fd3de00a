//! `EnricherClient` — the external LLM narrative service contract.
//!
//! Failures here must never block the core pipeline (spec §4.9); callers
//! are expected to treat `Err` as "retry out-of-band and log", never as a
//! reason to roll back a capture.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use sitewatch_core::errors::{ErrorKind, Result, WatchError};
use sitewatch_core_types::{ChangeType, Severity};

#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentRequest {
    pub target_name: String,
    pub url: String,
    pub change_type: ChangeType,
    pub severity: Severity,
    pub sections: Vec<SectionExcerpt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionExcerpt {
    pub section_type: String,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentResponse {
    pub summary: String,
    #[serde(default)]
    pub impact: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub urgency: Urgency,
    #[serde(default)]
    pub insights: serde_json::Value,
}

#[async_trait]
pub trait EnricherClient: Send + Sync {
    async fn enrich(&self, request: EnrichmentRequest) -> Result<EnrichmentResponse>;
}

/// Extracts the first balanced `{...}` region from `text` and parses it as
/// JSON, tolerating a model response that isn't strict JSON (e.g. wrapped
/// in prose or a markdown code fence).
fn extract_balanced_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

pub struct HttpEnricherClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpEnricherClient {
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client configuration is valid");
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl EnricherClient for HttpEnricherClient {
    async fn enrich(&self, request: EnrichmentRequest) -> Result<EnrichmentResponse> {
        let response = self
            .http
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                WatchError::new(ErrorKind::EnrichmentFailure)
                    .with_op("enricher_http_call")
                    .with_message(e.to_string())
            })?;

        let body = response.text().await.map_err(|e| {
            WatchError::new(ErrorKind::EnrichmentFailure)
                .with_op("enricher_http_call")
                .with_message(e.to_string())
        })?;

        let json_slice = extract_balanced_json(&body).unwrap_or(body.as_str());
        serde_json::from_str(json_slice).map_err(|e| {
            WatchError::new(ErrorKind::EnrichmentFailure)
                .with_op("enricher_http_call")
                .with_message(format!("could not parse enrichment response: {e}"))
        })
    }
}

/// Offline test double: never calls out, always fails with
/// `EnrichmentFailure` so callers exercise their non-blocking failure path.
pub struct NoopEnricherClient;

#[async_trait]
impl EnricherClient for NoopEnricherClient {
    async fn enrich(&self, _request: EnrichmentRequest) -> Result<EnrichmentResponse> {
        Err(WatchError::new(ErrorKind::EnrichmentFailure)
            .with_op("enrich")
            .with_message("no enricher configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_balanced_json_strips_surrounding_prose() {
        let text = "Sure, here you go:\n```json\n{\"summary\": \"ok\"}\n```";
        let json = extract_balanced_json(text).unwrap();
        assert_eq!(json, "{\"summary\": \"ok\"}");
    }

    #[test]
    fn extract_balanced_json_handles_nested_braces() {
        let text = "{\"a\": {\"b\": 1}} trailing";
        let json = extract_balanced_json(text).unwrap();
        assert_eq!(json, "{\"a\": {\"b\": 1}}");
    }

    #[tokio::test]
    async fn noop_client_always_fails_without_blocking() {
        let client = NoopEnricherClient;
        let request = EnrichmentRequest {
            target_name: "Example".to_string(),
            url: "https://ex.test".to_string(),
            change_type: ChangeType::Pricing,
            severity: Severity::High,
            sections: vec![],
        };
        let result = client.enrich(request).await;
        assert!(result.is_err());
    }
}
