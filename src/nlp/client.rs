//! Client for the remote medical-NLP entity extraction service
//!
//! Transport failures never surface to callers: every public method
//! degrades to an empty result and logs the error, so a down NLP service
//! shrinks the pipeline's output instead of failing documents.

use crate::config::NlpConfig;
use crate::domain::entity::{ClinicalSummary, MedicalEntity};
use crate::domain::errors::NlpError;
use crate::nlp::models::{AnalyzeRequest, AnalyzeResponse, ExtractByTypeRequest};
use crate::phi::matcher::PatternMatcher;
use crate::phi::masking::mask_all;
use rand::Rng;
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use std::time::Duration;

/// Entity extraction client
///
/// Wire contract:
/// - `POST {base}/analyze` body `{text, enrich}` -> `{entities: [...]}`
/// - `POST {base}/extract-by-type` body `{text, types}` -> same shape
/// - `GET {base}/health` -> 200 when available
///
/// Analyze calls are idempotent and retried up to the configured maximum
/// with exponential backoff and jitter; health checks get one attempt.
pub struct EntityExtractionClient {
    base_url: String,
    client: Client,
    health_client: Client,
    config: NlpConfig,
    /// Used to mask PHI out of any logged body preview
    log_masker: Option<PatternMatcher>,
}

impl EntityExtractionClient {
    /// Create a new client from configuration
    pub fn new(config: NlpConfig) -> Self {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.analyze_timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        let health_client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.health_timeout_seconds))
            .connect_timeout(Duration::from_secs(config.health_timeout_seconds))
            .build()
            .expect("Failed to build HTTP client");

        let log_masker = match PatternMatcher::new() {
            Ok(masker) => Some(masker),
            Err(e) => {
                tracing::warn!(error = %e, "Log masker unavailable, body previews disabled");
                None
            }
        };

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            health_client,
            config,
            log_masker,
        }
    }

    /// Extract medical entities from a text
    ///
    /// Entities are enriched locally with review/priority flags and an
    /// administrative usage hint. On any transport failure or invalid
    /// response this returns an empty list and logs the error.
    pub async fn extract_entities(
        &self,
        text: &str,
        enrich: bool,
        filter_types: Option<&[String]>,
    ) -> Vec<MedicalEntity> {
        match self.try_extract(text, enrich, filter_types).await {
            Ok(entities) => entities,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    text_len = text.chars().count(),
                    "Entity extraction failed, returning empty result"
                );
                Vec::new()
            }
        }
    }

    /// Extract medical entities, surfacing transport failures
    ///
    /// Used by the document pipeline, which records the failure as a
    /// processing warning and continues with an empty entity list.
    pub async fn try_extract(
        &self,
        text: &str,
        enrich: bool,
        filter_types: Option<&[String]>,
    ) -> Result<Vec<MedicalEntity>, NlpError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut entities = self.analyze(text, enrich).await?;
        if let Some(types) = filter_types {
            let wanted: Vec<String> = types.iter().map(|t| t.to_uppercase()).collect();
            entities.retain(|e| wanted.contains(&e.entity_type.to_uppercase()));
        }
        Ok(entities)
    }

    /// Extract entities of specific types
    ///
    /// Tries the service's `/extract-by-type` endpoint first; on a non-200
    /// response falls back to filtering the general `/analyze` result
    /// locally.
    pub async fn extract_by_type(&self, text: &str, types: &[String]) -> Vec<MedicalEntity> {
        if text.trim().is_empty() || types.is_empty() {
            return Vec::new();
        }

        let url = format!("{}/extract-by-type", self.base_url);
        let request = ExtractByTypeRequest { text, types };

        match self.post_entities(&url, &request).await {
            Ok(entities) => entities,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "extract-by-type failed, falling back to local filtering"
                );
                self.extract_entities(text, true, Some(types)).await
            }
        }
    }

    /// Categorize a text's entities into the clinical summary buckets
    pub async fn clinical_summary(&self, text: &str) -> ClinicalSummary {
        let entities = self.extract_entities(text, true, None).await;
        ClinicalSummary::from_entities(&entities)
    }

    /// Check whether the service is reachable and healthy
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        let mut request = self.health_client.get(&url);
        if let Some(auth) = self.auth_header_value() {
            request = request.header("Authorization", auth);
        }

        match request.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "NLP health check failed");
                false
            }
        }
    }

    /// Analyze with retries
    async fn analyze(&self, text: &str, enrich: bool) -> Result<Vec<MedicalEntity>, NlpError> {
        let url = format!("{}/analyze", self.base_url);
        let request = AnalyzeRequest { text, enrich };

        let max_retries = self.config.retry.max_retries.max(1);
        let mut attempt = 0;

        loop {
            match self.post_entities(&url, &request).await {
                Ok(entities) => return Ok(entities),
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries || !is_retryable(&e) {
                        return Err(e);
                    }

                    let delay_ms = self.backoff_delay_ms(attempt);
                    tracing::warn!(
                        attempt = attempt,
                        max_retries = max_retries,
                        delay_ms = delay_ms,
                        error = %e,
                        "Retrying analyze request after error"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }

    /// POST a request and decode the shared entity response shape
    async fn post_entities<B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Vec<MedicalEntity>, NlpError> {
        let mut request = self.client.post(url).json(body);
        if let Some(auth) = self.auth_header_value() {
            request = request.header("Authorization", auth);
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                NlpError::Timeout(e.to_string())
            } else {
                NlpError::ConnectionFailed(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            // Response bodies can echo submitted text; mask before logging.
            tracing::debug!(
                status = status.as_u16(),
                body = %self.sanitize_for_log(&message),
                "NLP service returned an error response"
            );
            return Err(if status.is_server_error() {
                NlpError::ServerError {
                    status: status.as_u16(),
                    message: "server error".to_string(),
                }
            } else {
                NlpError::ClientError {
                    status: status.as_u16(),
                    message: "client error".to_string(),
                }
            });
        }

        let body: AnalyzeResponse = resp
            .json()
            .await
            .map_err(|e| NlpError::InvalidResponse(e.to_string()))?;

        Ok(body
            .entities
            .into_iter()
            .map(|e| MedicalEntity::enriched(e.text, e.entity_type, e.start, e.end, e.score))
            .collect())
    }

    fn auth_header_value(&self) -> Option<String> {
        self.config
            .api_key
            .as_ref()
            .map(|key| format!("Bearer {}", key.expose_secret()))
    }

    /// Exponential backoff with up to 25% random jitter
    fn backoff_delay_ms(&self, attempt: usize) -> u64 {
        let retry = &self.config.retry;
        let base = retry.initial_delay_ms as f64
            * retry.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let capped = base.min(retry.max_delay_ms as f64);
        let jitter = rand::thread_rng().gen_range(0.0..0.25);
        (capped * (1.0 + jitter)) as u64
    }

    /// Mask PHI patterns out of a string before it reaches any log sink
    fn sanitize_for_log(&self, body: &str) -> String {
        const PREVIEW_LIMIT: usize = 256;
        let preview: String = body.chars().take(PREVIEW_LIMIT).collect();
        match self.log_masker {
            Some(ref masker) => match masker.detect(&preview) {
                Ok(detections) => mask_all(&preview, &detections, '*'),
                Err(_) => "[unsanitizable]".to_string(),
            },
            None => "[preview disabled]".to_string(),
        }
    }
}

/// Whether an analyze failure is worth retrying
fn is_retryable(error: &NlpError) -> bool {
    matches!(
        error,
        NlpError::ConnectionFailed(_) | NlpError::Timeout(_) | NlpError::ServerError { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;

    fn client_for(url: &str) -> EntityExtractionClient {
        EntityExtractionClient::new(NlpConfig {
            base_url: url.to_string(),
            api_key: None,
            analyze_timeout_seconds: 5,
            health_timeout_seconds: 2,
            retry: RetryConfig {
                max_retries: 2,
                initial_delay_ms: 10,
                max_delay_ms: 50,
                backoff_multiplier: 2.0,
            },
        })
    }

    const ENTITY_BODY: &str = r#"{"entities":[
        {"text":"metformin","type":"CHEMICAL","start":21,"end":30,"score":0.98},
        {"text":"type 2 diabetes","type":"DISEASE","start":35,"end":50}
    ]}"#;

    #[tokio::test]
    async fn test_extract_entities_enriches() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/analyze")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ENTITY_BODY)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let entities = client
            .extract_entities("Patient prescribed metformin for type 2 diabetes", true, None)
            .await;

        mock.assert_async().await;
        assert_eq!(entities.len(), 2);
        assert!(entities[0].requires_review);
        assert!(entities[0].is_high_priority);
        assert!(entities[0].usage_hint.is_some());
    }

    #[tokio::test]
    async fn test_extract_entities_filters_types() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/analyze")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ENTITY_BODY)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let entities = client
            .extract_entities("text", true, Some(&["disease".to_string()]))
            .await;
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].entity_type, "DISEASE");
    }

    #[tokio::test]
    async fn test_unreachable_service_returns_empty() {
        let client = client_for("http://127.0.0.1:1");
        let entities = client.extract_entities("some clinical text", true, None).await;
        assert!(entities.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_returns_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/analyze")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not json")
            .create_async()
            .await;

        let client = client_for(&server.url());
        assert!(client.extract_entities("text", true, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/analyze")
            .with_status(422)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server.url());
        assert!(client.extract_entities("text", true, None).await.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/analyze")
            .with_status(500)
            .expect(2)
            .create_async()
            .await;

        let client = client_for(&server.url());
        assert!(client.extract_entities("text", true, None).await.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_extract_by_type_falls_back_to_analyze() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/extract-by-type")
            .with_status(404)
            .create_async()
            .await;
        let analyze_mock = server
            .mock("POST", "/analyze")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ENTITY_BODY)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let entities = client
            .extract_by_type("text", &["CHEMICAL".to_string()])
            .await;

        analyze_mock.assert_async().await;
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].entity_type, "CHEMICAL");
    }

    #[tokio::test]
    async fn test_clinical_summary_buckets() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/analyze")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ENTITY_BODY)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let summary = client.clinical_summary("text").await;
        assert_eq!(summary.medications.count, 1);
        assert_eq!(summary.conditions.count, 1);
        assert_eq!(summary.total(), 2);
    }

    #[tokio::test]
    async fn test_health_check() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .create_async()
            .await;

        let client = client_for(&server.url());
        assert!(client.health_check().await);

        let down = client_for("http://127.0.0.1:1");
        assert!(!down.health_check().await);
    }

    #[tokio::test]
    async fn test_empty_text_skips_network() {
        let client = client_for("http://127.0.0.1:1");
        assert!(client.extract_entities("", true, None).await.is_empty());
        assert!(client.extract_entities("   ", true, None).await.is_empty());
    }

    #[test]
    fn test_sanitize_for_log_masks_phi() {
        let client = client_for("http://localhost:9000");
        let sanitized = client.sanitize_for_log("error processing SSN 123-45-6789 in field");
        assert!(!sanitized.contains("123-45-6789"));
        assert!(sanitized.contains("***"));
    }
}
