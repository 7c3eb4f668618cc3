//! Advanced NER-based PHI detection
//!
//! Optional collaborator offering named-entity detection over a richer PII
//! taxonomy (person names, locations, dates, identifiers) with per-match
//! model confidence. When configured and healthy it supersedes the pattern
//! matcher entirely for a call; it is probed once at construction and the
//! composition root falls back to patterns whenever a call fails.

use crate::config::AdvancedDetectorConfig;
use crate::domain::detection::{Detection, DetectionMethod, PhiKind};
use crate::domain::errors::NlpError;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Named-entity PHI detector
///
/// Implementations must be safe for concurrent invocation from multiple
/// batch workers; treat any model state as read-only after construction.
#[async_trait]
pub trait AdvancedDetector: Send + Sync {
    /// Detector name, used in logs
    fn name(&self) -> &str;

    /// Probe whether the detector is currently usable
    async fn probe(&self) -> bool;

    /// Detect PHI entities in a text
    ///
    /// Offsets in the returned detections are character offsets.
    /// Confidence comes from the underlying model, clamped to [0, 1].
    async fn detect(&self, text: &str) -> Result<Vec<Detection>, NlpError>;
}

#[derive(Debug, Serialize)]
struct NerRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct NerResponse {
    entities: Vec<NerEntity>,
}

#[derive(Debug, Deserialize)]
struct NerEntity {
    label: String,
    text: String,
    start: usize,
    end: usize,
    #[serde(default)]
    score: Option<f32>,
}

/// HTTP client for a remote NER service
///
/// Wire contract: `POST {base}/detect` with `{"text": ...}` returns
/// `{"entities": [{"label", "text", "start", "end", "score"}]}` where
/// offsets are character offsets; `GET {base}/health` returns 200 when the
/// model is loaded.
pub struct RemoteNerDetector {
    base_url: String,
    client: Client,
    config: AdvancedDetectorConfig,
}

impl RemoteNerDetector {
    /// Create a new remote NER detector
    pub fn new(config: AdvancedDetectorConfig) -> Self {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            config,
        }
    }

    fn auth_header_value(&self) -> Option<String> {
        self.config
            .api_key
            .as_ref()
            .map(|key| format!("Bearer {}", key.expose_secret()))
    }
}

#[async_trait]
impl AdvancedDetector for RemoteNerDetector {
    fn name(&self) -> &str {
        "remote_ner"
    }

    async fn probe(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        let mut request = self.client.get(&url).timeout(Duration::from_secs(5));
        if let Some(auth) = self.auth_header_value() {
            request = request.header("Authorization", auth);
        }

        match request.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "NER detector probe failed");
                false
            }
        }
    }

    async fn detect(&self, text: &str) -> Result<Vec<Detection>, NlpError> {
        let url = format!("{}/detect", self.base_url);
        let mut request = self.client.post(&url).json(&NerRequest { text });
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
            // Error bodies can echo the submitted text; drop them rather
            // than let PHI ride along inside logged error values.
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

        let body: NerResponse = resp
            .json()
            .await
            .map_err(|e| NlpError::InvalidResponse(e.to_string()))?;

        let text_len = text.chars().count();
        let mut detections = Vec::with_capacity(body.entities.len());
        for entity in body.entities {
            if entity.start >= entity.end || entity.end > text_len {
                tracing::warn!(
                    label = %entity.label,
                    start = entity.start,
                    end = entity.end,
                    "Skipping NER entity with invalid span"
                );
                continue;
            }
            detections.push(Detection::new(
                map_label(&entity.label),
                format!("Named entity ({})", entity.label),
                entity.start,
                entity.end,
                entity.text,
                entity.score.unwrap_or(1.0),
                DetectionMethod::Ner,
            ));
        }

        detections.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
        Ok(detections)
    }
}

/// Map a NER label onto a PHI kind
///
/// Labels matching a pattern kind keep that kind so redaction levels apply
/// uniformly; everything else becomes an [`PhiKind::Entity`].
fn map_label(label: &str) -> PhiKind {
    let known: HashMap<&str, PhiKind> = [
        ("SSN", PhiKind::Ssn),
        ("US_SSN", PhiKind::Ssn),
        ("PHONE_NUMBER", PhiKind::Phone),
        ("EMAIL_ADDRESS", PhiKind::Email),
        ("MEDICAL_RECORD_NUMBER", PhiKind::Mrn),
        ("DATE_OF_BIRTH", PhiKind::Dob),
        ("ZIP_CODE", PhiKind::Zip),
    ]
    .into_iter()
    .collect();

    known
        .get(label.to_uppercase().as_str())
        .cloned()
        .unwrap_or_else(|| PhiKind::Entity(label.to_uppercase()))
}
