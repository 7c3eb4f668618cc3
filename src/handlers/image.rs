//! Image document handler with remote OCR
//!
//! Images are preprocessed before OCR: oversized scans are downsampled to
//! bound memory, low-resolution photos are upsampled toward a target size
//! to improve recognition. OCR itself is delegated to a remote service;
//! when the service is not configured or unreachable the handler returns
//! empty text so the rest of the pipeline (hashing, metadata, PHI over the
//! empty string) still runs.

use crate::config::{ImageHandlerConfig, OcrConfig};
use crate::domain::document::DocumentMetadata;
use crate::domain::errors::{DocumentError, NlpError};
use crate::handlers::{extension_of, fs_timestamps, DocumentHandler};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

/// OCR output lines shorter than this are treated as recognition noise.
const MIN_LINE_CHARS: usize = 2;

/// Upsampling never scales beyond this factor.
const MAX_UPSCALE: f32 = 4.0;

#[derive(Debug, Serialize)]
struct OcrRequest {
    /// PNG image, base64-encoded
    image: String,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    text: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Client for the remote OCR service
///
/// Wire contract: `POST {base}/ocr` with `{"image": <base64 png>,
/// "format": "png"}` returns `{"text", "confidence"}`; `GET {base}/health`
/// returns 200 when the engine is ready.
struct OcrClient {
    base_url: String,
    client: Client,
    config: OcrConfig,
}

impl OcrClient {
    fn new(config: OcrConfig) -> Self {
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

    async fn recognize(&self, png_bytes: &[u8]) -> Result<OcrResponse, NlpError> {
        let url = format!("{}/ocr", self.base_url);
        let body = OcrRequest {
            image: general_purpose::STANDARD.encode(png_bytes),
            format: "png",
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(ref key) = self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", key.expose_secret()));
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
            return Err(NlpError::ServerError {
                status: status.as_u16(),
                message: "OCR request failed".to_string(),
            });
        }

        resp.json::<OcrResponse>()
            .await
            .map_err(|e| NlpError::InvalidResponse(e.to_string()))
    }
}

/// Image handler
pub struct ImageHandler {
    config: ImageHandlerConfig,
    ocr: Option<OcrClient>,
}

impl ImageHandler {
    /// Create a handler from configuration
    pub fn new(config: ImageHandlerConfig) -> Self {
        let ocr = config.ocr.clone().map(OcrClient::new);
        Self { config, ocr }
    }

    /// Whether an OCR backend is configured
    pub fn ocr_configured(&self) -> bool {
        self.ocr.is_some()
    }

    /// Resize toward OCR-friendly dimensions
    ///
    /// Oversized images are capped at `max_dimension`; small images are
    /// scaled up toward `target_min_dimension` (at most [`MAX_UPSCALE`]x)
    /// since low-resolution input is the main driver of OCR errors.
    fn preprocess(&self, img: DynamicImage) -> DynamicImage {
        let (width, height) = img.dimensions();
        let largest = width.max(height);

        if largest > self.config.max_dimension {
            tracing::debug!(width, height, cap = self.config.max_dimension, "Downsampling image");
            return img.resize(
                self.config.max_dimension,
                self.config.max_dimension,
                FilterType::Lanczos3,
            );
        }

        if largest < self.config.target_min_dimension {
            let factor = (self.config.target_min_dimension as f32 / largest as f32)
                .min(MAX_UPSCALE);
            let new_w = (width as f32 * factor) as u32;
            let new_h = (height as f32 * factor) as u32;
            tracing::debug!(width, height, new_w, new_h, "Upsampling low-resolution image");
            return img.resize(new_w, new_h, FilterType::Lanczos3);
        }

        img
    }

    /// Drop OCR artifact lines (under [`MIN_LINE_CHARS`] visible chars)
    fn strip_artifacts(text: &str) -> String {
        text.lines()
            .filter(|line| line.trim().chars().count() >= MIN_LINE_CHARS)
            .collect::<Vec<&str>>()
            .join("\n")
    }

    fn load_and_encode(&self, path: &Path) -> Result<Vec<u8>, DocumentError> {
        let img = image::open(path).map_err(|e| DocumentError::Corrupt {
            path: path.to_path_buf(),
            message: format!("unreadable image: {e}"),
        })?;

        let processed = self.preprocess(img);
        let mut buffer = Vec::new();
        processed
            .write_to(&mut Cursor::new(&mut buffer), ImageOutputFormat::Png)
            .map_err(|e| DocumentError::ExtractionFailed {
                path: path.to_path_buf(),
                message: format!("failed to encode image: {e}"),
            })?;
        Ok(buffer)
    }
}

#[async_trait]
impl DocumentHandler for ImageHandler {
    fn name(&self) -> &'static str {
        "image"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif"]
    }

    fn extraction_confidence(&self) -> f32 {
        0.7
    }

    async fn can_handle(&self, path: &Path, mime_type: Option<&str>) -> bool {
        if let Some(ext) = extension_of(path) {
            if self.extensions().contains(&ext.as_str()) {
                return true;
            }
        }

        if let Some(mime) = mime_type {
            if mime.starts_with("image/") {
                return true;
            }
        }

        // Parse probe: let the decoder sniff the magic bytes.
        match image::io::Reader::open(path) {
            Ok(reader) => match reader.with_guessed_format() {
                Ok(guessed) => guessed.format().is_some(),
                Err(_) => false,
            },
            Err(_) => false,
        }
    }

    async fn extract_content(&self, path: &Path) -> Result<String, DocumentError> {
        let Some(ref ocr) = self.ocr else {
            tracing::warn!(
                path = %path.display(),
                "No OCR service configured, image yields empty text"
            );
            return Ok(String::new());
        };

        let png = self.load_and_encode(path)?;

        match ocr.recognize(&png).await {
            Ok(response) => {
                let text = Self::strip_artifacts(&response.text);
                tracing::info!(
                    path = %path.display(),
                    chars = text.chars().count(),
                    confidence = response.confidence,
                    "OCR completed"
                );
                Ok(text)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "OCR unavailable, image yields empty text"
                );
                Ok(String::new())
            }
        }
    }

    async fn extract_metadata(&self, path: &Path) -> Result<DocumentMetadata, DocumentError> {
        let size = std::fs::metadata(path)
            .map_err(|_| DocumentError::NotFound(path.to_path_buf()))?
            .len();

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let extension = extension_of(path).unwrap_or_else(|| "png".to_string());
        let mime = match extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "tif" | "tiff" => "image/tiff",
            "bmp" => "image/bmp",
            "gif" => "image/gif",
            _ => "image/png",
        };

        let mut metadata = DocumentMetadata::new(file_name, size, "image", mime);
        let (created, modified) = fs_timestamps(path);
        metadata.created_at = created;
        metadata.modified_at = modified;

        if let Ok(img) = image::open(path) {
            let (width, height) = img.dimensions();
            metadata
                .custom_properties
                .insert("width".to_string(), serde_json::Value::from(width));
            metadata
                .custom_properties
                .insert("height".to_string(), serde_json::Value::from(height));
        }

        Ok(metadata)
    }
}

impl Default for ImageHandler {
    fn default() -> Self {
        Self::new(ImageHandlerConfig::default())
    }
}
