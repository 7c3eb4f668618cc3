//! Configuration schema types
//!
//! This module defines the configuration structure for Harbor. The structs
//! map directly to `harbor.toml`; every section validates itself on load.

use crate::config::SecretString;
use crate::domain::detection::RedactionLevel;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main Harbor configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarborConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// PHI detection and redaction settings
    #[serde(default)]
    pub phi: PhiConfig,

    /// Medical-NLP entity extraction service
    pub nlp: NlpConfig,

    /// Per-format document handler settings
    #[serde(default)]
    pub handlers: HandlersConfig,

    /// Document store (optional: processing works without persistence)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    /// Batch processing settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Compliance disclaimers attached to every response
    #[serde(default)]
    pub compliance: ComplianceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HarborConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.phi.validate()?;
        self.nlp.validate()?;
        self.handlers.validate()?;
        if let Some(ref storage) = self.storage {
            storage.validate()?;
        }
        self.batch.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (process but skip document store writes)
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// PHI detection and redaction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhiConfig {
    /// Enable PHI detection during document processing
    #[serde(default = "default_true")]
    pub detection_enabled: bool,

    /// Enable redaction of detected PHI
    #[serde(default = "default_true")]
    pub redaction_enabled: bool,

    /// Redaction level applied by the document pipeline
    #[serde(default)]
    pub redaction_level: RedactionLevel,

    /// Mask character used for pattern-based redaction
    #[serde(default = "default_mask_char")]
    pub mask_char: char,

    /// Path to a custom pattern library TOML file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_library: Option<PathBuf>,

    /// Prefer the advanced NER detector when it is reachable
    #[serde(default)]
    pub prefer_advanced: bool,

    /// Advanced NER detector endpoint (required if prefer_advanced)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced: Option<AdvancedDetectorConfig>,

    /// Detection audit trail
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Default for PhiConfig {
    fn default() -> Self {
        Self {
            detection_enabled: true,
            redaction_enabled: true,
            redaction_level: RedactionLevel::Standard,
            mask_char: default_mask_char(),
            pattern_library: None,
            prefer_advanced: false,
            advanced: None,
            audit: AuditConfig::default(),
        }
    }
}

impl PhiConfig {
    fn validate(&self) -> Result<(), String> {
        if self.prefer_advanced && self.advanced.is_none() {
            return Err(
                "phi.advanced configuration is required when phi.prefer_advanced = true"
                    .to_string(),
            );
        }
        if let Some(ref advanced) = self.advanced {
            advanced.validate()?;
        }
        Ok(())
    }
}

/// Advanced NER detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedDetectorConfig {
    /// Base URL of the NER service
    pub base_url: String,

    /// API key sent as a bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,

    /// Request timeout in seconds
    #[serde(default = "default_ner_timeout")]
    pub timeout_seconds: u64,
}

impl AdvancedDetectorConfig {
    fn validate(&self) -> Result<(), String> {
        url::Url::parse(&self.base_url)
            .map_err(|e| format!("Invalid phi.advanced.base_url '{}': {e}", self.base_url))?;
        if self.timeout_seconds == 0 {
            return Err("phi.advanced.timeout_seconds must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Audit trail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable the JSONL audit trail
    #[serde(default)]
    pub enabled: bool,

    /// Path of the audit log file
    #[serde(default = "default_audit_path")]
    pub log_path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: default_audit_path(),
        }
    }
}

/// Retry configuration for remote calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Medical-NLP service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NlpConfig {
    /// Base URL of the entity-extraction service
    pub base_url: String,

    /// API key sent as a bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,

    /// Timeout for /analyze and /extract-by-type calls, in seconds
    #[serde(default = "default_analyze_timeout")]
    pub analyze_timeout_seconds: u64,

    /// Timeout for /health calls, in seconds
    #[serde(default = "default_health_timeout")]
    pub health_timeout_seconds: u64,

    /// Retry policy for analyze calls (health checks get a single attempt)
    #[serde(default)]
    pub retry: RetryConfig,
}

impl NlpConfig {
    fn validate(&self) -> Result<(), String> {
        url::Url::parse(&self.base_url)
            .map_err(|e| format!("Invalid nlp.base_url '{}': {e}", self.base_url))?;
        if self.analyze_timeout_seconds == 0 || self.health_timeout_seconds == 0 {
            return Err("nlp timeouts must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Per-format document handler configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlersConfig {
    /// PDF handler settings
    #[serde(default)]
    pub pdf: PdfHandlerConfig,

    /// Plain-text handler settings
    #[serde(default)]
    pub text: TextHandlerConfig,

    /// Image/OCR handler settings
    #[serde(default)]
    pub image: ImageHandlerConfig,
}

impl HandlersConfig {
    fn validate(&self) -> Result<(), String> {
        if self.pdf.max_pages == 0 {
            return Err("handlers.pdf.max_pages must be greater than 0".to_string());
        }
        if self.text.max_file_size_bytes == 0 {
            return Err("handlers.text.max_file_size_bytes must be greater than 0".to_string());
        }
        if self.image.max_dimension < self.image.target_min_dimension {
            return Err(
                "handlers.image.max_dimension must be at least target_min_dimension".to_string(),
            );
        }
        if let Some(ref ocr) = self.image.ocr {
            url::Url::parse(&ocr.base_url)
                .map_err(|e| format!("Invalid handlers.image.ocr.base_url '{}': {e}", ocr.base_url))?;
        }
        Ok(())
    }
}

/// PDF handler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfHandlerConfig {
    /// Maximum number of pages extracted from one document
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

impl Default for PdfHandlerConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
        }
    }
}

/// Plain-text handler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextHandlerConfig {
    /// Maximum accepted file size in bytes
    #[serde(default = "default_max_text_file_size")]
    pub max_file_size_bytes: u64,
}

impl Default for TextHandlerConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_text_file_size(),
        }
    }
}

/// Image/OCR handler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageHandlerConfig {
    /// Images larger than this (either dimension) are downsampled before OCR
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    /// Images smaller than this (largest dimension) are upsampled before OCR
    #[serde(default = "default_target_min_dimension")]
    pub target_min_dimension: u32,

    /// Remote OCR service; when absent, image documents yield empty text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr: Option<OcrConfig>,
}

impl Default for ImageHandlerConfig {
    fn default() -> Self {
        Self {
            max_dimension: default_max_dimension(),
            target_min_dimension: default_target_min_dimension(),
            ocr: None,
        }
    }
}

/// Remote OCR service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Base URL of the OCR service
    pub base_url: String,

    /// API key sent as a bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,

    /// Request timeout in seconds
    #[serde(default = "default_ocr_timeout")]
    pub timeout_seconds: u64,
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// PostgreSQL connection string
    pub connection_string: String,

    /// Maximum pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Pool acquire timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,

    /// Per-statement timeout in seconds
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_seconds: u64,

    /// Extracted text above this many bytes is truncated before storage
    #[serde(default = "default_max_stored_text_bytes")]
    pub max_stored_text_bytes: usize,

    /// Default search result cap
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl StorageConfig {
    fn validate(&self) -> Result<(), String> {
        if self.connection_string.is_empty() {
            return Err("storage.connection_string must not be empty".to_string());
        }
        if self.max_connections == 0 {
            return Err("storage.max_connections must be greater than 0".to_string());
        }
        if self.search_limit == 0 || self.search_limit > crate::store::SEARCH_LIMIT_MAX {
            return Err(format!(
                "storage.search_limit must be between 1 and {}",
                crate::store::SEARCH_LIMIT_MAX
            ));
        }
        Ok(())
    }
}

/// Batch processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum documents processed concurrently
    #[serde(default = "default_batch_concurrency")]
    pub max_concurrency: usize,

    /// Per-document timeout in seconds; a stalled document fails alone
    #[serde(default = "default_item_timeout")]
    pub item_timeout_seconds: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_batch_concurrency(),
            item_timeout_seconds: default_item_timeout(),
        }
    }
}

impl BatchConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 {
            return Err("batch.max_concurrency must be greater than 0".to_string());
        }
        if self.item_timeout_seconds == 0 {
            return Err("batch.item_timeout_seconds must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Compliance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Disclaimers attached to every orchestrator response
    #[serde(default = "default_disclaimers")]
    pub disclaimers: Vec<String>,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            disclaimers: default_disclaimers(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable JSON file logging with rotation
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_log_path")]
    pub local_path: String,

    /// Rotation policy: daily or hourly
    #[serde(default = "default_log_rotation")]
    pub local_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_log_path(),
            local_rotation: default_log_rotation(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid = ["daily", "hourly"];
        if !valid.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid.join(", ")
            ));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_mask_char() -> char {
    '*'
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("logs/phi_audit.jsonl")
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_analyze_timeout() -> u64 {
    30
}

fn default_health_timeout() -> u64 {
    5
}

fn default_ner_timeout() -> u64 {
    30
}

fn default_ocr_timeout() -> u64 {
    60
}

fn default_max_pages() -> u32 {
    1000
}

fn default_max_text_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_max_dimension() -> u32 {
    4000
}

fn default_target_min_dimension() -> u32 {
    1500
}

fn default_max_connections() -> usize {
    10
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_statement_timeout() -> u64 {
    60
}

fn default_max_stored_text_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_search_limit() -> usize {
    100
}

fn default_batch_concurrency() -> usize {
    4
}

fn default_item_timeout() -> u64 {
    300
}

fn default_disclaimers() -> Vec<String> {
    vec![
        "For administrative processing only; not for diagnosis or treatment decisions."
            .to_string(),
        "Extracted data requires review by qualified professionals before use.".to_string(),
        "All PHI detections are recorded in the audit trail.".to_string(),
    ]
}

fn default_log_path() -> String {
    "logs".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> HarborConfig {
        HarborConfig {
            application: ApplicationConfig::default(),
            phi: PhiConfig::default(),
            nlp: NlpConfig {
                base_url: "http://localhost:9000".to_string(),
                api_key: None,
                analyze_timeout_seconds: default_analyze_timeout(),
                health_timeout_seconds: default_health_timeout(),
                retry: RetryConfig::default(),
            },
            handlers: HandlersConfig::default(),
            storage: None,
            batch: BatchConfig::default(),
            compliance: ComplianceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_minimal_config_validates() {
        assert!(minimal_config().validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = minimal_config();
        config.application.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_prefer_advanced_requires_endpoint() {
        let mut config = minimal_config();
        config.phi.prefer_advanced = true;
        let err = config.validate().unwrap_err();
        assert!(err.contains("phi.advanced"));

        config.phi.advanced = Some(AdvancedDetectorConfig {
            base_url: "http://localhost:9001".to_string(),
            api_key: None,
            timeout_seconds: 30,
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_nlp_url_rejected() {
        let mut config = minimal_config();
        config.nlp.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_limits_validated() {
        let mut config = minimal_config();
        config.storage = Some(StorageConfig {
            connection_string: "postgresql://harbor@localhost/harbor".to_string(),
            max_connections: default_max_connections(),
            connection_timeout_seconds: default_connection_timeout(),
            statement_timeout_seconds: default_statement_timeout(),
            max_stored_text_bytes: default_max_stored_text_bytes(),
            search_limit: 9999,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_match_spec() {
        let config = minimal_config();
        assert_eq!(config.nlp.analyze_timeout_seconds, 30);
        assert_eq!(config.nlp.health_timeout_seconds, 5);
        assert_eq!(config.nlp.retry.max_retries, 3);
        assert_eq!(config.handlers.pdf.max_pages, 1000);
        assert_eq!(config.handlers.text.max_file_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.compliance.disclaimers.len(), 3);
    }
}
