//! PHI detector composition root
//!
//! Composes the regex pattern matcher with an optional advanced NER
//! detector. The advanced detector is selected once at construction via a
//! capability probe; when it is active and a call succeeds it supersedes
//! pattern matching entirely for that call, and any runtime failure falls
//! back to patterns. Detection never raises to the caller because of an
//! unavailable advanced backend.

use crate::config::PhiConfig;
use crate::domain::detection::{DetectionResult, RedactionLevel};
use crate::phi::audit::PhiAuditLogger;
use crate::phi::masking::{mask_all, redact_phi};
use crate::phi::matcher::PatternMatcher;
use crate::phi::ner::{AdvancedDetector, RemoteNerDetector};
use crate::phi::patterns::PatternRegistry;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// PHI detector
///
/// Thread-safe; share across batch workers with `Arc`. The pattern
/// registry and any advanced-detector state are read-only after
/// construction.
pub struct PhiDetector {
    matcher: PatternMatcher,
    advanced: Option<Arc<dyn AdvancedDetector>>,
    audit_logger: Option<PhiAuditLogger>,
    mask_char: char,
    redaction_level: RedactionLevel,
}

impl PhiDetector {
    /// Create a detector from configuration
    ///
    /// When `prefer_advanced` is set, the advanced detector is probed once
    /// here; an unreachable backend degrades to pattern matching with a
    /// single warning instead of failing construction.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern library cannot be loaded or the
    /// audit log cannot be created.
    pub async fn new(config: &PhiConfig) -> Result<Self> {
        let matcher = if let Some(ref pattern_path) = config.pattern_library {
            let registry = PatternRegistry::from_file(pattern_path)?;
            PatternMatcher::with_registry(registry)
        } else {
            PatternMatcher::new().context("Failed to load built-in pattern library")?
        };

        let advanced: Option<Arc<dyn AdvancedDetector>> = if config.prefer_advanced {
            match config.advanced {
                Some(ref advanced_config) => {
                    let detector = RemoteNerDetector::new(advanced_config.clone());
                    if detector.probe().await {
                        tracing::info!(detector = detector.name(), "Advanced PHI detector active");
                        Some(Arc::new(detector))
                    } else {
                        tracing::warn!(
                            detector = detector.name(),
                            "Advanced PHI detector unavailable, falling back to pattern matching"
                        );
                        None
                    }
                }
                None => {
                    tracing::warn!(
                        "phi.prefer_advanced set without phi.advanced config, using pattern matching"
                    );
                    None
                }
            }
        } else {
            None
        };

        let audit_logger = if config.audit.enabled {
            Some(PhiAuditLogger::new(config.audit.log_path.clone())?)
        } else {
            None
        };

        Ok(Self {
            matcher,
            advanced,
            audit_logger,
            mask_char: config.mask_char,
            redaction_level: config.redaction_level,
        })
    }

    /// Create a pattern-only detector with defaults (used by tests and
    /// ad-hoc analysis where no configuration is in play)
    pub fn pattern_only() -> Result<Self> {
        Ok(Self {
            matcher: PatternMatcher::new()?,
            advanced: None,
            audit_logger: None,
            mask_char: '*',
            redaction_level: RedactionLevel::Standard,
        })
    }

    /// Whether the advanced detector is active
    pub fn advanced_active(&self) -> bool {
        self.advanced.is_some()
    }

    /// Detect PHI in a text
    ///
    /// Prefers the advanced detector when active; falls back to pattern
    /// matching on any advanced-call failure.
    pub async fn detect(&self, text: &str) -> Result<DetectionResult> {
        self.detect_with_source(text, "adhoc").await
    }

    /// Detect PHI in a text, tagging the audit event with a source label
    pub async fn detect_with_source(&self, text: &str, source: &str) -> Result<DetectionResult> {
        if let Some(ref advanced) = self.advanced {
            match advanced.detect(text).await {
                Ok(detections) => {
                    let masked = mask_all(text, &detections, self.mask_char);
                    let result = DetectionResult::new(detections, masked);
                    self.emit_audit(source, &result);
                    return Ok(result);
                }
                Err(e) => {
                    tracing::warn!(
                        detector = advanced.name(),
                        error = %e,
                        "Advanced detection failed, falling back to pattern matching"
                    );
                }
            }
        }

        let result = self.detect_sync_inner(text, source)?;
        Ok(result)
    }

    /// Synchronous pattern-only detection
    ///
    /// The advanced detector requires network I/O, so the synchronous
    /// variant always uses the pattern matcher.
    pub fn detect_sync(&self, text: &str) -> Result<DetectionResult> {
        self.detect_sync_inner(text, "adhoc")
    }

    fn detect_sync_inner(&self, text: &str, source: &str) -> Result<DetectionResult> {
        let detections = self.matcher.detect(text)?;
        if detections.is_empty() {
            return Ok(DetectionResult::clean(text));
        }

        let masked = mask_all(text, &detections, self.mask_char);
        let result = DetectionResult::new(detections, masked);
        self.emit_audit(source, &result);
        Ok(result)
    }

    /// Detect PHI across many named fields in one call
    ///
    /// Reuses the compiled patterns and the probed advanced detector, so
    /// per-field setup cost is not repeated. Field order in the result map
    /// mirrors the input map.
    pub async fn detect_batch(
        &self,
        fields: &HashMap<String, String>,
    ) -> Result<HashMap<String, DetectionResult>> {
        let mut results = HashMap::with_capacity(fields.len());
        for (name, value) in fields {
            let result = self.detect_with_source(value, name).await?;
            results.insert(name.clone(), result);
        }
        Ok(results)
    }

    /// Redact a previously analyzed text at the configured level
    pub fn redact(&self, text: &str, analysis: &DetectionResult) -> String {
        redact_phi(text, analysis, self.redaction_level, self.mask_char)
    }

    /// Redact at an explicit level
    pub fn redact_at(
        &self,
        text: &str,
        analysis: &DetectionResult,
        level: RedactionLevel,
    ) -> String {
        redact_phi(text, analysis, level, self.mask_char)
    }

    /// Configured redaction level
    pub fn redaction_level(&self) -> RedactionLevel {
        self.redaction_level
    }

    /// Emit the compliance audit event for a positive detection
    ///
    /// This is a required side effect of detection, not optional
    /// instrumentation: every positive result produces a structured
    /// tracing event and, when enabled, a JSONL audit entry. Matched text
    /// is never included; the file trail stores SHA-256 hashes only.
    fn emit_audit(&self, source: &str, result: &DetectionResult) {
        if !result.phi_detected {
            return;
        }

        let kinds: Vec<String> = result.phi_types.iter().map(|k| k.label().to_string()).collect();
        let (min, mean, max) = result.confidence_stats().unwrap_or((0.0, 0.0, 0.0));
        tracing::info!(
            source = source,
            detections = result.detections.len(),
            kinds = ?kinds,
            confidence_min = min,
            confidence_mean = mean,
            confidence_max = max,
            "PHI detected"
        );

        if let Some(ref logger) = self.audit_logger {
            if let Err(e) = logger.log_detection(source, result) {
                tracing::error!(error = %e, "Failed to write PHI audit entry");
            }
        }
    }
}
