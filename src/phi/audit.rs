//! Audit trail for PHI detection events

use crate::domain::detection::DetectionResult;
use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// One audit entry, written as a JSON line
#[derive(Debug, Serialize)]
struct AuditEntry {
    timestamp: String,
    source: String,
    detections_count: usize,
    kinds: BTreeMap<String, usize>,
    confidence_min: f32,
    confidence_mean: f32,
    confidence_max: f32,
    detections: Vec<AuditDetection>,
}

/// One detection inside an audit entry (with hashed PHI)
#[derive(Debug, Serialize)]
struct AuditDetection {
    kind: String,
    start: usize,
    end: usize,
    confidence: f32,
    method: String,
    /// SHA-256 hash of the matched text (never log plaintext PHI)
    value_hash: String,
}

/// Append-only JSONL audit trail for PHI detection events
pub struct PhiAuditLogger {
    log_path: PathBuf,
}

impl PhiAuditLogger {
    /// Create a new audit logger, creating the parent directory if needed
    pub fn new(log_path: PathBuf) -> Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create audit log directory: {}", parent.display())
            })?;
        }

        Ok(Self { log_path })
    }

    /// Record one positive detection result
    ///
    /// `source` identifies what was scanned (a document id, a field name).
    /// Results with zero detections are not recorded.
    pub fn log_detection(&self, source: &str, result: &DetectionResult) -> Result<()> {
        if !result.phi_detected {
            return Ok(());
        }

        let mut kinds: BTreeMap<String, usize> = BTreeMap::new();
        for detection in &result.detections {
            *kinds.entry(detection.kind.label().to_string()).or_insert(0) += 1;
        }

        let (min, mean, max) = result
            .confidence_stats()
            .unwrap_or((0.0, 0.0, 0.0));

        let entry = AuditEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            source: source.to_string(),
            detections_count: result.detections.len(),
            kinds,
            confidence_min: min,
            confidence_mean: mean,
            confidence_max: max,
            detections: result
                .detections
                .iter()
                .map(|d| AuditDetection {
                    kind: d.kind.label().to_string(),
                    start: d.start,
                    end: d.end,
                    confidence: d.confidence,
                    method: d.method.label().to_string(),
                    value_hash: hash_value(&d.matched_text),
                })
                .collect(),
        };

        self.write_entry(&entry)
    }

    fn write_entry(&self, entry: &AuditEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open audit log: {}", self.log_path.display()))?;

        let json_line = serde_json::to_string(entry).context("Failed to serialize audit entry")?;
        writeln!(file, "{json_line}").context("Failed to write audit entry")?;

        Ok(())
    }
}

/// Hash a PHI value using SHA-256
fn hash_value(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    format!("{result:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::detection::{Detection, DetectionMethod, PhiKind};
    use tempfile::tempdir;

    fn sample_result() -> DetectionResult {
        let detection = Detection::new(
            PhiKind::Ssn,
            "Social Security Number",
            5,
            16,
            "123-45-6789",
            0.8,
            DetectionMethod::Pattern,
        );
        DetectionResult::new(vec![detection], "SSN: ***********".to_string())
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(hash_value("123-45-6789"), hash_value("123-45-6789"));
        assert_ne!(hash_value("123-45-6789"), hash_value("987-65-4321"));
    }

    #[test]
    fn test_log_detection_writes_jsonl_without_plaintext() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");
        let logger = PhiAuditLogger::new(log_path.clone()).unwrap();

        logger.log_detection("doc-123", &sample_result()).unwrap();

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("doc-123"));
        assert!(content.contains("\"ssn\""));
        assert!(!content.contains("123-45-6789"));

        let parsed: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["detections_count"], 1);
        assert_eq!(parsed["kinds"]["ssn"], 1);
    }

    #[test]
    fn test_clean_result_not_recorded() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");
        let logger = PhiAuditLogger::new(log_path.clone()).unwrap();

        logger
            .log_detection("doc-clean", &DetectionResult::clean("nothing here"))
            .unwrap();

        assert!(!log_path.exists());
    }

    #[test]
    fn test_entries_append() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");
        let logger = PhiAuditLogger::new(log_path.clone()).unwrap();

        logger.log_detection("doc-1", &sample_result()).unwrap();
        logger.log_detection("doc-2", &sample_result()).unwrap();

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
