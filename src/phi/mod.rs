//! PHI detection and redaction
//!
//! This module provides detection of protected health information in free
//! text and its redaction at configurable sensitivity levels.
//!
//! # Architecture
//!
//! - **Patterns**: regex library for the eight identifier kinds
//! - **Matcher**: applies every pattern against a text, reporting all hits
//! - **Advanced detector**: optional remote NER backend that supersedes
//!   pattern matching when healthy
//! - **Masking**: span-replacement engine used for masked text and redaction
//! - **Audit**: structured events plus a hashed JSONL trail for every
//!   positive detection
//!
//! # Usage
//!
//! ```rust,no_run
//! use harbor::config::PhiConfig;
//! use harbor::phi::PhiDetector;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let detector = PhiDetector::new(&PhiConfig::default()).await?;
//! let result = detector.detect("SSN: 123-45-6789").await?;
//! assert!(result.phi_detected);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod detector;
pub mod masking;
pub mod matcher;
pub mod ner;
pub mod patterns;

// Re-export main types
pub use audit::PhiAuditLogger;
pub use detector::PhiDetector;
pub use masking::{apply_masks, mask_all, redact_phi, MaskSpan};
pub use matcher::PatternMatcher;
pub use ner::{AdvancedDetector, RemoteNerDetector};
pub use patterns::PatternRegistry;
