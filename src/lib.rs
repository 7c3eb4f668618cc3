//! # Harbor - PHI Document-Intake Pipeline
//!
//! Harbor ingests heterogeneous documents (PDF, DOCX, images via OCR,
//! plain text), extracts their text and medical entities, detects and
//! redacts protected health information at configurable sensitivity
//! levels, and persists the results with full-text search and a per-
//! detection audit trail.
//!
//! ## Architecture
//!
//! Harbor follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Orchestration (routing, batch concurrency, operation surface)
//! - [`handlers`] - Per-format document handlers and the shared pipeline
//! - [`phi`] - PHI pattern matching, NER detection, masking and audit
//! - [`nlp`] - Medical-NLP entity extraction client
//! - [`store`] - PostgreSQL document store with full-text search
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use harbor::config::load_config;
//! use harbor::core::ProcessingCoordinator;
//! use harbor::handlers::PipelineOptions;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("harbor.toml")?;
//!     let coordinator = ProcessingCoordinator::new(config).await?;
//!
//!     let response = coordinator
//!         .process_document(Path::new("visit_note.pdf"), &PipelineOptions::standard())
//!         .await;
//!
//!     if let Some(result) = response.result {
//!         println!(
//!             "{}: phi={} entities={}",
//!             result.document_id,
//!             result.phi_detected(),
//!             result.entity_count()
//!         );
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## PHI Detection
//!
//! Detection composes a regex pattern matcher (SSN, phone, email, MRN,
//! DOB, address, ZIP, insurance IDs) with an optional remote NER detector
//! that supersedes patterns when healthy:
//!
//! ```rust,no_run
//! use harbor::config::PhiConfig;
//! use harbor::phi::PhiDetector;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let detector = PhiDetector::new(&PhiConfig::default()).await?;
//! let result = detector.detect("SSN: 123-45-6789").await?;
//! assert!(result.phi_detected);
//! assert_eq!(result.masked_text, "SSN: ***********");
//! # Ok(())
//! # }
//! ```
//!
//! Every positive detection emits a structured audit event; matched text
//! never reaches a log sink in plaintext.
//!
//! ## Error Handling
//!
//! Fallible operations return [`domain::Result`]. Document handlers raise
//! a typed [`domain::DocumentError`] which the pipeline catches one layer
//! up and converts into a failure result; the coordinator's public
//! operations never raise.

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod handlers;
pub mod logging;
pub mod nlp;
pub mod phi;
pub mod store;
