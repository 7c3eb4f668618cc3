//! Domain models and types for Harbor.
//!
//! This module contains the core domain models, types, and business rules:
//!
//! - **Detection models** ([`Detection`], [`DetectionResult`], [`PhiKind`],
//!   [`RedactionLevel`])
//! - **Document models** ([`DocumentMetadata`], [`DocumentProcessingResult`])
//! - **Entity models** ([`MedicalEntity`], [`ClinicalSummary`])
//! - **Error types** ([`HarborError`], [`DocumentError`], [`NlpError`],
//!   [`StorageError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, HarborError>`]:
//!
//! ```
//! use harbor::domain::{HarborError, Result};
//!
//! fn example() -> Result<()> {
//!     Err(HarborError::Validation("Invalid input".to_string()))
//! }
//! ```
//!
//! The one place an error deliberately crosses a layer boundary is
//! [`DocumentError`], raised by document handlers and caught by the shared
//! processing pipeline, which converts it into a failure
//! [`DocumentProcessingResult`]. Public pipeline entry points never raise.

pub mod detection;
pub mod document;
pub mod entity;
pub mod errors;
pub mod result;

// Re-export commonly used types for convenience
pub use detection::{Detection, DetectionMethod, DetectionResult, PhiKind, RedactionLevel};
pub use document::{
    derive_document_id, DocumentMetadata, DocumentProcessingResult, StructuredData,
};
pub use entity::{CategorySummary, ClinicalSummary, EntityCategory, MedicalEntity};
pub use errors::{DocumentError, HarborError, NlpError, StorageError};
pub use result::Result;
