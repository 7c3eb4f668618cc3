//! Medical-NLP entity extraction
//!
//! Thin client over the remote medical-NLP service plus local enrichment
//! of the entities it returns. The service is an external collaborator;
//! nothing in this module depends on its internals beyond the wire shape.

pub mod client;
pub mod models;

pub use client::EntityExtractionClient;
pub use models::{AnalyzeRequest, AnalyzeResponse, WireEntity};
