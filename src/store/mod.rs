//! Document store
//!
//! PostgreSQL persistence for processing results: the `documents` table
//! with a full-text index over extracted text, and the
//! `document_phi_details` child table holding one row per detection for
//! per-identifier-type audit queries.

pub mod adapter;
pub mod client;
pub mod models;

/// Hard maximum for search result caps, whatever the caller requests.
pub const SEARCH_LIMIT_MAX: usize = 500;

pub use adapter::DocumentStore;
pub use client::PostgresClient;
pub use models::{DocumentSummary, SearchFilters, StoreOutcome, StoreStatistics, StoredDocument};
