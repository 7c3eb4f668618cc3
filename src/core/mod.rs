//! Core orchestration
//!
//! The processing coordinator ties handlers, PHI detection, entity
//! extraction and storage together and exposes the public operation
//! surface; batch mode fans the same per-document path out over a bounded
//! worker pool.

pub mod batch;
pub mod orchestrator;

pub use batch::{BatchFailure, BatchSummary};
pub use orchestrator::{
    BatchResponse, EntitiesResponse, PhiSummaryResponse, ProcessingCoordinator,
    ProcessingResponse, SearchResponse,
};
