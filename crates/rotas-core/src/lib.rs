//! Rotas Core - Route telemetry processing
//!
//! This crate turns raw ingested telemetry into dashboard-ready data:
//! - Tolerant extraction of typed events from heterogeneous payloads
//! - In-memory ingest record store with upsert-by-source-id semantics
//! - Timeline downsampling for instant navigation
//! - Route state reconstruction by event folding
//! - Balance/throughput aggregation
//! - Mutable registries for route configs, code mappings and apps

pub mod balance;
pub mod extract;
pub mod model;
pub mod registry;
pub mod state;
pub mod store;
pub mod timeline;
pub mod value;

// Re-exports for convenience
pub use model::{AppConfig, Attribute, Event, IngestItem, IngestRecord, SkipReason};
pub use store::IngestStore;
pub use value::ScalarValue;
