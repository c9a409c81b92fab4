//! Rotas Common - Shared types for the route telemetry services
//!
//! This crate provides the foundational pieces used across the rotas
//! components:
//! - Error types and wire error codes
//! - Pagination
//! - Application slugs shared by ingest scoping and access control

pub mod error;
pub mod model;

// Re-exports for convenience
pub use error::{ErrorCode, RotasError};
pub use model::Page;

/// Application slug of the route dashboard.
pub const APP_ROTAS: &str = "approtas";

/// Application slug of the scale dashboard.
pub const APP_MILHAO_BLA: &str = "appmilhaobla";
