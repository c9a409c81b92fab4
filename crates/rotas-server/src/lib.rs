//! Rotas Server - HTTP API for route telemetry dashboards
//!
//! Wires the domain crates into an actix-web service: configuration and
//! logging startup, bearer-token authentication middleware, the ingest
//! endpoint and the two dashboard surfaces.

pub mod api;
pub mod middleware;
pub mod model;
pub mod startup;
