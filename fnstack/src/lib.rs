//! fnstack: local runner for serverless voice and messaging functions
//!
//! Wires the function runtime into an axum server: configuration loading,
//! the HTTP router and a handful of sample functions.

pub mod config;
pub mod functions;
pub mod router;

pub use config::Config;
pub use router::{create_router, AppState};
