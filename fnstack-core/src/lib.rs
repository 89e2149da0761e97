//! Core types for fnstack
//!
//! This crate provides the types shared by the runtime adapter and the server.

pub mod credentials;
pub mod error;
pub mod invocation_id;

pub use credentials::Credentials;
pub use error::{ErrorCode, RuntimeError};
pub use invocation_id::InvocationId;
