//! Common utilities and types shared across credvault crates.
//!
//! This module provides the error taxonomy every component reports through,
//! plus the small value types (aliases, security levels, secret buffers)
//! that cross crate boundaries.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{SecurityLevel, SensitiveBytes, ServiceAlias, DEFAULT_SERVICE};
