//! Shared types for the account core
//!
//! This library contains the domain models, error types, money conventions,
//! password capability, and database helpers used by the account service.

pub mod db;
pub mod error;
pub mod model;
pub mod money;
pub mod password;

/// Re-export important types
pub use error::{Error, ErrorExt, Result};
pub use money::Amount;
