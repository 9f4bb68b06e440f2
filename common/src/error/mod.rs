//! Error types for the account core
//!
//! This module provides a unified error handling system for the banking
//! core. Domain failures (rejected business operations) and infrastructure
//! failures share one error type so they can cross service boundaries
//! without conversion.

use std::fmt::Display;
use thiserror::Error;

/// Account core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Error when no account exists for a full number
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Error when an account type has no configured type code
    #[error("Account type not found: {0}")]
    AccountTypeNotFound(String),

    /// Error when an account type has no seeded number sequence
    #[error("Account sequence not found: {0}")]
    SequenceNotFound(String),

    /// Error when an account has insufficient funds
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Error when the requester does not own the account
    #[error("Not the account owner: {0}")]
    NotOwner(String),

    /// Error when the supplied account password does not match
    #[error("Password mismatch: {0}")]
    PasswordMismatch(String),

    /// Error when a transfer names the same account on both legs
    #[error("Same account transfer: {0}")]
    SameAccountTransfer(String),

    /// Error when the per-account lock could not be acquired in time.
    /// The only retryable error: the caller may re-issue the operation,
    /// but retried writes are not deduplicated by this core.
    #[error("Lock contention: {0}")]
    LockContention(String),

    /// Error when an operation amount is not strictly positive
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Error when a new account collides with an existing full number
    #[error("Duplicate full number: {0}")]
    DuplicateFullNumber(String),

    /// Error hashing or verifying an account password
    #[error("Password hash error: {0}")]
    PasswordHash(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the caller may safely retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::LockContention(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait to add context to error results
pub trait ErrorExt<T> {
    /// Add context information to an error
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display;
}

impl<T> ErrorExt<T> for Result<T> {
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display,
    {
        self.map_err(|e| {
            let context = context_fn().to_string();
            match e {
                Error::AccountNotFound(msg) => Error::AccountNotFound(format!("{}: {}", context, msg)),
                Error::AccountTypeNotFound(msg) => Error::AccountTypeNotFound(format!("{}: {}", context, msg)),
                Error::SequenceNotFound(msg) => Error::SequenceNotFound(format!("{}: {}", context, msg)),
                Error::InsufficientBalance(msg) => Error::InsufficientBalance(format!("{}: {}", context, msg)),
                Error::NotOwner(msg) => Error::NotOwner(format!("{}: {}", context, msg)),
                Error::PasswordMismatch(msg) => Error::PasswordMismatch(format!("{}: {}", context, msg)),
                Error::SameAccountTransfer(msg) => Error::SameAccountTransfer(format!("{}: {}", context, msg)),
                Error::LockContention(msg) => Error::LockContention(format!("{}: {}", context, msg)),
                Error::InvalidAmount(msg) => Error::InvalidAmount(format!("{}: {}", context, msg)),
                Error::DuplicateFullNumber(msg) => Error::DuplicateFullNumber(format!("{}: {}", context, msg)),
                Error::PasswordHash(msg) => Error::PasswordHash(format!("{}: {}", context, msg)),
                Error::ConfigurationError(msg) => Error::ConfigurationError(format!("{}: {}", context, msg)),
                Error::Internal(msg) => Error::Internal(format!("{}: {}", context, msg)),
                Error::Database(e) => Error::Database(e),
                Error::Migration(e) => Error::Migration(e),
                Error::Serialization(e) => Error::Serialization(e),
            }
        })
    }
}

/// Convert string messages into an error
impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Internal(message)
    }
}

/// Convert static string references into an error
impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::Internal(message.to_string())
    }
}
