//! Monetary conventions for the account core
//!
//! All amounts are integers in the smallest currency unit. There is no
//! fractional representation anywhere in the core.

/// Amount in the smallest currency unit
pub type Amount = i64;

/// Zero amount, the balance of every freshly registered account
pub const ZERO: Amount = 0;
