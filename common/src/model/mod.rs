//! Domain models

pub mod account;
pub mod transaction;
