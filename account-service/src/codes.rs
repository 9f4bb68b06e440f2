//! Account type code table
//!
//! Maps each account type to the numeric code prefixed onto its full number.
//! The table is built once at startup; there is no per-call lookup against
//! external configuration.

use std::collections::HashMap;

use common::error::{Error, Result};
use common::model::account::AccountType;

/// Static table of type codes, injected at startup
#[derive(Debug, Clone)]
pub struct AccountTypeCodes {
    codes: HashMap<AccountType, i64>,
}

impl Default for AccountTypeCodes {
    fn default() -> Self {
        Self::new([
            (AccountType::Normal, 234),
            (AccountType::Saving, 235),
            (AccountType::Fixed, 236),
        ])
    }
}

impl AccountTypeCodes {
    /// Build a table from explicit type/code pairs
    pub fn new(pairs: impl IntoIterator<Item = (AccountType, i64)>) -> Self {
        Self {
            codes: pairs.into_iter().collect(),
        }
    }

    /// Look up the code for an account type
    pub fn code_for(&self, kind: AccountType) -> Result<i64> {
        self.codes.get(&kind).copied().ok_or_else(|| {
            Error::AccountTypeNotFound(format!("no type code configured for {}", kind))
        })
    }
}
