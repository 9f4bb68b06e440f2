//! Account aggregate and account numbering

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::money::{Amount, ZERO};
use crate::password::PasswordEncoder;

/// Width of the per-type account number within a full number.
/// A full number is `type_code * NUMBER_SPAN + number`.
pub const NUMBER_SPAN: i64 = 100_000_000;

/// Compose a globally unique full number from a type code and a sequence value
pub fn compose_full_number(type_code: i64, number: i64) -> Result<i64> {
    if !(0..NUMBER_SPAN).contains(&number) {
        return Err(Error::Internal(format!(
            "sequence value {} does not fit the account number span",
            number
        )));
    }
    Ok(type_code * NUMBER_SPAN + number)
}

/// Account category, driving which sequence and type code are used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    Normal,
    Saving,
    Fixed,
}

impl AccountType {
    /// Storage/display name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Normal => "NORMAL",
            AccountType::Saving => "SAVING",
            AccountType::Fixed => "FIXED",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NORMAL" => Ok(AccountType::Normal),
            "SAVING" => Ok(AccountType::Saving),
            "FIXED" => Ok(AccountType::Fixed),
            other => Err(Error::AccountTypeNotFound(format!(
                "unknown account type: {}",
                other
            ))),
        }
    }
}

/// Account aggregate owning the balance-mutation rules
///
/// Mutation methods change only the in-memory value; persisting the new state
/// together with its paired ledger entry is the caller's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Stable internal identity
    pub id: Uuid,
    /// Sequence value within the account type
    pub number: i64,
    /// Globally unique number derived from type code and sequence value
    pub full_number: i64,
    /// Opaque credential hash authorizing withdrawals and transfers
    pub password_hash: String,
    /// Balance in the smallest currency unit, never negative
    pub balance: Amount,
    /// Account category
    pub kind: AccountType,
    /// Account holder
    pub owner_id: Uuid,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with a zero balance, hashing the raw password
    pub fn register(
        kind: AccountType,
        number: i64,
        full_number: i64,
        raw_password: &str,
        owner_id: Uuid,
        encoder: &dyn PasswordEncoder,
    ) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            number,
            full_number,
            password_hash: encoder.hash(raw_password)?,
            balance: ZERO,
            kind,
            owner_id,
            created_at: now,
            updated_at: now,
        })
    }

    /// Add funds to the account; the amount must be strictly positive
    pub fn deposit(&mut self, amount: Amount) -> Result<()> {
        if amount <= 0 {
            return Err(Error::InvalidAmount(format!(
                "deposit amount must be positive, got {}",
                amount
            )));
        }
        self.balance += amount;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Remove funds from the account; fails without mutating the balance
    /// when the amount exceeds the current balance
    pub fn withdraw(&mut self, amount: Amount) -> Result<()> {
        if amount <= 0 {
            return Err(Error::InvalidAmount(format!(
                "withdraw amount must be positive, got {}",
                amount
            )));
        }
        if amount > self.balance {
            return Err(Error::InsufficientBalance(format!(
                "account {} holds {} but {} was requested",
                self.full_number, self.balance, amount
            )));
        }
        self.balance -= amount;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Verify that the requester owns this account
    pub fn check_owner(&self, requester_id: Uuid) -> Result<()> {
        if self.owner_id != requester_id {
            return Err(Error::NotOwner(format!(
                "user {} does not own account {}",
                requester_id, self.full_number
            )));
        }
        Ok(())
    }

    /// Verify a raw password against the stored credential hash
    pub fn check_password_match(&self, raw: &str, encoder: &dyn PasswordEncoder) -> Result<()> {
        if !encoder.matches(raw, &self.password_hash) {
            return Err(Error::PasswordMismatch(format!(
                "wrong password for account {}",
                self.full_number
            )));
        }
        Ok(())
    }
}
