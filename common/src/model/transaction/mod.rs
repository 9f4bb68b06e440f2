//! Ledger entries recording every balance-changing event

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::account::Account;
use crate::money::Amount;

/// Kind of balance-changing event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Deposit,
    Withdraw,
    Transfer,
}

impl TransactionType {
    /// Storage/display name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdraw => "WITHDRAW",
            TransactionType::Transfer => "TRANSFER",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DEPOSIT" => Ok(TransactionType::Deposit),
            "WITHDRAW" => Ok(TransactionType::Withdraw),
            "TRANSFER" => Ok(TransactionType::Transfer),
            other => Err(Error::Internal(format!(
                "unknown transaction type: {}",
                other
            ))),
        }
    }
}

/// Immutable ledger entry
///
/// Recorded balances are the resulting balances immediately after the
/// operation, so an account's balance timeline can be reconstructed exactly.
/// Entries are written atomically with the balance mutation they record and
/// are never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Entry identity
    pub id: Uuid,
    /// Kind of event
    pub kind: TransactionType,
    /// Moved amount in the smallest currency unit
    pub amount: Amount,
    /// Sending party (full number for account-side legs)
    pub sender: String,
    /// Receiving party (full number for account-side legs)
    pub receiver: String,
    /// Balance of the withdrawing account after the operation
    pub withdraw_account_balance: Option<Amount>,
    /// Balance of the depositing account after the operation
    pub deposit_account_balance: Option<Amount>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Whether the account with this full number is a party to the entry.
    ///
    /// Only account-side legs count: the sender of a deposit and the
    /// receiver of a withdrawal are free text, so a depositor name that
    /// happens to read like a full number never matches.
    pub fn involves(&self, full_number: i64) -> bool {
        let key = full_number.to_string();
        match self.kind {
            TransactionType::Deposit => self.receiver == key,
            TransactionType::Withdraw => self.sender == key,
            TransactionType::Transfer => self.sender == key || self.receiver == key,
        }
    }

    /// Entry for a completed deposit; call only after `Account::deposit`
    pub fn for_deposit(account: &Account, amount: Amount, sender: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: TransactionType::Deposit,
            amount,
            sender: sender.to_string(),
            receiver: account.full_number.to_string(),
            withdraw_account_balance: None,
            deposit_account_balance: Some(account.balance),
            created_at: Utc::now(),
        }
    }

    /// Entry for a completed withdrawal; call only after `Account::withdraw`
    pub fn for_withdraw(account: &Account, amount: Amount, channel: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: TransactionType::Withdraw,
            amount,
            sender: account.full_number.to_string(),
            receiver: channel.to_string(),
            withdraw_account_balance: Some(account.balance),
            deposit_account_balance: None,
            created_at: Utc::now(),
        }
    }

    /// Entry for a completed transfer, capturing both resulting balances;
    /// call only after both account mutations
    pub fn for_transfer(
        withdraw_account: &Account,
        deposit_account: &Account,
        amount: Amount,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: TransactionType::Transfer,
            amount,
            sender: withdraw_account.full_number.to_string(),
            receiver: deposit_account.full_number.to_string(),
            withdraw_account_balance: Some(withdraw_account.balance),
            deposit_account_balance: Some(deposit_account.balance),
            created_at: Utc::now(),
        }
    }
}
