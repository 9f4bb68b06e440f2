//! In-memory repositories, the default backend for tests and local runs

use async_trait::async_trait;
use common::error::{Error, Result};
use common::model::account::{Account, AccountType};
use common::model::transaction::Transaction;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AccountRepository, SequenceRepository};

/// Default starting value for freshly seeded sequences, giving 8-digit
/// account numbers from the first registration on
pub(crate) const DEFAULT_SEQUENCE_START: i64 = 11_111_111;

/// In-memory account and ledger storage
pub struct InMemoryAccountRepository {
    /// Accounts by full number
    accounts: DashMap<i64, Account>,
    /// Append-only ledger, in commit order
    ledger: Mutex<Vec<Transaction>>,
}

impl InMemoryAccountRepository {
    /// Create an empty in-memory repository
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            ledger: Mutex::new(Vec::new()),
        }
    }
}

impl Default for InMemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn insert(&self, account: Account) -> Result<Account> {
        match self.accounts.entry(account.full_number) {
            Entry::Occupied(_) => Err(Error::DuplicateFullNumber(format!(
                "an account with full number {} already exists",
                account.full_number
            ))),
            Entry::Vacant(slot) => {
                slot.insert(account.clone());
                Ok(account)
            }
        }
    }

    async fn find_by_full_number(&self, full_number: i64) -> Result<Option<Account>> {
        Ok(self.accounts.get(&full_number).map(|a| a.clone()))
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Account>> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .filter(|entry| entry.value().owner_id == owner_id)
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by_key(|a| a.full_number);
        Ok(accounts)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<()> {
        let key = self
            .accounts
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| *entry.key());

        match key {
            Some(full_number) => {
                self.accounts.remove(&full_number);
                Ok(())
            }
            None => Err(Error::AccountNotFound(format!("no account with id {}", id))),
        }
    }

    async fn commit_mutation(
        &self,
        accounts: &[Account],
        entry: Transaction,
    ) -> Result<Transaction> {
        // Callers hold the per-account locks, so replacing the rows and
        // appending the entry cannot interleave with another mutation on
        // the same accounts.
        for account in accounts {
            self.accounts
                .insert(account.full_number, account.clone());
        }
        self.ledger.lock().await.push(entry.clone());
        Ok(entry)
    }

    async fn ledger_for(&self, full_number: i64) -> Result<Vec<Transaction>> {
        let ledger = self.ledger.lock().await;
        Ok(ledger
            .iter()
            .filter(|t| t.involves(full_number))
            .cloned()
            .collect())
    }
}

/// In-memory per-type number sequences
pub struct InMemorySequenceRepository {
    counters: DashMap<AccountType, i64>,
}

impl InMemorySequenceRepository {
    /// Create a repository with no seeded sequences
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
        }
    }

    /// Create a repository with every account type seeded at the default start
    pub fn with_defaults() -> Self {
        let repo = Self::new();
        for kind in [AccountType::Normal, AccountType::Saving, AccountType::Fixed] {
            repo.counters.insert(kind, DEFAULT_SEQUENCE_START);
        }
        repo
    }
}

#[async_trait]
impl SequenceRepository for InMemorySequenceRepository {
    async fn take_next(&self, kind: AccountType) -> Result<i64> {
        // The map entry guard makes the read-increment atomic
        let mut counter = self.counters.get_mut(&kind).ok_or_else(|| {
            Error::SequenceNotFound(format!("no sequence seeded for {}", kind))
        })?;
        let value = *counter;
        *counter += 1;
        Ok(value)
    }

    async fn seed(&self, kind: AccountType, start: i64) -> Result<()> {
        self.counters.insert(kind, start);
        Ok(())
    }
}
