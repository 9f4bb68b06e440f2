//! Per-account exclusive access
//!
//! Serializes mutations so at most one mutator touches a given account at a
//! time: concurrent deposits/withdrawals on one account execute one by one
//! in commit order, while operations on different accounts run fully in
//! parallel. Accounts are keyed by full number; each key gets its own async
//! mutex, and acquisition waits are bounded so a stuck holder surfaces as
//! retryable contention instead of blocking callers indefinitely.

use std::sync::Arc;
use std::time::Duration;

use common::error::{Error, Result};
use common::model::account::Account;
use common::model::transaction::Transaction;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;

use crate::repository::AccountRepository;

/// Exclusive per-account lock service
pub struct AccountLockService {
    accounts: Arc<dyn AccountRepository>,
    cells: DashMap<i64, Arc<Mutex<()>>>,
    max_wait: Duration,
}

impl AccountLockService {
    /// Create a lock service over an account repository
    pub fn new(accounts: Arc<dyn AccountRepository>, max_wait: Duration) -> Self {
        Self {
            accounts,
            cells: DashMap::new(),
            max_wait,
        }
    }

    fn cell(&self, full_number: i64) -> Arc<Mutex<()>> {
        self.cells.entry(full_number).or_default().clone()
    }

    async fn acquire(&self, full_number: i64) -> Result<OwnedMutexGuard<()>> {
        timeout(self.max_wait, self.cell(full_number).lock_owned())
            .await
            .map_err(|_| {
                Error::LockContention(format!(
                    "account {} is busy, retry the operation",
                    full_number
                ))
            })
    }

    async fn load(&self, full_number: i64) -> Result<Account> {
        self.accounts
            .find_by_full_number(full_number)
            .await?
            .ok_or_else(|| {
                Error::AccountNotFound(format!("no account with full number {}", full_number))
            })
    }

    /// Run a mutation against one account under its exclusive lock.
    ///
    /// Loads the account, applies `op`, and commits the mutated state with
    /// the ledger entry `op` returned, all while holding the lock. If `op`
    /// fails, nothing is persisted.
    pub async fn mutate<F>(&self, full_number: i64, op: F) -> Result<(Account, Transaction)>
    where
        F: FnOnce(&mut Account) -> Result<Transaction> + Send,
    {
        let _guard = self.acquire(full_number).await?;

        let mut account = self.load(full_number).await?;
        let entry = op(&mut account)?;
        let entry = self
            .accounts
            .commit_mutation(std::slice::from_ref(&account), entry)
            .await?;

        Ok((account, entry))
    }

    /// Run a mutation against two accounts under both exclusive locks.
    ///
    /// Locks are always taken in ascending full-number order, independent of
    /// argument order, so opposite-direction transfers between the same pair
    /// of accounts cannot deadlock. Both mutated accounts and the single
    /// ledger entry commit in one atomic unit of work.
    pub async fn mutate_pair<F>(
        &self,
        first: i64,
        second: i64,
        op: F,
    ) -> Result<(Account, Account, Transaction)>
    where
        F: FnOnce(&mut Account, &mut Account) -> Result<Transaction> + Send,
    {
        debug_assert_ne!(first, second);
        let (lower, higher) = if first < second {
            (first, second)
        } else {
            (second, first)
        };

        let _lower_guard = self.acquire(lower).await?;
        let _higher_guard = self.acquire(higher).await?;

        let mut first_account = self.load(first).await?;
        let mut second_account = self.load(second).await?;
        let entry = op(&mut first_account, &mut second_account)?;

        let accounts = [first_account, second_account];
        let entry = self.accounts.commit_mutation(&accounts, entry).await?;
        let [first_account, second_account] = accounts;

        Ok((first_account, second_account, entry))
    }
}
