//! Repositories for account, sequence, and ledger data

use async_trait::async_trait;
use common::error::Result;
use common::model::account::{Account, AccountType};
use common::model::transaction::Transaction;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::{InMemoryAccountRepository, InMemorySequenceRepository};
pub use postgres::{connect_pool, PostgresAccountRepository, PostgresSequenceRepository};

/// Account and ledger storage
///
/// `commit_mutation` is the single write path for balance changes: the
/// updated account row(s) and the ledger entry recording them commit in one
/// atomic unit of work. Callers are expected to hold the per-account lock(s)
/// for every account they pass in.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Persist a newly registered account; rejects a duplicate full number
    async fn insert(&self, account: Account) -> Result<Account>;

    /// Look up an account by its full number
    async fn find_by_full_number(&self, full_number: i64) -> Result<Option<Account>>;

    /// All accounts held by an owner, ordered by full number
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Account>>;

    /// Remove an account by its internal id
    async fn delete_by_id(&self, id: Uuid) -> Result<()>;

    /// Persist mutated account state together with its ledger entry,
    /// atomically: both commit or neither does
    async fn commit_mutation(&self, accounts: &[Account], entry: Transaction)
        -> Result<Transaction>;

    /// Ledger entries touching an account, oldest first
    async fn ledger_for(&self, full_number: i64) -> Result<Vec<Transaction>>;
}

/// Per-type account number sequences
///
/// `take_next` executes as its own atomic unit of work, decoupled from any
/// caller transaction: a failed registration never rolls the counter back,
/// so values may be skipped but are never reused or duplicated.
#[async_trait]
pub trait SequenceRepository: Send + Sync {
    /// Take the next sequence value for an account type
    async fn take_next(&self, kind: AccountType) -> Result<i64>;

    /// Seed the counter for an account type
    async fn seed(&self, kind: AccountType, start: i64) -> Result<()>;
}
