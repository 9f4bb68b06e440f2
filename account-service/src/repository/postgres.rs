//! PostgreSQL repositories
//!
//! Schema lives in the workspace `migrations/` directory. Queries are plain
//! `sqlx::query` with manual row mapping, so the crate builds without a live
//! database.

use std::str::FromStr;

use async_trait::async_trait;
use common::error::{Error, Result};
use common::model::account::{Account, AccountType};
use common::model::transaction::{Transaction, TransactionType};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use super::{AccountRepository, SequenceRepository};

/// Connect a PostgreSQL pool, falling back to `DATABASE_URL` when no
/// explicit URL is given
pub async fn connect_pool(database_url: Option<String>, max_connections: u32) -> Result<PgPool> {
    let url = match database_url {
        Some(url) => url,
        None => std::env::var("DATABASE_URL")
            .map_err(|_| Error::ConfigurationError("DATABASE_URL must be set".to_string()))?,
    };

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&url)
        .await
        .map_err(Error::Database)?;

    info!("Connected to PostgreSQL database");

    Ok(pool)
}

fn account_from_row(row: &sqlx::postgres::PgRow) -> Result<Account> {
    let kind: String = row.get("kind");
    Ok(Account {
        id: row.get("id"),
        number: row.get("number"),
        full_number: row.get("full_number"),
        password_hash: row.get("password_hash"),
        balance: row.get("balance"),
        kind: AccountType::from_str(&kind)?,
        owner_id: row.get("owner_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn entry_from_row(row: &sqlx::postgres::PgRow) -> Result<Transaction> {
    let kind: String = row.get("kind");
    Ok(Transaction {
        id: row.get("id"),
        kind: TransactionType::from_str(&kind)?,
        amount: row.get("amount"),
        sender: row.get("sender"),
        receiver: row.get("receiver"),
        withdraw_account_balance: row.get("withdraw_account_balance"),
        deposit_account_balance: row.get("deposit_account_balance"),
        created_at: row.get("created_at"),
    })
}

/// PostgreSQL account and ledger storage
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    /// Create a repository over an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new repository
    pub async fn new(database_url: Option<String>) -> Result<Self> {
        Ok(Self::from_pool(connect_pool(database_url, 5).await?))
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn insert(&self, account: Account) -> Result<Account> {
        debug!("Inserting account {} into database", account.full_number);

        let result = sqlx::query(
            "INSERT INTO accounts \
             (id, number, full_number, password_hash, balance, kind, owner_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (full_number) DO NOTHING",
        )
        .bind(account.id)
        .bind(account.number)
        .bind(account.full_number)
        .bind(&account.password_hash)
        .bind(account.balance)
        .bind(account.kind.as_str())
        .bind(account.owner_id)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::DuplicateFullNumber(format!(
                "an account with full number {} already exists",
                account.full_number
            )));
        }

        Ok(account)
    }

    async fn find_by_full_number(&self, full_number: i64) -> Result<Option<Account>> {
        debug!("Getting account {} from database", full_number);

        let row = sqlx::query(
            "SELECT id, number, full_number, password_hash, balance, kind, owner_id, \
                    created_at, updated_at \
             FROM accounts WHERE full_number = $1",
        )
        .bind(full_number)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(account_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Account>> {
        debug!("Getting accounts for owner {}", owner_id);

        let rows = sqlx::query(
            "SELECT id, number, full_number, password_hash, balance, kind, owner_id, \
                    created_at, updated_at \
             FROM accounts WHERE owner_id = $1 ORDER BY full_number",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut accounts = Vec::with_capacity(rows.len());
        for row in rows {
            accounts.push(account_from_row(&row)?);
        }
        Ok(accounts)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::AccountNotFound(format!("no account with id {}", id)));
        }
        Ok(())
    }

    async fn commit_mutation(
        &self,
        accounts: &[Account],
        entry: Transaction,
    ) -> Result<Transaction> {
        debug!(
            "Committing {} mutation for {} account(s)",
            entry.kind,
            accounts.len()
        );

        // One database transaction covers the balance update(s) and the
        // ledger insert; an early return drops the transaction and rolls
        // everything back.
        let mut tx = self.pool.begin().await?;

        for account in accounts {
            let result = sqlx::query(
                "UPDATE accounts SET balance = $1, updated_at = $2 WHERE id = $3",
            )
            .bind(account.balance)
            .bind(account.updated_at)
            .bind(account.id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(Error::AccountNotFound(format!(
                    "account {} vanished during mutation",
                    account.full_number
                )));
            }
        }

        sqlx::query(
            "INSERT INTO ledger_entries \
             (id, kind, amount, sender, receiver, withdraw_account_balance, \
              deposit_account_balance, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(entry.id)
        .bind(entry.kind.as_str())
        .bind(entry.amount)
        .bind(&entry.sender)
        .bind(&entry.receiver)
        .bind(entry.withdraw_account_balance)
        .bind(entry.deposit_account_balance)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(entry)
    }

    async fn ledger_for(&self, full_number: i64) -> Result<Vec<Transaction>> {
        // Only account-side legs match; deposit senders and withdraw
        // receivers are free text.
        let key = full_number.to_string();
        let rows = sqlx::query(
            "SELECT id, kind, amount, sender, receiver, withdraw_account_balance, \
                    deposit_account_balance, created_at \
             FROM ledger_entries \
             WHERE (kind = 'DEPOSIT' AND receiver = $1) \
                OR (kind = 'WITHDRAW' AND sender = $1) \
                OR (kind = 'TRANSFER' AND (sender = $1 OR receiver = $1)) \
             ORDER BY created_at",
        )
        .bind(&key)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(entry_from_row(&row)?);
        }
        Ok(entries)
    }
}

/// PostgreSQL per-type number sequences
pub struct PostgresSequenceRepository {
    pool: PgPool,
}

impl PostgresSequenceRepository {
    /// Create a repository over an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SequenceRepository for PostgresSequenceRepository {
    async fn take_next(&self, kind: AccountType) -> Result<i64> {
        // A single auto-committed statement: the increment is visible
        // immediately and never joins a caller transaction, so a failed
        // registration skips the value instead of reusing it.
        let row = sqlx::query(
            "UPDATE account_sequences SET next_value = next_value + 1 \
             WHERE kind = $1 RETURNING next_value - 1 AS value",
        )
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.get("value"))
            .ok_or_else(|| Error::SequenceNotFound(format!("no sequence seeded for {}", kind)))
    }

    async fn seed(&self, kind: AccountType, start: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO account_sequences (kind, next_value) VALUES ($1, $2) \
             ON CONFLICT (kind) DO UPDATE SET next_value = $2",
        )
        .bind(kind.as_str())
        .bind(start)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
