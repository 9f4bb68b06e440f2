//! Account service implementation

use std::sync::Arc;
use std::time::Duration;

use common::error::{Error, ErrorExt, Result};
use common::model::account::{compose_full_number, Account, AccountType};
use common::model::transaction::Transaction;
use common::money::Amount;
use common::password::{Argon2PasswordEncoder, PasswordEncoder};
use tracing::info;
use uuid::Uuid;

use crate::codes::AccountTypeCodes;
use crate::config::AccountServiceConfig;
use crate::lock::AccountLockService;
use crate::repository::{
    connect_pool, AccountRepository, InMemoryAccountRepository, InMemorySequenceRepository,
    PostgresAccountRepository, PostgresSequenceRepository, SequenceRepository,
};

/// Channel recorded on withdraw ledger entries
const WITHDRAW_CHANNEL: &str = "ATM";

/// Repository type
pub enum RepositoryType {
    /// In-memory repositories
    InMemory,
    /// PostgreSQL repositories
    Postgres(Option<String>),
}

/// Account service composing registration, balance mutation, and ledger
/// recording into complete operations
pub struct AccountService {
    accounts: Arc<dyn AccountRepository>,
    sequences: Arc<dyn SequenceRepository>,
    type_codes: AccountTypeCodes,
    encoder: Arc<dyn PasswordEncoder>,
    locks: AccountLockService,
}

impl AccountService {
    /// Create a new account service over in-memory repositories
    pub fn new() -> Self {
        Self::with_parts(
            Arc::new(InMemoryAccountRepository::new()),
            Arc::new(InMemorySequenceRepository::with_defaults()),
            AccountTypeCodes::default(),
            Arc::new(Argon2PasswordEncoder::new()),
            Duration::from_millis(crate::config::DEFAULT_LOCK_WAIT_MS),
        )
    }

    /// Create a new account service with a specific repository type
    pub async fn with_repository(repo_type: RepositoryType) -> Result<Self> {
        match repo_type {
            RepositoryType::InMemory => Ok(Self::new()),
            RepositoryType::Postgres(database_url) => {
                let pool = connect_pool(database_url, 5).await?;
                Ok(Self::with_parts(
                    Arc::new(PostgresAccountRepository::from_pool(pool.clone())),
                    Arc::new(PostgresSequenceRepository::from_pool(pool)),
                    AccountTypeCodes::default(),
                    Arc::new(Argon2PasswordEncoder::new()),
                    Duration::from_millis(crate::config::DEFAULT_LOCK_WAIT_MS),
                ))
            }
        }
    }

    /// Create a new account service with a configuration
    pub async fn with_config(config: &AccountServiceConfig) -> Result<Self> {
        let pool = connect_pool(Some(config.database_url.clone()), config.db_pool_size).await?;
        Ok(Self::with_parts(
            Arc::new(PostgresAccountRepository::from_pool(pool.clone())),
            Arc::new(PostgresSequenceRepository::from_pool(pool)),
            AccountTypeCodes::default(),
            Arc::new(Argon2PasswordEncoder::new()),
            Duration::from_millis(config.lock_wait_ms),
        ))
    }

    /// Create a new account service from explicit parts
    pub fn with_parts(
        accounts: Arc<dyn AccountRepository>,
        sequences: Arc<dyn SequenceRepository>,
        type_codes: AccountTypeCodes,
        encoder: Arc<dyn PasswordEncoder>,
        lock_wait: Duration,
    ) -> Self {
        let locks = AccountLockService::new(Arc::clone(&accounts), lock_wait);
        Self {
            accounts,
            sequences,
            type_codes,
            encoder,
            locks,
        }
    }

    /// Register a new account with a zero balance.
    ///
    /// The sequence increment commits on its own, before and independently
    /// of the account insert, so concurrent registrations of the same type
    /// always receive distinct full numbers.
    pub async fn register(
        &self,
        kind: AccountType,
        raw_password: &str,
        owner_id: Uuid,
    ) -> Result<Account> {
        info!("Registering new {} account for owner {}", kind, owner_id);

        let type_code = self.type_codes.code_for(kind)?;
        let number = self.sequences.take_next(kind).await?;
        let full_number = compose_full_number(type_code, number)?;

        let account = Account::register(
            kind,
            number,
            full_number,
            raw_password,
            owner_id,
            self.encoder.as_ref(),
        )?;

        self.accounts
            .insert(account)
            .await
            .with_context(|| format!("failed to persist account {}", full_number))
    }

    /// All accounts held by an owner
    pub async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<Account>> {
        self.accounts.find_by_owner(owner_id).await
    }

    /// Look up a single account
    pub async fn get_account(&self, full_number: i64) -> Result<Account> {
        self.accounts
            .find_by_full_number(full_number)
            .await?
            .ok_or_else(|| {
                Error::AccountNotFound(format!("no account with full number {}", full_number))
            })
    }

    /// Ledger entries touching an account, oldest first
    pub async fn ledger(&self, full_number: i64) -> Result<Vec<Transaction>> {
        self.accounts.ledger_for(full_number).await
    }

    /// Deposit funds into an account
    pub async fn deposit(
        &self,
        full_number: i64,
        amount: Amount,
        sender: &str,
    ) -> Result<(Account, Transaction)> {
        info!("Depositing {} into account {}", amount, full_number);

        let sender = sender.to_string();
        self.locks
            .mutate(full_number, move |account| {
                account.deposit(amount)?;
                Ok(Transaction::for_deposit(account, amount, &sender))
            })
            .await
    }

    /// Withdraw funds from an account; only the owner with the right
    /// password may withdraw, and never below a zero balance
    pub async fn withdraw(
        &self,
        full_number: i64,
        amount: Amount,
        raw_password: &str,
        requester_id: Uuid,
    ) -> Result<(Account, Transaction)> {
        info!("Withdrawing {} from account {}", amount, full_number);

        let encoder = Arc::clone(&self.encoder);
        let raw_password = raw_password.to_string();
        self.locks
            .mutate(full_number, move |account| {
                account.check_owner(requester_id)?;
                account.check_password_match(&raw_password, encoder.as_ref())?;
                account.withdraw(amount)?;
                Ok(Transaction::for_withdraw(account, amount, WITHDRAW_CHANNEL))
            })
            .await
    }

    /// Transfer funds between two accounts.
    ///
    /// Both legs run under the same per-account locking as deposit and
    /// withdraw; both balance changes and the single ledger entry commit
    /// together or not at all. Returns the withdrawing account.
    pub async fn transfer(
        &self,
        withdraw_full_number: i64,
        deposit_full_number: i64,
        amount: Amount,
        raw_password: &str,
        requester_id: Uuid,
    ) -> Result<(Account, Transaction)> {
        if withdraw_full_number == deposit_full_number {
            return Err(Error::SameAccountTransfer(format!(
                "cannot transfer from account {} to itself",
                withdraw_full_number
            )));
        }

        info!(
            "Transferring {} from account {} to account {}",
            amount, withdraw_full_number, deposit_full_number
        );

        let encoder = Arc::clone(&self.encoder);
        let raw_password = raw_password.to_string();
        let (withdraw_account, _deposit_account, entry) = self
            .locks
            .mutate_pair(
                withdraw_full_number,
                deposit_full_number,
                move |withdraw_account, deposit_account| {
                    withdraw_account.check_owner(requester_id)?;
                    withdraw_account.check_password_match(&raw_password, encoder.as_ref())?;
                    withdraw_account.withdraw(amount)?;
                    deposit_account.deposit(amount)?;
                    Ok(Transaction::for_transfer(
                        withdraw_account,
                        deposit_account,
                        amount,
                    ))
                },
            )
            .await?;

        Ok((withdraw_account, entry))
    }

    /// Delete an account; only its owner may delete it. Not balance-mutating
    /// and therefore outside the locked mutation path.
    pub async fn delete_account(&self, full_number: i64, requester_id: Uuid) -> Result<()> {
        let account = self.get_account(full_number).await?;
        account.check_owner(requester_id)?;

        info!("Deleting account {}", full_number);
        self.accounts.delete_by_id(account.id).await
    }
}

impl Default for AccountService {
    fn default() -> Self {
        Self::new()
    }
}
