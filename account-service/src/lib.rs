//! Account core: registration, serialized balance mutation, ledger recording

pub mod codes;
pub mod config;
pub mod lock;
pub mod repository;
pub mod service;

pub use codes::AccountTypeCodes;
pub use config::AccountServiceConfig;
pub use lock::AccountLockService;
pub use repository::{
    AccountRepository, InMemoryAccountRepository, InMemorySequenceRepository,
    PostgresAccountRepository, PostgresSequenceRepository, SequenceRepository,
};
pub use service::{AccountService, RepositoryType};
