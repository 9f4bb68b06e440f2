use std::sync::Arc;
use std::time::Duration;

use account_service::{
    AccountRepository, AccountService, AccountTypeCodes, InMemoryAccountRepository,
    InMemorySequenceRepository,
};
use common::error::Error;
use common::model::account::{compose_full_number, Account, AccountType, NUMBER_SPAN};
use common::model::transaction::TransactionType;
use common::password::{Argon2PasswordEncoder, PasswordEncoder};
use uuid::Uuid;

/// Plain-text encoder so tests do not pay the Argon2 cost on every call;
/// the real encoder is covered separately below.
struct PlainEncoder;

impl PasswordEncoder for PlainEncoder {
    fn hash(&self, raw: &str) -> common::error::Result<String> {
        Ok(raw.to_string())
    }

    fn matches(&self, raw: &str, hashed: &str) -> bool {
        raw == hashed
    }
}

fn test_service() -> AccountService {
    AccountService::with_parts(
        Arc::new(InMemoryAccountRepository::new()),
        Arc::new(InMemorySequenceRepository::with_defaults()),
        AccountTypeCodes::default(),
        Arc::new(PlainEncoder),
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn test_register_assigns_full_number_and_zero_balance() {
    let service = test_service();
    let owner = Uuid::new_v4();

    let account = service
        .register(AccountType::Normal, "1111", owner)
        .await
        .unwrap();

    assert_eq!(account.balance, 0);
    assert_eq!(account.kind, AccountType::Normal);
    assert_eq!(account.owner_id, owner);
    // Normal accounts carry the 234 type code prefix
    assert_eq!(account.full_number, 234 * NUMBER_SPAN + account.number);
}

#[tokio::test]
async fn test_register_advances_sequence_per_type() {
    let service = test_service();
    let owner = Uuid::new_v4();

    let first = service
        .register(AccountType::Normal, "1111", owner)
        .await
        .unwrap();
    let second = service
        .register(AccountType::Normal, "1111", owner)
        .await
        .unwrap();
    let saving = service
        .register(AccountType::Saving, "1111", owner)
        .await
        .unwrap();

    assert_eq!(second.number, first.number + 1);
    // Each type draws from its own counter
    assert_eq!(saving.number, first.number);
    assert_ne!(saving.full_number, first.full_number);
}

#[tokio::test]
async fn test_register_fails_without_seeded_sequence() {
    let service = AccountService::with_parts(
        Arc::new(InMemoryAccountRepository::new()),
        Arc::new(InMemorySequenceRepository::new()),
        AccountTypeCodes::default(),
        Arc::new(PlainEncoder),
        Duration::from_secs(5),
    );

    let result = service
        .register(AccountType::Normal, "1111", Uuid::new_v4())
        .await;
    assert!(matches!(result, Err(Error::SequenceNotFound(_))));
}

#[tokio::test]
async fn test_register_fails_without_type_code() {
    let service = AccountService::with_parts(
        Arc::new(InMemoryAccountRepository::new()),
        Arc::new(InMemorySequenceRepository::with_defaults()),
        AccountTypeCodes::new([(AccountType::Normal, 234)]),
        Arc::new(PlainEncoder),
        Duration::from_secs(5),
    );

    let result = service
        .register(AccountType::Fixed, "1111", Uuid::new_v4())
        .await;
    assert!(matches!(result, Err(Error::AccountTypeNotFound(_))));
}

#[tokio::test]
async fn test_list_for_owner() {
    let service = test_service();
    let owner = Uuid::new_v4();
    let other = Uuid::new_v4();

    let a = service
        .register(AccountType::Normal, "1111", owner)
        .await
        .unwrap();
    let b = service
        .register(AccountType::Saving, "1111", owner)
        .await
        .unwrap();
    service
        .register(AccountType::Normal, "1111", other)
        .await
        .unwrap();

    let accounts = service.list_for_owner(owner).await.unwrap();
    let numbers: Vec<i64> = accounts.iter().map(|a| a.full_number).collect();

    assert_eq!(accounts.len(), 2);
    assert!(numbers.contains(&a.full_number));
    assert!(numbers.contains(&b.full_number));
}

#[tokio::test]
async fn test_deposit_updates_balance_and_records_entry() {
    let service = test_service();
    let owner = Uuid::new_v4();
    let account = service
        .register(AccountType::Normal, "1111", owner)
        .await
        .unwrap();

    let (updated, entry) = service
        .deposit(account.full_number, 500, "010-1111-2222")
        .await
        .unwrap();

    assert_eq!(updated.balance, 500);
    assert_eq!(entry.kind, TransactionType::Deposit);
    assert_eq!(entry.amount, 500);
    assert_eq!(entry.sender, "010-1111-2222");
    assert_eq!(entry.receiver, account.full_number.to_string());
    assert_eq!(entry.deposit_account_balance, Some(500));
    assert_eq!(entry.withdraw_account_balance, None);
}

#[tokio::test]
async fn test_deposit_rejects_non_positive_amount() {
    let service = test_service();
    let account = service
        .register(AccountType::Normal, "1111", Uuid::new_v4())
        .await
        .unwrap();

    for amount in [0, -10] {
        let result = service.deposit(account.full_number, amount, "tester").await;
        assert!(matches!(result, Err(Error::InvalidAmount(_))));
    }

    // Nothing was mutated or recorded
    let account = service.get_account(account.full_number).await.unwrap();
    assert_eq!(account.balance, 0);
    assert!(service.ledger(account.full_number).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deposit_unknown_account() {
    let service = test_service();
    let result = service.deposit(23499999999, 100, "tester").await;
    assert!(matches!(result, Err(Error::AccountNotFound(_))));
}

#[tokio::test]
async fn test_withdraw_success() {
    let service = test_service();
    let owner = Uuid::new_v4();
    let account = service
        .register(AccountType::Normal, "1111", owner)
        .await
        .unwrap();
    service
        .deposit(account.full_number, 1_000, "tester")
        .await
        .unwrap();

    let (updated, entry) = service
        .withdraw(account.full_number, 300, "1111", owner)
        .await
        .unwrap();

    assert_eq!(updated.balance, 700);
    assert_eq!(entry.kind, TransactionType::Withdraw);
    assert_eq!(entry.sender, account.full_number.to_string());
    assert_eq!(entry.receiver, "ATM");
    assert_eq!(entry.withdraw_account_balance, Some(700));
    assert_eq!(entry.deposit_account_balance, None);
}

#[tokio::test]
async fn test_withdraw_insufficient_balance_leaves_account_untouched() {
    let service = test_service();
    let owner = Uuid::new_v4();
    let account = service
        .register(AccountType::Normal, "1111", owner)
        .await
        .unwrap();
    service
        .deposit(account.full_number, 100, "tester")
        .await
        .unwrap();

    let result = service
        .withdraw(account.full_number, 200, "1111", owner)
        .await;
    assert!(matches!(result, Err(Error::InsufficientBalance(_))));

    let account = service.get_account(account.full_number).await.unwrap();
    assert_eq!(account.balance, 100);
    // Only the deposit is on the ledger
    assert_eq!(service.ledger(account.full_number).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_withdraw_rejects_wrong_owner() {
    let service = test_service();
    let owner = Uuid::new_v4();
    let account = service
        .register(AccountType::Normal, "1111", owner)
        .await
        .unwrap();
    service
        .deposit(account.full_number, 100, "tester")
        .await
        .unwrap();

    let result = service
        .withdraw(account.full_number, 50, "1111", Uuid::new_v4())
        .await;
    assert!(matches!(result, Err(Error::NotOwner(_))));
}

#[tokio::test]
async fn test_withdraw_rejects_wrong_password() {
    let service = test_service();
    let owner = Uuid::new_v4();
    let account = service
        .register(AccountType::Normal, "1111", owner)
        .await
        .unwrap();
    service
        .deposit(account.full_number, 100, "tester")
        .await
        .unwrap();

    let result = service
        .withdraw(account.full_number, 50, "9999", owner)
        .await;
    assert!(matches!(result, Err(Error::PasswordMismatch(_))));
}

#[tokio::test]
async fn test_transfer_moves_funds_and_records_both_balances() {
    let service = test_service();
    let owner = Uuid::new_v4();
    let from = service
        .register(AccountType::Normal, "1111", owner)
        .await
        .unwrap();
    let to = service
        .register(AccountType::Normal, "2222", Uuid::new_v4())
        .await
        .unwrap();
    service
        .deposit(from.full_number, 1_000, "tester")
        .await
        .unwrap();
    service
        .deposit(to.full_number, 200, "tester")
        .await
        .unwrap();

    let (withdraw_account, entry) = service
        .transfer(from.full_number, to.full_number, 400, "1111", owner)
        .await
        .unwrap();

    assert_eq!(withdraw_account.balance, 600);
    assert_eq!(entry.kind, TransactionType::Transfer);
    assert_eq!(entry.sender, from.full_number.to_string());
    assert_eq!(entry.receiver, to.full_number.to_string());
    assert_eq!(entry.withdraw_account_balance, Some(600));
    assert_eq!(entry.deposit_account_balance, Some(600));

    // Conservation: total funds are unchanged
    let from = service.get_account(from.full_number).await.unwrap();
    let to = service.get_account(to.full_number).await.unwrap();
    assert_eq!(from.balance + to.balance, 1_200);
    assert_eq!(from.balance, 600);
    assert_eq!(to.balance, 600);
}

#[tokio::test]
async fn test_transfer_same_account_rejected_without_mutation() {
    let service = test_service();
    let owner = Uuid::new_v4();
    let account = service
        .register(AccountType::Normal, "1111", owner)
        .await
        .unwrap();
    service
        .deposit(account.full_number, 1_000, "tester")
        .await
        .unwrap();

    let result = service
        .transfer(account.full_number, account.full_number, 100, "1111", owner)
        .await;
    assert!(matches!(result, Err(Error::SameAccountTransfer(_))));

    let account = service.get_account(account.full_number).await.unwrap();
    assert_eq!(account.balance, 1_000);
    assert_eq!(service.ledger(account.full_number).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_transfer_insufficient_balance_mutates_neither_account() {
    let service = test_service();
    let owner = Uuid::new_v4();
    let from = service
        .register(AccountType::Normal, "1111", owner)
        .await
        .unwrap();
    let to = service
        .register(AccountType::Normal, "2222", Uuid::new_v4())
        .await
        .unwrap();
    service
        .deposit(from.full_number, 100, "tester")
        .await
        .unwrap();

    let result = service
        .transfer(from.full_number, to.full_number, 500, "1111", owner)
        .await;
    assert!(matches!(result, Err(Error::InsufficientBalance(_))));

    let from = service.get_account(from.full_number).await.unwrap();
    let to = service.get_account(to.full_number).await.unwrap();
    assert_eq!(from.balance, 100);
    assert_eq!(to.balance, 0);
    assert!(service.ledger(to.full_number).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_transfer_checks_owner_and_password_on_withdrawing_account() {
    let service = test_service();
    let owner = Uuid::new_v4();
    let from = service
        .register(AccountType::Normal, "1111", owner)
        .await
        .unwrap();
    let to = service
        .register(AccountType::Normal, "2222", Uuid::new_v4())
        .await
        .unwrap();
    service
        .deposit(from.full_number, 1_000, "tester")
        .await
        .unwrap();

    let result = service
        .transfer(from.full_number, to.full_number, 100, "1111", Uuid::new_v4())
        .await;
    assert!(matches!(result, Err(Error::NotOwner(_))));

    let result = service
        .transfer(from.full_number, to.full_number, 100, "9999", owner)
        .await;
    assert!(matches!(result, Err(Error::PasswordMismatch(_))));
}

#[tokio::test]
async fn test_ledger_reconstructs_balance_timeline() {
    let service = test_service();
    let owner = Uuid::new_v4();
    let account = service
        .register(AccountType::Normal, "1111", owner)
        .await
        .unwrap();

    service
        .deposit(account.full_number, 1_000, "tester")
        .await
        .unwrap();
    service
        .withdraw(account.full_number, 250, "1111", owner)
        .await
        .unwrap();
    service
        .deposit(account.full_number, 50, "tester")
        .await
        .unwrap();

    let entries = service.ledger(account.full_number).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].deposit_account_balance, Some(1_000));
    assert_eq!(entries[1].withdraw_account_balance, Some(750));
    assert_eq!(entries[2].deposit_account_balance, Some(800));

    let account = service.get_account(account.full_number).await.unwrap();
    assert_eq!(account.balance, 800);
}

#[tokio::test]
async fn test_ledger_ignores_free_text_matching_another_full_number() {
    let service = test_service();
    let owner = Uuid::new_v4();
    let first = service
        .register(AccountType::Normal, "1111", owner)
        .await
        .unwrap();
    let second = service
        .register(AccountType::Normal, "2222", owner)
        .await
        .unwrap();

    // A depositor name that reads like the second account's full number
    // stays free text
    service
        .deposit(first.full_number, 500, &second.full_number.to_string())
        .await
        .unwrap();

    let first_entries = service.ledger(first.full_number).await.unwrap();
    assert_eq!(first_entries.len(), 1);
    assert!(service.ledger(second.full_number).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_repository_rejects_duplicate_full_number() {
    let repo = InMemoryAccountRepository::new();
    let owner = Uuid::new_v4();
    let full_number = compose_full_number(234, 11_111_111).unwrap();
    let account =
        Account::register(AccountType::Normal, 11_111_111, full_number, "1111", owner, &PlainEncoder)
            .unwrap();

    repo.insert(account.clone()).await.unwrap();
    let result = repo.insert(account).await;

    assert!(matches!(result, Err(Error::DuplicateFullNumber(_))));
}

#[tokio::test]
async fn test_delete_account_requires_owner() {
    let service = test_service();
    let owner = Uuid::new_v4();
    let account = service
        .register(AccountType::Normal, "1111", owner)
        .await
        .unwrap();

    let result = service
        .delete_account(account.full_number, Uuid::new_v4())
        .await;
    assert!(matches!(result, Err(Error::NotOwner(_))));

    service
        .delete_account(account.full_number, owner)
        .await
        .unwrap();

    let result = service.get_account(account.full_number).await;
    assert!(matches!(result, Err(Error::AccountNotFound(_))));
}

#[test]
fn test_compose_full_number() {
    assert_eq!(compose_full_number(234, 11_111_111).unwrap(), 23_411_111_111);
    // Sequence values outside the number span are rejected
    assert!(compose_full_number(234, NUMBER_SPAN).is_err());
    assert!(compose_full_number(234, -1).is_err());
}

#[test]
fn test_argon2_encoder_roundtrip() {
    let encoder = Argon2PasswordEncoder::new();
    let hash = encoder.hash("1234").unwrap();

    assert_ne!(hash, "1234");
    assert!(encoder.matches("1234", &hash));
    assert!(!encoder.matches("4321", &hash));
    assert!(!encoder.matches("1234", "not-a-phc-hash"));
}

#[test]
fn test_lock_contention_is_the_only_retryable_error() {
    assert!(Error::LockContention("busy".to_string()).is_retryable());
    assert!(!Error::InsufficientBalance("empty".to_string()).is_retryable());
    assert!(!Error::AccountNotFound("missing".to_string()).is_retryable());
}
