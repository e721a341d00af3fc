use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Account, AccountId, Cents, Transaction};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    #[error("Account number already exists: {0}")]
    DuplicateAccountNumber(String),

    /// The stored balance no longer matches the one the caller loaded.
    #[error("Balance of account {0} changed concurrently")]
    Conflict(AccountId),

    #[error("Persistence error: {0:#}")]
    Persistence(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Load/save contract for accounts.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fetch an account, failing with `NotFound` if it does not exist.
    async fn find_account(&self, id: AccountId) -> StoreResult<Account>;

    async fn find_account_by_number(&self, account_number: &str) -> StoreResult<Option<Account>>;

    /// All accounts, ordered by id.
    async fn list_accounts(&self) -> StoreResult<Vec<Account>>;

    /// Insert the account when it has no id yet (the assigned id is written back),
    /// otherwise update its stored fields.
    async fn save_account(&self, account: &mut Account) -> StoreResult<()>;
}

/// Append-only contract for transaction records.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert a new record. The assigned id is written back.
    async fn save_transaction(&self, transaction: &mut Transaction) -> StoreResult<()>;

    /// History of one account, ordered by id.
    async fn list_transactions(&self, account_id: AccountId) -> StoreResult<Vec<Transaction>>;
}

/// A store holding both accounts and transactions, able to write a balance
/// change and its transaction record as one unit.
#[async_trait]
pub trait LedgerStore: AccountStore + TransactionStore {
    /// Persist `account`'s balance and insert `transaction` atomically.
    /// Either both writes become visible or neither does.
    ///
    /// The write only applies while the stored balance still equals
    /// `expected_balance`; otherwise nothing is written and `Conflict` is
    /// returned. `transaction` must belong to `account`.
    async fn commit(
        &self,
        expected_balance: Cents,
        account: &Account,
        transaction: &mut Transaction,
    ) -> StoreResult<()>;
}
