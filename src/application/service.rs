use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::{Account, AccountError, AccountId, Cents, Transaction, TransactionType};
use crate::storage::{InMemoryStore, LedgerStore, SqliteStore, StoreError};

use super::AppError;

/// How many times `process` reloads the account after a conflicting commit.
const MAX_COMMIT_ATTEMPTS: u32 = 32;

/// Application service providing the ledger operations.
/// This is the primary interface for any client (HTTP API, CLI, etc.).
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    /// One async lock per account id; `process` holds it from load to commit.
    account_locks: Mutex<HashMap<AccountId, Arc<Mutex<()>>>>,
}

/// Result of a successfully applied deposit or withdrawal
#[derive(Debug, Clone)]
pub struct Receipt {
    /// Account state after the mutation, as persisted
    pub account: Account,
    /// The transaction record written alongside it
    pub transaction: Transaction,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            account_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Service over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    /// Open (creating if needed) the SQLite database at the given path and apply the schema.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let store = SqliteStore::init(&db_url).await?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let store = SqliteStore::connect(&db_url).await?;
        Ok(Self::new(Arc::new(store)))
    }

    /// The underlying store, for tools that write through the storage contracts directly.
    pub fn store(&self) -> Arc<dyn LedgerStore> {
        Arc::clone(&self.store)
    }

    // ========================
    // Account operations
    // ========================

    /// Provision a new account with an opening balance.
    pub async fn open_account(
        &self,
        account_number: String,
        initial_balance: Cents,
    ) -> Result<Account, AppError> {
        if initial_balance < 0 {
            return Err(AppError::InvalidAmount(
                "Initial balance cannot be negative".to_string(),
            ));
        }
        if self
            .store
            .find_account_by_number(&account_number)
            .await?
            .is_some()
        {
            return Err(AppError::AccountAlreadyExists(account_number));
        }

        let mut account = Account::new(account_number, initial_balance);
        self.store.save_account(&mut account).await?;

        info!(account_id = account.id, number = %account.account_number, "opened account");
        Ok(account)
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        Ok(self.store.find_account(id).await?)
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.store.list_accounts().await?)
    }

    /// Transaction history of an account, oldest first.
    pub async fn account_history(&self, id: AccountId) -> Result<Vec<Transaction>, AppError> {
        // Distinguish "unknown account" from "no transactions yet"
        self.store.find_account(id).await?;
        Ok(self.store.list_transactions(id).await?)
    }

    // ========================
    // Ledger operations
    // ========================

    pub async fn deposit(&self, account_id: AccountId, amount: Cents) -> Result<Receipt, AppError> {
        self.process(account_id, amount, TransactionType::Deposit.as_str())
            .await
    }

    pub async fn withdraw(&self, account_id: AccountId, amount: Cents) -> Result<Receipt, AppError> {
        self.process(account_id, amount, TransactionType::Withdrawal.as_str())
            .await
    }

    /// Apply a deposit or withdrawal to an account and record it.
    ///
    /// The account is loaded, mutated in memory, and then its new balance and
    /// the transaction record are committed to the store as one unit. Any
    /// rejection happens before the commit, so a failed call leaves no trace.
    ///
    /// The commit only lands if the stored balance is still the one that was
    /// loaded. Another writer on the same database (a second service, the CLI
    /// next to a running server) makes it conflict; the account is then
    /// reloaded and the checks run again.
    #[tracing::instrument(skip(self))]
    pub async fn process(
        &self,
        account_id: AccountId,
        amount: Cents,
        transaction_type: &str,
    ) -> Result<Receipt, AppError> {
        let lock = self.account_lock(account_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.process_locked(account_id, amount, transaction_type)
                .await
        };
        self.release_account_lock(account_id, lock).await;
        result
    }

    async fn process_locked(
        &self,
        account_id: AccountId,
        amount: Cents,
        transaction_type: &str,
    ) -> Result<Receipt, AppError> {
        let mut account = self.store.find_account(account_id).await?;

        let Some(kind) = TransactionType::from_str(transaction_type) else {
            warn!("rejected unknown transaction type");
            return Err(AppError::InvalidTransactionType(
                transaction_type.to_string(),
            ));
        };

        if amount <= 0 {
            warn!("rejected non-positive amount");
            return Err(AppError::InvalidAmount(
                "Amount must be positive".to_string(),
            ));
        }

        let mut attempt = 1;
        loop {
            let loaded_balance = account.balance;
            apply(&mut account, kind, amount)?;

            let mut transaction = Transaction::new(account.id, amount, kind);

            match self
                .store
                .commit(loaded_balance, &account, &mut transaction)
                .await
            {
                Ok(()) => {
                    info!(
                        transaction_id = transaction.id,
                        balance = account.balance,
                        "committed {}",
                        kind
                    );
                    return Ok(Receipt {
                        account,
                        transaction,
                    });
                }
                Err(StoreError::Conflict(_)) if attempt < MAX_COMMIT_ATTEMPTS => {
                    debug!(attempt, "balance changed underneath, reloading");
                    attempt += 1;
                    account = self.store.find_account(account_id).await?;
                }
                Err(e) => {
                    error!(error = %e, attempt, "failed to commit ledger operation");
                    return Err(e.into());
                }
            }
        }
    }

    async fn account_lock(&self, account_id: AccountId) -> Arc<Mutex<()>> {
        let mut locks = self.account_locks.lock().await;
        Arc::clone(locks.entry(account_id).or_default())
    }

    /// Drop the map entry once no other caller holds or waits on it.
    async fn release_account_lock(&self, account_id: AccountId, lock: Arc<Mutex<()>>) {
        let mut locks = self.account_locks.lock().await;
        // Clones are only handed out under the map lock, so the count is stable here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&account_id);
        }
    }
}

/// Mutate the loaded account according to the transaction type.
fn apply(account: &mut Account, kind: TransactionType, amount: Cents) -> Result<(), AppError> {
    match kind {
        TransactionType::Deposit => {
            if account.balance.checked_add(amount).is_none() {
                return Err(AppError::InvalidAmount(
                    "Deposit would overflow the account balance".to_string(),
                ));
            }
            account.deposit(amount);
        }
        TransactionType::Withdrawal => {
            if let Err(AccountError::InsufficientFunds { balance, required }) =
                account.withdraw(amount)
            {
                warn!(balance, required, "rejected withdrawal: insufficient funds");
                return Err(AppError::InsufficientFunds {
                    account_number: account.account_number.clone(),
                    balance,
                    required,
                });
            }
        }
    }
    Ok(())
}
