use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Account, AccountId, Cents, Transaction, TransactionId};

use super::{AccountStore, LedgerStore, StoreError, StoreResult, TransactionStore};

#[derive(Default)]
struct MemoryState {
    accounts: BTreeMap<AccountId, Account>,
    transactions: Vec<Transaction>,
    next_account_id: AccountId,
    next_transaction_id: TransactionId,
    failing_writes: bool,
}

impl MemoryState {
    fn check_writable(&self) -> StoreResult<()> {
        if self.failing_writes {
            return Err(anyhow::anyhow!("in-memory store is rejecting writes").into());
        }
        Ok(())
    }

    fn insert_transaction(&mut self, transaction: &mut Transaction) {
        self.next_transaction_id += 1;
        transaction.id = self.next_transaction_id;
        self.transactions.push(transaction.clone());
    }
}

/// Ledger store kept entirely in memory. Used by tests and by `serve --in-memory`.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a persistence error (reads keep working).
    pub async fn set_failing_writes(&self, failing: bool) {
        self.state.lock().await.failing_writes = failing;
    }

    /// Number of transaction records across all accounts.
    pub async fn transaction_count(&self) -> usize {
        self.state.lock().await.transactions.len()
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn find_account(&self, id: AccountId) -> StoreResult<Account> {
        self.state
            .lock()
            .await
            .accounts
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn find_account_by_number(&self, account_number: &str) -> StoreResult<Option<Account>> {
        Ok(self
            .state
            .lock()
            .await
            .accounts
            .values()
            .find(|a| a.account_number == account_number)
            .cloned())
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        Ok(self.state.lock().await.accounts.values().cloned().collect())
    }

    async fn save_account(&self, account: &mut Account) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.check_writable()?;

        let number_taken = state
            .accounts
            .values()
            .any(|a| a.account_number == account.account_number && a.id != account.id);
        if number_taken {
            return Err(StoreError::DuplicateAccountNumber(
                account.account_number.clone(),
            ));
        }

        if account.is_persisted() {
            let stored = state
                .accounts
                .get_mut(&account.id)
                .ok_or(StoreError::NotFound(account.id))?;
            *stored = account.clone();
        } else {
            state.next_account_id += 1;
            account.id = state.next_account_id;
            state.accounts.insert(account.id, account.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn save_transaction(&self, transaction: &mut Transaction) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.check_writable()?;
        state.insert_transaction(transaction);
        Ok(())
    }

    async fn list_transactions(&self, account_id: AccountId) -> StoreResult<Vec<Transaction>> {
        Ok(self
            .state
            .lock()
            .await
            .transactions
            .iter()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn commit(
        &self,
        expected_balance: Cents,
        account: &Account,
        transaction: &mut Transaction,
    ) -> StoreResult<()> {
        if transaction.account_id != account.id {
            return Err(anyhow::anyhow!(
                "Transaction for account {} cannot be committed with account {}",
                transaction.account_id,
                account.id
            )
            .into());
        }

        // One lock guards both writes, so readers never see half a commit.
        let mut state = self.state.lock().await;
        state.check_writable()?;

        let stored = state
            .accounts
            .get_mut(&account.id)
            .ok_or(StoreError::NotFound(account.id))?;
        if stored.balance != expected_balance {
            return Err(StoreError::Conflict(account.id));
        }
        stored.balance = account.balance;
        state.insert_transaction(transaction);
        Ok(())
    }
}
