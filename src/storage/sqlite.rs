use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::domain::{Account, AccountId, Cents, Transaction, TransactionType};

use super::{
    AccountStore, LedgerStore, SCHEMA, StoreError, StoreResult, TransactionStore,
};

/// SQLite-backed ledger store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a store over an existing SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL (e.g. `sqlite:ledger.db?mode=rwc`).
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they are missing.
    pub async fn apply_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .context("Failed to apply schema")?;
        Ok(())
    }

    /// Connect and make sure the schema exists.
    pub async fn init(database_url: &str) -> Result<Self> {
        let store = Self::connect(database_url).await?;
        store.apply_schema().await?;
        Ok(store)
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            id: row.get("id"),
            account_number: row.get("account_number"),
            balance: row.get("balance"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let type_str: String = row.get("transaction_type");
        let created_at_str: String = row.get("created_at");

        Ok(Transaction {
            id: row.get("id"),
            account_id: row.get("account_id"),
            amount: row.get("amount"),
            transaction_type: TransactionType::from_str(&type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", type_str))?,
            created_at: parse_timestamp(&created_at_str)?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid timestamp: {}", value))?
        .with_timezone(&Utc))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

#[async_trait]
impl AccountStore for SqliteStore {
    async fn find_account(&self, id: AccountId) -> StoreResult<Account> {
        let row = sqlx::query(
            r#"
            SELECT id, account_number, balance, created_at
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Self::row_to_account(&row)?),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn find_account_by_number(&self, account_number: &str) -> StoreResult<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, account_number, balance, created_at
            FROM accounts
            WHERE account_number = ?
            "#,
        )
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account by number")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let rows = sqlx::query(
            "SELECT id, account_number, balance, created_at FROM accounts ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        Ok(rows
            .iter()
            .map(Self::row_to_account)
            .collect::<Result<Vec<_>>>()?)
    }

    async fn save_account(&self, account: &mut Account) -> StoreResult<()> {
        if account.is_persisted() {
            let result = sqlx::query(
                "UPDATE accounts SET account_number = ?, balance = ? WHERE id = ?",
            )
            .bind(&account.account_number)
            .bind(account.balance)
            .bind(account.id)
            .execute(&self.pool)
            .await;

            return match result {
                Ok(done) if done.rows_affected() == 0 => Err(StoreError::NotFound(account.id)),
                Ok(_) => Ok(()),
                Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateAccountNumber(
                    account.account_number.clone(),
                )),
                Err(e) => Err(anyhow::Error::new(e)
                    .context("Failed to update account")
                    .into()),
            };
        }

        let result = sqlx::query(
            r#"
            INSERT INTO accounts (account_number, balance, created_at)
            VALUES (?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&account.account_number)
        .bind(account.balance)
        .bind(account.created_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => {
                account.id = row.get("id");
                tracing::debug!(id = account.id, number = %account.account_number, "inserted account");
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateAccountNumber(
                account.account_number.clone(),
            )),
            Err(e) => Err(anyhow::Error::new(e)
                .context("Failed to insert account")
                .into()),
        }
    }
}

#[async_trait]
impl TransactionStore for SqliteStore {
    async fn save_transaction(&self, transaction: &mut Transaction) -> StoreResult<()> {
        let row = sqlx::query(
            r#"
            INSERT INTO transactions (account_id, amount, transaction_type, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(transaction.account_id)
        .bind(transaction.amount)
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.created_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .context("Failed to save transaction")?;

        transaction.id = row.get("id");
        Ok(())
    }

    async fn list_transactions(&self, account_id: AccountId) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, amount, transaction_type, created_at
            FROM transactions
            WHERE account_id = ?
            ORDER BY id
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        Ok(rows
            .iter()
            .map(Self::row_to_transaction)
            .collect::<Result<Vec<_>>>()?)
    }
}

#[async_trait]
impl LedgerStore for SqliteStore {
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

        // Dropping `db_tx` without commit rolls both writes back.
        let mut db_tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin database transaction")?;

        let updated = sqlx::query("UPDATE accounts SET balance = ? WHERE id = ? AND balance = ?")
            .bind(account.balance)
            .bind(account.id)
            .bind(expected_balance)
            .execute(&mut *db_tx)
            .await
            .context("Failed to update account balance")?;

        if updated.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM accounts WHERE id = ?")
                .bind(account.id)
                .fetch_optional(&mut *db_tx)
                .await
                .context("Failed to check account")?
                .is_some();
            return Err(if exists {
                StoreError::Conflict(account.id)
            } else {
                StoreError::NotFound(account.id)
            });
        }

        let row = sqlx::query(
            r#"
            INSERT INTO transactions (account_id, amount, transaction_type, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(transaction.account_id)
        .bind(transaction.amount)
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.created_at.to_rfc3339())
        .fetch_one(&mut *db_tx)
        .await
        .context("Failed to insert transaction")?;

        db_tx
            .commit()
            .await
            .context("Failed to commit database transaction")?;

        transaction.id = row.get("id");
        Ok(())
    }
}
