// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use bank_ledger::application::LedgerService;
use bank_ledger::domain::{Account, Cents};
use bank_ledger::storage::InMemoryStore;
use tempfile::TempDir;

/// Helper to create a service backed by a temporary SQLite database
pub async fn sqlite_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to create a service over an in-memory store, keeping a handle on the store
pub fn memory_service() -> (LedgerService, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let service = LedgerService::new(store.clone());
    (service, store)
}

/// Open an account with the given balance in cents
pub async fn open(service: &LedgerService, number: &str, balance: Cents) -> Result<Account> {
    Ok(service.open_account(number.to_string(), balance).await?)
}
