//! Random data generator for load testing.
//!
//! Writes straight through the storage contracts and bypasses
//! `LedgerService::process`: seeded transactions do not move balances and
//! are not checked against them.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::domain::{Account, Cents, Transaction, TransactionType};
use crate::storage::LedgerStore;

/// Largest random opening balance (10,000.00)
pub const MAX_INITIAL_BALANCE: Cents = 1_000_000;
/// Largest random transaction amount (1,000.00)
pub const MAX_TRANSACTION_AMOUNT: Cents = 100_000;

#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub accounts: usize,
    pub transactions_per_account: usize,
    /// Fixed RNG seed for reproducible data; random when `None`
    pub rng_seed: Option<u64>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            accounts: 100,
            transactions_per_account: 500,
            rng_seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub accounts: usize,
    pub transactions: usize,
}

/// Account numbers are `ACC0001`, `ACC0002`, ...
pub fn account_number(index: usize) -> String {
    format!("ACC{:04}", index + 1)
}

pub async fn seed(store: &dyn LedgerStore, config: &SeedConfig) -> Result<SeedReport> {
    let mut rng = match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut report = SeedReport {
        accounts: 0,
        transactions: 0,
    };

    for i in 0..config.accounts {
        let number = account_number(i);
        let mut account = Account::new(number.clone(), rng.gen_range(0..=MAX_INITIAL_BALANCE));
        store
            .save_account(&mut account)
            .await
            .with_context(|| format!("Failed to insert account {}", number))?;
        report.accounts += 1;

        for _ in 0..config.transactions_per_account {
            let amount = rng.gen_range(1..=MAX_TRANSACTION_AMOUNT);
            let kind = if rng.gen_bool(0.5) {
                TransactionType::Withdrawal
            } else {
                TransactionType::Deposit
            };

            let mut transaction = Transaction::new(account.id, amount, kind);
            store
                .save_transaction(&mut transaction)
                .await
                .with_context(|| format!("Failed to insert transaction for account {}", account.id))?;
            report.transactions += 1;
        }

        info!(
            number = %number,
            transactions = config.transactions_per_account,
            "seeded account"
        );
    }

    Ok(report)
}
