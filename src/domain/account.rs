use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Cents, format_cents};

/// Storage-assigned account identifier. Zero means "not saved yet".
pub type AccountId = i64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("Insufficient funds: balance {}, required {}", format_cents(*.balance), format_cents(*.required))]
    InsufficientFunds { balance: Cents, required: Cents },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Unique human-readable number, e.g. "ACC0042"
    pub account_number: String,
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create an unsaved account. The id is assigned by the store.
    pub fn new(account_number: impl Into<String>, balance: Cents) -> Self {
        Self {
            id: 0,
            account_number: account_number.into(),
            balance,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: AccountId) -> Self {
        self.id = id;
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    pub fn deposit(&mut self, amount: Cents) {
        self.balance += amount;
    }

    /// Withdraw `amount`, leaving the balance untouched if it would go negative.
    pub fn withdraw(&mut self, amount: Cents) -> Result<(), AccountError> {
        if amount > self.balance {
            return Err(AccountError::InsufficientFunds {
                balance: self.balance,
                required: amount,
            });
        }
        self.balance -= amount;
        Ok(())
    }
}
