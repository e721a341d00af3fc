use thiserror::Error;

use crate::domain::{AccountId, Cents, format_cents};
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error(
        "Insufficient funds in account {account_number}: balance {}, required {}",
        format_cents(*.balance),
        format_cents(*.required)
    )]
    InsufficientFunds {
        account_number: String,
        balance: Cents,
        required: Cents,
    },

    #[error("Invalid transaction type: {0}")]
    InvalidTransactionType(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Account {0} is busy, retry the operation")]
    Conflict(AccountId),

    #[error("Persistence error: {0:#}")]
    Persistence(#[from] anyhow::Error),
}

impl AppError {
    /// True for business-rule rejections, false for storage failures.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, AppError::Persistence(_))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AppError::AccountNotFound(id),
            StoreError::DuplicateAccountNumber(number) => AppError::AccountAlreadyExists(number),
            StoreError::Conflict(id) => AppError::Conflict(id),
            StoreError::Persistence(e) => AppError::Persistence(e),
        }
    }
}
