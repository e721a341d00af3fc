use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Cents};

/// Storage-assigned transaction identifier. Zero means "not saved yet".
pub type TransactionId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Increases the account balance
    Deposit,
    /// Decreases the account balance, subject to sufficient funds
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
        }
    }

    /// Parse the canonical type tag. Anything else is rejected.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(TransactionType::Deposit),
            "withdrawal" => Some(TransactionType::Withdrawal),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A completed ledger movement against one account.
/// Transactions are facts: they are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    /// Magnitude of the movement in cents (always positive when recorded by the service)
    pub amount: Cents,
    pub transaction_type: TransactionType,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new record stamped with the current time. The id is assigned by the store.
    pub fn new(account_id: AccountId, amount: Cents, transaction_type: TransactionType) -> Self {
        Self {
            id: 0,
            account_id,
            amount,
            transaction_type,
            created_at: Utc::now(),
        }
    }

    /// Signed effect of this transaction on the account balance.
    pub fn balance_effect(&self) -> Cents {
        match self.transaction_type {
            TransactionType::Deposit => self.amount,
            TransactionType::Withdrawal => -self.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_tags() {
        assert_eq!(
            TransactionType::from_str("deposit"),
            Some(TransactionType::Deposit)
        );
        assert_eq!(
            TransactionType::from_str("withdrawal"),
            Some(TransactionType::Withdrawal)
        );
        assert_eq!(TransactionType::Withdrawal.to_string(), "withdrawal");
    }

    #[test]
    fn test_unknown_transaction_type_rejected() {
        assert_eq!(TransactionType::from_str("withdraw"), None);
        assert_eq!(TransactionType::from_str("Deposit"), None);
        assert_eq!(TransactionType::from_str(""), None);
    }

    #[test]
    fn test_new_transaction() {
        let before = Utc::now();
        let tx = Transaction::new(3, 2500, TransactionType::Withdrawal);

        assert_eq!(tx.id, 0);
        assert_eq!(tx.account_id, 3);
        assert_eq!(tx.amount, 2500);
        assert!(tx.created_at >= before);
        assert_eq!(tx.balance_effect(), -2500);
    }

    #[test]
    fn test_serializes_type_lowercase() {
        let tx = Transaction::new(1, 100, TransactionType::Deposit);
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["transaction_type"], "deposit");
    }
}
