use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{Account, AccountId, Transaction, format_cents};

/// Full ledger snapshot for JSON export
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
}

/// What to export and in which format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    AccountsCsv,
    TransactionsCsv,
    /// Accounts and their transactions in one JSON document
    Json,
}

impl ExportKind {
    /// Resolve an export type (`accounts`, `transactions`) and format (`csv`, `json`).
    pub fn parse(export_type: &str, format: &str) -> Result<Self> {
        match (export_type, format) {
            ("accounts", "csv") => Ok(ExportKind::AccountsCsv),
            ("transactions", "csv") => Ok(ExportKind::TransactionsCsv),
            ("accounts" | "transactions", "json") => Ok(ExportKind::Json),
            (_, "csv" | "json") => anyhow::bail!(
                "Unknown export type '{}'. Use: accounts, transactions",
                export_type
            ),
            _ => anyhow::bail!("Unknown format '{}'. Use: csv, json", format),
        }
    }
}

/// Exporter for converting ledger data to CSV or JSON
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Run an export, returning the number of records written.
    pub async fn export<W: Write>(
        &self,
        kind: ExportKind,
        writer: W,
        account_id: Option<AccountId>,
    ) -> Result<usize> {
        match kind {
            ExportKind::AccountsCsv => self.export_accounts_csv(writer, account_id).await,
            ExportKind::TransactionsCsv => self.export_transactions_csv(writer, account_id).await,
            ExportKind::Json => {
                let snapshot = self.export_json(writer, account_id).await?;
                Ok(snapshot.accounts.len() + snapshot.transactions.len())
            }
        }
    }

    /// Export account balances to CSV, for one account or for all of them
    pub async fn export_accounts_csv<W: Write>(
        &self,
        writer: W,
        account_id: Option<AccountId>,
    ) -> Result<usize> {
        let accounts = self.collect_accounts(account_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "account_number", "balance", "created_at"])?;

        for account in &accounts {
            csv_writer.write_record([
                account.id.to_string(),
                account.account_number.clone(),
                format_cents(account.balance),
                account.created_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(accounts.len())
    }

    /// Export transaction history to CSV, for one account or for all of them
    pub async fn export_transactions_csv<W: Write>(
        &self,
        writer: W,
        account_id: Option<AccountId>,
    ) -> Result<usize> {
        let transactions = self.collect_transactions(account_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "account_id", "type", "amount", "created_at"])?;

        for tx in &transactions {
            csv_writer.write_record([
                tx.id.to_string(),
                tx.account_id.to_string(),
                tx.transaction_type.as_str().to_string(),
                format_cents(tx.amount),
                tx.created_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }

    /// Export accounts and transactions as one pretty-printed JSON document
    pub async fn export_json<W: Write>(
        &self,
        mut writer: W,
        account_id: Option<AccountId>,
    ) -> Result<LedgerSnapshot> {
        let accounts = self.collect_accounts(account_id).await?;
        let transactions = self.collect_transactions(account_id).await?;

        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            accounts,
            transactions,
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(snapshot)
    }

    async fn collect_accounts(&self, account_id: Option<AccountId>) -> Result<Vec<Account>> {
        match account_id {
            Some(id) => Ok(vec![self.service.get_account(id).await?]),
            None => Ok(self.service.list_accounts().await?),
        }
    }

    async fn collect_transactions(&self, account_id: Option<AccountId>) -> Result<Vec<Transaction>> {
        match account_id {
            Some(id) => Ok(self.service.account_history(id).await?),
            None => {
                let mut all = Vec::new();
                for account in self.service.list_accounts().await? {
                    all.extend(self.service.account_history(account.id).await?);
                }
                Ok(all)
            }
        }
    }
}
