use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::application::{LedgerService, Receipt};
use crate::domain::{AccountId, Cents, format_cents, parse_cents};
use crate::io::{ExportKind, Exporter};
use crate::seed::{SeedConfig, seed};

/// Bank Ledger - deposits, withdrawals and transaction history
#[derive(Parser)]
#[command(name = "bank-ledger")]
#[command(about = "A minimal account ledger with an HTTP API")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "LEDGER_DATABASE", default_value = "ledger.db", global = true)]
    pub database: String,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Serve the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, env = "LEDGER_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value_t = 8080)]
        port: u16,

        /// Keep all data in memory instead of the database file
        #[arg(long)]
        in_memory: bool,
    },

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Deposit into an account
    Deposit {
        /// Account ID
        account_id: AccountId,

        /// Amount to deposit (e.g., "50.00" or "50")
        amount: String,
    },

    /// Withdraw from an account
    Withdraw {
        /// Account ID
        account_id: AccountId,

        /// Amount to withdraw (e.g., "50.00" or "50")
        amount: String,
    },

    /// Show the transaction history of an account
    History {
        /// Account ID
        account_id: AccountId,
    },

    /// Export data to CSV or JSON
    Export {
        /// What to export: accounts, transactions
        export_type: String,

        /// Restrict the export to one account
        #[arg(long)]
        account: Option<AccountId>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json
        #[arg(short, long, default_value = "csv")]
        format: String,
    },

    /// Fill the database with random accounts and transactions
    Seed {
        /// Number of accounts to create
        #[arg(long, default_value_t = 100)]
        accounts: usize,

        /// Transactions to generate per account
        #[arg(long, default_value_t = 500)]
        transactions: usize,

        /// Fixed RNG seed for reproducible data
        #[arg(long)]
        rng_seed: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account
    Create {
        /// Account number (must be unique)
        number: String,

        /// Opening balance (e.g., "100.00")
        #[arg(short, long, default_value = "0")]
        balance: String,
    },

    /// List all accounts
    List,

    /// Show one account
    Show {
        /// Account ID
        id: AccountId,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        init_tracing(self.verbose);

        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Serve {
                host,
                port,
                in_memory,
            } => {
                let service = if in_memory {
                    LedgerService::in_memory()
                } else {
                    LedgerService::init(&self.database).await?
                };
                serve(Arc::new(service), &host, port).await?;
            }

            Commands::Account(account_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_account_command(&service, account_cmd).await?;
            }

            Commands::Deposit { account_id, amount } => {
                let service = LedgerService::connect(&self.database).await?;
                let amount_cents = parse_amount(&amount)?;
                let receipt = service.deposit(account_id, amount_cents).await?;
                print_receipt(&receipt);
            }

            Commands::Withdraw { account_id, amount } => {
                let service = LedgerService::connect(&self.database).await?;
                let amount_cents = parse_amount(&amount)?;
                let receipt = service.withdraw(account_id, amount_cents).await?;
                print_receipt(&receipt);
            }

            Commands::History { account_id } => {
                let service = LedgerService::connect(&self.database).await?;
                run_history_command(&service, account_id).await?;
            }

            Commands::Export {
                export_type,
                account,
                output,
                format,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                run_export_command(&service, &export_type, account, output, &format).await?;
            }

            Commands::Seed {
                accounts,
                transactions,
                rng_seed,
            } => {
                let service = LedgerService::init(&self.database).await?;
                let config = SeedConfig {
                    accounts,
                    transactions_per_account: transactions,
                    rng_seed,
                };
                let report = seed(service.store().as_ref(), &config).await?;
                println!(
                    "Seeded {} accounts with {} transactions",
                    report.accounts, report.transactions
                );
            }
        }

        Ok(())
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "bank_ledger=debug,tower_http=debug"
    } else {
        "bank_ledger=info,tower_http=info"
    };

    // try_init fails when a subscriber is already installed
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

async fn serve(service: Arc<LedgerService>, host: &str, port: u16) -> Result<()> {
    let address = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;

    info!("Listening on http://{}", address);

    axum::serve(listener, api::router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed.
        std::future::pending::<()>().await;
    }
}

fn parse_amount(amount: &str) -> Result<Cents> {
    parse_cents(amount).with_context(|| format!("Invalid amount '{}'. Use '50.00' or '50'", amount))
}

fn print_receipt(receipt: &Receipt) {
    println!(
        "Recorded {} of {} on {} (transaction {}), new balance {}",
        receipt.transaction.transaction_type,
        format_cents(receipt.transaction.amount),
        receipt.account.account_number,
        receipt.transaction.id,
        format_cents(receipt.account.balance)
    );
}

async fn run_account_command(service: &LedgerService, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Create { number, balance } => {
            let initial_balance = parse_amount(&balance)?;
            let account = service.open_account(number, initial_balance).await?;
            println!(
                "Opened account {} (id {}) with balance {}",
                account.account_number,
                account.id,
                format_cents(account.balance)
            );
        }

        AccountCommands::List => {
            let accounts = service.list_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts found.");
                return Ok(());
            }

            println!("{:<8} {:<16} {:>15}  CREATED", "ID", "NUMBER", "BALANCE");
            println!("{}", "-".repeat(64));
            for account in accounts {
                println!(
                    "{:<8} {:<16} {:>15}  {}",
                    account.id,
                    account.account_number,
                    format_cents(account.balance),
                    account.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }

        AccountCommands::Show { id } => {
            let account = service.get_account(id).await?;
            let history = service.account_history(id).await?;

            println!("Account:      {}", account.account_number);
            println!("ID:           {}", account.id);
            println!("Balance:      {}", format_cents(account.balance));
            println!("Created:      {}", account.created_at.format("%Y-%m-%d %H:%M:%S"));
            println!("Transactions: {}", history.len());
            if let Some(last) = history.last() {
                println!("Last activity: {}", last.created_at.format("%Y-%m-%d %H:%M:%S"));
            }
        }
    }
    Ok(())
}

async fn run_history_command(service: &LedgerService, account_id: AccountId) -> Result<()> {
    let account = service.get_account(account_id).await?;
    let history = service.account_history(account_id).await?;

    println!("History for {}", account.account_number);
    if history.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!("{:<8} {:<20} {:<11} {:>15}", "ID", "DATE", "TYPE", "AMOUNT");
    println!("{}", "-".repeat(57));
    for tx in &history {
        println!(
            "{:<8} {:<20} {:<11} {:>15}",
            tx.id,
            tx.created_at.format("%Y-%m-%d %H:%M:%S"),
            tx.transaction_type,
            format_cents(tx.balance_effect())
        );
    }
    println!("{}", "-".repeat(57));
    println!("{:<41}{:>16}", "Balance", format_cents(account.balance));

    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    export_type: &str,
    account: Option<AccountId>,
    output: Option<String>,
    format: &str,
) -> Result<()> {
    use std::io::{Write, stdout};

    // Reject bad arguments before an output file gets created
    let kind = ExportKind::parse(export_type, format)?;

    let exporter = Exporter::new(service);
    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?,
        ),
        None => Box::new(stdout()),
    };

    let count = exporter.export(kind, writer, account).await?;

    if let Some(path) = output {
        eprintln!("Exported {} records to {}", count, path);
    }
    Ok(())
}
