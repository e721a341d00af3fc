mod common;

use anyhow::Result;
use bank_ledger::seed::{
    MAX_INITIAL_BALANCE, MAX_TRANSACTION_AMOUNT, SeedConfig, account_number, seed,
};
use bank_ledger::storage::{AccountStore, InMemoryStore, TransactionStore};
use common::sqlite_service;

fn small_config(rng_seed: u64) -> SeedConfig {
    SeedConfig {
        accounts: 5,
        transactions_per_account: 20,
        rng_seed: Some(rng_seed),
    }
}

#[test]
fn test_account_numbers() {
    assert_eq!(account_number(0), "ACC0001");
    assert_eq!(account_number(99), "ACC0100");
}

#[test]
fn test_default_config_matches_load_profile() {
    let config = SeedConfig::default();
    assert_eq!(config.accounts, 100);
    assert_eq!(config.transactions_per_account, 500);
    assert!(config.rng_seed.is_none());
}

#[tokio::test]
async fn test_seed_creates_accounts_and_transactions() -> Result<()> {
    let store = InMemoryStore::new();

    let report = seed(&store, &small_config(7)).await?;

    assert_eq!(report.accounts, 5);
    assert_eq!(report.transactions, 100);

    let accounts = store.list_accounts().await?;
    assert_eq!(accounts.len(), 5);
    assert_eq!(accounts[0].account_number, "ACC0001");
    assert_eq!(accounts[4].account_number, "ACC0005");

    for account in &accounts {
        assert!((0..=MAX_INITIAL_BALANCE).contains(&account.balance));

        let history = store.list_transactions(account.id).await?;
        assert_eq!(history.len(), 20);
        assert!(
            history
                .iter()
                .all(|t| (1..=MAX_TRANSACTION_AMOUNT).contains(&t.amount))
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_seed_is_reproducible_with_fixed_seed() -> Result<()> {
    let first = InMemoryStore::new();
    let second = InMemoryStore::new();

    seed(&first, &small_config(42)).await?;
    seed(&second, &small_config(42)).await?;

    let balances = |accounts: Vec<bank_ledger::Account>| -> Vec<i64> {
        accounts.into_iter().map(|a| a.balance).collect()
    };
    assert_eq!(
        balances(first.list_accounts().await?),
        balances(second.list_accounts().await?)
    );

    let amounts_first: Vec<_> = first
        .list_transactions(1)
        .await?
        .into_iter()
        .map(|t| (t.amount, t.transaction_type))
        .collect();
    let amounts_second: Vec<_> = second
        .list_transactions(1)
        .await?
        .into_iter()
        .map(|t| (t.amount, t.transaction_type))
        .collect();
    assert_eq!(amounts_first, amounts_second);
    Ok(())
}

#[tokio::test]
async fn test_seed_into_sqlite_and_rerun_fails_on_duplicates() -> Result<()> {
    let (service, _temp) = sqlite_service().await?;
    let store = service.store();

    let report = seed(store.as_ref(), &small_config(1)).await?;
    assert_eq!(report.accounts, 5);
    assert_eq!(service.list_accounts().await?.len(), 5);

    let first = service.list_accounts().await?.remove(0);
    assert_eq!(service.account_history(first.id).await?.len(), 20);

    // Seeded account numbers are fixed, so a second run collides on ACC0001
    let err = seed(store.as_ref(), &small_config(2)).await.unwrap_err();
    assert!(format!("{err:#}").contains("ACC0001"));
    Ok(())
}
