mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use bank_ledger::api;
use bank_ledger::storage::{AccountStore, InMemoryStore};
use common::{memory_service, open};
use serde_json::Value;
use tower::util::ServiceExt;

async fn test_app() -> Result<(Router, Arc<InMemoryStore>, i64)> {
    let (service, store) = memory_service();
    let account = open(&service, "ACC0100", 500000).await?;
    Ok((api::router(Arc::new(service)), store, account.id))
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health() -> Result<()> {
    let (app, _store, _id) = test_app().await?;

    let response = app.oneshot(get("/health")).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "OK");
    Ok(())
}

#[tokio::test]
async fn test_deposit_endpoint() -> Result<()> {
    let (app, store, id) = test_app().await?;

    let body = format!(r#"{{"account_id": {id}, "amount": 100.0}}"#);
    let response = app.oneshot(post_json("/deposit", &body)).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Deposit successful");
    assert_eq!(store.find_account(id).await?.balance, 510000);
    Ok(())
}

#[tokio::test]
async fn test_withdraw_endpoint() -> Result<()> {
    let (app, store, id) = test_app().await?;

    let body = format!(r#"{{"account_id": {id}, "amount": 200.25}}"#);
    let response = app.oneshot(post_json("/withdraw", &body)).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Withdrawal successful");
    assert_eq!(store.find_account(id).await?.balance, 479975);
    assert_eq!(store.transaction_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_withdraw_insufficient_funds() -> Result<()> {
    let (app, store, id) = test_app().await?;

    let body = format!(r#"{{"account_id": {id}, "amount": 6000}}"#);
    let response = app.oneshot(post_json("/withdraw", &body)).await?;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json: Value = serde_json::from_str(&body_string(response).await)?;
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .contains("Insufficient funds")
    );
    assert_eq!(store.find_account(id).await?.balance, 500000);
    assert_eq!(store.transaction_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_unknown_account() -> Result<()> {
    let (app, _store, _id) = test_app().await?;

    let response = app
        .oneshot(post_json("/deposit", r#"{"account_id": 404, "amount": 10}"#))
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json: Value = serde_json::from_str(&body_string(response).await)?;
    assert_eq!(json["error"], "Account not found: 404");
    Ok(())
}

#[tokio::test]
async fn test_malformed_body_is_client_error() -> Result<()> {
    let (app, store, _id) = test_app().await?;

    for body in [
        "not json",
        r#"{"account_id": 1}"#,
        r#"{"account_id": "one", "amount": 10}"#,
        r#"{"account_id": 1, "amount": "10"}"#,
    ] {
        let response = app.clone().oneshot(post_json("/deposit", body)).await?;
        assert!(
            response.status().is_client_error(),
            "expected 4xx for {body}, got {}",
            response.status()
        );
    }

    assert_eq!(store.transaction_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_non_positive_amount_rejected() -> Result<()> {
    let (app, store, id) = test_app().await?;

    for amount in ["0", "-5.0"] {
        let body = format!(r#"{{"account_id": {id}, "amount": {amount}}}"#);
        let response = app.clone().oneshot(post_json("/deposit", &body)).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    assert_eq!(store.find_account(id).await?.balance, 500000);
    Ok(())
}

#[tokio::test]
async fn test_exponent_amount_rejected_before_ledger() -> Result<()> {
    let (app, store, id) = test_app().await?;

    let body = format!(r#"{{"account_id": {id}, "amount": 1e-7}}"#);
    let response = app.oneshot(post_json("/deposit", &body)).await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_str(&body_string(response).await)?;
    assert!(json["error"].as_str().unwrap().starts_with("Invalid amount"));
    assert_eq!(store.transaction_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_persistence_failure_is_generic_500() -> Result<()> {
    let (app, store, id) = test_app().await?;
    store.set_failing_writes(true).await;

    let body = format!(r#"{{"account_id": {id}, "amount": 10}}"#);
    let response = app.oneshot(post_json("/deposit", &body)).await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_str(&body_string(response).await)?;
    assert_eq!(json["error"], "internal error");
    Ok(())
}

#[tokio::test]
async fn test_account_read_endpoints() -> Result<()> {
    let (app, _store, id) = test_app().await?;

    let body = format!(r#"{{"account_id": {id}, "amount": 25.5}}"#);
    let response = app.clone().oneshot(post_json("/deposit", &body)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get(&format!("/accounts/{id}"))).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let account: Value = serde_json::from_str(&body_string(response).await)?;
    assert_eq!(account["account_number"], "ACC0100");
    assert_eq!(account["balance"], 502550);

    let response = app
        .clone()
        .oneshot(get(&format!("/accounts/{id}/transactions")))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let history: Value = serde_json::from_str(&body_string(response).await)?;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["transaction_type"], "deposit");
    assert_eq!(history[0]["amount"], 2550);

    let response = app.clone().oneshot(get("/accounts")).await?;
    let accounts: Value = serde_json::from_str(&body_string(response).await)?;
    assert_eq!(accounts.as_array().unwrap().len(), 1);

    let response = app.oneshot(get("/accounts/999")).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
