//! HTTP API over the ledger service.
//!
//! `POST /deposit` and `POST /withdraw` take `{"account_id": 1, "amount": 50.25}`
//! and answer with a plain-text confirmation. Read endpoints return JSON.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::application::{AppError, LedgerService};
use crate::domain::{Account, AccountId, Cents, Transaction, TransactionType, parse_cents};

/// Shared handler state
#[derive(Clone)]
pub struct ApiState {
    ledger: Arc<LedgerService>,
}

/// Deposit/withdraw request body
#[derive(Debug, Deserialize)]
pub struct MovementRequest {
    pub account_id: AccountId,
    /// Decimal amount, kept as the raw JSON number so no float rounding happens
    pub amount: serde_json::Number,
}

impl MovementRequest {
    fn amount_cents(&self) -> Result<Cents, ApiError> {
        parse_cents(&self.amount.to_string())
            .map_err(|e| ApiError::BadRequest(format!("Invalid amount: {}", e)))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors a handler can answer with
#[derive(Debug)]
pub enum ApiError {
    /// Input rejected before reaching the ledger
    BadRequest(String),
    Ledger(AppError),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError::Ledger(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Ledger(err) => {
                let status = match &err {
                    AppError::AccountNotFound(_) => StatusCode::NOT_FOUND,
                    AppError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    AppError::InvalidTransactionType(_) | AppError::InvalidAmount(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    AppError::AccountAlreadyExists(_) | AppError::Conflict(_) => {
                        StatusCode::CONFLICT
                    }
                    AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if err.is_rejection() {
                    (status, err.to_string())
                } else {
                    error!(error = %err, "request failed");
                    (status, "internal error".to_string())
                }
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Build the API router.
pub fn router(ledger: Arc<LedgerService>) -> Router {
    let state = ApiState { ledger };

    Router::new()
        .route("/deposit", post(deposit))
        .route("/withdraw", post(withdraw))
        .route("/accounts", get(list_accounts))
        .route("/accounts/:id", get(get_account))
        .route("/accounts/:id/transactions", get(account_history))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "OK"
}

async fn deposit(
    State(state): State<ApiState>,
    Json(request): Json<MovementRequest>,
) -> Result<&'static str, ApiError> {
    apply(&state, &request, TransactionType::Deposit).await?;
    Ok("Deposit successful")
}

async fn withdraw(
    State(state): State<ApiState>,
    Json(request): Json<MovementRequest>,
) -> Result<&'static str, ApiError> {
    apply(&state, &request, TransactionType::Withdrawal).await?;
    Ok("Withdrawal successful")
}

async fn apply(
    state: &ApiState,
    request: &MovementRequest,
    kind: TransactionType,
) -> Result<(), ApiError> {
    let amount = request.amount_cents()?;
    state
        .ledger
        .process(request.account_id, amount, kind.as_str())
        .await?;
    Ok(())
}

async fn list_accounts(State(state): State<ApiState>) -> Result<Json<Vec<Account>>, ApiError> {
    Ok(Json(state.ledger.list_accounts().await?))
}

async fn get_account(
    State(state): State<ApiState>,
    Path(id): Path<AccountId>,
) -> Result<Json<Account>, ApiError> {
    Ok(Json(state.ledger.get_account(id).await?))
}

async fn account_history(
    State(state): State<ApiState>,
    Path(id): Path<AccountId>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    Ok(Json(state.ledger.account_history(id).await?))
}
