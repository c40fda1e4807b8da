use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use crates::domain::value_objects::{
    credits::{CreditAmountModel, CreditCheckDto, HistoryQuery},
    enums::transaction_types::TransactionType,
};

use crate::{
    auth::AuthUser, axum_http::error_responses::AppError, usecases::credit_ledger::CreditLedger,
};

/// Refills and plan changes are driven by billing, never by the account holder, so they
/// have no route here.
pub fn routes(credit_ledger: Arc<CreditLedger>) -> Router {
    Router::new()
        .route("/", get(get_credit_info))
        .route("/check", post(check))
        .route("/deduct", post(deduct))
        .route("/history", get(history))
        .route("/initialize", post(initialize))
        .with_state(credit_ledger)
}

pub async fn get_credit_info(
    State(credit_ledger): State<Arc<CreditLedger>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let info = credit_ledger.get_credit_info(auth.user_id).await?;
    Ok(Json(info))
}

pub async fn check(
    State(credit_ledger): State<Arc<CreditLedger>>,
    auth: AuthUser,
    Json(model): Json<CreditAmountModel>,
) -> Result<impl IntoResponse, AppError> {
    let balance = credit_ledger.get_balance(auth.user_id).await?;
    Ok(Json(CreditCheckDto {
        has_enough: balance >= model.amount,
        balance,
        required: model.amount,
    }))
}

pub async fn deduct(
    State(credit_ledger): State<Arc<CreditLedger>>,
    auth: AuthUser,
    Json(model): Json<CreditAmountModel>,
) -> Result<impl IntoResponse, AppError> {
    let change = credit_ledger
        .deduct(
            auth.user_id,
            model.amount,
            TransactionType::VideoGeneration,
            model.description,
        )
        .await?;
    Ok(Json(change))
}

pub async fn history(
    State(credit_ledger): State<Arc<CreditLedger>>,
    auth: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let transactions = credit_ledger.history(auth.user_id, query.limit).await?;
    Ok(Json(transactions))
}

pub async fn initialize(
    State(credit_ledger): State<Arc<CreditLedger>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let info = credit_ledger.initialize(auth.user_id).await?;
    Ok(Json(info))
}
