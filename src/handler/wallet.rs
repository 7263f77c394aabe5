use std::sync::Arc;

use axum::{extract::Query, response::IntoResponse, routing::get, Extension, Json, Router};

use crate::{
    db::ledgerdb::LedgerExt,
    dtos::{
        walletdtos::{TransactionListResponseDto, TransactionQueryDto, WalletSummaryDto},
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn wallet_handler() -> Router {
    Router::new()
        .route("/", get(get_wallet))
        .route("/transactions", get(get_transactions))
}

pub async fn get_wallet(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let entries = app_state
        .db_client
        .get_user_transactions(user.user.id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Wallet retrieved",
        WalletSummaryDto::new(user.user.wallet_balance, &entries),
    )))
}

pub async fn get_transactions(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Query(query): Query<TransactionQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let filter = query.filter().map_err(HttpError::bad_request)?;

    let entries = app_state
        .db_client
        .get_user_transactions(user.user.id)
        .await
        .map_err(HttpError::from)?;

    let transactions = filter.apply(entries);

    Ok(Json(TransactionListResponseDto {
        status: "success".to_string(),
        results: transactions.len(),
        transactions,
    }))
}
