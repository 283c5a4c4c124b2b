//! Wallets API endpoints.

use api_types::wallet::{WalletKind, WalletListResponse, WalletNew, WalletRename, WalletView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{MoneyCents, NewWalletCmd};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn map_kind(kind: engine::WalletKind) -> WalletKind {
    match kind {
        engine::WalletKind::Cash => WalletKind::Cash,
        engine::WalletKind::Bank => WalletKind::Bank,
        engine::WalletKind::Card => WalletKind::Card,
        engine::WalletKind::Other => WalletKind::Other,
    }
}

fn engine_kind(kind: WalletKind) -> engine::WalletKind {
    match kind {
        WalletKind::Cash => engine::WalletKind::Cash,
        WalletKind::Bank => engine::WalletKind::Bank,
        WalletKind::Card => engine::WalletKind::Card,
        WalletKind::Other => engine::WalletKind::Other,
    }
}

fn map_wallet(wallet: engine::Wallet) -> WalletView {
    WalletView {
        id: wallet.id,
        name: wallet.name,
        kind: map_kind(wallet.kind),
        balance_minor: wallet.balance.cents(),
        initialized_at: wallet.initialized_at.fixed_offset(),
    }
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<WalletListResponse>, ServerError> {
    let wallets = state
        .engine
        .wallets(&user.username)
        .await?
        .into_iter()
        .map(map_wallet)
        .collect();
    Ok(Json(WalletListResponse { wallets }))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(wallet_id): Path<Uuid>,
) -> Result<Json<WalletView>, ServerError> {
    let wallet = state.engine.wallet(wallet_id, &user.username).await?;
    Ok(Json(map_wallet(wallet)))
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<WalletNew>,
) -> Result<(StatusCode, Json<WalletView>), ServerError> {
    let initialized_at = payload
        .initialized_at
        .map_or_else(Utc::now, |dt| dt.with_timezone(&Utc));
    let cmd = NewWalletCmd::new(
        user.username.clone(),
        payload.name,
        engine_kind(payload.kind),
        initialized_at,
    )
    .opening_balance(MoneyCents::new(payload.opening_balance_minor.unwrap_or(0)));

    let wallet = state.engine.new_wallet(cmd).await?;
    Ok((StatusCode::CREATED, Json(map_wallet(wallet))))
}

pub async fn rename(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(wallet_id): Path<Uuid>,
    Json(payload): Json<WalletRename>,
) -> Result<Json<WalletView>, ServerError> {
    let wallet = state
        .engine
        .rename_wallet(wallet_id, &user.username, &payload.name)
        .await?;
    Ok(Json(map_wallet(wallet)))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(wallet_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_wallet(wallet_id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Rebuild stored balances from the transaction log, returning the wallets
/// that were corrected.
pub async fn recompute(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<WalletListResponse>, ServerError> {
    let wallets = state
        .engine
        .recompute_balances(&user.username)
        .await?
        .into_iter()
        .map(map_wallet)
        .collect();
    Ok(Json(WalletListResponse { wallets }))
}
