//! Transactions API endpoints

use api_types::transaction::{
    TransactionCreated, TransactionKind as ApiKind, TransactionList, TransactionListResponse,
    TransactionNew, TransactionUpdate, TransactionView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{
    EngineError, MoneyCents, Movement, NewTransactionCmd, TransactionKind, UpdateTransactionCmd,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

const DEFAULT_PAGE_SIZE: u64 = 50;

fn map_kind(kind: TransactionKind) -> ApiKind {
    match kind {
        TransactionKind::Income => ApiKind::Income,
        TransactionKind::Expense => ApiKind::Expense,
        TransactionKind::Transfer => ApiKind::Transfer,
        TransactionKind::InitialBalance => ApiKind::InitialBalance,
    }
}

fn engine_kind(kind: ApiKind) -> TransactionKind {
    match kind {
        ApiKind::Income => TransactionKind::Income,
        ApiKind::Expense => TransactionKind::Expense,
        ApiKind::Transfer => TransactionKind::Transfer,
        ApiKind::InitialBalance => TransactionKind::InitialBalance,
    }
}

fn map_transaction(tx: engine::Transaction) -> TransactionView {
    let (from_wallet_id, to_wallet_id) = match tx.movement {
        Movement::Transfer {
            from_wallet_id,
            to_wallet_id,
        } => (Some(from_wallet_id), Some(to_wallet_id)),
        _ => (None, None),
    };
    TransactionView {
        id: tx.id,
        kind: map_kind(tx.kind()),
        amount_minor: tx.amount.cents(),
        wallet_id: tx.movement.wallet_id(),
        from_wallet_id,
        to_wallet_id,
        category_id: tx.movement.category_id(),
        description: tx.description,
        occurred_at: tx.occurred_at.fixed_offset(),
        created_at: tx.created_at.fixed_offset(),
    }
}

fn required(value: Option<Uuid>, field: &str, kind: ApiKind) -> Result<Uuid, EngineError> {
    value.ok_or_else(|| {
        EngineError::Validation(format!(
            "{field} is required on {} transactions",
            engine_kind(kind).as_str()
        ))
    })
}

/// Builds the movement of a new transaction from the flat request body.
fn movement_from(payload: &TransactionNew) -> Result<Movement, EngineError> {
    let kind = payload.kind;
    let not_allowed = |field: &str| {
        EngineError::Validation(format!(
            "{field} is not allowed on {} transactions",
            engine_kind(kind).as_str()
        ))
    };

    match kind {
        ApiKind::Income | ApiKind::Expense => {
            if payload.from_wallet_id.is_some() || payload.to_wallet_id.is_some() {
                return Err(not_allowed("from_wallet_id/to_wallet_id"));
            }
            let wallet_id = required(payload.wallet_id, "wallet_id", kind)?;
            let category_id = required(payload.category_id, "category_id", kind)?;
            Ok(if kind == ApiKind::Income {
                Movement::Income {
                    wallet_id,
                    category_id,
                }
            } else {
                Movement::Expense {
                    wallet_id,
                    category_id,
                }
            })
        }
        ApiKind::Transfer => {
            if payload.wallet_id.is_some() {
                return Err(not_allowed("wallet_id"));
            }
            if payload.category_id.is_some() {
                return Err(not_allowed("category_id"));
            }
            Ok(Movement::Transfer {
                from_wallet_id: required(payload.from_wallet_id, "from_wallet_id", kind)?,
                to_wallet_id: required(payload.to_wallet_id, "to_wallet_id", kind)?,
            })
        }
        ApiKind::InitialBalance => {
            if payload.category_id.is_some() {
                return Err(not_allowed("category_id"));
            }
            if payload.from_wallet_id.is_some() || payload.to_wallet_id.is_some() {
                return Err(not_allowed("from_wallet_id/to_wallet_id"));
            }
            Ok(Movement::InitialBalance {
                wallet_id: required(payload.wallet_id, "wallet_id", kind)?,
            })
        }
    }
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let filter = engine::TransactionListFilter {
        from: payload.from.map(|dt| dt.with_timezone(&Utc)),
        to: payload.to.map(|dt| dt.with_timezone(&Utc)),
        kinds: payload
            .kinds
            .map(|kinds| kinds.into_iter().map(engine_kind).collect()),
        wallet_id: payload.wallet_id,
    };

    let (txs, next_cursor) = state
        .engine
        .list_transactions(
            &user.username,
            &filter,
            payload.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            payload.cursor.as_deref(),
        )
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: txs.into_iter().map(map_transaction).collect(),
        next_cursor,
    }))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.transaction(id, &user.username).await?;
    Ok(Json(map_transaction(tx)))
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    let movement = movement_from(&payload)?;
    let mut cmd = NewTransactionCmd::new(
        user.username.clone(),
        movement,
        MoneyCents::new(payload.amount_minor),
        payload.occurred_at.with_timezone(&Utc),
    );
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }

    let tx = state.engine.create_transaction(cmd).await?;
    Ok((StatusCode::CREATED, Json(TransactionCreated { id: tx.id })))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    let cmd = UpdateTransactionCmd {
        kind: payload.kind.map(engine_kind),
        amount: payload.amount_minor.map(MoneyCents::new),
        wallet_id: payload.wallet_id,
        from_wallet_id: payload.from_wallet_id,
        to_wallet_id: payload.to_wallet_id,
        category_id: payload.category_id,
        description: payload.description,
        occurred_at: payload.occurred_at.map(|dt| dt.with_timezone(&Utc)),
        ..UpdateTransactionCmd::new(id, user.username.clone())
    };

    let tx = state.engine.update_transaction(cmd).await?;
    Ok(Json(map_transaction(tx)))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_transaction(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn payload(kind: ApiKind) -> TransactionNew {
        TransactionNew {
            kind,
            amount_minor: 100,
            wallet_id: None,
            from_wallet_id: None,
            to_wallet_id: None,
            category_id: None,
            description: None,
            occurred_at: FixedOffset::east_opt(3600)
                .unwrap()
                .with_ymd_and_hms(2026, 3, 1, 10, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn income_needs_wallet_and_category() {
        let wallet_id = Uuid::new_v4();
        let category_id = Uuid::new_v4();

        let mut body = payload(ApiKind::Income);
        body.wallet_id = Some(wallet_id);
        assert_eq!(
            movement_from(&body),
            Err(EngineError::Validation(
                "category_id is required on income transactions".to_string()
            ))
        );

        body.category_id = Some(category_id);
        assert_eq!(
            movement_from(&body),
            Ok(Movement::Income {
                wallet_id,
                category_id
            })
        );
    }

    #[test]
    fn transfer_rejects_single_wallet_fields() {
        let mut body = payload(ApiKind::Transfer);
        body.from_wallet_id = Some(Uuid::new_v4());
        body.to_wallet_id = Some(Uuid::new_v4());
        body.category_id = Some(Uuid::new_v4());

        assert!(matches!(
            movement_from(&body),
            Err(EngineError::Validation(_))
        ));

        body.category_id = None;
        assert_eq!(movement_from(&body).map(|m| m.kind()), Ok(TransactionKind::Transfer));
    }
}
