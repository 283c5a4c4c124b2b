use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{Condition, QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{EngineError, ResultEngine, Transaction, TransactionKind, transactions};

use super::super::Engine;
use super::require_transaction;

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<TransactionKind>>,
    /// Matches the single wallet or either side of a transfer.
    pub wallet_id: Option<Uuid>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::Validation(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.kinds.as_ref().is_some_and(|k| k.is_empty()) {
        return Err(EngineError::Validation(
            "kinds must not be empty".to_string(),
        ));
    }
    Ok(())
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter) -> Self {
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::OccurredAt.lt(to));
        }
        if let Some(kinds) = &filter.kinds {
            let kinds: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
            self = self.filter(transactions::Column::Kind.is_in(kinds));
        }
        if let Some(wallet_id) = filter.wallet_id {
            self = self.filter(
                Condition::any()
                    .add(transactions::Column::WalletId.eq(wallet_id))
                    .add(transactions::Column::FromWalletId.eq(wallet_id))
                    .add(transactions::Column::ToWalletId.eq(wallet_id)),
            );
        }
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TransactionsCursor {
    occurred_at: DateTime<Utc>,
    transaction_id: Uuid,
}

impl TransactionsCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::Validation("invalid transactions cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::Validation("invalid transactions cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::Validation("invalid transactions cursor".to_string()))
    }
}

impl Engine {
    /// Return a transaction owned by `user_id`.
    pub async fn transaction(&self, transaction_id: Uuid, user_id: &str) -> ResultEngine<Transaction> {
        let model = require_transaction(&self.database, transaction_id, user_id).await?;
        Transaction::try_from(model)
    }

    /// Lists transactions of `user_id`, with cursor-based pagination.
    ///
    /// Pagination is newest → older by `(occurred_at DESC, id DESC)`. The
    /// returned cursor is `None` on the last page.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        filter: &TransactionListFilter,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<Transaction>, Option<String>)> {
        validate_list_filter(filter)?;
        if limit == 0 {
            return Err(EngineError::Validation("limit must be > 0".to_string()));
        }

        let mut query = transactions::Entity::find()
            .filter(transactions::Column::OwnerId.eq(user_id.to_string()))
            .apply_tx_filters(filter)
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::Id)
            .limit(limit.saturating_add(1));

        if let Some(cursor) = cursor {
            let cursor = TransactionsCursor::decode(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(transactions::Column::OccurredAt.lt(cursor.occurred_at))
                    .add(
                        Condition::all()
                            .add(transactions::Column::OccurredAt.eq(cursor.occurred_at))
                            .add(transactions::Column::Id.lt(cursor.transaction_id)),
                    ),
            );
        }

        let mut items = query
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        let next = if items.len() as u64 > limit {
            items.truncate(limit as usize);
            match items.last() {
                Some(last) => Some(
                    TransactionsCursor {
                        occurred_at: last.occurred_at,
                        transaction_id: last.id,
                    }
                    .encode()?,
                ),
                None => None,
            }
        } else {
            None
        };
        Ok((items, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips() {
        let cursor = TransactionsCursor {
            occurred_at: Utc::now(),
            transaction_id: Uuid::new_v4(),
        };
        let decoded = TransactionsCursor::decode(&cursor.encode().unwrap()).unwrap();
        assert_eq!(decoded.occurred_at, cursor.occurred_at);
        assert_eq!(decoded.transaction_id, cursor.transaction_id);
    }

    #[test]
    fn garbage_cursor_is_rejected() {
        assert!(matches!(
            TransactionsCursor::decode("not-a-cursor"),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let now = Utc::now();
        let filter = TransactionListFilter {
            from: Some(now),
            to: Some(now),
            ..TransactionListFilter::default()
        };
        assert!(validate_list_filter(&filter).is_err());
    }
}
