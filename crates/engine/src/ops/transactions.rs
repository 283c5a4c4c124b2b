use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, transactions};

mod list;
mod write;

pub use list::TransactionListFilter;

pub(super) async fn require_transaction<C>(
    db: &C,
    transaction_id: Uuid,
    user_id: &str,
) -> ResultEngine<transactions::Model>
where
    C: ConnectionTrait,
{
    transactions::Entity::find_by_id(transaction_id)
        .filter(transactions::Column::OwnerId.eq(user_id.to_string()))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))
}
