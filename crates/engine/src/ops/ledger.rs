use sea_orm::{ConnectionTrait, DatabaseTransaction, QueryFilter, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine,
    ledger::{BalanceSheet, BalanceWrite, LedgerStep},
    wallets,
};

use super::Engine;

impl Engine {
    /// Runs `steps` against the caller's wallets inside `db_tx`.
    ///
    /// Every step is previewed in order on a [`BalanceSheet`] first; only when
    /// all of them succeed is each touched wallet written back, once, with a
    /// compare-and-swap on its version. Wallets not owned by `user_id` are
    /// treated as missing.
    pub(crate) async fn apply_ledger_operation(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        steps: &[LedgerStep],
    ) -> ResultEngine<()> {
        let mut wallet_ids: Vec<Uuid> = steps
            .iter()
            .flat_map(|step| step.effect().movement.wallet_ids())
            .collect();
        wallet_ids.sort();
        wallet_ids.dedup();

        let mut sheet = BalanceSheet::new();
        let models = wallets::Entity::find()
            .filter(wallets::Column::Id.is_in(wallet_ids))
            .filter(wallets::Column::OwnerId.eq(user_id.to_string()))
            .all(db_tx)
            .await?;
        for model in models {
            sheet.insert(model.id, MoneyCents::new(model.balance), model.version);
        }

        for step in steps {
            sheet.run(step)?;
        }

        let writes = sheet.writes();
        tracing::debug!(steps = steps.len(), writes = writes.len(), "ledger operation planned");
        for write in writes {
            write_balance(db_tx, write).await?;
        }
        Ok(())
    }
}

/// `UPDATE wallets SET balance = ?, version = ? WHERE id = ? AND version = ?`.
pub(super) async fn write_balance<C>(db: &C, write: BalanceWrite) -> ResultEngine<()>
where
    C: ConnectionTrait,
{
    let result = wallets::Entity::update_many()
        .col_expr(wallets::Column::Balance, Expr::value(write.balance.cents()))
        .col_expr(
            wallets::Column::Version,
            Expr::value(write.expected_version + 1),
        )
        .filter(wallets::Column::Id.eq(write.wallet_id))
        .filter(wallets::Column::Version.eq(write.expected_version))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        tracing::warn!(
            wallet_id = %write.wallet_id,
            expected_version = write.expected_version,
            "wallet balance changed concurrently"
        );
        return Err(EngineError::Conflict(format!(
            "wallet {} was modified concurrently",
            write.wallet_id
        )));
    }
    Ok(())
}
