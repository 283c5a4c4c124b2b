use std::collections::HashMap;

use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    MoneyCents, ResultEngine, Transaction, Wallet,
    ledger::{BalanceWrite, Effect, overflow},
    transactions, wallets,
};

use super::{Engine, ledger::write_balance, with_tx};

impl Engine {
    /// Recomputes stored wallet balances of `user_id` from the transaction
    /// log.
    ///
    /// - Replays every transaction in chronological order starting from zero.
    /// - Does not check funds: back-dated entries may dip a replayed balance
    ///   below zero on the way.
    /// - Sides referencing deleted wallets are ignored.
    ///
    /// Returns the wallets whose stored balance was wrong, with the corrected
    /// value. An empty result means the ledger was consistent.
    pub async fn recompute_balances(&self, user_id: &str) -> ResultEngine<Vec<Wallet>> {
        with_tx!(self, |db_tx| {
            let wallet_models = wallets::Entity::find()
                .filter(wallets::Column::OwnerId.eq(user_id.to_string()))
                .all(&db_tx)
                .await?;
            let mut replayed: HashMap<Uuid, MoneyCents> = wallet_models
                .iter()
                .map(|model| (model.id, MoneyCents::ZERO))
                .collect();

            let tx_models = transactions::Entity::find()
                .filter(transactions::Column::OwnerId.eq(user_id.to_string()))
                .order_by_asc(transactions::Column::OccurredAt)
                .order_by_asc(transactions::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            for model in tx_models {
                let tx = Transaction::try_from(model)?;
                for (wallet_id, delta) in Effect::from(&tx).deltas() {
                    if let Some(balance) = replayed.get_mut(&wallet_id) {
                        *balance = balance.checked_add(delta).ok_or_else(overflow)?;
                    }
                }
            }

            let mut corrected = Vec::new();
            for model in wallet_models {
                let expected = replayed
                    .get(&model.id)
                    .copied()
                    .unwrap_or(MoneyCents::ZERO);
                if expected.cents() == model.balance {
                    continue;
                }
                tracing::warn!(
                    wallet_id = %model.id,
                    stored = model.balance,
                    replayed = expected.cents(),
                    "wallet balance out of sync, correcting"
                );
                write_balance(
                    &db_tx,
                    BalanceWrite {
                        wallet_id: model.id,
                        balance: expected,
                        expected_version: model.version,
                    },
                )
                .await?;
                let mut wallet = Wallet::try_from(model)?;
                wallet.balance = expected;
                wallet.version += 1;
                corrected.push(wallet);
            }

            tracing::info!(%user_id, corrected = corrected.len(), "balances recomputed");
            Ok(corrected)
        })
    }
}
