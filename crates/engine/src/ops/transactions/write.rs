use sea_orm::{ConnectionTrait, DatabaseTransaction, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    CategoryKind, EngineError, MoneyCents, Movement, NewTransactionCmd, ResultEngine, Transaction,
    TransactionKind, UpdateTransactionCmd,
    ledger::{Effect, LedgerStep},
    transactions,
    util::normalize_optional_text,
};

use super::super::{Engine, categories::category_for, wallets::require_wallet, with_tx};
use super::require_transaction;

/// Checks a movement against the store: wallets exist and belong to the
/// caller, transfers use two different wallets, categories match the kind.
async fn validate_movement<C>(db: &C, user_id: &str, movement: &Movement) -> ResultEngine<()>
where
    C: ConnectionTrait,
{
    if let Movement::Transfer {
        from_wallet_id,
        to_wallet_id,
    } = *movement
        && from_wallet_id == to_wallet_id
    {
        return Err(EngineError::Validation(
            "transfer wallets must be different".to_string(),
        ));
    }

    for wallet_id in movement.wallet_ids() {
        require_wallet(db, wallet_id, user_id).await?;
    }

    if let (Some(category_id), Some(kind)) = (
        movement.category_id(),
        CategoryKind::for_transaction(movement.kind()),
    ) {
        category_for(db, user_id, category_id, kind).await?;
    }
    Ok(())
}

fn required(value: Option<Uuid>, field: &str) -> ResultEngine<Uuid> {
    value.ok_or_else(|| EngineError::Validation(format!("{field} is required")))
}

fn reject(value: Option<Uuid>, field: &str, kind: TransactionKind) -> ResultEngine<()> {
    match value {
        Some(_) => Err(EngineError::Validation(format!(
            "{field} is not allowed on {} transactions",
            kind.as_str()
        ))),
        None => Ok(()),
    }
}

/// Merges an update patch into the stored movement.
///
/// Absent fields fall back to the stored ones only where the stored shape
/// has them, so switching to a transfer needs both wallets and switching
/// away from one needs `wallet_id`. A stored category is carried across an
/// income/expense switch and then fails the kind check unless replaced.
pub(crate) fn merge_movement(old: Movement, cmd: &UpdateTransactionCmd) -> ResultEngine<Movement> {
    let kind = cmd.kind.unwrap_or(old.kind());
    match kind {
        TransactionKind::Income | TransactionKind::Expense => {
            reject(cmd.from_wallet_id, "from_wallet_id", kind)?;
            reject(cmd.to_wallet_id, "to_wallet_id", kind)?;
            let wallet_id = required(cmd.wallet_id.or(old.wallet_id()), "wallet_id")?;
            let category_id = required(cmd.category_id.or(old.category_id()), "category_id")?;
            Ok(if kind == TransactionKind::Income {
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
        TransactionKind::Transfer => {
            reject(cmd.wallet_id, "wallet_id", kind)?;
            reject(cmd.category_id, "category_id", kind)?;
            let (old_from, old_to) = match old {
                Movement::Transfer {
                    from_wallet_id,
                    to_wallet_id,
                } => (Some(from_wallet_id), Some(to_wallet_id)),
                _ => (None, None),
            };
            Ok(Movement::Transfer {
                from_wallet_id: required(cmd.from_wallet_id.or(old_from), "from_wallet_id")?,
                to_wallet_id: required(cmd.to_wallet_id.or(old_to), "to_wallet_id")?,
            })
        }
        TransactionKind::InitialBalance => {
            reject(cmd.category_id, "category_id", kind)?;
            reject(cmd.from_wallet_id, "from_wallet_id", kind)?;
            reject(cmd.to_wallet_id, "to_wallet_id", kind)?;
            Ok(Movement::InitialBalance {
                wallet_id: required(cmd.wallet_id.or(old.wallet_id()), "wallet_id")?,
            })
        }
    }
}

impl Engine {
    /// Validate, apply and persist a new transaction inside `db_tx`.
    pub(crate) async fn insert_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: NewTransactionCmd,
    ) -> ResultEngine<Transaction> {
        if !cmd.amount.is_positive() {
            return Err(EngineError::Validation("amount must be > 0".to_string()));
        }
        validate_movement(db_tx, &cmd.user_id, &cmd.movement).await?;

        let tx = Transaction::new(
            cmd.user_id,
            cmd.movement,
            cmd.amount,
            normalize_optional_text(cmd.meta.description.as_deref()),
            cmd.meta.occurred_at,
        )?;
        self.apply_ledger_operation(db_tx, &tx.owner_id, &[LedgerStep::Apply(Effect::from(&tx))])
            .await?;
        transactions::ActiveModel::from(&tx).insert(db_tx).await?;

        tracing::info!(
            transaction_id = %tx.id,
            user_id = %tx.owner_id,
            kind = tx.kind().as_str(),
            amount = %tx.amount,
            "transaction created"
        );
        Ok(tx)
    }

    /// Create a transaction and apply its balance effect.
    pub async fn create_transaction(&self, cmd: NewTransactionCmd) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| self.insert_transaction(&db_tx, cmd).await)
    }

    /// Update a transaction.
    ///
    /// The stored effect is reverted and the merged one applied in a single
    /// ledger operation, so funds are checked against the post-revert
    /// balance. Any failure leaves wallets and the record untouched.
    pub async fn update_transaction(&self, cmd: UpdateTransactionCmd) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = require_transaction(&db_tx, cmd.transaction_id, &cmd.user_id).await?;
            let old = Transaction::try_from(model)?;

            let movement = merge_movement(old.movement, &cmd)?;
            let amount: MoneyCents = cmd.amount.unwrap_or(old.amount);
            if !amount.is_positive() {
                return Err(EngineError::Validation("amount must be > 0".to_string()));
            }
            validate_movement(&db_tx, &cmd.user_id, &movement).await?;

            let updated = Transaction {
                id: old.id,
                owner_id: old.owner_id.clone(),
                movement,
                amount,
                description: match cmd.description.as_deref() {
                    Some(value) => normalize_optional_text(Some(value)),
                    None => old.description.clone(),
                },
                occurred_at: cmd.occurred_at.unwrap_or(old.occurred_at),
                created_at: old.created_at,
            };

            self.apply_ledger_operation(
                &db_tx,
                &cmd.user_id,
                &[
                    LedgerStep::Revert(Effect::from(&old)),
                    LedgerStep::Apply(Effect::from(&updated)),
                ],
            )
            .await?;
            transactions::ActiveModel::from(&updated)
                .update(&db_tx)
                .await?;

            tracing::info!(
                transaction_id = %updated.id,
                user_id = %updated.owner_id,
                old_kind = old.kind().as_str(),
                kind = updated.kind().as_str(),
                amount = %updated.amount,
                "transaction updated"
            );
            Ok(updated)
        })
    }

    /// Delete a transaction, reverting its balance effect.
    pub async fn delete_transaction(&self, transaction_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = require_transaction(&db_tx, transaction_id, user_id).await?;
            let tx = Transaction::try_from(model)?;

            self.apply_ledger_operation(&db_tx, user_id, &[LedgerStep::Revert(Effect::from(&tx))])
                .await?;
            transactions::Entity::delete_by_id(transaction_id)
                .exec(&db_tx)
                .await?;

            tracing::info!(%transaction_id, %user_id, kind = tx.kind().as_str(), "transaction deleted");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn income() -> (Movement, Uuid, Uuid) {
        let (wallet_id, category_id) = (Uuid::new_v4(), Uuid::new_v4());
        (
            Movement::Income {
                wallet_id,
                category_id,
            },
            wallet_id,
            category_id,
        )
    }

    fn patch() -> UpdateTransactionCmd {
        UpdateTransactionCmd::new(Uuid::new_v4(), "alice")
    }

    #[test]
    fn empty_patch_keeps_movement() {
        let (old, _, _) = income();
        assert_eq!(merge_movement(old, &patch()).unwrap(), old);
    }

    #[test]
    fn kind_switch_keeps_wallet_and_category() {
        let (old, wallet_id, category_id) = income();
        let merged = merge_movement(old, &patch().kind(TransactionKind::Expense)).unwrap();
        assert_eq!(
            merged,
            Movement::Expense {
                wallet_id,
                category_id
            }
        );
    }

    #[test]
    fn switch_to_transfer_needs_both_wallets() {
        let (old, wallet_id, _) = income();
        let err = merge_movement(
            old,
            &patch()
                .kind(TransactionKind::Transfer)
                .from_wallet_id(wallet_id),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::Validation("to_wallet_id is required".to_string())
        );

        let to = Uuid::new_v4();
        let merged = merge_movement(
            old,
            &patch()
                .kind(TransactionKind::Transfer)
                .from_wallet_id(wallet_id)
                .to_wallet_id(to),
        )
        .unwrap();
        assert_eq!(
            merged,
            Movement::Transfer {
                from_wallet_id: wallet_id,
                to_wallet_id: to
            }
        );
    }

    #[test]
    fn transfer_to_income_needs_wallet_and_category() {
        let old = Movement::Transfer {
            from_wallet_id: Uuid::new_v4(),
            to_wallet_id: Uuid::new_v4(),
        };
        let err = merge_movement(old, &patch().kind(TransactionKind::Income)).unwrap_err();
        assert_eq!(
            err,
            EngineError::Validation("wallet_id is required".to_string())
        );
    }

    #[test]
    fn category_on_initial_balance_is_rejected() {
        let old = Movement::InitialBalance {
            wallet_id: Uuid::new_v4(),
        };
        let err = merge_movement(old, &patch().category_id(Uuid::new_v4())).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
