use sea_orm::{
    ActiveValue, ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, NewTransactionCmd, NewWalletCmd, ResultEngine, Wallet, goals,
    util::normalize_required_name, wallets,
};

use super::{Engine, with_tx};

pub(super) async fn require_wallet<C>(
    db: &C,
    wallet_id: Uuid,
    user_id: &str,
) -> ResultEngine<wallets::Model>
where
    C: ConnectionTrait,
{
    wallets::Entity::find_by_id(wallet_id)
        .filter(wallets::Column::OwnerId.eq(user_id.to_string()))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("wallet not exists".to_string()))
}

/// Wallet names are unique per owner, ignoring case.
async fn ensure_wallet_name_free<C>(
    db: &C,
    user_id: &str,
    name: &str,
    except: Option<Uuid>,
) -> ResultEngine<()>
where
    C: ConnectionTrait,
{
    let wanted = name.to_lowercase();
    let clash = wallets::Entity::find()
        .filter(wallets::Column::OwnerId.eq(user_id.to_string()))
        .all(db)
        .await?
        .into_iter()
        .any(|model| Some(model.id) != except && model.name.to_lowercase() == wanted);
    if clash {
        return Err(EngineError::ExistingKey(name.to_string()));
    }
    Ok(())
}

impl Engine {
    /// Return a wallet snapshot from DB.
    pub async fn wallet(&self, wallet_id: Uuid, user_id: &str) -> ResultEngine<Wallet> {
        let model = require_wallet(&self.database, wallet_id, user_id).await?;
        Wallet::try_from(model)
    }

    /// Every wallet of `user_id`, sorted by name.
    pub async fn wallets(&self, user_id: &str) -> ResultEngine<Vec<Wallet>> {
        wallets::Entity::find()
            .filter(wallets::Column::OwnerId.eq(user_id.to_string()))
            .order_by_asc(wallets::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Wallet::try_from)
            .collect()
    }

    /// Add a new wallet.
    ///
    /// The wallet is inserted with a zero balance. A positive
    /// `opening_balance` is then recorded as an `InitialBalance` transaction
    /// dated `initialized_at`, so the balance always matches the ledger.
    pub async fn new_wallet(&self, cmd: NewWalletCmd) -> ResultEngine<Wallet> {
        let name = normalize_required_name(&cmd.name, "wallet")?;
        if cmd.opening_balance.is_negative() {
            return Err(EngineError::Validation(
                "opening balance must be >= 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            ensure_wallet_name_free(&db_tx, &cmd.user_id, &name, None).await?;

            let wallet = Wallet::new(cmd.user_id.clone(), name, cmd.kind, cmd.initialized_at);
            wallets::ActiveModel::from(&wallet).insert(&db_tx).await?;

            if cmd.opening_balance.is_positive() {
                let opening = NewTransactionCmd::initial_balance(
                    cmd.user_id.clone(),
                    wallet.id,
                    cmd.opening_balance,
                    cmd.initialized_at,
                );
                self.insert_transaction(&db_tx, opening).await?;
            }

            let model = require_wallet(&db_tx, wallet.id, &cmd.user_id).await?;
            tracing::info!(
                wallet_id = %wallet.id,
                user_id = %cmd.user_id,
                opening_balance = %cmd.opening_balance,
                "wallet created"
            );
            Wallet::try_from(model)
        })
    }

    pub async fn rename_wallet(
        &self,
        wallet_id: Uuid,
        user_id: &str,
        name: &str,
    ) -> ResultEngine<Wallet> {
        let name = normalize_required_name(name, "wallet")?;
        with_tx!(self, |db_tx| {
            let model = require_wallet(&db_tx, wallet_id, user_id).await?;
            ensure_wallet_name_free(&db_tx, user_id, &name, Some(wallet_id)).await?;

            let mut active: wallets::ActiveModel = model.into();
            active.name = ActiveValue::Set(name);
            let model = active.update(&db_tx).await?;
            Wallet::try_from(model)
        })
    }

    /// Delete a wallet.
    ///
    /// Refused while the balance is not zero or when it is the owner's last
    /// wallet. Goals on the wallet are removed with it; transactions that
    /// referenced it are kept.
    pub async fn delete_wallet(&self, wallet_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = require_wallet(&db_tx, wallet_id, user_id).await?;
            if !MoneyCents::new(model.balance).is_zero() {
                return Err(EngineError::Validation(
                    "wallet balance must be zero to delete it".to_string(),
                ));
            }

            let owned = wallets::Entity::find()
                .filter(wallets::Column::OwnerId.eq(user_id.to_string()))
                .count(&db_tx)
                .await?;
            if owned <= 1 {
                return Err(EngineError::Validation(
                    "cannot delete the only wallet".to_string(),
                ));
            }

            goals::Entity::delete_many()
                .filter(goals::Column::WalletId.eq(wallet_id))
                .exec(&db_tx)
                .await?;
            wallets::Entity::delete_by_id(wallet_id).exec(&db_tx).await?;
            tracing::info!(%wallet_id, %user_id, "wallet deleted");
            Ok(())
        })
    }
}
