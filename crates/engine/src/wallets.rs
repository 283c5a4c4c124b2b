//! The module contains `Wallet` struct and its implementation.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents};

/// Where the money of a wallet physically lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletKind {
    #[default]
    Cash,
    Bank,
    Card,
    Other,
}

impl WalletKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Bank => "bank",
            Self::Card => "card",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for WalletKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "cash" => Ok(Self::Cash),
            "bank" => Ok(Self::Bank),
            "card" => Ok(Self::Card),
            "other" => Ok(Self::Other),
            other => Err(EngineError::Validation(format!(
                "invalid wallet kind: {other}"
            ))),
        }
    }
}

/// A wallet.
///
/// A wallet is a representation of a real wallet, a bank account, a card or
/// anything else where money is kept.
///
/// `balance` is a denormalized aggregate: it is kept in sync with the
/// transactions referencing the wallet by the ledger, never recomputed on
/// read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Stable identifier for this wallet.
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub kind: WalletKind,
    pub balance: MoneyCents,
    /// Bumped on every balance write; used for compare-and-swap.
    pub version: i64,
    pub initialized_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(
        owner_id: String,
        name: String,
        kind: WalletKind,
        initialized_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            kind,
            balance: MoneyCents::ZERO,
            version: 0,
            initialized_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub kind: String,
    pub balance: i64,
    pub version: i64,
    pub initialized_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::goals::Entity")]
    Goals,
}

impl Related<super::goals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Goals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Wallet> for ActiveModel {
    fn from(value: &Wallet) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            owner_id: ActiveValue::Set(value.owner_id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            balance: ActiveValue::Set(value.balance.cents()),
            version: ActiveValue::Set(value.version),
            initialized_at: ActiveValue::Set(value.initialized_at),
        }
    }
}

impl TryFrom<Model> for Wallet {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            owner_id: model.owner_id,
            name: model.name,
            kind: WalletKind::try_from(model.kind.as_str())?,
            balance: MoneyCents::new(model.balance),
            version: model.version,
            initialized_at: model.initialized_at,
        })
    }
}
