//! Transaction primitives.
//!
//! A `Transaction` is a dated event that changes one or two wallet balances.
//! Its shape depends on its kind, so it is modeled as a [`Movement`] variant
//! rather than a record with mutually exclusive nullable fields. The flat
//! nullable layout only exists in the `transactions` table.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
    InitialBalance,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
            Self::InitialBalance => "initial_balance",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            "initial_balance" => Ok(Self::InitialBalance),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// The wallets (and category) a transaction refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Movement {
    Income { wallet_id: Uuid, category_id: Uuid },
    Expense { wallet_id: Uuid, category_id: Uuid },
    Transfer { from_wallet_id: Uuid, to_wallet_id: Uuid },
    InitialBalance { wallet_id: Uuid },
}

impl Movement {
    pub fn kind(&self) -> TransactionKind {
        match self {
            Self::Income { .. } => TransactionKind::Income,
            Self::Expense { .. } => TransactionKind::Expense,
            Self::Transfer { .. } => TransactionKind::Transfer,
            Self::InitialBalance { .. } => TransactionKind::InitialBalance,
        }
    }

    /// Wallet of a single-wallet movement.
    pub fn wallet_id(&self) -> Option<Uuid> {
        match *self {
            Self::Income { wallet_id, .. }
            | Self::Expense { wallet_id, .. }
            | Self::InitialBalance { wallet_id } => Some(wallet_id),
            Self::Transfer { .. } => None,
        }
    }

    pub fn category_id(&self) -> Option<Uuid> {
        match *self {
            Self::Income { category_id, .. } | Self::Expense { category_id, .. } => {
                Some(category_id)
            }
            Self::Transfer { .. } | Self::InitialBalance { .. } => None,
        }
    }

    /// Every wallet touched by the movement.
    pub fn wallet_ids(&self) -> Vec<Uuid> {
        match *self {
            Self::Transfer {
                from_wallet_id,
                to_wallet_id,
            } => vec![from_wallet_id, to_wallet_id],
            Self::Income { wallet_id, .. }
            | Self::Expense { wallet_id, .. }
            | Self::InitialBalance { wallet_id } => vec![wallet_id],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub owner_id: String,
    pub movement: Movement,
    pub amount: MoneyCents,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        owner_id: String,
        movement: Movement,
        amount: MoneyCents,
        description: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::Validation("amount must be > 0".to_string()));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            movement,
            amount,
            description,
            occurred_at,
            created_at: Utc::now(),
        })
    }

    pub fn kind(&self) -> TransactionKind {
        self.movement.kind()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub wallet_id: Option<Uuid>,
    pub from_wallet_id: Option<Uuid>,
    pub to_wallet_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Category,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    /// Every column is `Set`, so an update through this model fully replaces
    /// the row and clears the wallet/category fields the new kind does not
    /// use.
    fn from(tx: &Transaction) -> Self {
        let (from_wallet_id, to_wallet_id) = match tx.movement {
            Movement::Transfer {
                from_wallet_id,
                to_wallet_id,
            } => (Some(from_wallet_id), Some(to_wallet_id)),
            _ => (None, None),
        };
        Self {
            id: ActiveValue::Set(tx.id),
            owner_id: ActiveValue::Set(tx.owner_id.clone()),
            kind: ActiveValue::Set(tx.kind().as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount.cents()),
            wallet_id: ActiveValue::Set(tx.movement.wallet_id()),
            from_wallet_id: ActiveValue::Set(from_wallet_id),
            to_wallet_id: ActiveValue::Set(to_wallet_id),
            category_id: ActiveValue::Set(tx.movement.category_id()),
            description: ActiveValue::Set(tx.description.clone()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let corrupted = |field: &str| {
            EngineError::Validation(format!("transaction {}: missing {field}", model.id))
        };
        let kind = TransactionKind::try_from(model.kind.as_str())?;
        let movement = match kind {
            TransactionKind::Income => Movement::Income {
                wallet_id: model.wallet_id.ok_or_else(|| corrupted("wallet_id"))?,
                category_id: model.category_id.ok_or_else(|| corrupted("category_id"))?,
            },
            TransactionKind::Expense => Movement::Expense {
                wallet_id: model.wallet_id.ok_or_else(|| corrupted("wallet_id"))?,
                category_id: model.category_id.ok_or_else(|| corrupted("category_id"))?,
            },
            TransactionKind::Transfer => Movement::Transfer {
                from_wallet_id: model
                    .from_wallet_id
                    .ok_or_else(|| corrupted("from_wallet_id"))?,
                to_wallet_id: model.to_wallet_id.ok_or_else(|| corrupted("to_wallet_id"))?,
            },
            TransactionKind::InitialBalance => Movement::InitialBalance {
                wallet_id: model.wallet_id.ok_or_else(|| corrupted("wallet_id"))?,
            },
        };

        Ok(Self {
            id: model.id,
            owner_id: model.owner_id,
            movement,
            amount: MoneyCents::new(model.amount_minor),
            description: model.description,
            occurred_at: model.occurred_at,
            created_at: model.created_at,
        })
    }
}
