//! Savings goals attached to a wallet.
//!
//! A goal's status is derived from the wallet balance and the target date.
//! [`evaluate`] is the pure rule; the engine calls it on every read and
//! write and persists the status only when it changed, so no scheduler is
//! needed to move goals to `Fail` once their date has passed.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents};

const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalStatus {
    Success,
    Fail,
    InProgress,
}

impl GoalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Fail => "FAIL",
            Self::InProgress => "IN_PROGRESS",
        }
    }
}

impl TryFrom<&str> for GoalStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "SUCCESS" => Ok(Self::Success),
            "FAIL" => Ok(Self::Fail),
            "IN_PROGRESS" => Ok(Self::InProgress),
            other => Err(EngineError::Validation(format!(
                "invalid goal status: {other}"
            ))),
        }
    }
}

/// Result of evaluating a goal against a wallet balance at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub status: GoalStatus,
    /// Completion percentage, clamped to `0..=100`.
    pub progress: f64,
    /// Whole days left until the target date, rounded up. Negative once the
    /// date has passed.
    pub days_remaining: i64,
}

/// Evaluates a goal.
///
/// Rules, first match wins:
/// 1. `Success` if the balance reached the target and the date has not
///    passed (`days_remaining >= 0`).
/// 2. `Fail` if the date has passed and the target was not reached.
/// 3. `InProgress` otherwise.
pub fn evaluate(
    balance: MoneyCents,
    target: MoneyCents,
    target_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> GoalProgress {
    let days_remaining = ceil_days((target_date - now).num_milliseconds());
    let reached = balance >= target;

    let status = if reached && days_remaining >= 0 {
        GoalStatus::Success
    } else if days_remaining < 0 && !reached {
        GoalStatus::Fail
    } else {
        GoalStatus::InProgress
    };

    let progress = if target.is_positive() {
        (balance.cents() as f64 * 100.0 / target.cents() as f64).clamp(0.0, 100.0)
    } else if reached {
        100.0
    } else {
        0.0
    };

    GoalProgress {
        status,
        progress,
        days_remaining,
    }
}

fn ceil_days(millis: i64) -> i64 {
    let days = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) == 0 {
        days
    } else {
        days + 1
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub owner_id: String,
    pub wallet_id: Uuid,
    pub name: String,
    pub target_amount: MoneyCents,
    pub target_date: DateTime<Utc>,
    pub status: GoalStatus,
    pub created_at: DateTime<Utc>,
}

/// A goal together with its freshly evaluated progress.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalView {
    pub goal: Goal,
    pub wallet_balance: MoneyCents,
    pub progress: GoalProgress,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "goals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: String,
    pub wallet_id: Uuid,
    pub name: String,
    pub target_amount_minor: i64,
    pub target_date: DateTimeUtc,
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::WalletId",
        to = "super::wallets::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Wallet,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Goal> for ActiveModel {
    fn from(goal: &Goal) -> Self {
        Self {
            id: ActiveValue::Set(goal.id),
            owner_id: ActiveValue::Set(goal.owner_id.clone()),
            wallet_id: ActiveValue::Set(goal.wallet_id),
            name: ActiveValue::Set(goal.name.clone()),
            target_amount_minor: ActiveValue::Set(goal.target_amount.cents()),
            target_date: ActiveValue::Set(goal.target_date),
            status: ActiveValue::Set(goal.status.as_str().to_string()),
            created_at: ActiveValue::Set(goal.created_at),
        }
    }
}

impl TryFrom<Model> for Goal {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            owner_id: model.owner_id,
            wallet_id: model.wallet_id,
            name: model.name,
            target_amount: MoneyCents::new(model.target_amount_minor),
            target_date: model.target_date,
            status: GoalStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
        })
    }
}
