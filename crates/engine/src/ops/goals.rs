use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, Goal, GoalView, MoneyCents, NewGoalCmd, ResultEngine, evaluate, goals,
    util::normalize_required_name, wallets,
};

use super::{Engine, wallets::require_wallet, with_tx};

/// Evaluates `model` against `balance` at `now`, writing the status back
/// only when it changed.
async fn refresh_goal(
    db_tx: &DatabaseTransaction,
    model: goals::Model,
    balance: MoneyCents,
    now: DateTime<Utc>,
) -> ResultEngine<GoalView> {
    let mut goal = Goal::try_from(model)?;
    let progress = evaluate(balance, goal.target_amount, goal.target_date, now);

    if progress.status != goal.status {
        tracing::info!(
            goal_id = %goal.id,
            from = goal.status.as_str(),
            to = progress.status.as_str(),
            "goal status changed"
        );
        goals::ActiveModel {
            id: ActiveValue::Unchanged(goal.id),
            status: ActiveValue::Set(progress.status.as_str().to_string()),
            ..Default::default()
        }
        .update(db_tx)
        .await?;
        goal.status = progress.status;
    }

    Ok(GoalView {
        goal,
        wallet_balance: balance,
        progress,
    })
}

impl Engine {
    /// Create a savings goal on one of the caller's wallets.
    pub async fn new_goal(&self, cmd: NewGoalCmd) -> ResultEngine<GoalView> {
        let name = normalize_required_name(&cmd.name, "goal")?;
        if !cmd.target_amount.is_positive() {
            return Err(EngineError::Validation(
                "target amount must be > 0".to_string(),
            ));
        }
        let now = Utc::now();
        if cmd.target_date < now {
            return Err(EngineError::Validation(
                "target date must not be in the past".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let wallet = require_wallet(&db_tx, cmd.wallet_id, &cmd.user_id).await?;
            let balance = MoneyCents::new(wallet.balance);
            let progress = evaluate(balance, cmd.target_amount, cmd.target_date, now);

            let goal = Goal {
                id: Uuid::new_v4(),
                owner_id: cmd.user_id.clone(),
                wallet_id: cmd.wallet_id,
                name,
                target_amount: cmd.target_amount,
                target_date: cmd.target_date,
                status: progress.status,
                created_at: now,
            };
            goals::ActiveModel::from(&goal).insert(&db_tx).await?;

            tracing::info!(goal_id = %goal.id, user_id = %cmd.user_id, "goal created");
            Ok(GoalView {
                goal,
                wallet_balance: balance,
                progress,
            })
        })
    }

    /// Return a goal with its progress as of now.
    pub async fn goal(&self, goal_id: Uuid, user_id: &str) -> ResultEngine<GoalView> {
        self.goal_as_of(goal_id, user_id, Utc::now()).await
    }

    /// Return a goal with its progress as of `now`, persisting a status
    /// change.
    pub async fn goal_as_of(
        &self,
        goal_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<GoalView> {
        with_tx!(self, |db_tx| {
            let model = goals::Entity::find_by_id(goal_id)
                .filter(goals::Column::OwnerId.eq(user_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("goal not exists".to_string()))?;
            let wallet = require_wallet(&db_tx, model.wallet_id, user_id).await?;
            refresh_goal(&db_tx, model, MoneyCents::new(wallet.balance), now).await
        })
    }

    /// Every goal of `user_id`, by target date.
    pub async fn goals(&self, user_id: &str) -> ResultEngine<Vec<GoalView>> {
        self.goals_as_of(user_id, Utc::now()).await
    }

    pub async fn goals_as_of(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<GoalView>> {
        with_tx!(self, |db_tx| {
            let balances: HashMap<Uuid, MoneyCents> = wallets::Entity::find()
                .filter(wallets::Column::OwnerId.eq(user_id.to_string()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|model| (model.id, MoneyCents::new(model.balance)))
                .collect();

            let models = goals::Entity::find()
                .filter(goals::Column::OwnerId.eq(user_id.to_string()))
                .order_by_asc(goals::Column::TargetDate)
                .all(&db_tx)
                .await?;

            let mut views = Vec::with_capacity(models.len());
            for model in models {
                let Some(balance) = balances.get(&model.wallet_id).copied() else {
                    tracing::warn!(goal_id = %model.id, "goal wallet missing, skipping");
                    continue;
                };
                views.push(refresh_goal(&db_tx, model, balance, now).await?);
            }
            Ok(views)
        })
    }

    pub async fn delete_goal(&self, goal_id: Uuid, user_id: &str) -> ResultEngine<()> {
        let result = goals::Entity::delete_many()
            .filter(goals::Column::Id.eq(goal_id))
            .filter(goals::Column::OwnerId.eq(user_id.to_string()))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("goal not exists".to_string()));
        }
        tracing::info!(%goal_id, %user_id, "goal deleted");
        Ok(())
    }
}

