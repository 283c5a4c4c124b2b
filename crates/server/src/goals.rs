//! Savings goals API endpoints.

use api_types::goal::{GoalListResponse, GoalNew, GoalStatus, GoalView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{MoneyCents, NewGoalCmd};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn map_goal(view: engine::GoalView) -> GoalView {
    GoalView {
        id: view.goal.id,
        wallet_id: view.goal.wallet_id,
        name: view.goal.name,
        target_amount_minor: view.goal.target_amount.cents(),
        target_date: view.goal.target_date.fixed_offset(),
        status: match view.progress.status {
            engine::GoalStatus::Success => GoalStatus::Success,
            engine::GoalStatus::Fail => GoalStatus::Fail,
            engine::GoalStatus::InProgress => GoalStatus::InProgress,
        },
        progress: view.progress.progress,
        days_remaining: view.progress.days_remaining,
        wallet_balance_minor: view.wallet_balance.cents(),
    }
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<GoalListResponse>, ServerError> {
    let goals = state
        .engine
        .goals(&user.username)
        .await?
        .into_iter()
        .map(map_goal)
        .collect();
    Ok(Json(GoalListResponse { goals }))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(goal_id): Path<Uuid>,
) -> Result<Json<GoalView>, ServerError> {
    let view = state.engine.goal(goal_id, &user.username).await?;
    Ok(Json(map_goal(view)))
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<GoalNew>,
) -> Result<(StatusCode, Json<GoalView>), ServerError> {
    let view = state
        .engine
        .new_goal(NewGoalCmd::new(
            user.username.clone(),
            payload.wallet_id,
            payload.name,
            MoneyCents::new(payload.target_amount_minor),
            payload.target_date.with_timezone(&Utc),
        ))
        .await?;
    Ok((StatusCode::CREATED, Json(map_goal(view))))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(goal_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_goal(goal_id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
