//! Dashboard API endpoint

use api_types::dashboard::{ClosingBalanceView, DashboardGet, DashboardView};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use engine::Month;

use crate::{ServerError, server::ServerState, user};

/// Monthly totals for `month` (current month when absent).
pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<DashboardGet>,
) -> Result<Json<DashboardView>, ServerError> {
    let month = query
        .month
        .as_deref()
        .map(str::parse::<Month>)
        .transpose()?;

    let dashboard = state.engine.dashboard(&user.username, month).await?;

    Ok(Json(DashboardView {
        month: dashboard.month.to_string(),
        this_month_income_minor: dashboard.this_month_income.cents(),
        this_month_expense_minor: dashboard.this_month_expense.cents(),
        this_month_initial_balance_minor: dashboard.this_month_initial_balance.cents(),
        broad_forward_balance_minor: dashboard.broad_forward_balance.cents(),
        this_month_total_balance_minor: dashboard.this_month_total_balance.cents(),
        closing_history: dashboard
            .closing_history
            .into_iter()
            .map(|point| ClosingBalanceView {
                month: point.month.to_string(),
                label: point.label,
                balance_minor: point.balance.cents(),
            })
            .collect(),
        wallets_total_minor: dashboard.wallets_total.cents(),
        wallet_count: dashboard.wallet_count,
    }))
}
