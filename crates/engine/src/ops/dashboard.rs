//! Month-windowed aggregations over the transaction log.
//!
//! All sums are grouped `SUM(amount_minor)` queries by kind. Transfers move
//! money between the owner's own wallets and never count.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sea_orm::{
    ConnectionTrait, QueryFilter, QuerySelect, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    MoneyCents, Month, ResultEngine, TransactionKind, ledger::overflow, transactions, wallets,
};

use super::{Engine, with_tx};

/// Number of points in the closing-balance history, reference month included.
const HISTORY_MONTHS: u32 = 6;

/// Per-kind sums over a time window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTotals {
    pub income: MoneyCents,
    pub expense: MoneyCents,
    pub initial_balance: MoneyCents,
}

impl KindTotals {
    /// `income + initial_balance - expense`.
    pub fn net(&self) -> ResultEngine<MoneyCents> {
        self.income
            .checked_add(self.initial_balance)
            .and_then(|inflow| inflow.checked_sub(self.expense))
            .ok_or_else(overflow)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingBalance {
    pub month: Month,
    /// e.g. `"Mar 2026"`.
    pub label: String,
    pub balance: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub month: Month,
    pub this_month_income: MoneyCents,
    pub this_month_expense: MoneyCents,
    pub this_month_initial_balance: MoneyCents,
    /// Net of everything strictly before the month.
    pub broad_forward_balance: MoneyCents,
    pub this_month_total_balance: MoneyCents,
    /// Oldest first, ending with `month`.
    pub closing_history: Vec<ClosingBalance>,
    /// Sum of the stored wallet balances right now.
    pub wallets_total: MoneyCents,
    pub wallet_count: u64,
}

/// Sums amounts of `user_id` by kind with `occurred_at` in `[from, to)`.
/// Open bounds are unbounded.
async fn sum_by_kind<C>(
    db: &C,
    user_id: &str,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> ResultEngine<KindTotals>
where
    C: ConnectionTrait,
{
    let mut query = transactions::Entity::find()
        .select_only()
        .column(transactions::Column::Kind)
        .column_as(Expr::col(transactions::Column::AmountMinor).sum(), "total")
        .filter(transactions::Column::OwnerId.eq(user_id.to_string()));
    if let Some(from) = from {
        query = query.filter(transactions::Column::OccurredAt.gte(from));
    }
    if let Some(to) = to {
        query = query.filter(transactions::Column::OccurredAt.lt(to));
    }

    let rows: Vec<(String, Option<i64>)> = query
        .group_by(transactions::Column::Kind)
        .into_tuple()
        .all(db)
        .await?;

    let mut totals = KindTotals::default();
    for (kind, total) in rows {
        let total = MoneyCents::new(total.unwrap_or(0));
        match TransactionKind::try_from(kind.as_str())? {
            TransactionKind::Income => totals.income = total,
            TransactionKind::Expense => totals.expense = total,
            TransactionKind::InitialBalance => totals.initial_balance = total,
            TransactionKind::Transfer => {}
        }
    }
    Ok(totals)
}

/// Running closing balance: starts at `seed` and adds each month's net in
/// order.
fn rolling_closing_balances(
    seed: MoneyCents,
    months: &[(Month, KindTotals)],
) -> ResultEngine<Vec<ClosingBalance>> {
    let mut running = seed;
    months
        .iter()
        .map(|(month, totals)| -> ResultEngine<ClosingBalance> {
            running = running.checked_add(totals.net()?).ok_or_else(overflow)?;
            Ok(ClosingBalance {
                month: *month,
                label: month.label(),
                balance: running,
            })
        })
        .collect()
}

impl Engine {
    /// Per-kind sums of `user_id` in `[from, to)`.
    pub async fn kind_totals(
        &self,
        user_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ResultEngine<KindTotals> {
        sum_by_kind(&self.database, user_id, from, to).await
    }

    /// Dashboard of `user_id` for `month` (current UTC month if `None`).
    ///
    /// Reads run in one database transaction so the figures agree with each
    /// other.
    pub async fn dashboard(&self, user_id: &str, month: Option<Month>) -> ResultEngine<Dashboard> {
        let month = month.unwrap_or_else(Month::current);
        with_tx!(self, |db_tx| {
            let this_month =
                sum_by_kind(&db_tx, user_id, Some(month.start()), Some(month.end())).await?;
            let broad_forward_balance =
                sum_by_kind(&db_tx, user_id, None, Some(month.start())).await?.net()?;
            let this_month_total_balance = broad_forward_balance
                .checked_add(this_month.net()?)
                .ok_or_else(overflow)?;

            let oldest = month.minus(HISTORY_MONTHS - 1);
            let seed = sum_by_kind(&db_tx, user_id, None, Some(oldest.start()))
                .await?
                .net()?;
            let mut months = Vec::with_capacity(HISTORY_MONTHS as usize);
            for offset in 0..HISTORY_MONTHS {
                let current = oldest.plus(offset);
                let totals = if current == month {
                    this_month
                } else {
                    sum_by_kind(&db_tx, user_id, Some(current.start()), Some(current.end()))
                        .await?
                };
                months.push((current, totals));
            }
            let closing_history = rolling_closing_balances(seed, &months)?;

            let wallet_balances: Vec<i64> = wallets::Entity::find()
                .select_only()
                .column(wallets::Column::Balance)
                .filter(wallets::Column::OwnerId.eq(user_id.to_string()))
                .into_tuple()
                .all(&db_tx)
                .await?;
            let wallets_total = wallet_balances
                .iter()
                .try_fold(MoneyCents::ZERO, |total, balance| {
                    total.checked_add(MoneyCents::new(*balance))
                })
                .ok_or_else(overflow)?;

            tracing::debug!(%user_id, %month, "dashboard computed");
            Ok(Dashboard {
                month,
                this_month_income: this_month.income,
                this_month_expense: this_month.expense,
                this_month_initial_balance: this_month.initial_balance,
                broad_forward_balance,
                this_month_total_balance,
                closing_history,
                wallets_total,
                wallet_count: wallet_balances.len() as u64,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(income: i64, expense: i64, initial_balance: i64) -> KindTotals {
        KindTotals {
            income: MoneyCents::new(income),
            expense: MoneyCents::new(expense),
            initial_balance: MoneyCents::new(initial_balance),
        }
    }

    #[test]
    fn net_counts_initial_balance_as_inflow() {
        assert_eq!(totals(500, 200, 0).net().unwrap(), MoneyCents::new(300));
        assert_eq!(totals(0, 50, 100).net().unwrap(), MoneyCents::new(50));
    }

    #[test]
    fn net_out_of_range_is_an_error() {
        let err = totals(i64::MAX, 0, 1).net().unwrap_err();
        assert!(matches!(err, crate::EngineError::Validation(_)));
    }

    #[test]
    fn closing_balances_accumulate() {
        let march = Month::new(2026, 3).unwrap();
        let months = vec![
            (march.minus(2), totals(0, 0, 0)),
            (march.prev(), totals(500, 200, 0)),
            (march, totals(100, 40, 0)),
        ];

        let history = rolling_closing_balances(MoneyCents::new(1_000), &months).unwrap();

        let balances: Vec<i64> = history.iter().map(|point| point.balance.cents()).collect();
        assert_eq!(balances, vec![1_000, 1_300, 1_360]);
        assert_eq!(history[2].label, "Mar 2026");
        assert_eq!(history[0].month, Month::new(2026, 1).unwrap());
    }
}
