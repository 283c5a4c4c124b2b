use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod wallet {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum WalletKind {
        #[default]
        Cash,
        Bank,
        Card,
        Other,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletNew {
        pub name: String,
        #[serde(default)]
        pub kind: WalletKind,
        /// Recorded as an `initial_balance` transaction when positive.
        pub opening_balance_minor: Option<i64>,
        /// Defaults to the request time.
        pub initialized_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletRename {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletView {
        pub id: Uuid,
        pub name: String,
        pub kind: WalletKind,
        pub balance_minor: i64,
        pub initialized_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletListResponse {
        pub wallets: Vec<WalletView>,
    }
}

pub mod category {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum CategoryKind {
        Income,
        Expense,
    }

    /// Query string of `GET /categories`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CategoryList {
        pub kind: Option<CategoryKind>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
        pub kind: CategoryKind,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
        pub kind: CategoryKind,
        pub is_default: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryListResponse {
        pub categories: Vec<CategoryView>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
        Transfer,
        InitialBalance,
    }

    /// Flat request body for every kind.
    ///
    /// `income`/`expense` need `wallet_id` and `category_id`, `transfer`
    /// needs `from_wallet_id` and `to_wallet_id`, `initial_balance` needs
    /// `wallet_id` only.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub wallet_id: Option<Uuid>,
        pub from_wallet_id: Option<Uuid>,
        pub to_wallet_id: Option<Uuid>,
        pub category_id: Option<Uuid>,
        pub description: Option<String>,
        /// RFC3339 timestamp, including timezone offset.
        pub occurred_at: DateTime<FixedOffset>,
    }

    /// Patch body: absent fields keep their stored value.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub kind: Option<TransactionKind>,
        pub amount_minor: Option<i64>,
        pub wallet_id: Option<Uuid>,
        pub from_wallet_id: Option<Uuid>,
        pub to_wallet_id: Option<Uuid>,
        pub category_id: Option<Uuid>,
        /// Empty string clears the description.
        pub description: Option<String>,
        pub occurred_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        pub from: Option<DateTime<FixedOffset>>,
        pub to: Option<DateTime<FixedOffset>>,
        pub kinds: Option<Vec<TransactionKind>>,
        pub wallet_id: Option<Uuid>,
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        ///
        /// Newest → older pagination.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub wallet_id: Option<Uuid>,
        pub from_wallet_id: Option<Uuid>,
        pub to_wallet_id: Option<Uuid>,
        pub category_id: Option<Uuid>,
        pub description: Option<String>,
        pub occurred_at: DateTime<FixedOffset>,
        pub created_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        pub next_cursor: Option<String>,
    }
}

pub mod dashboard {
    use super::*;

    /// Query string of `GET /dashboard`; `month` is `YYYY-MM`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct DashboardGet {
        pub month: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ClosingBalanceView {
        pub month: String,
        pub label: String,
        pub balance_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DashboardView {
        pub month: String,
        pub this_month_income_minor: i64,
        pub this_month_expense_minor: i64,
        pub this_month_initial_balance_minor: i64,
        pub broad_forward_balance_minor: i64,
        pub this_month_total_balance_minor: i64,
        pub closing_history: Vec<ClosingBalanceView>,
        pub wallets_total_minor: i64,
        pub wallet_count: u64,
    }
}

pub mod goal {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum GoalStatus {
        Success,
        Fail,
        InProgress,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalNew {
        pub wallet_id: Uuid,
        pub name: String,
        pub target_amount_minor: i64,
        pub target_date: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalView {
        pub id: Uuid,
        pub wallet_id: Uuid,
        pub name: String,
        pub target_amount_minor: i64,
        pub target_date: DateTime<FixedOffset>,
        pub status: GoalStatus,
        pub progress: f64,
        pub days_remaining: i64,
        pub wallet_balance_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalListResponse {
        pub goals: Vec<GoalView>,
    }
}
