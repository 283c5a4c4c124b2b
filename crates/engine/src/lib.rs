//! Wallet ledger engine.
//!
//! Keeps every wallet's stored balance in agreement with the transactions
//! that reference it, and derives dashboards and goal progress from the same
//! transaction log. All persistence goes through sea-orm; every write runs in
//! one database transaction.

pub use categories::{Category, CategoryKind};
pub use commands::{NewGoalCmd, NewTransactionCmd, NewWalletCmd, TxMeta, UpdateTransactionCmd};
pub use error::EngineError;
pub use goals::{Goal, GoalProgress, GoalStatus, GoalView, evaluate};
pub use ledger::{BalanceSheet, Effect, LedgerStep};
pub use money::MoneyCents;
pub use ops::{
    ClosingBalance, Dashboard, Engine, EngineBuilder, KindTotals, TransactionListFilter,
};
pub use period::Month;
pub use transactions::{Movement, Transaction, TransactionKind};
pub use wallets::{Wallet, WalletKind};

pub mod categories;
mod commands;
mod error;
pub mod goals;
pub mod ledger;
mod money;
mod ops;
mod period;
pub mod transactions;
mod util;
pub mod wallets;

type ResultEngine<T> = Result<T, EngineError>;
