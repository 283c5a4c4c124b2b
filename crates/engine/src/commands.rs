//! Command structs for engine operations.
//!
//! These types group parameters for write operations
//! (create/update transaction, new wallet, new goal), keeping call sites
//! readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{MoneyCents, Movement, TransactionKind, WalletKind};

/// Common metadata for transaction creation.
#[derive(Clone, Debug)]
pub struct TxMeta {
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl TxMeta {
    #[must_use]
    pub fn new(occurred_at: DateTime<Utc>) -> Self {
        Self {
            description: None,
            occurred_at,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Create a transaction of any kind.
#[derive(Clone, Debug)]
pub struct NewTransactionCmd {
    pub user_id: String,
    pub movement: Movement,
    pub amount: MoneyCents,
    pub meta: TxMeta,
}

impl NewTransactionCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        movement: Movement,
        amount: MoneyCents,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            movement,
            amount,
            meta: TxMeta::new(occurred_at),
        }
    }

    #[must_use]
    pub fn income(
        user_id: impl Into<String>,
        wallet_id: Uuid,
        category_id: Uuid,
        amount: MoneyCents,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            user_id,
            Movement::Income {
                wallet_id,
                category_id,
            },
            amount,
            occurred_at,
        )
    }

    #[must_use]
    pub fn expense(
        user_id: impl Into<String>,
        wallet_id: Uuid,
        category_id: Uuid,
        amount: MoneyCents,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            user_id,
            Movement::Expense {
                wallet_id,
                category_id,
            },
            amount,
            occurred_at,
        )
    }

    #[must_use]
    pub fn transfer(
        user_id: impl Into<String>,
        from_wallet_id: Uuid,
        to_wallet_id: Uuid,
        amount: MoneyCents,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            user_id,
            Movement::Transfer {
                from_wallet_id,
                to_wallet_id,
            },
            amount,
            occurred_at,
        )
    }

    #[must_use]
    pub fn initial_balance(
        user_id: impl Into<String>,
        wallet_id: Uuid,
        amount: MoneyCents,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            user_id,
            Movement::InitialBalance { wallet_id },
            amount,
            occurred_at,
        )
    }

    #[must_use]
    pub fn meta(mut self, meta: TxMeta) -> Self {
        self.meta = meta;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }
}

/// Patch an existing transaction.
///
/// Absent fields keep the stored value. A blank `description` clears it.
/// Wallet and category fields the resulting kind does not use must be left
/// unset; the stored ones are dropped when the kind changes.
#[derive(Clone, Debug)]
pub struct UpdateTransactionCmd {
    pub transaction_id: Uuid,
    pub user_id: String,
    pub kind: Option<TransactionKind>,
    pub amount: Option<MoneyCents>,
    pub wallet_id: Option<Uuid>,
    pub from_wallet_id: Option<Uuid>,
    pub to_wallet_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl UpdateTransactionCmd {
    #[must_use]
    pub fn new(transaction_id: Uuid, user_id: impl Into<String>) -> Self {
        Self {
            transaction_id,
            user_id: user_id.into(),
            kind: None,
            amount: None,
            wallet_id: None,
            from_wallet_id: None,
            to_wallet_id: None,
            category_id: None,
            description: None,
            occurred_at: None,
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: MoneyCents) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn wallet_id(mut self, wallet_id: Uuid) -> Self {
        self.wallet_id = Some(wallet_id);
        self
    }

    #[must_use]
    pub fn from_wallet_id(mut self, wallet_id: Uuid) -> Self {
        self.from_wallet_id = Some(wallet_id);
        self
    }

    #[must_use]
    pub fn to_wallet_id(mut self, wallet_id: Uuid) -> Self {
        self.to_wallet_id = Some(wallet_id);
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }
}

/// Create a wallet, optionally with an opening balance.
#[derive(Clone, Debug)]
pub struct NewWalletCmd {
    pub user_id: String,
    pub name: String,
    pub kind: WalletKind,
    pub opening_balance: MoneyCents,
    pub initialized_at: DateTime<Utc>,
}

impl NewWalletCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        kind: WalletKind,
        initialized_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            kind,
            opening_balance: MoneyCents::ZERO,
            initialized_at,
        }
    }

    #[must_use]
    pub fn opening_balance(mut self, amount: MoneyCents) -> Self {
        self.opening_balance = amount;
        self
    }
}

#[derive(Clone, Debug)]
pub struct NewGoalCmd {
    pub user_id: String,
    pub wallet_id: Uuid,
    pub name: String,
    pub target_amount: MoneyCents,
    pub target_date: DateTime<Utc>,
}

impl NewGoalCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        wallet_id: Uuid,
        name: impl Into<String>,
        target_amount: MoneyCents,
        target_date: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            wallet_id,
            name: name.into(),
            target_amount,
            target_date,
        }
    }
}
