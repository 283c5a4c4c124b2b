//! Balance effects of transactions.
//!
//! Every wallet balance change in the engine goes through this module:
//!
//! | kind              | apply                          | revert        |
//! |-------------------|--------------------------------|---------------|
//! | income / initial  | `+amount`                      | `-amount`     |
//! | expense           | `-amount`, needs funds         | `+amount`     |
//! | transfer          | `from -amount` (needs funds), `to +amount` | inverse |
//!
//! Reverting an income may leave a balance negative when the money was
//! already spent; that is accepted and never clamped.
//!
//! A write is described as a list of [`LedgerStep`]s and run against a
//! [`BalanceSheet`], an in-memory preview of the touched wallets. Steps run in
//! order, so an update (`Revert(old)`, `Apply(new)`) checks funds against the
//! post-revert balance. Nothing is persisted unless every step succeeds.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, Movement, ResultEngine, Transaction, TransactionKind};

/// The balance-relevant part of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    pub movement: Movement,
    pub amount: MoneyCents,
}

impl Effect {
    pub fn new(movement: Movement, amount: MoneyCents) -> Self {
        Self { movement, amount }
    }

    /// Signed change per wallet when the effect is applied.
    pub fn deltas(&self) -> Vec<(Uuid, MoneyCents)> {
        match self.movement {
            Movement::Income { wallet_id, .. } | Movement::InitialBalance { wallet_id } => {
                vec![(wallet_id, self.amount)]
            }
            Movement::Expense { wallet_id, .. } => vec![(wallet_id, -self.amount)],
            Movement::Transfer {
                from_wallet_id,
                to_wallet_id,
            } => vec![(from_wallet_id, -self.amount), (to_wallet_id, self.amount)],
        }
    }
}

impl From<&Transaction> for Effect {
    fn from(tx: &Transaction) -> Self {
        Self::new(tx.movement, tx.amount)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerStep {
    Apply(Effect),
    Revert(Effect),
}

impl LedgerStep {
    pub fn effect(&self) -> &Effect {
        match self {
            Self::Apply(effect) | Self::Revert(effect) => effect,
        }
    }
}

/// Applies a single-wallet effect to `balance`.
pub fn apply(
    balance: MoneyCents,
    kind: TransactionKind,
    amount: MoneyCents,
) -> ResultEngine<MoneyCents> {
    match kind {
        TransactionKind::Income | TransactionKind::InitialBalance => credit(balance, amount),
        TransactionKind::Expense => debit(balance, amount),
        TransactionKind::Transfer => Err(EngineError::Validation(
            "a transfer touches two wallets".to_string(),
        )),
    }
}

/// Reverts a single-wallet effect on `balance`. Never checks funds.
pub fn revert(
    balance: MoneyCents,
    kind: TransactionKind,
    amount: MoneyCents,
) -> ResultEngine<MoneyCents> {
    match kind {
        TransactionKind::Income | TransactionKind::InitialBalance => {
            balance.checked_sub(amount).ok_or_else(overflow)
        }
        TransactionKind::Expense => credit(balance, amount),
        TransactionKind::Transfer => Err(EngineError::Validation(
            "a transfer touches two wallets".to_string(),
        )),
    }
}

/// Moves `amount` between two balances. Both sides change or neither does.
pub fn apply_transfer(
    from: MoneyCents,
    to: MoneyCents,
    amount: MoneyCents,
) -> ResultEngine<(MoneyCents, MoneyCents)> {
    Ok((debit(from, amount)?, credit(to, amount)?))
}

pub fn revert_transfer(
    from: MoneyCents,
    to: MoneyCents,
    amount: MoneyCents,
) -> ResultEngine<(MoneyCents, MoneyCents)> {
    Ok((
        credit(from, amount)?,
        to.checked_sub(amount).ok_or_else(overflow)?,
    ))
}

fn credit(balance: MoneyCents, amount: MoneyCents) -> ResultEngine<MoneyCents> {
    balance.checked_add(amount).ok_or_else(overflow)
}

fn debit(balance: MoneyCents, amount: MoneyCents) -> ResultEngine<MoneyCents> {
    if balance < amount {
        return Err(EngineError::InsufficientFunds(format!(
            "balance is {balance}, needs {amount}"
        )));
    }
    balance.checked_sub(amount).ok_or_else(overflow)
}

pub(crate) fn overflow() -> EngineError {
    EngineError::Validation("balance out of range".to_string())
}

#[derive(Clone, Copy, Debug)]
struct SheetEntry {
    original: MoneyCents,
    balance: MoneyCents,
    version: i64,
}

/// In-memory preview of the wallets touched by a ledger operation.
#[derive(Clone, Debug, Default)]
pub struct BalanceSheet {
    wallets: HashMap<Uuid, SheetEntry>,
}

/// A balance that must be written back, guarded by the version it was read
/// at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BalanceWrite {
    pub wallet_id: Uuid,
    pub balance: MoneyCents,
    pub expected_version: i64,
}

impl BalanceSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, wallet_id: Uuid, balance: MoneyCents, version: i64) {
        self.wallets.insert(
            wallet_id,
            SheetEntry {
                original: balance,
                balance,
                version,
            },
        );
    }

    pub fn balance(&self, wallet_id: Uuid) -> Option<MoneyCents> {
        self.wallets.get(&wallet_id).map(|entry| entry.balance)
    }

    pub fn run(&mut self, step: &LedgerStep) -> ResultEngine<()> {
        match step {
            LedgerStep::Apply(effect) => self.apply(effect),
            LedgerStep::Revert(effect) => self.revert(effect),
        }
    }

    fn apply(&mut self, effect: &Effect) -> ResultEngine<()> {
        match effect.movement {
            Movement::Transfer {
                from_wallet_id,
                to_wallet_id,
            } => {
                let from = self.require(from_wallet_id)?;
                let to = self.require(to_wallet_id)?;
                let (from, to) = apply_transfer(from, to, effect.amount)
                    .map_err(|err| with_wallet(err, from_wallet_id))?;
                self.set(from_wallet_id, from);
                self.set(to_wallet_id, to);
            }
            movement => {
                let wallet_id = single_wallet(&movement)?;
                let balance = self.require(wallet_id)?;
                let balance = apply(balance, movement.kind(), effect.amount)
                    .map_err(|err| with_wallet(err, wallet_id))?;
                self.set(wallet_id, balance);
            }
        }
        Ok(())
    }

    /// Reverts `effect`. Sides whose wallet is not on the sheet (it was
    /// deleted) are skipped.
    fn revert(&mut self, effect: &Effect) -> ResultEngine<()> {
        match effect.movement {
            Movement::Transfer {
                from_wallet_id,
                to_wallet_id,
            } => match (self.balance(from_wallet_id), self.balance(to_wallet_id)) {
                (Some(from), Some(to)) => {
                    let (from, to) = revert_transfer(from, to, effect.amount)?;
                    self.set(from_wallet_id, from);
                    self.set(to_wallet_id, to);
                }
                (Some(from), None) => {
                    self.skip_missing(to_wallet_id);
                    self.set(from_wallet_id, credit(from, effect.amount)?);
                }
                (None, Some(to)) => {
                    self.skip_missing(from_wallet_id);
                    self.set(
                        to_wallet_id,
                        to.checked_sub(effect.amount).ok_or_else(overflow)?,
                    );
                }
                (None, None) => {
                    self.skip_missing(from_wallet_id);
                    self.skip_missing(to_wallet_id);
                }
            },
            movement => {
                let wallet_id = single_wallet(&movement)?;
                match self.balance(wallet_id) {
                    Some(balance) => {
                        let balance = revert(balance, movement.kind(), effect.amount)?;
                        self.set(wallet_id, balance);
                    }
                    None => self.skip_missing(wallet_id),
                }
            }
        }
        Ok(())
    }

    /// Wallets whose balance differs from the one loaded.
    pub fn writes(&self) -> Vec<BalanceWrite> {
        let mut writes: Vec<BalanceWrite> = self
            .wallets
            .iter()
            .filter(|(_, entry)| entry.balance != entry.original)
            .map(|(wallet_id, entry)| BalanceWrite {
                wallet_id: *wallet_id,
                balance: entry.balance,
                expected_version: entry.version,
            })
            .collect();
        // Always lock wallets in id order.
        writes.sort_by_key(|write| write.wallet_id);
        writes
    }

    fn require(&self, wallet_id: Uuid) -> ResultEngine<MoneyCents> {
        self.balance(wallet_id)
            .ok_or_else(|| EngineError::KeyNotFound("wallet not exists".to_string()))
    }

    fn set(&mut self, wallet_id: Uuid, balance: MoneyCents) {
        if let Some(entry) = self.wallets.get_mut(&wallet_id) {
            entry.balance = balance;
        }
    }

    fn skip_missing(&self, wallet_id: Uuid) {
        tracing::warn!(%wallet_id, "wallet no longer exists, skipping revert");
    }
}

fn single_wallet(movement: &Movement) -> ResultEngine<Uuid> {
    movement
        .wallet_id()
        .ok_or_else(|| EngineError::Validation("missing wallet".to_string()))
}

fn with_wallet(err: EngineError, wallet_id: Uuid) -> EngineError {
    match err {
        EngineError::InsufficientFunds(msg) => {
            EngineError::InsufficientFunds(format!("wallet {wallet_id}: {msg}"))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(value: i64) -> MoneyCents {
        MoneyCents::new(value)
    }

    fn sheet(entries: &[(Uuid, i64)]) -> BalanceSheet {
        let mut sheet = BalanceSheet::new();
        for (id, balance) in entries {
            sheet.insert(*id, cents(*balance), 0);
        }
        sheet
    }

    fn expense(wallet_id: Uuid, amount: i64) -> Effect {
        Effect::new(
            Movement::Expense {
                wallet_id,
                category_id: Uuid::new_v4(),
            },
            cents(amount),
        )
    }

    fn income(wallet_id: Uuid, amount: i64) -> Effect {
        Effect::new(
            Movement::Income {
                wallet_id,
                category_id: Uuid::new_v4(),
            },
            cents(amount),
        )
    }

    #[test]
    fn apply_and_revert_are_inverse() {
        for kind in [
            TransactionKind::Income,
            TransactionKind::Expense,
            TransactionKind::InitialBalance,
        ] {
            let start = cents(10_000);
            let applied = apply(start, kind, cents(2_550)).unwrap();
            assert_ne!(applied, start);
            assert_eq!(revert(applied, kind, cents(2_550)).unwrap(), start);
        }
    }

    #[test]
    fn expense_of_whole_balance_leaves_zero() {
        assert_eq!(
            apply(cents(10_000), TransactionKind::Expense, cents(10_000)).unwrap(),
            MoneyCents::ZERO
        );
        assert!(matches!(
            apply(cents(10_000), TransactionKind::Expense, cents(10_001)),
            Err(EngineError::InsufficientFunds(_))
        ));
    }

    #[test]
    fn revert_of_spent_income_goes_negative() {
        assert_eq!(
            revert(cents(100), TransactionKind::Income, cents(300)).unwrap(),
            cents(-200)
        );
    }

    #[test]
    fn transfer_is_all_or_nothing() {
        let (from, to) = (Uuid::new_v4(), Uuid::new_v4());
        let mut sheet = sheet(&[(from, 100), (to, 0)]);
        let transfer = Effect::new(
            Movement::Transfer {
                from_wallet_id: from,
                to_wallet_id: to,
            },
            cents(150),
        );

        let err = sheet.run(&LedgerStep::Apply(transfer)).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds(_)));
        assert_eq!(sheet.balance(from), Some(cents(100)));
        assert_eq!(sheet.balance(to), Some(cents(0)));
        assert!(sheet.writes().is_empty());
    }

    #[test]
    fn funds_are_checked_after_revert() {
        let wallet = Uuid::new_v4();
        let mut sheet = sheet(&[(wallet, 70)]);

        sheet.run(&LedgerStep::Revert(expense(wallet, 30))).unwrap();
        sheet.run(&LedgerStep::Apply(expense(wallet, 100))).unwrap();

        assert_eq!(sheet.balance(wallet), Some(MoneyCents::ZERO));
    }

    #[test]
    fn expense_to_income_swap() {
        let wallet = Uuid::new_v4();
        let mut sheet = sheet(&[(wallet, 7_000)]);

        sheet.run(&LedgerStep::Revert(expense(wallet, 3_000))).unwrap();
        assert_eq!(sheet.balance(wallet), Some(cents(10_000)));
        sheet.run(&LedgerStep::Apply(income(wallet, 3_000))).unwrap();
        assert_eq!(sheet.balance(wallet), Some(cents(13_000)));

        let writes = sheet.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].balance, cents(13_000));
        assert_eq!(writes[0].expected_version, 0);
    }

    #[test]
    fn revert_skips_missing_wallet() {
        let (kept, gone) = (Uuid::new_v4(), Uuid::new_v4());
        let mut sheet = sheet(&[(kept, 0)]);
        let transfer = Effect::new(
            Movement::Transfer {
                from_wallet_id: gone,
                to_wallet_id: kept,
            },
            cents(40),
        );

        sheet.run(&LedgerStep::Revert(transfer)).unwrap();
        assert_eq!(sheet.balance(kept), Some(cents(-40)));

        sheet.run(&LedgerStep::Revert(income(gone, 10))).unwrap();
    }

    #[test]
    fn apply_on_missing_wallet_fails() {
        let mut sheet = BalanceSheet::new();
        let err = sheet
            .run(&LedgerStep::Apply(income(Uuid::new_v4(), 10)))
            .unwrap_err();
        assert_eq!(err, EngineError::KeyNotFound("wallet not exists".to_string()));
    }

    #[test]
    fn unchanged_wallets_are_not_written() {
        let wallet = Uuid::new_v4();
        let mut sheet = sheet(&[(wallet, 500)]);
        sheet.run(&LedgerStep::Revert(income(wallet, 200))).unwrap();
        sheet.run(&LedgerStep::Apply(income(wallet, 200))).unwrap();
        assert!(sheet.writes().is_empty());
    }
}
