use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{
    ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, sea_query::Expr,
};

use engine::{
    CategoryKind, Engine, EngineError, MoneyCents, NewTransactionCmd, NewWalletCmd,
    TransactionKind, TransactionListFilter, UpdateTransactionCmd, Wallet, WalletKind, wallets,
};
use migration::MigratorTrait;
use uuid::Uuid;

const USER: &str = "alice";

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

fn cents(value: i64) -> MoneyCents {
    MoneyCents::new(value)
}

async fn new_wallet(engine: &Engine, name: &str, opening: i64) -> Wallet {
    engine
        .new_wallet(
            NewWalletCmd::new(USER, name, WalletKind::Cash, at(2026, 1, 1))
                .opening_balance(cents(opening)),
        )
        .await
        .unwrap()
}

async fn category(engine: &Engine, kind: CategoryKind) -> Uuid {
    engine.categories(USER, Some(kind)).await.unwrap()[0].id
}

async fn balance(engine: &Engine, wallet_id: Uuid) -> i64 {
    engine.wallet(wallet_id, USER).await.unwrap().balance.cents()
}

#[tokio::test]
async fn income_then_oversized_expense_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let wallet = new_wallet(&engine, "Cash", 10_000).await;
    let income = category(&engine, CategoryKind::Income).await;
    let expense = category(&engine, CategoryKind::Expense).await;

    engine
        .create_transaction(NewTransactionCmd::income(
            USER,
            wallet.id,
            income,
            cents(5_000),
            at(2026, 2, 1),
        ))
        .await
        .unwrap();
    assert_eq!(balance(&engine, wallet.id).await, 15_000);

    let err = engine
        .create_transaction(NewTransactionCmd::expense(
            USER,
            wallet.id,
            expense,
            cents(20_000),
            at(2026, 2, 2),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));
    assert_eq!(balance(&engine, wallet.id).await, 15_000);

    let (items, _) = engine
        .list_transactions(USER, &TransactionListFilter::default(), 10, None)
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn transfer_and_its_deletion() {
    let (engine, _db) = engine_with_db().await;
    let a = new_wallet(&engine, "A", 10_000).await;
    let b = new_wallet(&engine, "B", 0).await;

    let transfer = engine
        .create_transaction(NewTransactionCmd::transfer(
            USER,
            a.id,
            b.id,
            cents(4_000),
            at(2026, 2, 1),
        ))
        .await
        .unwrap();
    assert_eq!(balance(&engine, a.id).await, 6_000);
    assert_eq!(balance(&engine, b.id).await, 4_000);

    engine.delete_transaction(transfer.id, USER).await.unwrap();
    assert_eq!(balance(&engine, a.id).await, 10_000);
    assert_eq!(balance(&engine, b.id).await, 0);
    assert!(matches!(
        engine.transaction(transfer.id, USER).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn expense_updated_to_income_reverts_then_applies() {
    let (engine, _db) = engine_with_db().await;
    let wallet = new_wallet(&engine, "Cash", 10_000).await;
    let expense = category(&engine, CategoryKind::Expense).await;
    let income = category(&engine, CategoryKind::Income).await;

    let tx = engine
        .create_transaction(NewTransactionCmd::expense(
            USER,
            wallet.id,
            expense,
            cents(3_000),
            at(2026, 2, 1),
        ))
        .await
        .unwrap();
    assert_eq!(balance(&engine, wallet.id).await, 7_000);

    let updated = engine
        .update_transaction(
            UpdateTransactionCmd::new(tx.id, USER)
                .kind(TransactionKind::Income)
                .category_id(income),
        )
        .await
        .unwrap();

    assert_eq!(updated.kind(), TransactionKind::Income);
    assert_eq!(updated.amount, cents(3_000));
    assert_eq!(balance(&engine, wallet.id).await, 13_000);
}

#[tokio::test]
async fn kind_switch_keeping_old_category_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let wallet = new_wallet(&engine, "Cash", 10_000).await;
    let expense = category(&engine, CategoryKind::Expense).await;

    let tx = engine
        .create_transaction(NewTransactionCmd::expense(
            USER,
            wallet.id,
            expense,
            cents(3_000),
            at(2026, 2, 1),
        ))
        .await
        .unwrap();

    let err = engine
        .update_transaction(UpdateTransactionCmd::new(tx.id, USER).kind(TransactionKind::Income))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(balance(&engine, wallet.id).await, 7_000);
    assert_eq!(
        engine.transaction(tx.id, USER).await.unwrap().kind(),
        TransactionKind::Expense
    );
}

#[tokio::test]
async fn expense_boundary() {
    let (engine, _db) = engine_with_db().await;
    let expense = category(&engine, CategoryKind::Expense).await;

    let exact = new_wallet(&engine, "Exact", 10_000).await;
    engine
        .create_transaction(NewTransactionCmd::expense(
            USER,
            exact.id,
            expense,
            cents(10_000),
            at(2026, 2, 1),
        ))
        .await
        .unwrap();
    assert_eq!(balance(&engine, exact.id).await, 0);

    let short = new_wallet(&engine, "Short", 10_000).await;
    let err = engine
        .create_transaction(NewTransactionCmd::expense(
            USER,
            short.id,
            expense,
            cents(10_001),
            at(2026, 2, 1),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));
    assert_eq!(balance(&engine, short.id).await, 10_000);
}

#[tokio::test]
async fn create_then_delete_restores_balances() {
    let (engine, _db) = engine_with_db().await;
    let a = new_wallet(&engine, "A", 12_345).await;
    let b = new_wallet(&engine, "B", 678).await;
    let income = category(&engine, CategoryKind::Income).await;
    let expense = category(&engine, CategoryKind::Expense).await;

    let cmds = vec![
        NewTransactionCmd::income(USER, a.id, income, cents(1_001), at(2026, 2, 1)),
        NewTransactionCmd::expense(USER, a.id, expense, cents(12_345), at(2026, 2, 1)),
        NewTransactionCmd::transfer(USER, b.id, a.id, cents(678), at(2026, 2, 1)),
        NewTransactionCmd::initial_balance(USER, b.id, cents(1), at(2026, 2, 1)),
    ];

    for cmd in cmds {
        let tx = engine.create_transaction(cmd).await.unwrap();
        engine.delete_transaction(tx.id, USER).await.unwrap();
        assert_eq!(balance(&engine, a.id).await, 12_345);
        assert_eq!(balance(&engine, b.id).await, 678);
    }
}

#[tokio::test]
async fn failed_update_leaves_wallet_and_record_unchanged() {
    let (engine, _db) = engine_with_db().await;
    let wallet = new_wallet(&engine, "Cash", 10_000).await;
    let expense = category(&engine, CategoryKind::Expense).await;

    let tx = engine
        .create_transaction(
            NewTransactionCmd::expense(USER, wallet.id, expense, cents(3_000), at(2026, 2, 1))
                .description("groceries"),
        )
        .await
        .unwrap();

    let err = engine
        .update_transaction(UpdateTransactionCmd::new(tx.id, USER).amount(cents(10_001)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    assert_eq!(balance(&engine, wallet.id).await, 7_000);
    let stored = engine.transaction(tx.id, USER).await.unwrap();
    assert_eq!(stored.amount, cents(3_000));
    assert_eq!(stored.movement, tx.movement);
    assert_eq!(stored.description.as_deref(), Some("groceries"));
}

#[tokio::test]
async fn update_checks_funds_after_revert() {
    let (engine, _db) = engine_with_db().await;
    let wallet = new_wallet(&engine, "Cash", 10_000).await;
    let expense = category(&engine, CategoryKind::Expense).await;

    let tx = engine
        .create_transaction(NewTransactionCmd::expense(
            USER,
            wallet.id,
            expense,
            cents(3_000),
            at(2026, 2, 1),
        ))
        .await
        .unwrap();

    engine
        .update_transaction(
            UpdateTransactionCmd::new(tx.id, USER)
                .amount(cents(10_000))
                .description("rent"),
        )
        .await
        .unwrap();

    assert_eq!(balance(&engine, wallet.id).await, 0);
    let stored = engine.transaction(tx.id, USER).await.unwrap();
    assert_eq!(stored.description.as_deref(), Some("rent"));
    assert_eq!(stored.occurred_at, tx.occurred_at);
}

#[tokio::test]
async fn update_moves_effect_between_wallets() {
    let (engine, _db) = engine_with_db().await;
    let a = new_wallet(&engine, "A", 5_000).await;
    let b = new_wallet(&engine, "B", 5_000).await;
    let c = new_wallet(&engine, "C", 0).await;
    let income = category(&engine, CategoryKind::Income).await;

    let tx = engine
        .create_transaction(NewTransactionCmd::income(
            USER,
            a.id,
            income,
            cents(1_000),
            at(2026, 2, 1),
        ))
        .await
        .unwrap();

    engine
        .update_transaction(
            UpdateTransactionCmd::new(tx.id, USER)
                .kind(TransactionKind::Transfer)
                .from_wallet_id(b.id)
                .to_wallet_id(c.id),
        )
        .await
        .unwrap();

    assert_eq!(balance(&engine, a.id).await, 5_000);
    assert_eq!(balance(&engine, b.id).await, 4_000);
    assert_eq!(balance(&engine, c.id).await, 1_000);

    let stored = engine.transaction(tx.id, USER).await.unwrap();
    assert_eq!(stored.movement.category_id(), None);
    assert_eq!(stored.movement.wallet_id(), None);
}

#[tokio::test]
async fn transfer_validation() {
    let (engine, _db) = engine_with_db().await;
    let a = new_wallet(&engine, "A", 1_000).await;
    let b = new_wallet(&engine, "B", 0).await;

    let err = engine
        .create_transaction(NewTransactionCmd::transfer(
            USER,
            a.id,
            a.id,
            cents(100),
            at(2026, 2, 1),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_transaction(NewTransactionCmd::transfer(
            USER,
            a.id,
            b.id,
            cents(1_001),
            at(2026, 2, 1),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));
    assert_eq!(balance(&engine, a.id).await, 1_000);
    assert_eq!(balance(&engine, b.id).await, 0);
}

#[tokio::test]
async fn create_rejects_bad_references() {
    let (engine, _db) = engine_with_db().await;
    let wallet = new_wallet(&engine, "Cash", 1_000).await;
    let income = category(&engine, CategoryKind::Income).await;
    let expense = category(&engine, CategoryKind::Expense).await;

    let err = engine
        .create_transaction(NewTransactionCmd::income(
            USER,
            wallet.id,
            expense,
            cents(100),
            at(2026, 2, 1),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_transaction(NewTransactionCmd::income(
            USER,
            wallet.id,
            Uuid::new_v4(),
            cents(100),
            at(2026, 2, 1),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("category not exists".to_string()));

    let err = engine
        .create_transaction(NewTransactionCmd::income(
            "mallory",
            wallet.id,
            income,
            cents(100),
            at(2026, 2, 1),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("wallet not exists".to_string()));

    let err = engine
        .create_transaction(NewTransactionCmd::income(
            USER,
            wallet.id,
            income,
            MoneyCents::ZERO,
            at(2026, 2, 1),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Validation("amount must be > 0".to_string()));

    assert_eq!(balance(&engine, wallet.id).await, 1_000);
}

#[tokio::test]
async fn other_owner_cannot_touch_transaction() {
    let (engine, _db) = engine_with_db().await;
    let wallet = new_wallet(&engine, "Cash", 1_000).await;
    let income = category(&engine, CategoryKind::Income).await;
    let tx = engine
        .create_transaction(NewTransactionCmd::income(
            USER,
            wallet.id,
            income,
            cents(100),
            at(2026, 2, 1),
        ))
        .await
        .unwrap();

    assert!(matches!(
        engine.transaction(tx.id, "mallory").await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        engine.delete_transaction(tx.id, "mallory").await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert_eq!(balance(&engine, wallet.id).await, 1_100);
}

#[tokio::test]
async fn reverting_spent_income_goes_negative() {
    let (engine, _db) = engine_with_db().await;
    let wallet = new_wallet(&engine, "Cash", 0).await;
    let income = category(&engine, CategoryKind::Income).await;
    let expense = category(&engine, CategoryKind::Expense).await;

    let salary = engine
        .create_transaction(NewTransactionCmd::income(
            USER,
            wallet.id,
            income,
            cents(3_000),
            at(2026, 2, 1),
        ))
        .await
        .unwrap();
    engine
        .create_transaction(NewTransactionCmd::expense(
            USER,
            wallet.id,
            expense,
            cents(2_000),
            at(2026, 2, 2),
        ))
        .await
        .unwrap();

    engine.delete_transaction(salary.id, USER).await.unwrap();
    assert_eq!(balance(&engine, wallet.id).await, -2_000);
}

#[tokio::test]
async fn deleting_transfer_after_wallet_removal_reverts_remaining_side() {
    let (engine, _db) = engine_with_db().await;
    let a = new_wallet(&engine, "A", 5_000).await;
    let b = new_wallet(&engine, "B", 0).await;

    let transfer = engine
        .create_transaction(NewTransactionCmd::transfer(
            USER,
            a.id,
            b.id,
            cents(5_000),
            at(2026, 2, 1),
        ))
        .await
        .unwrap();
    engine.delete_wallet(a.id, USER).await.unwrap();

    engine.delete_transaction(transfer.id, USER).await.unwrap();
    assert_eq!(balance(&engine, b.id).await, 0);
}

#[tokio::test]
async fn recompute_is_a_no_op_after_operations() {
    let (engine, db) = engine_with_db().await;
    let a = new_wallet(&engine, "A", 10_000).await;
    let b = new_wallet(&engine, "B", 2_500).await;
    let income = category(&engine, CategoryKind::Income).await;
    let expense = category(&engine, CategoryKind::Expense).await;

    let tx = engine
        .create_transaction(NewTransactionCmd::expense(
            USER,
            a.id,
            expense,
            cents(1_250),
            at(2026, 2, 3),
        ))
        .await
        .unwrap();
    engine
        .create_transaction(NewTransactionCmd::transfer(
            USER,
            b.id,
            a.id,
            cents(500),
            at(2026, 2, 4),
        ))
        .await
        .unwrap();
    engine
        .update_transaction(
            UpdateTransactionCmd::new(tx.id, USER)
                .kind(TransactionKind::Income)
                .category_id(income)
                .wallet_id(b.id),
        )
        .await
        .unwrap();

    assert!(engine.recompute_balances(USER).await.unwrap().is_empty());

    wallets::Entity::update_many()
        .col_expr(wallets::Column::Balance, Expr::value(1_i64))
        .filter(wallets::Column::Id.eq(a.id))
        .exec(&db)
        .await
        .unwrap();

    let corrected = engine.recompute_balances(USER).await.unwrap();
    assert_eq!(corrected.len(), 1);
    assert_eq!(corrected[0].id, a.id);
    assert_eq!(balance(&engine, a.id).await, 10_500);
    assert_eq!(balance(&engine, b.id).await, 3_250);
}

#[tokio::test]
async fn list_pages_newest_first_with_filters() {
    let (engine, _db) = engine_with_db().await;
    let a = new_wallet(&engine, "A", 0).await;
    let b = new_wallet(&engine, "B", 0).await;
    let income = category(&engine, CategoryKind::Income).await;

    for day in 1..=4 {
        engine
            .create_transaction(NewTransactionCmd::income(
                USER,
                a.id,
                income,
                cents(1_000),
                at(2026, 3, day),
            ))
            .await
            .unwrap();
    }
    engine
        .create_transaction(NewTransactionCmd::transfer(
            USER,
            a.id,
            b.id,
            cents(500),
            at(2026, 3, 5),
        ))
        .await
        .unwrap();

    let filter = TransactionListFilter {
        from: Some(at(2026, 3, 1) - chrono::Duration::hours(1)),
        ..TransactionListFilter::default()
    };
    let (first, cursor) = engine.list_transactions(USER, &filter, 2, None).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].kind(), TransactionKind::Transfer);
    assert_eq!(first[1].occurred_at, at(2026, 3, 4));

    let (second, cursor) = engine
        .list_transactions(USER, &filter, 2, cursor.as_deref())
        .await
        .unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(second[1].occurred_at, at(2026, 3, 2));

    let (third, cursor) = engine
        .list_transactions(USER, &filter, 2, cursor.as_deref())
        .await
        .unwrap();
    assert_eq!(third.len(), 1);
    assert!(cursor.is_none());

    let by_wallet = TransactionListFilter {
        wallet_id: Some(b.id),
        ..TransactionListFilter::default()
    };
    let (items, _) = engine
        .list_transactions(USER, &by_wallet, 10, None)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind(), TransactionKind::Transfer);

    let opening_only = TransactionListFilter {
        kinds: Some(vec![TransactionKind::InitialBalance]),
        ..TransactionListFilter::default()
    };
    let (items, _) = engine
        .list_transactions(USER, &opening_only, 10, None)
        .await
        .unwrap();
    assert!(items.is_empty());

    assert!(matches!(
        engine
            .list_transactions(USER, &TransactionListFilter::default(), 10, Some("???"))
            .await,
        Err(EngineError::Validation(_))
    ));
}

/// SQLite pools hold a single connection, so spawned writers queue on it and
/// commit one after another. Stale versions are covered in `ops::ledger`.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn queued_writers_keep_the_ledger_consistent() {
    let (engine, _db) = engine_with_db().await;
    let engine = Arc::new(engine);
    let wallet = new_wallet(&engine, "Cash", 1_000).await;
    let income = category(&engine, CategoryKind::Income).await;
    let expense = category(&engine, CategoryKind::Expense).await;

    let wallet_id = wallet.id;
    let mut handles = Vec::new();
    for i in 0..20 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let cmd = if i % 2 == 0 {
                NewTransactionCmd::income(USER, wallet_id, income, cents(100), at(2026, 2, 1))
            } else {
                NewTransactionCmd::expense(USER, wallet_id, expense, cents(100), at(2026, 2, 1))
            };
            engine.create_transaction(cmd).await
        }));
    }
    // 1000 covers all ten expenses in any order.
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let (items, _) = engine
        .list_transactions(USER, &TransactionListFilter::default(), 100, None)
        .await
        .unwrap();
    assert_eq!(items.len(), 21);
    assert_eq!(balance(&engine, wallet.id).await, 1_000);
    let stored = engine.wallet(wallet.id, USER).await.unwrap();
    assert_eq!(stored.version, 21);
    assert!(engine.recompute_balances(USER).await.unwrap().is_empty());
}
