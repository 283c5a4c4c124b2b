use chrono::{Duration, Utc};
use sea_orm::{Database, DatabaseConnection, EntityTrait};

use engine::{
    CategoryKind, Engine, EngineError, GoalStatus, MoneyCents, NewGoalCmd, NewTransactionCmd,
    NewWalletCmd, Wallet, WalletKind, goals,
};
use migration::MigratorTrait;

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

async fn new_wallet(engine: &Engine, name: &str, opening: i64) -> Wallet {
    engine
        .new_wallet(
            NewWalletCmd::new(USER, name, WalletKind::Bank, Utc::now())
                .opening_balance(MoneyCents::new(opening)),
        )
        .await
        .unwrap()
}

async fn stored_status(db: &DatabaseConnection, goal_id: uuid::Uuid) -> String {
    goals::Entity::find_by_id(goal_id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .status
}

#[tokio::test]
async fn missed_deadline_fails_and_is_persisted() {
    let (engine, db) = engine_with_db().await;
    let wallet = new_wallet(&engine, "Savings", 80_000).await;
    let t0 = Utc::now();

    let created = engine
        .new_goal(NewGoalCmd::new(
            USER,
            wallet.id,
            "Bike",
            MoneyCents::new(100_000),
            t0 + Duration::days(1),
        ))
        .await
        .unwrap();
    assert_eq!(created.progress.status, GoalStatus::InProgress);
    assert_eq!(stored_status(&db, created.goal.id).await, "IN_PROGRESS");

    let view = engine
        .goal_as_of(created.goal.id, USER, t0 + Duration::days(2))
        .await
        .unwrap();

    assert_eq!(view.progress.status, GoalStatus::Fail);
    assert_eq!(view.progress.progress, 80.0);
    assert_eq!(view.progress.days_remaining, -1);
    assert_eq!(view.goal.status, GoalStatus::Fail);
    assert_eq!(view.wallet_balance, MoneyCents::new(80_000));
    assert_eq!(stored_status(&db, created.goal.id).await, "FAIL");
}

#[tokio::test]
async fn reaching_target_succeeds() {
    let (engine, db) = engine_with_db().await;
    let wallet = new_wallet(&engine, "Savings", 50_000).await;
    let income = engine.categories(USER, Some(CategoryKind::Income)).await.unwrap()[0].id;

    let created = engine
        .new_goal(NewGoalCmd::new(
            USER,
            wallet.id,
            "Holiday",
            MoneyCents::new(100_000),
            Utc::now() + Duration::days(30),
        ))
        .await
        .unwrap();
    assert_eq!(created.progress.progress, 50.0);

    engine
        .create_transaction(NewTransactionCmd::income(
            USER,
            wallet.id,
            income,
            MoneyCents::new(60_000),
            Utc::now(),
        ))
        .await
        .unwrap();

    let views = engine.goals(USER).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].progress.status, GoalStatus::Success);
    assert_eq!(views[0].progress.progress, 100.0);
    assert_eq!(stored_status(&db, created.goal.id).await, "SUCCESS");
}

#[tokio::test]
async fn new_goal_validation() {
    let (engine, _db) = engine_with_db().await;
    let wallet = new_wallet(&engine, "Savings", 0).await;
    let tomorrow = Utc::now() + Duration::days(1);

    let err = engine
        .new_goal(NewGoalCmd::new(
            USER,
            wallet.id,
            "Past",
            MoneyCents::new(1_000),
            Utc::now() - Duration::days(1),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .new_goal(NewGoalCmd::new(
            USER,
            wallet.id,
            "Zero",
            MoneyCents::ZERO,
            tomorrow,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .new_goal(NewGoalCmd::new(
            "bob",
            wallet.id,
            "Not mine",
            MoneyCents::new(1_000),
            tomorrow,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn delete_goal_and_wallet_cascade() {
    let (engine, _db) = engine_with_db().await;
    new_wallet(&engine, "Main", 0).await;
    let wallet = new_wallet(&engine, "Savings", 0).await;
    let tomorrow = Utc::now() + Duration::days(1);

    let first = engine
        .new_goal(NewGoalCmd::new(USER, wallet.id, "A", MoneyCents::new(1_000), tomorrow))
        .await
        .unwrap();
    engine
        .new_goal(NewGoalCmd::new(USER, wallet.id, "B", MoneyCents::new(1_000), tomorrow))
        .await
        .unwrap();

    assert!(matches!(
        engine.delete_goal(first.goal.id, "bob").await,
        Err(EngineError::KeyNotFound(_))
    ));
    engine.delete_goal(first.goal.id, USER).await.unwrap();
    assert!(matches!(
        engine.goal(first.goal.id, USER).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert_eq!(engine.goals(USER).await.unwrap().len(), 1);

    engine.delete_wallet(wallet.id, USER).await.unwrap();
    assert!(engine.goals(USER).await.unwrap().is_empty());
}
