//! Seeds the shared default categories.

use sea_orm::{ConnectionTrait, DbBackend, Statement, Value};
use sea_orm_migration::{SchemaManagerConnection, prelude::*};
use uuid::Uuid;

#[derive(DeriveMigrationName)]
pub struct Migration;

const INCOME: &[&str] = &["Salary", "Freelance", "Investments", "Gifts", "Other income"];

const EXPENSE: &[&str] = &[
    "Food",
    "Transport",
    "Housing",
    "Utilities",
    "Health",
    "Entertainment",
    "Shopping",
    "Education",
    "Other expense",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let backend = db.get_database_backend();

        for (kind, names) in [("income", INCOME), ("expense", EXPENSE)] {
            for name in names {
                insert_default(db, backend, name, kind).await?;
            }
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute(Statement::from_string(
            db.get_database_backend(),
            "DELETE FROM categories WHERE is_default = 1;",
        ))
        .await?;
        Ok(())
    }
}

async fn insert_default(
    db: &SchemaManagerConnection<'_>,
    backend: DbBackend,
    name: &str,
    kind: &str,
) -> Result<(), DbErr> {
    let values = vec![
        Uuid::new_v4().as_bytes().to_vec().into(),
        Value::String(None),
        name.to_string().into(),
        name.to_lowercase().into(),
        kind.to_string().into(),
        Value::Bool(Some(true)),
    ];
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO categories (id, owner_id, name, name_norm, kind, is_default) \
         VALUES (?, ?, ?, ?, ?, ?);",
        values,
    ))
    .await?;
    Ok(())
}
