//! The module contains the definition of an API user.
//!
//! The username is the owner id handed to the engine.

use sea_orm::{ActiveValue, DatabaseConnection, entity::prelude::*};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub password: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Looks up a user by exact credentials.
pub(crate) async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<Option<Model>, DbErr> {
    Entity::find_by_id(username.to_string())
        .filter(Column::Password.eq(password.to_string()))
        .one(db)
        .await
}

/// Register an API user.
pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<(), DbErr> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(DbErr::Custom(
            "username and password must not be empty".to_string(),
        ));
    }

    ActiveModel {
        username: ActiveValue::Set(username.to_string()),
        password: ActiveValue::Set(password.to_string()),
    }
    .insert(db)
    .await?;
    tracing::info!(%username, "user created");
    Ok(())
}
