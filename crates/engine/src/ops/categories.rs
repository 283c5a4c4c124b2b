use sea_orm::{
    ActiveValue, Condition, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Category, CategoryKind, EngineError, ResultEngine, categories,
    util::{normalize_category_key, normalize_required_name},
};

use super::{Engine, with_tx};

/// Shared defaults (no owner) or the owner's own categories.
fn visible_to(user_id: &str) -> Condition {
    Condition::any()
        .add(categories::Column::OwnerId.is_null())
        .add(categories::Column::OwnerId.eq(user_id.to_string()))
}

/// Resolves `category_id` for a transaction of category kind `kind`.
///
/// Unknown ids and other owners' categories are `KeyNotFound`; a category
/// of the other kind is a `Validation` error.
pub(super) async fn category_for<C>(
    db: &C,
    user_id: &str,
    category_id: Uuid,
    kind: CategoryKind,
) -> ResultEngine<Category>
where
    C: ConnectionTrait,
{
    let model = categories::Entity::find_by_id(category_id)
        .filter(visible_to(user_id))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))?;
    let category = Category::try_from(model)?;
    if category.kind != kind {
        return Err(EngineError::Validation(format!(
            "category '{}' is an {} category, expected {}",
            category.name,
            category.kind.as_str(),
            kind.as_str()
        )));
    }
    Ok(category)
}

impl Engine {
    /// Default categories plus the owner's custom ones, optionally restricted
    /// to one kind. Defaults come first, then by name.
    pub async fn categories(
        &self,
        user_id: &str,
        kind: Option<CategoryKind>,
    ) -> ResultEngine<Vec<Category>> {
        let mut query = categories::Entity::find().filter(visible_to(user_id));
        if let Some(kind) = kind {
            query = query.filter(categories::Column::Kind.eq(kind.as_str()));
        }
        query
            .order_by_desc(categories::Column::IsDefault)
            .order_by_asc(categories::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Category::try_from)
            .collect()
    }

    /// Check that a category can be used by a transaction of `kind`.
    pub async fn category_for(
        &self,
        user_id: &str,
        category_id: Uuid,
        kind: CategoryKind,
    ) -> ResultEngine<Category> {
        category_for(&self.database, user_id, category_id, kind).await
    }

    /// Create a custom category.
    ///
    /// The normalized name must be free among the owner's categories and the
    /// defaults of the same kind.
    pub async fn new_category(
        &self,
        user_id: &str,
        name: &str,
        kind: CategoryKind,
    ) -> ResultEngine<Category> {
        let name = normalize_required_name(name, "category")?;
        let name_norm = normalize_category_key(&name)?;

        with_tx!(self, |db_tx| {
            let clash = categories::Entity::find()
                .filter(visible_to(user_id))
                .filter(categories::Column::Kind.eq(kind.as_str()))
                .filter(categories::Column::NameNorm.eq(name_norm.clone()))
                .one(&db_tx)
                .await?;
            if let Some(existing) = clash {
                return Err(EngineError::ExistingKey(existing.name));
            }

            let category = Category {
                id: Uuid::new_v4(),
                owner_id: Some(user_id.to_string()),
                name,
                kind,
                is_default: false,
            };
            categories::ActiveModel {
                id: ActiveValue::Set(category.id),
                owner_id: ActiveValue::Set(category.owner_id.clone()),
                name: ActiveValue::Set(category.name.clone()),
                name_norm: ActiveValue::Set(name_norm),
                kind: ActiveValue::Set(kind.as_str().to_string()),
                is_default: ActiveValue::Set(false),
            }
            .insert(&db_tx)
            .await?;

            tracing::info!(category_id = %category.id, %user_id, "category created");
            Ok(category)
        })
    }
}
