//! Categories API endpoints.

use api_types::category::{
    CategoryKind, CategoryList, CategoryListResponse, CategoryNew, CategoryView,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{ServerError, server::ServerState, user};

fn engine_kind(kind: CategoryKind) -> engine::CategoryKind {
    match kind {
        CategoryKind::Income => engine::CategoryKind::Income,
        CategoryKind::Expense => engine::CategoryKind::Expense,
    }
}

fn map_category(category: engine::Category) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name,
        kind: match category.kind {
            engine::CategoryKind::Income => CategoryKind::Income,
            engine::CategoryKind::Expense => CategoryKind::Expense,
        },
        is_default: category.is_default,
    }
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<CategoryList>,
) -> Result<Json<CategoryListResponse>, ServerError> {
    let categories = state
        .engine
        .categories(&user.username, query.kind.map(engine_kind))
        .await?
        .into_iter()
        .map(map_category)
        .collect();

    Ok(Json(CategoryListResponse { categories }))
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryNew>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let category = state
        .engine
        .new_category(&user.username, &payload.name, engine_kind(payload.kind))
        .await?;
    Ok((StatusCode::CREATED, Json(map_category(category))))
}
