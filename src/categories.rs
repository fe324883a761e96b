use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{Category, PostCard};
use crate::pagination::{Page, PageQuery};
use crate::visibility::PostQuery;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CategoryPage {
    pub category: Category,
    pub page: Page<PostCard>,
}

pub async fn category_posts(
    State(state): State<AppState>,
    Path(category_slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CategoryPage>> {
    let category = state
        .store
        .category_by_slug(&category_slug)?
        .filter(|category| category.is_published)
        .ok_or(Error::NotFound)?;
    tracing::debug!("category_posts: {}", category);

    let request = query.request(state.settings.page_size)?;
    let posts = PostQuery::public(Utc::now()).in_category(category.id);
    let page = state.store.list_posts(&posts, request)?;
    Ok(Json(CategoryPage { category, page }))
}
