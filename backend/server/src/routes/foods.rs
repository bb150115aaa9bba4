use std::sync::Arc;

use axum::extract::{Path, State};
use pantry::FoodItem;
use serde::Deserialize;
use tracing::warn;

use super::{ApiResult, Params, ok};
use crate::{
    catalog,
    search::{clamp_limit, fallback_search},
    state::AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodFilter {
    restaurant_id: Option<String>,
    category: Option<String>,
    #[serde(default)]
    include_unavailable: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
    restaurant_id: Option<String>,
    limit: Option<usize>,
}

pub async fn list_handler(
    State(state): State<Arc<AppState>>,
    Params(filter): Params<FoodFilter>,
) -> ApiResult<Vec<FoodItem>> {
    let category = filter.category.map(|c| c.trim().to_lowercase());

    let mut foods = state
        .db
        .find(|food: &FoodItem| {
            (filter.include_unavailable || food.available)
                && filter
                    .restaurant_id
                    .as_deref()
                    .is_none_or(|id| food.restaurant_id == id)
                && category.as_deref().is_none_or(|c| food.category == c)
        })
        .await?;
    foods.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(ok(foods))
}

pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<FoodItem> {
    Ok(ok(catalog::food(&state, &id).await?))
}

pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Params(query): Params<SearchQuery>,
) -> ApiResult<Vec<FoodItem>> {
    let limit = clamp_limit(query.limit);
    let restaurant_id = query.restaurant_id.as_deref();

    if let Some(search) = &state.search {
        match search.query(&query.q, restaurant_id, limit).await {
            Ok(hits) => return Ok(ok(hits)),
            Err(e) => warn!("Meilisearch query failed, scanning store instead: {e}"),
        }
    }

    let foods = state.db.all::<FoodItem>().await?;

    Ok(ok(fallback_search(foods, &query.q, restaurant_id, limit)))
}
