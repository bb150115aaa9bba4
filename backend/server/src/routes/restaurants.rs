use std::sync::Arc;

use axum::extract::{Path, State};
use pantry::{FoodItem, Restaurant};

use super::{ApiResult, ok};
use crate::{catalog, state::AppState};

pub async fn list_handler(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Restaurant>> {
    let mut restaurants = state.db.all::<Restaurant>().await?;
    restaurants.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(ok(restaurants))
}

pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Restaurant> {
    Ok(ok(catalog::restaurant(&state, &id).await?))
}

pub async fn foods_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Vec<FoodItem>> {
    let restaurant = catalog::restaurant(&state, &id).await?;

    Ok(ok(catalog::foods_of(&state, &restaurant.id).await?))
}
