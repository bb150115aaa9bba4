use std::sync::Arc;

use axum::extract::{Path, State};
use pantry::{FoodItem, FoodPatch, NewFood, Restaurant};

use super::{ApiResult, Created, Payload, created, done, ok};
use crate::{auth::VendorUser, catalog, state::AppState};

pub async fn restaurants_handler(
    State(state): State<Arc<AppState>>,
    VendorUser(identity): VendorUser,
) -> ApiResult<Vec<Restaurant>> {
    let mut restaurants = state
        .db
        .find(|restaurant: &Restaurant| restaurant.is_owned_by(&identity.id))
        .await?;
    restaurants.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(ok(restaurants))
}

pub async fn create_food_handler(
    State(state): State<Arc<AppState>>,
    VendorUser(identity): VendorUser,
    Payload(draft): Payload<NewFood>,
) -> Created<FoodItem> {
    catalog::owned_restaurant(&state, &identity, &draft.restaurant_id).await?;

    Ok(created(catalog::create_food(&state, draft).await?))
}

pub async fn update_food_handler(
    State(state): State<Arc<AppState>>,
    VendorUser(identity): VendorUser,
    Path(id): Path<String>,
    Payload(changes): Payload<FoodPatch>,
) -> ApiResult<FoodItem> {
    let food = catalog::food(&state, &id).await?;
    catalog::owned_restaurant(&state, &identity, &food.restaurant_id).await?;

    Ok(ok(catalog::update_food(&state, food, changes).await?))
}

pub async fn delete_food_handler(
    State(state): State<Arc<AppState>>,
    VendorUser(identity): VendorUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let food = catalog::food(&state, &id).await?;
    catalog::owned_restaurant(&state, &identity, &food.restaurant_id).await?;

    catalog::delete_food(&state, &food.id).await?;

    Ok(done("Food item deleted"))
}
