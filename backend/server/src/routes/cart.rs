use std::sync::Arc;

use axum::extract::{Path, State};
use pantry::{Cart, FoodItem};
use serde::{Deserialize, Serialize};

use super::{ApiResult, Payload, ok};
use crate::{auth::AuthUser, catalog, error::AppError, state::AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    food_id: String,
    #[serde(default = "one")]
    quantity: u32,
}

fn one() -> u32 {
    1
}

#[derive(Deserialize)]
pub struct QuantityRequest {
    quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    food_id: String,
    restaurant_id: String,
    name: String,
    price_cents: u64,
    quantity: u32,
    available: bool,
    line_total_cents: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    items: Vec<CartLine>,
    total_cents: u64,
}

pub async fn load(state: &AppState, user_id: &str) -> Result<Cart, AppError> {
    Ok(state
        .db
        .get::<Cart>(user_id)
        .await?
        .unwrap_or_else(|| Cart::empty(user_id)))
}

/// Prices come from the current menu. Foods deleted since they were added are
/// left out of the view.
async fn view(state: &AppState, cart: &Cart) -> Result<CartView, AppError> {
    let mut items = Vec::with_capacity(cart.items.len());

    for item in &cart.items {
        let Some(food) = state.db.get::<FoodItem>(&item.food_id).await? else {
            continue;
        };

        items.push(CartLine {
            line_total_cents: food.price_cents.saturating_mul(u64::from(item.quantity)),
            food_id: food.id,
            restaurant_id: food.restaurant_id,
            name: food.name,
            price_cents: food.price_cents,
            quantity: item.quantity,
            available: food.available,
        });
    }

    let total_cents = items
        .iter()
        .filter(|line| line.available)
        .fold(0u64, |total, line| total.saturating_add(line.line_total_cents));

    Ok(CartView { items, total_cents })
}

pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> ApiResult<CartView> {
    let cart = load(&state, &identity.id).await?;

    Ok(ok(view(&state, &cart).await?))
}

pub async fn add_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Payload(request): Payload<AddItemRequest>,
) -> ApiResult<CartView> {
    if request.quantity == 0 {
        return Err(AppError::invalid("quantity must be at least 1"));
    }

    let food = catalog::food(&state, &request.food_id).await?;
    if !food.available {
        return Err(AppError::invalid(format!("{} is not available", food.name)));
    }

    let mut cart = load(&state, &identity.id).await?;
    cart.add(&food.id, request.quantity);
    state.db.save(&cart).await?;

    Ok(ok(view(&state, &cart).await?))
}

pub async fn set_quantity_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path(food_id): Path<String>,
    Payload(request): Payload<QuantityRequest>,
) -> ApiResult<CartView> {
    let mut cart = load(&state, &identity.id).await?;

    if !cart.set(&food_id, request.quantity) {
        return Err(AppError::NotFound("Cart item"));
    }
    state.db.save(&cart).await?;

    Ok(ok(view(&state, &cart).await?))
}

pub async fn remove_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path(food_id): Path<String>,
) -> ApiResult<CartView> {
    let mut cart = load(&state, &identity.id).await?;

    if !cart.remove(&food_id) {
        return Err(AppError::NotFound("Cart item"));
    }
    state.db.save(&cart).await?;

    Ok(ok(view(&state, &cart).await?))
}

pub async fn clear_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> ApiResult<CartView> {
    let mut cart = load(&state, &identity.id).await?;
    cart.clear();
    state.db.save(&cart).await?;

    Ok(ok(view(&state, &cart).await?))
}
