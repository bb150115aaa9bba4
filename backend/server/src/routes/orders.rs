use std::sync::Arc;

use axum::extract::{Path, State};
use pantry::{Order, OrderLine, Restaurant, User};
use serde::Deserialize;
use tracing::info;

use super::{ApiResult, Created, Payload, created, ok};
use crate::{
    auth::AuthUser,
    catalog,
    error::AppError,
    lifecycle,
    routes::cart,
    state::AppState,
    utils::{optional, required},
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    delivery_address: String,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

/// Freezes the cart into an order at today's prices and empties the cart.
pub async fn checkout_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Payload(request): Payload<CheckoutRequest>,
) -> Created<Order> {
    let delivery_address = required("deliveryAddress", &request.delivery_address)?;

    let mut basket = cart::load(&state, &identity.id).await?;
    if basket.is_empty() {
        return Err(AppError::invalid("Cart is empty"));
    }

    let mut lines = Vec::with_capacity(basket.items.len());
    for item in &basket.items {
        let food = state
            .db
            .get::<pantry::FoodItem>(&item.food_id)
            .await?
            .filter(|food| food.available)
            .ok_or_else(|| AppError::invalid("An item in your cart is no longer available"))?;

        let restaurant: Restaurant = catalog::restaurant(&state, &food.restaurant_id).await?;
        if !restaurant.is_open {
            return Err(AppError::invalid(format!("{} is closed", restaurant.name)));
        }

        lines.push(OrderLine {
            food_id: food.id,
            restaurant_id: food.restaurant_id,
            name: food.name,
            price_cents: food.price_cents,
            quantity: item.quantity,
        });
    }

    let phone = match optional(request.phone) {
        Some(phone) => Some(phone),
        None => state
            .db
            .get::<User>(&identity.id)
            .await?
            .and_then(|user| user.phone),
    };

    let order = Order::place(
        &identity.id,
        lines,
        delivery_address,
        phone,
        optional(request.notes),
    )?;
    state.db.save(&order).await?;

    basket.clear();
    state.db.save(&basket).await?;

    info!("Order {} placed by {} for {} cents", order.id, identity.id, order.total_cents);

    lifecycle::notify_customer(&state, &order).await;

    Ok(created(order))
}

pub async fn list_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> ApiResult<Vec<Order>> {
    let mut orders = state
        .db
        .find(|order: &Order| order.user_id == identity.id)
        .await?;
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(ok(orders))
}

/// Someone else's order reads as missing rather than forbidden.
pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Order> {
    let order = lifecycle::order(&state, &id).await?;

    if order.user_id != identity.id && !identity.is_admin() {
        return Err(AppError::NotFound("Order"));
    }

    Ok(ok(order))
}
