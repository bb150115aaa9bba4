use std::{collections::BTreeMap, sync::Arc};

use axum::extract::{Path, State};
use pantry::{
    Cart, FoodItem, FoodPatch, NewFood, NewRestaurant, Order, OrderStatus, PaymentStatus,
    PublicUser, Restaurant, RestaurantPatch, Role, User,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiResult, Created, Params, Payload, created, done, ok};
use crate::{
    auth::AdminUser,
    catalog,
    database::EMAIL_INDEX,
    error::AppError,
    lifecycle,
    state::AppState,
    utils::optional,
};

#[derive(Deserialize)]
pub struct RoleRequest {
    role: Role,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    status: OrderStatus,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Deserialize)]
pub struct OrderFilter {
    status: Option<OrderStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    users: usize,
    restaurants: usize,
    foods: usize,
    orders: usize,
    orders_by_status: BTreeMap<&'static str, usize>,
    paid_orders: usize,
    revenue_cents: u64,
}

async fn user(state: &AppState, id: &str) -> Result<User, AppError> {
    state
        .db
        .get::<User>(id)
        .await?
        .ok_or(AppError::NotFound("User"))
}

pub async fn users_handler(
    State(state): State<Arc<AppState>>,
    _: AdminUser,
) -> ApiResult<Vec<PublicUser>> {
    let mut users = state.db.all::<User>().await?;
    users.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    Ok(ok(users.iter().map(PublicUser::from).collect()))
}

pub async fn set_role_handler(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Payload(request): Payload<RoleRequest>,
) -> ApiResult<PublicUser> {
    if id == admin.id && request.role != Role::Admin {
        return Err(AppError::Conflict("Admins cannot demote themselves".to_string()));
    }

    let mut user = user(&state, &id).await?;

    if user.role != request.role {
        info!("{} changed role of {} from {} to {}", admin.id, user.id, user.role, request.role);

        user.role = request.role;
        user.updated_at = pantry::now();
        state.db.save(&user).await?;
    }

    Ok(ok(PublicUser::from(&user)))
}

/// Removes the account, its cart and its email claim. Orders stay for the books.
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    if id == admin.id {
        return Err(AppError::Conflict("Admins cannot delete themselves".to_string()));
    }

    let user = user(&state, &id).await?;

    state.db.remove::<User>(&user.id).await?;
    state.db.remove::<Cart>(&user.id).await?;
    state.db.release(EMAIL_INDEX, &user.email).await?;

    info!("{} deleted user {}", admin.id, user.id);

    Ok(done("User deleted"))
}

pub async fn create_restaurant_handler(
    State(state): State<Arc<AppState>>,
    _: AdminUser,
    Payload(draft): Payload<NewRestaurant>,
) -> Created<Restaurant> {
    Ok(created(catalog::create_restaurant(&state, draft).await?))
}

pub async fn update_restaurant_handler(
    State(state): State<Arc<AppState>>,
    _: AdminUser,
    Path(id): Path<String>,
    Payload(changes): Payload<RestaurantPatch>,
) -> ApiResult<Restaurant> {
    Ok(ok(catalog::update_restaurant(&state, &id, changes).await?))
}

pub async fn delete_restaurant_handler(
    State(state): State<Arc<AppState>>,
    _: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let removed = catalog::delete_restaurant(&state, &id).await?;

    Ok(done(format!("Restaurant deleted along with {removed} food items")))
}

pub async fn create_food_handler(
    State(state): State<Arc<AppState>>,
    _: AdminUser,
    Payload(draft): Payload<NewFood>,
) -> Created<FoodItem> {
    Ok(created(catalog::create_food(&state, draft).await?))
}

pub async fn update_food_handler(
    State(state): State<Arc<AppState>>,
    _: AdminUser,
    Path(id): Path<String>,
    Payload(changes): Payload<FoodPatch>,
) -> ApiResult<FoodItem> {
    let food = catalog::food(&state, &id).await?;

    Ok(ok(catalog::update_food(&state, food, changes).await?))
}

pub async fn delete_food_handler(
    State(state): State<Arc<AppState>>,
    _: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    catalog::delete_food(&state, &id).await?;

    Ok(done("Food item deleted"))
}

pub async fn orders_handler(
    State(state): State<Arc<AppState>>,
    _: AdminUser,
    Params(filter): Params<OrderFilter>,
) -> ApiResult<Vec<Order>> {
    let mut orders = state
        .db
        .find(|order: &Order| filter.status.is_none_or(|status| order.status == status))
        .await?;
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(ok(orders))
}

pub async fn set_status_handler(
    State(state): State<Arc<AppState>>,
    _: AdminUser,
    Path(id): Path<String>,
    Payload(request): Payload<StatusRequest>,
) -> ApiResult<Order> {
    let order = lifecycle::advance(&state, &id, request.status, optional(request.note)).await?;

    Ok(ok(order))
}

pub async fn stats_handler(State(state): State<Arc<AppState>>, _: AdminUser) -> ApiResult<Stats> {
    let orders = state.db.all::<Order>().await?;

    let mut orders_by_status: BTreeMap<&'static str, usize> = OrderStatus::ALL
        .iter()
        .map(|status| (status.as_str(), 0))
        .collect();
    for order in &orders {
        *orders_by_status.entry(order.status.as_str()).or_default() += 1;
    }

    let paid: Vec<&Order> = orders
        .iter()
        .filter(|order| order.payment_status == PaymentStatus::Paid)
        .collect();

    Ok(ok(Stats {
        users: state.db.all::<User>().await?.len(),
        restaurants: state.db.all::<Restaurant>().await?.len(),
        foods: state.db.all::<FoodItem>().await?.len(),
        orders: orders.len(),
        orders_by_status,
        paid_orders: paid.len(),
        revenue_cents: paid
            .iter()
            .fold(0u64, |total, order| total.saturating_add(order.total_cents)),
    }))
}
