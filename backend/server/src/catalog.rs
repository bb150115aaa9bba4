//! Restaurant and food writes shared by the admin and vendor routes.
use pantry::{
    FoodItem, FoodPatch, MAX_PRICE_CENTS, NewFood, NewRestaurant, Restaurant, RestaurantPatch,
    User,
};
use tracing::info;

use crate::{auth::Identity, error::AppError, state::AppState, utils::required};

pub async fn restaurant(state: &AppState, id: &str) -> Result<Restaurant, AppError> {
    state
        .db
        .get::<Restaurant>(id)
        .await?
        .ok_or(AppError::NotFound("Restaurant"))
}

pub async fn food(state: &AppState, id: &str) -> Result<FoodItem, AppError> {
    state
        .db
        .get::<FoodItem>(id)
        .await?
        .ok_or(AppError::NotFound("Food item"))
}

pub async fn foods_of(state: &AppState, restaurant_id: &str) -> Result<Vec<FoodItem>, AppError> {
    let mut foods = state
        .db
        .find(|food: &FoodItem| food.restaurant_id == restaurant_id)
        .await?;
    foods.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));

    Ok(foods)
}

/// Vendors may only touch their own restaurants, admins touch everything.
pub async fn owned_restaurant(
    state: &AppState,
    identity: &Identity,
    id: &str,
) -> Result<Restaurant, AppError> {
    let restaurant = restaurant(state, id).await?;

    if !identity.is_admin() && !restaurant.is_owned_by(&identity.id) {
        return Err(AppError::Forbidden);
    }

    Ok(restaurant)
}

async fn check_owner(state: &AppState, owner_id: Option<&str>) -> Result<(), AppError> {
    let Some(owner_id) = owner_id else {
        return Ok(());
    };

    if state.db.get::<User>(owner_id).await?.is_none() {
        return Err(AppError::invalid("Owner does not exist"));
    }

    Ok(())
}

pub async fn create_restaurant(
    state: &AppState,
    mut draft: NewRestaurant,
) -> Result<Restaurant, AppError> {
    draft.name = required("name", &draft.name)?;
    check_owner(state, draft.owner_id.as_deref()).await?;

    let restaurant = Restaurant::new(draft);
    state.db.save(&restaurant).await?;

    info!("Created restaurant {} ({})", restaurant.name, restaurant.id);

    Ok(restaurant)
}

pub async fn update_restaurant(
    state: &AppState,
    id: &str,
    mut changes: RestaurantPatch,
) -> Result<Restaurant, AppError> {
    let mut restaurant = restaurant(state, id).await?;

    if let Some(name) = &changes.name {
        changes.name = Some(required("name", name)?);
    }
    check_owner(state, changes.owner_id.as_deref()).await?;

    if restaurant.apply(changes) {
        state.db.save(&restaurant).await?;
    }

    Ok(restaurant)
}

/// Deletes the restaurant and every food item pointing at it. Returns how
/// many food items went with it.
pub async fn delete_restaurant(state: &AppState, id: &str) -> Result<usize, AppError> {
    let restaurant = restaurant(state, id).await?;
    let foods = foods_of(state, &restaurant.id).await?;

    let mut removed = Vec::with_capacity(foods.len());
    for food in foods {
        state.db.remove::<FoodItem>(&food.id).await?;
        removed.push(food.id);
    }

    state.db.remove::<Restaurant>(&restaurant.id).await?;

    if let Some(search) = &state.search {
        search.forget(&removed).await;
    }

    info!(
        "Deleted restaurant {} and {} food items",
        restaurant.id,
        removed.len()
    );

    Ok(removed.len())
}

fn check_price(price_cents: u64) -> Result<(), AppError> {
    if price_cents > MAX_PRICE_CENTS {
        return Err(AppError::invalid(format!(
            "priceCents must be at most {MAX_PRICE_CENTS}"
        )));
    }

    Ok(())
}

pub async fn create_food(state: &AppState, mut draft: NewFood) -> Result<FoodItem, AppError> {
    draft.name = required("name", &draft.name)?;
    check_price(draft.price_cents)?;
    draft.restaurant_id = required("restaurantId", &draft.restaurant_id)?;

    restaurant(state, &draft.restaurant_id).await?;

    let food = FoodItem::new(draft);
    state.db.save(&food).await?;

    if let Some(search) = &state.search {
        search.sync(std::slice::from_ref(&food)).await;
    }

    Ok(food)
}

pub async fn update_food(
    state: &AppState,
    mut food: FoodItem,
    mut changes: FoodPatch,
) -> Result<FoodItem, AppError> {
    if let Some(name) = &changes.name {
        changes.name = Some(required("name", name)?);
    }
    if let Some(price_cents) = changes.price_cents {
        check_price(price_cents)?;
    }

    if food.apply(changes) {
        state.db.save(&food).await?;

        if let Some(search) = &state.search {
            search.sync(std::slice::from_ref(&food)).await;
        }
    }

    Ok(food)
}

pub async fn delete_food(state: &AppState, id: &str) -> Result<(), AppError> {
    if !state.db.remove::<FoodItem>(id).await? {
        return Err(AppError::NotFound("Food item"));
    }

    if let Some(search) = &state.search {
        search.forget(&[id.to_string()]).await;
    }

    Ok(())
}
