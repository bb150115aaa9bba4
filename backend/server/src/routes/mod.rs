//! # HTTP API
//!
//! Every response uses one envelope:
//!
//! ```json
//! { "success": true, "data": { ... } }
//! { "success": false, "message": "Restaurant not found" }
//! ```
//!
//! Bodies are camelCase JSON. A body that does not parse, including one that
//! is missing a required field, is a 400.
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde::Serialize;

use crate::{error::AppError, gate, state::AppState};

pub mod admin;
pub mod auth;
pub mod cart;
pub mod foods;
pub mod orders;
pub mod payments;
pub mod restaurants;
pub mod vendor;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

pub type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data: Some(data),
        message: None,
    })
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok(data))
}

pub fn done(message: impl Into<String>) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        data: None,
        message: Some(message.into()),
    })
}

/// JSON body whose rejections become 400s in the common envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Payload<T>(pub T);

/// Query string with the same rejection handling as [`Payload`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Params<T>(pub T);

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/auth/signup", post(auth::signup_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/logout", post(auth::logout_handler))
        .route("/api/auth/me", get(auth::me_handler).patch(auth::update_profile_handler))
        .route("/api/restaurants", get(restaurants::list_handler))
        .route("/api/restaurants/{id}", get(restaurants::get_handler))
        .route("/api/restaurants/{id}/foods", get(restaurants::foods_handler))
        .route("/api/foods", get(foods::list_handler))
        .route("/api/foods/{id}", get(foods::get_handler))
        .route("/api/search", get(foods::search_handler))
        .route("/api/cart", get(cart::get_handler).delete(cart::clear_handler))
        .route("/api/cart/items", post(cart::add_handler))
        .route(
            "/api/cart/items/{food_id}",
            patch(cart::set_quantity_handler).delete(cart::remove_handler),
        )
        .route("/api/orders", get(orders::list_handler).post(orders::checkout_handler))
        .route("/api/orders/{id}", get(orders::get_handler))
        .route("/api/payments/confirm", post(payments::confirm_handler))
        .route("/api/vendor/restaurants", get(vendor::restaurants_handler))
        .route("/api/vendor/foods", post(vendor::create_food_handler))
        .route(
            "/api/vendor/foods/{id}",
            patch(vendor::update_food_handler).delete(vendor::delete_food_handler),
        )
        .route("/api/admin/users", get(admin::users_handler))
        .route("/api/admin/users/{id}", axum::routing::delete(admin::delete_user_handler))
        .route("/api/admin/users/{id}/role", patch(admin::set_role_handler))
        .route("/api/admin/restaurants", post(admin::create_restaurant_handler))
        .route(
            "/api/admin/restaurants/{id}",
            patch(admin::update_restaurant_handler).delete(admin::delete_restaurant_handler),
        )
        .route("/api/admin/foods", post(admin::create_food_handler))
        .route(
            "/api/admin/foods/{id}",
            patch(admin::update_food_handler).delete(admin::delete_food_handler),
        )
        .route("/api/admin/orders", get(admin::orders_handler))
        .route("/api/admin/orders/{id}/status", patch(admin::set_status_handler))
        .route("/api/admin/stats", get(admin::stats_handler))
        .fallback(fallback_handler)
        .layer(middleware::from_fn_with_state(state.clone(), gate::authorize))
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn fallback_handler() -> impl IntoResponse {
    AppError::NotFound("Route")
}
