//! # Pantry
//!
//! Documents shared between the server and the seed tool.
//!
//! ## Collections
//!
//! - `users`: accounts, unique by lower-cased email
//! - `restaurants`: storefronts, optionally owned by a vendor
//! - `foods`: menu items, each pointing at a restaurant
//! - `carts`: one per user, keyed by the user id
//! - `orders`: placed orders with their status history
//!
//! Every document is stored as camelCase JSON. Money is always integer cents.
//!
//! ## Order Lifecycle
//!
//! ```text
//! status:         pending → confirmed → preparing → ready → delivered
//! paymentStatus:  pending → paid
//! ```
//!
//! Status only moves forward. Payment only moves to paid through the payment
//! confirmation endpoint, which also confirms a pending order.
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

pub mod cart;
pub mod food;
pub mod order;
pub mod restaurant;
pub mod user;

pub use cart::{Cart, CartItem, MAX_QUANTITY};
pub use food::{FoodItem, FoodPatch, MAX_PRICE_CENTS, NewFood};
pub use order::{HistoryEntry, LifecycleError, Order, OrderLine, OrderStatus, PaymentStatus};
pub use restaurant::{NewRestaurant, Restaurant, RestaurantPatch};
pub use user::{PublicUser, Role, User};

/// A record that lives in a named collection and is addressed by a string id.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Replaces `target` when a patch carries a value.
pub(crate) fn patch<T>(target: &mut T, value: Option<T>) -> bool {
    match value {
        Some(value) => {
            *target = value;
            true
        }
        None => false,
    }
}
