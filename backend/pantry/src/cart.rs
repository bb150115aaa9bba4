use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Document, now};

/// Upper bound for a single line, also applied when quantities accumulate.
pub const MAX_QUANTITY: u32 = 99;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub food_id: String,
    pub quantity: u32,
}

/// Keyed by the owning user's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub user_id: String,
    #[serde(default)]
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            items: Vec::new(),
            updated_at: now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn quantity_of(&self, food_id: &str) -> u32 {
        self.items
            .iter()
            .find(|item| item.food_id == food_id)
            .map_or(0, |item| item.quantity)
    }

    /// Adds to an existing line or appends a new one. Returns the new quantity.
    pub fn add(&mut self, food_id: &str, quantity: u32) -> u32 {
        let updated = match self.items.iter_mut().find(|item| item.food_id == food_id) {
            Some(item) => {
                item.quantity = item.quantity.saturating_add(quantity).min(MAX_QUANTITY);
                item.quantity
            }
            None => {
                let quantity = quantity.min(MAX_QUANTITY);
                self.items.push(CartItem {
                    food_id: food_id.to_string(),
                    quantity,
                });
                quantity
            }
        };

        self.updated_at = now();
        updated
    }

    /// Overwrites a line's quantity; zero removes it. Returns false when the
    /// food is not in the cart.
    pub fn set(&mut self, food_id: &str, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(food_id);
        }

        let Some(item) = self.items.iter_mut().find(|item| item.food_id == food_id) else {
            return false;
        };

        item.quantity = quantity.min(MAX_QUANTITY);
        self.updated_at = now();
        true
    }

    pub fn remove(&mut self, food_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.food_id != food_id);

        let removed = self.items.len() != before;
        if removed {
            self.updated_at = now();
        }

        removed
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.updated_at = now();
    }
}

impl Document for Cart {
    const COLLECTION: &'static str = "carts";

    fn id(&self) -> &str {
        &self.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_accumulates_quantity() {
        let mut cart = Cart::empty("u1");
        cart.add("f1", 2);
        assert_eq!(cart.add("f1", 3), 5);
        assert_eq!(cart.items.len(), 1);
    }

    #[test]
    fn add_caps_at_max_quantity() {
        let mut cart = Cart::empty("u1");
        cart.add("f1", 90);
        assert_eq!(cart.add("f1", 50), MAX_QUANTITY);
        assert_eq!(Cart::empty("u2").add("f1", 500), MAX_QUANTITY);
    }

    #[test]
    fn set_zero_removes_line() {
        let mut cart = Cart::empty("u1");
        cart.add("f1", 1);
        cart.add("f2", 1);

        assert!(cart.set("f1", 0));
        assert_eq!(cart.quantity_of("f1"), 0);
        assert_eq!(cart.quantity_of("f2"), 1);
    }

    #[test]
    fn set_unknown_food_is_rejected() {
        let mut cart = Cart::empty("u1");
        assert!(!cart.set("missing", 3));
        assert!(!cart.remove("missing"));
    }

    #[test]
    fn clear_empties_cart() {
        let mut cart = Cart::empty("u1");
        cart.add("f1", 1);
        cart.clear();
        assert!(cart.is_empty());
    }
}
