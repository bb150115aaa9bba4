use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Document, new_id, now, patch};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub cuisine: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default = "default_open")]
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_open() -> bool {
    true
}

impl Restaurant {
    pub fn new(draft: NewRestaurant) -> Self {
        let timestamp = now();

        Self {
            id: new_id(),
            name: draft.name.trim().to_string(),
            description: draft.description,
            address: draft.address,
            cuisine: draft.cuisine,
            image_url: draft.image_url,
            owner_id: draft.owner_id,
            is_open: draft.is_open.unwrap_or(true),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns whether anything changed.
    pub fn apply(&mut self, changes: RestaurantPatch) -> bool {
        let mut changed = false;
        changed |= patch(&mut self.name, changes.name.map(|n| n.trim().to_string()));
        changed |= patch(&mut self.description, changes.description);
        changed |= patch(&mut self.address, changes.address);
        changed |= patch(&mut self.cuisine, changes.cuisine);
        changed |= patch(&mut self.image_url, changes.image_url.map(Some));
        changed |= patch(&mut self.owner_id, changes.owner_id.map(Some));
        changed |= patch(&mut self.is_open, changes.is_open);

        if changed {
            self.updated_at = now();
        }

        changed
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id.as_deref() == Some(user_id)
    }
}

impl Document for Restaurant {
    const COLLECTION: &'static str = "restaurants";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRestaurant {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub cuisine: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub is_open: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub cuisine: Option<String>,
    pub image_url: Option<String>,
    pub owner_id: Option<String>,
    pub is_open: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NewRestaurant {
        serde_json::from_str(r#"{ "name": "  Noodle Bar ", "cuisine": "ramen" }"#).unwrap()
    }

    #[test]
    fn new_restaurant_is_open_and_trimmed() {
        let restaurant = Restaurant::new(draft());
        assert_eq!(restaurant.name, "Noodle Bar");
        assert!(restaurant.is_open);
        assert!(restaurant.owner_id.is_none());
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let mut restaurant = Restaurant::new(draft());
        let before = restaurant.updated_at;
        assert!(!restaurant.apply(RestaurantPatch::default()));
        assert_eq!(restaurant.updated_at, before);
    }

    #[test]
    fn patch_sets_owner() {
        let mut restaurant = Restaurant::new(draft());
        let changed = restaurant.apply(RestaurantPatch {
            owner_id: Some("vendor-1".into()),
            is_open: Some(false),
            ..RestaurantPatch::default()
        });
        assert!(changed);
        assert!(restaurant.is_owned_by("vendor-1"));
        assert!(!restaurant.is_open);
    }
}
