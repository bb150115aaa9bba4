use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Document, new_id, now, patch};

pub const DEFAULT_CATEGORY: &str = "general";

/// Highest accepted menu price, $1,000,000.00.
pub const MAX_PRICE_CENTS: u64 = 100_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    pub id: String,
    pub restaurant_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: u64,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_available")]
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_available() -> bool {
    true
}

impl FoodItem {
    pub fn new(draft: NewFood) -> Self {
        let timestamp = now();
        let category = draft
            .category
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(default_category);

        Self {
            id: new_id(),
            restaurant_id: draft.restaurant_id,
            name: draft.name.trim().to_string(),
            description: draft.description,
            price_cents: draft.price_cents,
            category,
            image_url: draft.image_url,
            available: draft.available.unwrap_or(true),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Moving a food to another restaurant is not supported through a patch.
    pub fn apply(&mut self, changes: FoodPatch) -> bool {
        let mut changed = false;
        changed |= patch(&mut self.name, changes.name.map(|n| n.trim().to_string()));
        changed |= patch(&mut self.description, changes.description);
        changed |= patch(&mut self.price_cents, changes.price_cents);
        changed |= patch(
            &mut self.category,
            changes.category.map(|c| c.trim().to_lowercase()),
        );
        changed |= patch(&mut self.image_url, changes.image_url.map(Some));
        changed |= patch(&mut self.available, changes.available);

        if changed {
            self.updated_at = now();
        }

        changed
    }
}

impl Document for FoodItem {
    const COLLECTION: &'static str = "foods";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFood {
    pub restaurant_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: u64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub available: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<u64>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub available: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_category_falls_back_to_general() {
        let draft: NewFood = serde_json::from_str(
            r#"{ "restaurantId": "r1", "name": "Gyoza", "priceCents": 650, "category": "  " }"#,
        )
        .unwrap();

        let food = FoodItem::new(draft);
        assert_eq!(food.category, DEFAULT_CATEGORY);
        assert!(food.available);
    }

    #[test]
    fn price_is_required() {
        let result = serde_json::from_str::<NewFood>(r#"{ "restaurantId": "r1", "name": "Gyoza" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn patch_lowercases_category() {
        let draft: NewFood =
            serde_json::from_str(r#"{ "restaurantId": "r1", "name": "Gyoza", "priceCents": 650 }"#)
                .unwrap();
        let mut food = FoodItem::new(draft);

        food.apply(FoodPatch {
            category: Some("Starters".into()),
            available: Some(false),
            ..FoodPatch::default()
        });

        assert_eq!(food.category, "starters");
        assert!(!food.available);
    }
}
