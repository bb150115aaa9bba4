//! # Meilisearch
//!
//! Optional search engine for the storefront's food search box.
//!
//! ## Schema
//! - One index, `foods`, holding the same JSON as the `foods` collection
//! - Searchable: name, description, category
//! - Filterable: restaurantId, category, available
//!
//! ## Sync
//! Catalog writes push the changed document right away. The store stays the
//! source of truth: indexing failures are logged and the request succeeds.
//! On startup every food is re-indexed so a fresh Meilisearch catches up.
//!
//! ## Fallback
//! Without `MEILI_URL`, or when a query fails, [`fallback_search`] scans the
//! collection and matches the sanitized query against sanitized fields.
use std::sync::Arc;

use meilisearch_sdk::{
    client::Client,
    errors::Error,
    settings::{MinWordSizeForTypos, Settings, TypoToleranceSettings},
};
use pantry::FoodItem;
use tracing::{info, warn};

use crate::utils::sanitize;

pub const FOOD_INDEX: &str = "foods";
pub const FOOD_ID: &str = "id";
pub const FOOD_NAME: &str = "name";
pub const FOOD_DESCRIPTION: &str = "description";
pub const FOOD_CATEGORY: &str = "category";
pub const FOOD_RESTAURANT: &str = "restaurantId";
pub const FOOD_AVAILABLE: &str = "available";
pub const FOOD_PRICE: &str = "priceCents";

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 50;

#[derive(Clone)]
pub struct FoodSearch {
    client: Arc<Client>,
}

impl FoodSearch {
    pub async fn connect(meili_url: &str, meili_key: Option<&str>) -> Result<Self, Error> {
        let client = Arc::new(Client::new(meili_url, meili_key)?);

        client
            .index(FOOD_INDEX)
            .set_settings(&init_settings())
            .await?;

        info!("Connected to Meilisearch");

        Ok(Self { client })
    }

    pub async fn upsert(&self, foods: &[FoodItem]) -> Result<(), Error> {
        if foods.is_empty() {
            return Ok(());
        }

        self.client
            .index(FOOD_INDEX)
            .add_or_update(foods, Some(FOOD_ID))
            .await?;

        Ok(())
    }

    pub async fn remove(&self, ids: &[String]) -> Result<(), Error> {
        if ids.is_empty() {
            return Ok(());
        }

        self.client.index(FOOD_INDEX).delete_documents(ids).await?;

        Ok(())
    }

    pub async fn query(
        &self,
        text: &str,
        restaurant_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<FoodItem>, Error> {
        let filter = build_filter(restaurant_id);
        let index = self.client.index(FOOD_INDEX);

        let mut query = index.search();
        query.with_query(text).with_filter(&filter).with_limit(limit);

        let results = query.execute::<FoodItem>().await?;

        Ok(results.hits.into_iter().map(|hit| hit.result).collect())
    }

    /// Logs instead of failing, catalog writes must not depend on search.
    pub async fn sync(&self, foods: &[FoodItem]) {
        if let Err(e) = self.upsert(foods).await {
            warn!("Failed to index {} foods: {e}", foods.len());
        }
    }

    pub async fn forget(&self, ids: &[String]) {
        if let Err(e) = self.remove(ids).await {
            warn!("Failed to drop {} foods from the index: {e}", ids.len());
        }
    }
}

fn build_filter(restaurant_id: Option<&str>) -> String {
    let mut filter = format!("{FOOD_AVAILABLE} = true");

    if let Some(id) = restaurant_id {
        let id: String = id.chars().filter(|c| *c != '"' && *c != '\\').collect();
        filter.push_str(&format!(" AND {FOOD_RESTAURANT} = \"{id}\""));
    }

    filter
}

pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Substring match on sanitized text, alphabetical, available foods only.
pub fn fallback_search(
    foods: Vec<FoodItem>,
    text: &str,
    restaurant_id: Option<&str>,
    limit: usize,
) -> Vec<FoodItem> {
    let needle = sanitize(text);

    let mut hits: Vec<FoodItem> = foods
        .into_iter()
        .filter(|food| food.available)
        .filter(|food| restaurant_id.is_none_or(|id| food.restaurant_id == id))
        .filter(|food| {
            needle.is_empty()
                || [&food.name, &food.description, &food.category]
                    .iter()
                    .any(|field| sanitize(field).contains(&needle))
        })
        .collect();

    hits.sort_by(|a, b| a.name.cmp(&b.name));
    hits.truncate(limit);
    hits
}

fn init_settings() -> Settings {
    Settings::new()
        .with_ranking_rules([
            "words",
            "typo",
            "proximity",
            "attribute",
            "sort",
            "exactness",
        ])
        .with_searchable_attributes([FOOD_NAME, FOOD_CATEGORY, FOOD_DESCRIPTION])
        .with_filterable_attributes([FOOD_RESTAURANT, FOOD_CATEGORY, FOOD_AVAILABLE])
        .with_sortable_attributes([FOOD_PRICE])
        .with_typo_tolerance(TypoToleranceSettings {
            enabled: Some(true),
            disable_on_attributes: None,
            disable_on_words: None,
            min_word_size_for_typos: Some(MinWordSizeForTypos {
                one_typo: Some(5),
                two_typos: Some(9),
            }),
        })
}
