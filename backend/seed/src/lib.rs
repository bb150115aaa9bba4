//! # Seeding
//!
//! Loads restaurants and their menus into the store and bootstraps admin
//! accounts, so no credentials ever live in the code.
//!
//! ## Matching
//!
//! - Restaurants match on their sanitized name, re-running never duplicates
//! - Foods match on their sanitized name within the restaurant; a match gets
//!   its price, description, category and image refreshed
//! - Nothing is ever deleted
//! - Foods priced above [`MAX_PRICE_CENTS`] are skipped with a warning
//!
//! ## Search
//!
//! Created and refreshed foods are pushed to Meilisearch when `MEILI_URL` is
//! set. Without it the index catches up the next time the server starts.
//!
//! ## Admins
//!
//! - Unknown email: a new admin account is created
//! - Known email: the account is promoted to admin, its password is untouched
use std::collections::HashMap;

use anyhow::{Context, bail};
use indicatif::{ProgressBar, ProgressStyle};
use pantry::{
    FoodItem, FoodPatch, MAX_PRICE_CENTS, NewFood, NewRestaurant, Restaurant, Role, User,
};
use server::{
    auth::hash_password,
    database::{Database, EMAIL_INDEX},
    search::FoodSearch,
    utils::{check_password, normalize_email, sanitize},
};
use tracing::{info, warn};

pub mod models;

use models::{SeedFile, SeedRestaurant};

pub struct Admin {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOutcome {
    Created,
    Promoted,
    Unchanged,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub new_restaurants: usize,
    pub new_foods: usize,
    pub updated_foods: usize,
    /// Ids of created or refreshed foods, the ones search has to hear about.
    pub changed: Vec<String>,
}

pub async fn load_seed(
    db: &Database,
    search: Option<&FoodSearch>,
    source: &str,
    admin: Option<Admin>,
) -> anyhow::Result<()> {
    let seed = read_source(source).await?;

    println!("Loaded Restaurants: {}", seed.restaurants.len());
    println!(
        "Loaded Foods: {}\n",
        seed.restaurants.iter().map(|r| r.foods.len()).sum::<usize>()
    );

    let progress = ProgressBar::new(seed.restaurants.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> "),
    );

    let summary = apply(db, seed, &progress).await?;
    progress.finish_with_message("Done");

    if summary == Summary::default() {
        println!("No new restaurants or foods found.");
    } else {
        println!("New Restaurants: {}", summary.new_restaurants);
        println!("New Foods: {}", summary.new_foods);
        println!("Updated Foods: {}", summary.updated_foods);
    }

    if let Some(search) = search {
        reindex(db, search, &summary.changed).await?;
    }

    if let Some(admin) = admin {
        let email = admin.email.clone();
        let outcome = ensure_admin(db, admin).await?;
        println!("Admin {email}: {outcome:?}");
    }

    Ok(())
}

pub async fn read_source(source: &str) -> anyhow::Result<SeedFile> {
    let raw = if source.starts_with("http://") || source.starts_with("https://") {
        reqwest::get(source)
            .await?
            .error_for_status()?
            .text()
            .await?
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read {source}"))?
    };

    serde_json::from_str(&raw).context("Seed file is not valid JSON")
}

pub async fn reindex(db: &Database, search: &FoodSearch, ids: &[String]) -> anyhow::Result<()> {
    let mut foods = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(food) = db.get::<FoodItem>(id).await? {
            foods.push(food);
        }
    }

    info!("Indexing {} foods", foods.len());
    search.sync(&foods).await;

    Ok(())
}

pub async fn apply(
    db: &Database,
    seed: SeedFile,
    progress: &ProgressBar,
) -> anyhow::Result<Summary> {
    let mut summary = Summary::default();

    let mut restaurants: HashMap<String, Restaurant> = db
        .all::<Restaurant>()
        .await?
        .into_iter()
        .map(|restaurant| (sanitize(&restaurant.name), restaurant))
        .collect();

    for entry in seed.restaurants {
        let key = sanitize(&entry.name);
        if key.is_empty() {
            progress.inc(1);
            continue;
        }

        progress.set_message(format!("Seeding {}", entry.name));

        let restaurant = match restaurants.get(&key) {
            Some(existing) => existing.clone(),
            None => {
                let created = Restaurant::new(new_restaurant(&entry));
                db.save(&created).await?;
                info!("New restaurant! {}", created.name);

                summary.new_restaurants += 1;
                restaurants.insert(key, created.clone());
                created
            }
        };

        seed_foods(db, &restaurant, entry, &mut summary).await?;

        progress.inc(1);
    }

    Ok(summary)
}

fn new_restaurant(entry: &SeedRestaurant) -> NewRestaurant {
    NewRestaurant {
        name: entry.name.clone(),
        description: entry.description.clone(),
        address: entry.address.clone(),
        cuisine: entry.cuisine.clone(),
        image_url: entry.image_url.clone(),
        owner_id: None,
        is_open: None,
    }
}

async fn seed_foods(
    db: &Database,
    restaurant: &Restaurant,
    entry: SeedRestaurant,
    summary: &mut Summary,
) -> anyhow::Result<()> {
    let mut menu: HashMap<String, FoodItem> = db
        .find(|food: &FoodItem| food.restaurant_id == restaurant.id)
        .await?
        .into_iter()
        .map(|food| (sanitize(&food.name), food))
        .collect();

    for seed_food in entry.foods {
        let key = sanitize(&seed_food.name);
        if key.is_empty() {
            continue;
        }

        if seed_food.price_cents > MAX_PRICE_CENTS {
            warn!(
                "Skipping {} at {}: price {} is above {MAX_PRICE_CENTS}",
                seed_food.name, restaurant.name, seed_food.price_cents
            );
            continue;
        }

        match menu.get_mut(&key) {
            Some(existing) => {
                let changed = existing.apply(FoodPatch {
                    description: Some(seed_food.description),
                    price_cents: Some(seed_food.price_cents),
                    category: seed_food.category,
                    image_url: seed_food.image_url,
                    ..FoodPatch::default()
                });

                if changed {
                    db.save(&*existing).await?;
                    summary.updated_foods += 1;
                    summary.changed.push(existing.id.clone());
                }
            }
            None => {
                let food = FoodItem::new(NewFood {
                    restaurant_id: restaurant.id.clone(),
                    name: seed_food.name,
                    description: seed_food.description,
                    price_cents: seed_food.price_cents,
                    category: seed_food.category,
                    image_url: seed_food.image_url,
                    available: None,
                });
                db.save(&food).await?;

                summary.new_foods += 1;
                summary.changed.push(food.id.clone());
                menu.insert(key, food);
            }
        }
    }

    Ok(())
}

pub async fn ensure_admin(db: &Database, admin: Admin) -> anyhow::Result<AdminOutcome> {
    let email = normalize_email(&admin.email)?;

    if let Some(user_id) = db.lookup(EMAIL_INDEX, &email).await? {
        let Some(mut user) = db.get::<User>(&user_id).await? else {
            bail!("Email {email} is claimed by missing user {user_id}");
        };

        if user.role == Role::Admin {
            return Ok(AdminOutcome::Unchanged);
        }

        user.role = Role::Admin;
        user.updated_at = pantry::now();
        db.save(&user).await?;

        return Ok(AdminOutcome::Promoted);
    }

    check_password(&admin.password)?;

    let mut user = User::new(admin.name, email, hash_password(admin.password).await?);
    user.role = Role::Admin;

    if !db.claim(EMAIL_INDEX, &user.email, &user.id).await? {
        bail!("Email {} was claimed concurrently", user.email);
    }

    if let Err(e) = db.save(&user).await {
        if let Err(release) = db.release(EMAIL_INDEX, &user.email).await {
            warn!("Failed to release email claim for {}: {release}", user.email);
        }
        return Err(e.into());
    }

    Ok(AdminOutcome::Created)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use server::database::{MemoryStore, Store, StoreError};

    use super::*;

    fn seed() -> SeedFile {
        serde_json::from_str(
            r#"{
                "restaurants": [
                    {
                        "name": "Noodle Bar",
                        "cuisine": "ramen",
                        "foods": [
                            { "name": "Shoyu Ramen", "priceCents": 1400, "category": "Ramen" },
                            { "name": "Gyoza", "priceCents": 650 }
                        ]
                    },
                    { "name": "   ", "foods": [] }
                ]
            }"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn apply_creates_restaurants_and_foods() {
        let db = Database::in_memory();
        let summary = apply(&db, seed(), &ProgressBar::hidden()).await.unwrap();

        assert_eq!(summary.new_restaurants, 1);
        assert_eq!(summary.new_foods, 2);
        assert_eq!(summary.updated_foods, 0);
        assert_eq!(summary.changed.len(), 2);

        let foods = db.all::<FoodItem>().await.unwrap();
        assert!(foods.iter().any(|food| food.category == "ramen"));
    }

    #[tokio::test]
    async fn apply_twice_does_not_duplicate() {
        let db = Database::in_memory();
        apply(&db, seed(), &ProgressBar::hidden()).await.unwrap();
        let second = apply(&db, seed(), &ProgressBar::hidden()).await.unwrap();

        assert_eq!(second.new_restaurants, 0);
        assert_eq!(second.new_foods, 0);
        assert!(second.changed.is_empty());
        assert_eq!(db.all::<Restaurant>().await.unwrap().len(), 1);
        assert_eq!(db.all::<FoodItem>().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn apply_refreshes_prices() {
        let db = Database::in_memory();
        apply(&db, seed(), &ProgressBar::hidden()).await.unwrap();

        let mut changed = seed();
        changed.restaurants[0].foods[1].price_cents = 700;
        let summary = apply(&db, changed, &ProgressBar::hidden()).await.unwrap();

        assert_eq!(summary.updated_foods, 1);
        let gyoza = db
            .find(|food: &FoodItem| food.name == "Gyoza")
            .await
            .unwrap()
            .remove(0);
        assert_eq!(gyoza.price_cents, 700);
        assert_eq!(summary.changed, vec![gyoza.id]);
    }

    fn admin(password: &str) -> Admin {
        Admin {
            name: "Root".into(),
            email: "Root@Example.com".into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn ensure_admin_creates_then_is_idempotent() {
        let db = Database::in_memory();

        assert_eq!(ensure_admin(&db, admin("correct horse")).await.unwrap(), AdminOutcome::Created);
        assert_eq!(ensure_admin(&db, admin("correct horse")).await.unwrap(), AdminOutcome::Unchanged);

        let users = db.all::<User>().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "root@example.com");
        assert_eq!(users[0].role, Role::Admin);
    }

    #[tokio::test]
    async fn ensure_admin_promotes_existing_user() {
        let db = Database::in_memory();
        let user = User::new("Root".into(), "root@example.com".into(), "hash".into());
        db.claim(EMAIL_INDEX, &user.email, &user.id).await.unwrap();
        db.save(&user).await.unwrap();

        assert_eq!(ensure_admin(&db, admin("whatever")).await.unwrap(), AdminOutcome::Promoted);
        assert_eq!(db.get::<User>(&user.id).await.unwrap().unwrap().role, Role::Admin);
    }

    #[tokio::test]
    async fn ensure_admin_rejects_weak_password() {
        let db = Database::in_memory();
        assert!(ensure_admin(&db, admin("short")).await.is_err());
    }

    #[tokio::test]
    async fn apply_skips_prices_above_the_cap() {
        let db = Database::in_memory();
        let mut pricey = seed();
        pricey.restaurants[0].foods[0].price_cents = u64::MAX;

        let summary = apply(&db, pricey, &ProgressBar::hidden()).await.unwrap();

        assert_eq!(summary.new_foods, 1);
        assert!(
            db.find(|food: &FoodItem| food.name == "Shoyu Ramen")
                .await
                .unwrap()
                .is_empty()
        );
    }

    /// Memory store whose document writes always fail.
    #[derive(Default)]
    struct RejectingWrites(MemoryStore);

    #[async_trait]
    impl Store for RejectingWrites {
        async fn get(&self, collection: &str, id: &str) -> Result<Option<String>, StoreError> {
            self.0.get(collection, id).await
        }

        async fn put(&self, _: &str, _: &str, _: String) -> Result<(), StoreError> {
            Err(serde_json::from_str::<()>("disk full").unwrap_err().into())
        }

        async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
            self.0.delete(collection, id).await
        }

        async fn entries(&self, collection: &str) -> Result<Vec<(String, String)>, StoreError> {
            self.0.entries(collection).await
        }

        async fn claim(&self, index: &str, key: &str, id: &str) -> Result<bool, StoreError> {
            self.0.claim(index, key, id).await
        }

        async fn lookup(&self, index: &str, key: &str) -> Result<Option<String>, StoreError> {
            self.0.lookup(index, key).await
        }

        async fn release(&self, index: &str, key: &str) -> Result<(), StoreError> {
            self.0.release(index, key).await
        }
    }

    #[tokio::test]
    async fn failed_admin_save_releases_the_email() {
        let db = Database::new(Arc::new(RejectingWrites::default()));

        assert!(ensure_admin(&db, admin("correct horse")).await.is_err());
        assert_eq!(db.lookup(EMAIL_INDEX, "root@example.com").await.unwrap(), None);
    }
}
