use std::sync::Arc;

use anyhow::Context;
use pantry::FoodItem;
use tracing::{info, warn};

use super::{
    auth::TokenSigner,
    config::Config,
    database::{Database, RedisStore},
    gate::{Gate, IdentityResolver, LocalResolver, RemoteResolver},
    notify::{LogNotifier, Notifier, RelayNotifier},
    search::FoodSearch,
};

pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub signer: TokenSigner,
    pub gate: Gate,
    pub search: Option<FoodSearch>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let db = match &config.redis_url {
            Some(redis_url) => Database::new(Arc::new(
                RedisStore::connect(redis_url)
                    .await
                    .context("Failed to connect to Redis")?,
            )),
            None => {
                warn!("REDIS_URL not set, documents live in memory only");
                Database::in_memory()
            }
        };

        let search = match &config.meili_url {
            Some(meili_url) => Some(
                FoodSearch::connect(meili_url, config.meili_key.as_deref())
                    .await
                    .context("Failed to connect to Meilisearch")?,
            ),
            None => None,
        };

        if let Some(search) = &search {
            let foods = db.all::<FoodItem>().await?;
            info!("Re-indexing {} foods", foods.len());
            search.sync(&foods).await;
        }

        let notifier: Arc<dyn Notifier> = match &config.mail_relay_url {
            Some(url) => Arc::new(RelayNotifier::new(url.clone(), config.mail_from.clone())),
            None => Arc::new(LogNotifier),
        };

        Ok(Self::assemble(config, db, search, notifier))
    }

    /// Wires the gate and token signer around already-built collaborators.
    pub fn assemble(
        config: Config,
        db: Database,
        search: Option<FoodSearch>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        let signer = TokenSigner::new(&config.jwt_secret, config.token_ttl_hours);

        let resolver: Arc<dyn IdentityResolver> = match &config.whoami_url {
            Some(url) => {
                info!("Resolving identities through {url}");
                Arc::new(RemoteResolver::new(url.clone()))
            }
            None => Arc::new(LocalResolver::new(signer.clone(), db.clone())),
        };

        Arc::new(Self {
            config,
            db,
            signer,
            gate: Gate::new(resolver),
            search,
            notifier,
        })
    }
}
