use std::sync::Arc;

use clap::Parser;
use seed::{Admin, load_seed};
use server::{
    config::read_secret,
    database::{Database, RedisStore},
    search::FoodSearch,
};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path or http(s) URL of the seed JSON
    source: String,

    #[arg(long, env = "REDIS_URL")]
    redis_url: String,

    /// Push seeded foods to this Meilisearch instance
    #[arg(long, env = "MEILI_URL")]
    meili_url: Option<String>,

    #[arg(long, requires = "admin_password")]
    admin_email: Option<String>,

    #[arg(long, requires = "admin_email")]
    admin_password: Option<String>,

    #[arg(long, default_value = "Administrator")]
    admin_name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();

    let db = Database::new(Arc::new(RedisStore::connect(&args.redis_url).await?));

    let search = match &args.meili_url {
        Some(meili_url) => {
            let meili_key = read_secret("MEILI_ADMIN_KEY").ok();
            Some(FoodSearch::connect(meili_url, meili_key.as_deref()).await?)
        }
        None => None,
    };

    let admin = args
        .admin_email
        .zip(args.admin_password)
        .map(|(email, password)| Admin {
            name: args.admin_name,
            email,
            password,
        });

    load_seed(&db, search.as_ref(), &args.source, admin).await
}
