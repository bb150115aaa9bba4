//! Backend of a food-ordering storefront: menus, carts, checkout, order
//! tracking and an admin back-office.
//!
//!
//!
//! # Request Path
//! - Every request goes through the route gate first ([`gate`])
//! - The gate classifies the path, resolves the session token into an identity
//!   when the path needs one, and either lets the request through or answers
//!   with 401/403 (API) or a redirect (pages)
//! - Handlers re-check the identity with extractors ([`auth::AuthUser`],
//!   [`auth::VendorUser`], [`auth::AdminUser`])
//! - Handlers read and write documents in the store ([`database`])
//!
//!
//!
//! # Orders
//! - Checkout freezes the cart into an order at current prices
//! - The payment provider calls `POST /api/payments/confirm` with the shared
//!   webhook secret, which marks the order paid and confirmed
//! - Admins move orders forward through preparing, ready and delivered
//! - Each change appends to the order history and emails the customer; a
//!   failed email is logged and ignored ([`lifecycle`])
//!
//!
//!
//! # Storage
//! - Redis when `REDIS_URL` is set, otherwise an in-memory store
//! - Meilisearch for food search when `MEILI_URL` is set, otherwise a scan of
//!   the foods collection
//!
//!
//!
//! # Setup
//!
//! Run with an in-memory store.
//! ```sh
//! JWT_SECRET=dev WEBHOOK_SECRET=dev RUST_LOG=info cargo run -p feast
//! ```
//!
//! Load a menu and an admin account into Redis.
//! ```sh
//! REDIS_URL=redis://localhost:6379 cargo run -p seed -- menu.json \
//!     --admin-email admin@example.com --admin-password 'change me please'
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod gate;
pub mod lifecycle;
pub mod notify;
pub mod routes;
pub mod search;
pub mod state;
pub mod utils;

use config::Config;
use state::AppState;

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config).await?;

    info!("Starting server...");
    let app = app(state.clone())?;

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

/// Full application: routes, gate, CORS and request tracing.
pub fn app(state: Arc<AppState>) -> anyhow::Result<Router> {
    let origin: HeaderValue = state
        .config
        .cors_origin
        .parse()
        .context("CORS_ORIGIN is not a valid header value")?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60));

    Ok(routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
