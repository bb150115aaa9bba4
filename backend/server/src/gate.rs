//! # Route Gate
//!
//! Every request passes through [`authorize`] before reaching a handler.
//!
//! ## Classification
//!
//! Static prefix lists, checked in order: admin, vendor, authenticated,
//! guest-only, public. A prefix matches the exact path or the path followed by
//! `/`. Anything unlisted needs a session.
//!
//! ## Decisions
//!
//! | Class         | Anonymous | Customer  | Vendor    | Admin     |
//! |---------------|-----------|-----------|-----------|-----------|
//! | Public        | allow     | allow     | allow     | allow     |
//! | GuestOnly     | allow     | home      | home      | dashboard |
//! | Authenticated | signin    | allow     | allow     | allow     |
//! | Vendor        | signin    | home      | allow     | allow     |
//! | Admin         | signin    | home      | home      | allow     |
//!
//! API paths turn `signin` into 401 and `home` into 403. Page paths get a
//! `303 See Other` redirect.
//!
//! ## Identity
//!
//! Resolved per request, no caching and no retries. Either locally (verify the
//! JWT, reload the user) or with one call to a remote "who am I" endpoint.
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use pantry::User;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    auth::{Identity, TokenSigner, session_token},
    database::Database,
    error::AppError,
    state::AppState,
};

const ADMIN_ROUTES: &[&str] = &["/admin", "/api/admin"];

const VENDOR_ROUTES: &[&str] = &["/vendor", "/api/vendor"];

const PROTECTED_ROUTES: &[&str] = &[
    "/cart",
    "/checkout",
    "/orders",
    "/profile",
    "/api/cart",
    "/api/orders",
    "/api/auth/me",
];

const GUEST_ROUTES: &[&str] = &["/signin", "/signup"];

const PUBLIC_ROUTES: &[&str] = &[
    "/",
    "/menu",
    "/restaurants",
    "/foods",
    "/search",
    "/assets",
    "/favicon.ico",
    "/health",
    "/api/auth/signup",
    "/api/auth/login",
    "/api/auth/logout",
    "/api/restaurants",
    "/api/foods",
    "/api/search",
    "/api/payments",
];

pub const SIGNIN_PAGE: &str = "/signin";
pub const DASHBOARD_PAGE: &str = "/admin";
pub const HOME_PAGE: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    GuestOnly,
    Authenticated,
    Vendor,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectToSignin,
    RedirectToDashboard,
    RedirectToHome,
}

fn matches(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn listed(path: &str, routes: &[&str]) -> bool {
    routes.iter().any(|prefix| matches(path, prefix))
}

pub fn classify(path: &str) -> RouteClass {
    if listed(path, ADMIN_ROUTES) {
        RouteClass::Admin
    } else if listed(path, VENDOR_ROUTES) {
        RouteClass::Vendor
    } else if listed(path, PROTECTED_ROUTES) {
        RouteClass::Authenticated
    } else if listed(path, GUEST_ROUTES) {
        RouteClass::GuestOnly
    } else if listed(path, PUBLIC_ROUTES) {
        RouteClass::Public
    } else {
        RouteClass::Authenticated
    }
}

pub fn decide(class: RouteClass, identity: Option<&Identity>) -> Decision {
    match (class, identity) {
        (RouteClass::Public, _) | (RouteClass::GuestOnly, None) => Decision::Allow,
        (RouteClass::GuestOnly, Some(identity)) if identity.is_admin() => {
            Decision::RedirectToDashboard
        }
        (RouteClass::GuestOnly, Some(_)) => Decision::RedirectToHome,
        (_, None) => Decision::RedirectToSignin,
        (RouteClass::Authenticated, Some(_)) => Decision::Allow,
        (RouteClass::Vendor, Some(identity)) if identity.can_sell() => Decision::Allow,
        (RouteClass::Admin, Some(identity)) if identity.is_admin() => Decision::Allow,
        (RouteClass::Vendor | RouteClass::Admin, Some(_)) => Decision::RedirectToHome,
    }
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// `Ok(None)` for an invalid, expired or orphaned token.
    async fn resolve(&self, token: &str) -> Result<Option<Identity>, AppError>;
}

pub struct LocalResolver {
    signer: TokenSigner,
    db: Database,
}

impl LocalResolver {
    pub fn new(signer: TokenSigner, db: Database) -> Self {
        Self { signer, db }
    }
}

#[async_trait]
impl IdentityResolver for LocalResolver {
    async fn resolve(&self, token: &str) -> Result<Option<Identity>, AppError> {
        let Some(claims) = self.signer.verify(token) else {
            return Ok(None);
        };

        let user = self.db.get::<User>(&claims.sub).await?;

        Ok(user.as_ref().map(Identity::from))
    }
}

#[derive(Deserialize)]
struct WhoAmI {
    success: bool,
    data: Option<Identity>,
}

/// Asks another deployment of this service who owns the token.
pub struct RemoteResolver {
    client: Client,
    url: String,
}

impl RemoteResolver {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }
}

#[async_trait]
impl IdentityResolver for RemoteResolver {
    async fn resolve(&self, token: &str) -> Result<Option<Identity>, AppError> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(AppError::internal)?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: WhoAmI = response.json().await.map_err(AppError::internal)?;

                Ok(body.data.filter(|_| body.success))
            }
            status => Err(AppError::Internal(format!("who-am-i returned {status}"))),
        }
    }
}

pub struct Gate {
    resolver: Arc<dyn IdentityResolver>,
}

impl Gate {
    pub fn new(resolver: Arc<dyn IdentityResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &dyn IdentityResolver {
        self.resolver.as_ref()
    }

    /// Public paths never pay for identity resolution. Resolver failures
    /// count as anonymous.
    pub async fn evaluate(&self, path: &str, token: Option<&str>) -> (Decision, Option<Identity>) {
        let class = classify(path);

        if class == RouteClass::Public {
            return (Decision::Allow, None);
        }

        let identity = match token {
            Some(token) => self.resolver.resolve(token).await.unwrap_or_else(|e| {
                warn!("Identity resolution failed: {e}");
                None
            }),
            None => None,
        };

        (decide(class, identity.as_ref()), identity)
    }
}

fn is_api(path: &str) -> bool {
    matches(path, "/api")
}

fn signin_location(path: &str) -> String {
    format!("{SIGNIN_PAGE}?next={}", urlencoding::encode(path))
}

pub async fn authorize(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let token = session_token(request.headers());

    let (decision, identity) = state.gate.evaluate(&path, token.as_deref()).await;

    if decision != Decision::Allow {
        debug!("Gate {decision:?} for {path}");
    }

    match (decision, is_api(&path)) {
        (Decision::Allow, _) | (Decision::RedirectToDashboard, true) => {
            if let Some(identity) = identity {
                request.extensions_mut().insert(identity);
            }

            next.run(request).await
        }
        (Decision::RedirectToSignin, true) => AppError::Unauthorized.into_response(),
        (Decision::RedirectToHome, true) => AppError::Forbidden.into_response(),
        (Decision::RedirectToSignin, false) => Redirect::to(&signin_location(&path)).into_response(),
        (Decision::RedirectToDashboard, false) => Redirect::to(DASHBOARD_PAGE).into_response(),
        (Decision::RedirectToHome, false) => Redirect::to(HOME_PAGE).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use pantry::Role;

    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            id: "u1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            role,
        }
    }

    #[test]
    fn classifies_by_prefix() {
        assert_eq!(classify("/"), RouteClass::Public);
        assert_eq!(classify("/api/foods/abc"), RouteClass::Public);
        assert_eq!(classify("/api/admin/stats"), RouteClass::Admin);
        assert_eq!(classify("/admin"), RouteClass::Admin);
        assert_eq!(classify("/api/vendor/foods"), RouteClass::Vendor);
        assert_eq!(classify("/api/cart/items"), RouteClass::Authenticated);
        assert_eq!(classify("/signin"), RouteClass::GuestOnly);
    }

    #[test]
    fn prefix_needs_a_segment_boundary() {
        assert_eq!(classify("/administrator"), RouteClass::Authenticated);
        assert_eq!(classify("/api/foodsbackdoor"), RouteClass::Authenticated);
    }

    #[test]
    fn unlisted_paths_need_a_session() {
        assert_eq!(classify("/secret"), RouteClass::Authenticated);
        assert_eq!(decide(classify("/secret"), None), Decision::RedirectToSignin);
    }

    #[test]
    fn admin_routes_reject_everyone_else() {
        assert_eq!(decide(RouteClass::Admin, None), Decision::RedirectToSignin);
        assert_eq!(
            decide(RouteClass::Admin, Some(&identity(Role::Customer))),
            Decision::RedirectToHome
        );
        assert_eq!(
            decide(RouteClass::Admin, Some(&identity(Role::Vendor))),
            Decision::RedirectToHome
        );
        assert_eq!(decide(RouteClass::Admin, Some(&identity(Role::Admin))), Decision::Allow);
    }

    #[test]
    fn vendor_routes_admit_admins() {
        assert_eq!(decide(RouteClass::Vendor, Some(&identity(Role::Vendor))), Decision::Allow);
        assert_eq!(decide(RouteClass::Vendor, Some(&identity(Role::Admin))), Decision::Allow);
        assert_eq!(
            decide(RouteClass::Vendor, Some(&identity(Role::Customer))),
            Decision::RedirectToHome
        );
    }

    #[test]
    fn guest_pages_bounce_signed_in_users() {
        assert_eq!(decide(RouteClass::GuestOnly, None), Decision::Allow);
        assert_eq!(
            decide(RouteClass::GuestOnly, Some(&identity(Role::Admin))),
            Decision::RedirectToDashboard
        );
        assert_eq!(
            decide(RouteClass::GuestOnly, Some(&identity(Role::Customer))),
            Decision::RedirectToHome
        );
    }

    #[test]
    fn signin_redirect_keeps_the_target() {
        assert_eq!(signin_location("/orders/42"), "/signin?next=%2Forders%2F42");
    }

    struct FixedResolver(Option<Identity>);

    #[async_trait]
    impl IdentityResolver for FixedResolver {
        async fn resolve(&self, _token: &str) -> Result<Option<Identity>, AppError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenResolver;

    #[async_trait]
    impl IdentityResolver for BrokenResolver {
        async fn resolve(&self, _token: &str) -> Result<Option<Identity>, AppError> {
            Err(AppError::internal("connection refused"))
        }
    }

    #[tokio::test]
    async fn evaluate_skips_resolution_on_public_paths() {
        let gate = Gate::new(Arc::new(BrokenResolver));
        assert_eq!(gate.evaluate("/api/foods", Some("t")).await, (Decision::Allow, None));
    }

    #[tokio::test]
    async fn evaluate_fails_closed() {
        let gate = Gate::new(Arc::new(BrokenResolver));
        let (decision, identity) = gate.evaluate("/api/orders", Some("t")).await;

        assert_eq!(decision, Decision::RedirectToSignin);
        assert!(identity.is_none());
    }

    #[tokio::test]
    async fn evaluate_returns_the_identity() {
        let gate = Gate::new(Arc::new(FixedResolver(Some(identity(Role::Admin)))));
        let (decision, identity) = gate.evaluate("/api/admin/users", Some("t")).await;

        assert_eq!(decision, Decision::Allow);
        assert_eq!(identity.map(|i| i.role), Some(Role::Admin));
    }

    #[tokio::test]
    async fn evaluate_without_token_is_anonymous() {
        let gate = Gate::new(Arc::new(FixedResolver(Some(identity(Role::Admin)))));
        assert_eq!(
            gate.evaluate("/api/admin/users", None).await.0,
            Decision::RedirectToSignin
        );
    }
}
