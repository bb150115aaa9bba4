use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderName, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use pantry::{PublicUser, User};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{ApiResponse, ApiResult, Payload, done, ok};
use crate::{
    auth::{AuthUser, expired_cookie, hash_password, session_cookie, verify_password},
    database::EMAIL_INDEX,
    error::AppError,
    state::AppState,
    utils::{check_password, normalize_email, optional, required},
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    name: String,
    email: String,
    password: String,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    address: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    address: Option<String>,
}

type SessionResponse = (StatusCode, [(HeaderName, String); 1], Json<ApiResponse<Session>>);

#[derive(Serialize)]
pub struct Session {
    user: PublicUser,
    token: String,
}

fn session_response(
    state: &AppState,
    status: StatusCode,
    user: &User,
) -> Result<SessionResponse, AppError> {
    let token = state.signer.issue(user)?;
    let cookie = session_cookie(&token, state.signer.ttl_seconds(), state.config.cookie_secure);

    let body = ApiResponse {
        success: true,
        data: Some(Session {
            user: PublicUser::from(user),
            token,
        }),
        message: None,
    };

    Ok((status, [(SET_COOKIE, cookie)], Json(body)))
}

pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<SignupRequest>,
) -> Result<SessionResponse, AppError> {
    let name = required("name", &request.name)?;
    let email = normalize_email(&request.email)?;
    check_password(&request.password)?;

    let mut user = User::new(name, email, hash_password(request.password).await?);
    user.phone = optional(request.phone);
    user.address = optional(request.address);

    if !state.db.claim(EMAIL_INDEX, &user.email, &user.id).await? {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    if let Err(e) = state.db.save(&user).await {
        if let Err(release) = state.db.release(EMAIL_INDEX, &user.email).await {
            warn!("Failed to release email claim for {}: {release}", user.email);
        }
        return Err(e.into());
    }

    info!("New account {} ({})", user.id, user.role);

    session_response(&state, StatusCode::CREATED, &user)
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<LoginRequest>,
) -> Result<SessionResponse, AppError> {
    let email = request.email.trim().to_lowercase();

    let Some(user_id) = state.db.lookup(EMAIL_INDEX, &email).await? else {
        return Err(AppError::BadCredentials);
    };

    let Some(user) = state.db.get::<User>(&user_id).await? else {
        return Err(AppError::BadCredentials);
    };

    if !verify_password(request.password, user.password_hash.clone()).await {
        return Err(AppError::BadCredentials);
    }

    session_response(&state, StatusCode::OK, &user)
}

pub async fn logout_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(SET_COOKIE, expired_cookie(state.config.cookie_secure))],
        done("Signed out"),
    )
}

/// The "who am I" endpoint the gate's remote resolver calls.
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> ApiResult<PublicUser> {
    let user = state
        .db
        .get::<User>(&identity.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(ok(PublicUser::from(&user)))
}

pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Payload(request): Payload<ProfileRequest>,
) -> ApiResult<PublicUser> {
    let mut user = state
        .db
        .get::<User>(&identity.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if let Some(name) = request.name {
        user.name = required("name", &name)?;
    }
    if request.phone.is_some() {
        user.phone = optional(request.phone);
    }
    if request.address.is_some() {
        user.address = optional(request.address);
    }
    user.updated_at = pantry::now();

    state.db.save(&user).await?;

    Ok(ok(PublicUser::from(&user)))
}
