use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
};
use pantry::Order;
use serde::Deserialize;
use tracing::warn;

use super::{ApiResult, Payload, ok};
use crate::{
    error::AppError,
    lifecycle,
    state::AppState,
    utils::{constant_time_eq, optional, required},
};

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    order_id: String,
    #[serde(default)]
    reference: Option<String>,
}

fn check_secret(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let presented = headers
        .get(WEBHOOK_SECRET_HEADER)
        .map(|value| value.as_bytes())
        .unwrap_or_default();

    if !constant_time_eq(presented, state.config.webhook_secret.as_bytes()) {
        warn!("Rejected payment confirmation with a bad secret");
        return Err(AppError::Unauthorized);
    }

    Ok(())
}

/// The only way an order becomes paid.
pub async fn confirm_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Payload(confirmation): Payload<PaymentConfirmation>,
) -> ApiResult<Order> {
    check_secret(&state, &headers)?;

    let order_id = required("orderId", &confirmation.order_id)?;
    let order = lifecycle::confirm_payment(&state, &order_id, optional(confirmation.reference)).await?;

    Ok(ok(order))
}
