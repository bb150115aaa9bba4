//! Order state changes and their customer emails.
//!
//! Each transition is load, mutate, save. There is no lock: a concurrent
//! writer can overwrite the change. The email is sent after the save and its
//! failure never undoes the transition.
use pantry::{Order, OrderStatus, User};
use tracing::{info, warn};

use crate::{
    error::AppError,
    notify::Email,
    state::AppState,
    utils::short_id,
};

pub async fn order(state: &AppState, id: &str) -> Result<Order, AppError> {
    state
        .db
        .get::<Order>(id)
        .await?
        .ok_or(AppError::NotFound("Order"))
}

/// Payment provider callback. Already-paid orders come back untouched.
pub async fn confirm_payment(
    state: &AppState,
    order_id: &str,
    reference: Option<String>,
) -> Result<Order, AppError> {
    let mut order = order(state, order_id).await?;

    if !order.confirm_payment(reference) {
        info!("Order {} already paid, ignoring confirmation", order.id);
        return Ok(order);
    }

    state.db.save(&order).await?;
    info!("Order {} paid, status {}", order.id, order.status);

    notify_customer(state, &order).await;

    Ok(order)
}

pub async fn advance(
    state: &AppState,
    order_id: &str,
    status: OrderStatus,
    note: Option<String>,
) -> Result<Order, AppError> {
    let mut order = order(state, order_id).await?;
    let previous = order.status;

    order.advance(status, note)?;
    state.db.save(&order).await?;

    info!("Order {} moved from {previous} to {}", order.id, order.status);

    notify_customer(state, &order).await;

    Ok(order)
}

pub fn status_email(to: String, order: &Order) -> Email {
    let number = short_id(&order.id);

    let headline = match order.status {
        OrderStatus::Pending => "We received your order",
        OrderStatus::Confirmed => "Your order is confirmed",
        OrderStatus::Preparing => "The kitchen is preparing your order",
        OrderStatus::Ready => "Your order is ready",
        OrderStatus::Delivered => "Your order was delivered",
    };

    Email {
        to,
        subject: format!("Order #{number}: {}", order.status),
        body: format!(
            "{headline}.\n\nOrder #{number}\nTotal: ${}.{:02}\nPayment: {}\n",
            order.total_cents / 100,
            order.total_cents % 100,
            order.payment_status,
        ),
    }
}

/// Best effort, every failure is logged and swallowed.
pub async fn notify_customer(state: &AppState, order: &Order) {
    let user = match state.db.get::<User>(&order.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!("Order {} has no customer on file, skipping email", order.id);
            return;
        }
        Err(e) => {
            warn!("Failed to load customer for order {}: {e}", order.id);
            return;
        }
    };

    if let Err(e) = state.notifier.send(status_email(user.email, order)).await {
        warn!("Failed to email customer about order {}: {e}", order.id);
    }
}

#[cfg(test)]
mod tests {
    use pantry::OrderLine;

    use super::*;

    #[test]
    fn email_formats_total_and_number() {
        let order = Order::place(
            "u1",
            vec![OrderLine {
                food_id: "f1".into(),
                restaurant_id: "r1".into(),
                name: "Bao".into(),
                price_cents: 405,
                quantity: 3,
            }],
            "1 Main St".into(),
            None,
            None,
        )
        .unwrap();

        let email = status_email("ada@example.com".into(), &order);

        assert_eq!(email.to, "ada@example.com");
        assert_eq!(email.subject, format!("Order #{}: pending", short_id(&order.id)));
        assert!(email.body.contains("Total: $12.15"));
        assert!(email.body.contains("Payment: pending"));
    }
}
