//! Orders and their two orthogonal state machines.
//!
//! ```text
//! status:         pending → confirmed → preparing → ready → delivered
//! paymentStatus:  pending → paid
//! ```
//!
//! Status writes must move strictly forward (steps may be skipped) and an
//! order cannot be delivered before it is paid. Payment never regresses.
use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Document, new_id, now};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Delivered,
}

impl OrderStatus {
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Preparing,
        Self::Ready,
        Self::Delivered,
    ];

    const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Confirmed => 1,
            Self::Preparing => 2,
            Self::Ready => 3,
            Self::Delivered => 4,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Delivered => "delivered",
        }
    }

    pub const fn is_after(self, other: Self) -> bool {
        self.rank() > other.rank()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown order status: {s}"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

impl PaymentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Order has no items")]
    EmptyOrder,

    #[error("Cannot move order from {from} to {to}")]
    NotForward { from: OrderStatus, to: OrderStatus },

    #[error("Order must be paid before it is delivered")]
    Unpaid,

    #[error("Order total is too large")]
    TotalOverflow,
}

/// Snapshot of a food at checkout time. Later price edits do not touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub food_id: String,
    pub restaurant_id: String,
    pub name: String,
    pub price_cents: u64,
    pub quantity: u32,
}

impl OrderLine {
    pub fn total_cents(&self) -> u64 {
        self.price_cents.saturating_mul(u64::from(self.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub items: Vec<OrderLine>,
    pub total_cents: u64,
    pub delivery_address: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn place(
        user_id: &str,
        items: Vec<OrderLine>,
        delivery_address: String,
        phone: Option<String>,
        notes: Option<String>,
    ) -> Result<Self, LifecycleError> {
        if items.is_empty() {
            return Err(LifecycleError::EmptyOrder);
        }

        let total_cents = items
            .iter()
            .try_fold(0u64, |total, line| total.checked_add(line.total_cents()))
            .ok_or(LifecycleError::TotalOverflow)?;

        let timestamp = now();

        let mut order = Self {
            id: new_id(),
            user_id: user_id.to_string(),
            items,
            total_cents,
            delivery_address,
            phone,
            notes,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            history: Vec::new(),
            created_at: timestamp,
            updated_at: timestamp,
        };
        order.record(Some("Order placed".to_string()));

        Ok(order)
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Marks the order paid and confirms it when still pending.
    ///
    /// Returns `false` without touching the order when it is already paid.
    pub fn confirm_payment(&mut self, reference: Option<String>) -> bool {
        if self.is_paid() {
            return false;
        }

        self.payment_status = PaymentStatus::Paid;
        self.payment_reference = reference;
        if self.status == OrderStatus::Pending {
            self.status = OrderStatus::Confirmed;
        }

        self.record(Some("Payment confirmed".to_string()));
        true
    }

    pub fn advance(&mut self, next: OrderStatus, note: Option<String>) -> Result<(), LifecycleError> {
        if !next.is_after(self.status) {
            return Err(LifecycleError::NotForward {
                from: self.status,
                to: next,
            });
        }

        if next == OrderStatus::Delivered && !self.is_paid() {
            return Err(LifecycleError::Unpaid);
        }

        self.status = next;
        self.record(note);
        Ok(())
    }

    fn record(&mut self, note: Option<String>) {
        let at = now();

        self.history.push(HistoryEntry {
            status: self.status,
            payment_status: self.payment_status,
            note,
            at,
        });
        self.updated_at = at;
    }
}

impl Document for Order {
    const COLLECTION: &'static str = "orders";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn line(price_cents: u64, quantity: u32) -> OrderLine {
        OrderLine {
            food_id: new_id(),
            restaurant_id: "r1".into(),
            name: "Dumplings".into(),
            price_cents,
            quantity,
        }
    }

    fn placed() -> Order {
        Order::place("u1", vec![line(500, 2), line(250, 1)], "1 Main St".into(), None, None).unwrap()
    }

    #[test]
    fn place_totals_lines_and_records_history() {
        let order = placed();
        assert_eq!(order.total_cents, 1250);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.history.len(), 1);
    }

    #[test]
    fn place_rejects_totals_that_overflow() {
        let result = Order::place(
            "u1",
            vec![line(u64::MAX, 1), line(1250, 1)],
            "1 Main St".into(),
            None,
            None,
        );
        assert_eq!(result.unwrap_err(), LifecycleError::TotalOverflow);
    }

    #[test]
    fn place_rejects_empty_orders() {
        let result = Order::place("u1", Vec::new(), "1 Main St".into(), None, None);
        assert_eq!(result.unwrap_err(), LifecycleError::EmptyOrder);
    }

    #[test]
    fn confirm_payment_confirms_pending_order() {
        let mut order = placed();
        assert!(order.confirm_payment(Some("pi_123".into())));

        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.payment_reference.as_deref(), Some("pi_123"));
        assert_eq!(order.history.len(), 2);
    }

    #[test]
    fn confirm_payment_is_idempotent() {
        let mut order = placed();
        order.confirm_payment(Some("pi_123".into()));

        assert!(!order.confirm_payment(Some("pi_other".into())));
        assert_eq!(order.payment_reference.as_deref(), Some("pi_123"));
        assert_eq!(order.history.len(), 2);
    }

    #[test]
    fn confirm_payment_keeps_later_status() {
        let mut order = placed();
        order.advance(OrderStatus::Preparing, None).unwrap();
        order.confirm_payment(None);
        assert_eq!(order.status, OrderStatus::Preparing);
    }

    #[test]
    fn advance_allows_skipping_forward() {
        let mut order = placed();
        order.advance(OrderStatus::Ready, Some("rush".into())).unwrap();

        assert_eq!(order.status, OrderStatus::Ready);
        assert_eq!(order.history.last().unwrap().note.as_deref(), Some("rush"));
    }

    #[test]
    fn advance_rejects_backwards_and_same_status() {
        let mut order = placed();
        order.advance(OrderStatus::Preparing, None).unwrap();

        assert_eq!(
            order.advance(OrderStatus::Confirmed, None),
            Err(LifecycleError::NotForward {
                from: OrderStatus::Preparing,
                to: OrderStatus::Confirmed,
            })
        );
        assert!(order.advance(OrderStatus::Preparing, None).is_err());
        assert_eq!(order.history.len(), 2);
    }

    #[test]
    fn delivery_requires_payment() {
        let mut order = placed();
        assert_eq!(order.advance(OrderStatus::Delivered, None), Err(LifecycleError::Unpaid));

        order.confirm_payment(None);
        order.advance(OrderStatus::Delivered, None).unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
    }

    #[test]
    fn status_parses_from_wire_names() {
        assert_eq!("Preparing".parse::<OrderStatus>(), Ok(OrderStatus::Preparing));
        assert!("cancelled".parse::<OrderStatus>().is_err());
    }
}
