//! In-app notifications.
//!
//! Events are fanned out to every active account inside the transaction
//! that caused them, so a rolled-back checkout never notifies anyone.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio_postgres::Transaction;
use tokio_postgres::types::{FromSql, Type};
use uuid::Uuid;

use crate::services::order_workflow::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewOrder,
    OrderStatus,
    LowStock,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewOrder => "new_order",
            NotificationKind::OrderStatus => "order_status",
            NotificationKind::LowStock => "low_stock",
            NotificationKind::System => "system",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown notification kind: {0}")]
pub struct ParseKindError(String);

impl FromStr for NotificationKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new_order" => Ok(NotificationKind::NewOrder),
            "order_status" => Ok(NotificationKind::OrderStatus),
            "low_stock" => Ok(NotificationKind::LowStock),
            "system" => Ok(NotificationKind::System),
            other => Err(ParseKindError(other.to_string())),
        }
    }
}

impl<'a> FromSql<'a> for NotificationKind {
    fn from_sql(
        ty: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        let value = <&str as FromSql>::from_sql(ty, raw)?;
        Ok(value.parse()?)
    }

    fn accepts(ty: &Type) -> bool {
        <&str as FromSql>::accepts(ty)
    }
}

/// A notification before it is addressed to users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Order id or SKU the notification points at
    pub reference: Option<String>,
}

impl NewNotification {
    pub fn new_order(order_id: Uuid, customer_name: &str, total: Decimal, item_count: usize) -> Self {
        Self {
            kind: NotificationKind::NewOrder,
            title: "New order received".to_string(),
            message: format!(
                "{} placed an order of {} item{} totalling {}",
                customer_name,
                item_count,
                if item_count == 1 { "" } else { "s" },
                total.round_dp(2)
            ),
            reference: Some(order_id.to_string()),
        }
    }

    pub fn status_changed(order_id: Uuid, from: OrderStatus, to: OrderStatus) -> Self {
        Self {
            kind: NotificationKind::OrderStatus,
            title: format!("Order {}", to.label().to_lowercase()),
            message: format!(
                "Order {} moved from {} to {}",
                short_id(order_id),
                from.label(),
                to.label()
            ),
            reference: Some(order_id.to_string()),
        }
    }

    pub fn low_stock(sku: &str, name: &str, quantity: i32, reorder_level: i32) -> Self {
        let message = if quantity <= 0 {
            format!("{} ({}) is out of stock", name, sku)
        } else {
            format!(
                "{} ({}) is down to {} unit{} (reorder level {})",
                name,
                sku,
                quantity,
                if quantity == 1 { "" } else { "s" },
                reorder_level
            )
        };
        Self {
            kind: NotificationKind::LowStock,
            title: "Low stock".to_string(),
            message,
            reference: Some(sku.to_string()),
        }
    }

    pub fn system(title: &str, message: &str) -> Self {
        Self {
            kind: NotificationKind::System,
            title: title.to_string(),
            message: message.to_string(),
            reference: None,
        }
    }
}

/// First block of a UUID, enough for people to recognise an order
pub fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_uppercase()
}

/// Inserts one row per active user and returns how many were written
pub async fn fan_out(
    tx: &Transaction<'_>,
    notification: &NewNotification,
) -> Result<u64, tokio_postgres::Error> {
    let inserted = tx
        .execute(
            r#"
            INSERT INTO notifications (user_id, kind, title, message, reference)
            SELECT id, $1, $2, $3, $4 FROM users WHERE is_active
            "#,
            &[
                &notification.kind.as_str(),
                &notification.title,
                &notification.message,
                &notification.reference,
            ],
        )
        .await?;
    tracing::debug!(
        "[notifier] {} notification fanned out to {} users",
        notification.kind,
        inserted
    );
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_order_message() {
        let id = Uuid::new_v4();
        let n = NewNotification::new_order(id, "Ada", Decimal::new(4550, 2), 1);
        assert_eq!(n.kind, NotificationKind::NewOrder);
        assert_eq!(n.message, "Ada placed an order of 1 item totalling 45.50");
        assert_eq!(n.reference, Some(id.to_string()));
    }

    #[test]
    fn status_message_uses_labels() {
        let id = Uuid::parse_str("a1b2c3d4-0000-4000-8000-000000000000").unwrap();
        let n = NewNotification::status_changed(id, OrderStatus::ToBePacked, OrderStatus::ReadyForDelivery);
        assert_eq!(n.title, "Order ready for delivery");
        assert_eq!(n.message, "Order A1B2C3D4 moved from To be packed to Ready for delivery");
    }

    #[test]
    fn low_stock_wording() {
        let n = NewNotification::low_stock("BOX-A", "Classic box", 0, 5);
        assert_eq!(n.message, "Classic box (BOX-A) is out of stock");
        let n = NewNotification::low_stock("BOX-A", "Classic box", 1, 5);
        assert_eq!(n.message, "Classic box (BOX-A) is down to 1 unit (reorder level 5)");
        assert_eq!(n.reference.as_deref(), Some("BOX-A"));
    }

    #[test]
    fn kinds_parse_from_column_values() {
        for kind in [
            NotificationKind::NewOrder,
            NotificationKind::OrderStatus,
            NotificationKind::LowStock,
            NotificationKind::System,
        ] {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
        assert!("promo".parse::<NotificationKind>().is_err());
    }
}
