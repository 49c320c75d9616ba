// Database Models
//
// Tokio-postgres compatible models for users, inventory, suppliers,
// customers, orders and notifications.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use tokio_postgres::types::Json;
use uuid::Uuid;

use crate::auth::models::Role;
use crate::services::notifier::NotificationKind;
use crate::services::order_workflow::OrderStatus;
use crate::services::stock::StockLevel;

/// Trait for converting from tokio-postgres Row
pub trait FromRow {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error>
    where
        Self: Sized;
}

/// Maps every row, failing on the first bad one
pub fn from_rows<T: FromRow>(rows: &[Row]) -> Result<Vec<T>, tokio_postgres::Error> {
    rows.iter().map(T::from_row).collect()
}

// ============================================================================
// USERS
// ============================================================================

/// Staff or admin account
#[derive(Debug, Clone, Serialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow for UserAccount {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            full_name: row.try_get("full_name")?,
            role: row.try_get("role")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

// ============================================================================
// INVENTORY & SUPPLIERS
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct InventoryItem {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit_price: Decimal,
    pub cost_price: Decimal,
    pub quantity: i32,
    pub reorder_level: i32,
    pub supplier_id: Option<Uuid>,
    pub stock_level: StockLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow for InventoryItem {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        let quantity: i32 = row.try_get("quantity")?;
        let reorder_level: i32 = row.try_get("reorder_level")?;
        Ok(Self {
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            unit_price: row.try_get("unit_price")?,
            cost_price: row.try_get("cost_price")?,
            quantity,
            reorder_level,
            supplier_id: row.try_get("supplier_id")?,
            stock_level: StockLevel::classify(quantity, reorder_level),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow for Supplier {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            contact_person: row.try_get("contact_person")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

// ============================================================================
// CUSTOMERS
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FromRow for Customer {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Customer with purchase history totals (active and archived orders,
/// cancellations excluded)
#[derive(Debug, Clone, Serialize)]
pub struct CustomerSummary {
    #[serde(flatten)]
    pub customer: Customer,
    pub order_count: i64,
    pub lifetime_spend: Decimal,
}

impl FromRow for CustomerSummary {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            customer: Customer::from_row(row)?,
            order_count: row.try_get("order_count")?,
            lifetime_spend: row.try_get("lifetime_spend")?,
        })
    }
}

// ============================================================================
// ORDERS
// ============================================================================

/// Active order as listed; `customer_name` and `item_count` come from joins
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub shipping_address: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
}

impl FromRow for Order {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            customer_name: row.try_get("customer_name")?,
            status: row.try_get("status")?,
            total_amount: row.try_get("total_amount")?,
            shipping_address: row.try_get("shipping_address")?,
            notes: row.try_get("notes")?,
            created_by: row.try_get("created_by")?,
            item_count: row.try_get("item_count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            shipped_at: row.try_get("shipped_at")?,
        })
    }
}

/// One product line. Also the element type of the archived JSONB snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl FromRow for OrderLine {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        let quantity: i32 = row.try_get("quantity")?;
        let unit_price: Decimal = row.try_get("unit_price")?;
        Ok(Self {
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            quantity,
            unit_price,
            line_total: unit_price * Decimal::from(quantity),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub customer: Customer,
    pub items: Vec<OrderLine>,
    pub next_statuses: Vec<OrderStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchivedOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub final_status: OrderStatus,
    pub total_amount: Decimal,
    pub shipping_address: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<OrderLine>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub archived_at: DateTime<Utc>,
}

impl FromRow for ArchivedOrder {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        let Json(items): Json<Vec<OrderLine>> = row.try_get("items")?;
        Ok(Self {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            customer_name: row.try_get("customer_name")?,
            final_status: row.try_get("final_status")?,
            total_amount: row.try_get("total_amount")?,
            shipping_address: row.try_get("shipping_address")?,
            notes: row.try_get("notes")?,
            items,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            archived_at: row.try_get("archived_at")?,
        })
    }
}

// ============================================================================
// NOTIFICATIONS
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub reference: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl FromRow for Notification {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            kind: row.try_get("kind")?,
            title: row.try_get("title")?,
            message: row.try_get("message")?,
            reference: row.try_get("reference")?,
            is_read: row.try_get("is_read")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archived_line_snapshot_uses_plain_json() {
        let line = OrderLine {
            sku: "BOX-A".into(),
            name: "Classic box".into(),
            quantity: 2,
            unit_price: Decimal::new(1550, 2),
            line_total: Decimal::new(3100, 2),
        };
        let value = serde_json::to_value(vec![line.clone()]).unwrap();
        assert_eq!(value[0]["sku"], "BOX-A");
        assert_eq!(value[0]["unit_price"], "15.50");
        let back: Vec<OrderLine> = serde_json::from_value(value).unwrap();
        assert_eq!(back, vec![line]);
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let account = UserAccount {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            full_name: "A".into(),
            role: Role::Staff,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&account).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "staff");
    }
}
