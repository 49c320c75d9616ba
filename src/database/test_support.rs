//! Fixtures for the database tests. Those tests are `#[ignore]`d; run them
//! against a scratch PostgreSQL with
//! `DATABASE_URL=postgres://... cargo test -- --ignored`.

use rust_decimal::Decimal;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::auth::models::Role;
use crate::database::migrations::run_migrations;
use crate::database::{DatabaseConfig, DatabaseConnection};
use crate::services::checkout::RequestedLine;
use crate::services::order_workflow::OrderStatus;
use crate::state_structs::{CheckoutCustomer, CustomerRequest, NewItem};

static MIGRATED: OnceCell<()> = OnceCell::const_new();

pub async fn test_db() -> DatabaseConnection {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for database tests");
    let db = DatabaseConnection::new(DatabaseConfig::from_url(&url).unwrap())
        .await
        .unwrap();
    MIGRATED
        .get_or_init(|| async { run_migrations(&db).await.unwrap() })
        .await;
    db
}

/// Active staff account; every fan-out reaches it
pub async fn staff_user(db: &DatabaseConnection) -> AuthUser {
    let email = format!("staff-{}@example.com", Uuid::new_v4().simple());
    let account = db
        .create_user(&email, "not-a-real-hash", "Test Staff", Role::Staff)
        .await
        .unwrap();
    AuthUser {
        id: account.id,
        email: account.email,
        role: account.role,
    }
}

/// Creates an item with a unique SKU priced at 12.50
pub async fn stock_item(db: &DatabaseConnection, quantity: i32, reorder_level: i32) -> String {
    let sku = format!("T-{}", &Uuid::new_v4().simple().to_string()[..12]).to_uppercase();
    db.create_item(&NewItem {
        sku: sku.clone(),
        name: format!("Test box {}", sku),
        description: None,
        category: Some("test".to_string()),
        unit_price: Decimal::new(1250, 2),
        cost_price: Decimal::new(500, 2),
        quantity,
        reorder_level,
        supplier_id: None,
    })
    .await
    .unwrap();
    sku
}

pub async fn place_order(db: &DatabaseConnection, user: &AuthUser, sku: &str, quantity: i32) -> Uuid {
    let customer = CheckoutCustomer::New(CustomerRequest {
        name: "Test Customer".to_string(),
        email: None,
        phone: None,
        address: Some("1 Ribbon Lane".to_string()),
    });
    let lines = [RequestedLine {
        sku: sku.to_string(),
        quantity,
    }];
    db.checkout(user, customer, &lines, None, None)
        .await
        .unwrap()
        .order
        .id
}

/// Walks an order through each status in turn
pub async fn advance(db: &DatabaseConnection, user: &AuthUser, id: Uuid, path: &[OrderStatus]) {
    for status in path {
        db.update_order_status(id, status.as_str(), user).await.unwrap();
    }
}

pub async fn quantity_of(db: &DatabaseConnection, sku: &str) -> i32 {
    db.get_item(sku).await.unwrap().quantity
}

/// Low-stock notifications the given user has received for `sku`
pub async fn low_stock_alerts(db: &DatabaseConnection, user: &AuthUser, sku: &str) -> i64 {
    db.client()
        .await
        .unwrap()
        .query_one(
            "SELECT COUNT(*) FROM notifications
             WHERE user_id = $1 AND kind = 'low_stock' AND reference = $2",
            &[&user.id, &sku],
        )
        .await
        .unwrap()
        .get(0)
}
