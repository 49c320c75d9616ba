//! Order checkout, status transitions and archival.
//!
//! Every operation that touches stock runs in a single transaction with the
//! affected inventory rows locked, so concurrent checkouts cannot oversell.

use std::collections::HashMap;

use tokio_postgres::IsolationLevel;
use tokio_postgres::types::Json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::database::DatabaseConnection;
use crate::database::customers::insert_customer;
use crate::database::models::{
    ArchivedOrder, Customer, FromRow, Order, OrderDetail, OrderLine, from_rows,
};
use crate::error::{ApiError, ApiResult};
use crate::services::checkout::{RequestedLine, StockRow, plan_checkout};
use crate::services::notifier::{NewNotification, fan_out};
use crate::services::order_workflow::{OrderStatus, validate_transition};
use crate::services::reports::ReportRange;
use crate::state_structs::{CheckoutCustomer, StatusChangeResponse};

const ORDER_SELECT: &str = r#"
    SELECT o.id, o.customer_id, c.name AS customer_name, o.status, o.total_amount,
           o.shipping_address, o.notes, o.created_by, o.created_at, o.updated_at, o.shipped_at,
           (SELECT COUNT(*) FROM order_products p WHERE p.order_id = o.id) AS item_count
    FROM orders o
    JOIN customers c ON c.id = o.customer_id
"#;

const ARCHIVE_SELECT: &str = r#"
    SELECT a.id, a.customer_id, c.name AS customer_name, a.final_status, a.total_amount,
           a.shipping_address, a.notes, a.items, a.created_by, a.created_at, a.archived_at
    FROM archived_orders a
    JOIN customers c ON c.id = a.customer_id
"#;

impl DatabaseConnection {
    /// Places an order: locks the requested items, checks stock, creates the
    /// customer when needed, writes the order and decrements stock.
    pub async fn checkout(
        &self,
        user: &AuthUser,
        customer: CheckoutCustomer,
        requested: &[RequestedLine],
        shipping_address: Option<&str>,
        notes: Option<&str>,
    ) -> ApiResult<OrderDetail> {
        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let skus: Vec<String> = requested.iter().map(|line| line.sku.clone()).collect();
        let rows = tx
            .query(
                "SELECT sku, name, unit_price, quantity, reorder_level
                 FROM inventory_items WHERE sku = ANY($1)
                 ORDER BY sku
                 FOR UPDATE",
                &[&skus],
            )
            .await?;
        let mut stock = HashMap::with_capacity(rows.len());
        for row in &rows {
            let stock_row = StockRow {
                sku: row.try_get("sku")?,
                name: row.try_get("name")?,
                unit_price: row.try_get("unit_price")?,
                quantity: row.try_get("quantity")?,
                reorder_level: row.try_get("reorder_level")?,
            };
            stock.insert(stock_row.sku.clone(), stock_row);
        }
        let plan = plan_checkout(requested, &stock)?;

        let customer = match customer {
            CheckoutCustomer::Existing(id) => {
                let row = tx
                    .query_opt(
                        "SELECT id, name, email, phone, address, created_at FROM customers WHERE id = $1",
                        &[&id],
                    )
                    .await?
                    .ok_or_else(|| ApiError::not_found("Customer", id))?;
                Customer::from_row(&row)?
            }
            CheckoutCustomer::New(request) => insert_customer(&*tx, &request).await?,
        };

        let order_id = Uuid::new_v4();
        let shipping_address = shipping_address.or(customer.address.as_deref());
        tx.execute(
            "INSERT INTO orders (id, customer_id, status, total_amount, shipping_address, notes, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
            &[
                &order_id,
                &customer.id,
                &OrderStatus::Pending.as_str(),
                &plan.total,
                &shipping_address,
                &notes,
                &user.id,
            ],
        )
        .await?;

        for line in &plan.lines {
            tx.execute(
                "INSERT INTO order_products (order_id, sku, name, quantity, unit_price)
                 VALUES ($1, $2, $3, $4, $5)",
                &[&order_id, &line.sku, &line.name, &line.quantity, &line.unit_price],
            )
            .await?;
        }
        for change in &plan.stock_changes {
            tx.execute(
                "UPDATE inventory_items SET quantity = $2, updated_at = NOW(),
                        low_stock_alerted = low_stock_alerted OR $3
                 WHERE sku = $1",
                &[&change.sku, &change.after, &change.crossed_into_low()],
            )
            .await?;
        }

        fan_out(
            &tx,
            &NewNotification::new_order(order_id, &customer.name, plan.total, plan.lines.len()),
        )
        .await?;
        for change in plan.low_stock_crossings() {
            fan_out(
                &tx,
                &NewNotification::low_stock(&change.sku, &change.name, change.after, change.reorder_level),
            )
            .await?;
        }

        let detail = load_detail(&tx, order_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Order", order_id))?;
        tx.commit().await?;

        tracing::info!(
            "Order {} placed by {} for {} ({} lines, total {})",
            order_id,
            user.email,
            customer.name,
            plan.lines.len(),
            plan.total
        );
        Ok(detail)
    }

    pub async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        customer_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> ApiResult<Vec<Order>> {
        let client = self.client().await?;
        let status = status.map(|s| s.as_str());
        let rows = client
            .query(
                &format!(
                    "{} WHERE ($1::TEXT IS NULL OR o.status = $1)
                          AND ($2::UUID IS NULL OR o.customer_id = $2)
                     ORDER BY o.created_at DESC
                     LIMIT $3 OFFSET $4",
                    ORDER_SELECT
                ),
                &[&status, &customer_id, &limit, &offset],
            )
            .await?;
        Ok(from_rows(&rows)?)
    }

    pub async fn get_order(&self, id: Uuid) -> ApiResult<OrderDetail> {
        let mut client = self.client().await?;
        // Header and lines from one snapshot
        let tx = client
            .build_transaction()
            .isolation_level(IsolationLevel::RepeatableRead)
            .read_only(true)
            .start()
            .await?;
        let detail = load_detail(&tx, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Order", id))?;
        tx.commit().await?;
        Ok(detail)
    }

    /// Moves an order along the workflow. Terminal statuses archive the order
    /// and remove it from the active tables; cancelling restores its stock.
    pub async fn update_order_status(
        &self,
        id: Uuid,
        requested: &str,
        user: &AuthUser,
    ) -> ApiResult<StatusChangeResponse> {
        let next: OrderStatus = requested
            .parse()
            .map_err(|e: crate::services::order_workflow::ParseStatusError| {
                ApiError::BadRequest(e.to_string())
            })?;

        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let current: OrderStatus = tx
            .query_opt("SELECT status FROM orders WHERE id = $1 FOR UPDATE", &[&id])
            .await?
            .ok_or_else(|| ApiError::not_found("Order", id))?
            .try_get("status")?;
        validate_transition(current, next).map_err(|e| ApiError::Conflict(e.to_string()))?;

        tx.execute(
            "UPDATE orders SET status = $2, updated_at = NOW(),
                    shipped_at = CASE WHEN $2 = 'shipped' THEN NOW() ELSE shipped_at END
             WHERE id = $1",
            &[&id, &next.as_str()],
        )
        .await?;
        fan_out(&tx, &NewNotification::status_changed(id, current, next)).await?;

        let response = if next.is_terminal() {
            let archived = archive_order(&tx, id, next).await?;
            StatusChangeResponse::Archived { order: archived }
        } else {
            let detail = load_detail(&tx, id)
                .await?
                .ok_or_else(|| ApiError::not_found("Order", id))?;
            StatusChangeResponse::Active { order: detail }
        };
        tx.commit().await?;

        tracing::info!(
            "Order {} moved {} -> {} by {}",
            id,
            current,
            next,
            user.email
        );
        Ok(response)
    }

    pub async fn list_archived_orders(&self, range: &ReportRange) -> ApiResult<Vec<ArchivedOrder>> {
        let client = self.client().await?;
        let rows = client
            .query(
                &format!(
                    "{} WHERE a.created_at >= $1 AND a.created_at <= $2
                     ORDER BY a.archived_at DESC",
                    ARCHIVE_SELECT
                ),
                &[&range.from, &range.to],
            )
            .await?;
        Ok(from_rows(&rows)?)
    }

    pub async fn get_archived_order(&self, id: Uuid) -> ApiResult<ArchivedOrder> {
        let client = self.client().await?;
        let row = client
            .query_opt(&format!("{} WHERE a.id = $1", ARCHIVE_SELECT), &[&id])
            .await?
            .ok_or_else(|| ApiError::not_found("Archived order", id))?;
        Ok(ArchivedOrder::from_row(&row)?)
    }
}

async fn load_detail(
    tx: &tokio_postgres::Transaction<'_>,
    id: Uuid,
) -> ApiResult<Option<OrderDetail>> {
    let Some(row) = tx
        .query_opt(&format!("{} WHERE o.id = $1", ORDER_SELECT), &[&id])
        .await?
    else {
        return Ok(None);
    };
    let order = Order::from_row(&row)?;

    let customer_row = tx
        .query_one(
            "SELECT id, name, email, phone, address, created_at FROM customers WHERE id = $1",
            &[&order.customer_id],
        )
        .await?;
    let items = load_lines(tx, id).await?;
    let next_statuses = order.status.next_statuses().to_vec();

    Ok(Some(OrderDetail {
        customer: Customer::from_row(&customer_row)?,
        order,
        items,
        next_statuses,
    }))
}

async fn load_lines(tx: &tokio_postgres::Transaction<'_>, order_id: Uuid) -> ApiResult<Vec<OrderLine>> {
    let rows = tx
        .query(
            "SELECT sku, name, quantity, unit_price FROM order_products
             WHERE order_id = $1 ORDER BY sku",
            &[&order_id],
        )
        .await?;
    Ok(from_rows(&rows)?)
}

/// Copies the order with a JSON snapshot of its lines into `archived_orders`
/// and deletes the active rows. Cancelled orders give their stock back first.
async fn archive_order(
    tx: &tokio_postgres::Transaction<'_>,
    id: Uuid,
    final_status: OrderStatus,
) -> ApiResult<ArchivedOrder> {
    let lines = load_lines(tx, id).await?;

    if final_status.restores_stock() {
        for line in &lines {
            tx.execute(
                "UPDATE inventory_items SET quantity = quantity + $2, updated_at = NOW()
                 WHERE sku = $1",
                &[&line.sku, &line.quantity],
            )
            .await?;
        }
    }

    tx.execute(
        "INSERT INTO archived_orders
            (id, customer_id, final_status, total_amount, shipping_address, notes,
             items, created_by, created_at)
         SELECT id, customer_id, $2, total_amount, shipping_address, notes, $3, created_by, created_at
         FROM orders WHERE id = $1",
        &[&id, &final_status.as_str(), &Json(&lines)],
    )
    .await?;
    tx.execute("DELETE FROM orders WHERE id = $1", &[&id]).await?;

    let row = tx
        .query_one(&format!("{} WHERE a.id = $1", ARCHIVE_SELECT), &[&id])
        .await?;
    tracing::debug!("Archived order {} as {}", id, final_status);
    Ok(ArchivedOrder::from_row(&row)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{
        advance, place_order, quantity_of, staff_user, stock_item, test_db,
    };
    use crate::state_structs::CustomerRequest;
    use OrderStatus::*;
    use rust_decimal::Decimal;

    async fn active_rows(db: &DatabaseConnection, id: Uuid) -> (i64, i64) {
        let client = db.client().await.unwrap();
        let orders: i64 = client
            .query_one("SELECT COUNT(*) FROM orders WHERE id = $1", &[&id])
            .await
            .unwrap()
            .get(0);
        let lines: i64 = client
            .query_one("SELECT COUNT(*) FROM order_products WHERE order_id = $1", &[&id])
            .await
            .unwrap()
            .get(0);
        (orders, lines)
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn cancelling_restores_stock_and_archives() {
        let db = test_db().await;
        let user = staff_user(&db).await;
        let sku = stock_item(&db, 10, 2).await;

        let id = place_order(&db, &user, &sku, 3).await;
        assert_eq!(quantity_of(&db, &sku).await, 7);

        advance(&db, &user, id, &[ToBePacked]).await;
        let response = db.update_order_status(id, "cancelled", &user).await.unwrap();
        let StatusChangeResponse::Archived { order } = response else {
            panic!("cancelled order should be archived");
        };
        assert_eq!(order.final_status, Cancelled);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 3);
        assert_eq!(order.shipping_address.as_deref(), Some("1 Ribbon Lane"));

        assert_eq!(quantity_of(&db, &sku).await, 10);
        assert_eq!(active_rows(&db, id).await, (0, 0));
        assert!(matches!(db.get_order(id).await, Err(ApiError::NotFound(_))));
        assert_eq!(db.get_archived_order(id).await.unwrap().final_status, Cancelled);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn completing_archives_without_touching_stock() {
        let db = test_db().await;
        let user = staff_user(&db).await;
        let sku = stock_item(&db, 10, 2).await;

        let id = place_order(&db, &user, &sku, 4).await;
        advance(&db, &user, id, &[ToBePacked, ReadyForDelivery, Shipped]).await;
        let shipped = db.get_order(id).await.unwrap();
        assert!(shipped.order.shipped_at.is_some());
        assert_eq!(shipped.next_statuses, vec![Received, Completed]);

        advance(&db, &user, id, &[Received, Completed]).await;
        assert_eq!(quantity_of(&db, &sku).await, 6);
        assert_eq!(active_rows(&db, id).await, (0, 0));

        let archived = db.get_archived_order(id).await.unwrap();
        assert_eq!(archived.final_status, Completed);
        assert_eq!(archived.total_amount, Decimal::new(5000, 2));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn skipping_a_step_is_a_conflict() {
        let db = test_db().await;
        let user = staff_user(&db).await;
        let sku = stock_item(&db, 5, 0).await;

        let id = place_order(&db, &user, &sku, 1).await;
        assert!(matches!(
            db.update_order_status(id, "shipped", &user).await,
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            db.update_order_status(id, "lost", &user).await,
            Err(ApiError::BadRequest(_))
        ));
        assert_eq!(db.get_order(id).await.unwrap().order.status, Pending);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn checkout_beyond_stock_changes_nothing() {
        let db = test_db().await;
        let user = staff_user(&db).await;
        let sku = stock_item(&db, 2, 0).await;

        let customer = CheckoutCustomer::New(CustomerRequest {
            name: "Nobody".to_string(),
            email: None,
            phone: None,
            address: None,
        });
        let lines = [RequestedLine { sku: sku.clone(), quantity: 3 }];
        assert!(matches!(
            db.checkout(&user, customer, &lines, None, None).await,
            Err(ApiError::Conflict(_))
        ));
        assert_eq!(quantity_of(&db, &sku).await, 2);
    }
}
