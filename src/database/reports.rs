//! Sales line extraction for reporting.

use crate::database::DatabaseConnection;
use crate::error::ApiResult;
use crate::services::reports::{ReportRange, SaleLine};

/// Active orders that are not cancelled plus archived completed orders,
/// the latter expanded from their JSONB snapshot.
const SALE_LINES: &str = r#"
    SELECT o.id AS order_id, o.created_at, o.status, p.sku, p.name, p.quantity, p.unit_price
    FROM orders o
    JOIN order_products p ON p.order_id = o.id
    WHERE o.status <> 'cancelled' AND o.created_at BETWEEN $1 AND $2
    UNION ALL
    SELECT a.id AS order_id, a.created_at, a.final_status AS status,
           x.sku, x.name, x.quantity, x.unit_price
    FROM archived_orders a,
         jsonb_to_recordset(a.items) AS x(sku TEXT, name TEXT, quantity INT, unit_price NUMERIC)
    WHERE a.final_status = 'completed' AND a.created_at BETWEEN $1 AND $2
    ORDER BY created_at, order_id, sku
"#;

impl DatabaseConnection {
    pub async fn sale_lines(&self, range: &ReportRange) -> ApiResult<Vec<SaleLine>> {
        let client = self.client().await?;
        let rows = client.query(SALE_LINES, &[&range.from, &range.to]).await?;
        let mut lines = Vec::with_capacity(rows.len());
        for row in &rows {
            lines.push(SaleLine {
                order_id: row.try_get("order_id")?,
                created_at: row.try_get("created_at")?,
                status: row.try_get("status")?,
                sku: row.try_get("sku")?,
                name: row.try_get("name")?,
                quantity: row.try_get("quantity")?,
                unit_price: row.try_get("unit_price")?,
            });
        }
        tracing::debug!(
            "Loaded {} sale lines between {} and {}",
            lines.len(),
            range.from,
            range.to
        );
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{advance, place_order, staff_user, stock_item, test_db};
    use crate::services::order_workflow::OrderStatus::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn archived_completed_orders_count_as_sales() {
        let db = test_db().await;
        let user = staff_user(&db).await;
        let sku = stock_item(&db, 20, 0).await;

        let completed = place_order(&db, &user, &sku, 2).await;
        advance(&db, &user, completed, &[ToBePacked, ReadyForDelivery, Shipped, Completed]).await;
        let cancelled = place_order(&db, &user, &sku, 5).await;
        advance(&db, &user, cancelled, &[Cancelled]).await;
        let pending = place_order(&db, &user, &sku, 1).await;

        let now = Utc::now();
        let range = ReportRange {
            from: now - Duration::hours(1),
            to: now + Duration::hours(1),
        };
        let lines: Vec<_> = db
            .sale_lines(&range)
            .await
            .unwrap()
            .into_iter()
            .filter(|line| line.sku == sku)
            .collect();

        assert_eq!(lines.len(), 2, "cancelled orders are not sales");
        let archived = lines.iter().find(|line| line.order_id == completed).unwrap();
        assert_eq!(archived.status, Completed);
        assert_eq!(archived.quantity, 2);
        assert_eq!(archived.unit_price, Decimal::new(1250, 2));
        assert_eq!(archived.line_total(), Decimal::new(2500, 2));

        let active = lines.iter().find(|line| line.order_id == pending).unwrap();
        assert_eq!(active.status, Pending);
        assert!(lines.iter().all(|line| line.order_id != cancelled));
    }
}
