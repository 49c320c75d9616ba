//! Customer queries.

use uuid::Uuid;

use crate::database::DatabaseConnection;
use crate::database::models::{Customer, CustomerSummary, FromRow, from_rows};
use crate::error::{ApiError, ApiResult};
use crate::state_structs::CustomerRequest;

const CUSTOMER_COLUMNS: &str = "c.id, c.name, c.email, c.phone, c.address, c.created_at";

/// Order count and spend across active and archived orders, cancellations excluded
const SUMMARY_JOIN: &str = r#"
    LEFT JOIN LATERAL (
        SELECT COUNT(*) AS order_count, COALESCE(SUM(total_amount), 0) AS lifetime_spend
        FROM (
            SELECT total_amount FROM orders o
            WHERE o.customer_id = c.id AND o.status <> 'cancelled'
            UNION ALL
            SELECT total_amount FROM archived_orders a
            WHERE a.customer_id = c.id AND a.final_status <> 'cancelled'
        ) history
    ) totals ON TRUE
"#;

impl DatabaseConnection {
    pub async fn list_customers(
        &self,
        search_pattern: Option<&str>,
        limit: i64,
    ) -> ApiResult<Vec<CustomerSummary>> {
        let client = self.client().await?;
        let rows = client
            .query(
                &format!(
                    "SELECT {}, totals.order_count, totals.lifetime_spend
                     FROM customers c {}
                     WHERE ($1::TEXT IS NULL OR c.name ILIKE $1 OR c.email ILIKE $1 OR c.phone ILIKE $1)
                     ORDER BY c.name
                     LIMIT $2",
                    CUSTOMER_COLUMNS, SUMMARY_JOIN
                ),
                &[&search_pattern, &limit],
            )
            .await?;
        Ok(from_rows(&rows)?)
    }

    pub async fn get_customer(&self, id: Uuid) -> ApiResult<CustomerSummary> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!(
                    "SELECT {}, totals.order_count, totals.lifetime_spend
                     FROM customers c {}
                     WHERE c.id = $1",
                    CUSTOMER_COLUMNS, SUMMARY_JOIN
                ),
                &[&id],
            )
            .await?
            .ok_or_else(|| ApiError::not_found("Customer", id))?;
        Ok(CustomerSummary::from_row(&row)?)
    }

    pub async fn create_customer(&self, customer: &CustomerRequest) -> ApiResult<Customer> {
        let client = self.client().await?;
        let created = insert_customer(&**client, customer).await?;
        tracing::info!("Created customer {} ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn update_customer(&self, id: Uuid, customer: &CustomerRequest) -> ApiResult<Customer> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "UPDATE customers c SET name = $2, email = $3, phone = $4, address = $5
                 WHERE c.id = $1
                 RETURNING c.id, c.name, c.email, c.phone, c.address, c.created_at",
                &[
                    &id,
                    &customer.name,
                    &customer.email,
                    &customer.phone,
                    &customer.address,
                ],
            )
            .await?
            .ok_or_else(|| ApiError::not_found("Customer", id))?;
        Ok(Customer::from_row(&row)?)
    }
}

/// Shared by the customer endpoint and checkout, which runs it inside its transaction
pub(crate) async fn insert_customer<C>(client: &C, customer: &CustomerRequest) -> ApiResult<Customer>
where
    C: tokio_postgres::GenericClient + Sync,
{
    let row = client
        .query_one(
            "INSERT INTO customers (id, name, email, phone, address)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, name, email, phone, address, created_at",
            &[
                &Uuid::new_v4(),
                &customer.name,
                &customer.email,
                &customer.phone,
                &customer.address,
            ],
        )
        .await?;
    Ok(Customer::from_row(&row)?)
}
