//! Inventory item queries and stock adjustments.

use uuid::Uuid;

use crate::database::DatabaseConnection;
use crate::database::models::{FromRow, InventoryItem, from_rows};
use crate::error::{ApiError, ApiResult};
use crate::services::notifier::{NewNotification, fan_out};
use crate::services::stock::{StockFilter, crossed_into_low};
use crate::state_structs::{NewItem, UpdateItemRequest};

const ITEM_COLUMNS: &str = "sku, name, description, category, unit_price, cost_price, quantity, \
                            reorder_level, supplier_id, created_at, updated_at";

impl DatabaseConnection {
    pub async fn list_inventory(
        &self,
        search_pattern: Option<&str>,
        category: Option<&str>,
        stock: Option<StockFilter>,
    ) -> ApiResult<Vec<InventoryItem>> {
        let client = self.client().await?;
        let rows = client
            .query(
                &format!(
                    "SELECT {} FROM inventory_items
                     WHERE ($1::TEXT IS NULL OR name ILIKE $1 OR sku ILIKE $1)
                       AND ($2::TEXT IS NULL OR category = $2)
                     ORDER BY name, sku",
                    ITEM_COLUMNS
                ),
                &[&search_pattern, &category],
            )
            .await?;
        let items: Vec<InventoryItem> = from_rows(&rows)?;
        Ok(match stock {
            Some(filter) => items
                .into_iter()
                .filter(|item| filter.matches(item.stock_level))
                .collect(),
            None => items,
        })
    }

    pub async fn get_item(&self, sku: &str) -> ApiResult<InventoryItem> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!("SELECT {} FROM inventory_items WHERE sku = $1", ITEM_COLUMNS),
                &[&sku],
            )
            .await?
            .ok_or_else(|| ApiError::not_found("Inventory item", sku))?;
        Ok(InventoryItem::from_row(&row)?)
    }

    pub async fn list_categories(&self) -> ApiResult<Vec<String>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT DISTINCT category FROM inventory_items
                 WHERE category IS NOT NULL AND category <> ''
                 ORDER BY category",
                &[],
            )
            .await?;
        Ok(rows.iter().map(|row| row.get("category")).collect())
    }

    pub async fn items_by_supplier(&self, supplier_id: Uuid) -> ApiResult<Vec<InventoryItem>> {
        // 404 for an unknown supplier rather than an empty list
        self.get_supplier(supplier_id).await?;
        let client = self.client().await?;
        let rows = client
            .query(
                &format!(
                    "SELECT {} FROM inventory_items WHERE supplier_id = $1 ORDER BY name",
                    ITEM_COLUMNS
                ),
                &[&supplier_id],
            )
            .await?;
        Ok(from_rows(&rows)?)
    }

    pub async fn create_item(&self, item: &NewItem) -> ApiResult<InventoryItem> {
        if let Some(supplier_id) = item.supplier_id {
            self.get_supplier(supplier_id).await?;
        }
        let client = self.client().await?;
        let row = client
            .query_one(
                &format!(
                    "INSERT INTO inventory_items
                        (sku, name, description, category, unit_price, cost_price,
                         quantity, reorder_level, supplier_id)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                     RETURNING {}",
                    ITEM_COLUMNS
                ),
                &[
                    &item.sku,
                    &item.name,
                    &item.description,
                    &item.category,
                    &item.unit_price,
                    &item.cost_price,
                    &item.quantity,
                    &item.reorder_level,
                    &item.supplier_id,
                ],
            )
            .await
            .map_err(|e| match ApiError::from(e) {
                ApiError::Conflict(_) => {
                    ApiError::Conflict(format!("SKU '{}' already exists", item.sku))
                }
                other => other,
            })?;
        tracing::info!("Created inventory item {}", item.sku);
        Ok(InventoryItem::from_row(&row)?)
    }

    pub async fn update_item(&self, sku: &str, changes: &UpdateItemRequest) -> ApiResult<InventoryItem> {
        if let Some(supplier_id) = changes.supplier_id {
            self.get_supplier(supplier_id).await?;
        }
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!(
                    "UPDATE inventory_items SET
                        name = COALESCE($2, name),
                        description = CASE WHEN $3::TEXT IS NULL THEN description ELSE NULLIF($3, '') END,
                        category = CASE WHEN $4::TEXT IS NULL THEN category ELSE NULLIF($4, '') END,
                        unit_price = COALESCE($5, unit_price),
                        cost_price = COALESCE($6, cost_price),
                        reorder_level = COALESCE($7, reorder_level),
                        supplier_id = CASE WHEN $9 THEN NULL ELSE COALESCE($8, supplier_id) END,
                        updated_at = NOW()
                     WHERE sku = $1
                     RETURNING {}",
                    ITEM_COLUMNS
                ),
                &[
                    &sku,
                    &changes.name,
                    &changes.description,
                    &changes.category,
                    &changes.unit_price,
                    &changes.cost_price,
                    &changes.reorder_level,
                    &changes.supplier_id,
                    &changes.clear_supplier,
                ],
            )
            .await?
            .ok_or_else(|| ApiError::not_found("Inventory item", sku))?;
        tracing::info!("Updated inventory item {}", sku);
        Ok(InventoryItem::from_row(&row)?)
    }

    /// Adds `delta` to the stock of one item under a row lock. Going below
    /// zero is a conflict. Crossing the reorder level notifies everyone.
    pub async fn adjust_stock(
        &self,
        sku: &str,
        delta: i32,
        reason: Option<&str>,
        actor: &str,
    ) -> ApiResult<InventoryItem> {
        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let row = tx
            .query_opt(
                "SELECT name, quantity, reorder_level FROM inventory_items WHERE sku = $1 FOR UPDATE",
                &[&sku],
            )
            .await?
            .ok_or_else(|| ApiError::not_found("Inventory item", sku))?;
        let name: String = row.try_get("name")?;
        let before: i32 = row.try_get("quantity")?;
        let reorder_level: i32 = row.try_get("reorder_level")?;

        let after = before
            .checked_add(delta)
            .filter(|after| *after >= 0)
            .ok_or_else(|| {
                ApiError::Conflict(format!(
                    "Cannot adjust '{}' by {}: only {} in stock",
                    sku, delta, before
                ))
            })?;

        let crossed = crossed_into_low(before, after, reorder_level);
        let updated = tx
            .query_one(
                &format!(
                    "UPDATE inventory_items SET quantity = $2, updated_at = NOW(),
                        low_stock_alerted = low_stock_alerted OR $3
                     WHERE sku = $1 RETURNING {}",
                    ITEM_COLUMNS
                ),
                &[&sku, &after, &crossed],
            )
            .await?;

        if crossed {
            fan_out(&tx, &NewNotification::low_stock(sku, &name, after, reorder_level)).await?;
        }
        tx.commit().await?;

        tracing::info!(
            "Stock for {} adjusted {} -> {} by {} ({})",
            sku,
            before,
            after,
            actor,
            reason.unwrap_or("no reason given")
        );
        Ok(InventoryItem::from_row(&updated)?)
    }

    pub async fn delete_item(&self, sku: &str) -> ApiResult<()> {
        let client = self.client().await?;
        let in_use: bool = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM order_products WHERE sku = $1)",
                &[&sku],
            )
            .await?
            .get(0);
        if in_use {
            return Err(ApiError::Conflict(format!(
                "'{}' is part of an active order and cannot be deleted",
                sku
            )));
        }

        let deleted = client
            .execute("DELETE FROM inventory_items WHERE sku = $1", &[&sku])
            .await?;
        if deleted == 0 {
            return Err(ApiError::not_found("Inventory item", sku));
        }
        tracing::info!("Deleted inventory item {}", sku);
        Ok(())
    }

    /// Items at or below their reorder level not yet alerted in the current
    /// low-stock episode
    pub async fn unalerted_low_stock(&self) -> ApiResult<Vec<InventoryItem>> {
        let client = self.client().await?;
        let rows = client
            .query(
                &format!(
                    "SELECT {} FROM inventory_items
                     WHERE quantity <= reorder_level AND NOT low_stock_alerted
                     ORDER BY quantity, sku",
                    ITEM_COLUMNS
                ),
                &[],
            )
            .await?;
        Ok(from_rows(&rows)?)
    }

    /// Raises one low-stock notification per scanned item that is still low
    /// and unalerted. The flag is claimed with a conditional update, so items
    /// alerted or restocked since the scan are skipped and the message uses
    /// current quantities.
    pub async fn raise_low_stock_alerts(&self, items: &[InventoryItem]) -> ApiResult<u64> {
        if items.is_empty() {
            return Ok(0);
        }
        let mut client = self.client().await?;
        let tx = client.transaction().await?;
        let mut written = 0;
        for item in items {
            let Some(row) = tx
                .query_opt(
                    "UPDATE inventory_items SET low_stock_alerted = TRUE
                     WHERE sku = $1 AND NOT low_stock_alerted AND quantity <= reorder_level
                     RETURNING name, quantity, reorder_level",
                    &[&item.sku],
                )
                .await?
            else {
                tracing::debug!("Low-stock alert for {} no longer needed", item.sku);
                continue;
            };
            let name: String = row.try_get("name")?;
            let quantity: i32 = row.try_get("quantity")?;
            let reorder_level: i32 = row.try_get("reorder_level")?;
            written += fan_out(
                &tx,
                &NewNotification::low_stock(&item.sku, &name, quantity, reorder_level),
            )
            .await?;
        }
        tx.commit().await?;
        Ok(written)
    }
}
