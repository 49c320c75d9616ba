//! Supplier queries.

use uuid::Uuid;

use crate::database::DatabaseConnection;
use crate::database::models::{FromRow, Supplier, from_rows};
use crate::error::{ApiError, ApiResult};
use crate::state_structs::SupplierRequest;

const SUPPLIER_COLUMNS: &str =
    "id, name, contact_person, email, phone, address, created_at, updated_at";

impl DatabaseConnection {
    pub async fn list_suppliers(&self) -> ApiResult<Vec<Supplier>> {
        let client = self.client().await?;
        let rows = client
            .query(
                &format!("SELECT {} FROM suppliers ORDER BY name", SUPPLIER_COLUMNS),
                &[],
            )
            .await?;
        Ok(from_rows(&rows)?)
    }

    pub async fn get_supplier(&self, id: Uuid) -> ApiResult<Supplier> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!("SELECT {} FROM suppliers WHERE id = $1", SUPPLIER_COLUMNS),
                &[&id],
            )
            .await?
            .ok_or_else(|| ApiError::not_found("Supplier", id))?;
        Ok(Supplier::from_row(&row)?)
    }

    pub async fn create_supplier(&self, supplier: &SupplierRequest) -> ApiResult<Supplier> {
        let client = self.client().await?;
        let row = client
            .query_one(
                &format!(
                    "INSERT INTO suppliers (id, name, contact_person, email, phone, address)
                     VALUES ($1, $2, $3, $4, $5, $6)
                     RETURNING {}",
                    SUPPLIER_COLUMNS
                ),
                &[
                    &Uuid::new_v4(),
                    &supplier.name,
                    &supplier.contact_person,
                    &supplier.email,
                    &supplier.phone,
                    &supplier.address,
                ],
            )
            .await?;
        let created = Supplier::from_row(&row)?;
        tracing::info!("Created supplier {} ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn update_supplier(&self, id: Uuid, supplier: &SupplierRequest) -> ApiResult<Supplier> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!(
                    "UPDATE suppliers SET
                        name = $2, contact_person = $3, email = $4, phone = $5, address = $6,
                        updated_at = NOW()
                     WHERE id = $1
                     RETURNING {}",
                    SUPPLIER_COLUMNS
                ),
                &[
                    &id,
                    &supplier.name,
                    &supplier.contact_person,
                    &supplier.email,
                    &supplier.phone,
                    &supplier.address,
                ],
            )
            .await?
            .ok_or_else(|| ApiError::not_found("Supplier", id))?;
        Ok(Supplier::from_row(&row)?)
    }

    /// Items keep existing; their supplier link is cleared by the foreign key
    pub async fn delete_supplier(&self, id: Uuid) -> ApiResult<()> {
        let client = self.client().await?;
        let deleted = client
            .execute("DELETE FROM suppliers WHERE id = $1", &[&id])
            .await?;
        if deleted == 0 {
            return Err(ApiError::not_found("Supplier", id));
        }
        tracing::info!("Deleted supplier {}", id);
        Ok(())
    }
}
