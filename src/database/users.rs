//! Account queries.

use uuid::Uuid;

use crate::auth::models::Role;
use crate::database::DatabaseConnection;
use crate::database::models::{FromRow, UserAccount, from_rows};
use crate::error::{ApiError, ApiResult};
use crate::services::notifier::{NewNotification, fan_out};
use crate::state_structs::UpdateAccountRequest;

const USER_COLUMNS: &str =
    "id, email, password_hash, full_name, role, is_active, created_at, updated_at";

impl DatabaseConnection {
    pub async fn find_user_by_email(&self, email: &str) -> ApiResult<Option<UserAccount>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS),
                &[&email],
            )
            .await?;
        Ok(row.as_ref().map(UserAccount::from_row).transpose()?)
    }

    pub async fn find_user_by_id(&self, id: Uuid) -> ApiResult<Option<UserAccount>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS),
                &[&id],
            )
            .await?;
        Ok(row.as_ref().map(UserAccount::from_row).transpose()?)
    }

    pub async fn list_users(&self) -> ApiResult<Vec<UserAccount>> {
        let client = self.client().await?;
        let rows = client
            .query(
                &format!("SELECT {} FROM users ORDER BY created_at", USER_COLUMNS),
                &[],
            )
            .await?;
        Ok(from_rows(&rows)?)
    }

    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        full_name: &str,
        role: Role,
    ) -> ApiResult<UserAccount> {
        let client = self.client().await?;
        let row = client
            .query_one(
                &format!(
                    "INSERT INTO users (id, email, password_hash, full_name, role)
                     VALUES ($1, $2, $3, $4, $5)
                     RETURNING {}",
                    USER_COLUMNS
                ),
                &[&Uuid::new_v4(), &email, &password_hash, &full_name, &role.as_str()],
            )
            .await
            .map_err(|e| match ApiError::from(e) {
                ApiError::Conflict(_) => {
                    ApiError::Conflict(format!("An account for {} already exists", email))
                }
                other => other,
            })?;
        tracing::info!("Created {} account {}", role, email);
        Ok(UserAccount::from_row(&row)?)
    }

    pub async fn update_user(
        &self,
        id: Uuid,
        changes: &UpdateAccountRequest,
    ) -> ApiResult<UserAccount> {
        let client = self.client().await?;
        let full_name = changes.full_name.as_deref().map(str::trim);
        let role = changes.role.map(|r| r.as_str());
        let row = client
            .query_opt(
                &format!(
                    "UPDATE users SET
                        full_name = COALESCE($2, full_name),
                        role = COALESCE($3, role),
                        is_active = COALESCE($4, is_active),
                        updated_at = NOW()
                     WHERE id = $1
                     RETURNING {}",
                    USER_COLUMNS
                ),
                &[&id, &full_name, &role, &changes.is_active],
            )
            .await?
            .ok_or_else(|| ApiError::not_found("Account", id))?;
        Ok(UserAccount::from_row(&row)?)
    }

    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> ApiResult<()> {
        let client = self.client().await?;
        let updated = client
            .execute(
                "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
                &[&id, &password_hash],
            )
            .await?;
        if updated == 0 {
            return Err(ApiError::not_found("Account", id));
        }
        Ok(())
    }

    pub async fn delete_user(&self, id: Uuid) -> ApiResult<()> {
        let client = self.client().await?;
        let deleted = client
            .execute("DELETE FROM users WHERE id = $1", &[&id])
            .await?;
        if deleted == 0 {
            return Err(ApiError::not_found("Account", id));
        }
        Ok(())
    }

    /// Creates the first admin if the users table is empty. Returns whether
    /// an account was created.
    pub async fn bootstrap_admin(&self, email: &str, password_hash: &str) -> ApiResult<bool> {
        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        // Serialize concurrent starts on the same database
        tx.execute("LOCK TABLE users IN EXCLUSIVE MODE", &[]).await?;
        let existing: i64 = tx.query_one("SELECT COUNT(*) FROM users", &[]).await?.get(0);
        if existing > 0 {
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO users (id, email, password_hash, full_name, role)
             VALUES ($1, $2, $3, 'Administrator', 'admin')",
            &[&Uuid::new_v4(), &email, &password_hash],
        )
        .await?;
        fan_out(
            &tx,
            &NewNotification::system(
                "Welcome to Wrap-N-Track",
                "Your administrator account is ready. Add staff accounts from the accounts page.",
            ),
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Bootstrapped admin account {}", email);
        Ok(true)
    }
}
