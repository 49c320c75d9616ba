//! Per-user notification inbox.

use uuid::Uuid;

use crate::database::DatabaseConnection;
use crate::database::models::{Notification, from_rows};
use crate::error::{ApiError, ApiResult};

impl DatabaseConnection {
    pub async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> ApiResult<Vec<Notification>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT id, user_id, kind, title, message, reference, is_read, created_at
                 FROM notifications
                 WHERE user_id = $1 AND (NOT $2 OR NOT is_read)
                 ORDER BY created_at DESC
                 LIMIT $3",
                &[&user_id, &unread_only, &limit],
            )
            .await?;
        Ok(from_rows(&rows)?)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> ApiResult<i64> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
                &[&user_id],
            )
            .await?;
        Ok(row.try_get(0)?)
    }

    /// Only the owner can mark a notification; anyone else gets a 404
    pub async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> ApiResult<()> {
        let client = self.client().await?;
        let updated = client
            .execute(
                "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2",
                &[&id, &user_id],
            )
            .await?;
        if updated == 0 {
            return Err(ApiError::not_found("Notification", id));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> ApiResult<u64> {
        let client = self.client().await?;
        let updated = client
            .execute(
                "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read",
                &[&user_id],
            )
            .await?;
        Ok(updated)
    }

    pub async fn delete_notification(&self, id: Uuid, user_id: Uuid) -> ApiResult<()> {
        let client = self.client().await?;
        let deleted = client
            .execute(
                "DELETE FROM notifications WHERE id = $1 AND user_id = $2",
                &[&id, &user_id],
            )
            .await?;
        if deleted == 0 {
            return Err(ApiError::not_found("Notification", id));
        }
        Ok(())
    }
}
