/// Notification dispatcher implementation
///
/// Writes are handed a transaction connection by the queue ledger so a
/// notification lands atomically with the mutation that caused it.

use crate::{
    db::models::Notification,
    error::{QueueError, QueueResult},
    queue::{QueueKind, QueueStatus},
};
use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Notification dispatcher service
pub struct NotificationDispatcher {
    db: SqlitePool,
}

impl NotificationDispatcher {
    /// Create a new notification dispatcher
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record a join notification for a new queue entry
    pub async fn notify_joined(
        &self,
        conn: &mut SqliteConnection,
        account_id: &str,
        kind: QueueKind,
        position: i64,
    ) -> QueueResult<()> {
        let message = format!(
            "Вы успешно встали в очередь на {}. Ваша позиция: {}",
            kind_phrase(kind),
            position
        );
        Self::insert(conn, account_id, "Постановка в очередь", &message).await
    }

    /// Record a cancellation notification for the entry's owner
    pub async fn notify_cancelled(
        &self,
        conn: &mut SqliteConnection,
        account_id: &str,
        by_owner: bool,
    ) -> QueueResult<()> {
        let message = if by_owner {
            "Вы успешно отменили свою позицию в очереди"
        } else {
            "Ваша запись в очереди была отменена сотрудником приемной комиссии"
        };
        Self::insert(conn, account_id, "Отмена очереди", message).await
    }

    /// Record a position-shift notification
    pub async fn notify_position_changed(
        &self,
        conn: &mut SqliteConnection,
        account_id: &str,
        position: i64,
    ) -> QueueResult<()> {
        let message = format!(
            "Ваша позиция в очереди изменилась. Текущая позиция: {}",
            position
        );
        Self::insert(conn, account_id, "Изменение статуса очереди", &message).await
    }

    /// Record a status-change notification
    pub async fn notify_status_changed(
        &self,
        conn: &mut SqliteConnection,
        account_id: &str,
        new_status: QueueStatus,
    ) -> QueueResult<()> {
        let message = format!("Статус вашей записи изменен: {}", status_label(new_status));
        Self::insert(conn, account_id, "Изменение статуса очереди", &message).await
    }

    /// List notifications for an account, newest first
    pub async fn list_for(&self, account_id: &str) -> QueueResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT id, account_id, title, message, read, created_at
             FROM notification WHERE account_id = ?1
             ORDER BY created_at DESC, id DESC",
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await
        .map_err(QueueError::Database)?;

        Ok(notifications)
    }

    /// Mark a notification read; owner only, idempotent
    pub async fn mark_read(&self, notification_id: &str, account_id: &str) -> QueueResult<()> {
        let row = sqlx::query("SELECT account_id, read FROM notification WHERE id = ?1")
            .bind(notification_id)
            .fetch_optional(&self.db)
            .await
            .map_err(QueueError::Database)?
            .ok_or_else(|| QueueError::NotFound("Notification not found".to_string()))?;

        let owner_id: String = row.try_get("account_id")?;
        let read: bool = row.try_get("read")?;

        if owner_id != account_id {
            return Err(QueueError::Authorization(
                "Only the owner can mark a notification read".to_string(),
            ));
        }

        // Already read: nothing to do
        if read {
            return Ok(());
        }

        sqlx::query("UPDATE notification SET read = true WHERE id = ?1")
            .bind(notification_id)
            .execute(&self.db)
            .await
            .map_err(QueueError::Database)?;

        Ok(())
    }

    async fn insert(
        conn: &mut SqliteConnection,
        account_id: &str,
        title: &str,
        message: &str,
    ) -> QueueResult<()> {
        sqlx::query(
            "INSERT INTO notification (id, account_id, title, message, read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(account_id)
        .bind(title)
        .bind(message)
        .bind(false)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(QueueError::Database)?;

        crate::metrics::record_notification_created();

        Ok(())
    }
}

fn kind_phrase(kind: QueueKind) -> &'static str {
    match kind {
        QueueKind::Consultation => "консультацию",
        QueueKind::Documents => "подачу документов",
    }
}

fn status_label(status: QueueStatus) -> &'static str {
    match status {
        QueueStatus::Pending => "Ожидает подтверждения",
        QueueStatus::Confirmed => "Подтверждено",
        QueueStatus::Completed => "Завершено",
        QueueStatus::Cancelled => "Отменено",
    }
}
