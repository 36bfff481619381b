use std::sync::Arc;

use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::db::models::QueueEntry;
use crate::error::{QueueError, QueueResult};
use crate::notification::NotificationDispatcher;

use super::schedule::validate_slot;
use super::{AdminQueueEntryView, BoardEntry, BoardView, QueueKind, QueueStats, QueueStatus};

/// Position change produced by a renumbering pass
struct PositionShift {
    account_id: String,
    position: i64,
}

/// One mutex per queue kind. Mutations of a kind serialize on its mutex so
/// the position arithmetic never races; reads go straight to the pool.
struct KindLocks {
    consultation: Mutex<()>,
    documents: Mutex<()>,
}

impl KindLocks {
    fn new() -> Self {
        Self {
            consultation: Mutex::new(()),
            documents: Mutex::new(()),
        }
    }

    fn for_kind(&self, kind: QueueKind) -> &Mutex<()> {
        match kind {
            QueueKind::Consultation => &self.consultation,
            QueueKind::Documents => &self.documents,
        }
    }
}

/// Queue ledger
///
/// Owns every mutation of queue entries. Each mutation runs inside a single
/// transaction that also renumbers the remaining entries and writes the
/// resulting notifications, so observers never see a gap in the numbering.
pub struct QueueLedger {
    db: SqlitePool,
    config: Arc<ServerConfig>,
    dispatcher: Arc<NotificationDispatcher>,
    locks: KindLocks,
}

impl QueueLedger {
    pub fn new(
        db: SqlitePool,
        config: Arc<ServerConfig>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            db,
            config,
            dispatcher,
            locks: KindLocks::new(),
        }
    }

    /// Join a queue. The new entry lands at the tail of its kind.
    pub async fn create(
        &self,
        account_id: &str,
        kind: QueueKind,
        scheduled_date: Option<&str>,
        scheduled_time: Option<&str>,
    ) -> QueueResult<QueueEntry> {
        validate_slot(
            scheduled_date,
            scheduled_time,
            self.config.queue.schedule_horizon_days,
        )?;

        let _guard = self.locks.for_kind(kind).lock().await;
        let mut tx = self.db.begin().await.map_err(QueueError::Database)?;

        let waiting: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM queue_entry
             WHERE kind = ?1 AND status IN ('pending', 'confirmed')",
        )
        .bind(kind.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(QueueError::Database)?;

        let position = waiting + 1;
        let estimated_wait = position * self.config.queue.slot_minutes;
        let entry_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO queue_entry (id, account_id, kind, status, position,
                                      estimated_wait_minutes, scheduled_date, scheduled_time,
                                      created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&entry_id)
        .bind(account_id)
        .bind(kind.as_str())
        .bind(QueueStatus::Pending.as_str())
        .bind(position)
        .bind(estimated_wait)
        .bind(scheduled_date)
        .bind(scheduled_time)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(QueueError::Database)?;

        self.dispatcher
            .notify_joined(&mut *tx, account_id, kind, position)
            .await?;

        let entry = Self::fetch_entry(&mut *tx, &entry_id).await?;
        tx.commit().await.map_err(QueueError::Database)?;

        crate::metrics::record_queue_entry_created(kind.as_str());
        tracing::info!(
            entry_id = %entry.id,
            kind = kind.as_str(),
            position,
            "Queue entry created"
        );

        Ok(entry)
    }

    /// Cancel an entry. Owners may cancel their own; admins may cancel any.
    pub async fn cancel(
        &self,
        entry_id: &str,
        by_account_id: &str,
        is_admin: bool,
    ) -> QueueResult<QueueEntry> {
        let kind = self.entry_kind(entry_id).await?;

        let _guard = self.locks.for_kind(kind).lock().await;
        let mut tx = self.db.begin().await.map_err(QueueError::Database)?;

        let entry = Self::fetch_entry(&mut *tx, entry_id).await?;

        if !is_admin && entry.account_id != by_account_id {
            return Err(QueueError::Authorization(
                "Only the owner or an admin can cancel a queue entry".to_string(),
            ));
        }

        let from = QueueStatus::from_str(&entry.status)?;
        if !from.can_transition_to(QueueStatus::Cancelled) {
            return Err(QueueError::InvalidTransition {
                from: from.as_str().to_string(),
                to: QueueStatus::Cancelled.as_str().to_string(),
            });
        }

        sqlx::query("UPDATE queue_entry SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(QueueStatus::Cancelled.as_str())
            .bind(Utc::now())
            .bind(entry_id)
            .execute(&mut *tx)
            .await
            .map_err(QueueError::Database)?;

        let by_owner = entry.account_id == by_account_id;
        self.dispatcher
            .notify_cancelled(&mut *tx, &entry.account_id, by_owner)
            .await?;

        let shifts = self.recompute_positions(&mut *tx, kind).await?;
        for shift in &shifts {
            self.dispatcher
                .notify_position_changed(&mut *tx, &shift.account_id, shift.position)
                .await?;
        }

        let updated = Self::fetch_entry(&mut *tx, entry_id).await?;
        tx.commit().await.map_err(QueueError::Database)?;

        crate::metrics::record_queue_transition(from.as_str(), QueueStatus::Cancelled.as_str());
        tracing::info!(
            entry_id,
            kind = kind.as_str(),
            shifted = shifts.len(),
            "Queue entry cancelled"
        );

        Ok(updated)
    }

    /// Move an entry to a new status. Staff only.
    pub async fn advance(
        &self,
        entry_id: &str,
        new_status: QueueStatus,
        is_admin: bool,
    ) -> QueueResult<QueueEntry> {
        if !is_admin {
            return Err(QueueError::Authorization(
                "Admin role required to change queue status".to_string(),
            ));
        }

        let kind = self.entry_kind(entry_id).await?;

        let _guard = self.locks.for_kind(kind).lock().await;
        let mut tx = self.db.begin().await.map_err(QueueError::Database)?;

        let entry = Self::fetch_entry(&mut *tx, entry_id).await?;

        let from = QueueStatus::from_str(&entry.status)?;
        if !from.can_transition_to(new_status) {
            return Err(QueueError::InvalidTransition {
                from: from.as_str().to_string(),
                to: new_status.as_str().to_string(),
            });
        }

        sqlx::query("UPDATE queue_entry SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(new_status.as_str())
            .bind(Utc::now())
            .bind(entry_id)
            .execute(&mut *tx)
            .await
            .map_err(QueueError::Database)?;

        if new_status == QueueStatus::Cancelled {
            self.dispatcher
                .notify_cancelled(&mut *tx, &entry.account_id, false)
                .await?;
        } else {
            self.dispatcher
                .notify_status_changed(&mut *tx, &entry.account_id, new_status)
                .await?;
        }

        let shifts = self.recompute_positions(&mut *tx, kind).await?;
        for shift in &shifts {
            self.dispatcher
                .notify_position_changed(&mut *tx, &shift.account_id, shift.position)
                .await?;
        }

        let updated = Self::fetch_entry(&mut *tx, entry_id).await?;
        tx.commit().await.map_err(QueueError::Database)?;

        crate::metrics::record_queue_transition(from.as_str(), new_status.as_str());
        tracing::info!(
            entry_id,
            from = from.as_str(),
            to = new_status.as_str(),
            "Queue entry status changed"
        );

        Ok(updated)
    }

    /// Entries belonging to one account, oldest first.
    pub async fn list_for(&self, account_id: &str) -> QueueResult<Vec<QueueEntry>> {
        let entries = sqlx::query_as::<_, QueueEntry>(
            "SELECT id, account_id, kind, status, position, estimated_wait_minutes,
                    scheduled_date, scheduled_time, created_at, updated_at
             FROM queue_entry WHERE account_id = ?1
             ORDER BY created_at, id",
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await
        .map_err(QueueError::Database)?;

        Ok(entries)
    }

    /// Full listing for the admin panel, joined with applicant contact data.
    pub async fn list_admin(
        &self,
        status: Option<QueueStatus>,
    ) -> QueueResult<Vec<AdminQueueEntryView>> {
        let rows = if let Some(status) = status {
            sqlx::query(
                "SELECT q.id, q.kind, q.status, q.position, q.estimated_wait_minutes,
                        q.scheduled_date, q.scheduled_time, q.created_at, q.updated_at,
                        a.name AS user_name, a.email AS user_email, a.phone AS user_phone
                 FROM queue_entry q
                 JOIN account a ON a.id = q.account_id
                 WHERE q.status = ?1
                 ORDER BY q.created_at, q.id",
            )
            .bind(status.as_str())
            .fetch_all(&self.db)
            .await
        } else {
            sqlx::query(
                "SELECT q.id, q.kind, q.status, q.position, q.estimated_wait_minutes,
                        q.scheduled_date, q.scheduled_time, q.created_at, q.updated_at,
                        a.name AS user_name, a.email AS user_email, a.phone AS user_phone
                 FROM queue_entry q
                 JOIN account a ON a.id = q.account_id
                 ORDER BY q.created_at, q.id",
            )
            .fetch_all(&self.db)
            .await
        }
        .map_err(QueueError::Database)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(AdminQueueEntryView {
                id: row.get("id"),
                kind: row.get("kind"),
                status: row.get("status"),
                position: row.get("position"),
                estimated_time: row.get("estimated_wait_minutes"),
                scheduled_date: row.get("scheduled_date"),
                scheduled_time: row.get("scheduled_time"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
                user_name: row.get("user_name"),
                user_email: row.get("user_email"),
                user_phone: row.get("user_phone"),
            });
        }

        Ok(entries)
    }

    /// Projection for the public monitor. Only waiting entries appear; the
    /// confirmed head of each kind shows as "current".
    pub async fn board(&self) -> QueueResult<BoardView> {
        let rows = sqlx::query(
            "SELECT kind, status, position, estimated_wait_minutes FROM queue_entry
             WHERE status IN ('pending', 'confirmed')
             ORDER BY kind, position",
        )
        .fetch_all(&self.db)
        .await
        .map_err(QueueError::Database)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let status: String = row.get("status");
            let position: i64 = row.get("position");
            let current = position == 1 && status == QueueStatus::Confirmed.as_str();

            entries.push(BoardEntry {
                kind: row.get("kind"),
                queue_number: position,
                status: if current { "current" } else { "waiting" }.to_string(),
                estimated_minutes: if current {
                    0
                } else {
                    row.get("estimated_wait_minutes")
                },
            });
        }

        let stats = self.stats().await?;

        Ok(BoardView {
            entries,
            stats,
            last_updated: Utc::now(),
        })
    }

    /// Aggregate counters over the whole ledger.
    pub async fn stats(&self) -> QueueResult<QueueStats> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM queue_entry GROUP BY status")
            .fetch_all(&self.db)
            .await
            .map_err(QueueError::Database)?;

        let mut stats = QueueStats {
            pending: 0,
            confirmed: 0,
            completed: 0,
            cancelled: 0,
            consultation_waiting: 0,
            documents_waiting: 0,
            average_wait_minutes: 0,
        };

        for row in rows {
            let status: String = row.get("status");
            let count: i64 = row.get("count");
            match status.as_str() {
                "pending" => stats.pending = count,
                "confirmed" => stats.confirmed = count,
                "completed" => stats.completed = count,
                "cancelled" => stats.cancelled = count,
                _ => {}
            }
        }

        for kind in QueueKind::ALL {
            let waiting: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM queue_entry
                 WHERE kind = ?1 AND status IN ('pending', 'confirmed')",
            )
            .bind(kind.as_str())
            .fetch_one(&self.db)
            .await
            .map_err(QueueError::Database)?;

            match kind {
                QueueKind::Consultation => stats.consultation_waiting = waiting,
                QueueKind::Documents => stats.documents_waiting = waiting,
            }
            crate::metrics::set_queue_waiting(kind.as_str(), waiting);
        }

        let average: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(estimated_wait_minutes) FROM queue_entry
             WHERE status IN ('pending', 'confirmed')",
        )
        .fetch_one(&self.db)
        .await
        .map_err(QueueError::Database)?;
        stats.average_wait_minutes = average.map(|a| a.round() as i64).unwrap_or(0);

        Ok(stats)
    }

    async fn entry_kind(&self, entry_id: &str) -> QueueResult<QueueKind> {
        let row = sqlx::query("SELECT kind FROM queue_entry WHERE id = ?1")
            .bind(entry_id)
            .fetch_optional(&self.db)
            .await
            .map_err(QueueError::Database)?
            .ok_or_else(|| QueueError::NotFound("Queue entry not found".to_string()))?;

        let kind: String = row.get("kind");
        QueueKind::from_str(&kind)
    }

    async fn fetch_entry(conn: &mut SqliteConnection, entry_id: &str) -> QueueResult<QueueEntry> {
        sqlx::query_as::<_, QueueEntry>(
            "SELECT id, account_id, kind, status, position, estimated_wait_minutes,
                    scheduled_date, scheduled_time, created_at, updated_at
             FROM queue_entry WHERE id = ?1",
        )
        .bind(entry_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(QueueError::Database)?
        .ok_or_else(|| QueueError::NotFound("Queue entry not found".to_string()))
    }

    /// Renumber the active entries of a kind to contiguous 1..N and refresh
    /// their wait estimates. Returns the owners whose position moved.
    async fn recompute_positions(
        &self,
        conn: &mut SqliteConnection,
        kind: QueueKind,
    ) -> QueueResult<Vec<PositionShift>> {
        let rows = sqlx::query(
            "SELECT id, account_id, position FROM queue_entry
             WHERE kind = ?1 AND status IN ('pending', 'confirmed')
             ORDER BY created_at, id",
        )
        .bind(kind.as_str())
        .fetch_all(&mut *conn)
        .await
        .map_err(QueueError::Database)?;

        let slot_minutes = self.config.queue.slot_minutes;
        let now = Utc::now();
        let mut shifts = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            let expected = index as i64 + 1;
            let current: i64 = row.get("position");
            if current == expected {
                continue;
            }

            let id: String = row.get("id");
            sqlx::query(
                "UPDATE queue_entry
                 SET position = ?1, estimated_wait_minutes = ?2, updated_at = ?3
                 WHERE id = ?4",
            )
            .bind(expected)
            .bind(expected * slot_minutes)
            .bind(now)
            .bind(&id)
            .execute(&mut *conn)
            .await
            .map_err(QueueError::Database)?;

            shifts.push(PositionShift {
                account_id: row.get("account_id"),
                position: expected,
            });
        }

        Ok(shifts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AdminConfig, LoggingConfig, QueueConfig, RateLimitConfig, ServiceConfig, SessionConfig,
        StorageConfig,
    };
    use chrono::{Datelike, Duration, Weekday};
    use std::path::PathBuf;

    fn test_config() -> Arc<ServerConfig> {
        Arc::new(ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8080,
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                database_path: PathBuf::from(":memory:"),
            },
            sessions: SessionConfig {
                session_ttl_hours: 24,
                reset_token_ttl_minutes: 60,
            },
            queue: QueueConfig {
                slot_minutes: 5,
                schedule_horizon_days: 14,
            },
            admin: AdminConfig {
                admin_emails: vec![],
            },
            email: None,
            rate_limit: RateLimitConfig {
                enabled: false,
                global_requests_per_minute: 3000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        })
    }

    async fn create_ledger() -> QueueLedger {
        let db = SqlitePool::connect(":memory:").await.unwrap();

        sqlx::query(
            r#"
            CREATE TABLE account (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                phone TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE queue_entry (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL REFERENCES account(id),
                kind TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                position INTEGER NOT NULL,
                estimated_wait_minutes INTEGER NOT NULL,
                scheduled_date TEXT,
                scheduled_time TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE notification (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL REFERENCES account(id),
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        let dispatcher = Arc::new(NotificationDispatcher::new(db.clone()));
        QueueLedger::new(db, test_config(), dispatcher)
    }

    async fn seed_account(ledger: &QueueLedger, id: &str) {
        sqlx::query("INSERT INTO account (id, name, email, phone) VALUES (?1, ?2, ?3, ?4)")
            .bind(id)
            .bind(format!("User {}", id))
            .bind(format!("{}@example.com", id))
            .bind("+7 900 000-00-00")
            .execute(&ledger.db)
            .await
            .unwrap();
    }

    fn next_weekday(days_ahead: i64) -> String {
        let mut date = Utc::now().date_naive() + Duration::days(days_ahead);
        while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date += Duration::days(1);
        }
        date.format("%Y-%m-%d").to_string()
    }

    #[tokio::test]
    async fn test_create_assigns_contiguous_positions() {
        let ledger = create_ledger().await;
        seed_account(&ledger, "a1").await;
        seed_account(&ledger, "a2").await;
        seed_account(&ledger, "a3").await;

        let first = ledger
            .create("a1", QueueKind::Consultation, None, None)
            .await
            .unwrap();
        let second = ledger
            .create("a2", QueueKind::Consultation, None, None)
            .await
            .unwrap();
        let third = ledger
            .create("a3", QueueKind::Consultation, None, None)
            .await
            .unwrap();

        assert_eq!(first.position, 1);
        assert_eq!(second.position, 2);
        assert_eq!(third.position, 3);
        assert_eq!(first.estimated_wait_minutes, 5);
        assert_eq!(third.estimated_wait_minutes, 15);
        assert_eq!(first.status, "pending");
    }

    #[tokio::test]
    async fn test_cancel_shifts_later_entries() {
        let ledger = create_ledger().await;
        seed_account(&ledger, "a1").await;
        seed_account(&ledger, "a2").await;
        seed_account(&ledger, "a3").await;

        ledger
            .create("a1", QueueKind::Consultation, None, None)
            .await
            .unwrap();
        let second = ledger
            .create("a2", QueueKind::Consultation, None, None)
            .await
            .unwrap();
        ledger
            .create("a3", QueueKind::Consultation, None, None)
            .await
            .unwrap();

        let cancelled = ledger.cancel(&second.id, "a2", false).await.unwrap();
        assert_eq!(cancelled.status, "cancelled");
        assert_eq!(cancelled.position, 2);

        let shifted = ledger.list_for("a3").await.unwrap();
        assert_eq!(shifted[0].position, 2);
        assert_eq!(shifted[0].estimated_wait_minutes, 10);

        let untouched = ledger.list_for("a1").await.unwrap();
        assert_eq!(untouched[0].position, 1);
    }

    #[tokio::test]
    async fn test_cancel_notifies_shifted_owner() {
        let ledger = create_ledger().await;
        seed_account(&ledger, "a1").await;
        seed_account(&ledger, "a2").await;

        ledger
            .create("a1", QueueKind::Consultation, None, None)
            .await
            .unwrap();
        let first = ledger.list_for("a1").await.unwrap().remove(0);
        ledger
            .create("a2", QueueKind::Consultation, None, None)
            .await
            .unwrap();

        ledger.cancel(&first.id, "a1", false).await.unwrap();

        let own = ledger.dispatcher.list_for("a1").await.unwrap();
        assert!(own
            .iter()
            .any(|n| n.message.contains("Вы успешно отменили свою позицию в очереди")));

        let shifted = ledger.dispatcher.list_for("a2").await.unwrap();
        assert!(shifted
            .iter()
            .any(|n| n.message.contains("Текущая позиция: 1")));
    }

    #[tokio::test]
    async fn test_cancel_requires_owner_or_admin() {
        let ledger = create_ledger().await;
        seed_account(&ledger, "a1").await;
        seed_account(&ledger, "a2").await;

        let entry = ledger
            .create("a1", QueueKind::Documents, None, None)
            .await
            .unwrap();

        let result = ledger.cancel(&entry.id, "a2", false).await;
        match result.unwrap_err() {
            QueueError::Authorization(_) => {}
            _ => panic!("Expected authorization error"),
        }

        let entries = ledger.list_for("a1").await.unwrap();
        assert_eq!(entries[0].status, "pending");
        assert_eq!(entries[0].position, 1);
    }

    #[tokio::test]
    async fn test_admin_can_cancel_other_entry() {
        let ledger = create_ledger().await;
        seed_account(&ledger, "a1").await;

        let entry = ledger
            .create("a1", QueueKind::Consultation, None, None)
            .await
            .unwrap();

        let cancelled = ledger.cancel(&entry.id, "staff-1", true).await.unwrap();
        assert_eq!(cancelled.status, "cancelled");

        let notes = ledger.dispatcher.list_for("a1").await.unwrap();
        assert!(notes
            .iter()
            .any(|n| n.message.contains("сотрудником приемной комиссии")));
    }

    #[tokio::test]
    async fn test_advance_requires_admin() {
        let ledger = create_ledger().await;
        seed_account(&ledger, "a1").await;

        let entry = ledger
            .create("a1", QueueKind::Consultation, None, None)
            .await
            .unwrap();

        let result = ledger.advance(&entry.id, QueueStatus::Confirmed, false).await;
        match result.unwrap_err() {
            QueueError::Authorization(_) => {}
            _ => panic!("Expected authorization error"),
        }
    }

    #[tokio::test]
    async fn test_status_chain_pending_confirmed_completed() {
        let ledger = create_ledger().await;
        seed_account(&ledger, "a1").await;

        let entry = ledger
            .create("a1", QueueKind::Consultation, None, None)
            .await
            .unwrap();

        let confirmed = ledger
            .advance(&entry.id, QueueStatus::Confirmed, true)
            .await
            .unwrap();
        assert_eq!(confirmed.status, "confirmed");

        let completed = ledger
            .advance(&entry.id, QueueStatus::Completed, true)
            .await
            .unwrap();
        assert_eq!(completed.status, "completed");

        let notes = ledger.dispatcher.list_for("a1").await.unwrap();
        assert!(notes.iter().any(|n| n.message.contains("Подтверждено")));
        assert!(notes.iter().any(|n| n.message.contains("Завершено")));

        let result = ledger.cancel(&entry.id, "a1", false).await;
        match result.unwrap_err() {
            QueueError::InvalidTransition { .. } => {}
            _ => panic!("Expected invalid transition error"),
        }
        let entries = ledger.list_for("a1").await.unwrap();
        assert_eq!(entries[0].status, "completed");
    }

    #[tokio::test]
    async fn test_completion_requires_confirmation() {
        let ledger = create_ledger().await;
        seed_account(&ledger, "a1").await;

        let entry = ledger
            .create("a1", QueueKind::Consultation, None, None)
            .await
            .unwrap();

        let result = ledger.advance(&entry.id, QueueStatus::Completed, true).await;
        match result.unwrap_err() {
            QueueError::InvalidTransition { from, to } => {
                assert_eq!(from, "pending");
                assert_eq!(to, "completed");
            }
            _ => panic!("Expected invalid transition error"),
        }
    }

    #[tokio::test]
    async fn test_terminal_entries_are_frozen() {
        let ledger = create_ledger().await;
        seed_account(&ledger, "a1").await;

        let entry = ledger
            .create("a1", QueueKind::Documents, None, None)
            .await
            .unwrap();
        ledger.cancel(&entry.id, "a1", false).await.unwrap();

        let result = ledger.advance(&entry.id, QueueStatus::Confirmed, true).await;
        match result.unwrap_err() {
            QueueError::InvalidTransition { .. } => {}
            _ => panic!("Expected invalid transition error"),
        }

        let result = ledger.cancel(&entry.id, "a1", false).await;
        match result.unwrap_err() {
            QueueError::InvalidTransition { .. } => {}
            _ => panic!("Expected invalid transition error"),
        }
    }

    #[tokio::test]
    async fn test_kinds_are_independent() {
        let ledger = create_ledger().await;
        seed_account(&ledger, "a1").await;
        seed_account(&ledger, "a2").await;
        seed_account(&ledger, "a3").await;

        let first = ledger
            .create("a1", QueueKind::Consultation, None, None)
            .await
            .unwrap();
        ledger
            .create("a2", QueueKind::Consultation, None, None)
            .await
            .unwrap();
        let docs = ledger
            .create("a3", QueueKind::Documents, None, None)
            .await
            .unwrap();
        assert_eq!(docs.position, 1);

        ledger.cancel(&first.id, "a1", false).await.unwrap();

        let consultation = ledger.list_for("a2").await.unwrap();
        assert_eq!(consultation[0].position, 1);

        let documents = ledger.list_for("a3").await.unwrap();
        assert_eq!(documents[0].position, 1);
        assert_eq!(documents[0].estimated_wait_minutes, 5);
    }

    #[tokio::test]
    async fn test_board_projection() {
        let ledger = create_ledger().await;
        seed_account(&ledger, "a1").await;
        seed_account(&ledger, "a2").await;
        seed_account(&ledger, "a3").await;

        let head = ledger
            .create("a1", QueueKind::Consultation, None, None)
            .await
            .unwrap();
        ledger
            .create("a2", QueueKind::Consultation, None, None)
            .await
            .unwrap();
        let docs = ledger
            .create("a3", QueueKind::Documents, None, None)
            .await
            .unwrap();
        ledger
            .advance(&head.id, QueueStatus::Confirmed, true)
            .await
            .unwrap();

        let board = ledger.board().await.unwrap();
        assert_eq!(board.entries.len(), 3);

        let current: Vec<_> = board
            .entries
            .iter()
            .filter(|e| e.status == "current")
            .collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].kind, "consultation");
        assert_eq!(current[0].queue_number, 1);
        assert_eq!(current[0].estimated_minutes, 0);

        assert_eq!(board.stats.confirmed, 1);
        assert_eq!(board.stats.pending, 2);

        ledger.cancel(&docs.id, "a3", false).await.unwrap();
        let board = ledger.board().await.unwrap();
        assert_eq!(board.entries.len(), 2);
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let ledger = create_ledger().await;
        seed_account(&ledger, "a1").await;
        seed_account(&ledger, "a2").await;
        seed_account(&ledger, "a3").await;

        let first = ledger
            .create("a1", QueueKind::Consultation, None, None)
            .await
            .unwrap();
        ledger
            .create("a2", QueueKind::Consultation, None, None)
            .await
            .unwrap();
        let docs = ledger
            .create("a3", QueueKind::Documents, None, None)
            .await
            .unwrap();

        ledger
            .advance(&first.id, QueueStatus::Confirmed, true)
            .await
            .unwrap();
        ledger
            .advance(&first.id, QueueStatus::Completed, true)
            .await
            .unwrap();
        ledger.cancel(&docs.id, "a3", false).await.unwrap();

        let stats = ledger.stats().await.unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.confirmed, 0);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.consultation_waiting, 1);
        assert_eq!(stats.documents_waiting, 0);
        assert_eq!(stats.average_wait_minutes, 5);
    }

    #[tokio::test]
    async fn test_create_validates_slot() {
        let ledger = create_ledger().await;
        seed_account(&ledger, "a1").await;

        let date = next_weekday(1);
        let result = ledger
            .create("a1", QueueKind::Consultation, Some(&date), None)
            .await;
        match result.unwrap_err() {
            QueueError::Validation(_) => {}
            _ => panic!("Expected validation error"),
        }

        assert!(ledger.list_for("a1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scheduled_slot_persisted() {
        let ledger = create_ledger().await;
        seed_account(&ledger, "a1").await;

        let date = next_weekday(3);
        let entry = ledger
            .create("a1", QueueKind::Documents, Some(&date), Some("10:00"))
            .await
            .unwrap();

        assert_eq!(entry.scheduled_date.as_deref(), Some(date.as_str()));
        assert_eq!(entry.scheduled_time.as_deref(), Some("10:00"));
    }

    #[tokio::test]
    async fn test_create_emits_joined_notification() {
        let ledger = create_ledger().await;
        seed_account(&ledger, "a1").await;

        ledger
            .create("a1", QueueKind::Consultation, None, None)
            .await
            .unwrap();

        let notes = ledger.dispatcher.list_for("a1").await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Постановка в очередь");
        assert!(notes[0].message.contains("консультацию"));
        assert!(notes[0].message.contains("Ваша позиция: 1"));
    }

    #[tokio::test]
    async fn test_cancel_missing_entry() {
        let ledger = create_ledger().await;

        let result = ledger.cancel("missing", "a1", false).await;
        match result.unwrap_err() {
            QueueError::NotFound(_) => {}
            _ => panic!("Expected not found error"),
        }
    }
}
