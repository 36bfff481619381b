/// Database record models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    /// Stored lowercase, unique
    pub email: String,
    pub phone: String,
    pub role: String,
    pub avatar: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deactivated_at: Option<DateTime<Utc>>,
}

/// Session record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub account_id: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Password reset token record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PasswordResetToken {
    pub token: String,
    pub account_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

/// Queue entry record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: String,
    pub account_id: String,
    pub kind: String,
    pub status: String,
    /// 1-based position among active entries of the same kind; frozen at its
    /// last value once the entry reaches a terminal status
    pub position: i64,
    pub estimated_wait_minutes: i64,
    /// Optional appointment slot, YYYY-MM-DD
    pub scheduled_date: Option<String>,
    /// Optional appointment slot, HH:MM
    pub scheduled_time: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Notification record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub account_id: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
