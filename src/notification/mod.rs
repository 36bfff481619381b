/// Notification dispatch and retrieval
///
/// Queue mutations produce notification rows for the affected owners;
/// clients poll them and acknowledge reads.

mod dispatcher;

pub use dispatcher::NotificationDispatcher;

use crate::db::models::Notification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Client view of a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Notification> for NotificationView {
    fn from(notification: &Notification) -> Self {
        NotificationView {
            id: notification.id.clone(),
            title: notification.title.clone(),
            message: notification.message.clone(),
            read: notification.read,
            created_at: notification.created_at,
        }
    }
}

/// Read acknowledgement request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadRequest {
    pub read: bool,
}
