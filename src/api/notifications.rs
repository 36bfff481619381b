/// Notification feed for the authenticated account
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::{QueueError, QueueResult},
    notification::{MarkReadRequest, NotificationView},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/:id", put(mark_read))
}

async fn list_notifications(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> QueueResult<Json<Vec<NotificationView>>> {
    let notifications = ctx
        .notification_dispatcher
        .list_for(&auth.account_id)
        .await?;
    Ok(Json(
        notifications.iter().map(NotificationView::from).collect(),
    ))
}

async fn mark_read(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(notification_id): Path<String>,
    Json(req): Json<MarkReadRequest>,
) -> QueueResult<StatusCode> {
    if !req.read {
        return Err(QueueError::Validation(
            "Notifications can only be marked as read".to_string(),
        ));
    }

    ctx.notification_dispatcher
        .mark_read(&notification_id, &auth.account_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
