/// Admin endpoints for staff: full queue listing, status changes, stats
use crate::{
    auth::AdminAuthContext,
    context::AppContext,
    error::QueueResult,
    queue::{AdminQueueEntryView, QueueEntryView, QueueStats, QueueStatus, UpdateQueueStatusRequest},
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/admin/queue", get(list_queue))
        .route("/admin/queue/:id", put(update_status))
        .route("/admin/stats", get(stats))
}

#[derive(Deserialize)]
struct QueueFilter {
    status: Option<String>,
}

async fn list_queue(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    Query(filter): Query<QueueFilter>,
) -> QueueResult<Json<Vec<AdminQueueEntryView>>> {
    let status = filter
        .status
        .as_deref()
        .map(QueueStatus::from_str)
        .transpose()?;

    let entries = ctx.queue_ledger.list_admin(status).await?;
    Ok(Json(entries))
}

async fn update_status(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    Path(entry_id): Path<String>,
    Json(req): Json<UpdateQueueStatusRequest>,
) -> QueueResult<Json<QueueEntryView>> {
    let status = QueueStatus::from_str(&req.status)?;
    let entry = ctx.queue_ledger.advance(&entry_id, status, true).await?;

    tracing::info!(
        admin_id = %auth.account_id,
        entry_id = %entry.id,
        status = %req.status,
        "Admin updated queue entry status"
    );
    Ok(Json(QueueEntryView::from(&entry)))
}

async fn stats(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
) -> QueueResult<Json<QueueStats>> {
    let stats = ctx.queue_ledger.stats().await?;
    Ok(Json(stats))
}
