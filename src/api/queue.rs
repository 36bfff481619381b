/// Queue endpoints: joining, listing, cancelling and the public board
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::QueueResult,
    queue::{BoardView, CreateQueueRequest, QueueEntryView, QueueKind},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/queue", get(list_entries).post(join_queue))
        .route("/queue/board", get(board))
        .route("/queue/:id", delete(cancel_entry))
}

async fn list_entries(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> QueueResult<Json<Vec<QueueEntryView>>> {
    let entries = ctx.queue_ledger.list_for(&auth.account_id).await?;
    Ok(Json(entries.iter().map(QueueEntryView::from).collect()))
}

async fn join_queue(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<CreateQueueRequest>,
) -> QueueResult<impl IntoResponse> {
    let kind = QueueKind::from_str(&req.kind)?;
    let entry = ctx
        .queue_ledger
        .create(
            &auth.account_id,
            kind,
            req.scheduled_date.as_deref(),
            req.scheduled_time.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(QueueEntryView::from(&entry))))
}

async fn cancel_entry(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(entry_id): Path<String>,
) -> QueueResult<StatusCode> {
    ctx.queue_ledger
        .cancel(&entry_id, &auth.account_id, auth.is_admin())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Public projection for the waiting-room display, no authentication
async fn board(State(ctx): State<AppContext>) -> QueueResult<Json<BoardView>> {
    let view = ctx.queue_ledger.board().await?;
    Ok(Json(view))
}
