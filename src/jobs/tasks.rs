/// Background task implementations
use crate::{context::AppContext, error::QueueResult};
use chrono::Utc;

/// Cleanup expired sessions
pub async fn cleanup_expired_sessions(ctx: &AppContext) -> QueueResult<u64> {
    ctx.account_manager.cleanup_expired_sessions().await
}

/// Cleanup expired and used password reset tokens
pub async fn cleanup_expired_reset_tokens(ctx: &AppContext) -> QueueResult<u64> {
    ctx.account_manager.cleanup_expired_reset_tokens().await
}

/// Health check - verify the database is reachable
pub async fn health_check(ctx: &AppContext) -> QueueResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;

    Ok(())
}

/// Refresh the account and session gauges exported on /metrics
pub async fn refresh_account_gauges(ctx: &AppContext) -> QueueResult<()> {
    let accounts: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE deactivated_at IS NULL")
            .fetch_one(&ctx.db)
            .await?;

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM session WHERE expires_at > ?1")
        .bind(Utc::now())
        .fetch_one(&ctx.db)
        .await?;

    crate::metrics::set_account_gauges(accounts, sessions);
    Ok(())
}
