use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, Duration};
use tracing::{error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
    started: Instant,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self {
            context,
            started: Instant::now(),
        }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        // Spawn cleanup tasks
        tokio::spawn(Self::expired_session_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::expired_reset_token_cleanup_job(Arc::clone(&self)));

        // Spawn monitoring tasks
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Cleanup expired sessions (runs every hour)
    async fn expired_session_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600)); // Every hour

        loop {
            interval.tick().await;
            info!("Running expired session cleanup");

            let start = Instant::now();
            match tasks::cleanup_expired_sessions(&scheduler.context).await {
                Ok(count) => {
                    crate::metrics::record_background_job(
                        "session_cleanup",
                        "success",
                        start.elapsed().as_secs_f64(),
                    );
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    } else {
                        info!("Session cleanup: no expired sessions found");
                    }
                }
                Err(e) => {
                    crate::metrics::record_background_job(
                        "session_cleanup",
                        "failure",
                        start.elapsed().as_secs_f64(),
                    );
                    error!("Failed to cleanup expired sessions: {}", e);
                }
            }
        }
    }

    /// Cleanup expired password reset tokens (runs every 30 minutes)
    async fn expired_reset_token_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(1800)); // Every 30 minutes

        loop {
            interval.tick().await;
            info!("Running expired reset token cleanup");

            let start = Instant::now();
            match tasks::cleanup_expired_reset_tokens(&scheduler.context).await {
                Ok(count) => {
                    crate::metrics::record_background_job(
                        "reset_token_cleanup",
                        "success",
                        start.elapsed().as_secs_f64(),
                    );
                    if count > 0 {
                        info!("Cleaned up {} expired reset tokens", count);
                    }
                }
                Err(e) => {
                    crate::metrics::record_background_job(
                        "reset_token_cleanup",
                        "failure",
                        start.elapsed().as_secs_f64(),
                    );
                    error!("Failed to cleanup expired reset tokens: {}", e);
                }
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    ///
    /// Also refreshes the uptime and account gauges exported on /metrics.
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300)); // Every 5 minutes

        loop {
            interval.tick().await;

            crate::metrics::set_uptime(scheduler.started.elapsed().as_secs_f64());

            match tasks::health_check(&scheduler.context).await {
                Ok(_) => {
                    if let Err(e) = tasks::refresh_account_gauges(&scheduler.context).await {
                        error!("Failed to refresh account gauges: {}", e);
                    }
                }
                Err(e) => error!("Health check failed: {}", e),
            }
        }
    }
}
