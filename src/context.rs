/// Application context and dependency injection
use crate::{
    account::AccountManager,
    config::ServerConfig,
    db,
    error::{QueueError, QueueResult},
    mailer::Mailer,
    notification::NotificationDispatcher,
    queue::QueueLedger,
    rate_limit::{RateLimitTiers, RateLimiter},
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub queue_ledger: Arc<QueueLedger>,
    pub notification_dispatcher: Arc<NotificationDispatcher>,
    pub rate_limiter: Arc<RateLimiter>,
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> QueueResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let db = db::create_pool(
            &config.storage.database_path,
            db::DatabaseOptions::default(),
        )
        .await?;

        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let config = Arc::new(config);

        let account_manager = Arc::new(AccountManager::new(db.clone(), config.clone()));
        let notification_dispatcher = Arc::new(NotificationDispatcher::new(db.clone()));
        let queue_ledger = Arc::new(QueueLedger::new(
            db.clone(),
            config.clone(),
            notification_dispatcher.clone(),
        ));

        let rate_limiter = Arc::new(RateLimiter::new(RateLimitTiers::from_config(
            &config.rate_limit,
        )));
        let mailer = Arc::new(Mailer::new(config.email.clone())?);

        Ok(Self {
            config,
            db,
            account_manager,
            queue_ledger,
            notification_dispatcher,
            rate_limiter,
            mailer,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> QueueResult<()> {
        let dir = &config.storage.data_directory;
        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                QueueError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
