/// Configuration management for the admissions queue service
use crate::error::{QueueError, QueueResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub sessions: SessionConfig,
    pub queue: QueueConfig,
    pub admin: AdminConfig,
    pub email: Option<EmailConfig>,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database_path: PathBuf,
}

/// Session and password reset token lifetimes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub session_ttl_hours: i64,
    pub reset_token_ttl_minutes: i64,
}

/// Queue behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Minutes of estimated wait per queue position
    pub slot_minutes: i64,
    /// How far ahead an appointment slot may be booked, in days
    pub schedule_horizon_days: i64,
}

/// Admin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Email(s) granted the admin role at registration (comma-separated)
    pub admin_emails: Vec<String>,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub global_requests_per_minute: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> QueueResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("EQ_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("EQ_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| QueueError::Validation("Invalid port number".to_string()))?;

        let data_directory: PathBuf = env::var("EQ_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database_path = env::var("EQ_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("queue.sqlite"));

        let session_ttl_hours = env::var("EQ_SESSION_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .unwrap_or(24);
        let reset_token_ttl_minutes = env::var("EQ_RESET_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);

        let slot_minutes = env::var("EQ_QUEUE_SLOT_MINUTES")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);
        let schedule_horizon_days = env::var("EQ_SCHEDULE_HORIZON_DAYS")
            .unwrap_or_else(|_| "14".to_string())
            .parse()
            .unwrap_or(14);

        // Parse admin emails from comma-separated list
        let admin_emails = env::var("EQ_ADMIN_EMAILS")
            .unwrap_or_else(|_| String::new())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>();

        let email = if let Ok(smtp_url) = env::var("EQ_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("EQ_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let rate_limit_enabled = env::var("EQ_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let rate_limit_requests = env::var("EQ_RATE_LIMIT_GLOBAL_REQUESTS_PER_MINUTE")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);

        let log_level = env::var("EQ_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig { hostname, port },
            storage: StorageConfig {
                data_directory,
                database_path,
            },
            sessions: SessionConfig {
                session_ttl_hours,
                reset_token_ttl_minutes,
            },
            queue: QueueConfig {
                slot_minutes,
                schedule_horizon_days,
            },
            admin: AdminConfig { admin_emails },
            email,
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                global_requests_per_minute: rate_limit_requests,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> QueueResult<()> {
        if self.service.hostname.is_empty() {
            return Err(QueueError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.queue.slot_minutes < 1 {
            return Err(QueueError::Validation(
                "Queue slot minutes must be at least 1".to_string(),
            ));
        }

        if self.sessions.session_ttl_hours < 1 {
            return Err(QueueError::Validation(
                "Session TTL must be at least 1 hour".to_string(),
            ));
        }

        for email in &self.admin.admin_emails {
            if !email.contains('@') {
                return Err(QueueError::Validation(format!(
                    "Invalid admin email: {}",
                    email
                )));
            }
        }

        Ok(())
    }
}
