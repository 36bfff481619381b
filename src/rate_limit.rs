/// Rate Limiting System
use crate::error::{QueueError, QueueResult};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc};

/// Per-class request budgets
#[derive(Debug, Clone)]
pub struct RateLimitTiers {
    /// Requests per second for authenticated users
    pub authenticated_rps: u32,
    /// Requests per second for unauthenticated users
    pub unauthenticated_rps: u32,
    /// Requests per second for admin users
    pub admin_rps: u32,
    /// Burst size
    pub burst_size: u32,
}

impl Default for RateLimitTiers {
    fn default() -> Self {
        Self {
            authenticated_rps: 50,
            unauthenticated_rps: 10,
            admin_rps: 500,
            burst_size: 25,
        }
    }
}

impl RateLimitTiers {
    /// Derive the per-class budgets from the configured global budget.
    /// Unauthenticated traffic gets a tenth of the authenticated rate,
    /// admin traffic ten times it.
    pub fn from_config(config: &crate::config::RateLimitConfig) -> Self {
        let per_second = (config.global_requests_per_minute / 60).max(1);
        Self {
            authenticated_rps: per_second,
            unauthenticated_rps: (per_second / 10).max(1),
            admin_rps: per_second.saturating_mul(10),
            burst_size: (per_second / 2).max(5),
        }
    }
}

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    tiers: RateLimitTiers,
    authenticated: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    unauthenticated: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    admin: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

fn quota(rps: u32, burst: u32) -> Quota {
    Quota::per_second(NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN))
        .allow_burst(NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN))
}

impl RateLimiter {
    pub fn new(tiers: RateLimitTiers) -> Self {
        let authenticated = quota(tiers.authenticated_rps, tiers.burst_size);
        let unauthenticated = quota(tiers.unauthenticated_rps, (tiers.burst_size / 5).max(1));
        let admin = quota(tiers.admin_rps, tiers.burst_size.saturating_mul(2));

        Self {
            tiers,
            authenticated: Arc::new(GovernorLimiter::direct(authenticated)),
            unauthenticated: Arc::new(GovernorLimiter::direct(unauthenticated)),
            admin: Arc::new(GovernorLimiter::direct(admin)),
        }
    }

    /// Check rate limit for authenticated user
    pub fn check_authenticated(&self) -> QueueResult<()> {
        match self.authenticated.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(QueueError::RateLimitExceeded {
                retry_after: std::time::Duration::from_secs(1),
            }),
        }
    }

    /// Check rate limit for unauthenticated user
    pub fn check_unauthenticated(&self) -> QueueResult<()> {
        match self.unauthenticated.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(QueueError::RateLimitExceeded {
                retry_after: std::time::Duration::from_secs(1),
            }),
        }
    }

    /// Check rate limit for admin user
    pub fn check_admin(&self) -> QueueResult<()> {
        match self.admin.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(QueueError::RateLimitExceeded {
                retry_after: std::time::Duration::from_secs(1),
            }),
        }
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<crate::context::AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, QueueError> {
    if !ctx.config.rate_limit.enabled {
        return Ok(next.run(request).await);
    }

    let is_admin = request.uri().path().starts_with("/admin");
    let has_auth_header = request.headers().get("authorization").is_some();

    let (check, limit) = if is_admin && has_auth_header {
        (
            ctx.rate_limiter.check_admin(),
            ctx.rate_limiter.tiers.admin_rps,
        )
    } else if has_auth_header {
        (
            ctx.rate_limiter.check_authenticated(),
            ctx.rate_limiter.tiers.authenticated_rps,
        )
    } else {
        (
            ctx.rate_limiter.check_unauthenticated(),
            ctx.rate_limiter.tiers.unauthenticated_rps,
        )
    };

    check?;

    let mut response = next.run(request).await;
    if let Ok(value) = limit.to_string().parse() {
        response.headers_mut().insert("X-RateLimit-Limit", value);
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(RateLimitTiers::default());

        assert!(limiter.check_authenticated().is_ok());
        assert!(limiter.check_unauthenticated().is_ok());
        assert!(limiter.check_admin().is_ok());
    }

    #[test]
    fn test_burst_limit() {
        let tiers = RateLimitTiers {
            authenticated_rps: 10,
            unauthenticated_rps: 5,
            admin_rps: 100,
            burst_size: 5,
        };
        let limiter = RateLimiter::new(tiers);

        for _ in 0..5 {
            assert!(limiter.check_authenticated().is_ok());
        }

        match limiter.check_authenticated().unwrap_err() {
            QueueError::RateLimitExceeded { .. } => {}
            _ => panic!("Expected rate limit error"),
        }
    }

    #[test]
    fn test_tiers_from_config() {
        let tiers = RateLimitTiers::from_config(&crate::config::RateLimitConfig {
            enabled: true,
            global_requests_per_minute: 3000,
        });

        assert_eq!(tiers.authenticated_rps, 50);
        assert_eq!(tiers.unauthenticated_rps, 5);
        assert_eq!(tiers.admin_rps, 500);
        assert_eq!(tiers.burst_size, 25);
    }
}
