/// API routes and handlers
pub mod admin;
pub mod auth;
pub mod health;
pub mod middleware;
pub mod notifications;
pub mod profile;
pub mod queue;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(profile::routes())
        .merge(queue::routes())
        .merge(notifications::routes())
        .merge(admin::routes())
}
