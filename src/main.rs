/// IUBiP Admissions Queue - electronic queue backend
///
/// HTTP backend for the university admissions office: applicant accounts,
/// live queues for consultations and document submission, a public
/// waiting-room board and an admin panel for the admissions staff.

mod account;
mod api;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod jobs;
mod mailer;
mod metrics;
mod notification;
mod queue;
mod rate_limit;
mod server;

use config::ServerConfig;
use context::AppContext;
use error::QueueResult;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> QueueResult<()> {
    // Print banner
    print_banner();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging, RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("iubip_queue={},tower_http=debug", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Create application context
    let ctx = AppContext::new(config).await?;
    let ctx = Arc::new(ctx);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ______ ____
   / ____// __ \
  / __/  / / / /
 / /___ / /_/ /
/_____/ \___\_\

        Admissions Office Electronic Queue v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
