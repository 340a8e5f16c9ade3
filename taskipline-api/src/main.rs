//! # Taskipline API Server
//!
//! This is the main API server for Taskipline, a productivity tracker built
//! around goals and the tasks that advance them.
//!
//! ## Architecture
//!
//! The API server is built with Axum and provides:
//! - Credential auth (signup, email verification, signin, password reset)
//! - Access/refresh session tokens with an HttpOnly refresh cookie
//! - Goal and task CRUD with transactional goal<->task consistency
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskipline-api
//! ```

use std::sync::Arc;
use taskipline_api::app::{build_router, AppState};
use taskipline_api::config::Config;
use taskipline_shared::db::{migrations, pool};
use taskipline_shared::email::{Mailer, NoopMailer, ResendMailer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskipline_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Taskipline API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let db = pool::create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    migrations::run_migrations(&db).await?;

    let mailer: Arc<dyn Mailer> = match &config.email.resend_api_key {
        Some(key) => Arc::new(ResendMailer::new(key.clone(), config.email.from.clone())),
        None => {
            tracing::warn!("RESEND_API_KEY not set; outbound email will be dropped");
            Arc::new(NoopMailer)
        }
    };

    let bind_address = config.bind_address();
    let state = AppState::new(db, config, mailer);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
