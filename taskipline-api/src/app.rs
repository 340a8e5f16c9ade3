/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskipline_api::{app::AppState, config::Config};
/// use taskipline_shared::email::NoopMailer;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config, Arc::new(NoopMailer));
/// let app = taskipline_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskipline_shared::auth::token;
use taskipline_shared::email::Mailer;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use uuid::Uuid;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Outbound email sender
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            mailer,
        }
    }

    /// Sends an email best-effort.
    ///
    /// Delivery failures are logged and swallowed: a down mail provider
    /// must never fail the request that triggered the email.
    pub async fn send_email(&self, message: taskipline_shared::email::EmailMessage) {
        let to = message.to.clone();
        if let Err(err) = self.mailer.send(message).await {
            tracing::warn!(to = %to, error = %err, "failed to send email");
        }
    }
}

/// The authenticated caller, injected into request extensions by
/// [`jwt_auth_layer`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// ├── /v1/
/// │   ├── /auth/                       # Session lifecycle (public)
/// │   │   ├── POST /signup
/// │   │   ├── GET  /verify/:token
/// │   │   ├── POST /resend-verification
/// │   │   ├── POST /signin
/// │   │   ├── POST /refresh
/// │   │   ├── POST /signout
/// │   │   ├── POST /forgot-password
/// │   │   └── POST /reset-password/:token
/// │   ├── /users/                      # Account management (authenticated)
/// │   ├── /goals/                      # Goal CRUD (authenticated)
/// │   └── /tasks/                      # Task CRUD (authenticated)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public; refresh/signout authenticate via the cookie)
    let auth_routes = Router::new()
        .route("/signup", post(routes::auth::signup))
        .route("/verify/:token", get(routes::auth::verify_email))
        .route("/resend-verification", post(routes::auth::resend_verification))
        .route("/signin", post(routes::auth::signin))
        .route("/refresh", post(routes::auth::refresh))
        .route("/signout", post(routes::auth::signout))
        .route("/forgot-password", post(routes::auth::forgot_password))
        .route("/reset-password/:token", post(routes::auth::reset_password));

    // Account routes (require a valid access token)
    let user_routes = Router::new()
        .route("/me", get(routes::users::me))
        .route("/profile", patch(routes::users::update_profile))
        .route("/preferences", patch(routes::users::update_preferences))
        .route("/change-password", patch(routes::users::change_password))
        .route("/account", delete(routes::users::delete_account));

    // Goal routes (require a valid access token)
    let goal_routes = Router::new()
        .route("/", post(routes::goals::create_goal))
        .route("/", get(routes::goals::list_goals))
        .route("/:id", get(routes::goals::get_goal))
        .route("/:id", patch(routes::goals::update_goal))
        .route("/:id", delete(routes::goals::delete_goal));

    // Task routes (require a valid access token)
    let task_routes = Router::new()
        .route("/", post(routes::tasks::create_task))
        .route("/", get(routes::tasks::list_tasks))
        .route("/:id", get(routes::tasks::get_task))
        .route("/:id", patch(routes::tasks::update_task))
        .route("/:id", delete(routes::tasks::delete_task));

    let authenticated = Router::new()
        .nest("/users", user_routes)
        .nest("/goals", goal_routes)
        .nest("/tasks", task_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Build complete v1 API
    let v1_routes = Router::new().nest("/auth", auth_routes).merge(authenticated);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    // Combine all routes with middleware stack
    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Access-token authentication middleware layer
///
/// Extracts the Bearer token from the Authorization header, verifies it
/// against the access secret, and injects [`AuthUser`] into request
/// extensions. Every failure mode - missing header, malformed value, bad
/// signature, expiry, wrong issuer - collapses to the same 401.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(crate::error::ApiError::unauthenticated)?;

    let claims = token::verify_session_token(token, &state.config.auth.access_secret)
        .ok_or_else(crate::error::ApiError::unauthenticated)?;

    req.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
    });

    Ok(next.run(req).await)
}
