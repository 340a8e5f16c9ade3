/// Common test utilities for integration tests
///
/// Integration tests need a real PostgreSQL instance. They are gated on
/// `DATABASE_URL`: when it is unset, [`try_context`] returns `None` and
/// each test skips itself instead of failing.
///
/// Emails never leave the process; the context wires in `NoopMailer`, and
/// tests that need a verification or reset secret install the challenge
/// directly through the model layer.

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use taskipline_api::app::{build_router, AppState};
use taskipline_api::config::{ApiConfig, AuthConfig, Config, DatabaseConfig, EmailConfig};
use taskipline_shared::auth::{password, token};
use taskipline_shared::email::NoopMailer;
use taskipline_shared::models::user::{CreateUser, User};
use tower::Service as _;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Test context containing the app and its backing resources
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
}

/// Builds a test context, or `None` when `DATABASE_URL` is not set.
pub async fn try_context() -> Option<TestContext> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").ok()?;

    let config = Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
            client_url: "http://localhost:3000".to_string(),
        },
        database: DatabaseConfig {
            url: database_url.clone(),
            max_connections: 5,
        },
        auth: AuthConfig {
            access_secret: "test-access-secret-key-32-bytes-long!".to_string(),
            refresh_secret: "test-refresh-secret-key-32-bytes-long".to_string(),
            access_lifetime: Duration::minutes(15),
            refresh_lifetime: Duration::days(7),
            verification_ttl: Duration::minutes(10),
            reset_ttl: Duration::minutes(10),
        },
        email: EmailConfig {
            resend_api_key: None,
            from: "Taskipline <no-reply@taskipline.test>".to_string(),
        },
    };

    let db = PgPool::connect(&database_url)
        .await
        .expect("failed to connect to test database");

    taskipline_shared::db::migrations::run_migrations(&db)
        .await
        .expect("failed to run migrations");

    let state = AppState::new(db.clone(), config.clone(), Arc::new(NoopMailer));
    let app = build_router(state);

    Some(TestContext { db, app, config })
}

impl TestContext {
    /// Creates a verified user directly through the model layer.
    pub async fn create_verified_user(&self) -> User {
        let email = format!("test-{}@example.com", Uuid::new_v4());
        let password_hash = password::hash_password(TEST_PASSWORD).unwrap();

        let user = User::create(
            &self.db,
            CreateUser {
                email,
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                password_hash,
            },
        )
        .await
        .unwrap();

        sqlx::query("UPDATE users SET is_verified = TRUE WHERE id = $1")
            .bind(user.id)
            .execute(&self.db)
            .await
            .unwrap();

        user
    }

    /// Issues an access token for the given user, as signin would.
    pub fn access_token(&self, user: &User) -> String {
        token::issue_session_token(
            user.id,
            &self.config.auth.access_secret,
            self.config.auth.access_lifetime,
        )
        .unwrap()
    }

    /// Installs a verification challenge and returns the plaintext secret.
    pub async fn install_verification_challenge(&self, user: &User) -> String {
        let (plaintext, digest) = token::issue_opaque_secret(token::VERIFICATION_TOKEN_BYTES);
        User::set_verification_challenge(
            &self.db,
            user.id,
            &digest,
            Utc::now() + self.config.auth.verification_ttl,
        )
        .await
        .unwrap();
        plaintext
    }

    /// Installs a password-reset challenge and returns the plaintext secret.
    pub async fn install_reset_challenge(&self, user: &User) -> String {
        let (plaintext, digest) = token::issue_opaque_secret(token::PASSWORD_RESET_TOKEN_BYTES);
        User::set_reset_challenge(
            &self.db,
            user.id,
            &digest,
            Utc::now() + self.config.auth.reset_ttl,
        )
        .await
        .unwrap();
        plaintext
    }

    /// Sends a request and returns (status, parsed JSON body, headers).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        cookie: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value, HeaderMap) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };

        (status, json, headers)
    }

    /// Removes a test user and everything they own.
    pub async fn cleanup_user(&self, user_id: Uuid) {
        taskipline_shared::graph::purge_user(&self.db, user_id)
            .await
            .unwrap();
    }
}

/// Extracts the refresh cookie's `name=value` pair from a `Set-Cookie`
/// header, for replay in a later request.
pub fn refresh_cookie_pair(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refresh_token="))
        .and_then(|v| v.split(';').next())
        .map(|s| s.to_string())
}
