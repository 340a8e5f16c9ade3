/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `ACCESS_TOKEN_SECRET`: HMAC key for access tokens (required)
/// - `REFRESH_TOKEN_SECRET`: HMAC key for refresh tokens (required)
/// - `ACCESS_TOKEN_LIFETIME`: e.g. `15m` (default: 15m)
/// - `REFRESH_TOKEN_LIFETIME`: e.g. `7d` (default: 7d)
/// - `VERIFICATION_TOKEN_TTL`: e.g. `10m` (default: 10m)
/// - `PASSWORD_RESET_TOKEN_TTL`: e.g. `10m` (default: 10m)
/// - `CLIENT_URL`: frontend base URL used in email links
/// - `CORS_ORIGINS`: comma-separated origins, or `*` (default: *)
/// - `APP_ENV`: `production` enables Secure cookies
/// - `RESEND_API_KEY`: mail provider key (optional; emails are dropped
///   when unset)
/// - `EMAIL_FROM`: From address for outbound mail
/// - `RUST_LOG`: Log level (default: info)
///
/// # Example
///
/// ```no_run
/// use taskipline_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}:{}", config.api.host, config.api.port);
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use std::env;
use taskipline_shared::auth::token;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Token and challenge configuration
    pub auth: AuthConfig,

    /// Outbound email configuration
    pub email: EmailConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins (`*` means permissive, for development)
    pub cors_origins: Vec<String>,

    /// Whether we are running in production (enables Secure cookies)
    pub production: bool,

    /// Frontend base URL, used to build verification/reset links
    pub client_url: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Token and challenge configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC key for access tokens
    ///
    /// IMPORTANT: must be kept secret and at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub access_secret: String,

    /// HMAC key for refresh tokens; independent from the access key so
    /// the two token kinds can never validate against each other
    pub refresh_secret: String,

    /// Access token lifetime
    pub access_lifetime: Duration,

    /// Refresh token lifetime; also the refresh cookie's Max-Age
    pub refresh_lifetime: Duration,

    /// How long an email-verification link stays valid
    pub verification_ttl: Duration,

    /// How long a password-reset link stays valid
    pub reset_ttl: Duration,
}

/// Outbound email configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Resend API key; when absent, outbound mail is logged and dropped
    pub resend_api_key: Option<String>,

    /// From address for all transactional mail
    pub from: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let production = env::var("APP_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);

        let client_url = env::var("CLIENT_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let access_secret = env::var("ACCESS_TOKEN_SECRET")
            .map_err(|_| anyhow::anyhow!("ACCESS_TOKEN_SECRET environment variable is required"))?;
        let refresh_secret = env::var("REFRESH_TOKEN_SECRET").map_err(|_| {
            anyhow::anyhow!("REFRESH_TOKEN_SECRET environment variable is required")
        })?;

        if access_secret.len() < 32 {
            anyhow::bail!("ACCESS_TOKEN_SECRET must be at least 32 characters long");
        }
        if refresh_secret.len() < 32 {
            anyhow::bail!("REFRESH_TOKEN_SECRET must be at least 32 characters long");
        }
        if access_secret == refresh_secret {
            anyhow::bail!("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ");
        }

        let access_lifetime = parse_lifetime("ACCESS_TOKEN_LIFETIME", "15m")?;
        let refresh_lifetime = parse_lifetime("REFRESH_TOKEN_LIFETIME", "7d")?;
        let verification_ttl = parse_lifetime("VERIFICATION_TOKEN_TTL", "10m")?;
        let reset_ttl = parse_lifetime("PASSWORD_RESET_TOKEN_TTL", "10m")?;

        let resend_api_key = env::var("RESEND_API_KEY").ok().filter(|k| !k.is_empty());
        let email_from = env::var("EMAIL_FROM")
            .unwrap_or_else(|_| "Taskipline <no-reply@taskipline.com>".to_string());

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production,
                client_url,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            auth: AuthConfig {
                access_secret,
                refresh_secret,
                access_lifetime,
                refresh_lifetime,
                verification_ttl,
                reset_ttl,
            },
            email: EmailConfig {
                resend_api_key,
                from: email_from,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse_lifetime(var: &str, default: &str) -> anyhow::Result<Duration> {
    let raw = env::var(var).unwrap_or_else(|_| default.to_string());
    token::parse_duration(&raw).map_err(|e| anyhow::anyhow!("{var}: {e}"))
}
