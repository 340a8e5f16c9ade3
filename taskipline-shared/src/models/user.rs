/// User model and credential-store operations
///
/// Two views of the `users` table exist:
///
/// - [`User`]: the default read. Contains no security fields and is safe to
///   serialize into API responses.
/// - [`UserWithSecrets`]: explicit opt-in read carrying the password hash,
///   challenge digests and the active refresh token. Deliberately does not
///   implement `Serialize`.
///
/// Every mutation here is a single-row write, so no cross-document
/// transaction is needed: a user's security fields are self-contained.
///
/// # Schema
///
/// Emails are stored lowercased and looked up with `LOWER()`, backed by a
/// unique index on `LOWER(email)`.
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL,
///     first_name VARCHAR(100) NOT NULL,
///     last_name VARCHAR(100) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     is_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     verification_token_digest VARCHAR(64),
///     verification_token_expires_at TIMESTAMPTZ,
///     password_reset_token_digest VARCHAR(64),
///     password_reset_token_expires_at TIMESTAMPTZ,
///     refresh_token TEXT,
///     email_notifications BOOLEAN NOT NULL DEFAULT TRUE,
///     ai_features_enabled BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Columns of the default (secret-free) user view
const USER_COLUMNS: &str = "id, email, first_name, last_name, is_verified, \
     email_notifications, ai_features_enabled, created_at, updated_at";

/// User account, without security fields
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user id
    pub id: Uuid,

    /// Email address (stored lowercase, unique case-insensitively)
    pub email: String,

    /// First name
    pub first_name: String,

    /// Last name
    pub last_name: String,

    /// Whether the email address has been verified
    pub is_verified: bool,

    /// Preference: send notification emails
    pub email_notifications: bool,

    /// Preference: enable AI features
    pub ai_features_enabled: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// User account including security fields.
///
/// Only fetched by flows that need to check credentials. Not serializable.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserWithSecrets {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_verified: bool,
    pub email_notifications: bool,
    pub ai_features_enabled: bool,

    /// Argon2id password hash
    pub password_hash: String,

    /// Digest of the outstanding verification secret, if any
    pub verification_token_digest: Option<String>,
    pub verification_token_expires_at: Option<DateTime<Utc>>,

    /// Digest of the outstanding password-reset secret, if any
    pub password_reset_token_digest: Option<String>,
    pub password_reset_token_expires_at: Option<DateTime<Utc>>,

    /// The single currently-valid refresh token
    pub refresh_token: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserWithSecrets {
    /// Strips the security fields, yielding the serializable view.
    pub fn into_public(self) -> User {
        User {
            id: self.id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            is_verified: self.is_verified,
            email_notifications: self.email_notifications,
            ai_features_enabled: self.ai_features_enabled,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Email address (lowercased before storage)
    pub email: String,

    pub first_name: String,

    pub last_name: String,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,
}

impl User {
    /// Creates a new, unverified user.
    ///
    /// The unique index on `LOWER(email)` rejects duplicates; callers map
    /// that constraint violation to a conflict error.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, first_name, last_name, password_hash)
            VALUES (LOWER($1), $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(data.email)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.password_hash)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email (case-insensitive).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Finds a user by id.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email, including security fields.
    pub async fn find_by_email_with_secrets(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<UserWithSecrets>, sqlx::Error> {
        sqlx::query_as::<_, UserWithSecrets>(
            "SELECT * FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Finds a user by id, including security fields.
    pub async fn find_by_id_with_secrets(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<UserWithSecrets>, sqlx::Error> {
        sqlx::query_as::<_, UserWithSecrets>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Stores a fresh verification challenge (digest + expiry).
    ///
    /// Overwrites any outstanding challenge; only the newest secret is valid.
    pub async fn set_verification_challenge(
        pool: &PgPool,
        id: Uuid,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET verification_token_digest = $2,
                verification_token_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(digest)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Consumes a verification challenge in one atomic write.
    ///
    /// Matches the presented secret's digest against an unexpired stored
    /// challenge; on match, marks the account verified and clears both
    /// challenge fields. Returns `None` whether the digest is wrong or the
    /// challenge has expired - callers must treat both identically.
    pub async fn consume_verification_challenge(
        pool: &PgPool,
        digest: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET is_verified = TRUE,
                verification_token_digest = NULL,
                verification_token_expires_at = NULL,
                updated_at = NOW()
            WHERE verification_token_digest = $1
              AND verification_token_expires_at > NOW()
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(digest)
        .fetch_optional(pool)
        .await
    }

    /// Stores a fresh password-reset challenge (digest + expiry).
    pub async fn set_reset_challenge(
        pool: &PgPool,
        id: Uuid,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token_digest = $2,
                password_reset_token_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(digest)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Consumes a password-reset challenge in one atomic write.
    ///
    /// On a digest match against an unexpired challenge, installs the new
    /// password hash and clears both reset fields. Returns `None` for a
    /// wrong or expired secret, indistinguishably.
    pub async fn consume_reset_challenge(
        pool: &PgPool,
        digest: &str,
        new_password_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_reset_token_digest = NULL,
                password_reset_token_expires_at = NULL,
                updated_at = NOW()
            WHERE password_reset_token_digest = $1
              AND password_reset_token_expires_at > NOW()
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(digest)
        .bind(new_password_hash)
        .fetch_optional(pool)
        .await
    }

    /// Replaces the active refresh token.
    ///
    /// `None` clears it (signout). Overwriting invalidates the previous
    /// session: there is at most one live refresh token per user.
    pub async fn set_refresh_token(
        pool: &PgPool,
        id: Uuid,
        refresh_token: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(refresh_token)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Installs a new password hash (authenticated change-password flow).
    pub async fn set_password_hash(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Updates first/last name; absent fields keep their current value.
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .fetch_optional(pool)
        .await
    }

    /// Updates notification/AI preference flags; absent fields keep their
    /// current value.
    pub async fn update_preferences(
        pool: &PgPool,
        id: Uuid,
        email_notifications: Option<bool>,
        ai_features_enabled: Option<bool>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET email_notifications = COALESCE($2, email_notifications),
                ai_features_enabled = COALESCE($3, ai_features_enabled),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(email_notifications)
        .bind(ai_features_enabled)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_view_has_no_secret_fields() {
        // Serialized User must never contain credential material.
        let user = User {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            is_verified: true,
            email_notifications: true,
            ai_features_enabled: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("token"));
        assert!(!json.contains("digest"));
    }

    #[test]
    fn test_into_public_strips_secrets() {
        let with_secrets = UserWithSecrets {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            is_verified: false,
            email_notifications: true,
            ai_features_enabled: true,
            password_hash: "$argon2id$...".to_string(),
            verification_token_digest: Some("digest".to_string()),
            verification_token_expires_at: Some(Utc::now()),
            password_reset_token_digest: None,
            password_reset_token_expires_at: None,
            refresh_token: Some("jwt".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let id = with_secrets.id;
        let public = with_secrets.into_public();
        assert_eq!(public.id, id);
        assert!(!public.is_verified);
    }
}
