/// One-time secrets and signed session tokens
///
/// Two families of credentials live here:
///
/// - **Opaque secrets**: random byte strings mailed to the user for account
///   verification and password reset. Only a SHA-256 digest is ever stored;
///   presenting the plaintext later proves possession. Digest comparison is
///   constant-time.
/// - **Session tokens**: HS256-signed JWTs carrying a subject id and expiry.
///   The access token authorizes API calls; the refresh token (signed with a
///   separate secret) mints new access tokens.
///
/// Verification of a session token fails closed: invalid signature, wrong
/// secret, malformed token, and expiry all collapse to `None` so callers
/// cannot leak which condition failed.
///
/// # Example
///
/// ```
/// use taskipline_shared::auth::token::{issue_opaque_secret, digest_secret, digests_equal};
///
/// let (plaintext, digest) = issue_opaque_secret(32);
/// assert!(digests_equal(&digest_secret(&plaintext), &digest));
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Byte length of account-verification secrets
pub const VERIFICATION_TOKEN_BYTES: usize = 32;

/// Byte length of password-reset secrets
pub const PASSWORD_RESET_TOKEN_BYTES: usize = 32;

/// Issuer claim stamped into every session token
const ISSUER: &str = "taskipline";

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Failed to sign a session token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// A duration string could not be parsed
    #[error("Invalid duration {0:?}: expected forms like \"30s\", \"15m\", \"12h\", \"7d\"")]
    InvalidDuration(String),
}

/// Generates a random opaque secret.
///
/// Returns `(plaintext, digest)`: the hex-encoded plaintext goes into the
/// email link and is never stored; the SHA-256 hex digest is what the
/// database keeps. Validating a presented secret means digesting it and
/// comparing against the stored digest with [`digests_equal`].
pub fn issue_opaque_secret(byte_length: usize) -> (String, String) {
    let mut bytes = vec![0u8; byte_length];
    rand::thread_rng().fill_bytes(&mut bytes);

    let plaintext = hex::encode(bytes);
    let digest = digest_secret(&plaintext);

    (plaintext, digest)
}

/// Computes the hex-encoded SHA-256 digest of a presented secret.
///
/// Deterministic: the same plaintext always produces the same digest.
pub fn digest_secret(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time digest comparison.
///
/// Always walks the full length of both inputs so the comparison time does
/// not depend on where they first differ.
pub fn digests_equal(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut diff = 0u8;
    for i in 0..a_bytes.len() {
        diff |= a_bytes[i] ^ b_bytes[i];
    }

    diff == 0
}

/// Claims embedded in a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user id
    pub sub: Uuid,

    /// Issuer - always "taskipline"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Creates claims for the given subject with the given lifetime.
    pub fn new(user_id: Uuid, lifetime: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }
}

/// Signs a session token for `user_id` with the given secret and lifetime.
pub fn issue_session_token(
    user_id: Uuid,
    secret: &str,
    lifetime: Duration,
) -> Result<String, TokenError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());
    let claims = Claims::new(user_id, lifetime);

    encode(&header, &claims, &key)
        .map_err(|e| TokenError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies a session token and extracts its claims.
///
/// Returns `None` for any failure - bad signature, wrong secret, malformed
/// token, wrong issuer, or expiry. Callers must not branch on why.
pub fn verify_session_token(token: &str, secret: &str) -> Option<Claims> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;

    decode::<Claims>(token, &key, &validation)
        .ok()
        .map(|data| data.claims)
}

/// Parses a compact duration string into a `chrono::Duration`.
///
/// Recognized units: `s` (seconds), `m` (minutes), `h` (hours), `d` (days).
/// Used for the configurable access/refresh token lifetimes (e.g. `"15m"`,
/// `"7d"`).
pub fn parse_duration(input: &str) -> Result<Duration, TokenError> {
    let input = input.trim();
    if input.len() < 2 {
        return Err(TokenError::InvalidDuration(input.to_string()));
    }

    let (value, unit) = input.split_at(input.len() - 1);
    let value: i64 = value
        .parse()
        .map_err(|_| TokenError::InvalidDuration(input.to_string()))?;

    if value <= 0 {
        return Err(TokenError::InvalidDuration(input.to_string()));
    }

    match unit {
        "s" => Ok(Duration::seconds(value)),
        "m" => Ok(Duration::minutes(value)),
        "h" => Ok(Duration::hours(value)),
        "d" => Ok(Duration::days(value)),
        _ => Err(TokenError::InvalidDuration(input.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_issue_opaque_secret() {
        let (plaintext1, digest1) = issue_opaque_secret(VERIFICATION_TOKEN_BYTES);
        let (plaintext2, digest2) = issue_opaque_secret(VERIFICATION_TOKEN_BYTES);

        // 32 bytes hex-encoded
        assert_eq!(plaintext1.len(), 64);
        // SHA-256 hex
        assert_eq!(digest1.len(), 64);

        assert_ne!(plaintext1, plaintext2);
        assert_ne!(digest1, digest2);
    }

    #[test]
    fn test_digest_is_deterministic() {
        let (plaintext, digest) = issue_opaque_secret(32);

        assert_eq!(digest_secret(&plaintext), digest);
        assert_eq!(digest_secret(&plaintext), digest_secret(&plaintext));
        assert_ne!(digest_secret("something else"), digest);
    }

    #[test]
    fn test_digests_equal() {
        assert!(digests_equal("abcdef", "abcdef"));
        assert!(digests_equal("", ""));
        assert!(!digests_equal("abcdef", "abcdeg"));
        assert!(!digests_equal("abc", "abcdef"));
    }

    #[test]
    fn test_tampered_secret_does_not_match() {
        let (plaintext, digest) = issue_opaque_secret(32);
        let mut tampered = plaintext.clone();
        tampered.replace_range(0..1, if &plaintext[0..1] == "a" { "b" } else { "a" });

        assert!(!digests_equal(&digest_secret(&tampered), &digest));
    }

    #[test]
    fn test_session_token_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = issue_session_token(user_id, SECRET, Duration::minutes(15)).unwrap();

        let claims = verify_session_token(&token, SECRET).expect("token should verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "taskipline");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_fails_closed() {
        let token = issue_session_token(Uuid::new_v4(), SECRET, Duration::minutes(15)).unwrap();

        assert!(verify_session_token(&token, "another-secret-that-is-wrong!!").is_none());
    }

    #[test]
    fn test_expired_token_fails_closed() {
        // Negative lifetime: already expired
        let token = issue_session_token(Uuid::new_v4(), SECRET, Duration::seconds(-3600)).unwrap();

        assert!(verify_session_token(&token, SECRET).is_none());
    }

    #[test]
    fn test_garbage_token_fails_closed() {
        assert!(verify_session_token("not.a.jwt", SECRET).is_none());
        assert!(verify_session_token("", SECRET).is_none());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::seconds(30));
        assert_eq!(parse_duration("15m").unwrap(), Duration::minutes(15));
        assert_eq!(parse_duration("12h").unwrap(), Duration::hours(12));
        assert_eq!(parse_duration("7d").unwrap(), Duration::days(7));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        for bad in ["", "m", "15", "15w", "-5m", "0d", "fifteenm"] {
            assert!(parse_duration(bad).is_err(), "{:?} should not parse", bad);
        }
    }
}
