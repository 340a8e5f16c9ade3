/// Refresh-token cookie handling
///
/// The refresh token travels only in an HttpOnly cookie so browser scripts
/// can never read it. The cookie is `SameSite=Strict`, scoped to the token
/// refresh path family, and marked `Secure` in production.

use axum::http::HeaderMap;
use chrono::Duration;

/// Name of the refresh-token cookie
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Builds the `Set-Cookie` value that installs a refresh token.
pub fn refresh_cookie(token: &str, max_age: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{REFRESH_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/v1/auth; Max-Age={}",
        max_age.num_seconds()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Builds the `Set-Cookie` value that removes the refresh cookie.
pub fn clear_refresh_cookie(secure: bool) -> String {
    let mut cookie =
        format!("{REFRESH_COOKIE}=; HttpOnly; SameSite=Strict; Path=/v1/auth; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Extracts the refresh token from a request's `Cookie` header, if present.
pub fn refresh_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == REFRESH_COOKIE && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    #[test]
    fn test_refresh_cookie_attributes() {
        let cookie = refresh_cookie("abc.def.ghi", Duration::days(7), false);
        assert!(cookie.starts_with("refresh_token=abc.def.ghi;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_refresh_cookie_secure_in_production() {
        let cookie = refresh_cookie("tok", Duration::days(7), true);
        assert!(cookie.contains("; Secure"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_refresh_cookie(false);
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.starts_with("refresh_token=;"));
    }

    #[test]
    fn test_extract_token_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "theme=dark; refresh_token=tok123; lang=en".parse().unwrap());
        assert_eq!(refresh_token_from_headers(&headers), Some("tok123".to_string()));
    }

    #[test]
    fn test_extract_token_missing_or_empty() {
        let mut headers = HeaderMap::new();
        assert_eq!(refresh_token_from_headers(&headers), None);

        headers.insert(COOKIE, "refresh_token=".parse().unwrap());
        assert_eq!(refresh_token_from_headers(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "theme=dark".parse().unwrap());
        assert_eq!(refresh_token_from_headers(&headers), None);
    }
}
