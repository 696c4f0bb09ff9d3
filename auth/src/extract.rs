//! Pulling a credential out of an incoming request
//!
//! Fixed precedence: the `Authorization` header first, then the configured
//! cookie. Anything else is anonymous.

use axum::http::{HeaderMap, header};
use axum_extra::extract::CookieJar;

/// Token carried by the `Authorization` header, if any.
///
/// A leading `Bearer` prefix is stripped (case-sensitive: `bearer` is not a
/// prefix and ends up part of the returned value), then surrounding
/// whitespace is trimmed. An empty remainder means no credential.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

/// Extract a token from the request: bearer header, else the named cookie.
pub fn credential(headers: &HeaderMap, jar: &CookieJar, cookie: &str) -> Option<String> {
    if let Some(token) = bearer_token(headers) {
        return Some(token.to_owned());
    }
    jar.get(cookie).map(|c| c.value().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(auth: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        headers
    }

    #[test]
    fn test_bearer_prefix_stripped() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("Bearer   spaced  ")), Some("spaced"));
    }

    #[test]
    fn test_no_prefix_uses_whole_value() {
        assert_eq!(bearer_token(&headers("abc.def.ghi")), Some("abc.def.ghi"));
    }

    #[test]
    fn test_prefix_is_case_sensitive() {
        assert_eq!(bearer_token(&headers("bearer abc")), Some("bearer abc"));
    }

    #[test]
    fn test_empty_or_absent() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&headers("Bearer   ")), None);
        assert_eq!(bearer_token(&headers("   ")), None);
    }

    #[test]
    fn test_header_takes_precedence_over_cookie() {
        let jar =
            CookieJar::default().add(axum_extra::extract::cookie::Cookie::new("auth", "tok-c"));
        assert_eq!(
            credential(&headers("Bearer tok-h"), &jar, "auth"),
            Some("tok-h".to_owned())
        );
        assert_eq!(credential(&HeaderMap::new(), &jar, "auth"), Some("tok-c".to_owned()));
        assert_eq!(credential(&HeaderMap::new(), &jar, "other"), None);
    }
}
