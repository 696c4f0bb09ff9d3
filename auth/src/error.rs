//! Authentication error taxonomy
//!
//! Every failure is terminal for the request: a token is either valid or it
//! is not, and retrying with the same token cannot change the outcome.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Authentication and token-verification errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Issuance attempted for a user without an id, a pseudo or an email
    #[error("user needs an id, a pseudo and an email")]
    MissingUserFields,

    /// The presented token is the empty string
    #[error("empty token")]
    EmptyToken,

    /// The token is not three dot-separated segments
    #[error("malformed token syntax")]
    MalformedSyntax,

    /// The header segment is not the supported RS256/JWT header
    #[error("unsupported token header")]
    UnsupportedHeader,

    /// The payload segment does not decode to the expected claims
    #[error("malformed token payload")]
    MalformedPayload,

    /// The token was issued for another audience
    #[error("token issued for another audience")]
    AudienceMismatch,

    /// The token is past its validity window
    #[error("token expired")]
    Expired,

    /// Cryptographic signature verification failed
    #[error("bad token signature")]
    BadSignature,

    /// No credential present where one is required
    #[error("not logged in")]
    NotLogged,

    /// Valid credential, but its level is below the route minimum
    #[error("insufficient level")]
    InsufficientLevel,

    /// The signing key could not produce a token (issuer-side only)
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl AuthError {
    /// HTTP status this error maps to.
    ///
    /// Verification failures are all 400: an audience mismatch is
    /// indistinguishable from malformed input without leaking which audience
    /// was expected, and a signature failure never reveals more detail.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotLogged => StatusCode::UNAUTHORIZED,
            Self::InsufficientLevel => StatusCode::FORBIDDEN,
            Self::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::NotLogged.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InsufficientLevel.status(), StatusCode::FORBIDDEN);
        for err in [
            AuthError::MissingUserFields,
            AuthError::EmptyToken,
            AuthError::MalformedSyntax,
            AuthError::UnsupportedHeader,
            AuthError::MalformedPayload,
            AuthError::AudienceMismatch,
            AuthError::Expired,
            AuthError::BadSignature,
        ] {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }
}
