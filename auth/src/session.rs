//! Authenticated-request context
//!
//! The level gate stores an [`AuthSession`] in the request extensions for
//! every request it lets through. Handlers recover it with an extractor and
//! must handle both arms; there is no nullable user anywhere.

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::error::AuthError;
use crate::user::User;

/// Authentication state of a request that passed the level gate.
#[derive(Debug, Clone)]
pub enum AuthSession {
    /// A verified token asserted this user.
    Authenticated(User),
    /// No credential was presented; only reachable on routes gated at
    /// [`Level::No`](crate::user::Level::No).
    Anonymous,
}

impl AuthSession {
    /// The authenticated user, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Anonymous => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

/// Rejection for session extractors.
pub enum SessionRejection {
    /// The level-gate middleware was not applied to this route.
    MissingGate,
    /// The request is anonymous but the handler requires a user.
    NotLogged,
}

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        match self {
            Self::MissingGate => {
                (StatusCode::INTERNAL_SERVER_ERROR, "level gate not applied").into_response()
            }
            Self::NotLogged => AuthError::NotLogged.into_response(),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthSession {
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthSession>()
            .cloned()
            .ok_or(SessionRejection::MissingGate)
    }
}

/// Extractor for handlers that only make sense with an authenticated user.
///
/// Rejects anonymous requests with 401. On routes gated above
/// [`Level::No`](crate::user::Level::No) the gate has already guaranteed a
/// user, so the rejection is unreachable there.
pub struct CurrentUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match AuthSession::from_request_parts(parts, state).await? {
            AuthSession::Authenticated(user) => Ok(Self(user)),
            AuthSession::Anonymous => Err(SessionRejection::NotLogged),
        }
    }
}
