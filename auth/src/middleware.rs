//! The per-route minimum-level guard
//!
//! Applied once per registered route by [`App::into_router`](crate::App).
//! Each request is checked in isolation: extract a credential, verify it,
//! compare levels, and hand an [`AuthSession`] to the inner handler.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::CookieJar;

use crate::app::AppContext;
use crate::error::AuthError;
use crate::extract;
use crate::jwt;
use crate::session::AuthSession;
use crate::user::Level;

/// State for one gated route: the shared app context plus that route's
/// minimum level.
#[derive(Clone)]
pub(crate) struct LevelGate {
    pub(crate) app: Arc<AppContext>,
    pub(crate) min: Level,
}

/// Gate a request on the route's minimum level.
///
/// - no credential, minimum [`Level::No`]: pass through as anonymous
/// - no credential otherwise: 401
/// - credential that fails verification: 400, even on anonymous routes
/// - verified user below the minimum: 403
pub(crate) async fn require_level(
    State(gate): State<LevelGate>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let token = extract::credential(request.headers(), &jar, &gate.app.cookie);

    let session = match token {
        None if gate.min == Level::No => AuthSession::Anonymous,
        None => {
            tracing::warn!(path = %request.uri().path(), "no credential presented");
            return gate.app.render(&AuthError::NotLogged);
        }
        Some(token) => match jwt::decode(&gate.app.key, &gate.app.audience, &token) {
            Ok(user) if user.level < gate.min => {
                tracing::warn!(
                    user = %user.id,
                    path = %request.uri().path(),
                    "level below route minimum",
                );
                return gate.app.render(&AuthError::InsufficientLevel);
            }
            Ok(user) => AuthSession::Authenticated(user),
            Err(err) => {
                tracing::warn!(path = %request.uri().path(), error = %err, "invalid token");
                return gate.app.render(&err);
            }
        },
    };

    request.extensions_mut().insert(session);
    next.run(request).await
}
