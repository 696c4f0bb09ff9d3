//! Relying-application router builder
//!
//! An [`App`] owns everything a relying service needs to verify tokens it
//! did not create: the provider's public key, the expected audience, the
//! cookie configuration, and an explicit list of
//! `(path, minimum level, handler)` registrations. It is assembled once at
//! startup and consumed into an immutable [`axum::Router`]; there is no
//! global state and nothing to mutate afterwards.
//!
//! The built router also carries the built-in endpoints:
//!
//! | route | behavior |
//! |---|---|
//! | `GET /login` | token via `jwt` query: verify, set the auth cookie, redirect to `r`; without a token, bounce to the provider's auth page |
//! | `GET /logout` | overwrite the cookie with an expired sentinel, redirect |
//! | `GET /me` | decoded user plus expiration as JSON, or `null` without a cookie |
//! | `DELETE /forget` | administrator only: verify the `jwt` query parameter and invoke the forget hook |
//! | `GET /avatar` | forward to the provider's avatar endpoint |

use std::sync::Arc;

use anyhow::Context as _;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{MethodRouter, any, get};
use axum::{Router, middleware};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use jsonwebtoken::DecodingKey;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::constants::{COOKIE_MAX_AGE_SECS, DEFAULT_COOKIE_NAME, LOGOUT_SENTINEL};
use crate::error::AuthError;
use crate::jwt;
use crate::middleware::{LevelGate, require_level};
use crate::user::{Level, User};

/// Renders an [`AuthError`] into the HTTP response body.
pub type ErrorRenderer = Arc<dyn Fn(&AuthError) -> Response + Send + Sync>;

/// Callback invoked by `DELETE /forget` with the user to forget.
///
/// A notification hook for external account-deletion workflows; it does not
/// revoke anything.
pub type ForgetHook = Arc<dyn Fn(&User) + Send + Sync>;

/// Shared, immutable state behind every handler of a built router.
pub(crate) struct AppContext {
    pub(crate) key: DecodingKey,
    pub(crate) audience: String,
    pub(crate) cookie: String,
    pub(crate) provider: Option<Url>,
    pub(crate) error: ErrorRenderer,
    pub(crate) forget: Option<ForgetHook>,
}

impl AppContext {
    pub(crate) fn render(&self, err: &AuthError) -> Response {
        (self.error)(err)
    }
}

/// A relying application under construction.
pub struct App {
    key: DecodingKey,
    audience: String,
    cookie: String,
    provider: Option<Url>,
    error: ErrorRenderer,
    forget: Option<ForgetHook>,
    routes: Vec<(String, Level, MethodRouter)>,
}

impl App {
    /// Build an app from a locally held PEM public key.
    pub fn new(audience: impl Into<String>, public_key_pem: &[u8]) -> anyhow::Result<Self> {
        let key = DecodingKey::from_rsa_pem(public_key_pem)
            .context("relying app needs a valid RSA public key PEM")?;
        Ok(Self {
            key,
            audience: audience.into(),
            cookie: DEFAULT_COOKIE_NAME.to_owned(),
            provider: None,
            error: default_error_renderer(),
            forget: None,
            routes: Vec::new(),
        })
    }

    /// Build an app by fetching the provider's public key over HTTP.
    ///
    /// One-shot startup fetch of `<provider>/publickey`; the provider URL is
    /// also kept for the login and avatar redirects.
    pub async fn from_provider(
        audience: impl Into<String>,
        provider: &str,
    ) -> anyhow::Result<Self> {
        let base = normalize_provider(provider)?;
        let url = base
            .join("publickey")
            .context("cannot derive the provider publickey URL")?;
        let pem = reqwest::get(url.clone())
            .await
            .and_then(reqwest::Response::error_for_status)
            .with_context(|| format!("fetching the provider public key from {url}"))?
            .text()
            .await
            .context("reading the provider public key body")?;

        tracing::debug!(provider = %base, "fetched provider public key");
        let mut app = Self::new(audience, pem.as_bytes())?;
        app.provider = Some(base);
        Ok(app)
    }

    /// Point login and avatar redirects at a provider without fetching its
    /// key (the key was already supplied to [`App::new`]).
    pub fn with_provider(mut self, provider: &str) -> anyhow::Result<Self> {
        self.provider = Some(normalize_provider(provider)?);
        Ok(self)
    }

    /// Change the name of the cookie carrying the token (default `auth`).
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie = name.into();
        self
    }

    /// Replace the error renderer used for every rejected request.
    pub fn error_renderer(mut self, renderer: ErrorRenderer) -> Self {
        self.error = renderer;
        self
    }

    /// Register the forget hook invoked by `DELETE /forget`.
    pub fn on_forget(mut self, hook: impl Fn(&User) + Send + Sync + 'static) -> Self {
        self.forget = Some(Arc::new(hook));
        self
    }

    /// Register a handler reachable only at `level` or above.
    pub fn route(mut self, path: impl Into<String>, level: Level, handler: MethodRouter) -> Self {
        self.routes.push((path.into(), level, handler));
        self
    }

    /// Consume the registrations into the final router.
    pub fn into_router(self) -> Router {
        let ctx = Arc::new(AppContext {
            key: self.key,
            audience: self.audience,
            cookie: self.cookie,
            provider: self.provider,
            error: self.error,
            forget: self.forget,
        });

        let mut router = Router::new();
        for (path, level, handler) in self.routes {
            let gate = LevelGate {
                app: ctx.clone(),
                min: level,
            };
            router = router.route(
                &path,
                handler.route_layer(middleware::from_fn_with_state(gate, require_level)),
            );
        }

        let forget_gate = LevelGate {
            app: ctx.clone(),
            min: Level::Administrator,
        };
        let builtin = Router::new()
            .route("/login", get(login))
            .route("/logout", get(logout))
            .route("/me", get(me))
            .route(
                "/forget",
                any(forget).route_layer(middleware::from_fn_with_state(
                    forget_gate,
                    require_level,
                )),
            )
            .route("/avatar", get(avatar))
            .with_state(ctx);

        router.merge(builtin)
    }
}

fn default_error_renderer() -> ErrorRenderer {
    Arc::new(|err: &AuthError| (err.status(), err.to_string()).into_response())
}

/// Normalize a provider base URL: strip query and fragment, keep a trailing
/// slash so relative joins land under the provider's mount point.
fn normalize_provider(provider: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(provider).context("invalid provider URL")?;
    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

// =============================================================================
// Built-in handlers
// =============================================================================

#[derive(Deserialize)]
struct LoginQuery {
    jwt: Option<String>,
    r: Option<String>,
}

/// Return location from the `r` query parameter, defaulting to `/`.
fn return_location(r: Option<String>) -> String {
    match r {
        Some(to) if !to.is_empty() => to,
        _ => "/".to_owned(),
    }
}

async fn login(
    State(app): State<Arc<AppContext>>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> Response {
    let to = return_location(query.r);

    let Some(token) = query.jwt.filter(|jwt| !jwt.is_empty()) else {
        // No token yet: bounce to the provider's auth page, which redirects
        // back here with one.
        return match &app.provider {
            Some(base) => match base.join("auth") {
                Ok(mut url) => {
                    url.query_pairs_mut()
                        .append_pair("app", &app.audience)
                        .append_pair("r", &to);
                    temporary_redirect(url.as_str())
                }
                Err(_) => app.render(&AuthError::NotLogged),
            },
            None => app.render(&AuthError::NotLogged),
        };
    };

    match jwt::decode(&app.key, &app.audience, &token) {
        Ok(user) => {
            tracing::debug!(user = %user.id, "login completed");
            let cookie = auth_cookie(app.cookie.clone(), token);
            (jar.add(cookie), redirect_with_fallback(&to)).into_response()
        }
        Err(err) => app.render(&err),
    }
}

#[derive(Deserialize)]
struct LogoutQuery {
    r: Option<String>,
}

async fn logout(
    State(app): State<Arc<AppContext>>,
    jar: CookieJar,
    Query(query): Query<LogoutQuery>,
) -> Response {
    let cookie = Cookie::build((app.cookie.clone(), LOGOUT_SENTINEL))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::ZERO)
        .build();
    let to = return_location(query.r);
    (jar.add(cookie), temporary_redirect(&to)).into_response()
}

/// `/me` response body: the user plus the token's expiration instant.
#[derive(Serialize)]
struct MeResponse {
    #[serde(flatten)]
    user: User,
    expiration: DateTime<Utc>,
}

async fn me(State(app): State<Arc<AppContext>>, jar: CookieJar) -> Response {
    // Cookie only: this endpoint exists for browser clients.
    let Some(cookie) = jar.get(&app.cookie) else {
        return Json(serde_json::Value::Null).into_response();
    };

    match jwt::decode_claims(&app.key, &app.audience, cookie.value()) {
        Ok(claims) => Json(MeResponse {
            expiration: DateTime::from_timestamp(claims.exp, 0).unwrap_or_default(),
            user: claims.user,
        })
        .into_response(),
        Err(err) => app.render(&err),
    }
}

#[derive(Deserialize)]
struct ForgetQuery {
    jwt: Option<String>,
}

async fn forget(
    State(app): State<Arc<AppContext>>,
    method: Method,
    Query(query): Query<ForgetQuery>,
) -> Response {
    if method != Method::DELETE {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "DELETE")],
            "DELETE required",
        )
            .into_response();
    }

    match jwt::decode(
        &app.key,
        &app.audience,
        query.jwt.as_deref().unwrap_or_default(),
    ) {
        Ok(user) => {
            tracing::debug!(user = %user.id, "forget requested");
            if let Some(hook) = &app.forget {
                hook(&user);
            }
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => app.render(&err),
    }
}

async fn avatar(State(app): State<Arc<AppContext>>, uri: Uri) -> Response {
    let Some(base) = &app.provider else {
        return (StatusCode::NOT_FOUND, "no provider configured").into_response();
    };
    match base.join("avatar") {
        Ok(mut url) => {
            url.set_query(uri.query());
            temporary_redirect(url.as_str())
        }
        Err(_) => (StatusCode::NOT_FOUND, "no provider configured").into_response(),
    }
}

// =============================================================================
// Response helpers
// =============================================================================

fn auth_cookie(name: String, token: String) -> Cookie<'static> {
    Cookie::build((name, token))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(COOKIE_MAX_AGE_SECS))
        .build()
}

fn temporary_redirect(to: &str) -> Response {
    match HeaderValue::from_str(to) {
        Ok(location) => {
            (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)]).into_response()
        }
        Err(_) => (StatusCode::BAD_REQUEST, "invalid redirect target").into_response(),
    }
}

/// Redirect both ways at once: a `Location` header for well-behaved clients
/// and an HTML body with a script plus a plain link for the rest.
fn redirect_with_fallback(to: &str) -> Response {
    let Ok(location) = HeaderValue::from_str(to) else {
        return (StatusCode::BAD_REQUEST, "invalid redirect target").into_response();
    };
    let script_target = serde_json::to_string(to).unwrap_or_else(|_| "\"/\"".to_owned());
    let href = html_escape(to);
    let body = format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
         <script>document.location.replace({script_target});</script></head>\
         <body><a href=\"{href}\">Redirect: {href}</a></body></html>"
    );
    (
        StatusCode::TEMPORARY_REDIRECT,
        [(header::LOCATION, location)],
        Html(body),
    )
        .into_response()
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
