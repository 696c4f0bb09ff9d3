//! Demo wiring: level-gated pages, a local demo identity provider, startup
//!
//! The same process plays both roles. The relying app lives at the root and
//! trusts tokens scoped to the configured audience; a demo identity provider
//! is mounted under `/idp/` and issues tokens for a sample user, so the full
//! login flow works without any external service.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use axum::Router;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use clap::Parser as _;
use latchkey::{App, AuthSession, Level, Provider, User};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::cli::{Cli, ENV_LOG};

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    let provider = Arc::new(
        Provider::from_files(&cli.private_key, &cli.public_key)
            .context("loading the signing keypair")?,
    );
    let idp_base = format!("http://{}:{}/idp/", cli.host, cli.port);

    let app = App::new(&cli.audience, provider.public_key_pem().as_bytes())?
        .with_provider(&idp_base)?
        .on_forget(|user: &User| tracing::info!(user = %user.pseudo, "forget requested"))
        .route("/", Level::No, get(home))
        .route("/visitor", Level::Visitor, get(visitor))
        .route("/admin", Level::Administrator, get(admin));

    let router = app
        .into_router()
        .nest("/idp", idp_router(provider, cli.audience))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}

fn init_logging() {
    let filter = std::env::var(ENV_LOG)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_owned());

    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .with_env_filter(filter)
        .init();
}

// =============================================================================
// Pages
// =============================================================================

async fn home(session: AuthSession) -> Html<String> {
    Html(match session.user() {
        Some(user) => format!(
            "You are logged as <b>{}</b> (level {:?}, teams: {}).<br>\n\
             <a href=\"/me\">Who am I</a> | <a href=\"/visitor\">Visitor page</a> | \
             <a href=\"/admin\">Admin page</a> | <a href=\"/logout\">Logout</a>",
            user.pseudo,
            user.level,
            user.teams.iter().collect::<Vec<_>>().join(", "),
        ),
        None => "You are not logged.<br>\n<a href=\"/login\">Login</a>".to_owned(),
    })
}

async fn visitor() -> &'static str {
    "You can access here because you have at least visitor level."
}

async fn admin() -> &'static str {
    "You can access here because you have administrator level."
}

// =============================================================================
// Demo identity provider
// =============================================================================

#[derive(Clone)]
struct IdpState {
    provider: Arc<Provider>,
    audience: String,
}

fn idp_router(provider: Arc<Provider>, audience: String) -> Router {
    let state = IdpState {
        provider: provider.clone(),
        audience,
    };
    provider
        .router()
        .merge(Router::new().route("/auth", get(issue_demo_token)).with_state(state))
}

#[derive(Deserialize)]
struct AuthQuery {
    app: Option<String>,
    r: Option<String>,
    level: Option<Level>,
}

/// Demo-only auth page: no password prompt, just issue a token for the
/// sample user at the requested level and bounce back to the app's login
/// endpoint.
async fn issue_demo_token(
    State(idp): State<IdpState>,
    Query(query): Query<AuthQuery>,
) -> Response {
    if let Some(app) = &query.app
        && app != &idp.audience
    {
        tracing::warn!(requested = %app, "unknown audience requested, issuing for the configured one");
    }

    let user = demo_user(query.level.unwrap_or(Level::Standard));
    match idp.provider.issue(&idp.audience, &user) {
        Ok(token) => {
            let login_query = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("jwt", &token)
                .append_pair("r", query.r.as_deref().unwrap_or("/"))
                .finish();
            Redirect::temporary(&format!("/login?{login_query}")).into_response()
        }
        Err(err) => err.into_response(),
    }
}

fn demo_user(level: Level) -> User {
    User {
        id: "6751fcc68f".to_owned(),
        pseudo: "Demo".to_owned(),
        email: "demo@example.com".to_owned(),
        level,
        bot: false,
        teams: ["dev"].into_iter().collect(),
    }
}
