//! The token issuer
//!
//! A [`Provider`] is the trusted party holding the private signing key. It
//! signs tokens for authenticated users on demand and serves its public key
//! as PEM so relying apps can verify them offline.
//!
//! Key generation and storage are someone else's job: constructors load PEM
//! material that already exists (see the repository README for the `openssl`
//! invocation that produces a keypair).

use std::path::Path;

use anyhow::Context as _;
use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use jsonwebtoken::EncodingKey;

use crate::error::AuthError;
use crate::jwt;
use crate::user::User;

/// The issuer: a private RSA key plus the matching public key in PEM form.
pub struct Provider {
    key: EncodingKey,
    public_pem: String,
}

impl Provider {
    /// Build a provider from PEM key material already in memory.
    pub fn new(private_key_pem: &[u8], public_key_pem: impl Into<String>) -> anyhow::Result<Self> {
        let key = EncodingKey::from_rsa_pem(private_key_pem)
            .context("provider needs a valid RSA private key PEM")?;
        Ok(Self {
            key,
            public_pem: public_key_pem.into(),
        })
    }

    /// Build a provider by reading both PEM files.
    pub fn from_files(
        private_key: impl AsRef<Path>,
        public_key: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        let private_pem = std::fs::read(private_key.as_ref())
            .with_context(|| format!("reading {}", private_key.as_ref().display()))?;
        let public_pem = std::fs::read_to_string(public_key.as_ref())
            .with_context(|| format!("reading {}", public_key.as_ref().display()))?;
        tracing::debug!(key = %private_key.as_ref().display(), "loaded signing key");
        Self::new(&private_pem, public_pem)
    }

    /// Sign a token asserting `user`, scoped to the given audience, valid 24
    /// hours.
    pub fn issue(&self, audience: &str, user: &User) -> Result<String, AuthError> {
        jwt::encode(&self.key, audience, user)
    }

    /// The public verification key, PEM-encoded.
    pub fn public_key_pem(&self) -> &str {
        &self.public_pem
    }

    /// Router serving `GET /publickey` for relying apps.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/publickey", get(serve_public_key))
            .with_state(self.public_pem.clone())
    }
}

async fn serve_public_key(State(pem): State<String>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/x-pem-file")], pem)
}
