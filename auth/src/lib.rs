//! Stateless, level-gated token authentication for axum services.
//!
//! A trusted [`Provider`] holds an RSA private key and signs compact tokens
//! asserting a user's identity and privilege level. A relying [`App`] holds
//! only the matching public key: it verifies tokens without ever contacting
//! the provider and gates individual routes by a minimum [`Level`].
//!
//! # Module structure
//!
//! - [`user`]: identity, team membership and privilege level
//! - [`jwt`]: signing and verification of the compact token
//! - [`extract`]: pulling a credential out of an incoming request
//! - [`session`]: the `Authenticated | Anonymous` request context
//! - [`middleware`]: the per-route minimum-level guard
//! - [`app`]: relying-application router builder and built-in endpoints
//! - [`provider`]: the token issuer

pub mod app;
pub mod constants;
pub mod error;
pub mod extract;
pub mod jwt;
pub mod middleware;
pub mod provider;
pub mod session;
pub mod user;

pub use app::{App, ErrorRenderer, ForgetHook};
pub use error::AuthError;
pub use provider::Provider;
pub use session::{AuthSession, CurrentUser};
pub use user::{Level, Teams, User};
