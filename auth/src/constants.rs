// =============================================================================
// Cookie
// =============================================================================

/// Default name of the cookie carrying the token
pub const DEFAULT_COOKIE_NAME: &str = "auth";

/// Cookie lifetime in seconds (matches the token validity window)
pub const COOKIE_MAX_AGE_SECS: i64 = 24 * 60 * 60;

/// Cookie value set on logout, with a zero max-age
pub const LOGOUT_SENTINEL: &str = "none";

// =============================================================================
// Token
// =============================================================================

/// Token validity window in seconds
pub const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;
