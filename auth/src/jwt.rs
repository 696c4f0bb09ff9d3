//! Signing and verification of the compact authentication token
//!
//! The token is a standard three-segment RS256 JWT, but the framing and the
//! verification order are owned here rather than delegated to the high-level
//! `jsonwebtoken` codec: the header segment is a fixed constant, claims are
//! checked *before* the signature (cheap structural rejects before the
//! public-key operation), and each failure maps to its own [`AuthError`]
//! variant. Only the RS256 primitive and PEM key parsing come from
//! `jsonwebtoken`.
//!
//! # Token format
//!
//! `<base64url(header)>.<base64url(claims)>.<base64url(signature)>`
//!
//! - header: `{"alg":"RS256","typ":"JWT"}`, always the same bytes
//! - claims: the user's fields plus `aud` and `exp` (Unix seconds)
//! - signature: RSA PKCS#1 v1.5 over the SHA-256 digest of
//!   `header + "." + claims`
//!
//! base64url is the unpadded variant throughout.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, crypto};
use serde::{Deserialize, Serialize};

use crate::constants::TOKEN_TTL_SECS;
use crate::error::AuthError;
use crate::user::User;

/// The header `{"alg":"RS256","typ":"JWT"}`, already encoded.
const HEADER_SEGMENT: &str = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9";

/// Claim bundle carried by a token.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    #[serde(flatten)]
    pub(crate) user: User,
    pub(crate) aud: String,
    pub(crate) exp: i64,
}

/// Expected shape of the header segment.
#[derive(Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Sign a token for `user`, valid 24 hours for the given audience.
///
/// Fails with [`AuthError::MissingUserFields`] unless `id`, `pseudo` and
/// `email` are all non-empty.
pub fn encode(key: &EncodingKey, audience: &str, user: &User) -> Result<String, AuthError> {
    encode_at(key, audience, user, Utc::now().timestamp() + TOKEN_TTL_SECS)
}

fn encode_at(
    key: &EncodingKey,
    audience: &str,
    user: &User,
    exp: i64,
) -> Result<String, AuthError> {
    if user.id.is_empty() || user.pseudo.is_empty() || user.email.is_empty() {
        return Err(AuthError::MissingUserFields);
    }

    let claims = Claims {
        user: user.clone(),
        aud: audience.to_owned(),
        exp,
    };
    let payload = serde_json::to_vec(&claims).map_err(|e| AuthError::Signing(e.to_string()))?;

    let message = format!("{HEADER_SEGMENT}.{}", URL_SAFE_NO_PAD.encode(payload));
    let signature = crypto::sign(message.as_bytes(), key, Algorithm::RS256)
        .map_err(|e| AuthError::Signing(e.to_string()))?;

    Ok(format!("{message}.{signature}"))
}

/// Verify a token against the expected audience and return the embedded user.
pub fn decode(key: &DecodingKey, audience: &str, token: &str) -> Result<User, AuthError> {
    decode_claims(key, audience, token).map(|claims| claims.user)
}

/// Like [`decode`], but keeps the full claim bundle (used by `/me` to report
/// the expiration instant).
pub(crate) fn decode_claims(
    key: &DecodingKey,
    audience: &str,
    token: &str,
) -> Result<Claims, AuthError> {
    decode_claims_at(key, audience, token, Utc::now().timestamp())
}

/// Verification proceeds in a fixed order, short-circuiting on the first
/// failure: structural checks, then audience and expiration, then the
/// signature. A token whose claims are already unacceptable never costs a
/// public-key operation.
fn decode_claims_at(
    key: &DecodingKey,
    audience: &str,
    token: &str,
    now: i64,
) -> Result<Claims, AuthError> {
    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }

    let mut parts = token.split('.');
    let (head, payload, signature) = match (parts.next(), parts.next(), parts.next(), parts.next())
    {
        (Some(head), Some(payload), Some(signature), None) => (head, payload, signature),
        _ => return Err(AuthError::MalformedSyntax),
    };

    let header: Header = URL_SAFE_NO_PAD
        .decode(head)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .ok_or(AuthError::UnsupportedHeader)?;
    if header.alg != "RS256" || header.typ != "JWT" {
        return Err(AuthError::UnsupportedHeader);
    }

    let claims: Claims = URL_SAFE_NO_PAD
        .decode(payload)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .ok_or(AuthError::MalformedPayload)?;

    if claims.aud != audience {
        return Err(AuthError::AudienceMismatch);
    }
    if claims.exp < now {
        return Err(AuthError::Expired);
    }

    // Signature covers the first two segments joined by a single period.
    let message = &token[..head.len() + 1 + payload.len()];
    let valid = crypto::verify(signature, message.as_bytes(), key, Algorithm::RS256)
        .map_err(|_| AuthError::BadSignature)?;
    if !valid {
        return Err(AuthError::BadSignature);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::Level;

    fn sign_key() -> EncodingKey {
        EncodingKey::from_rsa_pem(include_bytes!("../testdata/test_key.pem")).unwrap()
    }

    fn verify_key() -> DecodingKey {
        DecodingKey::from_rsa_pem(include_bytes!("../testdata/test_key.pub.pem")).unwrap()
    }

    fn other_verify_key() -> DecodingKey {
        DecodingKey::from_rsa_pem(include_bytes!("../testdata/test_key2.pub.pem")).unwrap()
    }

    fn bob() -> User {
        User {
            id: "6751fcc68f".to_string(),
            pseudo: "Bob".to_string(),
            email: "bob@arveto.io".to_string(),
            level: Level::Standard,
            bot: false,
            teams: ["dev"].into_iter().collect(),
        }
    }

    #[test]
    fn test_round_trip() {
        let token = encode(&sign_key(), "yolo", &bob()).unwrap();
        let user = decode(&verify_key(), "yolo", &token).unwrap();
        assert_eq!(user, bob());
    }

    #[test]
    fn test_header_segment_is_fixed() {
        let token = encode(&sign_key(), "yolo", &bob()).unwrap();
        assert!(token.starts_with("eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9."));
    }

    #[test]
    fn test_payload_wire_shape() {
        let token = encode(&sign_key(), "yolo", &bob()).unwrap();
        let payload = token.split('.').nth(1).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();

        assert_eq!(json["id"], "6751fcc68f");
        assert_eq!(json["pseudo"], "Bob");
        assert_eq!(json["email"], "bob@arveto.io");
        assert_eq!(json["level"], "standard");
        assert_eq!(json["bot"], false);
        assert_eq!(json["teams"], serde_json::json!(["dev"]));
        assert_eq!(json["aud"], "yolo");
        assert!(json["exp"].is_i64());
    }

    #[test]
    fn test_team_order_yields_identical_payload() {
        let mut a = bob();
        a.teams = ["ops", "dev", "qa"].into_iter().collect();
        let mut b = bob();
        b.teams = ["qa", "ops", "dev"].into_iter().collect();

        let exp = Utc::now().timestamp() + 60;
        let token_a = encode_at(&sign_key(), "yolo", &a, exp).unwrap();
        let token_b = encode_at(&sign_key(), "yolo", &b, exp).unwrap();
        assert_eq!(token_a, token_b);
    }

    #[test]
    fn test_missing_fields_rejected() {
        let wipes: [fn(&mut User); 3] = [
            |u| u.id.clear(),
            |u| u.pseudo.clear(),
            |u| u.email.clear(),
        ];
        for wipe in wipes {
            let mut user = bob();
            wipe(&mut user);
            let err = encode(&sign_key(), "yolo", &user).unwrap_err();
            assert_eq!(err, AuthError::MissingUserFields);
        }
    }

    #[test]
    fn test_audience_isolation() {
        let token = encode(&sign_key(), "yolo", &bob()).unwrap();
        let err = decode(&verify_key(), "other", &token).unwrap_err();
        assert_eq!(err, AuthError::AudienceMismatch);
    }

    #[test]
    fn test_expired_one_second_ago() {
        let exp = Utc::now().timestamp() - 1;
        let token = encode_at(&sign_key(), "yolo", &bob(), exp).unwrap();
        let err = decode(&verify_key(), "yolo", &token).unwrap_err();
        assert_eq!(err, AuthError::Expired);
    }

    #[test]
    fn test_expiration_boundary_inclusive() {
        // A token expiring exactly "now" still verifies: expiry is exp < now.
        let now = Utc::now().timestamp();
        let token = encode_at(&sign_key(), "yolo", &bob(), now).unwrap();
        assert!(decode_claims_at(&verify_key(), "yolo", &token, now).is_ok());
        let err = decode_claims_at(&verify_key(), "yolo", &token, now + 1).unwrap_err();
        assert_eq!(err, AuthError::Expired);
    }

    #[test]
    fn test_far_future_valid() {
        let exp = Utc::now().timestamp() + 365 * 24 * 60 * 60;
        let token = encode_at(&sign_key(), "yolo", &bob(), exp).unwrap();
        assert!(decode(&verify_key(), "yolo", &token).is_ok());
    }

    #[test]
    fn test_empty_token() {
        assert_eq!(
            decode(&verify_key(), "yolo", "").unwrap_err(),
            AuthError::EmptyToken
        );
    }

    #[test]
    fn test_wrong_segment_count() {
        assert_eq!(
            decode(&verify_key(), "yolo", "a.b").unwrap_err(),
            AuthError::MalformedSyntax
        );
        assert_eq!(
            decode(&verify_key(), "yolo", "a.b.c.d").unwrap_err(),
            AuthError::MalformedSyntax
        );
    }

    #[test]
    fn test_unsupported_header() {
        let token = encode(&sign_key(), "yolo", &bob()).unwrap();
        let (_, rest) = token.split_once('.').unwrap();

        // Right shape, wrong algorithm.
        let hs256 = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let err = decode(&verify_key(), "yolo", &format!("{hs256}.{rest}")).unwrap_err();
        assert_eq!(err, AuthError::UnsupportedHeader);

        // Not base64 at all.
        let err = decode(&verify_key(), "yolo", &format!("?!.{rest}")).unwrap_err();
        assert_eq!(err, AuthError::UnsupportedHeader);
    }

    #[test]
    fn test_garbled_payload() {
        let token = encode(&sign_key(), "yolo", &bob()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let garbled = format!("{}.e30.{}", parts[0], parts[2]); // "{}" lacks the claim fields
        assert_eq!(
            decode(&verify_key(), "yolo", &garbled).unwrap_err(),
            AuthError::MalformedPayload
        );
    }

    #[test]
    fn test_tampered_payload_fails_signature() {
        // Rewrite the payload so it still parses, keeping aud and exp intact;
        // only the signature check can catch this.
        let token = encode(&sign_key(), "yolo", &bob()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let mut claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        claims["level"] = "administrator".into();
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap()),
            parts[2]
        );
        assert_eq!(
            decode(&verify_key(), "yolo", &forged).unwrap_err(),
            AuthError::BadSignature
        );
    }

    #[test]
    fn test_tampered_signature() {
        let token = encode(&sign_key(), "yolo", &bob()).unwrap();
        let flipped = {
            let mut chars: Vec<char> = token.chars().collect();
            let last = chars.last_mut().unwrap();
            *last = if *last == 'A' { 'B' } else { 'A' };
            chars.into_iter().collect::<String>()
        };
        assert_eq!(
            decode(&verify_key(), "yolo", &flipped).unwrap_err(),
            AuthError::BadSignature
        );
    }

    #[test]
    fn test_wrong_public_key() {
        let token = encode(&sign_key(), "yolo", &bob()).unwrap();
        assert_eq!(
            decode(&other_verify_key(), "yolo", &token).unwrap_err(),
            AuthError::BadSignature
        );
    }
}
