//! Credential claim decoding and validity checks.
//!
//! Credentials are JWT-shaped opaque strings. This module decodes the
//! embedded claim set without verifying the cryptographic signature —
//! verification is the issuing server's responsibility. A credential that
//! fails to decode is treated by every caller as if no credential were
//! present.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

/// Role claim embedded in every credential.
///
/// Unrecognized roles fail decoding, so a credential carrying one is
/// treated as absent rather than granted a default role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Instructor => "instructor",
        }
    }

    /// Parse a stored role hint. Unknown values return `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Role::Student),
            "instructor" => Some(Role::Instructor),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded claim set of an access credential.
///
/// Derived on demand, never persisted; the credential string remains the
/// source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier.
    pub sub: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    /// Expiry as epoch seconds.
    pub exp: i64,
}

/// Decode the claim set embedded in a credential.
///
/// Splits the three dot-separated segments and decodes the payload segment
/// as base64url JSON. The signature segment is carried but never verified.
pub fn decode(credential: &str) -> Result<Claims> {
    let segments: Vec<&str> = credential.split('.').collect();
    if segments.len() != 3 {
        return Err(AuthError::InvalidCredential(
            "expected three dot-separated segments".to_string(),
        ));
    }

    let payload = URL_SAFE_NO_PAD.decode(segments[1]).map_err(|e| {
        AuthError::InvalidCredential(format!("payload is not base64url: {}", e))
    })?;

    serde_json::from_slice(&payload)
        .map_err(|e| AuthError::InvalidCredential(format!("payload is not a claim set: {}", e)))
}

/// Check whether a credential is still usable under the given clock-skew
/// tolerance.
///
/// A credential within `skew` of its nominal expiry is still valid.
/// Undecodable credentials are never valid.
pub fn is_valid(credential: &str, skew: Duration) -> bool {
    match decode(credential) {
        Ok(claims) => claims.exp.saturating_mul(1000) > now_millis() - skew.as_millis() as i64,
        Err(_) => false,
    }
}

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

pub(crate) fn now_secs() -> i64 {
    now_millis() / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_credential(role: &str, exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({
                "sub": "u-101",
                "email": "ada@campus.dev",
                "username": "ada",
                "role": role,
                "exp": exp,
            })
            .to_string(),
        );
        format!("{}.{}.signature", header, payload)
    }

    #[test]
    fn test_decode_valid_credential() {
        let claims = decode(&make_credential("student", 2_000_000_000)).unwrap();
        assert_eq!(claims.sub, "u-101");
        assert_eq!(claims.email, "ada@campus.dev");
        assert_eq!(claims.username, "ada");
        assert_eq!(claims.role, Role::Student);
        assert_eq!(claims.exp, 2_000_000_000);
    }

    #[test]
    fn test_decode_rejects_wrong_segment_count() {
        assert!(decode("only-one-segment").is_err());
        assert!(decode("two.segments").is_err());
        assert!(decode("a.b.c.d").is_err());
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        assert!(decode("header.!!!not-base64!!!.sig").is_err());
    }

    #[test]
    fn test_decode_rejects_non_claim_payload() {
        let payload = URL_SAFE_NO_PAD.encode(b"not json at all");
        assert!(decode(&format!("h.{}.s", payload)).is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_role() {
        assert!(decode(&make_credential("admin", 2_000_000_000)).is_err());
    }

    #[test]
    fn test_valid_well_before_expiry() {
        let credential = make_credential("student", now_secs() + 3600);
        assert!(is_valid(&credential, Duration::from_secs(300)));
    }

    #[test]
    fn test_skew_tolerance_boundary() {
        let skew = Duration::from_secs(300);

        // Five minutes past expiry is still inside the tolerance window.
        let just_expired = make_credential("student", now_secs() - 295);
        assert!(is_valid(&just_expired, skew));

        // Six minutes past expiry is not.
        let long_expired = make_credential("student", now_secs() - 360);
        assert!(!is_valid(&long_expired, skew));
    }

    #[test]
    fn test_zero_skew_rejects_expired() {
        let credential = make_credential("instructor", now_secs() - 10);
        assert!(!is_valid(&credential, Duration::ZERO));
    }

    #[test]
    fn test_undecodable_is_never_valid() {
        assert!(!is_valid("garbage", Duration::from_secs(300)));
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::parse("student"), Some(Role::Student));
        assert_eq!(Role::parse("instructor"), Some(Role::Instructor));
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::Instructor.as_str(), "instructor");
    }
}
