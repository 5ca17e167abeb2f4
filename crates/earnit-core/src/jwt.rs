//! Client-side JWT payload decoding. The signature is never checked: the
//! payload is only a display and routing hint, the server decides on every call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::{base64url, session::Role};

/// Reasons a token payload could not be decoded.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("token has fewer than two segments")]
    Malformed,
    #[error("payload segment is not valid base64: {0}")]
    Base64(String),
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Untyped claims from the middle segment of a token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JwtPayload(Map<String, Value>);

impl JwtPayload {
    pub fn role(&self) -> Option<Role> {
        self.0.get("role").and_then(Value::as_str).map(Role::from)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.0.get("user_id").and_then(Value::as_i64)
    }

    /// The `exp` claim, if present and a valid unix timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let secs = self.0.get("exp").and_then(Value::as_i64)?;
        DateTime::from_timestamp(secs, 0)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for JwtPayload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Decode the payload of `token`, returning `None` (and logging) on any failure.
pub fn decode_jwt_payload(token: Option<&str>) -> Option<JwtPayload> {
    let token = token?;
    match try_decode_jwt_payload(token) {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!("failed to decode JWT payload: {err}");
            None
        }
    }
}

/// Decode the payload of `token`, reporting why it failed.
pub fn try_decode_jwt_payload(token: &str) -> Result<JwtPayload, PayloadError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload)) = (parts.next(), parts.next()) else {
        return Err(PayloadError::Malformed);
    };

    let bytes = base64url::decode_segment(payload).map_err(PayloadError::Base64)?;
    match serde_json::from_slice::<Value>(&bytes)? {
        Value::Object(map) => Ok(JwtPayload(map)),
        _ => Err(PayloadError::NotAnObject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
    const PARENT_PAYLOAD: &str = "eyJyb2xlIjoicGFyZW50IiwidXNlcl9pZCI6NDJ9";
    // {"role":"child","user_id":7,"exp":1700000000,"name":"Mia ~?>"}; needs padding and has '-'.
    const CHILD_PAYLOAD: &str =
        "eyJyb2xlIjoiY2hpbGQiLCJ1c2VyX2lkIjo3LCJleHAiOjE3MDAwMDAwMDAsIm5hbWUiOiJNaWEgfj8-In0";

    fn token(payload: &str) -> String {
        format!("{HEADER}.{payload}.signature")
    }

    #[test]
    fn decodes_standard_three_segment_token() {
        let payload = decode_jwt_payload(Some(&token(PARENT_PAYLOAD))).expect("payload");

        assert_eq!(payload.role(), Some(Role::Parent));
        assert_eq!(payload.user_id(), Some(42));
        assert_eq!(payload.as_map().len(), 2);
    }

    #[test]
    fn decodes_url_safe_unpadded_payload() {
        let payload = decode_jwt_payload(Some(&token(CHILD_PAYLOAD))).expect("payload");

        assert_eq!(payload.role(), Some(Role::Child));
        assert_eq!(payload.user_id(), Some(7));
        assert_eq!(
            payload.get("name").and_then(Value::as_str),
            Some("Mia ~?>")
        );
        assert_eq!(
            payload.expires_at().map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn two_segments_are_enough() {
        let payload = decode_jwt_payload(Some(&format!("{HEADER}.{PARENT_PAYLOAD}")));
        assert!(payload.is_some());
    }

    #[test]
    fn rejects_missing_and_malformed_tokens() {
        assert!(decode_jwt_payload(None).is_none());
        assert!(decode_jwt_payload(Some("")).is_none());
        assert!(decode_jwt_payload(Some("single-segment")).is_none());
        assert!(decode_jwt_payload(Some("not.a.jwt")).is_none());
        assert!(decode_jwt_payload(Some("abc.def.ghi")).is_none());
        assert!(decode_jwt_payload(Some(&token("%%%%"))).is_none());
    }

    #[test]
    fn rejects_payloads_that_are_not_objects() {
        // [1,2]
        let err = try_decode_jwt_payload(&token("WzEsMl0")).expect_err("array payload");
        assert!(matches!(err, PayloadError::NotAnObject));

        let err = try_decode_jwt_payload("only").expect_err("one segment");
        assert!(matches!(err, PayloadError::Malformed));
    }

    #[test]
    fn missing_claims_are_none() {
        let payload = JwtPayload::from(Map::new());
        assert_eq!(payload.role(), None);
        assert_eq!(payload.user_id(), None);
        assert_eq!(payload.expires_at(), None);
    }
}
