//! Shared types for the Defender relay SDK.
//!
//! - Error model and `Result` alias
//! - API credentials and Cognito pool identifiers
//! - Shallow JSON object merge used by read-modify-write updates

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// JSON object as returned by the Defender API.
pub type JsonObject = Map<String, Value>;

/// Body of a non-success response, classified by how much structure it had.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    /// Value of the `message` field of a JSON object, whatever its type.
    Message(Value),
    /// JSON body without a `message` field, echoed verbatim.
    Json(Value),
    /// Body that was not JSON at all, echoed verbatim.
    Text(String),
}

impl ErrorBody {
    /// Classify a raw error body.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(mut object)) => match object.remove("message") {
                Some(message) => ErrorBody::Message(message),
                None => ErrorBody::Json(Value::Object(object)),
            },
            Ok(value) => ErrorBody::Json(value),
            Err(_) => ErrorBody::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorBody::Message(Value::String(message)) => f.write_str(message),
            ErrorBody::Message(message) => write!(f, "{}", message),
            ErrorBody::Json(value) => write!(f, "{}", value),
            ErrorBody::Text(text) => f.write_str(text),
        }
    }
}

/// Defender SDK error types.
#[derive(Debug, Error)]
pub enum DefenderError {
    #[error("relay request timed out: {method}: {url}")]
    Timeout { method: String, url: String },

    #[error("relay error (status {status}): {body}")]
    Relay { status: u16, body: ErrorBody },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response body: {0}")]
    Decode(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("invalid payload: {0}")]
    Validation(String),

    #[error("{0} is not supported yet")]
    NotSupported(&'static str),
}

pub type Result<T> = std::result::Result<T, DefenderError>;

/// Identifiers of the hosted Cognito user pool used for SRP login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CognitoPool {
    pub user_pool_id: String,
    pub client_id: String,
    pub region: String,
    /// Overrides `https://cognito-idp.<region>.amazonaws.com/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl CognitoPool {
    pub fn new(user_pool_id: &str, client_id: &str, region: &str) -> Self {
        Self {
            user_pool_id: user_pool_id.to_string(),
            client_id: client_id.to_string(),
            region: region.to_string(),
            endpoint: None,
        }
    }

    /// Point the SRP handshake at a different identity endpoint.
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    /// Identity provider URL the handshake is posted to.
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://cognito-idp.{}.amazonaws.com/", self.region),
        }
    }

    /// The part of the pool id after the region prefix (`us-west-2_XXXX` -> `XXXX`).
    pub fn pool_name(&self) -> &str {
        self.user_pool_id
            .split_once('_')
            .map(|(_, name)| name)
            .unwrap_or(&self.user_pool_id)
    }
}

/// API credentials. The key doubles as the SRP username, the secret as the password.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub pool: CognitoPool,
}

impl Credentials {
    pub fn new(api_key: &str, api_secret: &str, pool: CognitoPool) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            pool,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("pool", &self.pool)
            .finish()
    }
}

/// Shallow merge: keys of `patch` overwrite keys of `base`.
pub fn merge_objects(base: &JsonObject, patch: &JsonObject) -> JsonObject {
    let mut merged = base.clone();
    for (key, value) in patch {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Serialize `value` and require the result to be a JSON object.
pub fn to_object<T: Serialize + ?Sized>(value: &T) -> Result<JsonObject> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DefenderError::Validation(format!(
            "expected a JSON object, got {}",
            other
        ))),
        Err(e) => Err(DefenderError::Validation(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_body_extracts_message() {
        let body = ErrorBody::from_bytes(br#"{"message":"relayer not found"}"#);
        assert_eq!(body, ErrorBody::Message(json!("relayer not found")));
        assert_eq!(body.to_string(), "relayer not found");
    }

    #[test]
    fn test_error_body_without_message_is_echoed() {
        let body = ErrorBody::from_bytes(br#"{"error":"X"}"#);
        assert_eq!(body, ErrorBody::Json(json!({"error": "X"})));
    }

    #[test]
    fn test_error_body_keeps_non_string_message() {
        let body = ErrorBody::from_bytes(br#"{"message":42,"code":7}"#);
        assert_eq!(body, ErrorBody::Message(json!(42)));
        assert_eq!(body.to_string(), "42");

        let body = ErrorBody::from_bytes(br#"{"message":{"reason":"paused"}}"#);
        assert_eq!(body, ErrorBody::Message(json!({"reason": "paused"})));
    }

    #[test]
    fn test_error_body_json_array_is_echoed() {
        let body = ErrorBody::from_bytes(br#"["a","b"]"#);
        assert_eq!(body, ErrorBody::Json(json!(["a", "b"])));
    }

    #[test]
    fn test_error_body_plain_text() {
        let body = ErrorBody::from_bytes(b"Bad Gateway");
        assert_eq!(body, ErrorBody::Text("Bad Gateway".into()));
    }

    #[test]
    fn test_merge_right_hand_side_wins() {
        let base = json!({"name": "old", "network": "sepolia", "paused": false});
        let base = to_object(&base).unwrap();
        let patch = to_object(&json!({"name": "new", "minBalance": "1000"})).unwrap();
        let merged = merge_objects(&base, &patch);

        assert_eq!(
            Value::Object(merged),
            json!({"name": "new", "network": "sepolia", "paused": false, "minBalance": "1000"})
        );
    }

    #[test]
    fn test_merge_is_shallow() {
        let base = json!({"policies": {"gasPriceCap": "1", "eip1559Pricing": true}});
        let base = to_object(&base).unwrap();
        let patch = to_object(&json!({"policies": {"gasPriceCap": "2"}})).unwrap();
        let merged = merge_objects(&base, &patch);

        assert_eq!(merged["policies"], json!({"gasPriceCap": "2"}));
    }

    #[test]
    fn test_to_object_rejects_non_objects() {
        let err = to_object(&json!(["a", "b"])).unwrap_err();
        assert!(matches!(err, DefenderError::Validation(_)));
    }

    #[test]
    fn test_pool_name_and_endpoint() {
        let pool = CognitoPool::new("us-west-2_94f3puJWv", "client", "us-west-2");
        assert_eq!(pool.pool_name(), "94f3puJWv");
        assert_eq!(pool.endpoint_url(), "https://cognito-idp.us-west-2.amazonaws.com/");

        let pool = pool.with_endpoint("http://127.0.0.1:9000/");
        assert_eq!(pool.endpoint_url(), "http://127.0.0.1:9000/");
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new(
            "key",
            "super-secret",
            CognitoPool::new("us-west-2_x", "client", "us-west-2"),
        );
        let printed = format!("{:?}", creds);
        assert!(printed.contains("key"));
        assert!(!printed.contains("super-secret"));
    }
}
