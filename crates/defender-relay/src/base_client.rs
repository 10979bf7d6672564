//! Authenticated HTTP façade shared by the Defender clients.
//!
//! Every request carries the JSON/API-key headers and a freshly computed
//! `Authorization` header. Bodies are read eagerly so a timeout at any stage
//! surfaces as `DefenderError::Timeout`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use defender_auth::{Authenticator, SrpAuth};
use defender_types::{Credentials, DefenderError, ErrorBody, Result};

/// Per-request timeout unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const JSON: &str = "application/json";

/// Fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub url: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Base HTTP façade over one API root.
pub struct BaseClient {
    credentials: Credentials,
    base_api: String,
    client: reqwest::Client,
    timeout: Duration,
    authenticator: Option<Arc<dyn Authenticator>>,
}

fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

fn normalize_base(base_api: &str) -> String {
    if base_api.ends_with('/') {
        base_api.to_string()
    } else {
        format!("{}/", base_api)
    }
}

impl BaseClient {
    pub fn new(credentials: Credentials, base_api: &str) -> Self {
        Self {
            credentials,
            base_api: normalize_base(base_api),
            client: build_http_client(DEFAULT_TIMEOUT),
            timeout: DEFAULT_TIMEOUT,
            authenticator: None,
        }
    }

    pub fn with_base_api(mut self, base_api: &str) -> Self {
        self.base_api = normalize_base(base_api);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_http_client(timeout);
        self.timeout = timeout;
        self
    }

    /// Replace the per-request SRP login with a caller-supplied authenticator.
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn base_api(&self) -> &str {
        &self.base_api
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_api, path)
    }

    /// Fixed JSON headers plus `X-Api-Key`.
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
        let api_key = HeaderValue::from_str(&self.credentials.api_key)
            .map_err(|e| DefenderError::Validation(format!("invalid api key: {}", e)))?;
        headers.insert("X-Api-Key", api_key);
        Ok(headers)
    }

    /// Authenticator for the next request. The default SRP login is rebuilt on
    /// every call.
    pub fn auth(&self) -> Arc<dyn Authenticator> {
        match &self.authenticator {
            Some(authenticator) => Arc::clone(authenticator),
            None => Arc::new(SrpAuth::new(&self.credentials).with_http_client(self.client.clone())),
        }
    }

    pub async fn get(&self, path: &str, params: Option<&[(&str, &str)]>) -> Result<RawResponse> {
        self.send(Method::GET, path, params, None).await
    }

    pub async fn post(&self, path: &str, payload: Option<&Value>) -> Result<RawResponse> {
        self.send(Method::POST, path, None, payload).await
    }

    pub async fn put(&self, path: &str, payload: Option<&Value>) -> Result<RawResponse> {
        self.send(Method::PUT, path, None, payload).await
    }

    pub async fn delete(&self, path: &str) -> Result<RawResponse> {
        self.send(Method::DELETE, path, None, None).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        params: Option<&[(&str, &str)]>,
        payload: Option<&Value>,
    ) -> Result<RawResponse> {
        let url = self.url(path);
        // A login that times out is reported against the relay request it was for.
        let authorization = match self.auth().authorization().await {
            Ok(authorization) => authorization,
            Err(DefenderError::Timeout { .. }) => {
                warn!(method = %method, url = %url, "authorization timed out");
                return Err(DefenderError::Timeout {
                    method: method.to_string(),
                    url,
                });
            }
            Err(e) => return Err(e),
        };
        let authorization = HeaderValue::from_str(&authorization)
            .map_err(|e| DefenderError::Auth(format!("invalid authorization header: {}", e)))?;

        let mut headers = self.headers()?;
        headers.insert(AUTHORIZATION, authorization);

        debug!(method = %method, url = %url, "relay request");

        let mut request = self
            .client
            .request(method.clone(), &url)
            .headers(headers)
            .timeout(self.timeout);
        if let Some(params) = params {
            request = request.query(params);
        }
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let timeout_or_transport = |e: reqwest::Error| {
            if e.is_timeout() {
                warn!(method = %method, url = %url, "relay request timed out");
                DefenderError::Timeout {
                    method: method.to_string(),
                    url: url.clone(),
                }
            } else {
                DefenderError::Transport(format!("{} {} failed: {}", method, url, e))
            }
        };

        let resp = request.send().await.map_err(&timeout_or_transport)?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(&timeout_or_transport)?.to_vec();

        Ok(RawResponse { status, url, body })
    }

    /// Parsed JSON body of a success response, or the translated relay error.
    pub fn handle_response(&self, response: RawResponse) -> Result<Value> {
        if !response.is_success() {
            return Err(self.relayer_exception(&response));
        }
        if response.body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&response.body).map_err(|e| {
            DefenderError::Decode(format!("{} returned invalid JSON: {}", response.url, e))
        })
    }

    /// Translate an error response, preferring the server's `message` field.
    pub fn relayer_exception(&self, response: &RawResponse) -> DefenderError {
        let body = ErrorBody::from_bytes(&response.body);
        warn!(status = response.status.as_u16(), url = %response.url, error = %body, "relay error");
        DefenderError::Relay {
            status: response.status.as_u16(),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use defender_auth::StaticToken;
    use defender_types::CognitoPool;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_api: &str) -> BaseClient {
        let credentials = Credentials::new(
            "test-api-key",
            "test-api-secret",
            CognitoPool::new("us-west-2_94f3puJWv", "client", "us-west-2"),
        );
        BaseClient::new(credentials, base_api)
            .with_authenticator(Arc::new(StaticToken::new("test-token")))
    }

    fn raw(status: u16, body: &[u8]) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            url: "https://example.test/relayers".into(),
            body: body.to_vec(),
        }
    }

    #[test]
    fn test_headers() {
        let headers = client("https://example.test/").headers().unwrap();
        assert_eq!(headers[ACCEPT], "application/json");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers["X-Api-Key"], "test-api-key");
    }

    #[test]
    fn test_base_api_gets_trailing_slash() {
        let base = client("https://example.test/relayer");
        assert_eq!(base.url("relayers"), "https://example.test/relayer/relayers");
    }

    #[test]
    fn test_handle_response_returns_body_unmodified() {
        let body = json!({"relayerId": "r1", "policies": {"gasPriceCap": "100"}, "paused": false});
        for status in [200u16, 201, 202, 204, 299] {
            let value = client("https://example.test/")
                .handle_response(raw(status, body.to_string().as_bytes()))
                .unwrap();
            assert_eq!(value, body);
        }
    }

    #[test]
    fn test_handle_response_never_returns_value_on_error() {
        for status in (100u16..200).chain(300..600) {
            let result = client("https://example.test/")
                .handle_response(raw(status, br#"{"relayerId":"r1"}"#));
            assert!(
                matches!(result, Err(DefenderError::Relay { status: s, .. }) if s == status),
                "status {} was not translated",
                status
            );
        }
    }

    #[test]
    fn test_relayer_exception_message() {
        let base = client("https://example.test/");
        let err = base.relayer_exception(&raw(404, br#"{"message":"X"}"#));
        match err {
            DefenderError::Relay { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, ErrorBody::Message(json!("X")));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_relayer_exception_raw_body() {
        let base = client("https://example.test/");
        match base.relayer_exception(&raw(500, br#"{"error":"X"}"#)) {
            DefenderError::Relay { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, ErrorBody::Json(json!({"error": "X"})));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        match base.relayer_exception(&raw(502, b"<html>bad gateway</html>")) {
            DefenderError::Relay { body, .. } => {
                assert_eq!(body, ErrorBody::Text("<html>bad gateway</html>".into()));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_success_body_is_decode_error() {
        let result = client("https://example.test/").handle_response(raw(200, b"not json"));
        assert!(matches!(result, Err(DefenderError::Decode(_))));
    }

    #[tokio::test]
    async fn test_requests_carry_auth_and_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/relayer/relayers"))
            .and(query_param("limit", "10"))
            .and(header("Authorization", "Bearer test-token"))
            .and(header("X-Api-Key", "test-api-key"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let base = client(&format!("{}/relayer/", server.uri()));
        let resp = base.get("relayers", Some(&[("limit", "10")])).await.unwrap();
        assert_eq!(base.handle_response(resp).unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_post_sends_json_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/relayer/relayers"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(json!({"name": "r"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"relayerId": "r1"})))
            .expect(1)
            .mount(&server)
            .await;

        let base = client(&format!("{}/relayer/", server.uri()));
        let resp = base.post("relayers", Some(&json!({"name": "r"}))).await.unwrap();
        assert_eq!(base.handle_response(resp).unwrap(), json!({"relayerId": "r1"}));
    }

    #[tokio::test]
    async fn test_timeout_carries_verb_and_url() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let base = client(&format!("{}/relayer/", server.uri()))
            .with_timeout(Duration::from_millis(100));
        let url = format!("{}/relayer/relayers/r1", server.uri());

        let results = [
            ("GET", base.get("relayers/r1", None).await),
            ("POST", base.post("relayers/r1", Some(&json!({}))).await),
            ("PUT", base.put("relayers/r1", Some(&json!({}))).await),
            ("DELETE", base.delete("relayers/r1").await),
        ];
        for (verb, result) in results {
            match result {
                Err(DefenderError::Timeout { method, url: got }) => {
                    assert_eq!(method, verb);
                    assert_eq!(got, url);
                }
                other => panic!("{} did not time out: {:?}", verb, other),
            }
        }
    }

    #[tokio::test]
    async fn test_login_timeout_carries_relay_verb_and_url() {
        let cognito = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&cognito)
            .await;
        let relay = MockServer::start().await;

        let pool = CognitoPool::new("us-west-2_94f3puJWv", "client", "us-west-2")
            .with_endpoint(&cognito.uri());
        let base = BaseClient::new(Credentials::new("key", "secret", pool), &relay.uri())
            .with_timeout(Duration::from_millis(100));

        let err = base.put("relayers/r1", Some(&json!({}))).await.unwrap_err();
        match err {
            DefenderError::Timeout { method, url } => {
                assert_eq!(method, "PUT");
                assert_eq!(url, format!("{}/relayers/r1", relay.uri()));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(relay.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Nothing listens on port 9 (discard) locally.
        let base = client("http://127.0.0.1:9/relayer/");
        let err = base.get("relayers/summary", None).await.unwrap_err();
        assert!(matches!(err, DefenderError::Transport(_)));
    }
}
