//! HTTP client for the Cognito identity provider.
//!
//! Targets:
//! - AWSCognitoIdentityProviderService.InitiateAuth
//! - AWSCognitoIdentityProviderService.RespondToAuthChallenge

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use defender_types::{DefenderError, Result};
use tracing::{debug, warn};

const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InitiateAuthRequest<'a> {
    pub auth_flow: &'a str,
    pub client_id: &'a str,
    pub auth_parameters: HashMap<&'static str, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RespondToAuthChallengeRequest<'a> {
    pub challenge_name: &'a str,
    pub client_id: &'a str,
    pub challenge_responses: HashMap<&'static str, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

/// Response of either target: a further challenge or the final tokens.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthResponse {
    pub challenge_name: Option<String>,
    #[serde(default)]
    pub challenge_parameters: HashMap<String, String>,
    pub session: Option<String>,
    pub authentication_result: Option<AuthenticationResult>,
}

/// Tokens issued after a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthenticationResult {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub token_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CognitoErrorBody {
    #[serde(rename = "__type")]
    kind: Option<String>,
    message: Option<String>,
}

/// Cognito client bound to one endpoint.
pub struct CognitoClient<'a> {
    endpoint: String,
    client: &'a reqwest::Client,
}

impl<'a> CognitoClient<'a> {
    pub fn new(endpoint: &str, client: &'a reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client,
        }
    }

    pub async fn initiate_auth(&self, request: &InitiateAuthRequest<'_>) -> Result<AuthResponse> {
        self.call("InitiateAuth", request).await
    }

    pub async fn respond_to_auth_challenge(
        &self,
        request: &RespondToAuthChallengeRequest<'_>,
    ) -> Result<AuthResponse> {
        self.call("RespondToAuthChallenge", request).await
    }

    fn transport_error(&self, e: reqwest::Error) -> DefenderError {
        if e.is_timeout() {
            DefenderError::Timeout {
                method: "POST".into(),
                url: self.endpoint.clone(),
            }
        } else {
            DefenderError::Transport(format!("cognito request failed: {}", e))
        }
    }

    async fn call<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        target: &str,
        request: &Req,
    ) -> Result<Resp> {
        let body = serde_json::to_vec(request).map_err(|e| DefenderError::Auth(e.to_string()))?;
        debug!(target_name = target, endpoint = %self.endpoint, "cognito request");

        let resp = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, AMZ_JSON)
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, target))
            .body(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = match serde_json::from_slice::<CognitoErrorBody>(&bytes) {
                Ok(CognitoErrorBody { kind, message }) => format!(
                    "{}: {}",
                    kind.unwrap_or_else(|| "UnknownError".into()),
                    message.unwrap_or_default()
                ),
                Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
            };
            warn!(target_name = target, status = status.as_u16(), "cognito rejected request");
            return Err(DefenderError::Auth(message));
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| DefenderError::Auth(format!("failed to parse cognito response: {}", e)))
    }
}
