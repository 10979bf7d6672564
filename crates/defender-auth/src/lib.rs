//! Request authentication for the Defender APIs.
//!
//! Defines the `Authenticator` trait the HTTP façade calls before every request.
//! Provides `SrpAuth` (Cognito SRP login) and `StaticToken` (pre-issued token).

use std::collections::HashMap;

use async_trait::async_trait;
use defender_types::{CognitoPool, Credentials, DefenderError, Result};
use tracing::debug;

pub mod cognito;
pub mod srp;

pub use cognito::AuthenticationResult;

use cognito::{CognitoClient, InitiateAuthRequest, RespondToAuthChallengeRequest};
use srp::SrpSession;

const USER_SRP_AUTH: &str = "USER_SRP_AUTH";
const PASSWORD_VERIFIER: &str = "PASSWORD_VERIFIER";

/// Produces the `Authorization` header value for one request.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authorization(&self) -> Result<String>;
}

/// Which Cognito token is presented as the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenType {
    #[default]
    Access,
    Id,
}

impl AuthenticationResult {
    pub fn token(&self, token_type: TokenType) -> &str {
        match token_type {
            TokenType::Access => &self.access_token,
            TokenType::Id => &self.id_token,
        }
    }
}

/// SRP login against a Cognito user pool. Every `authorization` call runs a
/// full handshake; nothing is cached between calls.
pub struct SrpAuth {
    username: String,
    password: String,
    pool: CognitoPool,
    token_type: TokenType,
    client: reqwest::Client,
}

impl SrpAuth {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            username: credentials.api_key.clone(),
            password: credentials.api_secret.clone(),
            pool: credentials.pool.clone(),
            token_type: TokenType::default(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_token_type(mut self, token_type: TokenType) -> Self {
        self.token_type = token_type;
        self
    }

    /// Reuse an existing connection pool.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Run the `USER_SRP_AUTH` flow and return the issued tokens.
    pub async fn authenticate(&self) -> Result<AuthenticationResult> {
        let session = SrpSession::new()?;
        let endpoint = self.pool.endpoint_url();
        let cognito = CognitoClient::new(&endpoint, &self.client);

        debug!(username = %self.username, pool = %self.pool.user_pool_id, "starting SRP login");

        let mut auth_parameters = HashMap::new();
        auth_parameters.insert("USERNAME", self.username.clone());
        auth_parameters.insert("SRP_A", session.large_a_hex());

        let challenge = cognito
            .initiate_auth(&InitiateAuthRequest {
                auth_flow: USER_SRP_AUTH,
                client_id: &self.pool.client_id,
                auth_parameters,
            })
            .await?;

        match challenge.challenge_name.as_deref() {
            Some(PASSWORD_VERIFIER) => {}
            Some(other) => {
                return Err(DefenderError::Auth(format!("unsupported challenge: {}", other)))
            }
            None => return Err(DefenderError::Auth("missing SRP challenge".into())),
        }

        let params = &challenge.challenge_parameters;
        let param = |name: &str| {
            params
                .get(name)
                .map(String::as_str)
                .ok_or_else(|| DefenderError::Auth(format!("challenge is missing {}", name)))
        };
        let user_id = param("USER_ID_FOR_SRP")?;
        let salt = param("SALT")?;
        let server_b = param("SRP_B")?;
        let secret_block = param("SECRET_BLOCK")?;

        let pool_name = self.pool.pool_name();
        let key = session.password_authentication_key(
            pool_name,
            user_id,
            &self.password,
            server_b,
            salt,
        )?;
        let timestamp = srp::format_timestamp(chrono::Utc::now());
        let signature = srp::claim_signature(&key, pool_name, user_id, secret_block, &timestamp)?;

        let mut challenge_responses = HashMap::new();
        challenge_responses.insert("TIMESTAMP", timestamp);
        challenge_responses.insert("USERNAME", user_id.to_string());
        challenge_responses.insert("PASSWORD_CLAIM_SECRET_BLOCK", secret_block.to_string());
        challenge_responses.insert("PASSWORD_CLAIM_SIGNATURE", signature);

        let response = cognito
            .respond_to_auth_challenge(&RespondToAuthChallengeRequest {
                challenge_name: PASSWORD_VERIFIER,
                client_id: &self.pool.client_id,
                challenge_responses,
                session: challenge.session.clone(),
            })
            .await?;

        if let Some(next) = response.challenge_name {
            return Err(DefenderError::Auth(format!("unsupported challenge: {}", next)));
        }

        debug!(username = %self.username, "SRP login complete");
        response
            .authentication_result
            .ok_or_else(|| DefenderError::Auth("no authentication result".into()))
    }
}

#[async_trait]
impl Authenticator for SrpAuth {
    async fn authorization(&self) -> Result<String> {
        let tokens = self.authenticate().await?;
        Ok(format!("Bearer {}", tokens.token(self.token_type)))
    }
}

/// Pre-issued bearer token (for testing and externally managed sessions).
#[derive(Debug, Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl Authenticator for StaticToken {
    async fn authorization(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.token))
    }
}
