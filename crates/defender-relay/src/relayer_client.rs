//! Client for the Defender relayer transaction API.
//!
//! The operations are declared so callers can code against them, but the
//! service contract is not implemented yet: every call returns
//! `DefenderError::NotSupported` without touching the network.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use defender_auth::Authenticator;
use defender_types::{CognitoPool, Credentials, DefenderError, Result};

use crate::base_client::BaseClient;

pub const RELAYER_API: &str = "https://api.defender.openzeppelin.com/";

pub const DEFAULT_USER_POOL_ID: &str = "us-west-2_iLmIggsiy";
pub const DEFAULT_CLIENT_ID: &str = "1bpd19lcr33qvg5cr3oi79rdap";
pub const DEFAULT_REGION: &str = "us-west-2";

/// Relayer transaction client.
pub struct RelayerClient {
    base: BaseClient,
}

impl RelayerClient {
    /// Client using the default transaction-API user pool.
    pub fn new(api_key: &str, api_secret: &str) -> Self {
        let pool = CognitoPool::new(DEFAULT_USER_POOL_ID, DEFAULT_CLIENT_ID, DEFAULT_REGION);
        Self::with_pool(api_key, api_secret, pool)
    }

    pub fn with_pool(api_key: &str, api_secret: &str, pool: CognitoPool) -> Self {
        Self {
            base: BaseClient::new(Credentials::new(api_key, api_secret, pool), RELAYER_API),
        }
    }

    pub fn with_base_api(mut self, base_api: &str) -> Self {
        self.base = self.base.with_base_api(base_api);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.base = self.base.with_timeout(timeout);
        self
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.base = self.base.with_authenticator(authenticator);
        self
    }

    pub fn base(&self) -> &BaseClient {
        &self.base
    }

    pub async fn get_relayer(&self) -> Result<Value> {
        Err(DefenderError::NotSupported("get_relayer"))
    }

    pub async fn send_transaction(&self, _transaction: &Value) -> Result<Value> {
        Err(DefenderError::NotSupported("send_transaction"))
    }

    pub async fn get_transaction_status(&self, _transaction_id: &str) -> Result<Value> {
        Err(DefenderError::NotSupported("get_transaction_status"))
    }

    pub async fn replace_transaction_by_id(
        &self,
        _transaction_id: &str,
        _transaction: &Value,
    ) -> Result<Value> {
        Err(DefenderError::NotSupported("replace_transaction_by_id"))
    }

    pub async fn replace_transaction_by_nonce(
        &self,
        _nonce: u64,
        _transaction: &Value,
    ) -> Result<Value> {
        Err(DefenderError::NotSupported("replace_transaction_by_nonce"))
    }

    pub async fn list_transactions(&self) -> Result<Value> {
        Err(DefenderError::NotSupported("list_transactions"))
    }

    pub async fn sign_transaction(&self, _payload: &Value) -> Result<Value> {
        Err(DefenderError::NotSupported("sign_transaction"))
    }

    pub async fn call_json_rpc(&self, _method: &str, _params: &Value) -> Result<Value> {
        Err(DefenderError::NotSupported("call_json_rpc"))
    }
}
