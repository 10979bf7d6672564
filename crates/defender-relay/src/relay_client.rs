//! HTTP client for the Defender relayer management API.
//!
//! Endpoints:
//! - GET /relayers/{id}, GET /relayers/summary, GET /relayers/{id}/keys
//! - POST /relayers, POST /relayers/{id}/keys
//! - PUT /relayers, PUT /relayers/{id}
//! - DELETE /relayers/{id}/keys/{key_id}

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use defender_auth::Authenticator;
use defender_types::{
    merge_objects, to_object, CognitoPool, Credentials, DefenderError, JsonObject, Result,
};

use crate::base_client::BaseClient;

pub const RELAY_API: &str = "https://defender-api.openzeppelin.com/relayer/";

pub const DEFAULT_USER_POOL_ID: &str = "us-west-2_94f3puJWv";
pub const DEFAULT_CLIENT_ID: &str = "40e58hbc7pktmnp9i26hh5nsav";
pub const DEFAULT_REGION: &str = "us-west-2";

/// Whole-relayer updates are written to the collection root; the merged body
/// carries the relayer id.
const RELAYERS: &str = "relayers";

/// Relayer management client.
pub struct RelayClient {
    base: BaseClient,
}

impl RelayClient {
    /// Client using the default management user pool.
    pub fn new(api_key: &str, api_secret: &str) -> Self {
        let pool = CognitoPool::new(DEFAULT_USER_POOL_ID, DEFAULT_CLIENT_ID, DEFAULT_REGION);
        Self::with_pool(api_key, api_secret, pool)
    }

    pub fn with_pool(api_key: &str, api_secret: &str, pool: CognitoPool) -> Self {
        Self {
            base: BaseClient::new(Credentials::new(api_key, api_secret, pool), RELAY_API),
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

    /// GET /relayers/{id}
    pub async fn get_relayer(&self, relayer_id: &str) -> Result<Value> {
        let response = self.base.get(&format!("relayers/{}", relayer_id), None).await?;
        self.base.handle_response(response)
    }

    /// GET /relayers/summary
    pub async fn list_relayers(&self) -> Result<Value> {
        let response = self.base.get("relayers/summary", None).await?;
        self.base.handle_response(response)
    }

    /// GET /relayers/{id}/keys
    pub async fn list_relayer_keys(&self, relayer_id: &str) -> Result<Value> {
        let response = self
            .base
            .get(&format!("relayers/{}/keys", relayer_id), None)
            .await?;
        self.base.handle_response(response)
    }

    /// POST /relayers with a full creation payload.
    ///
    /// Accepts a [`crate::CreateRelayerRequest`] or any JSON-serializable value.
    pub async fn create_relayer<T: Serialize + ?Sized>(&self, data: &T) -> Result<Value> {
        let payload =
            serde_json::to_value(data).map_err(|e| DefenderError::Validation(e.to_string()))?;
        let response = self.base.post(RELAYERS, Some(&payload)).await?;
        self.base.handle_response(response)
    }

    /// POST /relayers/{id}/keys
    pub async fn create_relayer_key(&self, relayer_id: &str) -> Result<Value> {
        let response = self
            .base
            .post(&format!("relayers/{}/keys", relayer_id), None)
            .await?;
        self.base.handle_response(response)
    }

    /// DELETE /relayers/{id}/keys/{key_id}
    pub async fn delete_relayer_key(&self, relayer_id: &str, key_id: &str) -> Result<Value> {
        let response = self
            .base
            .delete(&format!("relayers/{}/keys/{}", relayer_id, key_id))
            .await?;
        self.base.handle_response(response)
    }

    /// Read-modify-write update of a relayer.
    ///
    /// A `policies` entry goes through [`Self::update_relayer_policies`] first;
    /// when it is the only entry that result is returned. The remaining fields
    /// are merged over the current relayer state (given fields win) and written
    /// back with one PUT. Concurrent updates race: the last writer wins.
    pub async fn update_relayer<T: Serialize + ?Sized>(
        &self,
        relayer_id: &str,
        data: &T,
    ) -> Result<Value> {
        let mut patch = to_object(data)?;

        if let Some(policies) = patch.remove("policies") {
            let updated = self.update_relayer_policies(relayer_id, &policies).await?;
            if patch.is_empty() {
                return Ok(updated);
            }
        }

        let current = self.fetch_relayer_object(relayer_id).await?;
        let payload = merge_objects(&current, &patch);
        debug!(relayer_id, fields = patch.len(), "updating relayer");

        let response = self.base.put(RELAYERS, Some(&Value::Object(payload))).await?;
        self.base.handle_response(response)
    }

    /// Merge a partial policy update over the relayer's current policies and
    /// PUT the result to /relayers/{id}.
    pub async fn update_relayer_policies<T: Serialize + ?Sized>(
        &self,
        relayer_id: &str,
        data: &T,
    ) -> Result<Value> {
        let patch = to_object(data)?;

        let relayer = self.fetch_relayer_object(relayer_id).await?;
        let current = match relayer.get("policies") {
            Some(Value::Object(policies)) => policies.clone(),
            None | Some(Value::Null) => JsonObject::new(),
            Some(other) => {
                return Err(DefenderError::Decode(format!(
                    "relayer {} has malformed policies: {}",
                    relayer_id, other
                )))
            }
        };
        let payload = merge_objects(&current, &patch);
        debug!(relayer_id, fields = patch.len(), "updating relayer policies");

        let response = self
            .base
            .put(&format!("relayers/{}", relayer_id), Some(&Value::Object(payload)))
            .await?;
        self.base.handle_response(response)
    }

    async fn fetch_relayer_object(&self, relayer_id: &str) -> Result<JsonObject> {
        match self.get_relayer(relayer_id).await? {
            Value::Object(relayer) => Ok(relayer),
            other => Err(DefenderError::Decode(format!(
                "expected relayer {} to be an object, got {}",
                relayer_id, other
            ))),
        }
    }
}
