//! Defender relayer clients.
//!
//! - `RelayClient`: relayer configuration (relayers, keys, policies)
//! - `RelayerClient`: transaction API, declared but not supported yet
//! - Payload models for relayer creation and partial updates

use serde::{Deserialize, Serialize};
use defender_types::{DefenderError, Result};

pub mod base_client;
pub mod relay_client;
pub mod relayer_client;

pub use base_client::{BaseClient, RawResponse, DEFAULT_TIMEOUT};
pub use relay_client::RelayClient;
pub use relayer_client::RelayerClient;

/// Relayer transaction policies. Unset fields are omitted, so the struct also
/// serves as a partial policy update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayerPolicies {
    /// Maximum gas price in wei, decimal string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price_cap: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist_receivers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eip1559_pricing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_transactions: Option<bool>,
}

impl RelayerPolicies {
    /// True when no field departs from the server defaults.
    pub fn is_default(&self) -> bool {
        self.gas_price_cap.is_none()
            && self.whitelist_receivers.as_ref().map_or(true, Vec::is_empty)
            && !self.eip1559_pricing.unwrap_or(false)
            && !self.private_transactions.unwrap_or(false)
    }
}

/// How a new relayer obtains its signing address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RelayerAddressMode {
    /// Fresh key, governed by these policies.
    Policies(RelayerPolicies),
    /// Share the address of an existing relayer.
    UseAddressFromRelayerId(String),
}

/// Body of `POST relayers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRelayerRequest {
    pub name: String,
    pub network: String,
    /// Minimum balance in wei, decimal string.
    pub min_balance: String,
    #[serde(flatten)]
    pub mode: RelayerAddressMode,
}

impl CreateRelayerRequest {
    pub fn builder(name: &str, network: &str, min_balance: &str) -> CreateRelayerRequestBuilder {
        CreateRelayerRequestBuilder {
            name: name.to_string(),
            network: network.to_string(),
            min_balance: min_balance.to_string(),
            policies: RelayerPolicies::default(),
            use_address_from_relayer_id: None,
        }
    }
}

/// Builder enforcing that an inherited address and explicit policies are
/// never combined.
#[derive(Debug, Clone)]
pub struct CreateRelayerRequestBuilder {
    name: String,
    network: String,
    min_balance: String,
    policies: RelayerPolicies,
    use_address_from_relayer_id: Option<String>,
}

impl CreateRelayerRequestBuilder {
    pub fn gas_price_cap(mut self, wei: &str) -> Self {
        self.policies.gas_price_cap = Some(wei.to_string());
        self
    }

    pub fn whitelist_receivers<I, S>(mut self, receivers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policies.whitelist_receivers = Some(receivers.into_iter().map(Into::into).collect());
        self
    }

    pub fn eip1559_pricing(mut self, enabled: bool) -> Self {
        self.policies.eip1559_pricing = Some(enabled);
        self
    }

    pub fn private_transactions(mut self, enabled: bool) -> Self {
        self.policies.private_transactions = Some(enabled);
        self
    }

    pub fn use_address_from_relayer_id(mut self, relayer_id: &str) -> Self {
        self.use_address_from_relayer_id = Some(relayer_id.to_string());
        self
    }

    pub fn build(self) -> Result<CreateRelayerRequest> {
        let mode = match self.use_address_from_relayer_id {
            Some(relayer_id) => {
                if !self.policies.is_default() {
                    return Err(DefenderError::Validation(
                        "use_address_from_relayer_id cannot be combined with policy fields".into(),
                    ));
                }
                RelayerAddressMode::UseAddressFromRelayerId(relayer_id)
            }
            None => RelayerAddressMode::Policies(self.policies),
        };

        Ok(CreateRelayerRequest {
            name: self.name,
            network: self.network,
            min_balance: self.min_balance,
            mode,
        })
    }
}

/// Partial body for `RelayClient::update_relayer`. Unset fields keep their
/// current server value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRelayerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_balance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<RelayerPolicies>,
}
