//! Request and response types for the ODIS combiner API.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a request proves it was sent on behalf of the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationMethod {
    /// Signed with the account's own wallet key.
    WalletKey,
    /// Signed with the account's registered data encryption key.
    EncryptionKey,
}

/// Namespace of a plaintext identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierPrefix {
    PhoneNumber,
    Email,
    Twitter,
}

impl IdentifierPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierPrefix::PhoneNumber => "tel",
            IdentifierPrefix::Email => "mailto",
            IdentifierPrefix::Twitter => "twit",
        }
    }
}

impl fmt::Display for IdentifierPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Well-known ODIS deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OdisContextName {
    Alfajores,
    Mainnet,
}

impl OdisContextName {
    /// Combiner URL for this deployment.
    pub fn default_url(&self) -> &'static str {
        match self {
            OdisContextName::Alfajores => {
                "https://us-central1-celo-phone-number-privacy.cloudfunctions.net/combiner"
            }
            OdisContextName::Mainnet => {
                "https://us-central1-celo-pgpnp-mainnet.cloudfunctions.net/combiner"
            }
        }
    }
}

/// Where to reach the service and the key its signatures verify against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceContext {
    pub url: String,
    pub public_key: String,
}

impl ServiceContext {
    pub fn new(url: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            public_key: public_key.into(),
        }
    }

    pub fn for_network(name: OdisContextName, public_key: impl Into<String>) -> Self {
        Self::new(name.default_url(), public_key)
    }
}

/// Quota status request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaRequest {
    pub account: Address,
    pub authentication_method: AuthenticationMethod,
    #[serde(rename = "sessionID", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Quota status response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaResponse {
    pub success: bool,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub performed_query_count: u64,
    #[serde(default)]
    pub total_quota: u64,
    /// Older combiners omit this and expect `total - performed`.
    #[serde(default)]
    pub remaining_quota: Option<u64>,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Metered capacity of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub performed_query_count: u64,
    pub total_quota: u64,
    pub remaining_quota: u64,
}

impl From<&QuotaResponse> for QuotaStatus {
    fn from(response: &QuotaResponse) -> Self {
        let remaining_quota = response.remaining_quota.unwrap_or_else(|| {
            response
                .total_quota
                .saturating_sub(response.performed_query_count)
        });

        Self {
            performed_query_count: response.performed_query_count,
            total_quota: response.total_quota,
            remaining_quota,
        }
    }
}

/// Blinded signature request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignMessageRequest {
    pub account: Address,
    pub blinded_query_phone_number: String,
    pub authentication_method: AuthenticationMethod,
    #[serde(rename = "sessionID", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Blinded signature response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignMessageResponse {
    pub success: bool,
    /// Base64-encoded blinded signature
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub performed_query_count: Option<u64>,
    #[serde(default)]
    pub total_quota: Option<u64>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
}
