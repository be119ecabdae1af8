//! Configuration loaded from environment variables.

use crate::chain::CELO_REGISTRY_ADDRESS;
use crate::issuer::{Issuer, IssuerContext};
use crate::quota::DEFAULT_TOP_UP_UNIT_WEI;
use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use odis_client::{AuthSigner, AuthenticationMethod, OdisContextName, ServiceContext};
use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Celo node configuration
    #[serde(default)]
    pub celo: CeloConfig,

    /// Issuer credentials
    pub issuer: IssuerConfig,

    /// ODIS configuration
    pub odis: OdisConfig,

    /// Quota top-up configuration
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CeloConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Core contract registry address
    #[serde(default = "default_registry_address")]
    pub registry_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuerConfig {
    /// Hex-encoded issuer private key
    pub private_key: SecretString,

    /// Expected issuer address, checked against the private key
    #[serde(default)]
    pub address: Option<String>,

    /// How requests to ODIS are authenticated
    #[serde(default = "default_auth_method")]
    pub auth_method: AuthenticationMethod,

    /// Data encryption key, required for `encryption_key` authentication
    #[serde(default)]
    pub dek_private_key: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OdisConfig {
    /// Named deployment providing the default combiner URL
    #[serde(default = "default_odis_network")]
    pub network: OdisContextName,

    /// Combiner URL override
    #[serde(default)]
    pub url: Option<String>,

    /// Combiner public key
    pub public_key: String,

    /// Request timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    /// Stable token paid per top-up, in wei
    #[serde(default = "default_top_up_unit_wei")]
    pub top_up_unit_wei: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default implementations
impl Default for CeloConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            registry_address: default_registry_address(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            top_up_unit_wei: default_top_up_unit_wei(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_rpc_url() -> String {
    "https://alfajores-forno.celo-testnet.org".into()
}

fn default_registry_address() -> String {
    CELO_REGISTRY_ADDRESS.to_string()
}

fn default_auth_method() -> AuthenticationMethod {
    AuthenticationMethod::WalletKey
}

fn default_odis_network() -> OdisContextName {
    OdisContextName::Alfajores
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_top_up_unit_wei() -> u64 {
    DEFAULT_TOP_UP_UNIT_WEI
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    // Keep "+82..." phone numbers and hex keys as strings.
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn registry_address(&self) -> Result<Address> {
        self.celo
            .registry_address
            .trim()
            .parse()
            .with_context(|| format!("Invalid registry address: {}", self.celo.registry_address))
    }

    pub fn service_context(&self) -> ServiceContext {
        match &self.odis.url {
            Some(url) => ServiceContext::new(url, &self.odis.public_key),
            None => ServiceContext::for_network(self.odis.network, &self.odis.public_key),
        }
    }

    pub fn top_up_unit(&self) -> U256 {
        U256::from(self.quota.top_up_unit_wei)
    }

    /// Build the issuer and its ODIS authentication from the credentials.
    pub fn issuer_context(&self) -> Result<IssuerContext> {
        let issuer = Issuer::from_private_key(
            &self.issuer.private_key,
            self.issuer.address.as_deref(),
        )?;

        let auth = match self.issuer.auth_method {
            AuthenticationMethod::WalletKey => AuthSigner::wallet_key(issuer.signer().clone()),
            AuthenticationMethod::EncryptionKey => {
                let dek = self
                    .issuer
                    .dek_private_key
                    .as_ref()
                    .context(
                        "ISSUER__DEK_PRIVATE_KEY is required for encryption_key authentication",
                    )?;
                AuthSigner::encryption_key(dek).context("Invalid data encryption key")?
            }
        };

        Ok(IssuerContext::new(issuer, auth))
    }
}
