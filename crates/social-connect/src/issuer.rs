//! The issuer identity shared by every component.

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{bail, Context, Result};
use odis_client::AuthSigner;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// The single authorized signer that registers attestations.
#[derive(Clone)]
pub struct Issuer {
    signer: PrivateKeySigner,
}

impl Issuer {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// Load the issuer from a hex private key, optionally checking that it
    /// controls `expected_address`.
    pub fn from_private_key(key: &SecretString, expected_address: Option<&str>) -> Result<Self> {
        let signer: PrivateKeySigner = key
            .expose_secret()
            .trim()
            .parse()
            .context("Invalid issuer private key")?;

        if let Some(expected) = expected_address {
            let expected: Address = expected
                .trim()
                .parse()
                .with_context(|| format!("Invalid issuer address: {}", expected))?;
            if expected != signer.address() {
                bail!(
                    "Issuer private key controls {}, not the configured {}",
                    signer.address(),
                    expected
                );
            }
        }

        Ok(Self::new(signer))
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    pub fn wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

impl fmt::Debug for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Issuer")
            .field("address", &self.address())
            .finish()
    }
}

/// Issuer identity plus how it authenticates to the privacy service.
///
/// Constructed once at startup and shared by reference-counted pointer.
#[derive(Debug, Clone)]
pub struct IssuerContext {
    pub issuer: Issuer,
    pub auth: AuthSigner,
}

impl IssuerContext {
    pub fn new(issuer: Issuer, auth: AuthSigner) -> Self {
        Self { issuer, auth }
    }

    /// Authenticate to the privacy service with the issuer's own key.
    pub fn with_wallet_key(issuer: Issuer) -> Self {
        let auth = AuthSigner::wallet_key(issuer.signer().clone());
        Self::new(issuer, auth)
    }

    pub fn address(&self) -> Address {
        self.issuer.address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x726e53db4f0a79dfd63f58b19874896fce3748fcb80874665e0c147369c04a37";

    #[test]
    fn test_from_private_key() {
        let issuer = Issuer::from_private_key(&SecretString::new(KEY.into()), None).unwrap();
        let again = Issuer::from_private_key(&SecretString::new(KEY.into()), None).unwrap();
        assert_eq!(issuer.address(), again.address());
    }

    #[test]
    fn test_from_private_key_checks_address() {
        let issuer = Issuer::from_private_key(&SecretString::new(KEY.into()), None).unwrap();
        let address = issuer.address().to_string();

        assert!(Issuer::from_private_key(&SecretString::new(KEY.into()), Some(&address)).is_ok());

        let other = Address::repeat_byte(0x42).to_string();
        assert!(Issuer::from_private_key(&SecretString::new(KEY.into()), Some(&other)).is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let issuer = Issuer::from_private_key(&SecretString::new(KEY.into()), None).unwrap();
        assert!(!format!("{:?}", issuer).contains(&KEY[2..]));
    }

    #[test]
    fn test_wallet_key_context() {
        let issuer = Issuer::new(PrivateKeySigner::random());
        let ctx = IssuerContext::with_wallet_key(issuer.clone());
        assert_eq!(ctx.address(), issuer.address());
        assert_eq!(ctx.auth.signer_address(), issuer.address());
    }
}
