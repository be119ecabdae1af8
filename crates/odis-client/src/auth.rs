//! Request authentication.

use crate::error::OdisError;
use crate::types::AuthenticationMethod;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Signs request bodies so the service can attribute them to an account.
///
/// The service accepts either the account's wallet key or a data encryption
/// key registered for the account. Either way the body bytes are signed with
/// an EIP-191 personal signature and sent hex-encoded in `Authorization`.
#[derive(Clone)]
pub enum AuthSigner {
    WalletKey(PrivateKeySigner),
    EncryptionKey(PrivateKeySigner),
}

impl AuthSigner {
    pub fn wallet_key(signer: PrivateKeySigner) -> Self {
        AuthSigner::WalletKey(signer)
    }

    /// Build an encryption-key signer from a raw hex private key.
    pub fn encryption_key(raw_key: &SecretString) -> Result<Self, OdisError> {
        let signer = raw_key
            .expose_secret()
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(|e| OdisError::InvalidKey(e.to_string()))?;
        Ok(AuthSigner::EncryptionKey(signer))
    }

    pub fn method(&self) -> AuthenticationMethod {
        match self {
            AuthSigner::WalletKey(_) => AuthenticationMethod::WalletKey,
            AuthSigner::EncryptionKey(_) => AuthenticationMethod::EncryptionKey,
        }
    }

    /// Address of the signing key.
    pub fn signer_address(&self) -> Address {
        match self {
            AuthSigner::WalletKey(s) | AuthSigner::EncryptionKey(s) => s.address(),
        }
    }

    /// Produce the `Authorization` header value for a request body.
    pub fn authorize(&self, body: &[u8]) -> Result<String, OdisError> {
        let signer = match self {
            AuthSigner::WalletKey(s) | AuthSigner::EncryptionKey(s) => s,
        };
        let signature = signer
            .sign_message_sync(body)
            .map_err(|e| OdisError::Signing(e.to_string()))?;
        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }
}

impl fmt::Debug for AuthSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSigner")
            .field("method", &self.method())
            .field("signer", &self.signer_address())
            .finish()
    }
}
