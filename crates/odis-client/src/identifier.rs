//! Obfuscated identifier derivation.
//!
//! The plaintext query is blinded before it leaves the process, the service
//! signs the blinded query with its threshold key, and the unblinded
//! signature is hashed into a short pepper. The on-chain identifier is
//! `keccak256("{prefix}://{plaintext}__{pepper}")`.

use crate::error::OdisError;
use crate::types::IdentifierPrefix;
use alloy::primitives::{keccak256, B256};
use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256};

/// Number of base64 characters kept from the signature hash.
pub const PEPPER_LENGTH: usize = 13;

const PEPPER_SEPARATOR: &str = "__";

/// Client side of the blind signature protocol.
pub trait Blinder: Send + Sync {
    /// Blind a query message before sending it to the service.
    fn blind(&self, message: &[u8]) -> Result<Vec<u8>, OdisError>;

    /// Recover the signature over the original message from the service's
    /// signature over the blinded one.
    fn unblind(&self, blinded_signature: &[u8]) -> Result<Vec<u8>, OdisError>;
}

/// Sends the query unblinded.
///
/// Only suitable for services that accept unblinded queries, such as a
/// local development combiner. Production combiners expect queries blinded
/// with their BLS threshold scheme, which needs a dedicated [`Blinder`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBlinding;

impl Blinder for NoBlinding {
    fn blind(&self, message: &[u8]) -> Result<Vec<u8>, OdisError> {
        Ok(message.to_vec())
    }

    fn unblind(&self, blinded_signature: &[u8]) -> Result<Vec<u8>, OdisError> {
        Ok(blinded_signature.to_vec())
    }
}

/// Result of a successful identifier derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierResult {
    pub prefix: IdentifierPrefix,
    pub pepper: String,
    pub obfuscated_identifier: B256,
}

/// The message that gets blinded and signed.
pub fn query_message(prefix: IdentifierPrefix, plaintext: &str) -> String {
    format!("{}://{}", prefix, plaintext)
}

/// Derive the pepper from an unblinded threshold signature.
pub fn pepper_from_signature(unblinded_signature: &[u8]) -> String {
    let digest = Sha256::digest(unblinded_signature);
    let mut pepper = STANDARD.encode(digest);
    pepper.truncate(PEPPER_LENGTH);
    pepper
}

/// Hash a plaintext identifier with its pepper.
pub fn obfuscated_identifier(prefix: IdentifierPrefix, plaintext: &str, pepper: &str) -> B256 {
    let preimage = format!(
        "{}{}{}",
        query_message(prefix, plaintext),
        PEPPER_SEPARATOR,
        pepper
    );
    keccak256(preimage.as_bytes())
}

/// Turn the service's base64 signature into an identifier.
pub(crate) fn finish_derivation(
    prefix: IdentifierPrefix,
    plaintext: &str,
    signature_b64: &str,
    blinder: &dyn Blinder,
) -> Result<IdentifierResult, OdisError> {
    let blinded_signature = STANDARD
        .decode(signature_b64)
        .map_err(|e| OdisError::Decode(e.to_string()))?;
    let unblinded = blinder.unblind(&blinded_signature)?;
    let pepper = pepper_from_signature(&unblinded);
    let obfuscated_identifier = obfuscated_identifier(prefix, plaintext, &pepper);

    Ok(IdentifierResult {
        prefix,
        pepper,
        obfuscated_identifier,
    })
}
