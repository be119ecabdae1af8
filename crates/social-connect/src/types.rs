//! Core types for the attestation lifecycle.

use alloy::primitives::{Address, B256};
use odis_client::IdentifierPrefix;
use std::fmt;

/// A plaintext identifier together with its namespace.
///
/// The plaintext is never handed to the ledger; only its
/// [`ObfuscatedIdentifier`] is.
#[derive(Clone, PartialEq, Eq)]
pub struct Identifier {
    prefix: IdentifierPrefix,
    plaintext: String,
}

impl Identifier {
    pub fn new(prefix: IdentifierPrefix, plaintext: impl Into<String>) -> Self {
        Self {
            prefix,
            plaintext: plaintext.into(),
        }
    }

    /// A phone number in E.164 format (e.g., "+821011111116").
    pub fn phone_number(number: impl Into<String>) -> Self {
        Self::new(IdentifierPrefix::PhoneNumber, number)
    }

    pub fn prefix(&self) -> IdentifierPrefix {
        self.prefix
    }

    pub fn plaintext(&self) -> &str {
        &self.plaintext
    }

    /// Check that the plaintext has the shape its prefix requires.
    pub fn validate(&self) -> Result<(), String> {
        if self.plaintext.is_empty() {
            return Err("identifier is empty".into());
        }

        match self.prefix {
            IdentifierPrefix::PhoneNumber => validate_e164(&self.plaintext),
            IdentifierPrefix::Email => {
                let (local, domain) = self
                    .plaintext
                    .split_once('@')
                    .ok_or_else(|| "email address must contain '@'".to_string())?;
                if local.is_empty() || domain.is_empty() {
                    return Err("email address is incomplete".into());
                }
                Ok(())
            }
            IdentifierPrefix::Twitter => {
                if self.plaintext.chars().any(char::is_whitespace) {
                    return Err("twitter handle must not contain whitespace".into());
                }
                Ok(())
            }
        }
    }
}

// Plaintext identifiers are personal data; keep them out of logs.
impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identifier")
            .field("prefix", &self.prefix)
            .field("plaintext", &"<redacted>")
            .finish()
    }
}

fn validate_e164(number: &str) -> Result<(), String> {
    let digits = number
        .strip_prefix('+')
        .ok_or_else(|| "phone number must start with '+' and a country code".to_string())?;

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err("phone number must contain only digits after '+'".into());
    }
    if digits.starts_with('0') {
        return Err("country code cannot start with 0".into());
    }
    if digits.len() < 8 {
        return Err("phone number too short".into());
    }
    if digits.len() > 15 {
        return Err("phone number too long".into());
    }
    Ok(())
}

/// Deterministic, non-reversible token standing in for an identifier on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObfuscatedIdentifier(pub B256);

impl ObfuscatedIdentifier {
    pub fn as_b256(&self) -> B256 {
        self.0
    }
}

impl From<B256> for ObfuscatedIdentifier {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl fmt::Display for ObfuscatedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a confirmed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    /// Whether the transaction executed successfully.
    pub status: bool,
}

impl TxReceipt {
    pub fn is_success(&self) -> bool {
        self.status
    }
}

/// One active attestation as seen by a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub account: Address,
    pub signer: Address,
    pub issued_on: u64,
    pub published_on: u64,
}

/// Attestations registered for an identifier by a set of trusted issuers.
///
/// The sequences are parallel: index `i` of each describes one attestation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttestationLookup {
    pub accounts: Vec<Address>,
    pub signers: Vec<Address>,
    pub issued_ons: Vec<u64>,
    pub published_ons: Vec<u64>,
}

impl AttestationLookup {
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn mappings(&self) -> Vec<Mapping> {
        self.accounts
            .iter()
            .enumerate()
            .map(|(i, account)| Mapping {
                account: *account,
                signer: self.signers.get(i).copied().unwrap_or_default(),
                issued_on: self.issued_ons.get(i).copied().unwrap_or_default(),
                published_on: self.published_ons.get(i).copied().unwrap_or_default(),
            })
            .collect()
    }
}

/// Precondition check for a forced registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingMapping {
    /// Active mappings for this issuer; empty when the identifier is unmapped.
    pub existing: Vec<Mapping>,
}

impl ExistingMapping {
    pub fn is_empty(&self) -> bool {
        self.existing.is_empty()
    }
}
