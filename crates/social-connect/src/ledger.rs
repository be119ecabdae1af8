//! Ledger collaborator: contract reads and confirmed transactions.

use crate::types::{AttestationLookup, ObfuscatedIdentifier, TxReceipt};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Core contracts the lifecycle talks to, by registry name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreContract {
    StableToken,
    OdisPayments,
    FederatedAttestations,
}

impl CoreContract {
    /// Name under which the contract is registered in the core registry.
    pub fn registry_id(&self) -> &'static str {
        match self {
            CoreContract::StableToken => "StableToken",
            CoreContract::OdisPayments => "OdisPayments",
            CoreContract::FederatedAttestations => "FederatedAttestations",
        }
    }
}

impl fmt::Display for CoreContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.registry_id())
    }
}

/// Errors raised by a ledger implementation.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Contract not registered: {0}")]
    UnknownContract(String),

    #[error("Contract call failed: {0}")]
    Call(String),

    #[error("Transaction submission failed: {0}")]
    Submission(String),

    #[error("Transaction confirmation failed: {0}")]
    Confirmation(String),

    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(String),
}

/// Chain access used by the quota and attestation flows.
///
/// Transaction methods sign as the issuer and return once the receipt is
/// available; a reverted transaction is reported through
/// [`TxReceipt::status`], not as an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Resolve a core contract's address.
    async fn contract_address(&self, contract: CoreContract) -> Result<Address, LedgerError>;

    /// Stable token allowance from `owner` to `spender`.
    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, LedgerError>;

    /// Raise the stable token allowance granted to `spender` by `amount`.
    async fn increase_allowance(
        &self,
        spender: Address,
        amount: U256,
    ) -> Result<TxReceipt, LedgerError>;

    /// Pay `amount` of stable token for `account`'s lookup quota.
    async fn pay_in_cusd(&self, account: Address, amount: U256) -> Result<TxReceipt, LedgerError>;

    /// Attestations for `identifier` made by any of `trusted_issuers`.
    async fn lookup_attestations(
        &self,
        identifier: ObfuscatedIdentifier,
        trusted_issuers: Vec<Address>,
    ) -> Result<AttestationLookup, LedgerError>;

    async fn register_attestation_as_issuer(
        &self,
        identifier: ObfuscatedIdentifier,
        account: Address,
        issued_on: u64,
    ) -> Result<TxReceipt, LedgerError>;

    async fn revoke_attestation(
        &self,
        identifier: ObfuscatedIdentifier,
        issuer: Address,
        account: Address,
    ) -> Result<TxReceipt, LedgerError>;
}
