//! Error types for the attestation lifecycle.

use alloy::primitives::Address;
use std::fmt;
use thiserror::Error;

/// Step of the quota funding sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopUpStep {
    /// Resolving the quota payment contract address.
    ResolveContract,
    /// Reading the allowance granted to the payment contract.
    ReadAllowance,
    /// Increasing the allowance.
    IncreaseAllowance,
    /// Paying for quota.
    Payment,
}

impl fmt::Display for TopUpStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopUpStep::ResolveContract => write!(f, "contract resolution"),
            TopUpStep::ReadAllowance => write!(f, "allowance read"),
            TopUpStep::IncreaseAllowance => write!(f, "allowance increase"),
            TopUpStep::Payment => write!(f, "payment"),
        }
    }
}

/// Stage of a lookup that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStage {
    Resolve,
    Query,
}

impl fmt::Display for LookupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupStage::Resolve => write!(f, "identifier resolution"),
            LookupStage::Query => write!(f, "registry query"),
        }
    }
}

/// Errors surfaced by register, revoke, lookup and quota operations.
///
/// Every variant is terminal for the operation that raised it.
#[derive(Error, Debug)]
pub enum SocialConnectError {
    #[error("Cannot get remaining quota: {reason}")]
    QuotaCheckFailed { reason: String },

    #[error("Cannot top up quota ({step} failed): {reason}")]
    QuotaTopUpFailed { step: TopUpStep, reason: String },

    #[error("Cannot resolve identifier: {reason}")]
    IdentifierResolutionFailed { reason: String },

    /// `account` is `None` when the existing mapping could not be read.
    #[error("Cannot revoke attestation: {reason}")]
    RevocationFailed {
        account: Option<Address>,
        reason: String,
    },

    #[error("Cannot register attestation for {account}: {reason}")]
    RegistrationFailed { account: Address, reason: String },

    #[error("Cannot lookup attestation ({stage} failed): {reason}")]
    LookupFailed { stage: LookupStage, reason: String },
}

/// Result type alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, SocialConnectError>;
