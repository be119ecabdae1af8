//! Social Connect - issuer-side phone number attestations on Celo.
//!
//! Links phone numbers to accounts in the `FederatedAttestations` registry
//! without publishing the number itself:
//! - The number is turned into an obfuscated identifier by ODIS, which
//!   charges one unit of prepaid quota per lookup
//! - Quota is bought on chain when it runs out (approve, then pay)
//! - Registrations can replace an existing mapping (revoke, then register)
//!
//! # Architecture
//!
//! ```text
//! register ─► QuotaManager::ensure_quota ─► IdentifierResolver::resolve
//!          ─► [force] lookup + revoke ─► registerAttestationAsIssuer
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod issuer;
pub mod ledger;
pub mod quota;
pub mod registry;
pub mod resolver;
pub mod service;
pub mod types;

pub use chain::{CeloLedger, CELO_REGISTRY_ADDRESS};
pub use config::Config;
pub use error::{LookupStage, SocialConnectError, TopUpStep};
pub use issuer::{Issuer, IssuerContext};
pub use ledger::{CoreContract, Ledger, LedgerError};
pub use quota::{QuotaManager, QuotaOutcome, DEFAULT_TOP_UP_UNIT_WEI};
pub use registry::AttestationRegistry;
pub use resolver::IdentifierResolver;
pub use service::{IdentifierService, OdisIdentifierService, ServiceError};
pub use types::{
    AttestationLookup, ExistingMapping, Identifier, Mapping, ObfuscatedIdentifier, TxReceipt,
};

pub use odis_client::{IdentifierPrefix, QuotaStatus};
