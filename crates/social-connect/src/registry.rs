//! Register, revoke and look up attestations as the issuer.

use crate::error::{LookupStage, Result, SocialConnectError};
use crate::issuer::IssuerContext;
use crate::ledger::{Ledger, LedgerError};
use crate::quota::QuotaManager;
use crate::resolver::IdentifierResolver;
use crate::service::IdentifierService;
use crate::types::{AttestationLookup, ExistingMapping, Identifier, ObfuscatedIdentifier, TxReceipt};
use alloy::primitives::{Address, U256};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Issuer-side view of the federated attestations registry.
///
/// There is no update primitive on chain: replacing a mapping means revoking
/// the old one and registering the new one as separate transactions.
pub struct AttestationRegistry {
    ledger: Arc<dyn Ledger>,
    resolver: IdentifierResolver,
    quota: QuotaManager,
    issuer: Arc<IssuerContext>,
}

impl AttestationRegistry {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        service: Arc<dyn IdentifierService>,
        issuer: Arc<IssuerContext>,
    ) -> Self {
        Self {
            resolver: IdentifierResolver::new(service.clone(), issuer.clone()),
            quota: QuotaManager::new(ledger.clone(), service, issuer.clone()),
            ledger,
            issuer,
        }
    }

    pub fn with_top_up_unit(mut self, top_up_unit: U256) -> Self {
        self.quota = self.quota.with_top_up_unit(top_up_unit);
        self
    }

    pub fn quota(&self) -> &QuotaManager {
        &self.quota
    }

    pub fn resolver(&self) -> &IdentifierResolver {
        &self.resolver
    }

    pub fn issuer(&self) -> Address {
        self.issuer.address()
    }

    /// Link `identifier` to `target`.
    ///
    /// With `force`, every account this issuer currently maps the identifier
    /// to is revoked first and the registration is only submitted once all
    /// revocations succeeded. Without `force` the registry is not read at
    /// all and duplicate handling is left to the contract.
    #[instrument(skip(self, identifier), fields(target = %target, force))]
    pub async fn register(
        &self,
        identifier: &Identifier,
        target: Address,
        force: bool,
    ) -> Result<TxReceipt> {
        self.quota.ensure_quota().await?;

        let obfuscated = self.resolver.resolve(identifier).await?;

        if force {
            info!("Force mode: replacing any existing mapping");
            let existing = self.existing_mapping(obfuscated).await.map_err(|e| {
                SocialConnectError::RevocationFailed {
                    account: None,
                    reason: format!("could not read existing mapping: {}", e),
                }
            })?;

            for mapping in &existing.existing {
                self.revoke(obfuscated, self.issuer.address(), mapping.account)
                    .await?;
                info!("Revoked existing mapping to {}", mapping.account);
            }
        }

        let issued_on = Utc::now().timestamp().max(0) as u64;
        let receipt = self
            .ledger
            .register_attestation_as_issuer(obfuscated, target, issued_on)
            .await
            .map_err(|e| registration_error(target, e.to_string()))?;

        if !receipt.is_success() {
            return Err(registration_error(
                target,
                format!("transaction {} reverted", receipt.tx_hash),
            ));
        }

        info!(tx = %receipt.tx_hash, "Attestation registered");
        Ok(receipt)
    }

    /// Active mappings of `identifier` under this issuer.
    pub async fn existing_mapping(
        &self,
        identifier: ObfuscatedIdentifier,
    ) -> std::result::Result<ExistingMapping, LedgerError> {
        let issuer = self.issuer.address();
        let lookup = self
            .ledger
            .lookup_attestations(identifier, vec![issuer])
            .await?;

        let existing = lookup
            .mappings()
            .into_iter()
            .filter(|m| m.signer == issuer)
            .collect();

        Ok(ExistingMapping { existing })
    }

    /// Revoke the mapping from `identifier` to `account`. Consumes no quota.
    #[instrument(skip(self), fields(identifier = %identifier))]
    pub async fn revoke(
        &self,
        identifier: ObfuscatedIdentifier,
        issuer: Address,
        account: Address,
    ) -> Result<TxReceipt> {
        let receipt = self
            .ledger
            .revoke_attestation(identifier, issuer, account)
            .await
            .map_err(|e| revocation_error(account, e.to_string()))?;

        if !receipt.is_success() {
            return Err(revocation_error(
                account,
                format!("transaction {} reverted", receipt.tx_hash),
            ));
        }

        Ok(receipt)
    }

    /// Accounts this issuer has linked to `identifier`.
    ///
    /// Resolution is metered like registration but never tops up quota; an
    /// exhausted quota fails the lookup.
    #[instrument(skip(self, identifier))]
    pub async fn lookup(&self, identifier: &Identifier) -> Result<AttestationLookup> {
        let obfuscated = self
            .resolver
            .resolve(identifier)
            .await
            .map_err(|e| lookup_error(LookupStage::Resolve, e.to_string()))?;

        let lookup = self
            .ledger
            .lookup_attestations(obfuscated, vec![self.issuer.address()])
            .await
            .map_err(|e| lookup_error(LookupStage::Query, e.to_string()))?;

        info!("Found {} attestation(s)", lookup.len());
        Ok(lookup)
    }
}

fn registration_error(account: Address, reason: String) -> SocialConnectError {
    warn!("Registration for {} failed: {}", account, reason);
    SocialConnectError::RegistrationFailed { account, reason }
}

fn revocation_error(account: Address, reason: String) -> SocialConnectError {
    warn!("Revocation of {} failed: {}", account, reason);
    SocialConnectError::RevocationFailed {
        account: Some(account),
        reason,
    }
}

fn lookup_error(stage: LookupStage, reason: String) -> SocialConnectError {
    warn!("Lookup failed during {}: {}", stage, reason);
    SocialConnectError::LookupFailed { stage, reason }
}
