//! Plaintext identifier to obfuscated identifier.

use crate::error::{Result, SocialConnectError};
use crate::issuer::IssuerContext;
use crate::service::IdentifierService;
use crate::types::{Identifier, ObfuscatedIdentifier};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Thin adapter over the privacy service. Does not retry.
#[derive(Clone)]
pub struct IdentifierResolver {
    service: Arc<dyn IdentifierService>,
    issuer: Arc<IssuerContext>,
}

impl IdentifierResolver {
    pub fn new(service: Arc<dyn IdentifierService>, issuer: Arc<IssuerContext>) -> Self {
        Self { service, issuer }
    }

    /// Derive the obfuscated identifier, consuming one unit of quota.
    #[instrument(skip(self, identifier), fields(prefix = %identifier.prefix()))]
    pub async fn resolve(&self, identifier: &Identifier) -> Result<ObfuscatedIdentifier> {
        identifier
            .validate()
            .map_err(|reason| SocialConnectError::IdentifierResolutionFailed { reason })?;

        let obfuscated = self
            .service
            .obfuscated_identifier(identifier, &self.issuer)
            .await
            .map_err(|e| {
                warn!("Identifier resolution failed: {}", e);
                SocialConnectError::IdentifierResolutionFailed {
                    reason: e.to_string(),
                }
            })?;

        debug!(%obfuscated, "Resolved identifier");
        Ok(obfuscated)
    }
}
