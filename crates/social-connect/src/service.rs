//! Privacy service collaborator.

use crate::issuer::IssuerContext;
use crate::types::{Identifier, ObfuscatedIdentifier};
use async_trait::async_trait;
use odis_client::{Blinder, OdisClient, OdisError, QuotaStatus};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Odis(#[from] OdisError),

    /// Raised by implementations not backed by ODIS.
    #[error("Identifier service unavailable: {0}")]
    Unavailable(String),
}

/// Quota reads and identifier obfuscation on behalf of an issuer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentifierService: Send + Sync {
    async fn quota_status(&self, issuer: &IssuerContext) -> Result<QuotaStatus, ServiceError>;

    /// Derive the obfuscated identifier. Consumes one unit of quota.
    async fn obfuscated_identifier(
        &self,
        identifier: &Identifier,
        issuer: &IssuerContext,
    ) -> Result<ObfuscatedIdentifier, ServiceError>;
}

/// [`IdentifierService`] backed by an ODIS combiner.
pub struct OdisIdentifierService {
    client: OdisClient,
    blinder: Arc<dyn Blinder>,
}

impl OdisIdentifierService {
    pub fn new(client: OdisClient, blinder: Arc<dyn Blinder>) -> Self {
        Self { client, blinder }
    }
}

#[async_trait]
impl IdentifierService for OdisIdentifierService {
    async fn quota_status(&self, issuer: &IssuerContext) -> Result<QuotaStatus, ServiceError> {
        Ok(self
            .client
            .quota_status(issuer.address(), &issuer.auth)
            .await?)
    }

    async fn obfuscated_identifier(
        &self,
        identifier: &Identifier,
        issuer: &IssuerContext,
    ) -> Result<ObfuscatedIdentifier, ServiceError> {
        let result = self
            .client
            .obfuscated_identifier(
                identifier.plaintext(),
                identifier.prefix(),
                issuer.address(),
                &issuer.auth,
                self.blinder.as_ref(),
            )
            .await?;

        debug!(obfuscated = %result.obfuscated_identifier, "Derived obfuscated identifier");
        Ok(ObfuscatedIdentifier(result.obfuscated_identifier))
    }
}
