//! Celo core contracts via Alloy.
//!
//! Contract addresses are resolved through the core registry on every call,
//! matching how the registry is meant to be used across upgrades.

use crate::issuer::Issuer;
use crate::ledger::{CoreContract, Ledger, LedgerError};
use crate::types::{AttestationLookup, ObfuscatedIdentifier, TxReceipt};
use alloy::primitives::{address, Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use alloy::sol;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use tracing::{debug, info, instrument};

/// Address of the Celo core contract registry on every network.
pub const CELO_REGISTRY_ADDRESS: Address = address!("000000000000000000000000000000000000ce10");

sol! {
    #[sol(rpc)]
    interface IRegistry {
        function getAddressForString(string calldata identifier) external view returns (address);
    }

    #[sol(rpc)]
    interface IStableToken {
        function allowance(address owner, address spender) external view returns (uint256);
        function increaseAllowance(address spender, uint256 value) external returns (bool);
    }

    #[sol(rpc)]
    interface IOdisPayments {
        function payInCUSD(address account, uint256 value) external;
    }

    #[sol(rpc)]
    interface IFederatedAttestations {
        function lookupAttestations(bytes32 identifier, address[] calldata trustedIssuers)
            external
            view
            returns (
                uint256[] memory countsPerIssuer,
                address[] memory accounts,
                address[] memory signers,
                uint64[] memory issuedOns,
                uint64[] memory publishedOns
            );

        function registerAttestationAsIssuer(bytes32 identifier, address account, uint64 issuedOn)
            external;

        function revokeAttestation(bytes32 identifier, address issuer, address account) external;
    }
}

/// Ledger backed by a Celo JSON-RPC endpoint, signing as the issuer.
#[derive(Clone)]
pub struct CeloLedger {
    provider: DynProvider,
    registry: Address,
}

impl CeloLedger {
    /// Connect to `rpc_url` with the issuer's wallet attached.
    pub fn connect(rpc_url: &str, registry: Address, issuer: &Issuer) -> Result<Self, LedgerError> {
        let url: Url = rpc_url
            .parse()
            .map_err(|e| LedgerError::InvalidUrl(format!("{}: {}", rpc_url, e)))?;

        let provider = ProviderBuilder::new()
            .wallet(issuer.wallet())
            .connect_http(url)
            .erased();

        info!(
            "Celo ledger ready: rpc={}, registry={}, issuer={}",
            rpc_url,
            registry,
            issuer.address()
        );

        Ok(Self { provider, registry })
    }

    async fn resolve(&self, contract: CoreContract) -> Result<Address, LedgerError> {
        let registry = IRegistry::new(self.registry, self.provider.clone());
        let address = registry
            .getAddressForString(contract.registry_id().to_string())
            .call()
            .await
            .map_err(|e| LedgerError::Call(e.to_string()))?;

        if address == Address::ZERO {
            return Err(LedgerError::UnknownContract(contract.to_string()));
        }

        debug!("Resolved {} to {}", contract, address);
        Ok(address)
    }
}

fn to_receipt(receipt: &TransactionReceipt) -> TxReceipt {
    TxReceipt {
        tx_hash: receipt.transaction_hash,
        status: receipt.status(),
    }
}

fn submission_error(e: alloy::contract::Error) -> LedgerError {
    LedgerError::Submission(e.to_string())
}

fn confirmation_error(e: alloy::providers::PendingTransactionError) -> LedgerError {
    LedgerError::Confirmation(e.to_string())
}

#[async_trait]
impl Ledger for CeloLedger {
    async fn contract_address(&self, contract: CoreContract) -> Result<Address, LedgerError> {
        self.resolve(contract).await
    }

    #[instrument(skip(self))]
    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, LedgerError> {
        let token = IStableToken::new(
            self.resolve(CoreContract::StableToken).await?,
            self.provider.clone(),
        );

        token
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| LedgerError::Call(e.to_string()))
    }

    #[instrument(skip(self))]
    async fn increase_allowance(
        &self,
        spender: Address,
        amount: U256,
    ) -> Result<TxReceipt, LedgerError> {
        let token = IStableToken::new(
            self.resolve(CoreContract::StableToken).await?,
            self.provider.clone(),
        );

        let receipt = token
            .increaseAllowance(spender, amount)
            .send()
            .await
            .map_err(submission_error)?
            .get_receipt()
            .await
            .map_err(confirmation_error)?;

        Ok(to_receipt(&receipt))
    }

    #[instrument(skip(self))]
    async fn pay_in_cusd(&self, account: Address, amount: U256) -> Result<TxReceipt, LedgerError> {
        let payments = IOdisPayments::new(
            self.resolve(CoreContract::OdisPayments).await?,
            self.provider.clone(),
        );

        let receipt = payments
            .payInCUSD(account, amount)
            .send()
            .await
            .map_err(submission_error)?
            .get_receipt()
            .await
            .map_err(confirmation_error)?;

        Ok(to_receipt(&receipt))
    }

    #[instrument(skip(self, trusted_issuers), fields(identifier = %identifier))]
    async fn lookup_attestations(
        &self,
        identifier: ObfuscatedIdentifier,
        trusted_issuers: Vec<Address>,
    ) -> Result<AttestationLookup, LedgerError> {
        let attestations = IFederatedAttestations::new(
            self.resolve(CoreContract::FederatedAttestations).await?,
            self.provider.clone(),
        );

        let result = attestations
            .lookupAttestations(identifier.as_b256(), trusted_issuers)
            .call()
            .await
            .map_err(|e| LedgerError::Call(e.to_string()))?;

        Ok(AttestationLookup {
            accounts: result.accounts,
            signers: result.signers,
            issued_ons: result.issuedOns,
            published_ons: result.publishedOns,
        })
    }

    #[instrument(skip(self), fields(identifier = %identifier))]
    async fn register_attestation_as_issuer(
        &self,
        identifier: ObfuscatedIdentifier,
        account: Address,
        issued_on: u64,
    ) -> Result<TxReceipt, LedgerError> {
        let attestations = IFederatedAttestations::new(
            self.resolve(CoreContract::FederatedAttestations).await?,
            self.provider.clone(),
        );

        let receipt = attestations
            .registerAttestationAsIssuer(identifier.as_b256(), account, issued_on)
            .send()
            .await
            .map_err(submission_error)?
            .get_receipt()
            .await
            .map_err(confirmation_error)?;

        Ok(to_receipt(&receipt))
    }

    #[instrument(skip(self), fields(identifier = %identifier))]
    async fn revoke_attestation(
        &self,
        identifier: ObfuscatedIdentifier,
        issuer: Address,
        account: Address,
    ) -> Result<TxReceipt, LedgerError> {
        let attestations = IFederatedAttestations::new(
            self.resolve(CoreContract::FederatedAttestations).await?,
            self.provider.clone(),
        );

        let receipt = attestations
            .revokeAttestation(identifier.as_b256(), issuer, account)
            .send()
            .await
            .map_err(submission_error)?
            .get_receipt()
            .await
            .map_err(confirmation_error)?;

        Ok(to_receipt(&receipt))
    }
}
