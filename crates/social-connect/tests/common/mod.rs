//! Common test utilities for integration tests.

#![allow(dead_code)]

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use odis_client::QuotaStatus;
use social_connect::{
    AttestationLookup, CoreContract, Identifier, IdentifierService, Issuer, IssuerContext, Ledger,
    LedgerError, ObfuscatedIdentifier, ServiceError, TxReceipt,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Lookups granted per paid top-up unit.
pub const QUERIES_PER_TOP_UP: u64 = 10;

/// Ledger calls in the order they were made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    Allowance,
    IncreaseAllowance(U256),
    Pay(U256),
    Lookup,
    Register(Address),
    Revoke(Address),
}

pub fn payments_address() -> Address {
    Address::repeat_byte(0xaa)
}

/// Shared lookup quota of the issuer, topped up by paying the fake ledger.
#[derive(Debug, Clone, Default)]
pub struct QuotaPool {
    total: Arc<AtomicU64>,
    performed: Arc<AtomicU64>,
}

impl QuotaPool {
    pub fn new(total: u64) -> Self {
        let pool = Self::default();
        pool.total.store(total, Ordering::SeqCst);
        pool
    }

    pub fn status(&self) -> QuotaStatus {
        let total = self.total.load(Ordering::SeqCst);
        let performed = self.performed.load(Ordering::SeqCst);
        QuotaStatus {
            performed_query_count: performed,
            total_quota: total,
            remaining_quota: total.saturating_sub(performed),
        }
    }

    fn consume(&self) -> bool {
        if self.status().remaining_quota == 0 {
            return false;
        }
        self.performed.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn credit(&self, queries: u64) {
        self.total.fetch_add(queries, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct LedgerState {
    calls: Vec<LedgerCall>,
    allowance: U256,
    attestations: HashMap<B256, Vec<(Address, Address, u64)>>,
    tx_count: u64,
}

/// In-memory stand-in for the Celo core contracts.
///
/// Transactions are signed by `issuer`.
pub struct FakeLedger {
    issuer: Address,
    state: Mutex<LedgerState>,
    quota: QuotaPool,
    fail_revoke: AtomicBool,
}

impl FakeLedger {
    pub fn new(issuer: Address, quota: QuotaPool) -> Self {
        Self {
            issuer,
            state: Mutex::new(LedgerState::default()),
            quota,
            fail_revoke: AtomicBool::new(false),
        }
    }

    /// Make every following revocation revert on chain.
    pub fn fail_revocations(&self) {
        self.fail_revoke.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn receipt(state: &mut LedgerState, status: bool) -> TxReceipt {
        state.tx_count += 1;
        TxReceipt {
            tx_hash: B256::left_padding_from(&state.tx_count.to_be_bytes()),
            status,
        }
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn contract_address(&self, contract: CoreContract) -> Result<Address, LedgerError> {
        match contract {
            CoreContract::OdisPayments => Ok(payments_address()),
            CoreContract::StableToken => Ok(Address::repeat_byte(0xbb)),
            CoreContract::FederatedAttestations => Ok(Address::repeat_byte(0xcc)),
        }
    }

    async fn allowance(&self, _owner: Address, _spender: Address) -> Result<U256, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(LedgerCall::Allowance);
        Ok(state.allowance)
    }

    async fn increase_allowance(
        &self,
        _spender: Address,
        amount: U256,
    ) -> Result<TxReceipt, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(LedgerCall::IncreaseAllowance(amount));
        state.allowance += amount;
        Ok(Self::receipt(&mut state, true))
    }

    async fn pay_in_cusd(&self, _account: Address, amount: U256) -> Result<TxReceipt, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(LedgerCall::Pay(amount));
        if state.allowance < amount {
            return Ok(Self::receipt(&mut state, false));
        }
        state.allowance -= amount;
        self.quota.credit(QUERIES_PER_TOP_UP);
        Ok(Self::receipt(&mut state, true))
    }

    async fn lookup_attestations(
        &self,
        identifier: ObfuscatedIdentifier,
        trusted_issuers: Vec<Address>,
    ) -> Result<AttestationLookup, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(LedgerCall::Lookup);

        let mut lookup = AttestationLookup::default();
        for (account, signer, issued_on) in state
            .attestations
            .get(&identifier.as_b256())
            .into_iter()
            .flatten()
            .filter(|(_, signer, _)| trusted_issuers.contains(signer))
        {
            lookup.accounts.push(*account);
            lookup.signers.push(*signer);
            lookup.issued_ons.push(*issued_on);
            lookup.published_ons.push(*issued_on);
        }
        Ok(lookup)
    }

    async fn register_attestation_as_issuer(
        &self,
        identifier: ObfuscatedIdentifier,
        account: Address,
        issued_on: u64,
    ) -> Result<TxReceipt, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(LedgerCall::Register(account));

        let issuer = self.issuer;
        let entries = state
            .attestations
            .entry(identifier.as_b256())
            .or_default();
        if entries.iter().any(|(a, s, _)| *a == account && *s == issuer) {
            return Ok(Self::receipt(&mut state, false));
        }
        entries.push((account, issuer, issued_on));
        Ok(Self::receipt(&mut state, true))
    }

    async fn revoke_attestation(
        &self,
        identifier: ObfuscatedIdentifier,
        issuer: Address,
        account: Address,
    ) -> Result<TxReceipt, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(LedgerCall::Revoke(account));
        if self.fail_revoke.load(Ordering::SeqCst) {
            return Ok(Self::receipt(&mut state, false));
        }

        let entries = state
            .attestations
            .entry(identifier.as_b256())
            .or_default();
        let before = entries.len();
        entries.retain(|(a, s, _)| !(*a == account && *s == issuer));
        let removed = entries.len() < before;
        Ok(Self::receipt(&mut state, removed))
    }
}

/// Deterministic identifier service charging the shared [`QuotaPool`].
pub struct FakeIdentifierService {
    quota: QuotaPool,
}

impl FakeIdentifierService {
    pub fn new(quota: QuotaPool) -> Self {
        Self { quota }
    }

    pub fn derive(identifier: &Identifier, issuer: Address) -> ObfuscatedIdentifier {
        let preimage = format!(
            "{}://{}__{}",
            identifier.prefix(),
            identifier.plaintext(),
            issuer
        );
        ObfuscatedIdentifier(keccak256(preimage.as_bytes()))
    }
}

#[async_trait]
impl IdentifierService for FakeIdentifierService {
    async fn quota_status(&self, _issuer: &IssuerContext) -> Result<QuotaStatus, ServiceError> {
        Ok(self.quota.status())
    }

    async fn obfuscated_identifier(
        &self,
        identifier: &Identifier,
        issuer: &IssuerContext,
    ) -> Result<ObfuscatedIdentifier, ServiceError> {
        if !self.quota.consume() {
            return Err(ServiceError::Unavailable("out of quota".into()));
        }
        Ok(Self::derive(identifier, issuer.address()))
    }
}

/// Issuer with a fresh random key.
pub fn test_issuer() -> Arc<IssuerContext> {
    Arc::new(IssuerContext::with_wallet_key(Issuer::new(
        PrivateKeySigner::random(),
    )))
}

/// Fake ledger and identifier service sharing one quota pool.
pub fn test_backends(
    issuer: &IssuerContext,
    initial_quota: u64,
) -> (Arc<FakeLedger>, Arc<FakeIdentifierService>, QuotaPool) {
    let quota = QuotaPool::new(initial_quota);
    let ledger = Arc::new(FakeLedger::new(issuer.address(), quota.clone()));
    let service = Arc::new(FakeIdentifierService::new(quota.clone()));
    (ledger, service, quota)
}
