//! Metered lookup quota: check and top-up.
//!
//! Topping up is a two-transaction saga. The payment contract can only pull
//! stable token the issuer has approved, so the allowance increase must be
//! confirmed before the payment is submitted. Nothing is compensated on
//! failure: an approved but unspent allowance stays in place and is reused
//! by the next attempt.

use crate::error::{Result, SocialConnectError, TopUpStep};
use crate::issuer::IssuerContext;
use crate::ledger::{CoreContract, Ledger, LedgerError};
use crate::service::IdentifierService;
use crate::types::TxReceipt;
use alloy::primitives::U256;
use odis_client::QuotaStatus;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One funding increment: 0.01 cUSD in wei.
pub const DEFAULT_TOP_UP_UNIT_WEI: u64 = 10_000_000_000_000_000;

/// What `ensure_quota` had to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaOutcome {
    /// Quota was available; nothing was submitted.
    Sufficient { remaining_quota: u64 },
    /// Quota was exhausted and has been paid for.
    ToppedUp {
        /// Present when the allowance had to be raised first.
        approval: Option<TxReceipt>,
        payment: TxReceipt,
        /// Quota after payment, if the re-check succeeded.
        remaining_quota: Option<u64>,
    },
}

/// Keeps the issuer's privacy service quota above zero.
#[derive(Clone)]
pub struct QuotaManager {
    ledger: Arc<dyn Ledger>,
    service: Arc<dyn IdentifierService>,
    issuer: Arc<IssuerContext>,
    top_up_unit: U256,
}

impl QuotaManager {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        service: Arc<dyn IdentifierService>,
        issuer: Arc<IssuerContext>,
    ) -> Self {
        Self {
            ledger,
            service,
            issuer,
            top_up_unit: U256::from(DEFAULT_TOP_UP_UNIT_WEI),
        }
    }

    pub fn with_top_up_unit(mut self, top_up_unit: U256) -> Self {
        self.top_up_unit = top_up_unit;
        self
    }

    pub fn top_up_unit(&self) -> U256 {
        self.top_up_unit
    }

    /// Current quota of the issuer.
    pub async fn quota_status(&self) -> Result<QuotaStatus> {
        self.service
            .quota_status(&self.issuer)
            .await
            .map_err(|e| SocialConnectError::QuotaCheckFailed {
                reason: e.to_string(),
            })
    }

    /// Make sure at least one lookup can be paid for, buying more quota if
    /// none is left. Fails closed: without a baseline reading nothing is
    /// submitted.
    #[instrument(skip(self), fields(issuer = %self.issuer.address()))]
    pub async fn ensure_quota(&self) -> Result<QuotaOutcome> {
        let status = self.quota_status().await?;
        info!("Remaining ODIS quota: {}", status.remaining_quota);

        if status.remaining_quota >= 1 {
            return Ok(QuotaOutcome::Sufficient {
                remaining_quota: status.remaining_quota,
            });
        }

        info!("ODIS quota exhausted, topping up");
        let (approval, payment) = self.top_up().await?;

        let remaining_quota = match self.service.quota_status(&self.issuer).await {
            Ok(status) => {
                info!("Top-up complete, remaining ODIS quota: {}", status.remaining_quota);
                Some(status.remaining_quota)
            }
            Err(e) => {
                warn!("Top-up complete but quota re-check failed: {}", e);
                None
            }
        };

        Ok(QuotaOutcome::ToppedUp {
            approval,
            payment,
            remaining_quota,
        })
    }

    async fn top_up(&self) -> Result<(Option<TxReceipt>, TxReceipt)> {
        let issuer = self.issuer.address();

        let payments = self
            .ledger
            .contract_address(CoreContract::OdisPayments)
            .await
            .map_err(|e| top_up_error(TopUpStep::ResolveContract, e))?;

        let allowance = self
            .ledger
            .allowance(issuer, payments)
            .await
            .map_err(|e| top_up_error(TopUpStep::ReadAllowance, e))?;
        debug!(%allowance, %payments, "Allowance for ODIS payments");

        let approval = if allowance < self.top_up_unit {
            info!(
                "Allowance {} below top-up unit, approving {}",
                allowance, self.top_up_unit
            );
            let receipt = self
                .ledger
                .increase_allowance(payments, self.top_up_unit)
                .await
                .map_err(|e| top_up_error(TopUpStep::IncreaseAllowance, e))?;
            require_success(TopUpStep::IncreaseAllowance, &receipt)?;
            Some(receipt)
        } else {
            None
        };

        let payment = self
            .ledger
            .pay_in_cusd(issuer, self.top_up_unit)
            .await
            .map_err(|e| top_up_error(TopUpStep::Payment, e))?;
        require_success(TopUpStep::Payment, &payment)?;
        info!(tx = %payment.tx_hash, "Paid for ODIS quota");

        Ok((approval, payment))
    }
}

fn top_up_error(step: TopUpStep, e: LedgerError) -> SocialConnectError {
    warn!("Quota top-up {} failed: {}", step, e);
    SocialConnectError::QuotaTopUpFailed {
        step,
        reason: e.to_string(),
    }
}

fn require_success(step: TopUpStep, receipt: &TxReceipt) -> Result<()> {
    if receipt.is_success() {
        Ok(())
    } else {
        warn!(tx = %receipt.tx_hash, "Quota top-up {} reverted", step);
        Err(SocialConnectError::QuotaTopUpFailed {
            step,
            reason: format!("transaction {} reverted", receipt.tx_hash),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issuer::Issuer;
    use crate::ledger::MockLedger;
    use crate::service::{MockIdentifierService, ServiceError};
    use alloy::primitives::{Address, B256};
    use alloy::signers::local::PrivateKeySigner;
    use mockall::Sequence;

    fn payments() -> Address {
        Address::repeat_byte(0x0d)
    }

    fn issuer() -> Arc<IssuerContext> {
        Arc::new(IssuerContext::with_wallet_key(Issuer::new(
            PrivateKeySigner::random(),
        )))
    }

    fn quota(remaining: u64) -> QuotaStatus {
        QuotaStatus {
            performed_query_count: 10 - remaining.min(10),
            total_quota: 10,
            remaining_quota: remaining,
        }
    }

    fn receipt(byte: u8, status: bool) -> TxReceipt {
        TxReceipt {
            tx_hash: B256::repeat_byte(byte),
            status,
        }
    }

    /// Service that reports `before` on the first read and `after` on every
    /// later one.
    fn service_with_quota(before: u64, after: u64) -> MockIdentifierService {
        let mut service = MockIdentifierService::new();
        let mut reads = 0;
        service.expect_quota_status().returning(move |_| {
            reads += 1;
            Ok(if reads == 1 { quota(before) } else { quota(after) })
        });
        service
    }

    fn manager(ledger: MockLedger, service: MockIdentifierService) -> QuotaManager {
        QuotaManager::new(Arc::new(ledger), Arc::new(service), issuer())
    }

    #[tokio::test]
    async fn test_sufficient_quota_submits_nothing() {
        let mut ledger = MockLedger::new();
        ledger.expect_contract_address().never();
        ledger.expect_allowance().never();
        ledger.expect_increase_allowance().never();
        ledger.expect_pay_in_cusd().never();

        let outcome = manager(ledger, service_with_quota(3, 3))
            .ensure_quota()
            .await
            .unwrap();

        assert_eq!(outcome, QuotaOutcome::Sufficient { remaining_quota: 3 });
    }

    #[tokio::test]
    async fn test_quota_check_failure_aborts_before_funding() {
        let mut service = MockIdentifierService::new();
        service
            .expect_quota_status()
            .times(1)
            .returning(|_| Err(ServiceError::Unavailable("connection refused".into())));

        let mut ledger = MockLedger::new();
        ledger.expect_contract_address().never();
        ledger.expect_allowance().never();
        ledger.expect_increase_allowance().never();
        ledger.expect_pay_in_cusd().never();

        let result = manager(ledger, service).ensure_quota().await;
        assert!(matches!(
            result,
            Err(SocialConnectError::QuotaCheckFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_low_allowance_approves_then_pays() {
        let mut seq = Sequence::new();
        let mut ledger = MockLedger::new();
        ledger
            .expect_contract_address()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(payments()));
        ledger
            .expect_allowance()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, spender| *spender == payments())
            .returning(|_, _| Ok(U256::ZERO));
        ledger
            .expect_increase_allowance()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|spender, amount| {
                *spender == payments() && *amount == U256::from(DEFAULT_TOP_UP_UNIT_WEI)
            })
            .returning(|_, _| Ok(receipt(1, true)));
        ledger
            .expect_pay_in_cusd()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(receipt(2, true)));

        let outcome = manager(ledger, service_with_quota(0, 10))
            .ensure_quota()
            .await
            .unwrap();

        assert_eq!(
            outcome,
            QuotaOutcome::ToppedUp {
                approval: Some(receipt(1, true)),
                payment: receipt(2, true),
                remaining_quota: Some(10),
            }
        );
    }

    #[tokio::test]
    async fn test_sufficient_allowance_pays_only() {
        let mut ledger = MockLedger::new();
        ledger
            .expect_contract_address()
            .returning(|_| Ok(payments()));
        ledger
            .expect_allowance()
            .returning(|_, _| Ok(U256::from(DEFAULT_TOP_UP_UNIT_WEI)));
        ledger.expect_increase_allowance().never();
        ledger
            .expect_pay_in_cusd()
            .times(1)
            .returning(|_, _| Ok(receipt(2, true)));

        let outcome = manager(ledger, service_with_quota(0, 10))
            .ensure_quota()
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            QuotaOutcome::ToppedUp { approval: None, .. }
        ));
    }

    #[tokio::test]
    async fn test_failed_approval_skips_payment() {
        let mut ledger = MockLedger::new();
        ledger
            .expect_contract_address()
            .returning(|_| Ok(payments()));
        ledger.expect_allowance().returning(|_, _| Ok(U256::ZERO));
        ledger
            .expect_increase_allowance()
            .times(1)
            .returning(|_, _| Err(LedgerError::Submission("nonce too low".into())));
        ledger.expect_pay_in_cusd().never();

        let result = manager(ledger, service_with_quota(0, 0)).ensure_quota().await;
        assert!(matches!(
            result,
            Err(SocialConnectError::QuotaTopUpFailed {
                step: TopUpStep::IncreaseAllowance,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_reverted_approval_skips_payment() {
        let mut ledger = MockLedger::new();
        ledger
            .expect_contract_address()
            .returning(|_| Ok(payments()));
        ledger.expect_allowance().returning(|_, _| Ok(U256::ZERO));
        ledger
            .expect_increase_allowance()
            .times(1)
            .returning(|_, _| Ok(receipt(1, false)));
        ledger.expect_pay_in_cusd().never();

        let result = manager(ledger, service_with_quota(0, 0)).ensure_quota().await;
        assert!(matches!(
            result,
            Err(SocialConnectError::QuotaTopUpFailed {
                step: TopUpStep::IncreaseAllowance,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_failed_payment_is_top_up_failure() {
        let mut ledger = MockLedger::new();
        ledger
            .expect_contract_address()
            .returning(|_| Ok(payments()));
        ledger.expect_allowance().returning(|_, _| Ok(U256::ZERO));
        ledger
            .expect_increase_allowance()
            .times(1)
            .returning(|_, _| Ok(receipt(1, true)));
        ledger
            .expect_pay_in_cusd()
            .times(1)
            .returning(|_, _| Ok(receipt(2, false)));

        // A reverted payment must not trigger the observability re-check.
        let mut service = MockIdentifierService::new();
        service
            .expect_quota_status()
            .times(1)
            .returning(|_| Ok(quota(0)));

        let result = manager(ledger, service).ensure_quota().await;
        assert!(matches!(
            result,
            Err(SocialConnectError::QuotaTopUpFailed {
                step: TopUpStep::Payment,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_recheck_failure_does_not_fail_top_up() {
        let mut ledger = MockLedger::new();
        ledger
            .expect_contract_address()
            .returning(|_| Ok(payments()));
        ledger
            .expect_allowance()
            .returning(|_, _| Ok(U256::MAX));
        ledger
            .expect_pay_in_cusd()
            .times(1)
            .returning(|_, _| Ok(receipt(2, true)));

        let mut service = MockIdentifierService::new();
        let mut reads = 0;
        service.expect_quota_status().times(2).returning(move |_| {
            reads += 1;
            if reads == 1 {
                Ok(quota(0))
            } else {
                Err(ServiceError::Unavailable("timeout".into()))
            }
        });

        let outcome = manager(ledger, service).ensure_quota().await.unwrap();
        assert!(matches!(
            outcome,
            QuotaOutcome::ToppedUp {
                remaining_quota: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_custom_top_up_unit() {
        let unit = U256::from(5u64);
        let mut ledger = MockLedger::new();
        ledger
            .expect_contract_address()
            .returning(|_| Ok(payments()));
        ledger
            .expect_allowance()
            .returning(|_, _| Ok(U256::from(5u64)));
        ledger.expect_increase_allowance().never();
        ledger
            .expect_pay_in_cusd()
            .withf(move |_, amount| *amount == unit)
            .times(1)
            .returning(|_, _| Ok(receipt(2, true)));

        let manager = manager(ledger, service_with_quota(0, 1)).with_top_up_unit(unit);
        assert_eq!(manager.top_up_unit(), unit);
        assert!(manager.ensure_quota().await.is_ok());
    }
}
