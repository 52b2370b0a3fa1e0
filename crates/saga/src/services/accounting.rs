//! Accounting service: payment authorization against a payment gateway.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use common::OrderId;
use domain::{Money, PaymentStatus};
use resilience::TransportError;
use serde::{Deserialize, Serialize};

use super::FaultInjector;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub order_id: OrderId,
    pub amount: Money,
    pub payment_method: String,
}

/// `status` is `AUTHORIZED` or `FAILED`; a failed authorization is a
/// successful call that declined the charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
}

#[async_trait]
pub trait AccountingService: Send + Sync {
    async fn authorize_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentResponse, TransportError>;
}

/// Outcome of a gateway charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeOutcome {
    pub approved: bool,
    pub transaction_id: Option<String>,
}

/// The card/UPI processor behind the accounting service.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, amount: Money, method: &str) -> ChargeOutcome;
}

/// Gateway that approves everything unless told to decline.
#[derive(Debug, Default)]
pub struct MockPaymentGateway {
    decline: AtomicBool,
    sequence: AtomicU64,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_decline(&self, decline: bool) {
        self.decline.store(decline, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn charge(&self, amount: Money, method: &str) -> ChargeOutcome {
        if self.decline.load(Ordering::SeqCst) {
            tracing::info!(%amount, method, "payment gateway declined charge");
            return ChargeOutcome {
                approved: false,
                transaction_id: None,
            };
        }
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        ChargeOutcome {
            approved: true,
            transaction_id: Some(format!("TXN-{n:06}")),
        }
    }
}

/// In-memory accounting service that records every authorization request.
#[derive(Clone)]
pub struct InMemoryAccountingService {
    gateway: Arc<dyn PaymentGateway>,
    authorizations: Arc<Mutex<Vec<(PaymentRequest, PaymentResponse)>>>,
    faults: FaultInjector,
}

impl Default for InMemoryAccountingService {
    fn default() -> Self {
        Self::new(Arc::new(MockPaymentGateway::new()))
    }
}

impl InMemoryAccountingService {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            gateway,
            authorizations: Arc::default(),
            faults: FaultInjector::default(),
        }
    }

    /// Authorization requests answered so far, declined ones included.
    pub fn authorizations(&self) -> Vec<(PaymentRequest, PaymentResponse)> {
        self.authorizations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }
}

#[async_trait]
impl AccountingService for InMemoryAccountingService {
    async fn authorize_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentResponse, TransportError> {
        self.faults.enter("accounting-service").await?;

        let outcome = self
            .gateway
            .charge(request.amount, &request.payment_method)
            .await;
        let response = PaymentResponse {
            status: if outcome.approved {
                PaymentStatus::Authorized
            } else {
                PaymentStatus::Failed
            },
            transaction_id: outcome.transaction_id,
        };

        self.authorizations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((request.clone(), response.clone()));
        Ok(response)
    }
}
