//! Settlement verification
//!
//! `begin` opens a Pending payment against a gateway order. `confirm`
//! validates the proof, then finalizes payment and request: the payment
//! write is the single-winner gate (conditional on status still
//! Pending), and the request write is sequenced strictly after it. A
//! retry of a confirmed payment re-asserts the request's settled state
//! instead of re-applying anything, which also repairs a crash that
//! landed between the two writes.

use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::db::schemas::{PaymentDoc, PaymentStatus, RequestStatus, ServiceRequestDoc};
use crate::logging::{AuditKind, AuditLogger};
use crate::settlement::gateway::{GatewayOrder, PaymentGateway};
use crate::settlement::proof;
use crate::store::{EntityStore, PaymentStore, RequestStore};
use crate::types::{Result, WaysideError};

/// Validates settlement proofs and finalizes payment + request
pub struct SettlementVerifier {
    payments: Arc<dyn PaymentStore>,
    requests: Arc<dyn RequestStore>,
    gateway: Arc<dyn PaymentGateway>,
    secret: String,
    audit: AuditLogger,
}

impl SettlementVerifier {
    pub fn new(
        store: &EntityStore,
        gateway: Arc<dyn PaymentGateway>,
        secret: String,
        audit: AuditLogger,
    ) -> Self {
        Self {
            payments: Arc::clone(&store.payments),
            requests: Arc::clone(&store.requests),
            gateway,
            secret,
            audit,
        }
    }

    /// Open settlement for a request: create a gateway order and a
    /// Pending payment referencing it. The request itself is not
    /// touched.
    pub async fn begin(
        &self,
        request_id: ObjectId,
        requester_id: ObjectId,
        amount: i64,
    ) -> Result<(PaymentDoc, GatewayOrder)> {
        if amount <= 0 {
            return Err(WaysideError::Validation("amount must be positive".into()));
        }

        // NotFound before any gateway traffic
        self.requests
            .find_by_id(request_id)
            .await?
            .ok_or(WaysideError::NotFound("service request"))?;

        let receipt = format!("receipt_{}", request_id.to_hex());
        let order = self.gateway.create_order(amount, &receipt).await?;

        let payment = self
            .payments
            .insert(PaymentDoc::new(
                request_id,
                requester_id,
                amount,
                order.order_ref.clone(),
            ))
            .await?;

        info!(
            payment = %payment._id.map(|id| id.to_hex()).unwrap_or_default(),
            request = %request_id.to_hex(),
            order = %order.order_ref,
            amount,
            "settlement opened"
        );

        Ok((payment, order))
    }

    /// Confirm settlement with a signed proof from the gateway.
    ///
    /// On a valid proof the payment moves Pending -> Success (recording
    /// the transaction reference and signature) and the linked request
    /// moves to Settled with its payment reference set. Safe to retry:
    /// a second call with the same inputs finds the payment already
    /// Success and only re-asserts the request state.
    pub async fn confirm(
        &self,
        payment_id: ObjectId,
        order_ref: &str,
        txn_ref: &str,
        signature: &str,
    ) -> Result<(PaymentDoc, ServiceRequestDoc)> {
        let payment = self
            .payments
            .find_by_id(payment_id)
            .await?
            .ok_or(WaysideError::NotFound("payment"))?;

        if !proof::verify(order_ref, txn_ref, &self.secret, signature) {
            warn!(
                payment = %payment_id.to_hex(),
                order = %order_ref,
                "settlement proof rejected"
            );
            self.audit
                .record(AuditKind::ProofRejected)
                .entity(payment_id.to_hex())
                .detail(format!("order {}", order_ref))
                .emit()
                .await;
            return Err(WaysideError::InvalidSignature);
        }

        match self
            .payments
            .confirm_if_pending(payment_id, txn_ref, signature)
            .await?
        {
            Some(confirmed) => self.settle_request(confirmed).await,
            None => self.retry_confirmed(payment, txn_ref).await,
        }
    }

    /// Won the payment gate: the proof is accepted, so the request write
    /// must follow. Its failure is surfaced and audit-flagged for a
    /// compensating retry.
    async fn settle_request(
        &self,
        payment: PaymentDoc,
    ) -> Result<(PaymentDoc, ServiceRequestDoc)> {
        let payment_id = payment._id.ok_or_else(|| {
            WaysideError::Database("confirmed payment has no id".into())
        })?;

        match self.requests.mark_settled(payment.request_id, payment_id).await {
            Ok(Some(request)) => {
                info!(
                    payment = %payment_id.to_hex(),
                    request = %payment.request_id.to_hex(),
                    amount = payment.amount,
                    "settlement confirmed"
                );
                self.audit
                    .record(AuditKind::SettlementConfirmed)
                    .entity(payment_id.to_hex())
                    .detail(format!(
                        "request {} amount {}",
                        payment.request_id.to_hex(),
                        payment.amount
                    ))
                    .emit()
                    .await;
                Ok((payment, request))
            }
            Ok(None) => {
                error!(
                    payment = %payment_id.to_hex(),
                    request = %payment.request_id.to_hex(),
                    "payment is Success but its request is missing"
                );
                self.audit
                    .record(AuditKind::SettlementIncomplete)
                    .entity(payment_id.to_hex())
                    .detail("request missing after confirmation".to_string())
                    .emit()
                    .await;
                Err(WaysideError::NotFound("service request"))
            }
            Err(e) => {
                error!(
                    payment = %payment_id.to_hex(),
                    request = %payment.request_id.to_hex(),
                    error = %e,
                    "payment is Success but the request write failed; retry the confirmation"
                );
                self.audit
                    .record(AuditKind::SettlementIncomplete)
                    .entity(payment_id.to_hex())
                    .detail(format!("request write failed: {}", e))
                    .emit()
                    .await;
                Err(e)
            }
        }
    }

    /// Lost the payment gate. For a retry of an already-accepted
    /// confirmation, re-assert the request's settled state and return
    /// success without double-applying anything.
    async fn retry_confirmed(
        &self,
        stale: PaymentDoc,
        txn_ref: &str,
    ) -> Result<(PaymentDoc, ServiceRequestDoc)> {
        let payment_id = stale
            ._id
            .ok_or_else(|| WaysideError::Database("payment has no id".into()))?;

        let current = self
            .payments
            .find_by_id(payment_id)
            .await?
            .ok_or(WaysideError::NotFound("payment"))?;

        if current.status != PaymentStatus::SUCCESS {
            // Pending but the conditional write matched nothing: the
            // store mutated underneath us; ask the caller to retry.
            return Err(WaysideError::Database(
                "payment confirmation did not apply".into(),
            ));
        }

        if current.txn_ref.as_deref() != Some(txn_ref) {
            return Err(WaysideError::Validation(
                "payment already confirmed with a different transaction".into(),
            ));
        }

        let request = match self.requests.find_by_id(current.request_id).await? {
            Some(r) if r.status == RequestStatus::SETTLED && r.payment_id == Some(payment_id) => r,
            Some(_) => {
                // Crash or failure between the two writes on the first
                // attempt: finish the job now.
                warn!(
                    payment = %payment_id.to_hex(),
                    request = %current.request_id.to_hex(),
                    "re-applying request settlement for a confirmed payment"
                );
                self.requests
                    .mark_settled(current.request_id, payment_id)
                    .await?
                    .ok_or(WaysideError::NotFound("service request"))?
            }
            None => return Err(WaysideError::NotFound("service request")),
        };

        Ok((current, request))
    }

    /// Payments opened by a requester, newest first
    pub async fn list_for_requester(&self, requester_id: ObjectId) -> Result<Vec<PaymentDoc>> {
        self.payments.list_by_requester(requester_id).await
    }

    /// All payments system-wide, newest first
    pub async fn list_all(&self) -> Result<Vec<PaymentDoc>> {
        self.payments.list_all().await
    }
}
