//! Settlement tests over the in-memory store and the local gateway stub
//!
//! Covers the begin/confirm happy path, proof rejection, idempotent and
//! concurrent confirmation, dashboard revenue, and the unchecked
//! operator override.

use std::sync::Arc;

use bson::oid::ObjectId;
use wayside::auth::{Principal, Role};
use wayside::db::schemas::{
    AccountDoc, Location, PaymentStatus, RequestStatus, ServiceRequestDoc,
};
use wayside::dispatch::{ClaimCoordinator, RequestLifecycle};
use wayside::logging::AuditLogger;
use wayside::reports::DashboardReporter;
use wayside::settlement::{proof, LocalPaymentGateway, SettlementVerifier};
use wayside::store::EntityStore;
use wayside::types::WaysideError;

const SECRET: &str = "test-gateway-secret";

struct Harness {
    store: EntityStore,
    coordinator: ClaimCoordinator,
    lifecycle: RequestLifecycle,
    verifier: Arc<SettlementVerifier>,
    reporter: DashboardReporter,
}

fn harness() -> Harness {
    let store = EntityStore::in_memory();
    let audit = AuditLogger::new("test-node".into());
    Harness {
        coordinator: ClaimCoordinator::new(&store, audit.clone()),
        lifecycle: RequestLifecycle::new(&store, audit.clone()),
        verifier: Arc::new(SettlementVerifier::new(
            &store,
            Arc::new(LocalPaymentGateway),
            SECRET.to_string(),
            audit,
        )),
        reporter: DashboardReporter::new(&store),
        store,
    }
}

async fn seed_account(store: &EntityStore, identifier: &str, role: Role) -> ObjectId {
    store
        .accounts
        .insert(AccountDoc::new(
            identifier.to_string(),
            identifier.split('@').next().unwrap().to_string(),
            "555-0100".to_string(),
            "$argon2id$unused-in-these-tests".to_string(),
            role,
        ))
        .await
        .unwrap()
        ._id
        .unwrap()
}

async fn seed_assigned_request(h: &Harness) -> (ObjectId, ObjectId) {
    let requester = seed_account(&h.store, "r1@wayside.test", Role::Requester).await;
    let provider = seed_account(&h.store, "p1@wayside.test", Role::Provider).await;
    let request_id = h
        .store
        .requests
        .insert(ServiceRequestDoc::new(
            requester,
            "battery".to_string(),
            "won't start, lights dead".to_string(),
            Location::default(),
        ))
        .await
        .unwrap()
        ._id
        .unwrap();
    h.coordinator.claim(request_id, provider).await.unwrap();
    (request_id, requester)
}

#[tokio::test]
async fn begin_then_confirm_settles_request() {
    let h = harness();
    let (request_id, requester) = seed_assigned_request(&h).await;

    let (payment, order) = h.verifier.begin(request_id, requester, 500).await.unwrap();
    let payment_id = payment._id.unwrap();

    assert_eq!(payment.status, PaymentStatus::PENDING);
    assert_eq!(payment.amount, 500);
    assert_eq!(payment.order_ref, order.order_ref);
    assert_eq!(order.amount_minor, 50_000);

    // The request is untouched until confirmation
    let request = h.store.requests.find_by_id(request_id).await.unwrap().unwrap();
    assert_eq!(request.status, RequestStatus::ASSIGNED);
    assert!(request.payment_id.is_none());

    let signature = proof::expected_signature(&order.order_ref, "txn_1", SECRET);
    let (confirmed, settled) = h
        .verifier
        .confirm(payment_id, &order.order_ref, "txn_1", &signature)
        .await
        .unwrap();

    assert_eq!(confirmed.status, PaymentStatus::SUCCESS);
    assert_eq!(confirmed.txn_ref.as_deref(), Some("txn_1"));
    assert_eq!(confirmed.signature.as_deref(), Some(signature.as_str()));
    assert_eq!(settled.status, RequestStatus::SETTLED);
    assert_eq!(settled.payment_id, Some(payment_id));
}

#[tokio::test]
async fn invalid_signature_leaves_both_records_untouched() {
    let h = harness();
    let (request_id, requester) = seed_assigned_request(&h).await;

    let (payment, order) = h.verifier.begin(request_id, requester, 500).await.unwrap();
    let payment_id = payment._id.unwrap();

    let bogus = proof::expected_signature(&order.order_ref, "txn_1", "wrong-secret");
    let result = h
        .verifier
        .confirm(payment_id, &order.order_ref, "txn_1", &bogus)
        .await;
    assert!(matches!(result, Err(WaysideError::InvalidSignature)));

    let payment = h.store.payments.find_by_id(payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::PENDING);
    assert!(payment.txn_ref.is_none());
    assert!(payment.signature.is_none());

    let request = h.store.requests.find_by_id(request_id).await.unwrap().unwrap();
    assert_eq!(request.status, RequestStatus::ASSIGNED);
    assert!(request.payment_id.is_none());
}

#[tokio::test]
async fn double_confirm_is_idempotent() {
    let h = harness();
    let (request_id, requester) = seed_assigned_request(&h).await;

    let (payment, order) = h.verifier.begin(request_id, requester, 750).await.unwrap();
    let payment_id = payment._id.unwrap();
    let signature = proof::expected_signature(&order.order_ref, "txn_1", SECRET);

    let (first, _) = h
        .verifier
        .confirm(payment_id, &order.order_ref, "txn_1", &signature)
        .await
        .unwrap();
    let (second, request) = h
        .verifier
        .confirm(payment_id, &order.order_ref, "txn_1", &signature)
        .await
        .unwrap();

    assert_eq!(first.status, PaymentStatus::SUCCESS);
    assert_eq!(second.status, PaymentStatus::SUCCESS);
    assert_eq!(second.txn_ref, first.txn_ref);
    assert_eq!(request.status, RequestStatus::SETTLED);

    // Revenue counted once, not twice
    let stats = h.reporter.stats().await.unwrap();
    assert_eq!(stats.successful_payments, 1);
    assert_eq!(stats.total_revenue, 750);
}

#[tokio::test]
async fn concurrent_confirms_settle_exactly_once() {
    let h = harness();
    let (request_id, requester) = seed_assigned_request(&h).await;

    let (payment, order) = h.verifier.begin(request_id, requester, 300).await.unwrap();
    let payment_id = payment._id.unwrap();
    let signature = proof::expected_signature(&order.order_ref, "txn_1", SECRET);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let verifier = Arc::clone(&h.verifier);
        let order_ref = order.order_ref.clone();
        let signature = signature.clone();
        handles.push(tokio::spawn(async move {
            verifier.confirm(payment_id, &order_ref, "txn_1", &signature).await
        }));
    }

    for handle in handles {
        let (payment, request) = handle.await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::SUCCESS);
        assert_eq!(request.status, RequestStatus::SETTLED);
    }

    let stats = h.reporter.stats().await.unwrap();
    assert_eq!(stats.successful_payments, 1);
    assert_eq!(stats.total_revenue, 300);
}

#[tokio::test]
async fn confirm_with_a_different_transaction_is_rejected() {
    let h = harness();
    let (request_id, requester) = seed_assigned_request(&h).await;

    let (payment, order) = h.verifier.begin(request_id, requester, 500).await.unwrap();
    let payment_id = payment._id.unwrap();

    let sig_one = proof::expected_signature(&order.order_ref, "txn_1", SECRET);
    h.verifier
        .confirm(payment_id, &order.order_ref, "txn_1", &sig_one)
        .await
        .unwrap();

    // A second, validly-signed confirmation for a different transaction
    // must not overwrite the recorded one
    let sig_two = proof::expected_signature(&order.order_ref, "txn_2", SECRET);
    let result = h
        .verifier
        .confirm(payment_id, &order.order_ref, "txn_2", &sig_two)
        .await;
    assert!(matches!(result, Err(WaysideError::Validation(_))));

    let payment = h.store.payments.find_by_id(payment_id).await.unwrap().unwrap();
    assert_eq!(payment.txn_ref.as_deref(), Some("txn_1"));
}

#[tokio::test]
async fn begin_requires_existing_request_and_positive_amount() {
    let h = harness();
    let requester = seed_account(&h.store, "r1@wayside.test", Role::Requester).await;

    let result = h.verifier.begin(ObjectId::new(), requester, 500).await;
    assert!(matches!(result, Err(WaysideError::NotFound(_))));

    let (request_id, requester) = seed_assigned_request(&h).await;
    for amount in [0, -50] {
        let result = h.verifier.begin(request_id, requester, amount).await;
        assert!(matches!(result, Err(WaysideError::Validation(_))));
    }
}

#[tokio::test]
async fn confirm_unknown_payment_is_not_found() {
    let h = harness();
    let signature = proof::expected_signature("order_x", "txn_x", SECRET);

    let result = h
        .verifier
        .confirm(ObjectId::new(), "order_x", "txn_x", &signature)
        .await;
    assert!(matches!(result, Err(WaysideError::NotFound(_))));
}

#[tokio::test]
async fn retried_begin_leaves_multiple_pending_but_one_success() {
    let h = harness();
    let (request_id, requester) = seed_assigned_request(&h).await;

    // The requester retried checkout: two Pending payments exist
    let (first, first_order) = h.verifier.begin(request_id, requester, 500).await.unwrap();
    let (second, _) = h.verifier.begin(request_id, requester, 500).await.unwrap();
    assert_ne!(first._id, second._id);

    let signature = proof::expected_signature(&first_order.order_ref, "txn_1", SECRET);
    h.verifier
        .confirm(first._id.unwrap(), &first_order.order_ref, "txn_1", &signature)
        .await
        .unwrap();

    let stats = h.reporter.stats().await.unwrap();
    assert_eq!(stats.successful_payments, 1);
    assert_eq!(stats.total_revenue, 500);

    let abandoned = h
        .store
        .payments
        .find_by_id(second._id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(abandoned.status, PaymentStatus::PENDING);
}

#[tokio::test]
async fn dashboard_revenue_is_zero_when_nothing_settled() {
    let h = harness();
    seed_assigned_request(&h).await;

    let stats = h.reporter.stats().await.unwrap();
    assert_eq!(stats.successful_payments, 0);
    assert_eq!(stats.total_revenue, 0);
    assert_eq!(stats.total_requesters, 1);
    assert_eq!(stats.total_providers, 1);
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.pending_requests, 0);
    assert_eq!(stats.settled_requests, 0);
}

#[tokio::test]
async fn operator_override_writes_any_status_verbatim() {
    let h = harness();
    let (request_id, requester) = seed_assigned_request(&h).await;

    // Settle the request first
    let (payment, order) = h.verifier.begin(request_id, requester, 500).await.unwrap();
    let signature = proof::expected_signature(&order.order_ref, "txn_1", SECRET);
    h.verifier
        .confirm(payment._id.unwrap(), &order.order_ref, "txn_1", &signature)
        .await
        .unwrap();

    let operator = Principal {
        account_id: seed_account(&h.store, "ops@wayside.test", Role::Operator).await,
        identifier: "ops@wayside.test".into(),
        role: Role::Operator,
    };

    // Settled -> "Pending", no transition check
    let reverted = h
        .lifecycle
        .override_status(request_id, RequestStatus::PENDING, &operator)
        .await
        .unwrap();
    assert_eq!(reverted.status, RequestStatus::PENDING);
    // The provider link survives; the override touches status only
    assert!(reverted.provider_id.is_some());

    // Even a status this system has never heard of is written verbatim
    let weird = h
        .lifecycle
        .override_status(request_id, "Limbo", &operator)
        .await
        .unwrap();
    assert_eq!(weird.status, "Limbo");

    let result = h
        .lifecycle
        .override_status(ObjectId::new(), "Pending", &operator)
        .await;
    assert!(matches!(result, Err(WaysideError::NotFound(_))));
}
