//! Entity Store seam
//!
//! Durable keyed storage for the three entity kinds, behind async
//! traits so the MongoDB backend and the in-memory backend (dev mode,
//! tests) are interchangeable. The conditional-write primitives
//! (`assign_if_pending`, `confirm_if_pending`) live here: callers get a
//! compare-and-swap at the storage boundary instead of a racy
//! read-then-write sequence.
//!
//! Core components hold only ids between calls and re-read through
//! these traits before mutating; no entity is cached across calls.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use bson::oid::ObjectId;
use std::sync::Arc;

use crate::auth::Role;
use crate::db::schemas::{AccountDoc, PaymentDoc, ServiceRequestDoc};
use crate::db::MongoClient;
use crate::types::Result;

/// Storage for accounts
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Persist a new account and return it with id and timestamps set
    async fn insert(&self, account: AccountDoc) -> Result<AccountDoc>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<AccountDoc>>;

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<AccountDoc>>;

    /// All accounts holding `role`, newest first
    async fn list_by_role(&self, role: Role) -> Result<Vec<AccountDoc>>;

    async fn count_by_role(&self, role: Role) -> Result<u64>;
}

/// Storage for service requests
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Persist a new request and return it with id and timestamps set
    async fn insert(&self, request: ServiceRequestDoc) -> Result<ServiceRequestDoc>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<ServiceRequestDoc>>;

    /// Requests owned by a requester, newest first
    async fn list_by_requester(&self, requester_id: ObjectId) -> Result<Vec<ServiceRequestDoc>>;

    /// Requests owned by a requester in a given status, most recently
    /// updated first (the service-history query)
    async fn list_by_requester_and_status(
        &self,
        requester_id: ObjectId,
        status: &str,
    ) -> Result<Vec<ServiceRequestDoc>>;

    /// Requests assigned to a provider, newest first
    async fn list_by_provider(&self, provider_id: ObjectId) -> Result<Vec<ServiceRequestDoc>>;

    /// Requests in a given status, newest first (the claim board)
    async fn list_by_status(&self, status: &str) -> Result<Vec<ServiceRequestDoc>>;

    /// All requests system-wide, newest first
    async fn list_all(&self) -> Result<Vec<ServiceRequestDoc>>;

    /// Compare-and-swap claim: assign `provider_id` and move the request
    /// to Assigned only if its status is still Pending at write time.
    /// Returns the updated request, or None when no Pending request with
    /// that id existed (caller re-reads to tell NotFound from a lost
    /// race).
    async fn assign_if_pending(
        &self,
        id: ObjectId,
        provider_id: ObjectId,
    ) -> Result<Option<ServiceRequestDoc>>;

    /// Link `payment_id` and move the request to Settled. Unconditional
    /// on current status: only the Settlement Verifier calls this, after
    /// winning the payment CAS. Returns None when the request is gone.
    async fn mark_settled(
        &self,
        id: ObjectId,
        payment_id: ObjectId,
    ) -> Result<Option<ServiceRequestDoc>>;

    /// Write a raw status string with no transition or domain checks.
    /// The operator override escape hatch. Returns None when the request
    /// is gone.
    async fn set_status_unchecked(
        &self,
        id: ObjectId,
        status: &str,
    ) -> Result<Option<ServiceRequestDoc>>;

    async fn count_all(&self) -> Result<u64>;

    async fn count_by_status(&self, status: &str) -> Result<u64>;
}

/// Storage for payments
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persist a new payment and return it with id and timestamps set
    async fn insert(&self, payment: PaymentDoc) -> Result<PaymentDoc>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<PaymentDoc>>;

    /// Payments opened by a requester, newest first
    async fn list_by_requester(&self, requester_id: ObjectId) -> Result<Vec<PaymentDoc>>;

    /// All payments system-wide, newest first
    async fn list_all(&self) -> Result<Vec<PaymentDoc>>;

    /// Compare-and-swap confirmation: record the transaction reference
    /// and accepted signature and move the payment to Success only if
    /// its status is still Pending at write time. Returns the updated
    /// payment, or None when no Pending payment with that id existed.
    async fn confirm_if_pending(
        &self,
        id: ObjectId,
        txn_ref: &str,
        signature: &str,
    ) -> Result<Option<PaymentDoc>>;

    /// Count and amount sum over Success payments. (0, 0) when none.
    async fn success_totals(&self) -> Result<(u64, i64)>;
}

/// The three entity collections bundled for wiring into components
#[derive(Clone)]
pub struct EntityStore {
    pub accounts: Arc<dyn AccountStore>,
    pub requests: Arc<dyn RequestStore>,
    pub payments: Arc<dyn PaymentStore>,
}

impl EntityStore {
    /// MongoDB-backed store (production)
    pub async fn connect(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            accounts: Arc::new(mongo::MongoAccounts::new(client).await?),
            requests: Arc::new(mongo::MongoRequests::new(client).await?),
            payments: Arc::new(mongo::MongoPayments::new(client).await?),
        })
    }

    /// In-memory store (dev mode without MongoDB, tests)
    pub fn in_memory() -> Self {
        Self {
            accounts: Arc::new(memory::InMemoryAccounts::new()),
            requests: Arc::new(memory::InMemoryRequests::new()),
            payments: Arc::new(memory::InMemoryPayments::new()),
        }
    }
}
