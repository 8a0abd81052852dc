//! In-memory implementations of the entity store traits
//!
//! Used in dev mode when MongoDB is unreachable, and by the hermetic
//! test suite. Each store keeps its documents in insertion order behind
//! a `tokio::sync::RwLock`; conditional writes take the write lock for
//! the whole check-and-set, which serializes racing callers the same
//! way the MongoDB backend's filtered update does.

use async_trait::async_trait;
use bson::{oid::ObjectId, DateTime};
use tokio::sync::RwLock;

use crate::auth::Role;
use crate::db::schemas::{AccountDoc, PaymentDoc, PaymentStatus, ServiceRequestDoc};
use crate::store::{AccountStore, PaymentStore, RequestStore};
use crate::types::Result;

fn stamp_new(metadata: &mut crate::db::schemas::Metadata) {
    metadata.is_deleted = false;
    metadata.created_at = Some(DateTime::now());
    metadata.updated_at = Some(DateTime::now());
}

/// In-memory accounts
pub struct InMemoryAccounts {
    docs: RwLock<Vec<AccountDoc>>,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryAccounts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccounts {
    async fn insert(&self, mut account: AccountDoc) -> Result<AccountDoc> {
        account._id = Some(ObjectId::new());
        stamp_new(&mut account.metadata);

        self.docs.write().await.push(account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<AccountDoc>> {
        Ok(self
            .docs
            .read()
            .await
            .iter()
            .find(|a| a._id == Some(id))
            .cloned())
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<AccountDoc>> {
        Ok(self
            .docs
            .read()
            .await
            .iter()
            .find(|a| a.identifier == identifier)
            .cloned())
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<AccountDoc>> {
        Ok(self
            .docs
            .read()
            .await
            .iter()
            .rev()
            .filter(|a| a.role == role)
            .cloned()
            .collect())
    }

    async fn count_by_role(&self, role: Role) -> Result<u64> {
        Ok(self.docs.read().await.iter().filter(|a| a.role == role).count() as u64)
    }
}

/// In-memory service requests
pub struct InMemoryRequests {
    docs: RwLock<Vec<ServiceRequestDoc>>,
}

impl InMemoryRequests {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryRequests {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestStore for InMemoryRequests {
    async fn insert(&self, mut request: ServiceRequestDoc) -> Result<ServiceRequestDoc> {
        request._id = Some(ObjectId::new());
        stamp_new(&mut request.metadata);

        self.docs.write().await.push(request.clone());
        Ok(request)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<ServiceRequestDoc>> {
        Ok(self
            .docs
            .read()
            .await
            .iter()
            .find(|r| r._id == Some(id))
            .cloned())
    }

    async fn list_by_requester(&self, requester_id: ObjectId) -> Result<Vec<ServiceRequestDoc>> {
        Ok(self
            .docs
            .read()
            .await
            .iter()
            .rev()
            .filter(|r| r.requester_id == requester_id)
            .cloned()
            .collect())
    }

    async fn list_by_requester_and_status(
        &self,
        requester_id: ObjectId,
        status: &str,
    ) -> Result<Vec<ServiceRequestDoc>> {
        let mut matched: Vec<ServiceRequestDoc> = self
            .docs
            .read()
            .await
            .iter()
            .filter(|r| r.requester_id == requester_id && r.status == status)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.metadata.updated_at.cmp(&a.metadata.updated_at));
        Ok(matched)
    }

    async fn list_by_provider(&self, provider_id: ObjectId) -> Result<Vec<ServiceRequestDoc>> {
        Ok(self
            .docs
            .read()
            .await
            .iter()
            .rev()
            .filter(|r| r.provider_id == Some(provider_id))
            .cloned()
            .collect())
    }

    async fn list_by_status(&self, status: &str) -> Result<Vec<ServiceRequestDoc>> {
        Ok(self
            .docs
            .read()
            .await
            .iter()
            .rev()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<ServiceRequestDoc>> {
        Ok(self.docs.read().await.iter().rev().cloned().collect())
    }

    async fn assign_if_pending(
        &self,
        id: ObjectId,
        provider_id: ObjectId,
    ) -> Result<Option<ServiceRequestDoc>> {
        let mut docs = self.docs.write().await;
        match docs
            .iter_mut()
            .find(|r| r._id == Some(id) && r.status == crate::db::schemas::RequestStatus::PENDING)
        {
            Some(request) => {
                request.provider_id = Some(provider_id);
                request.status = crate::db::schemas::RequestStatus::ASSIGNED.to_string();
                request.metadata.updated_at = Some(DateTime::now());
                Ok(Some(request.clone()))
            }
            None => Ok(None),
        }
    }

    async fn mark_settled(
        &self,
        id: ObjectId,
        payment_id: ObjectId,
    ) -> Result<Option<ServiceRequestDoc>> {
        let mut docs = self.docs.write().await;
        match docs.iter_mut().find(|r| r._id == Some(id)) {
            Some(request) => {
                request.payment_id = Some(payment_id);
                request.status = crate::db::schemas::RequestStatus::SETTLED.to_string();
                request.metadata.updated_at = Some(DateTime::now());
                Ok(Some(request.clone()))
            }
            None => Ok(None),
        }
    }

    async fn set_status_unchecked(
        &self,
        id: ObjectId,
        status: &str,
    ) -> Result<Option<ServiceRequestDoc>> {
        let mut docs = self.docs.write().await;
        match docs.iter_mut().find(|r| r._id == Some(id)) {
            Some(request) => {
                request.status = status.to_string();
                request.metadata.updated_at = Some(DateTime::now());
                Ok(Some(request.clone()))
            }
            None => Ok(None),
        }
    }

    async fn count_all(&self) -> Result<u64> {
        Ok(self.docs.read().await.len() as u64)
    }

    async fn count_by_status(&self, status: &str) -> Result<u64> {
        Ok(self
            .docs
            .read()
            .await
            .iter()
            .filter(|r| r.status == status)
            .count() as u64)
    }
}

/// In-memory payments
pub struct InMemoryPayments {
    docs: RwLock<Vec<PaymentDoc>>,
}

impl InMemoryPayments {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryPayments {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPayments {
    async fn insert(&self, mut payment: PaymentDoc) -> Result<PaymentDoc> {
        payment._id = Some(ObjectId::new());
        stamp_new(&mut payment.metadata);

        self.docs.write().await.push(payment.clone());
        Ok(payment)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<PaymentDoc>> {
        Ok(self
            .docs
            .read()
            .await
            .iter()
            .find(|p| p._id == Some(id))
            .cloned())
    }

    async fn list_by_requester(&self, requester_id: ObjectId) -> Result<Vec<PaymentDoc>> {
        Ok(self
            .docs
            .read()
            .await
            .iter()
            .rev()
            .filter(|p| p.requester_id == requester_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<PaymentDoc>> {
        Ok(self.docs.read().await.iter().rev().cloned().collect())
    }

    async fn confirm_if_pending(
        &self,
        id: ObjectId,
        txn_ref: &str,
        signature: &str,
    ) -> Result<Option<PaymentDoc>> {
        let mut docs = self.docs.write().await;
        match docs
            .iter_mut()
            .find(|p| p._id == Some(id) && p.status == PaymentStatus::PENDING)
        {
            Some(payment) => {
                payment.txn_ref = Some(txn_ref.to_string());
                payment.signature = Some(signature.to_string());
                payment.status = PaymentStatus::SUCCESS.to_string();
                payment.metadata.updated_at = Some(DateTime::now());
                Ok(Some(payment.clone()))
            }
            None => Ok(None),
        }
    }

    async fn success_totals(&self) -> Result<(u64, i64)> {
        let docs = self.docs.read().await;
        let mut count = 0u64;
        let mut total = 0i64;
        for payment in docs.iter().filter(|p| p.status == PaymentStatus::SUCCESS) {
            count += 1;
            total += payment.amount;
        }
        Ok((count, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{Location, RequestStatus, ServiceRequestDoc};

    fn request(requester: ObjectId) -> ServiceRequestDoc {
        ServiceRequestDoc::new(
            requester,
            "flat-tyre".into(),
            "rear left, no spare".into(),
            Location::default(),
        )
    }

    #[tokio::test]
    async fn test_assign_if_pending_is_single_shot() {
        let store = InMemoryRequests::new();
        let inserted = store.insert(request(ObjectId::new())).await.unwrap();
        let id = inserted._id.unwrap();

        let p1 = ObjectId::new();
        let p2 = ObjectId::new();

        let first = store.assign_if_pending(id, p1).await.unwrap();
        assert_eq!(first.unwrap().provider_id, Some(p1));

        // Second conditional write finds no Pending request
        let second = store.assign_if_pending(id, p2).await.unwrap();
        assert!(second.is_none());

        let current = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(current.status, RequestStatus::ASSIGNED);
        assert_eq!(current.provider_id, Some(p1));
    }

    #[tokio::test]
    async fn test_lists_are_newest_first() {
        let store = InMemoryRequests::new();
        let requester = ObjectId::new();

        let a = store.insert(request(requester)).await.unwrap();
        let b = store.insert(request(requester)).await.unwrap();

        let listed = store.list_by_requester(requester).await.unwrap();
        assert_eq!(listed[0]._id, b._id);
        assert_eq!(listed[1]._id, a._id);
    }

    #[tokio::test]
    async fn test_success_totals_empty_is_zero() {
        let store = InMemoryPayments::new();
        assert_eq!(store.success_totals().await.unwrap(), (0, 0));
    }
}
