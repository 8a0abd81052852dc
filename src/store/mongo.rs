//! MongoDB implementations of the entity store traits
//!
//! Conditional writes use filtered `find_one_and_update`: the status
//! check and the mutation are a single server-side operation, so two
//! racing callers cannot both observe Pending.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime};
use futures_util::StreamExt;

use crate::auth::Role;
use crate::db::schemas::{
    AccountDoc, PaymentDoc, PaymentStatus, RequestStatus, ServiceRequestDoc, ACCOUNT_COLLECTION,
    PAYMENT_COLLECTION, REQUEST_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::store::{AccountStore, PaymentStore, RequestStore};
use crate::types::{Result, WaysideError};

/// Accounts collection
pub struct MongoAccounts {
    collection: MongoCollection<AccountDoc>,
}

impl MongoAccounts {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            collection: client.collection(ACCOUNT_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl AccountStore for MongoAccounts {
    async fn insert(&self, account: AccountDoc) -> Result<AccountDoc> {
        let id = self.collection.insert_one(account).await?;
        self.collection
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| WaysideError::Database("Inserted account missing on re-read".into()))
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<AccountDoc>> {
        self.collection.find_one(doc! { "_id": id }).await
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<AccountDoc>> {
        self.collection
            .find_one(doc! { "identifier": identifier })
            .await
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<AccountDoc>> {
        self.collection
            .find_many_sorted(
                doc! { "role": role.as_str() },
                doc! { "metadata.created_at": -1 },
            )
            .await
    }

    async fn count_by_role(&self, role: Role) -> Result<u64> {
        self.collection.count(doc! { "role": role.as_str() }).await
    }
}

/// Service request collection
pub struct MongoRequests {
    collection: MongoCollection<ServiceRequestDoc>,
}

impl MongoRequests {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            collection: client.collection(REQUEST_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl RequestStore for MongoRequests {
    async fn insert(&self, request: ServiceRequestDoc) -> Result<ServiceRequestDoc> {
        let id = self.collection.insert_one(request).await?;
        self.collection
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| WaysideError::Database("Inserted request missing on re-read".into()))
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<ServiceRequestDoc>> {
        self.collection.find_one(doc! { "_id": id }).await
    }

    async fn list_by_requester(&self, requester_id: ObjectId) -> Result<Vec<ServiceRequestDoc>> {
        self.collection
            .find_many_sorted(
                doc! { "requester_id": requester_id },
                doc! { "metadata.created_at": -1 },
            )
            .await
    }

    async fn list_by_requester_and_status(
        &self,
        requester_id: ObjectId,
        status: &str,
    ) -> Result<Vec<ServiceRequestDoc>> {
        self.collection
            .find_many_sorted(
                doc! { "requester_id": requester_id, "status": status },
                doc! { "metadata.updated_at": -1 },
            )
            .await
    }

    async fn list_by_provider(&self, provider_id: ObjectId) -> Result<Vec<ServiceRequestDoc>> {
        self.collection
            .find_many_sorted(
                doc! { "provider_id": provider_id },
                doc! { "metadata.created_at": -1 },
            )
            .await
    }

    async fn list_by_status(&self, status: &str) -> Result<Vec<ServiceRequestDoc>> {
        self.collection
            .find_many_sorted(doc! { "status": status }, doc! { "metadata.created_at": -1 })
            .await
    }

    async fn list_all(&self) -> Result<Vec<ServiceRequestDoc>> {
        self.collection
            .find_many_sorted(doc! {}, doc! { "metadata.created_at": -1 })
            .await
    }

    async fn assign_if_pending(
        &self,
        id: ObjectId,
        provider_id: ObjectId,
    ) -> Result<Option<ServiceRequestDoc>> {
        self.collection
            .find_one_and_update(
                doc! { "_id": id, "status": RequestStatus::PENDING },
                doc! {
                    "$set": {
                        "provider_id": provider_id,
                        "status": RequestStatus::ASSIGNED,
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await
    }

    async fn mark_settled(
        &self,
        id: ObjectId,
        payment_id: ObjectId,
    ) -> Result<Option<ServiceRequestDoc>> {
        self.collection
            .find_one_and_update(
                doc! { "_id": id },
                doc! {
                    "$set": {
                        "payment_id": payment_id,
                        "status": RequestStatus::SETTLED,
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await
    }

    async fn set_status_unchecked(
        &self,
        id: ObjectId,
        status: &str,
    ) -> Result<Option<ServiceRequestDoc>> {
        self.collection
            .find_one_and_update(
                doc! { "_id": id },
                doc! {
                    "$set": {
                        "status": status,
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await
    }

    async fn count_all(&self) -> Result<u64> {
        self.collection.count(doc! {}).await
    }

    async fn count_by_status(&self, status: &str) -> Result<u64> {
        self.collection.count(doc! { "status": status }).await
    }
}

/// Payment collection
pub struct MongoPayments {
    collection: MongoCollection<PaymentDoc>,
}

impl MongoPayments {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            collection: client.collection(PAYMENT_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl PaymentStore for MongoPayments {
    async fn insert(&self, payment: PaymentDoc) -> Result<PaymentDoc> {
        let id = self.collection.insert_one(payment).await?;
        self.collection
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| WaysideError::Database("Inserted payment missing on re-read".into()))
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<PaymentDoc>> {
        self.collection.find_one(doc! { "_id": id }).await
    }

    async fn list_by_requester(&self, requester_id: ObjectId) -> Result<Vec<PaymentDoc>> {
        self.collection
            .find_many_sorted(
                doc! { "requester_id": requester_id },
                doc! { "metadata.created_at": -1 },
            )
            .await
    }

    async fn list_all(&self) -> Result<Vec<PaymentDoc>> {
        self.collection
            .find_many_sorted(doc! {}, doc! { "metadata.created_at": -1 })
            .await
    }

    async fn confirm_if_pending(
        &self,
        id: ObjectId,
        txn_ref: &str,
        signature: &str,
    ) -> Result<Option<PaymentDoc>> {
        self.collection
            .find_one_and_update(
                doc! { "_id": id, "status": PaymentStatus::PENDING },
                doc! {
                    "$set": {
                        "txn_ref": txn_ref,
                        "signature": signature,
                        "status": PaymentStatus::SUCCESS,
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await
    }

    async fn success_totals(&self) -> Result<(u64, i64)> {
        let pipeline = vec![
            doc! {
                "$match": {
                    "status": PaymentStatus::SUCCESS,
                    "metadata.is_deleted": { "$ne": true },
                }
            },
            doc! {
                "$group": {
                    "_id": null,
                    "count": { "$sum": 1 },
                    "total": { "$sum": "$amount" },
                }
            },
        ];

        let mut cursor = self
            .collection
            .inner()
            .aggregate(pipeline)
            .await
            .map_err(|e| WaysideError::Database(format!("Aggregation failed: {}", e)))?;

        match cursor.next().await {
            Some(Ok(row)) => {
                let count = row
                    .get_i32("count")
                    .map(|c| c as u64)
                    .or_else(|_| row.get_i64("count").map(|c| c as u64))
                    .unwrap_or(0);
                let total = row
                    .get_i64("total")
                    .or_else(|_| row.get_i32("total").map(i64::from))
                    .unwrap_or(0);
                Ok((count, total))
            }
            Some(Err(e)) => Err(WaysideError::Database(format!("Aggregation failed: {}", e))),
            // No Success payments yet: sum is zero, not absent
            None => Ok((0, 0)),
        }
    }
}
