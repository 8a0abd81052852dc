//! Payment document schema
//!
//! A monetary transaction attached to exactly one ServiceRequest.
//! Retried settlements may leave several Pending payments per request;
//! the Settlement Verifier guarantees at most one ever reaches Success.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for payments
pub const PAYMENT_COLLECTION: &str = "payments";

/// Payment states
pub struct PaymentStatus;

impl PaymentStatus {
    pub const PENDING: &'static str = "Pending";
    pub const SUCCESS: &'static str = "Success";
}

/// Payment document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PaymentDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// The ServiceRequest this payment settles
    pub request_id: ObjectId,

    /// Requester who pays
    pub requester_id: ObjectId,

    /// Amount as filed by the requester. The gateway order carries the
    /// minor-unit conversion; reporting sums this field directly.
    pub amount: i64,

    /// External order reference from the gateway
    pub order_ref: String,

    /// External transaction reference, recorded on confirmation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txn_ref: Option<String>,

    /// Accepted proof signature, recorded on confirmation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// "Pending" until a proof is accepted, then "Success"
    pub status: String,
}

impl PaymentDoc {
    /// Open a new Pending payment against `request_id`
    pub fn new(request_id: ObjectId, requester_id: ObjectId, amount: i64, order_ref: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            request_id,
            requester_id,
            amount,
            order_ref,
            txn_ref: None,
            signature: None,
            status: PaymentStatus::PENDING.to_string(),
        }
    }
}

impl IntoIndexes for PaymentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "request_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("request_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "requester_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("requester_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "status": 1 },
                Some(IndexOptions::builder().name("status_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for PaymentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
