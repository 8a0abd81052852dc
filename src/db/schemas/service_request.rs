//! ServiceRequest document schema
//!
//! The unit of work a requester files and a provider fulfills. Status is
//! persisted as a free string: the operator override writes arbitrary
//! caller-supplied values and must not be narrowed by an enum. The
//! known states live on [`RequestStatus`].

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for service requests
pub const REQUEST_COLLECTION: &str = "service_requests";

/// Known request states. `Pending -> Assigned -> Settled`; the operator
/// override can write anything else.
pub struct RequestStatus;

impl RequestStatus {
    pub const PENDING: &'static str = "Pending";
    pub const ASSIGNED: &'static str = "Assigned";
    pub const SETTLED: &'static str = "Settled";
}

/// Geolocation of the breakdown site
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// ServiceRequest document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ServiceRequestDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning requester
    pub requester_id: ObjectId,

    /// Assigned provider. Set iff status is Assigned or Settled (the
    /// operator override can break this on purpose).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<ObjectId>,

    /// Problem classification (e.g. "flat-tyre", "battery", "tow")
    pub problem_type: String,

    /// Free-text description of the problem
    pub description: String,

    /// Where the provider should go
    pub location: Location,

    /// Current lifecycle state
    pub status: String,

    /// Payment that settled this request. Set only by the Settlement
    /// Verifier once a proof has been accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<ObjectId>,
}

impl ServiceRequestDoc {
    /// Create a new Pending request owned by `requester_id`
    pub fn new(
        requester_id: ObjectId,
        problem_type: String,
        description: String,
        location: Location,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            requester_id,
            provider_id: None,
            problem_type,
            description,
            location,
            status: RequestStatus::PENDING.to_string(),
            payment_id: None,
        }
    }
}

impl IntoIndexes for ServiceRequestDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "status": 1 },
                Some(IndexOptions::builder().name("status_index".to_string()).build()),
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
                doc! { "provider_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("provider_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ServiceRequestDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
