//! Document schemas for the three entity collections.

pub mod account;
pub mod payment;
pub mod service_request;

use bson::DateTime;
use serde::{Deserialize, Serialize};

pub use account::{AccountDoc, ACCOUNT_COLLECTION};
pub use payment::{PaymentDoc, PaymentStatus, PAYMENT_COLLECTION};
pub use service_request::{Location, RequestStatus, ServiceRequestDoc, REQUEST_COLLECTION};

/// Common metadata for all documents
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    /// Whether this document has been soft-deleted. Wayside never
    /// deletes entities; the flag exists so reads stay compatible with
    /// externally-managed cleanup.
    #[serde(default)]
    pub is_deleted: bool,

    /// When the document was soft-deleted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,

    /// When the document was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    /// When the document was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Create new metadata with current timestamps
    pub fn new() -> Self {
        Self {
            is_deleted: false,
            deleted_at: None,
            updated_at: Some(DateTime::now()),
            created_at: Some(DateTime::now()),
        }
    }
}
