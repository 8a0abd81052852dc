//! Account document schema
//!
//! One collection for requesters, providers, and operators, tagged by
//! role. The identifier is unique across all roles.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for accounts
pub const ACCOUNT_COLLECTION: &str = "accounts";

/// Account document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AccountDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Account identifier (email), unique across all roles
    pub identifier: String,

    /// Display name shown to counterparties
    pub display_name: String,

    /// Contact phone number
    pub phone: String,

    /// Argon2 password hash. Persisted, but never exposed through the
    /// API; response types carry an `AccountSummary` instead.
    pub password_hash: String,

    /// Account role
    pub role: Role,
}

impl AccountDoc {
    pub fn new(
        identifier: String,
        display_name: String,
        phone: String,
        password_hash: String,
        role: Role,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            identifier,
            display_name,
            phone,
            password_hash,
            role,
        }
    }
}

impl IntoIndexes for AccountDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "identifier": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("identifier_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "role": 1 },
                Some(IndexOptions::builder().name("role_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for AccountDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
