//! Claim coordination
//!
//! A ServiceRequest moves Pending -> Assigned at most once. The
//! transition rides on the store's conditional write: when two providers
//! race, the store applies exactly one assignment, and the loser is told
//! `AlreadyClaimed` rather than `NotFound` so it can move on to other
//! Pending work.

use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::{Principal, Role};
use crate::db::schemas::ServiceRequestDoc;
use crate::logging::{AuditKind, AuditLogger};
use crate::store::{AccountStore, EntityStore, RequestStore};
use crate::types::{Result, WaysideError};

/// Enforces single-winner assignment of Pending requests
pub struct ClaimCoordinator {
    requests: Arc<dyn RequestStore>,
    accounts: Arc<dyn AccountStore>,
    audit: AuditLogger,
}

impl ClaimCoordinator {
    pub fn new(store: &EntityStore, audit: AuditLogger) -> Self {
        Self {
            requests: Arc::clone(&store.requests),
            accounts: Arc::clone(&store.accounts),
            audit,
        }
    }

    /// Claim a Pending request for `provider_id`.
    ///
    /// Exactly one of N concurrent claims on the same request succeeds;
    /// the rest get `AlreadyClaimed`. The assigned-provider/status pair
    /// is written in one conditional update, so no interleaving leaves
    /// them inconsistent.
    pub async fn claim(
        &self,
        request_id: ObjectId,
        provider_id: ObjectId,
    ) -> Result<ServiceRequestDoc> {
        let provider = self
            .accounts
            .find_by_id(provider_id)
            .await?
            .ok_or(WaysideError::NotFound("provider account"))?;

        if provider.role != Role::Provider {
            return Err(WaysideError::Forbidden(
                "only provider accounts may claim requests".into(),
            ));
        }

        match self.requests.assign_if_pending(request_id, provider_id).await? {
            Some(request) => {
                info!(
                    request = %request_id.to_hex(),
                    provider = %provider.identifier,
                    "request claimed"
                );
                Ok(request)
            }
            None => {
                // The conditional write matched nothing: either the
                // request is gone, or another provider got there first.
                match self.requests.find_by_id(request_id).await? {
                    Some(current) => {
                        debug!(
                            request = %request_id.to_hex(),
                            status = %current.status,
                            provider = %provider.identifier,
                            "claim lost race"
                        );
                        Err(WaysideError::AlreadyClaimed)
                    }
                    None => Err(WaysideError::NotFound("service request")),
                }
            }
        }
    }

    /// Release (reject) a request.
    ///
    /// Accepted unconditionally if the request exists, but applies NO
    /// state change: the request keeps its current status and provider.
    /// This mirrors the long-standing rejection behavior of the service
    /// and is audit-logged so the non-transition stays visible to
    /// operators.
    pub async fn release(
        &self,
        request_id: ObjectId,
        actor: &Principal,
    ) -> Result<ServiceRequestDoc> {
        let request = self
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or(WaysideError::NotFound("service request"))?;

        self.audit
            .record(AuditKind::ClaimReleased)
            .actor(&actor.identifier)
            .entity(request_id.to_hex())
            .detail(format!("status stays {}", request.status))
            .emit()
            .await;

        Ok(request)
    }
}
