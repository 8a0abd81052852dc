//! Request lifecycle: creation, the read surface, and the operator
//! override
//!
//! Regular transitions go through the Claim Coordinator (Pending ->
//! Assigned) and the Settlement Verifier (Assigned -> Settled). The
//! override here writes any caller-supplied status string verbatim; it
//! trusts the operator and is kept separate from the checked paths so
//! its reach stays obvious.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::Principal;
use crate::db::schemas::{AccountDoc, Location, RequestStatus, ServiceRequestDoc};
use crate::logging::{AuditKind, AuditLogger};
use crate::store::{AccountStore, EntityStore, RequestStore};
use crate::types::{Result, WaysideError};

/// Input for filing a new request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRequest {
    pub problem_type: String,
    pub description: String,
    pub location: Location,
}

/// Contact card resolved for display alongside a request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    pub display_name: String,
    pub phone: String,
    pub identifier: String,
}

impl From<AccountDoc> for AccountSummary {
    fn from(account: AccountDoc) -> Self {
        Self {
            id: account._id.map(|id| id.to_hex()).unwrap_or_default(),
            display_name: account.display_name,
            phone: account.phone,
            identifier: account.identifier,
        }
    }
}

/// A request with its requester and provider resolved
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub request: ServiceRequestDoc,
    pub requester: Option<AccountSummary>,
    pub provider: Option<AccountSummary>,
}

/// Request creation, queries, and the operator override
pub struct RequestLifecycle {
    requests: Arc<dyn RequestStore>,
    accounts: Arc<dyn AccountStore>,
    audit: AuditLogger,
}

impl RequestLifecycle {
    pub fn new(store: &EntityStore, audit: AuditLogger) -> Self {
        Self {
            requests: Arc::clone(&store.requests),
            accounts: Arc::clone(&store.accounts),
            audit,
        }
    }

    /// File a new Pending request owned by `requester_id`
    pub async fn create(
        &self,
        requester_id: ObjectId,
        input: NewRequest,
    ) -> Result<ServiceRequestDoc> {
        let problem_type = input.problem_type.trim();
        let description = input.description.trim();

        if problem_type.is_empty() {
            return Err(WaysideError::Validation("problemType is required".into()));
        }
        if description.is_empty() {
            return Err(WaysideError::Validation("description is required".into()));
        }

        let request = self
            .requests
            .insert(ServiceRequestDoc::new(
                requester_id,
                problem_type.to_string(),
                description.to_string(),
                input.location,
            ))
            .await?;

        info!(
            request = %request._id.map(|id| id.to_hex()).unwrap_or_default(),
            problem = %request.problem_type,
            "service request created"
        );

        Ok(request)
    }

    /// Fetch a request with its accounts resolved for display
    pub async fn get_resolved(&self, request_id: ObjectId) -> Result<ResolvedRequest> {
        let request = self
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or(WaysideError::NotFound("service request"))?;

        let requester = self
            .accounts
            .find_by_id(request.requester_id)
            .await?
            .map(AccountSummary::from);

        let provider = match request.provider_id {
            Some(provider_id) => self
                .accounts
                .find_by_id(provider_id)
                .await?
                .map(AccountSummary::from),
            None => None,
        };

        Ok(ResolvedRequest {
            request,
            requester,
            provider,
        })
    }

    /// Requests owned by a requester, newest first
    pub async fn list_for_requester(
        &self,
        requester_id: ObjectId,
    ) -> Result<Vec<ServiceRequestDoc>> {
        self.requests.list_by_requester(requester_id).await
    }

    /// Requests assigned to a provider, newest first
    pub async fn list_for_provider(&self, provider_id: ObjectId) -> Result<Vec<ServiceRequestDoc>> {
        self.requests.list_by_provider(provider_id).await
    }

    /// The claim board: every Pending request, newest first
    pub async fn list_pending(&self) -> Result<Vec<ServiceRequestDoc>> {
        self.requests.list_by_status(RequestStatus::PENDING).await
    }

    /// All requests system-wide, newest first
    pub async fn list_all(&self) -> Result<Vec<ServiceRequestDoc>> {
        self.requests.list_all().await
    }

    /// Settled requests owned by a requester, most recently updated first
    pub async fn history(&self, requester_id: ObjectId) -> Result<Vec<ServiceRequestDoc>> {
        self.requests
            .list_by_requester_and_status(requester_id, RequestStatus::SETTLED)
            .await
    }

    /// Operator escape hatch: write `target` as the status, verbatim.
    ///
    /// No validation of the target value and no transition check: the
    /// operator can move a Settled request back to "Pending", or to a
    /// string this system has never heard of. Audit-logged.
    pub async fn override_status(
        &self,
        request_id: ObjectId,
        target: &str,
        actor: &Principal,
    ) -> Result<ServiceRequestDoc> {
        let previous = self
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or(WaysideError::NotFound("service request"))?;

        let updated = self
            .requests
            .set_status_unchecked(request_id, target)
            .await?
            .ok_or(WaysideError::NotFound("service request"))?;

        warn!(
            request = %request_id.to_hex(),
            from = %previous.status,
            to = %target,
            operator = %actor.identifier,
            "status override applied"
        );

        self.audit
            .record(AuditKind::StatusOverride)
            .actor(&actor.identifier)
            .entity(request_id.to_hex())
            .detail(format!("{} -> {}", previous.status, target))
            .emit()
            .await;

        Ok(updated)
    }
}
