//! Read-only aggregation over the entity store
//!
//! Derived counts and sums for the operator dashboard. No write
//! authority; tolerates empty collections (revenue is 0, not absent).

use serde::Serialize;
use std::sync::Arc;

use crate::auth::Role;
use crate::db::schemas::RequestStatus;
use crate::store::{AccountStore, EntityStore, PaymentStore, RequestStore};
use crate::types::Result;

/// Dashboard statistics
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_requesters: u64,
    pub total_providers: u64,
    pub total_requests: u64,
    pub pending_requests: u64,
    pub settled_requests: u64,
    pub successful_payments: u64,
    pub total_revenue: i64,
}

/// Computes dashboard statistics
pub struct DashboardReporter {
    accounts: Arc<dyn AccountStore>,
    requests: Arc<dyn RequestStore>,
    payments: Arc<dyn PaymentStore>,
}

impl DashboardReporter {
    pub fn new(store: &EntityStore) -> Self {
        Self {
            accounts: Arc::clone(&store.accounts),
            requests: Arc::clone(&store.requests),
            payments: Arc::clone(&store.payments),
        }
    }

    pub async fn stats(&self) -> Result<DashboardStats> {
        let total_requesters = self.accounts.count_by_role(Role::Requester).await?;
        let total_providers = self.accounts.count_by_role(Role::Provider).await?;
        let total_requests = self.requests.count_all().await?;
        let pending_requests = self.requests.count_by_status(RequestStatus::PENDING).await?;
        let settled_requests = self.requests.count_by_status(RequestStatus::SETTLED).await?;
        let (successful_payments, total_revenue) = self.payments.success_totals().await?;

        Ok(DashboardStats {
            total_requesters,
            total_providers,
            total_requests,
            pending_requests,
            settled_requests,
            successful_payments,
            total_revenue,
        })
    }
}
