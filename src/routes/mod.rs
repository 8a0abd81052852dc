//! HTTP route handlers
//!
//! Thin JSON-over-hyper surface in front of the dispatch, settlement,
//! and reporting components. Handlers authenticate, check the caller's
//! role, delegate, and map errors onto status codes; no decision logic
//! lives here.

pub mod admin;
pub mod auth_routes;
pub mod health;
pub mod payments;
pub mod requests;

use bson::oid::ObjectId;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::{extract_bearer_token, Principal};
use crate::db::schemas::{AccountDoc, Location, PaymentDoc, ServiceRequestDoc};
use crate::dispatch::{AccountSummary, ResolvedRequest};
use crate::server::AppState;
use crate::types::{Result, WaysideError};

pub use admin::{handle_dashboard_stats, handle_list_accounts};
pub use auth_routes::{handle_login, handle_me, handle_register};
pub use health::{health_check, readiness_check, version_info};
pub use payments::{
    handle_confirm_settlement, handle_list_all_payments, handle_list_payments, handle_open_order,
};
pub use requests::{
    handle_claim, handle_create_request, handle_get_request, handle_history, handle_list_all,
    handle_list_mine, handle_list_pending, handle_override_status, handle_release,
};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

const MAX_BODY_BYTES: usize = 16 * 1024;

// =============================================================================
// Response envelopes
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// Wire form of a service request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
    pub id: String,
    pub requester_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    pub problem_type: String,
    pub description: String,
    pub location: Location,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<ServiceRequestDoc> for RequestView {
    fn from(doc: ServiceRequestDoc) -> Self {
        Self {
            id: doc._id.map(|id| id.to_hex()).unwrap_or_default(),
            requester_id: doc.requester_id.to_hex(),
            provider_id: doc.provider_id.map(|id| id.to_hex()),
            problem_type: doc.problem_type,
            description: doc.description,
            location: doc.location,
            status: doc.status,
            payment_id: doc.payment_id.map(|id| id.to_hex()),
            created_at: doc.metadata.created_at.and_then(|d| d.try_to_rfc3339_string().ok()),
            updated_at: doc.metadata.updated_at.and_then(|d| d.try_to_rfc3339_string().ok()),
        }
    }
}

/// Wire form of a request with resolved contact cards
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRequestView {
    #[serde(flatten)]
    pub request: RequestView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<AccountSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<AccountSummary>,
}

impl From<ResolvedRequest> for ResolvedRequestView {
    fn from(resolved: ResolvedRequest) -> Self {
        Self {
            request: resolved.request.into(),
            requester: resolved.requester,
            provider: resolved.provider,
        }
    }
}

/// Wire form of a payment
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub id: String,
    pub request_id: String,
    pub requester_id: String,
    pub amount: i64,
    pub order_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txn_ref: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl From<PaymentDoc> for PaymentView {
    fn from(doc: PaymentDoc) -> Self {
        Self {
            id: doc._id.map(|id| id.to_hex()).unwrap_or_default(),
            request_id: doc.request_id.to_hex(),
            requester_id: doc.requester_id.to_hex(),
            amount: doc.amount,
            order_ref: doc.order_ref,
            txn_ref: doc.txn_ref,
            status: doc.status,
            created_at: doc.metadata.created_at.and_then(|d| d.try_to_rfc3339_string().ok()),
        }
    }
}

/// Wire form of an account. Never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub identifier: String,
    pub display_name: String,
    pub phone: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl From<AccountDoc> for AccountView {
    fn from(doc: AccountDoc) -> Self {
        Self {
            id: doc._id.map(|id| id.to_hex()).unwrap_or_default(),
            identifier: doc.identifier,
            display_name: doc.display_name,
            phone: doc.phone,
            role: doc.role.as_str().to_string(),
            created_at: doc.metadata.created_at.and_then(|d| d.try_to_rfc3339_string().ok()),
        }
    }
}

// =============================================================================
// Response helpers
// =============================================================================

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

/// Map an error onto its status code and machine-readable code
pub fn respond_error(err: &WaysideError) -> Response<BoxBody> {
    let (status, code) = match err {
        WaysideError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        WaysideError::AlreadyClaimed => (StatusCode::CONFLICT, "ALREADY_CLAIMED"),
        WaysideError::InvalidSignature => (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE"),
        WaysideError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION"),
        WaysideError::Auth(_) => (StatusCode::UNAUTHORIZED, "AUTH"),
        WaysideError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        WaysideError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE"),
        WaysideError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM"),
        WaysideError::Http(_) => (StatusCode::BAD_REQUEST, "HTTP"),
    };

    json_response(
        status,
        &ErrorResponse {
            error: err.to_string(),
            code,
        },
    )
}

pub fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub fn not_found_response(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("no route for {}", path),
            code: "NOT_FOUND",
        },
    )
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

// =============================================================================
// Request helpers
// =============================================================================

pub async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<Incoming>,
) -> Result<T> {
    let body = req
        .collect()
        .await
        .map_err(|e| WaysideError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > MAX_BODY_BYTES {
        return Err(WaysideError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| WaysideError::Http(format!("Invalid JSON: {}", e)))
}

/// Authenticate the caller from the Authorization header
pub fn authenticate(req: &Request<Incoming>, state: &AppState) -> Result<Principal> {
    let header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| WaysideError::Auth("missing Authorization header".into()))?;

    let token = extract_bearer_token(header)
        .ok_or_else(|| WaysideError::Auth("expected a bearer token".into()))?;

    state.jwt.validate(token)
}

/// Parse a path segment as an entity id
pub fn parse_object_id(raw: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| WaysideError::Validation(format!("invalid id: {}", raw)))
}
