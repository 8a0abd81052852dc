//! Service request routes
//!
//! Creation, listings, the claim/release pair, the resolved status
//! query, and the operator's status override.

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::Role;
use crate::dispatch::NewRequest;
use crate::routes::{
    authenticate, json_response, parse_json_body, parse_object_id, respond_error, BoxBody,
    RequestView, ResolvedRequestView,
};
use crate::server::AppState;
use crate::types::WaysideError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestListResponse {
    pub requests: Vec<RequestView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseResponse {
    /// The release was accepted; the request is returned unchanged
    pub acknowledged: bool,
    pub request: RequestView,
}

/// POST /api/requests (requester)
pub async fn handle_create_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let principal = match authenticate(&req, &state) {
        Ok(p) => p,
        Err(e) => return respond_error(&e),
    };
    if let Err(e) = principal.require_role(&[Role::Requester]) {
        return respond_error(&e);
    }

    let input: NewRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return respond_error(&e),
    };

    match state.lifecycle.create(principal.account_id, input).await {
        Ok(request) => json_response(StatusCode::CREATED, &RequestView::from(request)),
        Err(e) => respond_error(&e),
    }
}

/// GET /api/requests/mine (requester: owned; provider: assigned)
pub async fn handle_list_mine(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let principal = match authenticate(&req, &state) {
        Ok(p) => p,
        Err(e) => return respond_error(&e),
    };

    let result = match principal.role {
        Role::Requester => state.lifecycle.list_for_requester(principal.account_id).await,
        Role::Provider => state.lifecycle.list_for_provider(principal.account_id).await,
        Role::Operator => {
            return respond_error(&WaysideError::Forbidden(
                "operators list requests via /api/requests".into(),
            ))
        }
    };

    match result {
        Ok(requests) => json_response(
            StatusCode::OK,
            &RequestListResponse {
                requests: requests.into_iter().map(RequestView::from).collect(),
            },
        ),
        Err(e) => respond_error(&e),
    }
}

/// GET /api/requests/pending (provider claim board)
pub async fn handle_list_pending(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let principal = match authenticate(&req, &state) {
        Ok(p) => p,
        Err(e) => return respond_error(&e),
    };
    if let Err(e) = principal.require_role(&[Role::Provider]) {
        return respond_error(&e);
    }

    match state.lifecycle.list_pending().await {
        Ok(requests) => json_response(
            StatusCode::OK,
            &RequestListResponse {
                requests: requests.into_iter().map(RequestView::from).collect(),
            },
        ),
        Err(e) => respond_error(&e),
    }
}

/// GET /api/requests/history (requester settled history)
pub async fn handle_history(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let principal = match authenticate(&req, &state) {
        Ok(p) => p,
        Err(e) => return respond_error(&e),
    };
    if let Err(e) = principal.require_role(&[Role::Requester]) {
        return respond_error(&e);
    }

    match state.lifecycle.history(principal.account_id).await {
        Ok(requests) => json_response(
            StatusCode::OK,
            &RequestListResponse {
                requests: requests.into_iter().map(RequestView::from).collect(),
            },
        ),
        Err(e) => respond_error(&e),
    }
}

/// GET /api/requests (operator)
pub async fn handle_list_all(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let principal = match authenticate(&req, &state) {
        Ok(p) => p,
        Err(e) => return respond_error(&e),
    };
    if let Err(e) = principal.require_role(&[Role::Operator]) {
        return respond_error(&e);
    }

    match state.lifecycle.list_all().await {
        Ok(requests) => json_response(
            StatusCode::OK,
            &RequestListResponse {
                requests: requests.into_iter().map(RequestView::from).collect(),
            },
        ),
        Err(e) => respond_error(&e),
    }
}

/// GET /api/requests/{id} (any authenticated role)
pub async fn handle_get_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Response<BoxBody> {
    if let Err(e) = authenticate(&req, &state) {
        return respond_error(&e);
    }

    let request_id = match parse_object_id(raw_id) {
        Ok(id) => id,
        Err(e) => return respond_error(&e),
    };

    match state.lifecycle.get_resolved(request_id).await {
        Ok(resolved) => json_response(StatusCode::OK, &ResolvedRequestView::from(resolved)),
        Err(e) => respond_error(&e),
    }
}

/// POST /api/requests/{id}/claim (provider)
pub async fn handle_claim(
    req: Request<Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Response<BoxBody> {
    let principal = match authenticate(&req, &state) {
        Ok(p) => p,
        Err(e) => return respond_error(&e),
    };
    if let Err(e) = principal.require_role(&[Role::Provider]) {
        return respond_error(&e);
    }

    let request_id = match parse_object_id(raw_id) {
        Ok(id) => id,
        Err(e) => return respond_error(&e),
    };

    match state.coordinator.claim(request_id, principal.account_id).await {
        Ok(request) => json_response(StatusCode::OK, &RequestView::from(request)),
        Err(e) => respond_error(&e),
    }
}

/// POST /api/requests/{id}/release (provider or operator)
pub async fn handle_release(
    req: Request<Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Response<BoxBody> {
    let principal = match authenticate(&req, &state) {
        Ok(p) => p,
        Err(e) => return respond_error(&e),
    };
    if let Err(e) = principal.require_role(&[Role::Provider, Role::Operator]) {
        return respond_error(&e);
    }

    let request_id = match parse_object_id(raw_id) {
        Ok(id) => id,
        Err(e) => return respond_error(&e),
    };

    match state.coordinator.release(request_id, &principal).await {
        Ok(request) => json_response(
            StatusCode::OK,
            &ReleaseResponse {
                acknowledged: true,
                request: request.into(),
            },
        ),
        Err(e) => respond_error(&e),
    }
}

/// POST /api/requests/{id}/status (operator override)
pub async fn handle_override_status(
    req: Request<Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Response<BoxBody> {
    let principal = match authenticate(&req, &state) {
        Ok(p) => p,
        Err(e) => return respond_error(&e),
    };
    if let Err(e) = principal.require_role(&[Role::Operator]) {
        return respond_error(&e);
    }

    let request_id = match parse_object_id(raw_id) {
        Ok(id) => id,
        Err(e) => return respond_error(&e),
    };

    let body: OverrideStatusRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return respond_error(&e),
    };

    match state
        .lifecycle
        .override_status(request_id, &body.status, &principal)
        .await
    {
        Ok(request) => json_response(StatusCode::OK, &RequestView::from(request)),
        Err(e) => respond_error(&e),
    }
}
