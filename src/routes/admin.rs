//! Operator routes: dashboard statistics and account listings

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::Role;
use crate::routes::{authenticate, json_response, respond_error, AccountView, BoxBody};
use crate::server::AppState;
use crate::types::WaysideError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountListResponse {
    pub accounts: Vec<AccountView>,
}

/// GET /admin/stats (operator)
pub async fn handle_dashboard_stats(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let principal = match authenticate(&req, &state) {
        Ok(p) => p,
        Err(e) => return respond_error(&e),
    };
    if let Err(e) = principal.require_role(&[Role::Operator]) {
        return respond_error(&e);
    }

    match state.reporter.stats().await {
        Ok(stats) => json_response(StatusCode::OK, &stats),
        Err(e) => respond_error(&e),
    }
}

/// GET /admin/accounts?role=requester|provider (operator)
pub async fn handle_list_accounts(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let principal = match authenticate(&req, &state) {
        Ok(p) => p,
        Err(e) => return respond_error(&e),
    };
    if let Err(e) = principal.require_role(&[Role::Operator]) {
        return respond_error(&e);
    }

    let role = req
        .uri()
        .query()
        .and_then(|q| {
            q.split('&')
                .find_map(|pair| pair.strip_prefix("role="))
        })
        .and_then(Role::parse);

    let role = match role {
        Some(role) => role,
        None => {
            return respond_error(&WaysideError::Validation(
                "role query parameter must be \"requester\", \"provider\", or \"operator\"".into(),
            ))
        }
    };

    match state.store.accounts.list_by_role(role).await {
        Ok(accounts) => json_response(
            StatusCode::OK,
            &AccountListResponse {
                accounts: accounts.into_iter().map(AccountView::from).collect(),
            },
        ),
        Err(e) => respond_error(&e),
    }
}
