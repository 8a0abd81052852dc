//! Authentication routes
//!
//! - POST /auth/register - create a requester or provider account, get a token
//! - POST /auth/login    - authenticate, get a token
//! - GET  /auth/me       - current principal
//!
//! This is the credential-issuance edge: everything past it works with
//! an authenticated principal and never sees a password.

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{hash_password, verify_password, Role};
use crate::db::schemas::AccountDoc;
use crate::routes::{
    authenticate, json_response, parse_json_body, respond_error, AccountView, BoxBody,
};
use crate::server::AppState;
use crate::types::WaysideError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub identifier: String,
    pub display_name: String,
    #[serde(default)]
    pub phone: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: u64,
    pub account: AccountView,
}

/// POST /auth/register
pub async fn handle_register(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: RegisterRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return respond_error(&e),
    };

    if body.identifier.trim().is_empty() || body.password.is_empty() {
        return respond_error(&WaysideError::Validation(
            "identifier and password are required".into(),
        ));
    }

    let role = match Role::parse(&body.role) {
        Some(Role::Operator) | None => {
            return respond_error(&WaysideError::Validation(
                "role must be \"requester\" or \"provider\"".into(),
            ))
        }
        Some(role) => role,
    };

    let identifier = body.identifier.trim().to_string();

    match state.store.accounts.find_by_identifier(&identifier).await {
        Ok(Some(_)) => {
            return respond_error(&WaysideError::Validation("account already exists".into()))
        }
        Ok(None) => {}
        Err(e) => return respond_error(&e),
    }

    let password_hash = match hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => return respond_error(&e),
    };

    let display_name = if body.display_name.trim().is_empty() {
        identifier
            .split('@')
            .next()
            .unwrap_or("Account")
            .to_string()
    } else {
        body.display_name.trim().to_string()
    };

    let account = match state
        .store
        .accounts
        .insert(AccountDoc::new(
            identifier,
            display_name,
            body.phone.trim().to_string(),
            password_hash,
            role,
        ))
        .await
    {
        Ok(account) => account,
        Err(e) => return respond_error(&e),
    };

    let account_id = match account._id {
        Some(id) => id,
        None => {
            return respond_error(&WaysideError::Database(
                "inserted account has no id".into(),
            ))
        }
    };

    let (token, expires_at) = match state.jwt.issue(account_id, &account.identifier, role) {
        Ok(issued) => issued,
        Err(e) => return respond_error(&e),
    };

    info!(identifier = %account.identifier, role = %role, "account registered");

    json_response(
        StatusCode::CREATED,
        &AuthResponse {
            token,
            expires_at,
            account: account.into(),
        },
    )
}

/// POST /auth/login
pub async fn handle_login(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let body: LoginRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return respond_error(&e),
    };

    let account = match state
        .store
        .accounts
        .find_by_identifier(body.identifier.trim())
        .await
    {
        Ok(Some(account)) => account,
        Ok(None) => return respond_error(&WaysideError::Auth("invalid credentials".into())),
        Err(e) => return respond_error(&e),
    };

    match verify_password(&body.password, &account.password_hash) {
        Ok(true) => {}
        Ok(false) => return respond_error(&WaysideError::Auth("invalid credentials".into())),
        Err(e) => return respond_error(&e),
    }

    let account_id = match account._id {
        Some(id) => id,
        None => return respond_error(&WaysideError::Database("account has no id".into())),
    };

    let (token, expires_at) =
        match state.jwt.issue(account_id, &account.identifier, account.role) {
            Ok(issued) => issued,
            Err(e) => return respond_error(&e),
        };

    info!(identifier = %account.identifier, "login successful");

    json_response(
        StatusCode::OK,
        &AuthResponse {
            token,
            expires_at,
            account: account.into(),
        },
    )
}

/// GET /auth/me
pub async fn handle_me(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let principal = match authenticate(&req, &state) {
        Ok(p) => p,
        Err(e) => return respond_error(&e),
    };

    match state.store.accounts.find_by_id(principal.account_id).await {
        Ok(Some(account)) => json_response(StatusCode::OK, &AccountView::from(account)),
        Ok(None) => respond_error(&WaysideError::NotFound("account")),
        Err(e) => respond_error(&e),
    }
}
