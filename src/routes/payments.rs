//! Payment routes
//!
//! Opening settlement orders, confirming signed proofs, and the payment
//! listings.

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::Role;
use crate::routes::{
    authenticate, json_response, parse_json_body, parse_object_id, respond_error, BoxBody,
    PaymentView, RequestView,
};
use crate::server::AppState;
use crate::settlement::GatewayOrder;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrderRequest {
    pub request_id: String,
    pub amount: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrderResponse {
    pub payment: PaymentView,
    pub order: GatewayOrder,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub payment_id: String,
    pub order_ref: String,
    pub txn_ref: String,
    pub signature: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResponse {
    pub payment: PaymentView,
    pub request: RequestView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentView>,
}

/// POST /api/payments/order (requester)
pub async fn handle_open_order(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let principal = match authenticate(&req, &state) {
        Ok(p) => p,
        Err(e) => return respond_error(&e),
    };
    if let Err(e) = principal.require_role(&[Role::Requester]) {
        return respond_error(&e);
    }

    let body: OpenOrderRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return respond_error(&e),
    };

    let request_id = match parse_object_id(&body.request_id) {
        Ok(id) => id,
        Err(e) => return respond_error(&e),
    };

    match state
        .verifier
        .begin(request_id, principal.account_id, body.amount)
        .await
    {
        Ok((payment, order)) => json_response(
            StatusCode::CREATED,
            &OpenOrderResponse {
                payment: payment.into(),
                order,
            },
        ),
        Err(e) => respond_error(&e),
    }
}

/// POST /api/payments/confirm (requester)
pub async fn handle_confirm_settlement(
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

    let body: ConfirmRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return respond_error(&e),
    };

    let payment_id = match parse_object_id(&body.payment_id) {
        Ok(id) => id,
        Err(e) => return respond_error(&e),
    };

    match state
        .verifier
        .confirm(payment_id, &body.order_ref, &body.txn_ref, &body.signature)
        .await
    {
        Ok((payment, request)) => json_response(
            StatusCode::OK,
            &ConfirmResponse {
                payment: payment.into(),
                request: request.into(),
            },
        ),
        Err(e) => respond_error(&e),
    }
}

/// GET /api/payments (requester)
pub async fn handle_list_payments(
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

    match state.verifier.list_for_requester(principal.account_id).await {
        Ok(payments) => json_response(
            StatusCode::OK,
            &PaymentListResponse {
                payments: payments.into_iter().map(PaymentView::from).collect(),
            },
        ),
        Err(e) => respond_error(&e),
    }
}

/// GET /api/payments/all (operator)
pub async fn handle_list_all_payments(
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

    match state.verifier.list_all().await {
        Ok(payments) => json_response(
            StatusCode::OK,
            &PaymentListResponse {
                payments: payments.into_iter().map(PaymentView::from).collect(),
            },
        ),
        Err(e) => respond_error(&e),
    }
}
