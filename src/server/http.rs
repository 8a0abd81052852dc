//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one task per connection, manual
//! method/path routing.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::dispatch::{ClaimCoordinator, RequestLifecycle};
use crate::logging::AuditLogger;
use crate::reports::DashboardReporter;
use crate::routes::{self, BoxBody};
use crate::settlement::{PaymentGateway, SettlementVerifier};
use crate::store::EntityStore;
use crate::types::WaysideError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: EntityStore,
    pub jwt: JwtValidator,
    pub audit: AuditLogger,
    pub coordinator: ClaimCoordinator,
    pub lifecycle: RequestLifecycle,
    pub verifier: SettlementVerifier,
    pub reporter: DashboardReporter,
}

impl AppState {
    /// Wire the core components over a store and gateway
    pub fn new(args: Args, store: EntityStore, gateway: Arc<dyn PaymentGateway>) -> Self {
        let jwt = JwtValidator::new(&args.jwt_secret(), args.jwt_expiry_seconds);
        let audit = AuditLogger::new(args.node_id.to_string());
        let coordinator = ClaimCoordinator::new(&store, audit.clone());
        let lifecycle = RequestLifecycle::new(&store, audit.clone());
        let verifier =
            SettlementVerifier::new(&store, gateway, args.gateway_secret(), audit.clone());
        let reporter = DashboardReporter::new(&store);

        Self {
            args,
            store,
            jwt,
            audit,
            coordinator,
            lifecycle,
            verifier,
            reporter,
        }
    }
}

/// Accept loop
pub async fn run(state: Arc<AppState>) -> Result<(), WaysideError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Wayside listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - insecure defaults in effect");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("{} {}", method, path);

    let response = match (method, path.as_str()) {
        // CORS preflight
        (Method::OPTIONS, _) => routes::cors_preflight(),

        // Probes
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            routes::readiness_check(Arc::clone(&state)).await
        }
        (Method::GET, "/version") => routes::version_info(),

        // Credential issuance
        (Method::POST, "/auth/register") => {
            routes::handle_register(req, Arc::clone(&state)).await
        }
        (Method::POST, "/auth/login") => routes::handle_login(req, Arc::clone(&state)).await,
        (Method::GET, "/auth/me") => routes::handle_me(req, Arc::clone(&state)).await,

        // Service requests
        (Method::POST, "/api/requests") => {
            routes::handle_create_request(req, Arc::clone(&state)).await
        }
        (Method::GET, "/api/requests") => routes::handle_list_all(req, Arc::clone(&state)).await,
        (Method::GET, "/api/requests/mine") => {
            routes::handle_list_mine(req, Arc::clone(&state)).await
        }
        (Method::GET, "/api/requests/pending") => {
            routes::handle_list_pending(req, Arc::clone(&state)).await
        }
        (Method::GET, "/api/requests/history") => {
            routes::handle_history(req, Arc::clone(&state)).await
        }

        // Per-request operations: /api/requests/{id}[/claim|/release|/status]
        (Method::GET, p) if p.starts_with("/api/requests/") => {
            let raw_id = p.strip_prefix("/api/requests/").unwrap_or("");
            if raw_id.contains('/') {
                routes::not_found_response(p)
            } else {
                routes::handle_get_request(req, Arc::clone(&state), raw_id).await
            }
        }
        (Method::POST, p) if p.starts_with("/api/requests/") => {
            let rest = p.strip_prefix("/api/requests/").unwrap_or("");
            match rest.split_once('/') {
                Some((raw_id, "claim")) => {
                    routes::handle_claim(req, Arc::clone(&state), raw_id).await
                }
                Some((raw_id, "release")) => {
                    routes::handle_release(req, Arc::clone(&state), raw_id).await
                }
                Some((raw_id, "status")) => {
                    routes::handle_override_status(req, Arc::clone(&state), raw_id).await
                }
                _ => routes::not_found_response(p),
            }
        }

        // Payments
        (Method::POST, "/api/payments/order") => {
            routes::handle_open_order(req, Arc::clone(&state)).await
        }
        (Method::POST, "/api/payments/confirm") => {
            routes::handle_confirm_settlement(req, Arc::clone(&state)).await
        }
        (Method::GET, "/api/payments") => {
            routes::handle_list_payments(req, Arc::clone(&state)).await
        }
        (Method::GET, "/api/payments/all") => {
            routes::handle_list_all_payments(req, Arc::clone(&state)).await
        }

        // Operator dashboard
        (Method::GET, "/admin/stats") => {
            routes::handle_dashboard_stats(req, Arc::clone(&state)).await
        }
        (Method::GET, "/admin/accounts") => {
            routes::handle_list_accounts(req, Arc::clone(&state)).await
        }

        _ => routes::not_found_response(&path),
    };

    Ok(response)
}
