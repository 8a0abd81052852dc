//! Wayside - dispatch gateway for on-demand roadside assistance

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wayside::{
    auth::{hash_password, Role},
    config::Args,
    db::MongoClient,
    db::schemas::AccountDoc,
    server,
    settlement::{HttpPaymentGateway, LocalPaymentGateway, PaymentGateway},
    store::EntityStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("wayside={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Wayside - Roadside Dispatch Gateway");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {}", args.mongodb_uri);
    info!(
        "Gateway: {}",
        args.gateway_url.as_deref().unwrap_or("(local stub)")
    );
    info!("======================================");

    // Entity store: MongoDB, or in-memory in dev mode when unreachable
    let store = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => match EntityStore::connect(&client).await {
            Ok(store) => {
                info!("MongoDB entity store ready");
                store
            }
            Err(e) => {
                error!("Failed to initialize collections: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB unreachable (dev mode, using in-memory store): {}", e);
                EntityStore::in_memory()
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Payment gateway: HTTP client, or the local stub in dev mode
    let gateway: Arc<dyn PaymentGateway> = match &args.gateway_url {
        Some(url) => {
            let key_id = args.gateway_key_id.clone().unwrap_or_default();
            let gateway = HttpPaymentGateway::new(
                url.clone(),
                key_id,
                args.gateway_secret(),
                args.gateway_timeout_ms,
            )?;
            info!("Payment gateway client ready ({})", url);
            Arc::new(gateway)
        }
        None => {
            if args.dev_mode {
                warn!("No GATEWAY_URL configured (dev mode, using local stub)");
            } else {
                warn!("No GATEWAY_URL configured; orders will be minted locally");
            }
            Arc::new(LocalPaymentGateway)
        }
    };

    let state = Arc::new(server::AppState::new(args.clone(), store, gateway));

    // Attach the audit file sink
    if let Some(path) = &args.audit_log_path {
        if let Err(e) = state.audit.init_file(path.into()).await {
            error!("Failed to open audit log {}: {}", path, e);
            std::process::exit(1);
        }
    }

    // Seed the bootstrap operator account if configured and absent
    if let Some((identifier, password)) = args.operator_credential() {
        match state.store.accounts.find_by_identifier(&identifier).await {
            Ok(Some(_)) => info!("Operator account {} already present", identifier),
            Ok(None) => {
                let password_hash = hash_password(&password)
                    .map_err(|e| anyhow::anyhow!("failed to hash operator password: {e}"))?;
                state
                    .store
                    .accounts
                    .insert(AccountDoc::new(
                        identifier.clone(),
                        "Operator".to_string(),
                        String::new(),
                        password_hash,
                        Role::Operator,
                    ))
                    .await
                    .map_err(|e| anyhow::anyhow!("failed to seed operator account: {e}"))?;
                info!("Seeded operator account {}", identifier);
            }
            Err(e) => {
                error!("Failed to check for operator account: {}", e);
                std::process::exit(1);
            }
        }
    }

    server::run(state).await?;

    Ok(())
}
