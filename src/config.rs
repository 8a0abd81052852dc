//! Configuration for Wayside
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Wayside - dispatch gateway for on-demand roadside assistance
#[derive(Parser, Debug, Clone)]
#[command(name = "wayside")]
#[command(about = "Dispatch gateway for on-demand roadside assistance")]
pub struct Args {
    /// Unique node identifier for this gateway instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory store and stub gateway when
    /// the real collaborators are unreachable)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "wayside")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "604800")]
    pub jwt_expiry_seconds: u64,

    /// Payment gateway base URL (e.g. "https://api.gateway.example")
    /// When unset in dev mode, a deterministic local stub is used.
    #[arg(long, env = "GATEWAY_URL")]
    pub gateway_url: Option<String>,

    /// Payment gateway API key id (basic-auth user for order creation)
    #[arg(long, env = "GATEWAY_KEY_ID")]
    pub gateway_key_id: Option<String>,

    /// Payment gateway shared secret. Signs settlement proofs; also the
    /// basic-auth password for order creation.
    #[arg(long, env = "GATEWAY_KEY_SECRET")]
    pub gateway_key_secret: Option<String>,

    /// Gateway request timeout in milliseconds
    #[arg(long, env = "GATEWAY_TIMEOUT_MS", default_value = "10000")]
    pub gateway_timeout_ms: u64,

    /// Bootstrap operator credential as "email:password". Applied once at
    /// startup if the account does not exist; the password is stored as
    /// an argon2 hash and the plaintext is never kept.
    #[arg(long, env = "OPERATOR_BOOTSTRAP")]
    pub operator_bootstrap: Option<String>,

    /// Path for the JSONL audit trail (overrides, settlements)
    #[arg(long, env = "AUDIT_LOG_PATH")]
    pub audit_log_path: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Get effective JWT secret (uses default in dev mode)
    pub fn jwt_secret(&self) -> String {
        if self.dev_mode {
            self.jwt_secret
                .clone()
                .unwrap_or_else(|| "dev-only-insecure-secret".to_string())
        } else {
            self.jwt_secret
                .clone()
                .expect("JWT_SECRET is required in production mode")
        }
    }

    /// Get effective gateway shared secret (uses default in dev mode)
    pub fn gateway_secret(&self) -> String {
        if self.dev_mode {
            self.gateway_key_secret
                .clone()
                .unwrap_or_else(|| "dev-only-gateway-secret".to_string())
        } else {
            self.gateway_key_secret
                .clone()
                .expect("GATEWAY_KEY_SECRET is required in production mode")
        }
    }

    /// Parse the operator bootstrap credential, if configured
    pub fn operator_credential(&self) -> Option<(String, String)> {
        let raw = self.operator_bootstrap.as_deref()?;
        let (email, password) = raw.split_once(':')?;
        if email.is_empty() || password.is_empty() {
            return None;
        }
        Some((email.to_string(), password.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.jwt_secret.is_none() {
                return Err("JWT_SECRET is required in production mode".to_string());
            }
            if self.gateway_key_secret.is_none() {
                return Err("GATEWAY_KEY_SECRET is required in production mode".to_string());
            }
            if self.gateway_url.is_some() && self.gateway_key_id.is_none() {
                return Err("GATEWAY_KEY_ID is required when GATEWAY_URL is set".to_string());
            }
        }

        if let Some(raw) = &self.operator_bootstrap {
            if self.operator_credential().is_none() {
                return Err(format!(
                    "OPERATOR_BOOTSTRAP must be \"email:password\", got {:?}",
                    raw
                ));
            }
        }

        Ok(())
    }
}
