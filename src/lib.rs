//! Wayside - dispatch gateway for on-demand roadside assistance
//!
//! Requesters file service requests, providers race to claim them, and
//! a verified payment settlement closes each job.
//!
//! ## Components
//!
//! - **Store**: entity storage seam (MongoDB or in-memory)
//! - **Dispatch**: single-winner claim protocol and request lifecycle
//! - **Settlement**: gateway orders and keyed-hash proof verification
//! - **Reports**: read-only operator dashboard aggregation
//! - **Server**: hyper HTTP surface with JWT role authorization

pub mod auth;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod logging;
pub mod reports;
pub mod routes;
pub mod server;
pub mod settlement;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, WaysideError};
