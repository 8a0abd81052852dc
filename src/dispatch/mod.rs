//! Request dispatch: the claim protocol and the request lifecycle
//!
//! `claim` holds the single-winner assignment of Pending requests to
//! competing providers; `lifecycle` holds creation, the read surface,
//! and the operator's unchecked status override.

pub mod claim;
pub mod lifecycle;

pub use claim::ClaimCoordinator;
pub use lifecycle::{AccountSummary, NewRequest, RequestLifecycle, ResolvedRequest};
