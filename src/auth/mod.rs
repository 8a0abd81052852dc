//! Authentication and authorization
//!
//! Provides:
//! - JWT token issue and validation (the credential-issuance seam:
//!   handlers receive an authenticated principal, never raw secrets)
//! - Password hashing with Argon2
//! - Account roles and per-operation authorization

pub mod jwt;
pub mod password;
pub mod roles;

pub use jwt::{extract_bearer_token, Claims, JwtValidator};
pub use password::{hash_password, verify_password};
pub use roles::{Principal, Role};
