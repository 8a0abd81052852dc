//! Account roles and authenticated principals

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Result, WaysideError};

/// Account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Files service requests and pays for them
    Requester,
    /// Competes to claim and fulfill requests
    Provider,
    /// Administrative authority: overrides and reporting
    Operator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Requester => "requester",
            Role::Provider => "provider",
            Role::Operator => "operator",
        }
    }

    /// Parse a role from its wire form
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "requester" => Some(Role::Requester),
            "provider" => Some(Role::Provider),
            "operator" => Some(Role::Operator),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated caller, as handed to route handlers after token
/// validation
#[derive(Debug, Clone)]
pub struct Principal {
    pub account_id: ObjectId,
    pub identifier: String,
    pub role: Role,
}

impl Principal {
    /// Require that the principal holds one of `allowed`
    pub fn require_role(&self, allowed: &[Role]) -> Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(WaysideError::Forbidden(format!(
                "operation requires role {:?}, caller is {}",
                allowed.iter().map(Role::as_str).collect::<Vec<_>>(),
                self.role
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Requester, Role::Provider, Role::Operator] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::parse("Provider"), None);
    }

    #[test]
    fn test_require_role() {
        let principal = Principal {
            account_id: ObjectId::new(),
            identifier: "p1@wayside.example".into(),
            role: Role::Provider,
        };

        assert!(principal.require_role(&[Role::Provider]).is_ok());
        assert!(principal
            .require_role(&[Role::Requester, Role::Provider])
            .is_ok());
        assert!(matches!(
            principal.require_role(&[Role::Operator]),
            Err(WaysideError::Forbidden(_))
        ));
    }
}
