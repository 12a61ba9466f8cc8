//! Authorization primitives for the OpenVault settlement engine.
//!
//! Every state-mutating entry point takes an explicit [`AuthContext`] and is
//! checked against a role table owned by the coordinator. Capabilities are
//! data passed into each call — there is no ambient authority.
//!
//! ## Design Principles
//!
//! - **Fail-closed**: an actor without the required role is rejected before
//!   any state is touched
//! - **No bypass**: every mutating path goes through the same check
//! - **Explicit grants**: only an Admin can grant or revoke roles

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::AccountId;

/// The capabilities recognized by the settlement engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// May grant and revoke roles.
    Admin,
    /// May drive batch close/settle/execute workflows.
    Relayer,
    /// May accept or cancel pending settlement proposals.
    Guardian,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "ADMIN"),
            Self::Relayer => write!(f, "RELAYER"),
            Self::Guardian => write!(f, "GUARDIAN"),
        }
    }
}

/// The caller identity threaded through every entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// The account invoking the operation.
    pub actor: AccountId,
}

impl AuthContext {
    #[must_use]
    pub fn new(actor: AccountId) -> Self {
        Self { actor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_display_is_screaming() {
        assert_eq!(format!("{}", Role::Admin), "ADMIN");
        assert_eq!(format!("{}", Role::Relayer), "RELAYER");
        assert_eq!(format!("{}", Role::Guardian), "GUARDIAN");
    }

    #[test]
    fn auth_context_carries_actor() {
        let acct = AccountId::from_bytes([3u8; 32]);
        let ctx = AuthContext::new(acct);
        assert_eq!(ctx.actor, acct);
    }

    #[test]
    fn role_serde_roundtrip() {
        let json = serde_json::to_string(&Role::Guardian).unwrap();
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Role::Guardian);
    }
}
