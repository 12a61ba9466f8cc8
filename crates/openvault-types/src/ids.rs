//! Globally unique identifiers used throughout OpenVault.
//!
//! Entity IDs use UUIDv7 for time-ordered lexicographic sorting, except
//! `AccountId` which is an opaque 32-byte address and `BatchId` which is a
//! per-(vault, asset) monotonic counter.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// VaultId
// ---------------------------------------------------------------------------

/// Globally unique vault identifier. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct VaultId(pub Uuid);

impl VaultId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for VaultId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vault:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// Opaque 32-byte account address: treasuries, insurance funds, adapters.
///
/// The all-zero address is reserved as "unset" — configuration that requires
/// an account rejects it (`OV_ERR_203`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// The reserved zero address.
    pub const ZERO: Self = Self([0u8; 32]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the reserved zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acct:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// BatchId
// ---------------------------------------------------------------------------

/// Monotonically increasing batch identifier, scoped to one (vault, asset).
///
/// Each batch runs: OPEN → CLOSED → PROPOSED → SETTLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BatchId(pub u64);

impl BatchId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ProposalId
// ---------------------------------------------------------------------------

/// Globally unique settlement proposal identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ProposalId(pub Uuid);

impl ProposalId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Deterministic `ProposalId` from the (vault, asset, batch) it settles.
    ///
    /// Every replica derives the **exact same** `ProposalId` for the same
    /// batch, so a re-driven workflow converges on one proposal instead of
    /// minting duplicates.
    #[must_use]
    pub fn deterministic(vault: VaultId, asset: &str, batch_id: BatchId) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"openvault:proposal_id:v2:");
        hasher.update(vault.0.as_bytes());
        hasher.update(asset.as_bytes());
        hasher.update(batch_id.0.to_le_bytes());
        let hash = hasher.finalize();
        let bytes: [u8; 16] = hash[..16].try_into().expect("SHA-256 produces 32 bytes");
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for ProposalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prop:{}", self.0)
    }
}

/// Type alias for asset identifiers (e.g., "USDC", "TBILL").
pub type Asset = String;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vault_id_uniqueness() {
        let a = VaultId::new();
        let b = VaultId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn vault_id_ordering() {
        let a = VaultId::new();
        let b = VaultId::new();
        assert!(a < b);
    }

    #[test]
    fn account_id_zero_detection() {
        assert!(AccountId::ZERO.is_zero());
        assert!(!AccountId::from_bytes([7u8; 32]).is_zero());
    }

    #[test]
    fn account_id_display_prefix() {
        let acct = AccountId::from_bytes([0xabu8; 32]);
        let shown = format!("{acct}");
        assert!(shown.starts_with("acct:abab"), "Got: {shown}");
    }

    #[test]
    fn batch_id_next() {
        let b = BatchId(5);
        assert_eq!(b.next(), BatchId(6));
    }

    #[test]
    fn proposal_id_deterministic() {
        let vault = VaultId::from_bytes([1u8; 16]);
        let a = ProposalId::deterministic(vault, "USDC", BatchId(3));
        let b = ProposalId::deterministic(vault, "USDC", BatchId(3));
        assert_eq!(a, b);
        let c = ProposalId::deterministic(vault, "USDC", BatchId(4));
        assert_ne!(a, c);
        let d = ProposalId::deterministic(vault, "TBILL", BatchId(3));
        assert_ne!(a, d);
    }

    #[test]
    fn serde_roundtrips() {
        let vid = VaultId::new();
        let json = serde_json::to_string(&vid).unwrap();
        let back: VaultId = serde_json::from_str(&json).unwrap();
        assert_eq!(vid, back);

        let pid = ProposalId::new();
        let json = serde_json::to_string(&pid).unwrap();
        let back: ProposalId = serde_json::from_str(&json).unwrap();
        assert_eq!(pid, back);

        let acct = AccountId::from_bytes([9u8; 32]);
        let json = serde_json::to_string(&acct).unwrap();
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(acct, back);
    }
}
