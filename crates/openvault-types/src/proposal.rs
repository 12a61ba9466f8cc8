//! Settlement proposal types.
//!
//! A proposal is the cooldown-gated, optionally guardian-accepted
//! declaration of a batch's final accounting. The coordinator submits it,
//! the settlement ledger owns its lifecycle, and the downstream vault
//! ledger consumes it to adjust token supply and share prices.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Asset, BatchId, ProposalId, VaultId};

/// Lifecycle state of a settlement proposal.
///
/// Transitions are monotonic: `Pending → Executed` and `Pending → Cancelled`
/// are the only moves, and both are terminal. Acceptance is a flag on the
/// pending state, not a state of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Submitted; waiting out the cooldown (and acceptance, if required).
    Pending,
    /// The downstream ledger applied this proposal. **Irreversible.**
    Executed,
    /// A guardian cancelled this proposal before execution. **Irreversible.**
    Cancelled,
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Executed => write!(f, "EXECUTED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// The final accounting of one settled batch.
///
/// `total_assets` is always the value read directly from the external
/// position at proposal time — never derived by adding deltas — so drift
/// cannot accumulate across settlement cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementProposal {
    /// Globally unique proposal identifier.
    pub id: ProposalId,
    /// The vault whose batch is being settled.
    pub vault: VaultId,
    /// The asset being settled.
    pub asset: Asset,
    /// The batch this proposal settles.
    pub batch_id: BatchId,
    /// Assets held in the external position, read at proposal time.
    pub total_assets: Decimal,
    /// Signed netting result: deposits minus redemption value, asset units.
    pub netted: Decimal,
    /// Signed yield observed since the last settlement, asset units.
    /// Positive when the external position gained value.
    pub yield_delta: Decimal,
    /// Total fees charged during this settlement, asset units. Lets the
    /// downstream ledger reconstruct the gross share price without
    /// re-reading the position.
    pub fees_charged: Decimal,
    /// Execution is rejected before this deadline (cooldown gate).
    pub execute_after: DateTime<Utc>,
    /// Management-fee accrual timestamp carried into the vault's fee state.
    pub last_fees_charged_management: DateTime<Utc>,
    /// Performance-fee accrual timestamp carried into the vault's fee state.
    pub last_fees_charged_performance: DateTime<Utc>,
    /// Whether a guardian has accepted this proposal.
    pub accepted: bool,
    /// Lifecycle state.
    pub status: ProposalStatus,
    /// When the proposal was submitted.
    pub proposed_at: DateTime<Utc>,
}

impl SettlementProposal {
    /// Whether the batch net was negative (more redeemed than deposited).
    #[must_use]
    pub fn is_netting_negative(&self) -> bool {
        self.netted.is_sign_negative() && !self.netted.is_zero()
    }

    /// Whether the proposal is still pending (not executed or cancelled).
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == ProposalStatus::Pending
    }
}
