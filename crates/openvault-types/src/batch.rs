//! Batch lifecycle types for the OpenVault settlement model.
//!
//! A batch accumulates one (vault, asset)'s mint and redeem requests and is
//! closed and settled as a unit:
//!
//! ```text
//!   ┌──────┐  close   ┌────────┐  propose   ┌──────────┐  execute   ┌─────────┐
//!   │ OPEN ├─────────▶│ CLOSED ├───────────▶│ PROPOSED ├───────────▶│ SETTLED │
//!   └──────┘          └────────┘            └────┬─────┘            └─────────┘
//!                                                │ cancel
//!                                                ▼
//!                                          ┌───────────┐
//!                                          │ CANCELLED │
//!                                          └───────────┘
//! ```
//!
//! The `is_closed`/`is_settled` flags are the ordering mutex: a batch must
//! be closed before it can be proposed and proposed before it can be
//! settled, so two settlements can never interleave on the same position.
//! Both transitions are one-way and happen exactly once.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Asset, BatchId, OpenvaultError, Result, VaultId};

/// One accumulation period of mint/redeem requests for a (vault, asset).
///
/// Created by the vault ledger on first use of an asset, mutated only by the
/// close/settle transitions, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// The vault this batch belongs to.
    pub vault: VaultId,
    /// The asset being minted/redeemed.
    pub asset: Asset,
    /// Monotonic identifier within the (vault, asset) series.
    pub id: BatchId,
    /// Deposits accumulated during the period, in asset base units.
    pub deposited: Decimal,
    /// Redemption requests accumulated during the period, in share units.
    /// Converted to asset units at the current net share price when netting.
    pub requested: Decimal,
    /// Set once by [`Batch::close`]; no further requests are accepted.
    pub is_closed: bool,
    /// Set once by [`Batch::mark_settled`] when the proposal executes.
    pub is_settled: bool,
    /// Share price before fees, recorded at settlement. Zero until settled.
    pub gross_share_price: Decimal,
    /// Share price after fees, recorded at settlement. Zero until settled.
    pub net_share_price: Decimal,
    /// When the batch was opened.
    pub opened_at: DateTime<Utc>,
    /// When the batch was closed, if it has been.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Batch {
    /// Open a fresh batch with no accumulated requests.
    #[must_use]
    pub fn open(vault: VaultId, asset: impl Into<Asset>, id: BatchId, now: DateTime<Utc>) -> Self {
        Self {
            vault,
            asset: asset.into(),
            id,
            deposited: Decimal::ZERO,
            requested: Decimal::ZERO,
            is_closed: false,
            is_settled: false,
            gross_share_price: Decimal::ZERO,
            net_share_price: Decimal::ZERO,
            opened_at: now,
            closed_at: None,
        }
    }

    /// Close the batch. A batch closes exactly once.
    ///
    /// # Errors
    /// Returns [`OpenvaultError::BatchAlreadyClosed`] on a second close.
    pub fn close(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.is_closed {
            return Err(OpenvaultError::BatchAlreadyClosed(self.id));
        }
        self.is_closed = true;
        self.closed_at = Some(now);
        Ok(())
    }

    /// Mark the batch as settled. Requires a prior close; settles exactly once.
    ///
    /// # Errors
    /// - [`OpenvaultError::BatchNotClosed`] if the batch is still open
    /// - [`OpenvaultError::BatchAlreadySettled`] on a second settle
    pub fn mark_settled(&mut self) -> Result<()> {
        if !self.is_closed {
            return Err(OpenvaultError::BatchNotClosed(self.id));
        }
        if self.is_settled {
            return Err(OpenvaultError::BatchAlreadySettled(self.id));
        }
        self.is_settled = true;
        Ok(())
    }

    /// Whether the batch still accepts mint/redeem requests.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.is_closed
    }
}

#[cfg(feature = "test-helpers")]
impl Batch {
    /// A dummy open batch for tests: fresh vault, given amounts.
    #[must_use]
    pub fn dummy(deposited: Decimal, requested: Decimal) -> Self {
        let mut batch = Self::open(VaultId::new(), "USDC", BatchId(0), Utc::now());
        batch.deposited = deposited;
        batch.requested = requested;
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_batch() -> Batch {
        Batch::open(VaultId::new(), "USDC", BatchId(1), Utc::now())
    }

    #[test]
    fn fresh_batch_is_open_and_empty() {
        let batch = open_batch();
        assert!(batch.is_open());
        assert!(!batch.is_settled);
        assert_eq!(batch.deposited, Decimal::ZERO);
        assert_eq!(batch.requested, Decimal::ZERO);
        assert!(batch.closed_at.is_none());
    }

    #[test]
    fn close_transitions_once() {
        let mut batch = open_batch();
        batch.close(Utc::now()).unwrap();
        assert!(batch.is_closed);
        assert!(batch.closed_at.is_some());

        let err = batch.close(Utc::now()).unwrap_err();
        assert!(matches!(err, OpenvaultError::BatchAlreadyClosed(BatchId(1))));
    }

    #[test]
    fn settle_requires_close() {
        let mut batch = open_batch();
        let err = batch.mark_settled().unwrap_err();
        assert!(matches!(err, OpenvaultError::BatchNotClosed(_)));
    }

    #[test]
    fn settle_transitions_once() {
        let mut batch = open_batch();
        batch.close(Utc::now()).unwrap();
        batch.mark_settled().unwrap();
        assert!(batch.is_settled);

        let err = batch.mark_settled().unwrap_err();
        assert!(matches!(err, OpenvaultError::BatchAlreadySettled(_)));
    }

    #[test]
    fn batch_serde_roundtrip() {
        let batch = open_batch();
        let json = serde_json::to_string(&batch).unwrap();
        let back: Batch = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, batch.id);
        assert_eq!(back.asset, batch.asset);
        assert_eq!(back.is_closed, batch.is_closed);
    }
}
