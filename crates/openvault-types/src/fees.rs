//! Fee accounting types.
//!
//! Each vault carries a [`FeeState`]: its fee rates, the share-price
//! watermark that gates performance fees, and the timestamps of the last
//! charges. [`FeeBreakdown`] is the pure output of the fee calculator.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OpenvaultError, Result, constants};

/// Per-vault fee configuration and accrual bookkeeping.
///
/// The watermark is the highest net share price this vault has settled at;
/// performance fees are charged only above it, so recovered losses are
/// never charged twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeState {
    /// Annualized management fee in basis points.
    pub management_fee_bps: u64,
    /// Performance fee in basis points, applied to watermark-relative gain.
    pub performance_fee_bps: u64,
    /// Minimum annualized return below which no performance fee applies.
    pub hurdle_rate_bps: u64,
    /// Hard hurdle: fee only on the excess above the hurdle return.
    /// Soft hurdle: fee on the whole gain once the hurdle is cleared.
    pub is_hard_hurdle: bool,
    /// Highest historical net share price, in price units.
    pub share_price_watermark: Decimal,
    /// When management fees were last charged.
    pub last_charged_management: DateTime<Utc>,
    /// When performance fees were last charged.
    pub last_charged_performance: DateTime<Utc>,
}

impl FeeState {
    /// Create a fee state with the given rates and both accrual clocks
    /// starting at `now`.
    ///
    /// # Errors
    /// Returns [`OpenvaultError::InvalidFeeConfig`] if any rate exceeds the
    /// bps denominator.
    pub fn new(
        management_fee_bps: u64,
        performance_fee_bps: u64,
        hurdle_rate_bps: u64,
        is_hard_hurdle: bool,
        initial_watermark: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        for (name, bps) in [
            ("management_fee_bps", management_fee_bps),
            ("performance_fee_bps", performance_fee_bps),
            ("hurdle_rate_bps", hurdle_rate_bps),
        ] {
            if bps > constants::BPS_DENOMINATOR {
                return Err(OpenvaultError::InvalidFeeConfig {
                    reason: format!("{name} = {bps} exceeds {}", constants::BPS_DENOMINATOR),
                });
            }
        }
        Ok(Self {
            management_fee_bps,
            performance_fee_bps,
            hurdle_rate_bps,
            is_hard_hurdle,
            share_price_watermark: initial_watermark,
            last_charged_management: now,
            last_charged_performance: now,
        })
    }

    /// Record a fee charge: advance both accrual clocks.
    pub fn notify_charged(&mut self, management_at: DateTime<Utc>, performance_at: DateTime<Utc>) {
        self.last_charged_management = management_at;
        self.last_charged_performance = performance_at;
    }

    /// Raise the watermark if the settled net share price is a new high.
    pub fn observe_share_price(&mut self, net_share_price: Decimal) {
        if net_share_price > self.share_price_watermark {
            self.share_price_watermark = net_share_price;
        }
    }
}

/// The pure output of the fee calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Time-proportional management fee, asset units.
    pub management: Decimal,
    /// Watermark-relative performance fee, asset units.
    pub performance: Decimal,
}

impl FeeBreakdown {
    /// A zero fee breakdown.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            management: Decimal::ZERO,
            performance: Decimal::ZERO,
        }
    }

    /// Combined fee (management + performance).
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.management + self.performance
    }

    /// Whether no fee is due at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.management.is_zero() && self.performance.is_zero()
    }
}
