//! Fee calculator — accrued management and performance fees.
//!
//! Management fees accrue linearly over elapsed time against current total
//! assets. Performance fees are charged only on gain above the share-price
//! watermark, and only past the hurdle return:
//!
//! - **Hard hurdle**: fee on the excess above the hurdle return only
//! - **Soft hurdle**: fee on the whole gain once the hurdle is cleared
//!
//! The same function serves as an external quote and as the internal
//! computation before commit — it is pure, so the two can never disagree.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use openvault_types::{FeeBreakdown, FeeState, constants};

/// Compute the fees accrued since the last charge.
///
/// `total_assets` and `total_supply` are the vault's current totals;
/// `price_scale` is the fixed-point scale of the share-price representation
/// (10^decimals). All amounts are integral base units; each fee is floored
/// so fee charges never round in the engine's favor.
#[must_use]
pub fn accrued_fees(
    state: &FeeState,
    total_assets: Decimal,
    total_supply: Decimal,
    price_scale: Decimal,
    now: DateTime<Utc>,
) -> FeeBreakdown {
    let rate_denom =
        Decimal::from(constants::SECONDS_PER_YEAR) * Decimal::from(constants::BPS_DENOMINATOR);

    // Management: linear in elapsed seconds against current total assets.
    let elapsed_management =
        Decimal::from((now - state.last_charged_management).num_seconds().max(0));
    let management = (total_assets
        * elapsed_management
        * Decimal::from(state.management_fee_bps)
        / rate_denom)
        .floor();

    // The watermark fixes the baseline: what the vault was worth the last
    // time a performance fee was taken, valued at today's supply.
    let working_total = total_assets - management;
    let last_total_assets = (total_supply * state.share_price_watermark / price_scale).floor();
    let delta = working_total - last_total_assets;

    if delta <= Decimal::ZERO {
        return FeeBreakdown {
            management,
            performance: Decimal::ZERO,
        };
    }

    let elapsed_performance =
        Decimal::from((now - state.last_charged_performance).num_seconds().max(0));
    let hurdle_return = (last_total_assets
        * Decimal::from(state.hurdle_rate_bps)
        * elapsed_performance
        / rate_denom)
        .floor();

    let performance = if delta > hurdle_return {
        let base = if state.is_hard_hurdle {
            delta - hurdle_return
        } else {
            delta
        };
        (base * Decimal::from(state.performance_fee_bps)
            / Decimal::from(constants::BPS_DENOMINATOR))
        .floor()
    } else {
        Decimal::ZERO
    };

    FeeBreakdown {
        management,
        performance,
    }
}
