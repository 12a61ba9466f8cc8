//! Profit cascade and loss recovery arithmetic.
//!
//! When the external position is worth more than the ledger expects, the
//! surplus cascades insurance → treasury → vault adapter, with whatever is
//! left staying put as implicit ledger capital. When the position is worth
//! less, a single ceiling-rounded recovery transfer restores parity instead.
//!
//! Treasury and adapter slices are floored so the cascade can never hand
//! out more than the profit it was given; the insurance slice is capped by
//! the remaining amount.

use rust_decimal::Decimal;

use openvault_types::{OpenvaultError, Result, constants};

use crate::netting::shares_for_assets_ceil;

/// The share amounts each cascade destination receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfitDistributionResult {
    /// Shares replenishing the insurance fund, capped at its deficit.
    pub insurance_shares: Decimal,
    /// Shares for the treasury.
    pub treasury_shares: Decimal,
    /// Shares for the settling vault's adapter.
    pub vault_adapter_shares: Decimal,
}

impl ProfitDistributionResult {
    /// Total shares leaving the ledger adapter.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.insurance_shares + self.treasury_shares + self.vault_adapter_shares
    }
}

/// How far the insurance fund is below its target, in asset units.
///
/// `target = insurance_bps * ledger_total_assets / 10000`; a fund at or
/// above target has zero deficit.
#[must_use]
pub fn insurance_deficit(
    insurance_bps: u64,
    ledger_total_assets: Decimal,
    insurance_current_assets: Decimal,
) -> Decimal {
    let target = (Decimal::from(insurance_bps) * ledger_total_assets
        / Decimal::from(constants::BPS_DENOMINATOR))
    .floor();
    (target - insurance_current_assets).max(Decimal::ZERO)
}

/// Split `profit_shares` across the cascade destinations.
///
/// Order matters: insurance is made whole first (capped at its deficit),
/// the treasury takes its fraction of what remains, and the vault adapter
/// takes its caller-chosen fraction of the rest — but only when the vault
/// has outstanding supply, so early profit cannot inflate the first
/// holder's shares. The unallocated remainder stays with the ledger.
///
/// # Errors
/// Returns [`OpenvaultError::ProfitShareTooLarge`] for a fraction above
/// 10000 bps, before any allocation is computed.
pub fn distribute_profit(
    profit_shares: Decimal,
    insurance_deficit_shares: Decimal,
    treasury_bps: u64,
    profit_share_bps: u64,
    vault_has_supply: bool,
) -> Result<ProfitDistributionResult> {
    if profit_share_bps > constants::BPS_DENOMINATOR {
        return Err(OpenvaultError::ProfitShareTooLarge {
            bps: profit_share_bps,
        });
    }

    let bps_denom = Decimal::from(constants::BPS_DENOMINATOR);
    let mut remaining = profit_shares;

    let insurance_shares = remaining.min(insurance_deficit_shares);
    remaining -= insurance_shares;

    let treasury_shares = (remaining * Decimal::from(treasury_bps) / bps_denom).floor();
    remaining -= treasury_shares;

    let vault_adapter_shares = if vault_has_supply {
        (remaining * Decimal::from(profit_share_bps) / bps_denom).floor()
    } else {
        Decimal::ZERO
    };

    Ok(ProfitDistributionResult {
        insurance_shares,
        treasury_shares,
        vault_adapter_shares,
    })
}

/// Shares to pull back from the vault adapter to cover a loss: the minimal
/// whole-share amount worth at least `loss_assets` at the pool rate.
///
/// # Errors
/// Returns [`OpenvaultError::Arithmetic`] if the dust walk fails to
/// converge (corrupt pool state).
pub fn loss_recovery_shares(
    loss_assets: Decimal,
    pool_assets: Decimal,
    pool_shares: Decimal,
) -> Result<Decimal> {
    shares_for_assets_ceil(loss_assets, pool_assets, pool_shares)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deficit_is_target_minus_current() {
        // 10% of 10,000 = target 1,000; current 400 => deficit 600.
        assert_eq!(
            insurance_deficit(1_000, Decimal::new(10_000, 0), Decimal::new(400, 0)),
            Decimal::new(600, 0)
        );
    }

    #[test]
    fn deficit_floors_at_zero() {
        assert_eq!(
            insurance_deficit(1_000, Decimal::new(10_000, 0), Decimal::new(5_000, 0)),
            Decimal::ZERO
        );
    }

    #[test]
    fn cascade_fills_insurance_first() {
        // Profit 100 shares, deficit 60 => insurance 60, treasury 50% of 40 = 20.
        let result =
            distribute_profit(Decimal::new(100, 0), Decimal::new(60, 0), 5_000, 0, true).unwrap();
        assert_eq!(result.insurance_shares, Decimal::new(60, 0));
        assert_eq!(result.treasury_shares, Decimal::new(20, 0));
        assert_eq!(result.vault_adapter_shares, Decimal::ZERO);
    }

    #[test]
    fn cascade_caps_insurance_at_profit() {
        let result =
            distribute_profit(Decimal::new(50, 0), Decimal::new(200, 0), 5_000, 5_000, true)
                .unwrap();
        assert_eq!(result.insurance_shares, Decimal::new(50, 0));
        assert_eq!(result.treasury_shares, Decimal::ZERO);
        assert_eq!(result.vault_adapter_shares, Decimal::ZERO);
    }

    #[test]
    fn cascade_half_to_adapter_when_others_disabled() {
        // Insurance and treasury disabled: adapter gets exactly 50%.
        let result =
            distribute_profit(Decimal::new(200, 0), Decimal::ZERO, 0, 5_000, true).unwrap();
        assert_eq!(result.insurance_shares, Decimal::ZERO);
        assert_eq!(result.treasury_shares, Decimal::ZERO);
        assert_eq!(result.vault_adapter_shares, Decimal::new(100, 0));
    }

    #[test]
    fn cascade_skips_adapter_without_supply() {
        let result =
            distribute_profit(Decimal::new(200, 0), Decimal::ZERO, 0, 10_000, false).unwrap();
        assert_eq!(result.vault_adapter_shares, Decimal::ZERO);
    }

    #[test]
    fn cascade_never_exceeds_profit() {
        let profit = Decimal::new(999, 0);
        let result =
            distribute_profit(profit, Decimal::new(300, 0), 3_333, 7_777, true).unwrap();
        assert!(result.total() <= profit);
    }

    #[test]
    fn cascade_exact_when_everything_absorbs() {
        // Deficit covers all remaining after nothing, treasury 0, share 10000:
        // insurance 300, remaining 700, adapter 700 => total == profit.
        let result =
            distribute_profit(Decimal::new(1000, 0), Decimal::new(300, 0), 0, 10_000, true)
                .unwrap();
        assert_eq!(result.total(), Decimal::new(1000, 0));
    }

    #[test]
    fn profit_share_above_denominator_rejected() {
        let err = distribute_profit(Decimal::new(100, 0), Decimal::ZERO, 0, 10_001, true)
            .unwrap_err();
        assert!(matches!(err, OpenvaultError::ProfitShareTooLarge { bps: 10_001 }));
    }

    #[test]
    fn loss_recovery_rounds_up() {
        // Pool rate 997/701: 123 assets needs the minimal covering share count.
        let shares =
            loss_recovery_shares(Decimal::new(123, 0), Decimal::new(997, 0), Decimal::new(701, 0))
                .unwrap();
        let value = crate::netting::shares_to_assets_floor(
            shares,
            Decimal::new(997, 0),
            Decimal::new(701, 0),
        );
        assert!(value >= Decimal::new(123, 0));
    }
}
