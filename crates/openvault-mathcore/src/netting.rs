//! Netting arithmetic — signed deposit/redeem netting and share conversion.
//!
//! Netting is exact integer subtraction: `deposited − requested` in asset
//! units, no rounding before the share conversion. The share conversion is
//! ceiling-safe: the chosen share count is the **minimal** integer whose
//! asset value covers the target, found by flooring and then walking up
//! through at most a handful of dust units.

use rust_decimal::Decimal;

use openvault_types::{OpenvaultError, Result, constants};

/// Which way a netted settlement moves value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetDirection {
    /// Deposits exceed redemptions: assets flow into the external position.
    IntoPosition,
    /// Redemptions exceed deposits: assets flow out of the position.
    OutOfPosition,
    /// Perfectly netted: nothing moves.
    Flat,
}

impl NetDirection {
    /// Classify a signed netting result.
    #[must_use]
    pub fn of(netted: Decimal) -> Self {
        if netted.is_zero() {
            Self::Flat
        } else if netted.is_sign_positive() {
            Self::IntoPosition
        } else {
            Self::OutOfPosition
        }
    }
}

/// Exact signed netting: `deposited − requested_assets`.
///
/// Both inputs are asset base units; the subtraction is exact, so
/// `deposited − requested == netted` holds with zero rounding loss.
#[must_use]
pub fn net_flow(deposited: Decimal, requested_assets: Decimal) -> Decimal {
    deposited - requested_assets
}

/// The asset amount flowing into the position. The deposit path fails on
/// the wrong sign instead of clamping.
///
/// # Errors
/// Returns [`OpenvaultError::WrongNettingDirection`] for a zero or
/// negative net.
pub fn into_position_assets(netted: Decimal) -> Result<Decimal> {
    if netted > Decimal::ZERO {
        Ok(netted)
    } else {
        Err(OpenvaultError::WrongNettingDirection {
            netted,
            flow: "deposit",
        })
    }
}

/// The asset amount flowing out of the position. The redemption path fails
/// on the wrong sign instead of clamping.
///
/// # Errors
/// Returns [`OpenvaultError::WrongNettingDirection`] for a zero or
/// positive net.
pub fn out_of_position_assets(netted: Decimal) -> Result<Decimal> {
    if netted < Decimal::ZERO {
        Ok(-netted)
    } else {
        Err(OpenvaultError::WrongNettingDirection {
            netted,
            flow: "redeem",
        })
    }
}

/// Value pending redemption shares at the current net share price, floored
/// to asset base units.
#[must_use]
pub fn requested_to_assets(
    requested_shares: Decimal,
    net_share_price: Decimal,
    price_scale: Decimal,
) -> Decimal {
    (requested_shares * net_share_price / price_scale).floor()
}

/// Pro-rata share value in asset units, floored. An empty pool converts 1:1.
#[must_use]
pub fn shares_to_assets_floor(shares: Decimal, pool_assets: Decimal, pool_shares: Decimal) -> Decimal {
    if pool_shares.is_zero() {
        return shares;
    }
    (shares * pool_assets / pool_shares).floor()
}

/// Pro-rata asset value in share units, floored. An empty pool converts 1:1.
#[must_use]
pub fn assets_to_shares_floor(assets: Decimal, pool_assets: Decimal, pool_shares: Decimal) -> Decimal {
    if pool_shares.is_zero() || pool_assets.is_zero() {
        return assets;
    }
    (assets * pool_shares / pool_assets).floor()
}

/// The minimal whole number of shares whose asset value covers
/// `target_assets` at the pool's current rate.
///
/// Starts from the floor conversion and increments one share unit at a time
/// while the value falls short. The walk is bounded by the fixed-point
/// resolution of the pool rate; [`constants::MAX_DUST_ITERATIONS`] turns a
/// would-be hang on corrupt pool state into a hard error.
///
/// # Errors
/// Returns [`OpenvaultError::Arithmetic`] if the bound is exhausted.
pub fn shares_for_assets_ceil(
    target_assets: Decimal,
    pool_assets: Decimal,
    pool_shares: Decimal,
) -> Result<Decimal> {
    if target_assets.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let mut shares = assets_to_shares_floor(target_assets, pool_assets, pool_shares);
    let mut iterations = 0u32;
    while shares_to_assets_floor(shares, pool_assets, pool_shares) < target_assets {
        shares += Decimal::ONE;
        iterations += 1;
        if iterations > constants::MAX_DUST_ITERATIONS {
            return Err(OpenvaultError::Arithmetic(format!(
                "dust correction did not converge for target {target_assets} \
                 (pool {pool_assets}/{pool_shares})"
            )));
        }
    }
    Ok(shares)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn netting_is_exact() {
        assert_eq!(
            net_flow(Decimal::new(100, 0), Decimal::new(50, 0)),
            Decimal::new(50, 0)
        );
        assert_eq!(
            net_flow(Decimal::new(50, 0), Decimal::new(100, 0)),
            Decimal::new(-50, 0)
        );
        assert_eq!(net_flow(Decimal::new(75, 0), Decimal::new(75, 0)), Decimal::ZERO);
    }

    #[test]
    fn direction_classification() {
        assert_eq!(NetDirection::of(Decimal::new(50, 0)), NetDirection::IntoPosition);
        assert_eq!(NetDirection::of(Decimal::new(-50, 0)), NetDirection::OutOfPosition);
        assert_eq!(NetDirection::of(Decimal::ZERO), NetDirection::Flat);
    }

    #[test]
    fn wrong_direction_fails_instead_of_clamping() {
        let err = into_position_assets(Decimal::new(-50, 0)).unwrap_err();
        assert!(matches!(
            err,
            openvault_types::OpenvaultError::WrongNettingDirection { flow: "deposit", .. }
        ));
        let err = out_of_position_assets(Decimal::new(50, 0)).unwrap_err();
        assert!(matches!(
            err,
            openvault_types::OpenvaultError::WrongNettingDirection { flow: "redeem", .. }
        ));

        assert_eq!(
            into_position_assets(Decimal::new(50, 0)).unwrap(),
            Decimal::new(50, 0)
        );
        assert_eq!(
            out_of_position_assets(Decimal::new(-50, 0)).unwrap(),
            Decimal::new(50, 0)
        );
    }

    #[test]
    fn empty_pool_converts_one_to_one() {
        assert_eq!(
            assets_to_shares_floor(Decimal::new(100, 0), Decimal::ZERO, Decimal::ZERO),
            Decimal::new(100, 0)
        );
        assert_eq!(
            shares_to_assets_floor(Decimal::new(100, 0), Decimal::new(500, 0), Decimal::ZERO),
            Decimal::new(100, 0)
        );
    }

    #[test]
    fn requested_conversion_floors() {
        // 33 shares at price 1.5 (scale 10) => 49.5 => 49 asset units.
        assert_eq!(
            requested_to_assets(Decimal::new(33, 0), Decimal::new(15, 0), Decimal::new(10, 0)),
            Decimal::new(49, 0)
        );
    }

    #[test]
    fn ceil_conversion_covers_target() {
        // Pool worth 1,000 assets over 700 shares: rate ≈ 1.428…
        let pool_assets = Decimal::new(1000, 0);
        let pool_shares = Decimal::new(700, 0);
        let target = Decimal::new(333, 0);

        let shares = shares_for_assets_ceil(target, pool_assets, pool_shares).unwrap();
        assert!(shares_to_assets_floor(shares, pool_assets, pool_shares) >= target);
    }

    #[test]
    fn ceil_conversion_is_minimal() {
        let pool_assets = Decimal::new(997, 0);
        let pool_shares = Decimal::new(701, 0);
        let target = Decimal::new(123, 0);

        let shares = shares_for_assets_ceil(target, pool_assets, pool_shares).unwrap();
        assert!(shares_to_assets_floor(shares, pool_assets, pool_shares) >= target);
        assert!(
            shares_to_assets_floor(shares - Decimal::ONE, pool_assets, pool_shares) < target,
            "one share fewer must fall short"
        );
    }

    #[test]
    fn ceil_conversion_zero_target_zero_shares() {
        assert_eq!(
            shares_for_assets_ceil(Decimal::ZERO, Decimal::new(1000, 0), Decimal::new(700, 0)).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn ceil_property_holds_for_random_pools() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let pool_assets = Decimal::from(rng.gen_range(1u64..=1_000_000));
            let pool_shares = Decimal::from(rng.gen_range(1u64..=1_000_000));
            let target = Decimal::from(rng.gen_range(1u64..=100_000));

            let shares = shares_for_assets_ceil(target, pool_assets, pool_shares).unwrap();
            let value = shares_to_assets_floor(shares, pool_assets, pool_shares);
            assert!(value >= target, "value {value} < target {target}");
            if shares > Decimal::ZERO {
                let under = shares_to_assets_floor(shares - Decimal::ONE, pool_assets, pool_shares);
                assert!(under < target, "shares not minimal: {shares} for {target}");
            }
        }
    }
}
