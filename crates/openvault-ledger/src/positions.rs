//! Position ledger — external yield-bearing venues.
//!
//! Each venue is one external position keyed by its asset: a pool of assets
//! backing a pool of shares, with per-holder share balances. Adapters,
//! treasuries, and insurance funds are all just holders. Yield accrual
//! raises the pool's asset total without minting shares, which is exactly
//! how a depeg between ledger expectation and external reality arises.
//!
//! Redemption follows the external venue's asynchronous protocol: a request
//! reserves shares, a separate execute burns them and releases assets. The
//! executor submits both as ordered commands in one atomic plan.

use std::collections::HashMap;

use rust_decimal::Decimal;

use openvault_mathcore::{assets_to_shares_floor, shares_for_assets_ceil, shares_to_assets_floor};
use openvault_types::{AccountId, Asset, OpenvaultError, Result};

/// A holder's reserved-but-not-yet-executed redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingRedemption {
    /// Shares moved out of the holder's balance into reservation.
    shares: Decimal,
}

/// One external yield venue.
#[derive(Debug, Clone, Default)]
struct Venue {
    /// Total assets backing the pool.
    pool_assets: Decimal,
    /// Total shares outstanding against the pool.
    pool_shares: Decimal,
    /// Share balance per holder.
    holdings: HashMap<AccountId, Decimal>,
    /// At most one pending redemption per holder; repeat requests accumulate.
    pending: HashMap<AccountId, PendingRedemption>,
}

/// In-memory ledger of every external venue the engine routes through.
#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    venues: HashMap<Asset, Venue>,
}

impl PositionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a venue for an asset. Idempotent.
    pub fn create_venue(&mut self, asset: &str) {
        self.venues.entry(asset.to_string()).or_default();
    }

    fn venue(&self, asset: &str) -> Result<&Venue> {
        self.venues
            .get(asset)
            .ok_or_else(|| OpenvaultError::UnknownVenue(asset.to_string()))
    }

    fn venue_mut(&mut self, asset: &str) -> Result<&mut Venue> {
        self.venues
            .get_mut(asset)
            .ok_or_else(|| OpenvaultError::UnknownVenue(asset.to_string()))
    }

    /// Deposit assets, minting shares to `holder` at the pool's current
    /// rate (floored; an empty pool mints 1:1).
    ///
    /// # Errors
    /// - [`OpenvaultError::UnknownVenue`] for an unregistered asset
    /// - [`OpenvaultError::InvalidAmount`] for a non-positive amount
    pub fn deposit(&mut self, asset: &str, holder: AccountId, assets: Decimal) -> Result<Decimal> {
        if assets <= Decimal::ZERO {
            return Err(OpenvaultError::InvalidAmount {
                field: "deposit",
                amount: assets,
            });
        }
        let venue = self.venue_mut(asset)?;
        let minted = assets_to_shares_floor(assets, venue.pool_assets, venue.pool_shares);
        venue.pool_assets += assets;
        venue.pool_shares += minted;
        *venue.holdings.entry(holder).or_insert(Decimal::ZERO) += minted;
        Ok(minted)
    }

    /// First half of the redemption protocol: reserve the minimal share
    /// amount worth at least `assets` out of `holder`'s balance.
    ///
    /// # Errors
    /// - [`OpenvaultError::InsufficientShares`] if the holder's balance
    ///   cannot cover the reservation
    pub fn request_redeem(
        &mut self,
        asset: &str,
        holder: AccountId,
        assets: Decimal,
    ) -> Result<Decimal> {
        if assets <= Decimal::ZERO {
            return Err(OpenvaultError::InvalidAmount {
                field: "redeem_request",
                amount: assets,
            });
        }
        let venue = self.venue_mut(asset)?;
        let shares = shares_for_assets_ceil(assets, venue.pool_assets, venue.pool_shares)?;
        let balance = venue.holdings.get(&holder).copied().unwrap_or(Decimal::ZERO);
        if balance < shares {
            return Err(OpenvaultError::InsufficientShares {
                needed: shares,
                available: balance,
            });
        }
        *venue.holdings.entry(holder).or_insert(Decimal::ZERO) -= shares;
        venue
            .pending
            .entry(holder)
            .or_insert(PendingRedemption {
                shares: Decimal::ZERO,
            })
            .shares += shares;
        Ok(shares)
    }

    /// Second half: burn the reserved shares and release their asset value
    /// at the pool's current rate.
    ///
    /// # Errors
    /// Returns [`OpenvaultError::NoPendingRedemption`] if nothing was
    /// requested for this holder.
    pub fn execute_redeem(&mut self, asset: &str, holder: AccountId) -> Result<Decimal> {
        let venue = self.venue_mut(asset)?;
        let pending =
            venue
                .pending
                .remove(&holder)
                .ok_or_else(|| OpenvaultError::NoPendingRedemption {
                    holder,
                    asset: asset.to_string(),
                })?;
        let assets_out = shares_to_assets_floor(pending.shares, venue.pool_assets, venue.pool_shares);
        venue.pool_shares -= pending.shares;
        venue.pool_assets -= assets_out;
        Ok(assets_out)
    }

    /// Move shares between two holders. Pool totals are untouched, so the
    /// share/asset rate is transfer-invariant.
    ///
    /// # Errors
    /// Returns [`OpenvaultError::InsufficientShares`] if `from` cannot
    /// cover the amount.
    pub fn transfer_shares(
        &mut self,
        asset: &str,
        from: AccountId,
        to: AccountId,
        shares: Decimal,
    ) -> Result<()> {
        if shares.is_zero() {
            return Ok(());
        }
        if shares.is_sign_negative() {
            return Err(OpenvaultError::InvalidAmount {
                field: "transfer",
                amount: shares,
            });
        }
        let venue = self.venue_mut(asset)?;
        let balance = venue.holdings.get(&from).copied().unwrap_or(Decimal::ZERO);
        if balance < shares {
            return Err(OpenvaultError::InsufficientShares {
                needed: shares,
                available: balance,
            });
        }
        *venue.holdings.entry(from).or_insert(Decimal::ZERO) -= shares;
        *venue.holdings.entry(to).or_insert(Decimal::ZERO) += shares;
        tracing::debug!(
            venue = asset,
            from = %from,
            to = %to,
            shares = %shares,
            "Shares transferred"
        );
        Ok(())
    }

    /// Accrue yield (positive) or mark a loss (negative) on the pool.
    ///
    /// # Errors
    /// Returns [`OpenvaultError::InvalidAmount`] if a loss would take the
    /// pool below zero.
    pub fn accrue(&mut self, asset: &str, delta: Decimal) -> Result<()> {
        let venue = self.venue_mut(asset)?;
        let next = venue.pool_assets + delta;
        if next.is_sign_negative() {
            return Err(OpenvaultError::InvalidAmount {
                field: "accrual",
                amount: delta,
            });
        }
        venue.pool_assets = next;
        Ok(())
    }

    /// Share balance of a holder (zero if never seen).
    pub fn balance_of(&self, asset: &str, holder: AccountId) -> Result<Decimal> {
        Ok(self
            .venue(asset)?
            .holdings
            .get(&holder)
            .copied()
            .unwrap_or(Decimal::ZERO))
    }

    /// Asset value of a holder's shares at the pool's current rate, floored.
    ///
    /// This is the balance query the coordinator uses for every
    /// `total_assets` it publishes — always read, never derived.
    pub fn assets_of(&self, asset: &str, holder: AccountId) -> Result<Decimal> {
        let venue = self.venue(asset)?;
        let shares = venue.holdings.get(&holder).copied().unwrap_or(Decimal::ZERO);
        Ok(shares_to_assets_floor(shares, venue.pool_assets, venue.pool_shares))
    }

    /// The pool's (assets, shares) totals — the conversion-rate inputs.
    pub fn pool(&self, asset: &str) -> Result<(Decimal, Decimal)> {
        let venue = self.venue(asset)?;
        Ok((venue.pool_assets, venue.pool_shares))
    }

    /// Convert an asset amount to the minimal covering share amount at the
    /// pool's current rate.
    pub fn shares_ceil(&self, asset: &str, assets: Decimal) -> Result<Decimal> {
        let venue = self.venue(asset)?;
        shares_for_assets_ceil(assets, venue.pool_assets, venue.pool_shares)
    }

    /// Asset value of a share amount at the pool's current rate, floored.
    pub fn assets_floor(&self, asset: &str, shares: Decimal) -> Result<Decimal> {
        let venue = self.venue(asset)?;
        Ok(shares_to_assets_floor(shares, venue.pool_assets, venue.pool_shares))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holder(tag: u8) -> AccountId {
        AccountId::from_bytes([tag; 32])
    }

    fn ledger_with_venue() -> PositionLedger {
        let mut ledger = PositionLedger::new();
        ledger.create_venue("USDC");
        ledger
    }

    #[test]
    fn deposit_into_empty_pool_mints_one_to_one() {
        let mut ledger = ledger_with_venue();
        let minted = ledger.deposit("USDC", holder(1), Decimal::new(1000, 0)).unwrap();
        assert_eq!(minted, Decimal::new(1000, 0));
        assert_eq!(ledger.balance_of("USDC", holder(1)).unwrap(), Decimal::new(1000, 0));
        assert_eq!(ledger.assets_of("USDC", holder(1)).unwrap(), Decimal::new(1000, 0));
    }

    #[test]
    fn unknown_venue_rejected() {
        let mut ledger = PositionLedger::new();
        let err = ledger.deposit("TBILL", holder(1), Decimal::ONE).unwrap_err();
        assert!(matches!(err, OpenvaultError::UnknownVenue(_)));
    }

    #[test]
    fn yield_accrual_appreciates_holdings_without_minting() {
        let mut ledger = ledger_with_venue();
        ledger.deposit("USDC", holder(1), Decimal::new(1000, 0)).unwrap();
        ledger.accrue("USDC", Decimal::new(200, 0)).unwrap();

        // Same shares, more value.
        assert_eq!(ledger.balance_of("USDC", holder(1)).unwrap(), Decimal::new(1000, 0));
        assert_eq!(ledger.assets_of("USDC", holder(1)).unwrap(), Decimal::new(1200, 0));
    }

    #[test]
    fn two_step_redeem_round_trip() {
        let mut ledger = ledger_with_venue();
        ledger.deposit("USDC", holder(1), Decimal::new(1000, 0)).unwrap();

        let reserved = ledger
            .request_redeem("USDC", holder(1), Decimal::new(400, 0))
            .unwrap();
        assert_eq!(
            ledger.balance_of("USDC", holder(1)).unwrap(),
            Decimal::new(1000, 0) - reserved
        );

        let out = ledger.execute_redeem("USDC", holder(1)).unwrap();
        assert!(out >= Decimal::new(400, 0));
        let (pool_assets, _) = ledger.pool("USDC").unwrap();
        assert_eq!(pool_assets, Decimal::new(1000, 0) - out);
    }

    #[test]
    fn execute_without_request_fails() {
        let mut ledger = ledger_with_venue();
        ledger.deposit("USDC", holder(1), Decimal::new(100, 0)).unwrap();
        let err = ledger.execute_redeem("USDC", holder(1)).unwrap_err();
        assert!(matches!(err, OpenvaultError::NoPendingRedemption { .. }));
    }

    #[test]
    fn request_redeem_insufficient_shares() {
        let mut ledger = ledger_with_venue();
        ledger.deposit("USDC", holder(1), Decimal::new(100, 0)).unwrap();
        let err = ledger
            .request_redeem("USDC", holder(1), Decimal::new(200, 0))
            .unwrap_err();
        assert!(matches!(err, OpenvaultError::InsufficientShares { .. }));
    }

    #[test]
    fn transfer_moves_shares_not_rate() {
        let mut ledger = ledger_with_venue();
        ledger.deposit("USDC", holder(1), Decimal::new(1000, 0)).unwrap();
        let pool_before = ledger.pool("USDC").unwrap();

        ledger
            .transfer_shares("USDC", holder(1), holder(2), Decimal::new(300, 0))
            .unwrap();
        assert_eq!(ledger.balance_of("USDC", holder(1)).unwrap(), Decimal::new(700, 0));
        assert_eq!(ledger.balance_of("USDC", holder(2)).unwrap(), Decimal::new(300, 0));
        assert_eq!(ledger.pool("USDC").unwrap(), pool_before);
    }

    #[test]
    fn transfer_insufficient_shares() {
        let mut ledger = ledger_with_venue();
        ledger.deposit("USDC", holder(1), Decimal::new(100, 0)).unwrap();
        let err = ledger
            .transfer_shares("USDC", holder(1), holder(2), Decimal::new(200, 0))
            .unwrap_err();
        assert!(matches!(err, OpenvaultError::InsufficientShares { .. }));
    }

    #[test]
    fn zero_transfer_is_noop() {
        let mut ledger = ledger_with_venue();
        ledger.deposit("USDC", holder(1), Decimal::new(100, 0)).unwrap();
        ledger
            .transfer_shares("USDC", holder(1), holder(2), Decimal::ZERO)
            .unwrap();
        assert_eq!(ledger.balance_of("USDC", holder(2)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn loss_below_zero_rejected() {
        let mut ledger = ledger_with_venue();
        ledger.deposit("USDC", holder(1), Decimal::new(100, 0)).unwrap();
        let err = ledger.accrue("USDC", Decimal::new(-200, 0)).unwrap_err();
        assert!(matches!(err, OpenvaultError::InvalidAmount { .. }));
    }
}
