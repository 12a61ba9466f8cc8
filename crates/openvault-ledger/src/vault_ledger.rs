//! Vault ledger — batches, fee state, supply, and share prices.
//!
//! The downstream token ledger the settlement engine reports to. It
//! accumulates mint/redeem requests into per-(vault, asset) batches,
//! enforces the one-way close/settle transitions, and applies executed
//! settlement proposals: adjust supply, recompute gross/net share prices,
//! raise the fee watermark, and carry the fee accrual timestamps forward.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use openvault_types::{
    Asset, Batch, BatchId, FeeState, OpenvaultError, Result, SettlementProposal, VaultConfig,
    VaultId,
};

/// Per-vault ledger account.
#[derive(Debug, Clone)]
struct VaultAccount {
    config: VaultConfig,
    /// Absent for vaults that never charge fees (institutional custody).
    fee_state: Option<FeeState>,
    total_supply: Decimal,
    /// The assets the ledger believes back the supply — updated only by
    /// executed settlements, which is what makes a depeg observable.
    total_assets: Decimal,
    net_share_price: Decimal,
    gross_share_price: Decimal,
}

/// In-memory vault ledger: batch series plus per-vault accounts.
#[derive(Debug, Clone, Default)]
pub struct VaultLedger {
    vaults: HashMap<VaultId, VaultAccount>,
    batches: HashMap<(VaultId, Asset), Vec<Batch>>,
    /// The mint/redeem ledger's expectation of each custody position —
    /// the depeg baseline. Re-synced from the venue after reconciliation.
    custody: HashMap<(VaultId, Asset), Decimal>,
}

impl VaultLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a vault. Prices start at 1.0 in the vault's fixed-point
    /// scale; supply and backing start at zero.
    pub fn register_vault(&mut self, vault: VaultId, config: VaultConfig) {
        let scale = config.price_scale();
        self.vaults.insert(
            vault,
            VaultAccount {
                config,
                fee_state: None,
                total_supply: Decimal::ZERO,
                total_assets: Decimal::ZERO,
                net_share_price: scale,
                gross_share_price: scale,
            },
        );
    }

    /// Attach a fee state to a vault (yield-bearing vaults only).
    pub fn set_fee_state(&mut self, vault: VaultId, fee_state: FeeState) -> Result<()> {
        self.account_mut(vault)?.fee_state = Some(fee_state);
        Ok(())
    }

    /// Genesis seeding: set supply and backing directly, with prices
    /// derived from the ratio. Deployment tooling and tests use this to
    /// start a vault mid-life.
    pub fn bootstrap_supply(
        &mut self,
        vault: VaultId,
        total_supply: Decimal,
        total_assets: Decimal,
    ) -> Result<()> {
        let account = self.account_mut(vault)?;
        let scale = account.config.price_scale();
        account.total_supply = total_supply;
        account.total_assets = total_assets;
        if !total_supply.is_zero() {
            let price = (total_assets * scale / total_supply).floor();
            account.net_share_price = price;
            account.gross_share_price = price;
        }
        Ok(())
    }

    fn account(&self, vault: VaultId) -> Result<&VaultAccount> {
        self.vaults
            .get(&vault)
            .ok_or(OpenvaultError::VaultNotFound(vault))
    }

    fn account_mut(&mut self, vault: VaultId) -> Result<&mut VaultAccount> {
        self.vaults
            .get_mut(&vault)
            .ok_or(OpenvaultError::VaultNotFound(vault))
    }

    // -----------------------------------------------------------------
    // Account queries
    // -----------------------------------------------------------------

    pub fn total_supply(&self, vault: VaultId) -> Result<Decimal> {
        Ok(self.account(vault)?.total_supply)
    }

    /// The ledger-expected backing (last settled `total_assets`).
    pub fn total_assets(&self, vault: VaultId) -> Result<Decimal> {
        Ok(self.account(vault)?.total_assets)
    }

    pub fn net_share_price(&self, vault: VaultId) -> Result<Decimal> {
        Ok(self.account(vault)?.net_share_price)
    }

    pub fn gross_share_price(&self, vault: VaultId) -> Result<Decimal> {
        Ok(self.account(vault)?.gross_share_price)
    }

    pub fn price_scale(&self, vault: VaultId) -> Result<Decimal> {
        Ok(self.account(vault)?.config.price_scale())
    }

    /// The vault's fee state.
    ///
    /// # Errors
    /// Returns [`OpenvaultError::FeeStateMissing`] if none was attached.
    pub fn fee_state(&self, vault: VaultId) -> Result<&FeeState> {
        self.account(vault)?
            .fee_state
            .as_ref()
            .ok_or(OpenvaultError::FeeStateMissing(vault))
    }

    /// What the mint/redeem ledger believes the custody position holds.
    /// Divergence from the venue's answer is the depeg.
    pub fn custody_assets(&self, vault: VaultId, asset: &str) -> Result<Decimal> {
        self.account(vault)?;
        Ok(self
            .custody
            .get(&(vault, asset.to_string()))
            .copied()
            .unwrap_or(Decimal::ZERO))
    }

    /// Re-sync the custody expectation to a value read from the venue.
    pub fn set_custody_assets(&mut self, vault: VaultId, asset: &str, assets: Decimal) -> Result<()> {
        self.account(vault)?;
        self.custody.insert((vault, asset.to_string()), assets);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Batch lifecycle
    // -----------------------------------------------------------------

    /// The batch series for a (vault, asset), creating batch 0 on first use.
    fn series_mut(&mut self, vault: VaultId, asset: &str, now: DateTime<Utc>) -> &mut Vec<Batch> {
        self.batches
            .entry((vault, asset.to_string()))
            .or_insert_with(|| vec![Batch::open(vault, asset, BatchId(0), now)])
    }

    /// The currently accumulating batch, creating the series on first use.
    /// If the last batch was closed without a successor, a fresh one opens.
    fn open_batch_mut(&mut self, vault: VaultId, asset: &str, now: DateTime<Utc>) -> &mut Batch {
        let series = self.series_mut(vault, asset, now);
        let last = series.last().expect("series is never empty");
        if last.is_closed {
            let next = Batch::open(vault, asset, last.id.next(), now);
            series.push(next);
        }
        series.last_mut().expect("series is never empty")
    }

    /// Create the batch series on first use and return the open batch's id.
    pub fn ensure_batch(&mut self, vault: VaultId, asset: &str, now: DateTime<Utc>) -> Result<BatchId> {
        self.account(vault)?;
        Ok(self.open_batch_mut(vault, asset, now).id)
    }

    /// Record a mint deposit (asset units) into the open batch.
    pub fn record_deposit(
        &mut self,
        vault: VaultId,
        asset: &str,
        assets: Decimal,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if assets <= Decimal::ZERO {
            return Err(OpenvaultError::InvalidAmount {
                field: "deposit",
                amount: assets,
            });
        }
        self.account(vault)?;
        self.open_batch_mut(vault, asset, now).deposited += assets;
        Ok(())
    }

    /// Record a redemption request (share units) into the open batch.
    pub fn record_redeem_request(
        &mut self,
        vault: VaultId,
        asset: &str,
        shares: Decimal,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if shares <= Decimal::ZERO {
            return Err(OpenvaultError::InvalidAmount {
                field: "redeem_request",
                amount: shares,
            });
        }
        self.account(vault)?;
        self.open_batch_mut(vault, asset, now).requested += shares;
        Ok(())
    }

    /// The batch currently at the head of the series.
    pub fn current_batch(&self, vault: VaultId, asset: &str) -> Result<&Batch> {
        self.batches
            .get(&(vault, asset.to_string()))
            .and_then(|series| series.last())
            .ok_or_else(|| OpenvaultError::BatchNotFound {
                vault,
                asset: asset.to_string(),
                batch_id: BatchId(0),
            })
    }

    /// A specific batch by id.
    pub fn batch(&self, vault: VaultId, asset: &str, batch_id: BatchId) -> Result<&Batch> {
        self.batches
            .get(&(vault, asset.to_string()))
            .and_then(|series| series.iter().find(|b| b.id == batch_id))
            .ok_or_else(|| OpenvaultError::BatchNotFound {
                vault,
                asset: asset.to_string(),
                batch_id,
            })
    }

    /// Close the head batch, optionally opening its successor. Re-closing
    /// fails with the state error — the flags are the ordering mutex.
    pub fn close_batch(
        &mut self,
        vault: VaultId,
        asset: &str,
        create_next: bool,
        now: DateTime<Utc>,
    ) -> Result<BatchId> {
        self.account(vault)?;
        let series = self.series_mut(vault, asset, now);
        let head = series.last_mut().expect("series is never empty");
        head.close(now)?;
        let closed_id = head.id;
        if create_next {
            let next = Batch::open(vault, asset, closed_id.next(), now);
            series.push(next);
        }
        Ok(closed_id)
    }

    /// Advance fee accrual clocks after a charge.
    pub fn notify_fees_charged(
        &mut self,
        vault: VaultId,
        management_at: DateTime<Utc>,
        performance_at: DateTime<Utc>,
    ) -> Result<()> {
        let account = self.account_mut(vault)?;
        let fee_state = account
            .fee_state
            .as_mut()
            .ok_or(OpenvaultError::FeeStateMissing(vault))?;
        fee_state.notify_charged(management_at, performance_at);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Settlement application
    // -----------------------------------------------------------------

    /// Apply an executed settlement proposal: settle the batch once, adjust
    /// supply by the batch's mint/redeem flows, recompute share prices from
    /// the proposal's externally-read totals, and raise the watermark.
    pub fn apply_settlement(&mut self, proposal: &SettlementProposal) -> Result<()> {
        // Validate everything before the first mutation: any error here
        // leaves both the batch and the account untouched.
        let (deposited, requested_shares) = {
            let batch = self.batch(proposal.vault, &proposal.asset, proposal.batch_id)?;
            if !batch.is_closed {
                return Err(OpenvaultError::BatchNotClosed(batch.id));
            }
            if batch.is_settled {
                return Err(OpenvaultError::BatchAlreadySettled(batch.id));
            }
            (batch.deposited, batch.requested)
        };
        let account = self
            .vaults
            .get(&proposal.vault)
            .ok_or(OpenvaultError::VaultNotFound(proposal.vault))?;
        let scale = account.config.price_scale();

        // Mint at the pre-settlement net price, burn the requested shares.
        let minted = (deposited * scale / account.net_share_price).floor();
        let new_supply = account.total_supply + minted - requested_shares;
        if new_supply.is_sign_negative() {
            return Err(OpenvaultError::Arithmetic(format!(
                "settlement burns more shares than outstanding: supply {} minted {minted} \
                 requested {requested_shares}",
                account.total_supply
            )));
        }

        let (net_price, gross_price) = if new_supply.is_zero() {
            (account.net_share_price, account.gross_share_price)
        } else {
            (
                (proposal.total_assets * scale / new_supply).floor(),
                ((proposal.total_assets + proposal.fees_charged) * scale / new_supply).floor(),
            )
        };

        // Commit. Nothing below can fail.
        let batch = self
            .batches
            .get_mut(&(proposal.vault, proposal.asset.clone()))
            .and_then(|series| series.iter_mut().find(|b| b.id == proposal.batch_id))
            .ok_or_else(|| OpenvaultError::BatchNotFound {
                vault: proposal.vault,
                asset: proposal.asset.clone(),
                batch_id: proposal.batch_id,
            })?;
        batch.mark_settled()?;
        batch.net_share_price = net_price;
        batch.gross_share_price = gross_price;

        let account = self
            .vaults
            .get_mut(&proposal.vault)
            .ok_or(OpenvaultError::VaultNotFound(proposal.vault))?;
        account.total_supply = new_supply;
        account.total_assets = proposal.total_assets;
        account.net_share_price = net_price;
        account.gross_share_price = gross_price;
        if let Some(fee_state) = &mut account.fee_state {
            fee_state.notify_charged(
                proposal.last_fees_charged_management,
                proposal.last_fees_charged_performance,
            );
            fee_state.observe_share_price(net_price);
        }

        tracing::info!(
            vault = %proposal.vault,
            asset = %proposal.asset,
            batch = %proposal.batch_id,
            total_assets = %proposal.total_assets,
            supply = %new_supply,
            "Settlement applied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openvault_types::{ProposalId, ProposalStatus};

    fn scale() -> Decimal {
        Decimal::from(100_000_000u64)
    }

    fn registered() -> (VaultLedger, VaultId) {
        let mut ledger = VaultLedger::new();
        let vault = VaultId::new();
        ledger.register_vault(vault, VaultConfig::default());
        (ledger, vault)
    }

    fn proposal_for(
        vault: VaultId,
        batch_id: BatchId,
        total_assets: Decimal,
        fees_charged: Decimal,
    ) -> SettlementProposal {
        let now = Utc::now();
        SettlementProposal {
            id: ProposalId::deterministic(vault, "USDC", batch_id),
            vault,
            asset: "USDC".into(),
            batch_id,
            total_assets,
            netted: Decimal::ZERO,
            yield_delta: Decimal::ZERO,
            fees_charged,
            execute_after: now,
            last_fees_charged_management: now,
            last_fees_charged_performance: now,
            accepted: false,
            status: ProposalStatus::Executed,
            proposed_at: now,
        }
    }

    #[test]
    fn first_use_creates_batch_zero() {
        let (mut ledger, vault) = registered();
        ledger
            .record_deposit(vault, "USDC", Decimal::new(100, 0), Utc::now())
            .unwrap();
        let batch = ledger.current_batch(vault, "USDC").unwrap();
        assert_eq!(batch.id, BatchId(0));
        assert_eq!(batch.deposited, Decimal::new(100, 0));
    }

    #[test]
    fn close_creates_successor() {
        let (mut ledger, vault) = registered();
        ledger
            .record_deposit(vault, "USDC", Decimal::new(100, 0), Utc::now())
            .unwrap();
        let closed = ledger.close_batch(vault, "USDC", true, Utc::now()).unwrap();
        assert_eq!(closed, BatchId(0));

        let head = ledger.current_batch(vault, "USDC").unwrap();
        assert_eq!(head.id, BatchId(1));
        assert!(head.is_open());
    }

    #[test]
    fn reclose_fails_with_state_error() {
        let (mut ledger, vault) = registered();
        ledger.close_batch(vault, "USDC", false, Utc::now()).unwrap();
        let err = ledger.close_batch(vault, "USDC", false, Utc::now()).unwrap_err();
        assert!(matches!(err, OpenvaultError::BatchAlreadyClosed(BatchId(0))));
    }

    #[test]
    fn requests_after_close_land_in_next_batch() {
        let (mut ledger, vault) = registered();
        ledger.close_batch(vault, "USDC", false, Utc::now()).unwrap();
        ledger
            .record_deposit(vault, "USDC", Decimal::new(50, 0), Utc::now())
            .unwrap();
        let head = ledger.current_batch(vault, "USDC").unwrap();
        assert_eq!(head.id, BatchId(1));
        assert_eq!(head.deposited, Decimal::new(50, 0));
    }

    #[test]
    fn apply_settlement_mints_and_reprices() {
        let (mut ledger, vault) = registered();
        ledger
            .record_deposit(vault, "USDC", Decimal::new(100, 0), Utc::now())
            .unwrap();
        ledger.close_batch(vault, "USDC", true, Utc::now()).unwrap();

        // 100 deposited at price 1.0 => 100 shares minted; position reports 100.
        let proposal = proposal_for(vault, BatchId(0), Decimal::new(100, 0), Decimal::ZERO);
        ledger.apply_settlement(&proposal).unwrap();

        assert_eq!(ledger.total_supply(vault).unwrap(), Decimal::new(100, 0));
        assert_eq!(ledger.total_assets(vault).unwrap(), Decimal::new(100, 0));
        assert_eq!(ledger.net_share_price(vault).unwrap(), scale());

        let batch = ledger.batch(vault, "USDC", BatchId(0)).unwrap();
        assert!(batch.is_settled);
        assert_eq!(batch.net_share_price, scale());
    }

    #[test]
    fn resettle_fails_with_state_error() {
        let (mut ledger, vault) = registered();
        ledger
            .record_deposit(vault, "USDC", Decimal::new(100, 0), Utc::now())
            .unwrap();
        ledger.close_batch(vault, "USDC", true, Utc::now()).unwrap();

        let proposal = proposal_for(vault, BatchId(0), Decimal::new(100, 0), Decimal::ZERO);
        ledger.apply_settlement(&proposal).unwrap();
        let err = ledger.apply_settlement(&proposal).unwrap_err();
        assert!(matches!(err, OpenvaultError::BatchAlreadySettled(BatchId(0))));
    }

    #[test]
    fn settle_open_batch_fails() {
        let (mut ledger, vault) = registered();
        ledger
            .record_deposit(vault, "USDC", Decimal::new(100, 0), Utc::now())
            .unwrap();
        let proposal = proposal_for(vault, BatchId(0), Decimal::new(100, 0), Decimal::ZERO);
        let err = ledger.apply_settlement(&proposal).unwrap_err();
        assert!(matches!(err, OpenvaultError::BatchNotClosed(BatchId(0))));
    }

    #[test]
    fn fees_widen_gross_over_net_and_raise_watermark() {
        let (mut ledger, vault) = registered();
        let start = Utc::now();
        ledger
            .set_fee_state(vault, FeeState::new(200, 2_000, 0, false, scale(), start).unwrap())
            .unwrap();
        ledger.bootstrap_supply(vault, Decimal::new(100, 0), Decimal::new(100, 0)).unwrap();
        ledger.close_batch(vault, "USDC", true, start).unwrap();

        // Position grew to 120 after 10 of fees were skimmed.
        let proposal = proposal_for(vault, BatchId(0), Decimal::new(120, 0), Decimal::new(10, 0));
        ledger.apply_settlement(&proposal).unwrap();

        let net = ledger.net_share_price(vault).unwrap();
        let gross = ledger.gross_share_price(vault).unwrap();
        assert!(gross > net);
        assert_eq!(ledger.fee_state(vault).unwrap().share_price_watermark, net);
    }

    #[test]
    fn fee_state_missing_for_institutional() {
        let (ledger, vault) = registered();
        let err = ledger.fee_state(vault).unwrap_err();
        assert!(matches!(err, OpenvaultError::FeeStateMissing(_)));
    }

    #[test]
    fn custody_book_defaults_to_zero_and_resyncs() {
        let (mut ledger, vault) = registered();
        assert_eq!(ledger.custody_assets(vault, "USDC").unwrap(), Decimal::ZERO);
        ledger
            .set_custody_assets(vault, "USDC", Decimal::new(1200, 0))
            .unwrap();
        assert_eq!(
            ledger.custody_assets(vault, "USDC").unwrap(),
            Decimal::new(1200, 0)
        );
    }
}
