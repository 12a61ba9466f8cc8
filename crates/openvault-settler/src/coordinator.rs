//! Settlement coordinator — the per-asset batch lifecycle, end to end.
//!
//! Entry points are capability-gated: relayers drive workflows, guardians
//! accept or cancel proposals, admins grant roles. Collaborators are passed
//! in per call, so the coordinator composes narrow components instead of
//! owning the world.
//!
//! Every operation follows the same discipline:
//! 1. **Validate** — authorization, vault family, batch state, config —
//!    before anything observable happens
//! 2. **Read and thread** — batch figures, prices, and pool totals are read
//!    once and threaded forward, never re-read mid-flow (the one exception
//!    is the custodial post-transfer balance assertion)
//! 3. **Execute** — all external calls go through one atomic command plan
//! 4. **Commit** — ledger mutations (close, submit, book sync) happen last,
//!    after the plan cannot fail

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use openvault_ledger::{PlanExecutor, PositionLedger, Registry, SettlementLedger, VaultLedger};
use openvault_mathcore::{
    NetDirection, accrued_fees, distribute_profit, insurance_deficit, into_position_assets,
    loss_recovery_shares, net_flow, out_of_position_assets, requested_to_assets,
    shares_for_assets_ceil, shares_to_assets_floor,
};
use openvault_types::{
    AccountId, AuthContext, BatchId, Command, CommandKind, ExecutionPlan, FeeBreakdown,
    OpenvaultError, ProposalId, ProposalStatus, Result, Role, SettlementProposal, VaultId,
    VaultType, constants,
};

/// What a close-and-propose entry point produced.
///
/// A perfectly netted institutional batch closes without a proposal; the
/// sentinel is a distinct variant, never a reserved id value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// A proposal was submitted and now waits out its cooldown.
    Proposed(ProposalId),
    /// The batch netted to zero: closed, nothing to settle.
    NoNetting(BatchId),
}

impl SettlementOutcome {
    /// The proposal id, if one was submitted.
    #[must_use]
    pub fn proposal_id(&self) -> Option<ProposalId> {
        match self {
            Self::Proposed(id) => Some(*id),
            Self::NoNetting(_) => None,
        }
    }
}

/// Orchestrates batch settlement across the registry, vault ledger,
/// settlement ledger, and external positions.
pub struct SettlementCoordinator {
    /// Role table: which accounts hold which capabilities.
    roles: HashMap<AccountId, HashSet<Role>>,
}

impl SettlementCoordinator {
    /// Create a coordinator with `admin` holding the Admin role.
    #[must_use]
    pub fn new(admin: AccountId) -> Self {
        let mut roles: HashMap<AccountId, HashSet<Role>> = HashMap::new();
        roles.entry(admin).or_default().insert(Role::Admin);
        Self { roles }
    }

    // -----------------------------------------------------------------
    // Authorization
    // -----------------------------------------------------------------

    fn require(&self, ctx: &AuthContext, required: Role) -> Result<()> {
        let held = self
            .roles
            .get(&ctx.actor)
            .is_some_and(|roles| roles.contains(&required));
        if held {
            Ok(())
        } else {
            Err(OpenvaultError::NotAuthorized {
                actor: ctx.actor,
                required,
            })
        }
    }

    /// Whether an account holds a role.
    #[must_use]
    pub fn has_role(&self, account: AccountId, role: Role) -> bool {
        self.roles
            .get(&account)
            .is_some_and(|roles| roles.contains(&role))
    }

    /// Grant a role. Admin only.
    pub fn grant_role(&mut self, ctx: &AuthContext, account: AccountId, role: Role) -> Result<()> {
        self.require(ctx, Role::Admin)?;
        if account.is_zero() {
            return Err(OpenvaultError::AccountRequired { field: "grantee" });
        }
        self.roles.entry(account).or_default().insert(role);
        Ok(())
    }

    /// Revoke a role. Admin only.
    pub fn revoke_role(&mut self, ctx: &AuthContext, account: AccountId, role: Role) -> Result<()> {
        self.require(ctx, Role::Admin)?;
        if let Some(roles) = self.roles.get_mut(&account) {
            roles.remove(&role);
        }
        Ok(())
    }

    fn require_vault_type(registry: &Registry, vault: VaultId, required: VaultType) -> Result<()> {
        if registry.vault_type(vault)? == required {
            Ok(())
        } else {
            Err(OpenvaultError::WrongVaultType { vault, required })
        }
    }

    // -----------------------------------------------------------------
    // Batch close
    // -----------------------------------------------------------------

    /// Close the open batch for a (vault, asset) without settling it.
    /// Re-closing fails with the state error.
    pub fn close_batch(
        &self,
        ctx: &AuthContext,
        vaults: &mut VaultLedger,
        vault: VaultId,
        asset: &str,
        now: DateTime<Utc>,
    ) -> Result<BatchId> {
        self.require(ctx, Role::Relayer)?;
        vaults.close_batch(vault, asset, true, now)
    }

    // -----------------------------------------------------------------
    // Institutional settlement (combined synchronous flow)
    // -----------------------------------------------------------------

    /// Close an institutional batch, net its flows, drive the venue
    /// deposit or two-step redemption, and propose.
    ///
    /// A zero net closes the batch and returns the
    /// [`SettlementOutcome::NoNetting`] sentinel instead of a proposal.
    #[allow(clippy::too_many_arguments)]
    pub fn settle_institutional(
        &self,
        ctx: &AuthContext,
        registry: &Registry,
        vaults: &mut VaultLedger,
        settlements: &mut SettlementLedger,
        positions: &mut PositionLedger,
        vault: VaultId,
        asset: &str,
        now: DateTime<Utc>,
    ) -> Result<SettlementOutcome> {
        self.require(ctx, Role::Relayer)?;
        Self::require_vault_type(registry, vault, VaultType::Institutional)?;
        let route = registry.route(vault, asset)?.clone();

        let (batch_id, netted) = Self::read_open_batch_net(vaults, vault, asset)?;
        settlements.ensure_no_pending(vault, asset, batch_id)?;

        if netted.is_zero() {
            vaults.close_batch(vault, asset, true, now)?;
            return Ok(SettlementOutcome::NoNetting(batch_id));
        }

        let plan = if netted > Decimal::ZERO {
            ExecutionPlan::new(vec![Command::new(
                route.venue.clone(),
                CommandKind::Deposit {
                    holder: route.ledger_adapter,
                    assets: into_position_assets(netted)?,
                },
            )])
        } else {
            // Two-step venue redemption: both halves in one atomic plan.
            ExecutionPlan::new(vec![
                Command::new(
                    route.venue.clone(),
                    CommandKind::RequestRedeem {
                        holder: route.ledger_adapter,
                        assets: out_of_position_assets(netted)?,
                    },
                ),
                Command::new(
                    route.venue.clone(),
                    CommandKind::ExecuteRedeem {
                        holder: route.ledger_adapter,
                    },
                ),
            ])
        };
        PlanExecutor::execute(positions, &plan)?;

        // Always read, never derive: the venue answers what custody holds.
        let total_assets = positions.assets_of(&route.venue, route.ledger_adapter)?;

        vaults.close_batch(vault, asset, true, now)?;
        vaults.set_custody_assets(vault, asset, total_assets)?;
        let draft = Self::draft(
            vault,
            asset,
            batch_id,
            total_assets,
            netted,
            Decimal::ZERO,
            FeeBreakdown::zero(),
            now,
            now,
        );
        let proposal_id = settlements.submit(draft, now)?;

        tracing::info!(
            vault = %vault,
            asset = asset,
            batch = %batch_id,
            netted = %netted,
            total_assets = %total_assets,
            "Institutional settlement proposed"
        );
        Ok(SettlementOutcome::Proposed(proposal_id))
    }

    /// Finalize a custodial settlement: the custodian has already moved the
    /// batch's assets out of band, so no commands are driven. The one
    /// deliberate re-read in the engine happens here — the post-transfer
    /// balance assertion against the expected minimum.
    #[allow(clippy::too_many_arguments)]
    pub fn finalize_custodial(
        &self,
        ctx: &AuthContext,
        registry: &Registry,
        vaults: &mut VaultLedger,
        settlements: &mut SettlementLedger,
        positions: &PositionLedger,
        vault: VaultId,
        asset: &str,
        expected_minimum: Decimal,
        now: DateTime<Utc>,
    ) -> Result<SettlementOutcome> {
        self.require(ctx, Role::Relayer)?;
        Self::require_vault_type(registry, vault, VaultType::Institutional)?;
        let route = registry.route(vault, asset)?.clone();

        let (batch_id, netted) = Self::read_open_batch_net(vaults, vault, asset)?;
        settlements.ensure_no_pending(vault, asset, batch_id)?;

        let actual = positions.assets_of(&route.venue, route.ledger_adapter)?;
        if actual < expected_minimum {
            return Err(OpenvaultError::ResourceShortfall {
                expected: expected_minimum,
                actual,
            });
        }

        vaults.close_batch(vault, asset, true, now)?;
        vaults.set_custody_assets(vault, asset, actual)?;
        let draft = Self::draft(
            vault,
            asset,
            batch_id,
            actual,
            netted,
            Decimal::ZERO,
            FeeBreakdown::zero(),
            now,
            now,
        );
        let proposal_id = settlements.submit(draft, now)?;

        tracing::info!(
            vault = %vault,
            asset = asset,
            batch = %batch_id,
            total_assets = %actual,
            "Custodial settlement finalized"
        );
        Ok(SettlementOutcome::Proposed(proposal_id))
    }

    // -----------------------------------------------------------------
    // Yield-bearing vault settlement
    // -----------------------------------------------------------------

    /// Close a yield vault's batch and settle it: reconcile the depeg
    /// (loss recovery or profit cascade), charge accrued fees, net the
    /// batch against the now-current position, and propose.
    ///
    /// `profit_share_bps` is the caller-chosen slice of residual profit
    /// routed to the vault adapter.
    #[allow(clippy::too_many_arguments)]
    pub fn settle_vault_batch(
        &self,
        ctx: &AuthContext,
        registry: &Registry,
        vaults: &mut VaultLedger,
        settlements: &mut SettlementLedger,
        positions: &mut PositionLedger,
        vault: VaultId,
        asset: &str,
        profit_share_bps: u64,
        now: DateTime<Utc>,
    ) -> Result<SettlementOutcome> {
        self.require(ctx, Role::Relayer)?;
        if profit_share_bps > constants::BPS_DENOMINATOR {
            return Err(OpenvaultError::ProfitShareTooLarge {
                bps: profit_share_bps,
            });
        }
        Self::require_vault_type(registry, vault, VaultType::YieldBearing)?;
        let route = registry.route(vault, asset)?.clone();
        let config = registry.settlement_config(vault)?.clone();
        config.validate()?;

        let (batch_id, netted) = Self::read_open_batch_net(vaults, vault, asset)?;
        settlements.ensure_no_pending(vault, asset, batch_id)?;

        let fee_state = vaults.fee_state(vault)?.clone();
        let supply = vaults.total_supply(vault)?;
        let scale = vaults.price_scale(vault)?;

        // Depeg: the mint/redeem ledger's custody expectation against what
        // the venue actually reports. Positive means the custody position
        // fell short (loss); negative means surplus (profit).
        let expected = vaults.custody_assets(vault, asset)?;
        let actual = positions.assets_of(&route.venue, route.ledger_adapter)?;
        let depeg = expected - actual;
        let yield_delta = -depeg;
        let (pool_assets, pool_shares) = positions.pool(&route.venue)?;

        let mut plan = ExecutionPlan::empty();
        // Vault adapter holdings threaded through the flow: share transfers
        // never move the pool rate, so arithmetic on the snapshot is exact.
        let mut vault_shares = positions.balance_of(&route.venue, route.vault_adapter)?;

        if depeg > Decimal::ZERO {
            // Loss: one ceiling-rounded recovery transfer restores parity,
            // executed before any fee computation.
            let recovery = loss_recovery_shares(depeg, pool_assets, pool_shares)?;
            plan.push(Command::new(
                route.venue.clone(),
                CommandKind::TransferShares {
                    from: route.vault_adapter,
                    to: route.ledger_adapter,
                    shares: recovery,
                },
            ));
            vault_shares -= recovery;
        } else if depeg < Decimal::ZERO {
            let profit = -depeg;
            let profit_shares = shares_for_assets_ceil(profit, pool_assets, pool_shares)?;
            let insurance_assets = if config.insurance.is_zero() {
                Decimal::ZERO
            } else {
                positions.assets_of(&route.venue, config.insurance)?
            };
            let deficit_assets =
                insurance_deficit(config.insurance_bps, expected, insurance_assets);
            let deficit_shares = shares_for_assets_ceil(deficit_assets, pool_assets, pool_shares)?;
            let split = distribute_profit(
                profit_shares,
                deficit_shares,
                config.treasury_bps,
                profit_share_bps,
                !supply.is_zero(),
            )?;

            for (to, shares) in [
                (config.insurance, split.insurance_shares),
                (config.treasury, split.treasury_shares),
                (route.vault_adapter, split.vault_adapter_shares),
            ] {
                if !shares.is_zero() {
                    plan.push(Command::new(
                        route.venue.clone(),
                        CommandKind::TransferShares {
                            from: route.ledger_adapter,
                            to,
                            shares,
                        },
                    ));
                }
            }
            vault_shares += split.vault_adapter_shares;
        }

        // Fees accrue on the vault's own backing, post-reconciliation.
        let elapsed_management = (now - fee_state.last_charged_management).num_seconds();
        let elapsed_performance = (now - fee_state.last_charged_performance).num_seconds();
        let vault_assets = shares_to_assets_floor(vault_shares, pool_assets, pool_shares);
        let (fees, management_at, performance_at) =
            if elapsed_management > 0 || elapsed_performance > 0 {
                let fees = accrued_fees(&fee_state, vault_assets, supply, scale, now);
                (fees, now, now)
            } else {
                (
                    FeeBreakdown::zero(),
                    fee_state.last_charged_management,
                    fee_state.last_charged_performance,
                )
            };
        if !fees.is_zero() {
            if config.treasury.is_zero() {
                return Err(OpenvaultError::AccountRequired { field: "treasury" });
            }
            let fee_shares = shares_for_assets_ceil(fees.total(), pool_assets, pool_shares)?;
            plan.push(Command::new(
                route.venue.clone(),
                CommandKind::TransferShares {
                    from: route.vault_adapter,
                    to: config.treasury,
                    shares: fee_shares,
                },
            ));
        }

        // Final netting against the now-current position.
        if !netted.is_zero() {
            let netting_shares = shares_for_assets_ceil(netted.abs(), pool_assets, pool_shares)?;
            let (from, to) = match NetDirection::of(netted) {
                NetDirection::IntoPosition => (route.ledger_adapter, route.vault_adapter),
                NetDirection::OutOfPosition => (route.vault_adapter, route.ledger_adapter),
                NetDirection::Flat => unreachable!("zero net handled above"),
            };
            plan.push(Command::new(
                route.venue.clone(),
                CommandKind::TransferShares {
                    from,
                    to,
                    shares: netting_shares,
                },
            ));
        }

        PlanExecutor::execute(positions, &plan)?;

        // Post-plan reads, never derivations.
        let new_total_assets = positions.assets_of(&route.venue, route.vault_adapter)?;
        let custody_now = positions.assets_of(&route.venue, route.ledger_adapter)?;

        vaults.close_batch(vault, asset, true, now)?;
        vaults.set_custody_assets(vault, asset, custody_now)?;
        let draft = Self::draft(
            vault,
            asset,
            batch_id,
            new_total_assets,
            netted,
            yield_delta,
            fees,
            management_at,
            performance_at,
        );
        let proposal_id = settlements.submit(draft, now)?;

        tracing::info!(
            vault = %vault,
            asset = asset,
            batch = %batch_id,
            netted = %netted,
            yield_delta = %yield_delta,
            fees = %fees.total(),
            total_assets = %new_total_assets,
            "Vault settlement proposed"
        );
        Ok(SettlementOutcome::Proposed(proposal_id))
    }

    // -----------------------------------------------------------------
    // Proposal driving
    // -----------------------------------------------------------------

    /// Execute a proposal past its cooldown and apply it downstream: batch
    /// settled once, supply and share prices adjusted, watermark raised.
    pub fn execute_settlement(
        &self,
        ctx: &AuthContext,
        vaults: &mut VaultLedger,
        settlements: &mut SettlementLedger,
        proposal_id: ProposalId,
        now: DateTime<Utc>,
    ) -> Result<SettlementProposal> {
        self.require(ctx, Role::Relayer)?;

        // Pre-validate the downstream application so ledger execution can
        // never strand a half-applied proposal.
        let pending = settlements.proposal(proposal_id)?;
        if pending.status == ProposalStatus::Pending {
            let batch = vaults.batch(pending.vault, &pending.asset, pending.batch_id)?;
            if !batch.is_closed {
                return Err(OpenvaultError::BatchNotClosed(batch.id));
            }
            if batch.is_settled {
                return Err(OpenvaultError::BatchAlreadySettled(batch.id));
            }
        }

        let executed = settlements.execute(proposal_id, now)?;
        vaults.apply_settlement(&executed)?;

        tracing::info!(
            proposal = %proposal_id,
            vault = %executed.vault,
            batch = %executed.batch_id,
            "Settlement executed"
        );
        Ok(executed)
    }

    /// Guardian acceptance of a pending proposal.
    pub fn accept_proposal(
        &self,
        ctx: &AuthContext,
        settlements: &mut SettlementLedger,
        proposal_id: ProposalId,
    ) -> Result<()> {
        self.require(ctx, Role::Guardian)?;
        settlements.accept(proposal_id)
    }

    /// Guardian cancellation: any time before execution, never after.
    pub fn cancel_proposal(
        &self,
        ctx: &AuthContext,
        settlements: &mut SettlementLedger,
        proposal_id: ProposalId,
    ) -> Result<()> {
        self.require(ctx, Role::Guardian)?;
        settlements.cancel(proposal_id)
    }

    /// Whether a proposal's net was negative. Open query, no capability.
    pub fn is_settlement_negative(
        &self,
        settlements: &SettlementLedger,
        proposal_id: ProposalId,
    ) -> Result<bool> {
        settlements.is_netting_negative(proposal_id)
    }

    /// Quote the fees a vault settlement would charge right now. Open
    /// query; the same pure function runs before commit.
    pub fn quote_fees(
        &self,
        registry: &Registry,
        vaults: &VaultLedger,
        positions: &PositionLedger,
        vault: VaultId,
        asset: &str,
        now: DateTime<Utc>,
    ) -> Result<FeeBreakdown> {
        let route = registry.route(vault, asset)?;
        let fee_state = vaults.fee_state(vault)?;
        let total_assets = positions.assets_of(&route.venue, route.vault_adapter)?;
        let supply = vaults.total_supply(vault)?;
        let scale = vaults.price_scale(vault)?;
        Ok(accrued_fees(fee_state, total_assets, supply, scale, now))
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// Read the open batch's id and exact signed net, converting pending
    /// redemption shares at the current net share price.
    fn read_open_batch_net(
        vaults: &VaultLedger,
        vault: VaultId,
        asset: &str,
    ) -> Result<(BatchId, Decimal)> {
        let batch = vaults.current_batch(vault, asset)?;
        if batch.is_closed {
            return Err(OpenvaultError::BatchAlreadyClosed(batch.id));
        }
        let net_price = vaults.net_share_price(vault)?;
        let scale = vaults.price_scale(vault)?;
        let requested_assets = requested_to_assets(batch.requested, net_price, scale);
        Ok((batch.id, net_flow(batch.deposited, requested_assets)))
    }

    #[allow(clippy::too_many_arguments)]
    fn draft(
        vault: VaultId,
        asset: &str,
        batch_id: BatchId,
        total_assets: Decimal,
        netted: Decimal,
        yield_delta: Decimal,
        fees: FeeBreakdown,
        management_at: DateTime<Utc>,
        performance_at: DateTime<Utc>,
    ) -> SettlementProposal {
        // The ledger stamps proposed_at/execute_after on submission.
        SettlementProposal {
            id: ProposalId::deterministic(vault, asset, batch_id),
            vault,
            asset: asset.to_string(),
            batch_id,
            total_assets,
            netted,
            yield_delta,
            fees_charged: fees.total(),
            execute_after: management_at,
            last_fees_charged_management: management_at,
            last_fees_charged_performance: performance_at,
            accepted: false,
            status: ProposalStatus::Pending,
            proposed_at: management_at,
        }
    }
}
