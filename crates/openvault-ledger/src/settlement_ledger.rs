//! Settlement ledger — the proposal store and its cooldown state machine.
//!
//! The coordinator submits drafts; this ledger stamps the cooldown
//! deadline, enforces one pending proposal per batch, and gates execution:
//! before `execute_after` the attempt fails deterministically, and when
//! guardian acceptance is required an unaccepted proposal cannot execute.
//! A pending proposal may be cancelled at any time before execution, never
//! after.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use openvault_types::{
    Asset, BatchId, EngineConfig, OpenvaultError, ProposalId, ProposalStatus, Result,
    SettlementProposal, VaultId,
};

/// In-memory settlement ledger.
#[derive(Debug, Clone)]
pub struct SettlementLedger {
    config: EngineConfig,
    proposals: HashMap<ProposalId, SettlementProposal>,
    /// Batches with a live pending proposal — the duplicate-proposal guard.
    pending_batches: HashSet<(VaultId, Asset, BatchId)>,
}

impl SettlementLedger {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            proposals: HashMap::new(),
            pending_batches: HashSet::new(),
        }
    }

    /// The engine config this ledger enforces.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Pre-validation hook for the coordinator: fails if the batch already
    /// has a pending proposal, without mutating anything.
    pub fn ensure_no_pending(&self, vault: VaultId, asset: &str, batch_id: BatchId) -> Result<()> {
        if self
            .pending_batches
            .contains(&(vault, asset.to_string(), batch_id))
        {
            return Err(OpenvaultError::ProposalPendingExists {
                vault,
                asset: asset.to_string(),
                batch_id,
            });
        }
        Ok(())
    }

    /// Submit a proposal draft. The ledger stamps submission time, the
    /// cooldown deadline, and the pending status.
    ///
    /// Re-driving a cancelled batch supersedes the cancelled record under
    /// the batch's deterministic id; an executed record is immutable.
    ///
    /// # Errors
    /// - [`OpenvaultError::ProposalPendingExists`] if the batch already has
    ///   a pending proposal
    /// - [`OpenvaultError::ProposalAlreadyExecuted`] if the id belongs to
    ///   an executed proposal
    pub fn submit(
        &mut self,
        mut proposal: SettlementProposal,
        now: DateTime<Utc>,
    ) -> Result<ProposalId> {
        self.ensure_no_pending(proposal.vault, &proposal.asset, proposal.batch_id)?;
        if let Some(existing) = self.proposals.get(&proposal.id) {
            if existing.status == ProposalStatus::Executed {
                return Err(OpenvaultError::ProposalAlreadyExecuted(proposal.id));
            }
        }

        proposal.proposed_at = now;
        proposal.execute_after = now + self.config.cooldown();
        proposal.accepted = false;
        proposal.status = ProposalStatus::Pending;

        let id = proposal.id;
        self.pending_batches
            .insert((proposal.vault, proposal.asset.clone(), proposal.batch_id));
        self.proposals.insert(id, proposal);
        Ok(id)
    }

    /// Read a proposal.
    pub fn proposal(&self, id: ProposalId) -> Result<&SettlementProposal> {
        self.proposals
            .get(&id)
            .ok_or(OpenvaultError::ProposalNotFound(id))
    }

    /// Whether the proposal's batch net was negative.
    pub fn is_netting_negative(&self, id: ProposalId) -> Result<bool> {
        Ok(self.proposal(id)?.is_netting_negative())
    }

    /// Guardian acceptance. Only a pending proposal can be accepted.
    pub fn accept(&mut self, id: ProposalId) -> Result<()> {
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(OpenvaultError::ProposalNotFound(id))?;
        match proposal.status {
            ProposalStatus::Executed => Err(OpenvaultError::ProposalAlreadyExecuted(id)),
            ProposalStatus::Cancelled => Err(OpenvaultError::ProposalCancelled(id)),
            ProposalStatus::Pending => {
                proposal.accepted = true;
                Ok(())
            }
        }
    }

    /// Cancel a pending proposal. Terminal; execution is no longer possible.
    pub fn cancel(&mut self, id: ProposalId) -> Result<()> {
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(OpenvaultError::ProposalNotFound(id))?;
        match proposal.status {
            ProposalStatus::Executed => Err(OpenvaultError::ProposalAlreadyExecuted(id)),
            ProposalStatus::Cancelled => Err(OpenvaultError::ProposalCancelled(id)),
            ProposalStatus::Pending => {
                proposal.status = ProposalStatus::Cancelled;
                self.pending_batches.remove(&(
                    proposal.vault,
                    proposal.asset.clone(),
                    proposal.batch_id,
                ));
                tracing::warn!(proposal = %id, "Settlement proposal cancelled");
                Ok(())
            }
        }
    }

    /// Execute a pending proposal: cooldown elapsed, acceptance satisfied.
    /// Returns the executed proposal for the downstream ledger to apply.
    ///
    /// # Errors
    /// - [`OpenvaultError::CooldownActive`] before the deadline (no retry;
    ///   the relayer re-invokes later)
    /// - [`OpenvaultError::ProposalNotAccepted`] when acceptance is required
    /// - state errors for executed/cancelled proposals
    pub fn execute(&mut self, id: ProposalId, now: DateTime<Utc>) -> Result<SettlementProposal> {
        let require_acceptance = self.config.require_acceptance;
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(OpenvaultError::ProposalNotFound(id))?;
        match proposal.status {
            ProposalStatus::Executed => return Err(OpenvaultError::ProposalAlreadyExecuted(id)),
            ProposalStatus::Cancelled => return Err(OpenvaultError::ProposalCancelled(id)),
            ProposalStatus::Pending => {}
        }
        if now < proposal.execute_after {
            return Err(OpenvaultError::CooldownActive {
                execute_after: proposal.execute_after,
            });
        }
        if require_acceptance && !proposal.accepted {
            return Err(OpenvaultError::ProposalNotAccepted(id));
        }

        proposal.status = ProposalStatus::Executed;
        let executed = proposal.clone();
        self.pending_batches.remove(&(
            executed.vault,
            executed.asset.clone(),
            executed.batch_id,
        ));
        Ok(executed)
    }

    /// Number of proposals tracked (any status).
    #[must_use]
    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }
}
