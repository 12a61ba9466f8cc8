//! Atomic command executor.
//!
//! Executes an [`ExecutionPlan`] against the position ledger as one
//! all-or-nothing unit: if any command fails, the ledger is restored to its
//! pre-plan state and the error propagates. On success the ordered
//! [`CommandReceipt`]s describe what each command observed.
//!
//! The host environments this engine models get that atomicity for free
//! from the surrounding transaction; here it is reproduced explicitly with
//! a snapshot-and-restore around the plan.

use openvault_types::{Command, CommandKind, CommandReceipt, ExecutionPlan, Result};

use crate::positions::PositionLedger;

/// Executes command plans atomically against a [`PositionLedger`].
pub struct PlanExecutor;

impl PlanExecutor {
    /// Run every command in order; commit only if all succeed.
    ///
    /// # Errors
    /// Propagates the first command failure, with the ledger rolled back to
    /// its state before the plan started.
    pub fn execute(
        positions: &mut PositionLedger,
        plan: &ExecutionPlan,
    ) -> Result<Vec<CommandReceipt>> {
        if plan.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = positions.clone();
        match Self::apply_all(positions, plan) {
            Ok(receipts) => {
                tracing::info!(commands = plan.len(), "Execution plan committed");
                Ok(receipts)
            }
            Err(err) => {
                *positions = snapshot;
                Err(err)
            }
        }
    }

    fn apply_all(
        positions: &mut PositionLedger,
        plan: &ExecutionPlan,
    ) -> Result<Vec<CommandReceipt>> {
        let mut receipts = Vec::with_capacity(plan.len());
        for command in &plan.commands {
            receipts.push(Self::apply(positions, command)?);
        }
        Ok(receipts)
    }

    fn apply(positions: &mut PositionLedger, command: &Command) -> Result<CommandReceipt> {
        match command.kind {
            CommandKind::Deposit { holder, assets } => {
                let shares_minted = positions.deposit(&command.venue, holder, assets)?;
                Ok(CommandReceipt::Deposited { shares_minted })
            }
            CommandKind::RequestRedeem { holder, assets } => {
                let shares_reserved = positions.request_redeem(&command.venue, holder, assets)?;
                Ok(CommandReceipt::RedeemRequested { shares_reserved })
            }
            CommandKind::ExecuteRedeem { holder } => {
                let assets_out = positions.execute_redeem(&command.venue, holder)?;
                Ok(CommandReceipt::Redeemed { assets_out })
            }
            CommandKind::TransferShares { from, to, shares } => {
                positions.transfer_shares(&command.venue, from, to, shares)?;
                Ok(CommandReceipt::Transferred { shares })
            }
        }
    }
}
