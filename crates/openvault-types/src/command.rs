//! Command descriptors for external-call batches.
//!
//! The coordinator never calls a venue directly. It assembles an
//! [`ExecutionPlan`] — ordered `(venue, payload)` descriptors — and submits
//! the plan as one atomic unit; the executor returns ordered
//! [`CommandReceipt`]s or rolls the whole plan back. Two-step protocols
//! (request-then-execute redemption) are two ordered commands in the same
//! plan, never two plans.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, Asset};

/// What a single external call does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Deposit assets into the venue, minting shares to `holder`.
    Deposit { holder: AccountId, assets: Decimal },
    /// First half of the redemption protocol: reserve `assets` worth of
    /// `holder`'s shares for withdrawal.
    RequestRedeem { holder: AccountId, assets: Decimal },
    /// Second half: burn the reserved shares and release the assets.
    ExecuteRedeem { holder: AccountId },
    /// Move shares between two holders inside the venue.
    TransferShares {
        from: AccountId,
        to: AccountId,
        shares: Decimal,
    },
}

/// One ordered external call: which venue, and what to do there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// The venue (asset) this call targets.
    pub venue: Asset,
    /// The operation to perform.
    pub kind: CommandKind,
}

impl Command {
    #[must_use]
    pub fn new(venue: impl Into<Asset>, kind: CommandKind) -> Self {
        Self {
            venue: venue.into(),
            kind,
        }
    }
}

/// An ordered batch of external calls submitted as one atomic unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Commands in execution order.
    pub commands: Vec<Command>,
}

impl ExecutionPlan {
    #[must_use]
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    /// A plan with no commands (a no-op settlement leg).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a command, preserving order.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }
}

/// The observed effect of one executed command, in plan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandReceipt {
    /// Shares minted by a deposit.
    Deposited { shares_minted: Decimal },
    /// Shares reserved by a redemption request.
    RedeemRequested { shares_reserved: Decimal },
    /// Assets released by an executed redemption.
    Redeemed { assets_out: Decimal },
    /// Shares moved by a transfer.
    Transferred { shares: Decimal },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_preserves_order() {
        let holder = AccountId::from_bytes([1u8; 32]);
        let mut plan = ExecutionPlan::empty();
        plan.push(Command::new(
            "USDC",
            CommandKind::RequestRedeem {
                holder,
                assets: Decimal::new(50, 0),
            },
        ));
        plan.push(Command::new("USDC", CommandKind::ExecuteRedeem { holder }));

        assert_eq!(plan.len(), 2);
        assert!(matches!(
            plan.commands[0].kind,
            CommandKind::RequestRedeem { .. }
        ));
        assert!(matches!(
            plan.commands[1].kind,
            CommandKind::ExecuteRedeem { .. }
        ));
    }

    #[test]
    fn empty_plan() {
        let plan = ExecutionPlan::empty();
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
    }

    #[test]
    fn command_serde_roundtrip() {
        let cmd = Command::new(
            "TBILL",
            CommandKind::TransferShares {
                from: AccountId::from_bytes([1u8; 32]),
                to: AccountId::from_bytes([2u8; 32]),
                shares: Decimal::new(42, 0),
            },
        );
        let json = serde_json::to_string(&cmd).unwrap();
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }
}
