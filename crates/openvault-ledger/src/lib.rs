//! # openvault-ledger
//!
//! **Stateful collaborators** of the OpenVault settlement engine.
//!
//! The coordinator treats these as external systems; here they are
//! deterministic in-memory engines so the full settlement lifecycle can run
//! and be tested end to end:
//!
//! - [`PositionLedger`] — external yield venues: pro-rata share accounting,
//!   deposits, two-step redemptions, transfers, yield accrual
//! - [`Registry`] — adapter routes per (vault, asset), settlement config,
//!   vault-by-type lookup
//! - [`VaultLedger`] — batches, fee states, token supply and share prices;
//!   applies executed settlement proposals
//! - [`SettlementLedger`] — proposal store owning the cooldown and
//!   acceptance state machine
//! - [`PlanExecutor`] — all-or-nothing execution of command plans against
//!   the position ledger

pub mod executor;
pub mod positions;
pub mod registry;
pub mod settlement_ledger;
pub mod vault_ledger;

pub use executor::PlanExecutor;
pub use positions::PositionLedger;
pub use registry::{AdapterRoute, Registry};
pub use settlement_ledger::SettlementLedger;
pub use vault_ledger::VaultLedger;
