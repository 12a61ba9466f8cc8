//! # openvault-types
//!
//! Shared types, errors, and configuration for the **OpenVault** settlement
//! engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`VaultId`], [`BatchId`], [`ProposalId`], [`AccountId`], [`Asset`]
//! - **Batch model**: [`Batch`] with its one-way close/settle transitions
//! - **Proposal model**: [`SettlementProposal`], [`ProposalStatus`]
//! - **Fee model**: [`FeeState`], [`FeeBreakdown`]
//! - **Command model**: [`Command`], [`ExecutionPlan`], [`CommandReceipt`]
//! - **Authorization**: [`Role`], [`AuthContext`]
//! - **Configuration**: [`EngineConfig`], [`SettlementConfig`], [`VaultType`]
//! - **Errors**: [`OpenvaultError`] with `OV_ERR_` prefix codes
//! - **Constants**: system-wide denominators and defaults

pub mod auth;
pub mod batch;
pub mod command;
pub mod config;
pub mod constants;
pub mod error;
pub mod fees;
pub mod ids;
pub mod proposal;

// Re-export all primary types at crate root for ergonomic imports:
//   use openvault_types::{Batch, SettlementProposal, FeeState, ...};

pub use auth::*;
pub use batch::*;
pub use command::*;
pub use config::*;
pub use error::*;
pub use fees::*;
pub use ids::*;
pub use proposal::*;

// Constants are accessed via `openvault_types::constants::FOO`
// (not re-exported to avoid name collisions).
