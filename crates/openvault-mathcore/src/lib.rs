//! # openvault-mathcore
//!
//! **Pure settlement arithmetic for OpenVault.**
//!
//! MathCore is the compute plane — the coordinator feeds it snapshots and it
//! returns numbers. It has:
//!
//! - **Zero side effects**: no ledger access, no clock reads, no transfers
//! - **Deterministic output**: same inputs -> same fees, shares, splits
//! - **Explicit rounding**: every conversion floors or ceils by name
//!
//! Three modules mirror the three computations a settlement performs:
//! [`fee_calc`] (management/performance accrual), [`netting`] (signed
//! deposit/redeem netting with ceiling share conversion), and [`cascade`]
//! (profit distribution and loss recovery).

pub mod cascade;
pub mod fee_calc;
pub mod netting;

pub use cascade::{ProfitDistributionResult, distribute_profit, insurance_deficit, loss_recovery_shares};
pub use fee_calc::accrued_fees;
pub use netting::{
    NetDirection, assets_to_shares_floor, into_position_assets, net_flow, out_of_position_assets,
    requested_to_assets, shares_for_assets_ceil, shares_to_assets_floor,
};
