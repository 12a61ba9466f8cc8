//! # openvault-settler
//!
//! **Settlement coordination**: the per-asset batch lifecycle, driven end
//! to end.
//!
//! ## Architecture
//!
//! The [`SettlementCoordinator`] orchestrates one batch at a time:
//! 1. Close the batch (the close/settle flags are the ordering mutex)
//! 2. Reconcile the external position (loss recovery or profit cascade)
//! 3. Charge accrued fees to the treasury
//! 4. Net deposits against redemptions with dust-safe share conversion
//! 5. Submit a cooldown-gated proposal, and later drive its execution
//!
//! Every operation validates its inputs first, runs its external calls as
//! one atomic command plan, and only then commits ledger mutations — a
//! failure anywhere unwinds completely.

pub mod coordinator;

pub use coordinator::{SettlementCoordinator, SettlementOutcome};
