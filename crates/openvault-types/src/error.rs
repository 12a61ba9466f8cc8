//! Error types for the OpenVault settlement engine.
//!
//! All errors use the `OV_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Batch state errors
//! - 2xx: Invariant violations
//! - 3xx: Resource shortfalls
//! - 4xx: Authorization errors
//! - 6xx: Proposal lifecycle errors
//! - 7xx: Registry / configuration lookups
//! - 9xx: General / internal errors

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{AccountId, Asset, BatchId, ProposalId, Role, VaultId};

/// Central error enum for all OpenVault operations.
///
/// Propagation policy: no automatic retries and no silent partial
/// application. Every failure unwinds the whole operation; the caller
/// inspects current state and decides whether to re-drive the workflow.
#[derive(Debug, Error)]
pub enum OpenvaultError {
    // =================================================================
    // Batch State Errors (1xx)
    // =================================================================
    /// No batch exists for this (vault, asset, id).
    #[error("OV_ERR_100: Batch not found: {vault} {asset} {batch_id}")]
    BatchNotFound {
        vault: VaultId,
        asset: Asset,
        batch_id: BatchId,
    },

    /// The batch has already been closed; a batch closes exactly once.
    #[error("OV_ERR_101: Batch already closed: {0}")]
    BatchAlreadyClosed(BatchId),

    /// The operation requires a closed batch.
    #[error("OV_ERR_102: Batch not closed yet: {0}")]
    BatchNotClosed(BatchId),

    /// The batch has already been settled; a batch settles exactly once.
    #[error("OV_ERR_103: Batch already settled: {0}")]
    BatchAlreadySettled(BatchId),

    // =================================================================
    // Invariant Violations (2xx) — rejected before any external call
    // =================================================================
    /// A profit-share fraction above 100% was requested.
    #[error("OV_ERR_200: Profit share {bps} bps exceeds the 10000 bps denominator")]
    ProfitShareTooLarge { bps: u64 },

    /// The wrong-direction helper was called for this netting sign.
    #[error("OV_ERR_201: Wrong netting direction: netted {netted} cannot take the {flow} path")]
    WrongNettingDirection { netted: Decimal, flow: &'static str },

    /// Fee configuration is out of range (bps above denominator).
    #[error("OV_ERR_202: Invalid fee config: {reason}")]
    InvalidFeeConfig { reason: String },

    /// The zero address was supplied where a real account is required.
    #[error("OV_ERR_203: Account required for {field}, got the zero address")]
    AccountRequired { field: &'static str },

    /// An amount that must be positive was zero or negative.
    #[error("OV_ERR_204: Invalid amount for {field}: {amount}")]
    InvalidAmount { field: &'static str, amount: Decimal },

    /// A settlement entry point was invoked for the wrong vault family.
    #[error("OV_ERR_205: Wrong vault type for {vault}: this flow requires {required}")]
    WrongVaultType {
        vault: VaultId,
        required: crate::VaultType,
    },

    // =================================================================
    // Resource Shortfalls (3xx) — distinct from state violations
    // =================================================================
    /// A post-transfer balance check found less than the expected minimum.
    #[error("OV_ERR_300: Resource shortfall: expected at least {expected}, found {actual}")]
    ResourceShortfall { expected: Decimal, actual: Decimal },

    /// Not enough shares held to perform the transfer.
    #[error("OV_ERR_301: Insufficient shares: need {needed}, have {available}")]
    InsufficientShares { needed: Decimal, available: Decimal },

    /// No venue is registered for this asset.
    #[error("OV_ERR_302: Unknown venue for asset {0}")]
    UnknownVenue(Asset),

    /// The holder has no position in this venue.
    #[error("OV_ERR_303: Unknown holder {holder} in venue {asset}")]
    UnknownHolder { holder: AccountId, asset: Asset },

    /// No pending redemption to execute for this holder.
    #[error("OV_ERR_304: No pending redemption for {holder} in venue {asset}")]
    NoPendingRedemption { holder: AccountId, asset: Asset },

    // =================================================================
    // Authorization Errors (4xx) — rejected before touching state
    // =================================================================
    /// The actor does not hold the role this entry point requires.
    #[error("OV_ERR_400: Not authorized: {actor} lacks the {required} role")]
    NotAuthorized { actor: AccountId, required: Role },

    // =================================================================
    // Proposal Lifecycle Errors (6xx)
    // =================================================================
    /// The requested proposal does not exist.
    #[error("OV_ERR_600: Proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    /// Execution was attempted before the cooldown deadline.
    #[error("OV_ERR_601: Cooldown active until {execute_after}")]
    CooldownActive { execute_after: DateTime<Utc> },

    /// The proposal has already been executed (terminal state).
    #[error("OV_ERR_602: Proposal already executed: {0}")]
    ProposalAlreadyExecuted(ProposalId),

    /// The proposal was cancelled (terminal state).
    #[error("OV_ERR_603: Proposal cancelled: {0}")]
    ProposalCancelled(ProposalId),

    /// Guardian acceptance is required and has not been given.
    #[error("OV_ERR_604: Proposal not accepted by a guardian: {0}")]
    ProposalNotAccepted(ProposalId),

    /// A pending proposal already exists for this batch.
    #[error("OV_ERR_605: Pending proposal already exists for {vault} {asset} {batch_id}")]
    ProposalPendingExists {
        vault: VaultId,
        asset: Asset,
        batch_id: BatchId,
    },

    // =================================================================
    // Registry / Configuration Lookups (7xx)
    // =================================================================
    /// No adapter route is registered for this (vault, asset).
    #[error("OV_ERR_700: Route not found for {vault} {asset}")]
    RouteNotFound { vault: VaultId, asset: Asset },

    /// The vault is not registered.
    #[error("OV_ERR_701: Vault not found: {0}")]
    VaultNotFound(VaultId),

    /// The vault has no settlement config (treasury/insurance/bps).
    #[error("OV_ERR_702: Settlement config missing for {0}")]
    SettlementConfigMissing(VaultId),

    /// The vault has no fee state.
    #[error("OV_ERR_703: Fee state missing for {0}")]
    FeeStateMissing(VaultId),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("OV_ERR_900: Internal error: {0}")]
    Internal(String),

    /// An arithmetic step overflowed or lost representability.
    #[error("OV_ERR_901: Arithmetic error: {0}")]
    Arithmetic(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OpenvaultError>;
