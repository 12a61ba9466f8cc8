//! Configuration types for OpenVault vaults and the settlement engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, OpenvaultError, Result, constants};

/// The two settlement families the coordinator drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VaultType {
    /// Non-yield custody: netting moves assets in or out of the external
    /// position, no fee or profit flow.
    Institutional,
    /// Yield-bearing vault: depeg reconciliation, fee charge, and profit
    /// cascade run before the final netting.
    YieldBearing,
}

impl std::fmt::Display for VaultType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Institutional => write!(f, "INSTITUTIONAL"),
            Self::YieldBearing => write!(f, "YIELD_BEARING"),
        }
    }
}

/// Per-vault profit-cascade destinations and fractions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Receives the treasury slice of distributed profit and all fee shares.
    pub treasury: AccountId,
    /// Insurance fund account, replenished first from profit.
    pub insurance: AccountId,
    /// Treasury slice of remaining profit, in basis points.
    pub treasury_bps: u64,
    /// Insurance target as a fraction of ledger total assets, in basis points.
    pub insurance_bps: u64,
}

impl SettlementConfig {
    /// Validate accounts and fractions.
    ///
    /// The zero address is rejected for any destination with a non-zero
    /// fraction; a disabled destination (0 bps) may stay unset.
    ///
    /// # Errors
    /// - [`OpenvaultError::AccountRequired`] for a zero destination address
    /// - [`OpenvaultError::InvalidFeeConfig`] for a fraction above 10000 bps
    pub fn validate(&self) -> Result<()> {
        if self.treasury_bps > constants::BPS_DENOMINATOR {
            return Err(OpenvaultError::InvalidFeeConfig {
                reason: format!("treasury_bps = {} exceeds 10000", self.treasury_bps),
            });
        }
        if self.insurance_bps > constants::BPS_DENOMINATOR {
            return Err(OpenvaultError::InvalidFeeConfig {
                reason: format!("insurance_bps = {} exceeds 10000", self.insurance_bps),
            });
        }
        if self.treasury_bps > 0 && self.treasury.is_zero() {
            return Err(OpenvaultError::AccountRequired { field: "treasury" });
        }
        if self.insurance_bps > 0 && self.insurance.is_zero() {
            return Err(OpenvaultError::AccountRequired { field: "insurance" });
        }
        Ok(())
    }

    /// A config with both destinations disabled (residual stays with the
    /// ledger).
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            treasury: AccountId::ZERO,
            insurance: AccountId::ZERO,
            treasury_bps: 0,
            insurance_bps: 0,
        }
    }
}

/// Engine-wide settlement parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds a proposal must wait before it can be executed.
    pub cooldown_secs: i64,
    /// Whether execution additionally requires guardian acceptance.
    pub require_acceptance: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: constants::DEFAULT_COOLDOWN_SECS,
            require_acceptance: constants::DEFAULT_REQUIRE_ACCEPTANCE,
        }
    }
}

impl EngineConfig {
    /// Cooldown as a chrono duration.
    #[must_use]
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cooldown_secs)
    }
}

/// Per-vault ledger parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Decimal places of the share price fixed-point representation.
    pub share_price_decimals: u32,
    /// Which settlement family this vault belongs to.
    pub vault_type: VaultType,
}

impl VaultConfig {
    /// The fixed-point scale implied by `share_price_decimals` (10^d).
    #[must_use]
    pub fn price_scale(&self) -> Decimal {
        Decimal::from(10u64.pow(self.share_price_decimals))
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            share_price_decimals: constants::SHARE_PRICE_DECIMALS,
            vault_type: VaultType::YieldBearing,
        }
    }
}
