//! Route registry — who settles what, and where.
//!
//! The registry answers three lookups the coordinator needs per settlement:
//! the adapter route for a (vault, asset), the vault's settlement config
//! (treasury/insurance destinations and fractions), and the vault's
//! settlement family. Registration validates addresses up front so the
//! settlement path never meets a zero account.

use std::collections::HashMap;

use openvault_types::{
    AccountId, Asset, OpenvaultError, Result, SettlementConfig, VaultId, VaultType,
};

/// The two adapter positions plus the venue a (vault, asset) settles
/// against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterRoute {
    /// The mint/redeem ledger's custody position in the venue.
    pub ledger_adapter: AccountId,
    /// The vault's own position in the venue.
    pub vault_adapter: AccountId,
    /// The external venue (asset) both adapters hold shares in.
    pub venue: Asset,
}

/// In-memory registry of vaults, routes, and settlement configs.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    vault_types: HashMap<VaultId, VaultType>,
    configs: HashMap<VaultId, SettlementConfig>,
    routes: HashMap<(VaultId, Asset), AdapterRoute>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a vault with its settlement family and cascade config.
    ///
    /// # Errors
    /// Propagates [`SettlementConfig::validate`] failures.
    pub fn register_vault(
        &mut self,
        vault: VaultId,
        vault_type: VaultType,
        config: SettlementConfig,
    ) -> Result<()> {
        config.validate()?;
        self.vault_types.insert(vault, vault_type);
        self.configs.insert(vault, config);
        Ok(())
    }

    /// Register the adapter route for a (vault, asset).
    ///
    /// # Errors
    /// - [`OpenvaultError::VaultNotFound`] for an unregistered vault
    /// - [`OpenvaultError::AccountRequired`] for a zero adapter address
    pub fn register_route(&mut self, vault: VaultId, asset: &str, route: AdapterRoute) -> Result<()> {
        if !self.vault_types.contains_key(&vault) {
            return Err(OpenvaultError::VaultNotFound(vault));
        }
        if route.ledger_adapter.is_zero() {
            return Err(OpenvaultError::AccountRequired {
                field: "ledger_adapter",
            });
        }
        if route.vault_adapter.is_zero() {
            return Err(OpenvaultError::AccountRequired {
                field: "vault_adapter",
            });
        }
        self.routes.insert((vault, asset.to_string()), route);
        Ok(())
    }

    /// The adapter route for a (vault, asset).
    pub fn route(&self, vault: VaultId, asset: &str) -> Result<&AdapterRoute> {
        self.routes
            .get(&(vault, asset.to_string()))
            .ok_or_else(|| OpenvaultError::RouteNotFound {
                vault,
                asset: asset.to_string(),
            })
    }

    /// The vault's settlement config.
    pub fn settlement_config(&self, vault: VaultId) -> Result<&SettlementConfig> {
        self.configs
            .get(&vault)
            .ok_or(OpenvaultError::SettlementConfigMissing(vault))
    }

    /// The vault's treasury account.
    pub fn treasury(&self, vault: VaultId) -> Result<AccountId> {
        Ok(self.settlement_config(vault)?.treasury)
    }

    /// The vault's settlement family.
    pub fn vault_type(&self, vault: VaultId) -> Result<VaultType> {
        self.vault_types
            .get(&vault)
            .copied()
            .ok_or(OpenvaultError::VaultNotFound(vault))
    }

    /// All vaults of a given settlement family.
    #[must_use]
    pub fn vaults_of_type(&self, vault_type: VaultType) -> Vec<VaultId> {
        let mut vaults: Vec<VaultId> = self
            .vault_types
            .iter()
            .filter(|(_, ty)| **ty == vault_type)
            .map(|(vault, _)| *vault)
            .collect();
        vaults.sort();
        vaults
    }
}
