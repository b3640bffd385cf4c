use crate::{contract::ContractBinding, error::WalletError};
use alloy_primitives::Address;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

// Forms the connected account can use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    SetManager,
    Distribute,
    Reward,
    Burn,
}

// Roles of the connected account
// Both fields are always updated together
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleState {
    pub is_admin: bool,
    pub is_manager: bool,
}

impl RoleState {
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::SetManager | Capability::Distribute => self.is_admin,
            Capability::Reward => self.is_manager,
            Capability::Burn => true,
        }
    }

    // Every capability granted by these roles
    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::iter().filter(|c| self.allows(*c)).collect()
    }
}

pub struct RoleResolver;

impl RoleResolver {
    // Query the admin and the manager flag of the account at the same time
    pub async fn resolve(contract: &ContractBinding, account: &Address) -> Result<RoleState, WalletError> {
        trace!("resolve roles of {}", account);
        let (admin, is_manager) =
            futures::try_join!(contract.admin(), contract.is_manager(account))?;

        let roles = RoleState {
            is_admin: admin == *account,
            is_manager,
        };
        if log::log_enabled!(log::Level::Debug) {
            debug!("roles of {}: {:?}", account, roles);
        }

        Ok(roles)
    }
}
