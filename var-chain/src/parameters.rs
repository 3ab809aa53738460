//! Consensus parameters for each network.

mod genesis;
mod ska;

pub use genesis::GENESIS_PREVIOUS_BLOCK_HASH;
pub use ska::SkaCoinConfig;

use std::collections::BTreeMap;
use std::fmt;

use lazy_static::lazy_static;
use thiserror::Error;

use crate::asset::AssetId;

lazy_static! {
    static ref MAINNET_PARAMS: NetworkParams = {
        let params = ska::mainnet_params();
        params
            .validate()
            .expect("hard-coded mainnet parameters are valid");
        params
    };
    static ref TESTNET_PARAMS: NetworkParams = {
        let params = ska::testnet_params();
        params
            .validate()
            .expect("hard-coded testnet parameters are valid");
        params
    };
}

/// The chain currency network.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    any(test, feature = "proptest-impl"),
    derive(proptest_derive::Arbitrary)
)]
pub enum Network {
    /// The production network.
    Mainnet,
    /// The third test network.
    Testnet,
}

impl Default for Network {
    fn default() -> Self {
        Network::Mainnet
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => f.write_str("mainnet"),
            Network::Testnet => f.write_str("testnet3"),
        }
    }
}

/// The unique wire identifier of a network, signed into SKA emission
/// authorizations to prevent cross-network replay.
pub const MAINNET_NET_ID: u32 = 0xf900_b4d9;
/// See [`MAINNET_NET_ID`].
pub const TESTNET_NET_ID: u32 = 0xb194_aa75;

/// The declining block subsidy schedule.
///
/// The subsidy starts at `base_subsidy` VAR atoms and is scaled by
/// `mul_subsidy / div_subsidy` once per `reduction_interval` blocks.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubsidySchedule {
    pub base_subsidy: i64,
    pub reduction_interval: u32,
    pub mul_subsidy: i64,
    pub div_subsidy: i64,
}

/// The full consensus parameter set of a network.
///
/// There is no global parameter singleton: every rule function takes the
/// parameters it consults, so tests can substitute bespoke networks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkParams {
    /// Which network these parameters describe.
    pub network: Network,
    /// The network's wire and signature-domain identifier.
    pub net_id: u32,
    /// The height at which staking, stake fees, and SKA emission
    /// become active.
    pub stake_validation_height: u32,
    /// The VAR subsidy schedule.
    pub subsidy: SubsidySchedule,
    /// Configuration for every SKA asset this network can emit, keyed
    /// by asset id. Ids absent from this map are unknown assets.
    pub ska_coins: BTreeMap<AssetId, SkaCoinConfig>,
}

/// Errors found while validating a parameter set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    #[error("emission address and amount lists differ in length for {0}")]
    AddressAmountMismatch(AssetId),
    #[error("emission amounts for {0} do not sum to its max supply")]
    SupplyMismatch(AssetId),
    #[error("emission window for active asset {0} opens before the stake validation height")]
    EmissionBeforeStakeValidation(AssetId),
    #[error("asset id 0 is the native asset and cannot be configured as an SKA coin")]
    VarConfigured,
}

impl NetworkParams {
    /// The built-in parameters of `network`.
    pub fn for_network(network: Network) -> NetworkParams {
        match network {
            Network::Mainnet => MAINNET_PARAMS.clone(),
            Network::Testnet => TESTNET_PARAMS.clone(),
        }
    }

    /// The emission configuration of `asset_id`, if this network has one.
    pub fn ska_coin(&self, asset_id: AssetId) -> Option<&SkaCoinConfig> {
        self.ska_coins.get(&asset_id)
    }

    /// Returns true if `asset_id` may circulate at all on this network:
    /// VAR always circulates, an SKA asset only when configured and
    /// marked active.
    pub fn is_asset_active(&self, asset_id: AssetId) -> bool {
        asset_id.is_var()
            || self
                .ska_coin(asset_id)
                .map(|coin| coin.active)
                .unwrap_or(false)
    }

    /// Checks the structural invariants every parameter set must hold.
    pub fn validate(&self) -> Result<(), ParameterError> {
        for (&asset_id, coin) in self.ska_coins.iter() {
            if asset_id.is_var() {
                return Err(ParameterError::VarConfigured);
            }
            if coin.emission_addresses.len() != coin.emission_amounts.len() {
                return Err(ParameterError::AddressAmountMismatch(asset_id));
            }
            let total = coin
                .emission_total()
                .map_err(|_| ParameterError::SupplyMismatch(asset_id))?;
            if total != coin.max_supply {
                return Err(ParameterError::SupplyMismatch(asset_id));
            }
            if coin.active && coin.emission_height < self.stake_validation_height {
                return Err(ParameterError::EmissionBeforeStakeValidation(asset_id));
            }
        }
        Ok(())
    }
}
