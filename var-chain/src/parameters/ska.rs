//! Per-asset SKA emission configuration.
//!
//! Each configured SKA asset is emitted exactly once, inside its
//! emission window, by a transaction signed with the asset's governance
//! key. The recipients and amounts are fixed here; the authorizer checks
//! the emitted outputs against them.

use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::ops::RangeInclusive;

use secp256k1::PublicKey;

use super::{Network, NetworkParams, SubsidySchedule, MAINNET_NET_ID, TESTNET_NET_ID};
use crate::amount::{self, Amount, NonNegative, COIN};
use crate::asset::AssetId;
use crate::transparent::Address;

/// The emission configuration of a single SKA asset on one network.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SkaCoinConfig {
    /// A human-readable asset name, e.g. `"Sekai One"`.
    pub name: String,
    /// The ticker symbol, e.g. `"SKA-1"`.
    pub symbol: String,
    /// The total supply created by the asset's single emission.
    pub max_supply: Amount<NonNegative>,
    /// The first height at which the emission may land.
    pub emission_height: u32,
    /// The number of blocks past `emission_height` the window stays
    /// open.
    pub emission_window: u32,
    /// Whether the asset may circulate at all. Inactive configurations
    /// are placeholders for future governance activation.
    pub active: bool,
    /// The recipients of the emission, pairwise with
    /// `emission_amounts`.
    pub emission_addresses: Vec<Address>,
    /// The atoms paid to each recipient; sums to `max_supply`.
    pub emission_amounts: Vec<Amount<NonNegative>>,
    /// The compressed secp256k1 key whose signature authorizes the
    /// emission.
    pub emission_pubkey: PublicKey,
}

impl SkaCoinConfig {
    /// The sum of the configured emission amounts.
    pub fn emission_total(&self) -> Result<Amount<NonNegative>, amount::Error> {
        self.emission_amounts.iter().cloned().sum()
    }

    /// The closed range of heights in which the emission may land.
    pub fn window(&self) -> RangeInclusive<u32> {
        self.emission_height..=self.emission_height.saturating_add(self.emission_window)
    }

    /// Returns true if `height` falls inside the emission window.
    pub fn window_contains(&self, height: u32) -> bool {
        self.window().contains(&height)
    }
}

fn atoms(value: i64) -> Amount<NonNegative> {
    Amount::try_from(value).expect("hard-coded amounts are in range")
}

fn pubkey(hex: &str) -> PublicKey {
    let bytes = hex::decode(hex).expect("hard-coded emission keys are valid hex");
    PublicKey::from_slice(&bytes).expect("hard-coded emission keys are valid points")
}

fn p2pkh(network: Network, pub_key_hash: [u8; 20]) -> Address {
    Address::PayToPublicKeyHash {
        network,
        pub_key_hash,
    }
}

pub(super) fn mainnet_params() -> NetworkParams {
    let mut ska_coins = BTreeMap::new();
    ska_coins.insert(
        AssetId(1),
        SkaCoinConfig {
            name: "Sekai One".to_string(),
            symbol: AssetId(1).symbol(),
            max_supply: atoms(40_000_000 * COIN),
            emission_height: 262_144,
            emission_window: 8_192,
            active: true,
            emission_addresses: vec![
                p2pkh(Network::Mainnet, [0x1a; 20]),
                p2pkh(Network::Mainnet, [0x1b; 20]),
            ],
            emission_amounts: vec![atoms(25_000_000 * COIN), atoms(15_000_000 * COIN)],
            emission_pubkey: pubkey(
                "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5",
            ),
        },
    );

    NetworkParams {
        network: Network::Mainnet,
        net_id: MAINNET_NET_ID,
        stake_validation_height: 4_096,
        subsidy: SubsidySchedule {
            base_subsidy: 31 * COIN + 19_582_664,
            reduction_interval: 6_144,
            mul_subsidy: 100,
            div_subsidy: 101,
        },
        ska_coins,
    }
}

pub(super) fn testnet_params() -> NetworkParams {
    let mut ska_coins = BTreeMap::new();
    ska_coins.insert(
        AssetId(1),
        SkaCoinConfig {
            name: "Sekai One".to_string(),
            symbol: AssetId(1).symbol(),
            max_supply: atoms(50_000_000 * COIN),
            emission_height: 64,
            emission_window: 100,
            active: true,
            emission_addresses: vec![
                p2pkh(Network::Testnet, [0x2a; 20]),
                p2pkh(Network::Testnet, [0x2b; 20]),
            ],
            emission_amounts: vec![atoms(30_000_000 * COIN), atoms(20_000_000 * COIN)],
            emission_pubkey: pubkey(
                "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
            ),
        },
    );
    ska_coins.insert(
        AssetId(2),
        SkaCoinConfig {
            name: "Sekai Two".to_string(),
            symbol: AssetId(2).symbol(),
            max_supply: atoms(10_000_000 * COIN),
            emission_height: 128,
            emission_window: 100,
            active: true,
            emission_addresses: vec![p2pkh(Network::Testnet, [0x2c; 20])],
            emission_amounts: vec![atoms(10_000_000 * COIN)],
            emission_pubkey: pubkey(
                "02f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9",
            ),
        },
    );

    NetworkParams {
        network: Network::Testnet,
        net_id: TESTNET_NET_ID,
        stake_validation_height: 16,
        subsidy: SubsidySchedule {
            base_subsidy: 25 * COIN,
            reduction_interval: 2_048,
            mul_subsidy: 100,
            div_subsidy: 101,
        },
        ska_coins,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emission_window_bounds() {
        let params = testnet_params();
        let coin = &params.ska_coins[&AssetId(1)];

        assert!(coin.window_contains(64));
        assert!(coin.window_contains(164));
        assert!(!coin.window_contains(63));
        assert!(!coin.window_contains(165));
    }

    #[test]
    fn emission_totals_match_supply() {
        for params in vec![mainnet_params(), testnet_params()] {
            for coin in params.ska_coins.values() {
                assert_eq!(coin.emission_total().expect("sums in range"), coin.max_supply);
            }
        }
    }
}
