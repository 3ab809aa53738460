//! The capability trait connecting consensus rules to chain state.
//!
//! Rule functions never reach into storage or global singletons; they
//! consult this narrow read-only surface. Production wires it to the
//! state managers in `var-state`; tests substitute an in-memory fake.

use var_chain::{
    asset::AssetId,
    parameters::NetworkParams,
    transparent::{OutPoint, UtxoEntry},
};
use var_state::{burn::BurnState, emission::EmissionState, utxo::UtxoView};

/// Read-only chain state as seen by the consensus rules.
pub trait ChainState {
    /// The consensus parameters of the network being validated.
    fn chain_params(&self) -> &NetworkParams;

    /// Returns true once `asset_id`'s one-time emission has connected.
    fn has_emission_occurred(&self, asset_id: AssetId) -> bool;

    /// The stored emission nonce of `asset_id`.
    fn emission_nonce(&self, asset_id: AssetId) -> u64;

    /// The visible unspent entry for `outpoint`, if any.
    fn fetch_utxo_entry(&self, outpoint: &OutPoint) -> Option<UtxoEntry>;

    /// Returns true if the governance vote activating `asset_id` has
    /// passed as of the current tip.
    ///
    /// Vote tallying itself is outside the consensus core; the tally's
    /// verdict is consumed here.
    fn is_ska_vote_active(&self, asset_id: AssetId) -> bool;
}

/// A [`ChainState`] over the live state managers.
///
/// The UTXO view handed in is a reader snapshot; the emission manager
/// is shared with the chain writer, so nonce reads always see the last
/// committed block.
pub struct StateReadout<'a> {
    pub params: &'a NetworkParams,
    pub emissions: &'a EmissionState,
    pub burns: &'a BurnState,
    pub utxos: &'a UtxoView,
    /// The SKA assets whose activation votes have passed.
    pub active_ska_votes: &'a [AssetId],
}

impl ChainState for StateReadout<'_> {
    fn chain_params(&self) -> &NetworkParams {
        self.params
    }

    fn has_emission_occurred(&self, asset_id: AssetId) -> bool {
        self.emissions.has_emission_occurred(asset_id)
    }

    fn emission_nonce(&self, asset_id: AssetId) -> u64 {
        self.emissions.emission_nonce(asset_id)
    }

    fn fetch_utxo_entry(&self, outpoint: &OutPoint) -> Option<UtxoEntry> {
        self.utxos.lookup(outpoint).cloned()
    }

    fn is_ska_vote_active(&self, asset_id: AssetId) -> bool {
        self.active_ska_votes.contains(&asset_id)
    }
}
