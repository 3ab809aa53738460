//! Persistent per-asset SKA emission state.
//!
//! For every SKA asset the chain tracks a strictly increasing emission
//! nonce and an emitted flag. The pair moves through exactly one legal
//! transition per asset: `Idle(k)` becomes `Emitted` when a valid
//! emission with nonce `k + 1` connects, and disconnecting that block
//! restores `Idle(k)` bit-identically.

use std::collections::BTreeMap;
use std::convert::TryInto;
use std::sync::RwLock;

use tracing::trace;

use var_chain::asset::AssetId;

use crate::{StateError, STATE_FORMAT_VERSION};

/// The bucket holding per-asset emission state.
pub const EMISSION_BUCKET: &[u8] = b"skaemissionstate";

/// The reserved meta key holding the bucket's 4-byte little-endian
/// format version. Asset keys are a single byte, so the two can never
/// collide.
pub const FORMAT_VERSION_KEY: &[u8] = b"format_version";

/// The emission state of one asset.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct AssetEmission {
    /// The number of connected emissions, ever; replay protection
    /// requires each authorization to present `nonce + 1`.
    pub nonce: u64,
    /// Whether the asset's one-time emission has occurred.
    pub emitted: bool,
}

/// The in-memory emission ledger: asset id to `(nonce, emitted)`.
///
/// Assets that have never hosted an emission are absent; their state is
/// the default `Idle(0)`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EmissionLedger {
    entries: BTreeMap<AssetId, AssetEmission>,
}

impl EmissionLedger {
    pub fn new() -> EmissionLedger {
        EmissionLedger::default()
    }

    /// The current emission nonce of `asset_id`.
    pub fn nonce(&self, asset_id: AssetId) -> u64 {
        self.entries.get(&asset_id).map(|e| e.nonce).unwrap_or(0)
    }

    /// Returns true once `asset_id`'s one-time emission has connected.
    pub fn has_emission_occurred(&self, asset_id: AssetId) -> bool {
        self.entries
            .get(&asset_id)
            .map(|e| e.emitted)
            .unwrap_or(false)
    }

    /// Records a connected emission: `Idle(nonce - 1)` to `Emitted`.
    pub fn connect_emission(&mut self, asset_id: AssetId, nonce: u64) -> Result<(), StateError> {
        let entry = self.entries.entry(asset_id).or_default();
        if entry.emitted {
            return Err(StateError::InvalidValue(
                "connecting an emission for an already-emitted asset",
            ));
        }
        if nonce != entry.nonce + 1 {
            return Err(StateError::InvalidValue(
                "connecting an emission with a non-successor nonce",
            ));
        }
        entry.nonce = nonce;
        entry.emitted = true;
        trace!(asset = %asset_id, nonce, "connected SKA emission");
        Ok(())
    }

    /// Reverses a connected emission whose recorded nonce matches the
    /// one set by the disconnecting block.
    pub fn disconnect_emission(&mut self, asset_id: AssetId, nonce: u64) -> Result<(), StateError> {
        let entry = self.entries.get_mut(&asset_id).ok_or(StateError::InvalidValue(
            "disconnecting an emission for an asset with no state",
        ))?;
        if !entry.emitted || entry.nonce != nonce {
            return Err(StateError::InvalidValue(
                "disconnecting an emission that does not match the stored state",
            ));
        }
        entry.nonce = nonce - 1;
        entry.emitted = false;
        if *entry == AssetEmission::default() {
            self.entries.remove(&asset_id);
        }
        trace!(asset = %asset_id, nonce, "disconnected SKA emission");
        Ok(())
    }

    /// Iterates the stored per-asset states.
    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, &AssetEmission)> {
        self.entries.iter()
    }
}

/// The shared emission state manager.
///
/// Readers take the read lock; the single chain writer takes the write
/// lock only for the in-memory transition. Persistence rewrites the
/// bucket from a snapshot inside the block-commit transaction, so
/// observers of [`has_emission_occurred`] see the effect exactly after
/// the connecting block commits, never during.
///
/// [`has_emission_occurred`]: EmissionState::has_emission_occurred
#[derive(Debug, Default)]
pub struct EmissionState {
    ledger: RwLock<EmissionLedger>,
}

impl EmissionState {
    pub fn new() -> EmissionState {
        EmissionState::default()
    }

    pub fn from_ledger(ledger: EmissionLedger) -> EmissionState {
        EmissionState {
            ledger: RwLock::new(ledger),
        }
    }

    /// Loads the ledger from its bucket.
    ///
    /// An empty bucket is a fresh chain; a bucket with an unknown future
    /// format version fails hard rather than guessing at its layout.
    pub fn load(tree: &sled::Tree) -> Result<EmissionState, StateError> {
        let ledger = load_ledger(tree)?;
        Ok(EmissionState::from_ledger(ledger))
    }

    /// Rewrites the bucket from the current in-memory snapshot.
    pub fn commit(&self, tree: &sled::Tree) -> Result<(), StateError> {
        let snapshot = self.snapshot();
        tree.clear()?;
        tree.insert(FORMAT_VERSION_KEY, &STATE_FORMAT_VERSION.to_le_bytes()[..])?;
        for (asset_id, entry) in snapshot.iter() {
            let mut value = Vec::with_capacity(9);
            value.extend_from_slice(&entry.nonce.to_le_bytes());
            value.push(entry.emitted as u8);
            tree.insert(&[asset_id.0][..], value)?;
        }
        Ok(())
    }

    /// A point-in-time copy of the ledger for concurrent readers.
    pub fn snapshot(&self) -> EmissionLedger {
        self.ledger
            .read()
            .expect("emission state lock is never poisoned")
            .clone()
    }

    pub fn has_emission_occurred(&self, asset_id: AssetId) -> bool {
        self.ledger
            .read()
            .expect("emission state lock is never poisoned")
            .has_emission_occurred(asset_id)
    }

    pub fn emission_nonce(&self, asset_id: AssetId) -> u64 {
        self.ledger
            .read()
            .expect("emission state lock is never poisoned")
            .nonce(asset_id)
    }

    pub fn connect_emission(&self, asset_id: AssetId, nonce: u64) -> Result<(), StateError> {
        self.ledger
            .write()
            .expect("emission state lock is never poisoned")
            .connect_emission(asset_id, nonce)
    }

    pub fn disconnect_emission(&self, asset_id: AssetId, nonce: u64) -> Result<(), StateError> {
        self.ledger
            .write()
            .expect("emission state lock is never poisoned")
            .disconnect_emission(asset_id, nonce)
    }
}

fn load_ledger(tree: &sled::Tree) -> Result<EmissionLedger, StateError> {
    let mut ledger = EmissionLedger::new();

    if let Some(raw) = tree.get(FORMAT_VERSION_KEY)? {
        let raw: [u8; 4] = raw[..]
            .try_into()
            .map_err(|_| StateError::InvalidValue("format version is not 4 bytes"))?;
        let version = u32::from_le_bytes(raw);
        if version > STATE_FORMAT_VERSION {
            return Err(StateError::BucketVersionUnsupported {
                found: version,
                supported: STATE_FORMAT_VERSION,
            });
        }
    }

    for item in tree.iter() {
        let (key, value) = item?;
        if &key[..] == FORMAT_VERSION_KEY {
            continue;
        }
        if key.len() != 1 {
            return Err(StateError::InvalidKey("asset keys are a single byte"));
        }
        if key[0] == 0 {
            return Err(StateError::InvalidKey(
                "asset id 0 is the native asset and has no emission state",
            ));
        }
        if value.len() != 9 {
            return Err(StateError::InvalidValue("emission entries are 9 bytes"));
        }
        let nonce = u64::from_le_bytes(value[0..8].try_into().expect("length checked"));
        let emitted = match value[8] {
            0 => false,
            1 => true,
            _ => return Err(StateError::InvalidValue("emitted flag must be 0 or 1")),
        };
        ledger
            .entries
            .insert(AssetId(key[0]), AssetEmission { nonce, emitted });
    }

    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emission_transitions() {
        var_test::init();

        let mut ledger = EmissionLedger::new();
        assert_eq!(ledger.nonce(AssetId(1)), 0);
        assert!(!ledger.has_emission_occurred(AssetId(1)));

        // nonce must be the successor
        assert!(ledger.connect_emission(AssetId(1), 2).is_err());

        ledger.connect_emission(AssetId(1), 1).expect("first emission");
        assert_eq!(ledger.nonce(AssetId(1)), 1);
        assert!(ledger.has_emission_occurred(AssetId(1)));

        // a second emission is illegal regardless of nonce
        assert!(ledger.connect_emission(AssetId(1), 2).is_err());

        ledger
            .disconnect_emission(AssetId(1), 1)
            .expect("disconnect restores idle");
        assert_eq!(ledger.nonce(AssetId(1)), 0);
        assert!(!ledger.has_emission_occurred(AssetId(1)));
        assert_eq!(ledger, EmissionLedger::new());
    }

    #[test]
    fn disconnect_requires_matching_nonce() {
        var_test::init();

        let mut ledger = EmissionLedger::new();
        ledger.connect_emission(AssetId(3), 1).expect("emission");
        assert!(ledger.disconnect_emission(AssetId(3), 2).is_err());
        assert!(ledger.disconnect_emission(AssetId(4), 1).is_err());
    }

    #[test]
    fn bucket_roundtrip() {
        var_test::init();

        let db = sled::Config::default()
            .temporary(true)
            .open()
            .expect("open temporary sled db");
        let tree = db.open_tree(EMISSION_BUCKET).expect("open bucket");

        let state = EmissionState::new();
        state.connect_emission(AssetId(1), 1).expect("emission");
        state.commit(&tree).expect("commit");

        let reloaded = EmissionState::load(&tree).expect("load");
        assert!(reloaded.has_emission_occurred(AssetId(1)));
        assert_eq!(reloaded.emission_nonce(AssetId(1)), 1);
        assert_eq!(reloaded.snapshot(), state.snapshot());
    }

    #[test]
    fn future_format_versions_fail_hard() {
        var_test::init();

        let db = sled::Config::default()
            .temporary(true)
            .open()
            .expect("open temporary sled db");
        let tree = db.open_tree(EMISSION_BUCKET).expect("open bucket");
        tree.insert(FORMAT_VERSION_KEY, &(STATE_FORMAT_VERSION + 1).to_le_bytes()[..])
            .expect("insert version");

        assert!(matches!(
            EmissionState::load(&tree),
            Err(StateError::BucketVersionUnsupported { .. })
        ));
    }

    #[test]
    fn var_key_is_rejected() {
        var_test::init();

        let db = sled::Config::default()
            .temporary(true)
            .open()
            .expect("open temporary sled db");
        let tree = db.open_tree(EMISSION_BUCKET).expect("open bucket");
        let mut value = 1u64.to_le_bytes().to_vec();
        value.push(1);
        tree.insert(&[0u8][..], value).expect("insert");

        assert!(matches!(
            EmissionState::load(&tree),
            Err(StateError::InvalidKey(_))
        ));
    }
}
