//! Persistent per-asset burn totals.
//!
//! An output whose script carries a matching SKA burn marker, a
//! non-zero value, and an SKA asset id destroys its atoms permanently.
//! The chain tracks the running total per asset; connecting a block
//! accumulates its burns and disconnecting subtracts them again,
//! deleting the key when the total returns to zero.

use std::collections::BTreeMap;
use std::convert::TryInto;
use std::sync::RwLock;

use tracing::trace;

use var_chain::asset::AssetId;

use crate::{StateError, STATE_FORMAT_VERSION};

/// The bucket holding per-asset burn totals.
pub const BURN_BUCKET: &[u8] = b"skaburnstate";

/// The reserved meta key holding the bucket's format version.
pub const FORMAT_VERSION_KEY: &[u8] = b"format_version";

/// The in-memory burn ledger: asset id to total burned atoms.
///
/// Totals are strictly positive; reaching zero removes the key.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BurnLedger {
    totals: BTreeMap<AssetId, i64>,
}

impl BurnLedger {
    pub fn new() -> BurnLedger {
        BurnLedger::default()
    }

    /// The total atoms of `asset_id` destroyed so far.
    pub fn burned_amount(&self, asset_id: AssetId) -> i64 {
        self.totals.get(&asset_id).copied().unwrap_or(0)
    }

    /// All non-zero burn totals.
    pub fn all_burned_amounts(&self) -> BTreeMap<AssetId, i64> {
        self.totals.clone()
    }

    /// Accumulates a connected burn output.
    pub fn connect_burn(&mut self, asset_id: AssetId, atoms: i64) -> Result<(), StateError> {
        if atoms <= 0 {
            return Err(StateError::InvalidValue("burns must destroy atoms"));
        }
        let total = self.totals.entry(asset_id).or_insert(0);
        *total = total
            .checked_add(atoms)
            .ok_or(StateError::InvalidValue("burn total overflow"))?;
        trace!(asset = %asset_id, atoms, total = *total, "connected burn");
        Ok(())
    }

    /// Subtracts a disconnected burn output.
    pub fn disconnect_burn(&mut self, asset_id: AssetId, atoms: i64) -> Result<(), StateError> {
        if atoms <= 0 {
            return Err(StateError::InvalidValue("burns must destroy atoms"));
        }
        let total = self
            .totals
            .get_mut(&asset_id)
            .ok_or(StateError::InvalidValue(
                "disconnecting a burn for an asset with no burn total",
            ))?;
        if *total < atoms {
            return Err(StateError::InvalidValue(
                "disconnecting a burn larger than the stored total",
            ));
        }
        *total -= atoms;
        if *total == 0 {
            self.totals.remove(&asset_id);
        }
        trace!(asset = %asset_id, atoms, "disconnected burn");
        Ok(())
    }

    /// Iterates the stored totals.
    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, &i64)> {
        self.totals.iter()
    }
}

/// The shared burn state manager.
///
/// Same locking discipline as the emission state: short write-lock
/// critical sections for transitions, bucket rewrite from a snapshot at
/// block commit.
#[derive(Debug, Default)]
pub struct BurnState {
    ledger: RwLock<BurnLedger>,
}

impl BurnState {
    pub fn new() -> BurnState {
        BurnState::default()
    }

    pub fn from_ledger(ledger: BurnLedger) -> BurnState {
        BurnState {
            ledger: RwLock::new(ledger),
        }
    }

    /// Loads the ledger from its bucket, rejecting unknown future
    /// format versions.
    pub fn load(tree: &sled::Tree) -> Result<BurnState, StateError> {
        let ledger = load_ledger(tree)?;
        Ok(BurnState::from_ledger(ledger))
    }

    /// Rewrites the bucket from the current in-memory snapshot.
    pub fn commit(&self, tree: &sled::Tree) -> Result<(), StateError> {
        let snapshot = self.snapshot();
        tree.clear()?;
        tree.insert(FORMAT_VERSION_KEY, &STATE_FORMAT_VERSION.to_le_bytes()[..])?;
        for (asset_id, total) in snapshot.iter() {
            tree.insert(&[asset_id.0][..], &total.to_le_bytes()[..])?;
        }
        Ok(())
    }

    /// A point-in-time copy of the ledger for concurrent readers.
    pub fn snapshot(&self) -> BurnLedger {
        self.ledger
            .read()
            .expect("burn state lock is never poisoned")
            .clone()
    }

    pub fn burned_amount(&self, asset_id: AssetId) -> i64 {
        self.ledger
            .read()
            .expect("burn state lock is never poisoned")
            .burned_amount(asset_id)
    }

    pub fn all_burned_amounts(&self) -> BTreeMap<AssetId, i64> {
        self.ledger
            .read()
            .expect("burn state lock is never poisoned")
            .all_burned_amounts()
    }

    pub fn connect_burn(&self, asset_id: AssetId, atoms: i64) -> Result<(), StateError> {
        self.ledger
            .write()
            .expect("burn state lock is never poisoned")
            .connect_burn(asset_id, atoms)
    }

    pub fn disconnect_burn(&self, asset_id: AssetId, atoms: i64) -> Result<(), StateError> {
        self.ledger
            .write()
            .expect("burn state lock is never poisoned")
            .disconnect_burn(asset_id, atoms)
    }
}

fn load_ledger(tree: &sled::Tree) -> Result<BurnLedger, StateError> {
    let mut ledger = BurnLedger::new();

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
        if key.len() != 1 || key[0] == 0 {
            return Err(StateError::InvalidKey("burn keys are a single SKA asset id"));
        }
        if value.len() != 8 {
            return Err(StateError::InvalidValue("burn totals are 8 bytes"));
        }
        let total = i64::from_le_bytes(value[..].try_into().expect("length checked"));
        if total <= 0 {
            return Err(StateError::InvalidValue(
                "stored burn totals are strictly positive",
            ));
        }
        ledger.totals.insert(AssetId(key[0]), total);
    }

    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burn_totals_accumulate_and_reverse() {
        var_test::init();

        let mut ledger = BurnLedger::new();
        ledger.connect_burn(AssetId(2), 700).expect("burn");
        ledger.connect_burn(AssetId(2), 300).expect("burn");
        ledger.connect_burn(AssetId(9), 50).expect("burn");

        assert_eq!(ledger.burned_amount(AssetId(2)), 1_000);
        assert_eq!(ledger.burned_amount(AssetId(9)), 50);
        assert_eq!(ledger.burned_amount(AssetId(3)), 0);

        ledger.disconnect_burn(AssetId(2), 300).expect("reverse");
        assert_eq!(ledger.burned_amount(AssetId(2)), 700);

        // reaching zero removes the key entirely
        ledger.disconnect_burn(AssetId(9), 50).expect("reverse");
        assert_eq!(ledger.all_burned_amounts().len(), 1);

        assert!(ledger.disconnect_burn(AssetId(9), 1).is_err());
    }

    #[test]
    fn zero_value_burns_are_rejected() {
        var_test::init();

        let mut ledger = BurnLedger::new();
        assert!(ledger.connect_burn(AssetId(2), 0).is_err());
        assert!(ledger.connect_burn(AssetId(2), -5).is_err());
    }

    #[test]
    fn bucket_roundtrip() {
        var_test::init();

        let db = sled::Config::default()
            .temporary(true)
            .open()
            .expect("open temporary sled db");
        let tree = db.open_tree(BURN_BUCKET).expect("open bucket");

        let state = BurnState::new();
        state.connect_burn(AssetId(2), 1_000).expect("burn");
        state.connect_burn(AssetId(7), 42).expect("burn");
        state.commit(&tree).expect("commit");

        let reloaded = BurnState::load(&tree).expect("load");
        assert_eq!(reloaded.burned_amount(AssetId(2)), 1_000);
        assert_eq!(reloaded.burned_amount(AssetId(7)), 42);
        assert_eq!(reloaded.snapshot(), state.snapshot());
    }
}
