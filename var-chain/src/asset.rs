//! The asset-type registry.
//!
//! Every transaction output carries a one-byte asset identifier. Id 0 is
//! the native `VAR` asset, used for fees, mining subsidies, and staking;
//! ids 1 through 255 are the secondary `SKA` assets, each emitted at most
//! once under a governance-held signing key.

use std::fmt;

use crate::amount::{COIN, MAX_ATOMS};
use crate::{SerializationError, VarDeserialize, VarSerialize};

/// The supply cap of the native VAR asset, in atoms.
pub const MAX_VAR_ATOMS: i64 = 21_000_000 * COIN;

/// The supply cap of each SKA asset, in atoms.
pub const MAX_SKA_ATOMS: i64 = MAX_ATOMS;

/// The number of atoms per whole unit, identical for every asset type.
pub const ATOMS_PER_UNIT: i64 = COIN;

/// A one-byte asset identifier.
///
/// The wire encoding is the byte itself, so every byte value is a
/// structurally valid asset id; whether a given SKA id is *configured* on
/// a network is a consensus question answered by
/// [`crate::parameters::NetworkParams`].
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[cfg_attr(
    any(test, feature = "proptest-impl"),
    derive(proptest_derive::Arbitrary)
)]
pub struct AssetId(pub u8);

impl AssetId {
    /// The native asset.
    pub const VAR: AssetId = AssetId(0);

    /// Returns true for the native VAR asset.
    pub fn is_var(self) -> bool {
        self.0 == 0
    }

    /// Returns true for any secondary SKA asset.
    pub fn is_ska(self) -> bool {
        self.0 != 0
    }

    /// The human-readable symbol: `VAR`, or `SKA-n`.
    pub fn symbol(self) -> String {
        if self.is_var() {
            "VAR".to_string()
        } else {
            format!("SKA-{}", self.0)
        }
    }

    /// The supply cap for this asset type, in atoms.
    ///
    /// Aggregate output totals per asset are checked against this cap;
    /// totals of different assets are independent and never added.
    pub fn max_atoms(self) -> i64 {
        if self.is_var() {
            MAX_VAR_ATOMS
        } else {
            MAX_SKA_ATOMS
        }
    }

    /// Iterate over every SKA asset id, `SKA-1` through `SKA-255`.
    pub fn all_ska() -> impl Iterator<Item = AssetId> {
        (1..=255u8).map(AssetId)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol())
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AssetId").field(&self.symbol()).finish()
    }
}

impl From<u8> for AssetId {
    fn from(id: u8) -> Self {
        AssetId(id)
    }
}

impl VarSerialize for AssetId {
    fn var_serialize<W: std::io::Write>(&self, mut writer: W) -> Result<(), std::io::Error> {
        writer.write_all(&[self.0])
    }
}

impl VarDeserialize for AssetId {
    fn var_deserialize<R: std::io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(AssetId(u8::var_deserialize(reader)?))
    }
}
