//! Transactions and transaction-related structures.

use crate::transparent;
use crate::{cached::Cached, compactint::CompactInt};

mod hash;
mod lock_time;
mod serialize;

#[cfg(any(test, feature = "proptest-impl"))]
mod arbitrary;
#[cfg(test)]
mod tests;

pub use hash::Hash;
pub use lock_time::LockTime;
pub use serialize::{SerializationType, MAX_TX_SIZE};

/// A dual-asset transaction.
///
/// A transaction is an encoded data structure that facilitates the
/// transfer of value between public key addresses. Every output names
/// the asset it carries, and value conservation is enforced per asset
/// type during validation.
///
/// The on-wire 4-byte version field packs the transaction version in the
/// low 16 bits and the serialization type (full or no-witness) in the
/// high 16 bits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// The transaction version.
    pub version: u16,
    /// The transaction inputs.
    pub inputs: Vec<transparent::Input>,
    /// The transaction outputs.
    pub outputs: Vec<transparent::Output>,
    /// The earliest block height or time this transaction may be mined.
    pub lock_time: LockTime,
    /// The block height after which this transaction can never be mined;
    /// zero means no expiry.
    pub expiry: u32,
    hash: Cached<Hash>,
}

impl Transaction {
    pub fn new(
        version: u16,
        inputs: Vec<transparent::Input>,
        outputs: Vec<transparent::Output>,
        lock_time: LockTime,
        expiry: u32,
    ) -> Transaction {
        Transaction {
            version,
            inputs,
            outputs,
            lock_time,
            expiry,
            hash: Cached::new(),
        }
    }

    /// Get the hash of this transaction.
    ///
    /// The hash is defined over the full serialization.
    pub fn hash(&self) -> Hash {
        // If we have a cached version, just return that
        if let Some(hash) = self.hash.value() {
            return hash;
        }
        // Otherwise, serialize the tx to calculate and return the hash
        Hash::from(self)
    }

    /// Returns true if this transaction's single input consumes no
    /// previous output.
    ///
    /// Coinbase, stakebase, treasury base, and SKA-emission transactions
    /// all take this shape; `stake::determine_tx_type` tells them apart.
    pub fn has_single_null_input(&self) -> bool {
        self.inputs.len() == 1
            && self
                .inputs
                .get(0)
                .map(transparent::Input::is_null)
                .unwrap_or(false)
    }

    /// Returns true if this transaction carries a non-zero expiry height.
    pub fn has_expiry(&self) -> bool {
        self.expiry != 0
    }

    /// Returns the serialized length (in bytes) of the full form of this
    /// transaction.
    pub fn serialized_size(&self) -> usize {
        let mut size = 4;
        size += CompactInt::size(self.inputs.len());
        size += self.inputs.len() * (transparent::OutPoint::len() + 4);
        size += CompactInt::size(self.outputs.len());
        for output in self.outputs.iter() {
            size += output.serialized_size();
        }
        // lock time and expiry
        size += 4 + 4;
        size += CompactInt::size(self.inputs.len());
        for input in self.inputs.iter() {
            size += 8 + 4 + 4 + input.signature_script.serialized_size();
        }
        size
    }
}
