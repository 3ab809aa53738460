//! Transparent transaction inputs, outputs, and the UTXO entry model.
#![allow(clippy::unit_arg)]

mod address;
mod marker;
mod script;
mod serialize;

pub use address::{hash160, Address};
pub use marker::{
    consolidation_marker, has_emission_script_prefix, is_stake_gen_p2pkh, p2pkh_hash160,
    pay_to_pubkey_hash, ska_burn_marker, ssfee_miner_marker, ssfee_staker_marker,
    stake_gen_pay_to_pubkey_hash, treasury_vote_marker, Marker, OP_CHECKSIG, OP_DUP,
    OP_EQUALVERIFY, OP_HASH160, OP_RETURN, OP_SSGEN, OP_SSRTX, OP_SSTX, OP_TADD, OP_TSPEND,
    SKA_EMISSION_AUTH_VERSION, SKA_EMISSION_SCRIPT_MIN_LEN, SKA_EMISSION_SCRIPT_PREFIX,
};
pub use script::Script;
pub use serialize::MAX_SCRIPT_SIZE;

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

#[cfg(test)]
mod prop;

use var_serde_derive::VarSerialize as DeriveVarSerialize;

use crate::{
    amount::{Amount, NonNegative},
    asset::AssetId,
    block,
    stake::TxType,
    transaction, VarSerialize,
};

/// Which of the two transaction trees of a block an outpoint refers to.
///
/// Regular transactions and stake transactions (tickets, votes,
/// revocations, stake fees) are committed to separate Merkle trees, so an
/// outpoint needs one extra byte to name the tree.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub enum Tree {
    /// The regular transaction tree.
    Regular,
    /// The stake transaction tree.
    Stake,
}

impl Tree {
    /// The wire encoding of this tree selector.
    pub fn to_byte(self) -> u8 {
        match self {
            Tree::Regular => 0,
            Tree::Stake => 1,
        }
    }
}

/// OutPoint
///
/// A particular transaction output reference: the hash of the transaction
/// that created the output, the output's index, and the tree it lives in.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Hash, Ord, PartialOrd,
    DeriveVarSerialize,
)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct OutPoint {
    /// References the transaction that contains the UTXO being spent.
    pub hash: transaction::Hash,

    /// Identifies which UTXO from that transaction is referenced; the
    /// first output is 0, etc.
    pub index: u32,

    /// The transaction tree the referenced output belongs to.
    pub tree: Tree,
}

impl OutPoint {
    /// Serialized length: 32-byte hash, 4-byte index, 1-byte tree.
    #[inline]
    pub const fn len() -> usize {
        37
    }

    /// The null outpoint used by coinbase, stakebase, treasury base, and
    /// SKA-emission inputs: a zero hash and the maximum index.
    pub fn null() -> OutPoint {
        OutPoint {
            hash: transaction::Hash::from_bytes_exact([0u8; 32]),
            index: std::u32::MAX,
            tree: Tree::Regular,
        }
    }

    /// Returns true if this is the null outpoint.
    pub fn is_null(&self) -> bool {
        self.index == std::u32::MAX && self.hash == transaction::Hash::from_bytes_exact([0u8; 32])
    }
}

/// A transparent input to a transaction.
///
/// The outpoint and sequence are committed to by the transaction prefix;
/// the remaining fields travel in the witness.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct Input {
    /// The previous output being consumed.
    pub previous_outpoint: OutPoint,
    /// The sequence number for the input.
    pub sequence: u32,
    /// The value of the referenced output, in atoms of its asset.
    pub value_in: i64,
    /// The height of the block containing the referenced output.
    pub block_height: u32,
    /// The offset of the creating transaction within its block.
    pub block_index: u32,
    /// The script that authorizes spending `previous_outpoint`.
    pub signature_script: Script,
}

impl Input {
    /// Builds the null input used by coinbase, stakebase, and
    /// SKA-emission transactions.
    pub fn null(signature_script: Script) -> Input {
        Input {
            previous_outpoint: OutPoint::null(),
            sequence: std::u32::MAX,
            value_in: 0,
            block_height: 0,
            block_index: std::u32::MAX,
            signature_script,
        }
    }

    /// Returns true if this input consumes no previous output.
    pub fn is_null(&self) -> bool {
        self.previous_outpoint.is_null()
    }
}

/// A transparent output from a transaction.
///
/// The most fundamental building block of a transaction is a transaction
/// output -- the coins you own in your "wallet" are in fact a subset of
/// unspent transaction outputs (or "UTXO"s) of the global UTXO set.
///
/// Unlike its single-asset ancestors, every output here names the asset
/// it carries: the one-byte asset id is written immediately after the
/// 8-byte value on the wire. Value conservation is enforced per asset.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Hash)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct Output {
    /// Transaction value, in atoms of `asset_id`.
    pub value: Amount<NonNegative>,

    /// The asset type this output carries.
    pub asset_id: AssetId,

    /// The version of the script language evaluating `pk_script`.
    pub script_version: u16,

    /// The lock script defines the conditions under which this output can
    /// be spent. A zero-length script is legal and used by
    /// `OP_RETURN`-only outputs with a zero value.
    pub pk_script: Script,
}

impl Output {
    /// Returns the serialized length (in bytes) of this Output.
    pub fn serialized_size(&self) -> usize {
        8 + 1 + 2 + self.pk_script.serialized_size()
    }
}

bitflags::bitflags! {
    /// Compact per-entry attributes stored with every UTXO.
    #[derive(Serialize, Deserialize)]
    pub struct EntryFlags: u8 {
        /// The entry was created by a coinbase transaction.
        const COINBASE = 0b0000_0001;
        /// The creating transaction carried a non-zero expiry.
        const HAS_EXPIRY = 0b0000_0010;
    }
}

/// An unspent transaction output, as tracked by the UTXO viewpoint.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UtxoEntry {
    /// The unspent output itself.
    pub output: Output,
    /// The height of the block containing the creating transaction.
    pub height: block::Height,
    /// The offset of the creating transaction within its block.
    pub block_index: u32,
    /// Entry attributes.
    pub flags: EntryFlags,
    /// The structural type of the creating transaction.
    pub tx_type: TxType,
}

impl UtxoEntry {
    /// The asset type this entry carries.
    pub fn asset_id(&self) -> AssetId {
        self.output.asset_id
    }

    /// The entry's value in atoms of its asset.
    pub fn value(&self) -> Amount<NonNegative> {
        self.output.value
    }

    /// Returns true if the entry was created by a coinbase transaction.
    pub fn is_coinbase(&self) -> bool {
        self.flags.contains(EntryFlags::COINBASE)
    }
}
