use chrono::{DateTime, Utc};

use crate::{cached::Cached, work::difficulty::CompactDifficulty};

use super::{merkle, Hash};

/// The vote bit signalling that the parent block's regular transaction
/// tree is approved.
///
/// A block whose header clears this bit *disapproves* its parent: the
/// parent's regular-tree outputs never take effect in the UTXO view.
pub const VOTE_BITS_APPROVE_PARENT: u16 = 0x0001;

/// A block header, containing metadata about a block.
///
/// Blocks are chained together via the backwards reference (previous
/// header hash) present in the block header. Each block points backwards
/// to its parent, all the way back to the genesis block.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// The block's version field.
    pub version: u32,

    /// The hash of the previous block, used to create a chain of blocks
    /// back to the genesis block.
    ///
    /// This ensures no previous block can be changed without also
    /// changing this block's header.
    pub previous_block_hash: Hash,

    /// The root of the regular-tree transaction Merkle tree, binding the
    /// block header to the regular transactions in the block.
    pub merkle_root: merkle::Root,

    /// The root of the stake-tree transaction Merkle tree.
    pub stake_root: merkle::Root,

    /// The block timestamp is a Unix epoch time (UTC) when the miner
    /// started hashing the header (according to the miner).
    pub time: DateTime<Utc>,

    /// An encoded version of the target threshold this block's header
    /// hash must be less than or equal to, in the compact `nBits` format.
    pub difficulty_threshold: CompactDifficulty,

    /// The stakeholder votes aggregated by this block.
    ///
    /// Bit 0 approves or disapproves the parent block's regular
    /// transaction tree; the remaining bits carry agenda votes.
    pub vote_bits: u16,

    /// The height of this block.
    ///
    /// The header commits to the height directly, so no coinbase
    /// scraping is needed to learn it.
    pub height: u32,

    /// An arbitrary field that miners can change to modify the header
    /// hash in order to produce a hash less than or equal to the target
    /// threshold.
    pub nonce: u32,

    /// For efficiency, we cache the hash of this block after computing it
    /// the first time. This field is not part of the consensus
    /// serialization.
    pub(super) hash: Cached<Hash>,
}

impl Header {
    /// Returns length of a serialized header in bytes.
    pub const fn len() -> usize {
        // version + previous + merkle + stake root + time + bits
        // + vote bits + height + nonce
        4 + 32 + 32 + 32 + 4 + 4 + 2 + 4 + 4
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        version: u32,
        previous_block_hash: Hash,
        merkle_root: merkle::Root,
        stake_root: merkle::Root,
        time: DateTime<Utc>,
        difficulty_threshold: CompactDifficulty,
        vote_bits: u16,
        height: u32,
        nonce: u32,
    ) -> Header {
        Header {
            version,
            previous_block_hash,
            merkle_root,
            stake_root,
            time,
            difficulty_threshold,
            vote_bits,
            height,
            nonce,
            hash: Cached::new(),
        }
    }

    /// Returns true if this header's vote bits approve the parent
    /// block's regular transaction tree.
    pub fn approves_parent(&self) -> bool {
        self.vote_bits & VOTE_BITS_APPROVE_PARENT != 0
    }

    /// The cached or computed hash of this header.
    pub fn hash(&self) -> Hash {
        if let Some(hash) = self.hash.value() {
            return hash;
        }
        Hash::from(self)
    }
}
