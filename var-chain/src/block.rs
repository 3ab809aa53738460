//! Blocks and block-related structures (heights, headers, etc.)
#![allow(clippy::unit_arg)]

mod hash;
mod header;
mod height;
mod serialize;

pub mod merkle;

#[cfg(any(test, feature = "proptest-impl"))]
mod arbitrary;
#[cfg(test)]
mod tests;

use std::{fmt, sync::Arc};

pub use hash::Hash;
pub use header::{Header, VOTE_BITS_APPROVE_PARENT};
pub use height::Height;
pub use serialize::MAX_BLOCK_BYTES;

use crate::{fmt::DisplayToDebug, transaction::Transaction};

/// A block, containing a header and the two transaction trees.
///
/// Regular transactions (value transfer, SKA emissions in waiting) and
/// stake transactions (tickets, votes, revocations, stake fees) are
/// carried in separate trees; outpoints name the tree they spend from.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// The block header, containing block metadata.
    pub header: Header,
    /// The regular-tree transactions.
    pub transactions: Vec<Arc<Transaction>>,
    /// The stake-tree transactions.
    pub stake_transactions: Vec<Arc<Transaction>>,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("height", &self.height())
            .field("hash", &DisplayToDebug(self.hash()))
            .finish()
    }
}

impl Block {
    /// The height of this block, as committed to by the header.
    ///
    /// Unlike chains that bury the height in the coinbase script, the
    /// header carries it directly.
    pub fn height(&self) -> Height {
        Height(self.header.height)
    }

    /// Compute the hash of this block.
    pub fn hash(&self) -> Hash {
        Hash::from(self)
    }

    /// Returns true if this block's vote bits approve its parent's
    /// regular transaction tree.
    ///
    /// When a block is disapproved, its regular-tree outputs are treated
    /// as nonexistent by every subsequent UTXO lookup.
    pub fn approves_parent(&self) -> bool {
        self.header.approves_parent()
    }
}

impl<'a> From<&'a Block> for Hash {
    fn from(block: &'a Block) -> Hash {
        (&block.header).into()
    }
}
