//! Genesis consensus parameters.

use crate::block;

/// The previous block hash for the genesis block.
///
/// All known networks use the all-zeroes hash.
pub const GENESIS_PREVIOUS_BLOCK_HASH: block::Hash = block::Hash([0; 32]);
