//! The sled-backed finalized chain state.
//!
//! This structure has two categories of methods: *synchronous* methods
//! that perform writes to the sled state, and read-only query methods.
//! The canonical chain writer is single-threaded, so writes are
//! serialized by construction; readers work against sled's snapshot
//! semantics.

use std::sync::Arc;

use tracing::trace;

use var_chain::transparent;
use var_chain::{
    block::{self, Block},
    parameters::{Network, GENESIS_PREVIOUS_BLOCK_HASH},
};

use crate::burn::{BurnState, BURN_BUCKET};
use crate::emission::{EmissionState, EMISSION_BUCKET};
use crate::{BoxError, Config};
use sled_format::{FromSled, SledTreeExt};

mod sled_format;

/// Either a block hash or a block height, for lookups that accept both.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HashOrHeight {
    Hash(block::Hash),
    Height(block::Height),
}

impl From<block::Hash> for HashOrHeight {
    fn from(hash: block::Hash) -> Self {
        HashOrHeight::Hash(hash)
    }
}

impl From<block::Height> for HashOrHeight {
    fn from(height: block::Height) -> Self {
        HashOrHeight::Height(height)
    }
}

/// The finalized part of the chain state, stored in sled.
///
/// Every write path commits a whole block: chain indexes, transaction
/// and UTXO entries, and the SKA emission and burn buckets are all
/// updated before the database flush, so a crash never leaves the
/// buckets describing a different chain than the block indexes.
pub struct FinalizedState {
    db: sled::Db,

    hash_by_height: sled::Tree,
    height_by_hash: sled::Tree,
    block_by_height: sled::Tree,
    tx_by_hash: sled::Tree,
    utxo_by_outpoint: sled::Tree,
    ska_emission_state: sled::Tree,
    ska_burn_state: sled::Tree,
}

impl FinalizedState {
    pub fn new(config: &Config, network: Network) -> Result<Self, BoxError> {
        let db = config.sled_config(network).open()?;

        Ok(Self {
            hash_by_height: db.open_tree(b"hash_by_height")?,
            height_by_hash: db.open_tree(b"height_by_hash")?,
            block_by_height: db.open_tree(b"block_by_height")?,
            tx_by_hash: db.open_tree(b"tx_by_hash")?,
            utxo_by_outpoint: db.open_tree(b"utxo_by_outpoint")?,
            ska_emission_state: db.open_tree(EMISSION_BUCKET)?,
            ska_burn_state: db.open_tree(BURN_BUCKET)?,
            db,
        })
    }

    /// Loads the persisted SKA emission state manager.
    pub fn emission_state(&self) -> Result<EmissionState, BoxError> {
        Ok(EmissionState::load(&self.ska_emission_state)?)
    }

    /// Loads the persisted SKA burn state manager.
    pub fn burn_state(&self) -> Result<BurnState, BoxError> {
        Ok(BurnState::load(&self.ska_burn_state)?)
    }

    /// Returns the hash of the current finalized tip block.
    pub fn finalized_tip_hash(&self) -> block::Hash {
        self.tip()
            .expect("inability to look up tip is unrecoverable")
            .map(|(_, hash)| hash)
            // if the state is empty, return the genesis previous block hash
            .unwrap_or(GENESIS_PREVIOUS_BLOCK_HASH)
    }

    /// Returns the height of the current finalized tip block.
    pub fn finalized_tip_height(&self) -> Option<block::Height> {
        self.tip()
            .expect("inability to look up tip is unrecoverable")
            .map(|(height, _)| height)
    }

    /// Immediately commit `block` and the post-connect emission and burn
    /// snapshots to the finalized state.
    ///
    /// It's the caller's responsibility to ensure that blocks are
    /// committed in order and have passed full consensus validation.
    pub fn commit_finalized_direct(
        &mut self,
        block: Arc<Block>,
        emissions: &EmissionState,
        burns: &BurnState,
    ) -> Result<block::Hash, BoxError> {
        let height = block.height();
        let hash = block.hash();

        trace!(?height, "Finalized block");

        self.hash_by_height.zs_insert(height, hash)?;
        self.height_by_hash.zs_insert(hash, height)?;
        self.block_by_height.zs_insert(height, &*block)?;

        for (tree, transactions) in vec![
            (transparent::Tree::Regular, &block.transactions),
            (transparent::Tree::Stake, &block.stake_transactions),
        ] {
            for transaction in transactions.iter() {
                let transaction_hash = transaction.hash();
                self.tx_by_hash.zs_insert(transaction_hash, transaction)?;

                for input in transaction.inputs.iter().filter(|input| !input.is_null()) {
                    self.utxo_by_outpoint.zs_remove(&input.previous_outpoint)?;
                }
                for (index, output) in transaction.outputs.iter().enumerate() {
                    let outpoint = transparent::OutPoint {
                        hash: transaction_hash,
                        index: index as _,
                        tree,
                    };

                    self.utxo_by_outpoint.zs_insert(outpoint, output)?;
                }
            }
        }

        emissions.commit(&self.ska_emission_state)?;
        burns.commit(&self.ska_burn_state)?;
        self.db.flush()?;

        metrics::counter!("state.committed.block.count", 1);
        metrics::gauge!("state.committed.block.height", height.0 as _);

        Ok(hash)
    }

    pub fn tip(&self) -> Result<Option<(block::Height, block::Hash)>, BoxError> {
        if let Some((height_bytes, hash_bytes)) =
            self.hash_by_height.iter().rev().next().transpose()?
        {
            let height = block::Height::from_ivec(height_bytes)?;
            let hash = block::Hash::from_ivec(hash_bytes)?;

            Ok(Some((height, hash)))
        } else {
            Ok(None)
        }
    }

    pub fn depth(&self, hash: block::Hash) -> Result<Option<u32>, BoxError> {
        let height: block::Height = match self.height_by_hash.zs_get(&hash)? {
            Some(height) => height,
            None => return Ok(None),
        };

        let (tip_height, _) = self.tip()?.expect("tip must exist");

        Ok(Some(tip_height.0 - height.0))
    }

    pub fn block(&self, hash_or_height: HashOrHeight) -> Result<Option<Arc<Block>>, BoxError> {
        let height = match hash_or_height {
            HashOrHeight::Height(height) => height,
            HashOrHeight::Hash(hash) => match self.height_by_hash.zs_get(&hash)? {
                Some(height) => height,
                None => return Ok(None),
            },
        };

        Ok(self.block_by_height.zs_get(&height)?)
    }

    /// Returns the `transparent::UtxoEntry`-bearing output pointed to by
    /// the given `transparent::OutPoint` if it is present.
    pub fn utxo(
        &self,
        outpoint: &transparent::OutPoint,
    ) -> Result<Option<transparent::Output>, BoxError> {
        self.utxo_by_outpoint.zs_get(outpoint)
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use super::*;
    use chrono::{TimeZone, Utc};
    use tempdir::TempDir;

    use var_chain::{
        amount::Amount,
        asset::AssetId,
        block::{merkle, Header, VOTE_BITS_APPROVE_PARENT},
        transaction::{LockTime, Transaction},
        transparent::{pay_to_pubkey_hash, Input, Output, Script},
        work::difficulty::CompactDifficulty,
    };

    fn test_config() -> (Config, TempDir) {
        let dir = TempDir::new("var-state-test").expect("create temp dir");
        let config = Config {
            cache_dir: dir.path().to_path_buf(),
            ephemeral: true,
        };
        (config, dir)
    }

    fn test_block(height: u32, previous: block::Hash) -> Arc<Block> {
        let coinbase = Transaction::new(
            1,
            vec![Input::null(Script(Vec::new()))],
            vec![Output {
                value: Amount::try_from(5_000i64).expect("valid"),
                asset_id: AssetId::VAR,
                script_version: 0,
                pk_script: pay_to_pubkey_hash([height as u8; 20]),
            }],
            LockTime::unlocked(),
            0,
        );
        let transactions = vec![Arc::new(coinbase)];
        let merkle_root: merkle::Root = transactions.iter().map(|tx| tx.hash()).collect();
        Arc::new(Block {
            header: Header::new(
                1,
                previous,
                merkle_root,
                merkle::Root([0; 32]),
                Utc.timestamp(1_600_000_000 + height as i64, 0),
                CompactDifficulty(0x1d00_ffff),
                VOTE_BITS_APPROVE_PARENT,
                height,
                0,
            ),
            transactions,
            stake_transactions: Vec::new(),
        })
    }

    #[test]
    fn commit_and_query_roundtrip() {
        var_test::init();

        let (config, _dir) = test_config();
        let mut state =
            FinalizedState::new(&config, Network::Testnet).expect("open ephemeral state");
        let emissions = EmissionState::new();
        let burns = BurnState::new();

        assert_eq!(state.finalized_tip_hash(), GENESIS_PREVIOUS_BLOCK_HASH);

        let block0 = test_block(0, GENESIS_PREVIOUS_BLOCK_HASH);
        let hash0 = state
            .commit_finalized_direct(block0.clone(), &emissions, &burns)
            .expect("commit genesis");

        let block1 = test_block(1, hash0);
        let hash1 = state
            .commit_finalized_direct(block1.clone(), &emissions, &burns)
            .expect("commit block 1");

        assert_eq!(state.finalized_tip_hash(), hash1);
        assert_eq!(state.finalized_tip_height(), Some(block::Height(1)));
        assert_eq!(state.depth(hash0).expect("query"), Some(1));

        let fetched = state
            .block(block::Height(0).into())
            .expect("query")
            .expect("present");
        assert_eq!(fetched.hash(), block0.hash());

        let outpoint = transparent::OutPoint {
            hash: block1.transactions[0].hash(),
            index: 0,
            tree: transparent::Tree::Regular,
        };
        let output = state.utxo(&outpoint).expect("query").expect("present");
        assert_eq!(output, block1.transactions[0].outputs[0]);
    }

    #[test]
    fn emission_and_burn_buckets_survive_commit() {
        var_test::init();

        let (config, _dir) = test_config();
        let mut state =
            FinalizedState::new(&config, Network::Testnet).expect("open ephemeral state");

        let emissions = EmissionState::new();
        emissions.connect_emission(AssetId(1), 1).expect("emission");
        let burns = BurnState::new();
        burns.connect_burn(AssetId(1), 500).expect("burn");

        let block0 = test_block(0, GENESIS_PREVIOUS_BLOCK_HASH);
        state
            .commit_finalized_direct(block0, &emissions, &burns)
            .expect("commit");

        let reloaded_emissions = state.emission_state().expect("load emissions");
        assert!(reloaded_emissions.has_emission_occurred(AssetId(1)));
        assert_eq!(reloaded_emissions.emission_nonce(AssetId(1)), 1);

        let reloaded_burns = state.burn_state().expect("load burns");
        assert_eq!(reloaded_burns.burned_amount(AssetId(1)), 500);
    }
}
