//! Wire serialization for blocks and headers.

use std::convert::TryInto;
use std::io::{self, Cursor, Read};
use std::sync::Arc;

use crate::compactint::CompactInt;
use crate::serialization::{sha256d, SerializationError, VarDeserialize, VarSerialize};
use crate::transaction::Transaction;
use crate::work::difficulty::CompactDifficulty;
use crate::Cached;

use super::{merkle, Block, Hash, Header};

/// The maximum serialized size of a block in bytes.
pub const MAX_BLOCK_BYTES: u64 = 2_000_000;

impl VarSerialize for Header {
    fn var_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.version.var_serialize(&mut writer)?;
        self.previous_block_hash.var_serialize(&mut writer)?;
        self.merkle_root.var_serialize(&mut writer)?;
        self.stake_root.var_serialize(&mut writer)?;
        self.time.var_serialize(&mut writer)?;
        self.difficulty_threshold.var_serialize(&mut writer)?;
        self.vote_bits.var_serialize(&mut writer)?;
        self.height.var_serialize(&mut writer)?;
        self.nonce.var_serialize(&mut writer)
    }
}

impl VarDeserialize for Header {
    fn var_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        // Buffer the fixed-length header so its hash can be computed
        // without a reserialization round-trip.
        let mut raw = vec![0u8; Header::len()];
        reader.read_exact(&mut raw)?;

        let mut hash_writer = sha256d::Writer::default();
        io::Write::write_all(&mut hash_writer, &raw).expect("Sha256dWriter is infallible");
        let own_hash = Hash::from_bytes_exact(hash_writer.finish());

        let mut src = Cursor::new(raw);
        Ok(Header {
            version: u32::var_deserialize(&mut src)?,
            previous_block_hash: Hash::var_deserialize(&mut src)?,
            merkle_root: merkle::Root::var_deserialize(&mut src)?,
            stake_root: merkle::Root::var_deserialize(&mut src)?,
            time: VarDeserialize::var_deserialize(&mut src)?,
            difficulty_threshold: CompactDifficulty::var_deserialize(&mut src)?,
            vote_bits: u16::var_deserialize(&mut src)?,
            height: u32::var_deserialize(&mut src)?,
            nonce: u32::var_deserialize(&mut src)?,
            hash: Cached::from(own_hash),
        })
    }
}

impl VarSerialize for Block {
    fn var_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.header.var_serialize(&mut writer)?;
        self.transactions.var_serialize(&mut writer)?;
        self.stake_transactions.var_serialize(&mut writer)
    }
}

impl VarDeserialize for Block {
    fn var_deserialize<R: Read>(reader: R) -> Result<Self, SerializationError> {
        let mut src = reader.take(MAX_BLOCK_BYTES);

        let header = Header::var_deserialize(&mut src)?;

        let mut trees: [Vec<Arc<Transaction>>; 2] = [Vec::new(), Vec::new()];
        for tree in trees.iter_mut() {
            let tx_count = CompactInt::var_deserialize(&mut src)?.value();
            // Sanity check the number of transactions to prevent DOS
            // attacks: every transaction is at least one outpoint long.
            if tx_count > MAX_BLOCK_BYTES / 37 {
                return Err(SerializationError::Parse(
                    "block claims more transactions than could possibly fit",
                ));
            }
            let mut transactions =
                Vec::with_capacity(tx_count.try_into().expect("count bounded by block size"));
            for _ in 0..tx_count {
                transactions.push(<Arc<Transaction>>::var_deserialize(&mut src)?);
            }
            *tree = transactions;
        }
        let [transactions, stake_transactions] = trees;

        Ok(Block {
            header,
            transactions,
            stake_transactions,
        })
    }
}
