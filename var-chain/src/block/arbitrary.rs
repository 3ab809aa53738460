use proptest::{collection::vec, prelude::*};
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use super::*;
use crate::transaction::Transaction;
use crate::work::difficulty::CompactDifficulty;

impl Arbitrary for Header {
    type Parameters = ();

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (
            any::<u32>(),
            any::<Hash>(),
            any::<merkle::Root>(),
            any::<merkle::Root>(),
            // block times are u32 seconds on the wire
            (0i64..=u32::MAX as i64).prop_map(|secs| Utc.timestamp(secs, 0)),
            any::<CompactDifficulty>(),
            any::<u16>(),
            (Height::MIN.0..=Height::MAX.0),
            any::<u32>(),
        )
            .prop_map(
                |(
                    version,
                    previous_block_hash,
                    merkle_root,
                    stake_root,
                    time,
                    difficulty_threshold,
                    vote_bits,
                    height,
                    nonce,
                )| {
                    Header::new(
                        version,
                        previous_block_hash,
                        merkle_root,
                        stake_root,
                        time,
                        difficulty_threshold,
                        vote_bits,
                        height,
                        nonce,
                    )
                },
            )
            .boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}

impl Arbitrary for Block {
    type Parameters = ();

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (
            any::<Header>(),
            vec(any::<Transaction>().prop_map(Arc::new), 0..3),
            vec(any::<Transaction>().prop_map(Arc::new), 0..3),
        )
            .prop_map(|(header, transactions, stake_transactions)| Block {
                header,
                transactions,
                stake_transactions,
            })
            .boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}
