use proptest::prelude::*;

use super::*;
use crate::serialization::{VarDeserialize, VarDeserializeInto, VarSerialize};

proptest! {
    #[test]
    fn header_roundtrip(header in any::<Header>()) {
        var_test::init();

        let data = header.var_serialize_to_vec().expect("header should serialize");
        prop_assert_eq![data.len(), Header::len()];

        let header2: Header = data.as_slice().var_deserialize_into().expect("header should deserialize");
        prop_assert_eq![header, header2];
        // deserialization caches the hash of the exact bytes parsed
        prop_assert_eq![header.hash(), header2.hash()];
    }

    #[test]
    fn block_roundtrip(block in any::<Block>()) {
        var_test::init();

        let data = block.var_serialize_to_vec().expect("block should serialize");
        let block2: Block = data.as_slice().var_deserialize_into().expect("block should deserialize");

        prop_assert_eq![block, block2];
    }

    #[test]
    fn parent_approval_tracks_vote_bit(vote_bits in any::<u16>()) {
        var_test::init();

        let mut header = any_header();
        header.vote_bits = vote_bits;
        prop_assert_eq![
            header.approves_parent(),
            vote_bits & VOTE_BITS_APPROVE_PARENT != 0
        ];
    }
}

fn any_header() -> Header {
    use crate::work::difficulty::CompactDifficulty;
    use chrono::{TimeZone, Utc};

    Header::new(
        1,
        Hash([0u8; 32]),
        merkle::Root([0u8; 32]),
        merkle::Root([0u8; 32]),
        Utc.timestamp(1_600_000_000, 0),
        CompactDifficulty(0x1d00_ffff),
        VOTE_BITS_APPROVE_PARENT,
        5,
        0,
    )
}
