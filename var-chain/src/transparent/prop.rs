use proptest::prelude::*;
use std::io::Cursor;

use super::*;
use crate::serialization::{VarDeserialize, VarDeserializeInto, VarSerialize};

proptest! {
    #[test]
    fn output_roundtrip(output in any::<Output>()) {
        var_test::init();

        let data = output.var_serialize_to_vec().expect("output should serialize");
        let output2 = data.as_slice().var_deserialize_into().expect("randomized output should deserialize");

        prop_assert_eq![output, output2];
    }

    #[test]
    fn outpoint_roundtrip(outpoint in any::<OutPoint>()) {
        var_test::init();

        let mut bytes = Cursor::new(Vec::new());
        outpoint.var_serialize(&mut bytes)?;
        prop_assert_eq![bytes.get_ref().len(), OutPoint::len()];

        bytes.set_position(0);
        let other_outpoint = OutPoint::var_deserialize(&mut bytes)?;

        prop_assert_eq![outpoint, other_outpoint];
    }

    #[test]
    fn output_roundtrip_every_asset(asset in any::<u8>(), value in 0i64..=1_000_000_000) {
        var_test::init();

        let output = Output {
            value: std::convert::TryFrom::try_from(value).expect("in range"),
            asset_id: crate::asset::AssetId(asset),
            script_version: 0,
            pk_script: pay_to_pubkey_hash([0x31; 20]),
        };
        let data = output.var_serialize_to_vec().expect("output should serialize");
        prop_assert_eq![data[8], asset];

        let output2 = Output::var_deserialize(&data[..]).expect("output should deserialize");
        prop_assert_eq![output, output2];
    }
}
