use std::convert::TryFrom;

use proptest::prelude::*;
use std::io::Cursor;

use super::*;

use crate::amount::Amount;
use crate::asset::AssetId;
use crate::serialization::{VarDeserialize, VarDeserializeInto, VarSerialize};
use crate::transparent::{self, pay_to_pubkey_hash, Script};

proptest! {
    #[test]
    fn transaction_roundtrip(tx in any::<Transaction>()) {
        var_test::init();

        let data = tx.var_serialize_to_vec().expect("tx should serialize");
        let tx2 = data.as_slice().var_deserialize_into().expect("randomized tx should deserialize");

        prop_assert_eq![tx, tx2];
    }

    #[test]
    fn transaction_serialized_size_is_exact(tx in any::<Transaction>()) {
        var_test::init();

        let data = tx.var_serialize_to_vec().expect("tx should serialize");
        prop_assert_eq![data.len(), tx.serialized_size()];
    }

    #[test]
    fn transaction_hash_display_fromstr_roundtrip(hash in any::<Hash>()) {
        var_test::init();

        let display = format!("{}", hash);
        let parsed = display.parse::<Hash>().expect("hash should parse");
        prop_assert_eq!(hash, parsed);
    }

    #[test]
    fn locktime_roundtrip(locktime in any::<LockTime>()) {
        var_test::init();

        let mut bytes = Cursor::new(Vec::new());
        locktime.var_serialize(&mut bytes)?;

        bytes.set_position(0);
        let other_locktime = LockTime::var_deserialize(&mut bytes)?;

        prop_assert_eq![locktime, other_locktime];
    }
}

fn example_transaction() -> Transaction {
    Transaction::new(
        1,
        vec![transparent::Input {
            previous_outpoint: transparent::OutPoint {
                hash: Hash([7u8; 32]),
                index: 2,
                tree: transparent::Tree::Regular,
            },
            sequence: 0xffff_ffff,
            value_in: 5_000,
            block_height: 10,
            block_index: 1,
            signature_script: Script(vec![0x51]),
        }],
        vec![transparent::Output {
            value: Amount::try_from(4_000i64).expect("valid"),
            asset_id: AssetId::VAR,
            script_version: 0,
            pk_script: pay_to_pubkey_hash([0x10; 20]),
        }],
        LockTime::unlocked(),
        0,
    )
}

#[test]
fn no_witness_form_drops_signature_scripts() {
    var_test::init();

    let tx = example_transaction();
    let full = tx.var_serialize_to_vec().expect("serialize full");
    let prefix = tx
        .var_serialize_no_witness_to_vec()
        .expect("serialize no-witness");

    assert!(prefix.len() < full.len());
    // the serialization type is encoded in the version word's high bits
    assert_eq!(prefix[2..4], [1, 0]);
    assert_eq!(full[2..4], [0, 0]);

    let reparsed = Transaction::var_deserialize(&prefix[..]).expect("no-witness parse");
    assert_eq!(reparsed.inputs[0].signature_script, Script(Vec::new()));
    assert_eq!(reparsed.outputs, tx.outputs);
}

#[test]
fn witness_count_must_match_input_count() {
    var_test::init();

    let tx = example_transaction();
    let mut data = tx.var_serialize_to_vec().expect("serialize full");

    // The witness count varint sits immediately after lock time and
    // expiry; corrupt it.
    let witness_count_offset = data.len()
        - (8 + 4 + 4 + tx.inputs[0].signature_script.serialized_size())
        - 1;
    data[witness_count_offset] = 2;
    assert!(Transaction::var_deserialize(&data[..]).is_err());
}

#[test]
fn null_input_detection() {
    var_test::init();

    let mut tx = example_transaction();
    assert!(!tx.has_single_null_input());

    tx.inputs = vec![transparent::Input::null(Script(Vec::new()))];
    assert!(tx.has_single_null_input());
}
