//! The SSFee stake-fee sub-protocol.
//!
//! Stake fee transactions route accumulated staker (`SF`) and miner
//! (`MF`) fees to recipients discovered from vote consolidation
//! addresses. They come in two forms: a null-input form minted by the
//! fee-sharing schedule, and a UTXO-augmented form that sweeps an
//! existing stake-tree output. Both forms follow the same rules.

use var_chain::{
    asset::AssetId,
    stake,
    transaction::Transaction,
    transparent::{is_stake_gen_p2pkh, Marker},
};

use crate::error::SSFeeError;

/// Which fee stream a stake fee transaction pays.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SsfeeKind {
    /// Staker fees for one voter of the referenced block.
    Staker { height: u32, voter_seq: u16 },
    /// Miner fees for the referenced block.
    Miner { height: u32 },
}

/// Checks the structural rules of a stake fee transaction and returns
/// its kind.
pub fn check_ssfee_transaction(tx: &Transaction) -> Result<SsfeeKind, SSFeeError> {
    if tx.inputs.len() != 1 {
        return Err(SSFeeError::MalformedStructure(
            "stake fee transactions carry exactly one input",
        ));
    }
    if tx.outputs.len() < 2 {
        return Err(SSFeeError::MalformedStructure(
            "stake fee transactions carry a marker and at least one payment",
        ));
    }

    let marker = stake::ssfee_marker(tx).ok_or(SSFeeError::MissingMarker)?;

    if !is_stake_gen_p2pkh(&tx.outputs[1].pk_script) {
        return Err(SSFeeError::MalformedStructure(
            "the first payment output must be a stake-tagged p2pkh",
        ));
    }

    // Every non-marker output must carry one and the same asset.
    let mut asset: Option<AssetId> = None;
    for output in tx.outputs.iter() {
        if Marker::parse(&output.pk_script).is_some() {
            continue;
        }
        match asset {
            None => asset = Some(output.asset_id),
            Some(existing) if existing != output.asset_id => {
                return Err(SSFeeError::MixedAssets);
            }
            Some(_) => {}
        }
    }

    match marker {
        Marker::SsfeeStaker { height, voter_seq } => Ok(SsfeeKind::Staker { height, voter_seq }),
        Marker::SsfeeMiner { height } => {
            // Miner VAR fees are paid directly by the coinbase; an MF
            // transaction in VAR would double-pay them.
            if asset == Some(AssetId::VAR) {
                return Err(SSFeeError::MinerVarNotAllowed);
            }
            Ok(SsfeeKind::Miner { height })
        }
        _ => unreachable!("ssfee_marker only returns SF and MF markers"),
    }
}

/// Extracts the consolidation address a vote declares.
///
/// A vote must carry exactly one `SC` output, positioned after the
/// block-reference output `[0]` and the vote-bits output `[1]`, and
/// before the final output if that final output is a treasury vote.
pub fn vote_consolidation_address(tx: &Transaction) -> Result<[u8; 20], SSFeeError> {
    let positions = stake::consolidation_positions(tx);
    let (index, hash160) = match positions.len() {
        0 => return Err(SSFeeError::MissingConsolidation),
        1 => positions[0],
        _ => {
            return Err(SSFeeError::MalformedStructure(
                "votes declare exactly one consolidation address",
            ))
        }
    };

    if index < 2 {
        return Err(SSFeeError::MalformedStructure(
            "the consolidation output must follow the block reference and vote bits",
        ));
    }
    let last = tx.outputs.len() - 1;
    let last_is_treasury_vote = matches!(
        Marker::parse(&tx.outputs[last].pk_script),
        Some(Marker::TreasuryVote)
    );
    if last_is_treasury_vote && index >= last {
        return Err(SSFeeError::MalformedStructure(
            "the consolidation output must precede the treasury vote",
        ));
    }

    Ok(hash160)
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use super::*;
    use var_chain::{
        amount::Amount,
        block,
        stake::{block_reference_script, determine_tx_type, vote_bits_script, TxType},
        transaction::LockTime,
        transparent::{
            consolidation_marker, ssfee_miner_marker, ssfee_staker_marker,
            stake_gen_pay_to_pubkey_hash, treasury_vote_marker, Input, OutPoint, Output, Script,
            Tree,
        },
    };

    fn output(value: i64, asset_id: AssetId, pk_script: Script) -> Output {
        Output {
            value: Amount::try_from(value).expect("valid test amount"),
            asset_id,
            script_version: 0,
            pk_script,
        }
    }

    fn stake_input() -> Input {
        Input {
            previous_outpoint: OutPoint {
                hash: var_chain::transaction::Hash([6u8; 32]),
                index: 0,
                tree: Tree::Stake,
            },
            sequence: 0,
            value_in: 1_000,
            block_height: 9,
            block_index: 0,
            signature_script: Script(vec![0x51]),
        }
    }

    fn ssfee(marker: Script, payment_asset: AssetId, null_input: bool) -> Transaction {
        let input = if null_input {
            Input::null(Script(Vec::new()))
        } else {
            stake_input()
        };
        Transaction::new(
            1,
            vec![input],
            vec![
                output(0, AssetId::VAR, marker),
                output(900, payment_asset, stake_gen_pay_to_pubkey_hash([3; 20])),
            ],
            LockTime::unlocked(),
            0,
        )
    }

    #[test]
    fn staker_fee_forms_are_valid() {
        var_test::init();

        for null_input in vec![true, false] {
            let tx = ssfee(ssfee_staker_marker(100, 1), AssetId::VAR, null_input);
            assert_eq!(determine_tx_type(&tx), TxType::SSFee);
            assert_eq!(
                check_ssfee_transaction(&tx),
                Ok(SsfeeKind::Staker {
                    height: 100,
                    voter_seq: 1
                })
            );
        }
    }

    #[test]
    fn miner_fees_may_not_use_var() {
        var_test::init();

        let tx = ssfee(ssfee_miner_marker(100), AssetId::VAR, true);
        assert_eq!(
            check_ssfee_transaction(&tx),
            Err(SSFeeError::MinerVarNotAllowed)
        );

        let tx = ssfee(ssfee_miner_marker(100), AssetId(1), true);
        assert_eq!(
            check_ssfee_transaction(&tx),
            Ok(SsfeeKind::Miner { height: 100 })
        );
    }

    #[test]
    fn mixed_assets_are_rejected() {
        var_test::init();

        let mut tx = ssfee(ssfee_staker_marker(100, 0), AssetId(1), true);
        tx.outputs.push(output(
            10,
            AssetId(2),
            stake_gen_pay_to_pubkey_hash([5; 20]),
        ));
        assert_eq!(check_ssfee_transaction(&tx), Err(SSFeeError::MixedAssets));
    }

    #[test]
    fn payment_output_shape_is_enforced() {
        var_test::init();

        let mut tx = ssfee(ssfee_staker_marker(100, 0), AssetId(1), true);
        // untagged p2pkh is not acceptable for the stake tree
        tx.outputs[1].pk_script = var_chain::transparent::pay_to_pubkey_hash([3; 20]);
        assert!(matches!(
            check_ssfee_transaction(&tx),
            Err(SSFeeError::MalformedStructure(_))
        ));
    }

    #[test]
    fn missing_marker_is_rejected() {
        var_test::init();

        let tx = Transaction::new(
            1,
            vec![stake_input()],
            vec![
                output(0, AssetId::VAR, Script(vec![0x6a, 0x01, 0x00])),
                output(900, AssetId(1), stake_gen_pay_to_pubkey_hash([3; 20])),
            ],
            LockTime::unlocked(),
            0,
        );
        assert_eq!(check_ssfee_transaction(&tx), Err(SSFeeError::MissingMarker));
    }

    fn vote(outputs: Vec<Output>) -> Transaction {
        let mut all = vec![
            output(
                0,
                AssetId::VAR,
                block_reference_script(block::Hash([1; 32]), 10),
            ),
            output(0, AssetId::VAR, vote_bits_script(1)),
        ];
        all.extend(outputs);
        Transaction::new(
            1,
            vec![Input::null(Script(Vec::new())), stake_input()],
            all,
            LockTime::unlocked(),
            0,
        )
    }

    #[test]
    fn consolidation_is_extracted_from_votes() {
        var_test::init();

        let tx = vote(vec![
            output(0, AssetId::VAR, consolidation_marker([0xaa; 20])),
            output(500, AssetId::VAR, stake_gen_pay_to_pubkey_hash([2; 20])),
        ]);
        assert_eq!(determine_tx_type(&tx), TxType::Vote);
        assert_eq!(vote_consolidation_address(&tx), Ok([0xaa; 20]));
    }

    #[test]
    fn consolidation_may_precede_a_trailing_treasury_vote() {
        var_test::init();

        let tx = vote(vec![
            output(500, AssetId::VAR, stake_gen_pay_to_pubkey_hash([2; 20])),
            output(0, AssetId::VAR, consolidation_marker([0xbb; 20])),
            output(0, AssetId::VAR, treasury_vote_marker(&[1])),
        ]);
        assert_eq!(vote_consolidation_address(&tx), Ok([0xbb; 20]));

        // but not after it
        let tx = vote(vec![
            output(500, AssetId::VAR, stake_gen_pay_to_pubkey_hash([2; 20])),
            output(0, AssetId::VAR, treasury_vote_marker(&[1])),
        ]);
        // consolidation entirely missing here
        assert_eq!(
            vote_consolidation_address(&tx),
            Err(SSFeeError::MissingConsolidation)
        );
    }

    #[test]
    fn exactly_one_consolidation_is_required() {
        var_test::init();

        let tx = vote(vec![
            output(0, AssetId::VAR, consolidation_marker([0xaa; 20])),
            output(0, AssetId::VAR, consolidation_marker([0xbb; 20])),
            output(500, AssetId::VAR, stake_gen_pay_to_pubkey_hash([2; 20])),
        ]);
        assert!(matches!(
            vote_consolidation_address(&tx),
            Err(SSFeeError::MalformedStructure(_))
        ));
    }
}
