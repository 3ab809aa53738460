//! Structural classification of transactions.
//!
//! The stake sub-protocols (tickets, votes, revocations, stake fees) and
//! the SKA emission protocol are all recognised by transaction *shape*:
//! marker scripts and input/output structure. Classification never
//! consults chain state; rule enforcement happens in `var-consensus`
//! using the type determined here.

use crate::transaction::Transaction;
use crate::transparent::{
    has_emission_script_prefix, Marker, Script, OP_RETURN, OP_SSRTX, OP_SSTX, OP_TADD, OP_TSPEND,
};

/// The structural type of a transaction.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TxType {
    /// An ordinary value transfer.
    Regular,
    /// The block reward transaction, first in the regular tree.
    Coinbase,
    /// A stake ticket purchase.
    Ticket,
    /// A vote (SSGen) cast by a called ticket.
    Vote,
    /// A revocation of a missed or expired ticket.
    Revocation,
    /// A staker or miner fee payment.
    SSFee,
    /// A treasury deposit.
    TreasuryAdd,
    /// A treasury disbursement.
    TreasurySpend,
    /// A one-time SKA asset emission.
    SkaEmission,
}

impl TxType {
    /// The storage encoding of this type.
    pub fn to_byte(self) -> u8 {
        match self {
            TxType::Regular => 0,
            TxType::Coinbase => 1,
            TxType::Ticket => 2,
            TxType::Vote => 3,
            TxType::Revocation => 4,
            TxType::SSFee => 5,
            TxType::TreasuryAdd => 6,
            TxType::TreasurySpend => 7,
            TxType::SkaEmission => 8,
        }
    }

    pub fn from_byte(byte: u8) -> Option<TxType> {
        match byte {
            0 => Some(TxType::Regular),
            1 => Some(TxType::Coinbase),
            2 => Some(TxType::Ticket),
            3 => Some(TxType::Vote),
            4 => Some(TxType::Revocation),
            5 => Some(TxType::SSFee),
            6 => Some(TxType::TreasuryAdd),
            7 => Some(TxType::TreasurySpend),
            8 => Some(TxType::SkaEmission),
            _ => None,
        }
    }
}

/// Classifies a transaction by marker scripts and structure.
///
/// Stake fee transactions are classified by their marker whether their
/// single input is null or spends a stake-tree UTXO; the two forms are
/// deliberately indistinguishable to the rest of validation.
pub fn determine_tx_type(tx: &Transaction) -> TxType {
    if is_ska_emission(tx) {
        TxType::SkaEmission
    } else if is_ssfee(tx) {
        TxType::SSFee
    } else if is_vote(tx) {
        TxType::Vote
    } else if is_ticket(tx) {
        TxType::Ticket
    } else if is_revocation(tx) {
        TxType::Revocation
    } else if is_treasury_spend(tx) {
        TxType::TreasurySpend
    } else if is_treasury_add(tx) {
        TxType::TreasuryAdd
    } else if tx.has_single_null_input() {
        TxType::Coinbase
    } else {
        TxType::Regular
    }
}

/// Returns true for the SKA emission shape: a single null input whose
/// signature script opens with the emission marker, and at least one
/// output, all carrying SKA asset types.
pub fn is_ska_emission(tx: &Transaction) -> bool {
    tx.has_single_null_input()
        && has_emission_script_prefix(&tx.inputs[0].signature_script)
        && !tx.outputs.is_empty()
        && tx.outputs.iter().all(|o| o.asset_id.is_ska())
}

/// Returns true for the stake fee shape: exactly one input, at least
/// two outputs, and exactly one staker (`SF`) or miner (`MF`) marker.
pub fn is_ssfee(tx: &Transaction) -> bool {
    tx.inputs.len() == 1 && tx.outputs.len() >= 2 && ssfee_marker(tx).is_some()
}

/// The single stake fee marker of a transaction, if there is exactly one.
pub fn ssfee_marker(tx: &Transaction) -> Option<Marker> {
    let mut found = None;
    for output in tx.outputs.iter() {
        match Marker::parse(&output.pk_script) {
            Some(marker @ Marker::SsfeeStaker { .. }) | Some(marker @ Marker::SsfeeMiner { .. }) => {
                if found.is_some() {
                    return None;
                }
                found = Some(marker);
            }
            _ => continue,
        }
    }
    found
}

/// Returns true for the vote (SSGen) shape: a null stakebase input plus
/// the ticket input, a block-reference output, and a vote-bits output.
pub fn is_vote(tx: &Transaction) -> bool {
    tx.inputs.len() == 2
        && tx.inputs[0].is_null()
        && tx.outputs.len() >= 3
        && is_block_reference_script(&tx.outputs[0].pk_script)
        && is_vote_bits_script(&tx.outputs[1].pk_script)
}

/// Returns true for the ticket (SStx) shape.
pub fn is_ticket(tx: &Transaction) -> bool {
    !tx.has_single_null_input() && first_output_opcode(tx) == Some(OP_SSTX)
}

/// Returns true for the revocation (SSRtx) shape.
pub fn is_revocation(tx: &Transaction) -> bool {
    !tx.has_single_null_input() && first_output_opcode(tx) == Some(OP_SSRTX)
}

/// Returns true for the treasury deposit shape.
pub fn is_treasury_add(tx: &Transaction) -> bool {
    first_output_opcode(tx) == Some(OP_TADD)
}

/// Returns true for the treasury disbursement shape.
pub fn is_treasury_spend(tx: &Transaction) -> bool {
    tx.has_single_null_input() && first_output_opcode(tx) == Some(OP_TSPEND)
}

fn first_output_opcode(tx: &Transaction) -> Option<u8> {
    tx.outputs.get(0).and_then(|o| o.pk_script.as_bytes().first()).copied()
}

/// The block-reference output of a vote: `OP_RETURN push36` carrying the
/// voted-on block hash and height.
fn is_block_reference_script(script: &Script) -> bool {
    let s = script.as_bytes();
    s.len() == 38 && s[0] == OP_RETURN && s[1] == 36
}

/// The vote-bits output of a vote: `OP_RETURN push2`.
fn is_vote_bits_script(script: &Script) -> bool {
    let s = script.as_bytes();
    s.len() == 4 && s[0] == OP_RETURN && s[1] == 2
}

/// Builds a vote's block-reference output script.
pub fn block_reference_script(hash: crate::block::Hash, height: u32) -> Script {
    let mut data = Vec::with_capacity(38);
    data.push(OP_RETURN);
    data.push(36);
    data.extend_from_slice(&hash.0);
    data.extend_from_slice(&height.to_le_bytes());
    Script(data)
}

/// Builds a vote's vote-bits output script.
pub fn vote_bits_script(vote_bits: u16) -> Script {
    let mut data = Vec::with_capacity(4);
    data.push(OP_RETURN);
    data.push(2);
    data.extend_from_slice(&vote_bits.to_le_bytes());
    Script(data)
}

/// The consolidation (`SC`) markers of a transaction, with their output
/// positions.
///
/// Votes are required to carry exactly one; the positional rule is
/// enforced during validation.
pub fn consolidation_positions(tx: &Transaction) -> Vec<(usize, [u8; 20])> {
    tx.outputs
        .iter()
        .enumerate()
        .filter_map(|(index, output)| match Marker::parse(&output.pk_script) {
            Some(Marker::Consolidation { hash160 }) => Some((index, hash160)),
            _ => None,
        })
        .collect()
}
