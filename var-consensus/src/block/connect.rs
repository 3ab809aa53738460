//! The block connect/disconnect orchestrator.
//!
//! `connect_block` drives every contextual rule against a candidate
//! block: per-transaction sanity, per-asset conservation, SKA emission
//! authorization, stake fee structure, asset activation, and the
//! coinbase fee-distribution contract. On success it leaves the UTXO
//! view updated and returns the [`BlockDeltas`] the state layer must
//! record; on any failure the view is rolled back to its pre-block
//! contents and nothing else changes.
//!
//! Emission and burn ledger transitions are returned as deltas rather
//! than applied in place, so the short write-lock critical sections in
//! `var-state` stay outside rule checking entirely: validate first,
//! then [`apply_deltas`] under the lock, then persist.

use tracing::debug;

use var_chain::{
    amount::{Amount, NonNegative},
    asset::AssetId,
    block::{Block, Height},
    stake::{determine_tx_type, TxType},
    transaction::Transaction,
    transparent::{Marker, OutPoint, Tree},
};
use var_state::{
    burn::BurnState,
    emission::EmissionState,
    utxo::{TxUndo, UtxoView},
};

use crate::chain_state::ChainState;
use crate::error::{BlockError, EmissionError};
use crate::transaction::emission::{check_emission_transaction, EmissionOutcome};
use crate::transaction::fees::{accumulate_fees, transaction_fees, FeesByAsset};
use crate::transaction::ssfee::{check_ssfee_transaction, vote_consolidation_address};
use crate::transaction::check::transaction_sanity;

use super::check::{coinbase_is_first, subsidy_is_valid};
use super::subsidy::block_subsidy;

/// A consolidation address discovered from a vote, routing the next
/// epoch's staker fees.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationRecord {
    /// Staker fees consolidate in the native asset.
    pub asset_id: AssetId,
    pub hash160: [u8; 20],
}

/// Everything a connected block changed, in the order it changed it.
///
/// The same value drives the reverse walk on disconnect.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BlockDeltas {
    /// The connected block's height.
    pub height: Height,
    /// Aggregate per-asset fees collected by the block.
    pub fees: FeesByAsset,
    /// Per-transaction UTXO undo data, in application order.
    pub tx_undo: Vec<TxUndo>,
    /// Accepted SKA emissions (at most one per asset).
    pub emissions: Vec<EmissionOutcome>,
    /// Burned atoms per burn output, in block order.
    pub burns: Vec<(AssetId, Amount<NonNegative>)>,
    /// Consolidation addresses declared by this block's votes.
    pub consolidations: Vec<ConsolidationRecord>,
    /// Parent regular-tree outpoints hidden by this block's
    /// disapproving vote bits.
    pub disapproved_parent: Vec<OutPoint>,
}

/// Connects `block` at its header height against `view` and `state`.
///
/// `parent_approved` is the verdict of this block's vote bits over its
/// parent's regular tree; a disapproved parent's regular-tree outputs
/// are hidden before any of this block's transactions run.
pub fn connect_block(
    block: &Block,
    parent_approved: bool,
    view: &mut UtxoView,
    state: &impl ChainState,
) -> Result<BlockDeltas, BlockError> {
    let mut deltas = BlockDeltas {
        height: block.height(),
        ..BlockDeltas::default()
    };

    match connect_inner(block, parent_approved, view, state, &mut deltas) {
        Ok(()) => {
            debug!(
                height = block.height().0,
                fees = deltas.fees.len(),
                emissions = deltas.emissions.len(),
                "connected block"
            );
            Ok(deltas)
        }
        Err(error) => {
            // Roll the view back to its pre-block contents; the undo
            // data is exact, so these reversals cannot fail.
            for undo in deltas.tx_undo.iter().rev() {
                view.undo_transaction(undo)
                    .expect("undo data matches the partially applied block");
            }
            view.restore_disapproved(&deltas.disapproved_parent)
                .expect("disapproval data matches the partially applied block");
            Err(error)
        }
    }
}

fn connect_inner(
    block: &Block,
    parent_approved: bool,
    view: &mut UtxoView,
    state: &impl ChainState,
    deltas: &mut BlockDeltas,
) -> Result<(), BlockError> {
    let height = block.height();
    let coinbase = coinbase_is_first(block)?;

    if !parent_approved {
        let parent_height = Height(height.0.saturating_sub(1));
        deltas.disapproved_parent = view.disapprove_regular_tree(parent_height);
    }

    // Stake tree first, then the regular tree behind its coinbase; the
    // coinbase itself waits until the block's fees are known.
    for (index, tx) in block.stake_transactions.iter().enumerate() {
        connect_transaction(tx, Tree::Stake, index as u32, height, view, state, deltas)?;
    }
    for (index, tx) in block.transactions.iter().enumerate().skip(1) {
        connect_transaction(tx, Tree::Regular, index as u32, height, view, state, deltas)?;
    }

    transaction_sanity(coinbase).map_err(|error| BlockError::from_tx(coinbase.hash(), error))?;
    let subsidy = block_subsidy(height, state.chain_params())?;
    subsidy_is_valid(block, subsidy, &deltas.fees)?;

    let undo = view
        .apply_transaction(coinbase, Tree::Regular, height, 0, TxType::Coinbase)
        .map_err(BlockError::Utxo)?;
    deltas.tx_undo.push(undo);

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn connect_transaction(
    tx: &Transaction,
    tree: Tree,
    index: u32,
    height: Height,
    view: &mut UtxoView,
    state: &impl ChainState,
    deltas: &mut BlockDeltas,
) -> Result<(), BlockError> {
    let hash = tx.hash();
    let fail = |error: crate::error::TransactionError| BlockError::from_tx(hash, error);

    transaction_sanity(tx).map_err(fail)?;
    let tx_type = determine_tx_type(tx);

    match tx_type {
        TxType::SkaEmission => {
            let outcome = check_emission_transaction(tx, height, state).map_err(|e| fail(e.into()))?;
            if deltas
                .emissions
                .iter()
                .any(|existing| existing.asset_id == outcome.asset_id)
            {
                return Err(fail(
                    EmissionError::MultipleEmissionsSameAsset(outcome.asset_id).into(),
                ));
            }
            deltas.emissions.push(outcome);
        }
        TxType::SSFee => {
            check_ssfee_transaction(tx).map_err(|e| fail(e.into()))?;
        }
        TxType::Vote => {
            let hash160 = vote_consolidation_address(tx).map_err(|e| fail(e.into()))?;
            deltas.consolidations.push(ConsolidationRecord {
                asset_id: AssetId::VAR,
                hash160,
            });
        }
        _ => {}
    }

    // Every SKA asset moving in a non-emission output must be active on
    // this network.
    if tx_type != TxType::SkaEmission {
        for output in tx.outputs.iter() {
            if output.asset_id.is_ska() && !state.chain_params().is_asset_active(output.asset_id) {
                return Err(BlockError::InactiveAsset(output.asset_id));
            }
        }
    }

    let fees = transaction_fees(tx, view).map_err(fail)?;
    accumulate_fees(&mut deltas.fees, fees).map_err(fail)?;

    for (asset_id, amount) in burn_outputs(tx) {
        deltas.burns.push((asset_id, amount));
    }

    let undo = view
        .apply_transaction(tx, tree, height, index, tx_type)
        .map_err(|error| match error {
            var_state::utxo::UtxoError::MissingUtxo(op) => {
                fail(crate::error::TransactionError::MissingUtxo(op))
            }
            other => BlockError::Utxo(other),
        })?;
    deltas.tx_undo.push(undo);

    Ok(())
}

/// The burn outputs of a transaction: a burn requires a matching
/// SKA-burn marker, an SKA asset id, and a non-zero value.
fn burn_outputs(tx: &Transaction) -> Vec<(AssetId, Amount<NonNegative>)> {
    tx.outputs
        .iter()
        .filter_map(|output| match Marker::parse(&output.pk_script) {
            Some(Marker::SkaBurn { asset_id })
                if asset_id == output.asset_id
                    && output.asset_id.is_ska()
                    && output.value.atoms() > 0 =>
            {
                Some((asset_id, output.value))
            }
            _ => None,
        })
        .collect()
}

/// Disconnects a block previously connected with [`connect_block`],
/// using the deltas it returned. Strictly the reverse walk: undo UTXO
/// deltas newest-first, then restore disapproved parent entries.
pub fn disconnect_block(
    block: &Block,
    view: &mut UtxoView,
    deltas: &BlockDeltas,
) -> Result<(), BlockError> {
    debug_assert_eq!(block.height(), deltas.height);

    for undo in deltas.tx_undo.iter().rev() {
        view.undo_transaction(undo)?;
    }
    view.restore_disapproved(&deltas.disapproved_parent)?;

    debug!(height = deltas.height.0, "disconnected block");
    Ok(())
}

/// Applies a connected block's emission and burn transitions to the
/// shared state managers.
///
/// Called after [`connect_block`] succeeds and before the persistence
/// commit, so the bucket rewrite inside the commit sees the new state.
pub fn apply_deltas(
    deltas: &BlockDeltas,
    emissions: &EmissionState,
    burns: &BurnState,
) -> Result<(), BlockError> {
    for outcome in deltas.emissions.iter() {
        emissions
            .connect_emission(outcome.asset_id, outcome.nonce)
            .map_err(|e| BlockError::State(e.to_string()))?;
    }
    for (asset_id, amount) in deltas.burns.iter() {
        burns
            .connect_burn(*asset_id, amount.atoms())
            .map_err(|e| BlockError::State(e.to_string()))?;
    }
    Ok(())
}

/// Reverses [`apply_deltas`] on disconnect, newest-first.
pub fn revert_deltas(
    deltas: &BlockDeltas,
    emissions: &EmissionState,
    burns: &BurnState,
) -> Result<(), BlockError> {
    for (asset_id, amount) in deltas.burns.iter().rev() {
        burns
            .disconnect_burn(*asset_id, amount.atoms())
            .map_err(|e| BlockError::State(e.to_string()))?;
    }
    for outcome in deltas.emissions.iter().rev() {
        emissions
            .disconnect_emission(outcome.asset_id, outcome.nonce)
            .map_err(|e| BlockError::State(e.to_string()))?;
    }
    Ok(())
}
