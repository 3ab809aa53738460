//! Context-free transaction checks.
//!
//! Everything here can be decided from the transaction bytes alone; the
//! UTXO view, emission state, and network parameters are never
//! consulted.

use std::collections::{BTreeMap, HashSet};

use var_chain::{
    asset::AssetId,
    transaction::{Transaction, MAX_TX_SIZE},
};

use crate::error::TransactionError;

/// Checks that the transaction has inputs and outputs.
///
/// A transaction with no inputs can conjure value; one with no outputs
/// is pure relay spam. Both are structurally invalid.
pub fn has_inputs_and_outputs(tx: &Transaction) -> Result<(), TransactionError> {
    if tx.inputs.is_empty() {
        Err(TransactionError::NoInputs)
    } else if tx.outputs.is_empty() {
        Err(TransactionError::NoOutputs)
    } else {
        Ok(())
    }
}

/// Checks that the serialized transaction fits in the consensus size
/// limit.
pub fn tx_size_in_range(tx: &Transaction) -> Result<(), TransactionError> {
    let size = tx.serialized_size();
    if size as u64 > MAX_TX_SIZE {
        return Err(TransactionError::TxTooBig {
            size,
            limit: MAX_TX_SIZE as usize,
        });
    }
    Ok(())
}

/// Checks every output value against its asset's supply cap, and the
/// per-asset aggregate totals against the same cap.
///
/// Totals for different assets are independent; they are never added to
/// each other. The per-asset running total also guards the signed
/// 64-bit accumulator against overflow.
pub fn output_values_in_range(tx: &Transaction) -> Result<(), TransactionError> {
    let mut totals: BTreeMap<AssetId, i64> = BTreeMap::new();

    for (index, output) in tx.outputs.iter().enumerate() {
        let asset = output.asset_id;
        let value = output.value.atoms();
        if value < 0 || value > asset.max_atoms() {
            return Err(TransactionError::BadOutValue { asset, index });
        }

        let total = totals.entry(asset).or_insert(0);
        *total = total
            .checked_add(value)
            .ok_or(TransactionError::BadAssetTotal(asset))?;
        if *total > asset.max_atoms() {
            return Err(TransactionError::BadAssetTotal(asset));
        }
    }

    Ok(())
}

/// Checks that no previous outpoint is consumed twice.
///
/// Null inputs are exempt: they reference nothing.
pub fn no_duplicate_inputs(tx: &Transaction) -> Result<(), TransactionError> {
    let mut seen = HashSet::new();
    for input in tx.inputs.iter().filter(|input| !input.is_null()) {
        if !seen.insert(input.previous_outpoint) {
            return Err(TransactionError::DuplicateInputs(input.previous_outpoint));
        }
    }
    Ok(())
}

/// Runs every context-free check.
pub fn transaction_sanity(tx: &Transaction) -> Result<(), TransactionError> {
    has_inputs_and_outputs(tx)?;
    tx_size_in_range(tx)?;
    output_values_in_range(tx)?;
    no_duplicate_inputs(tx)?;
    Ok(())
}
