//! Per-asset value conservation and fee calculation.
//!
//! Fees are computed independently for every asset id: a surplus of one
//! asset can never offset a deficit of another, and a negative fee for
//! any single asset rejects the transaction.

use std::collections::BTreeMap;
use std::convert::TryFrom;

use var_chain::{
    amount::{Amount, NonNegative},
    asset::AssetId,
    transaction::Transaction,
};
use var_state::utxo::UtxoView;

use crate::error::TransactionError;

/// The fees a transaction or block pays, keyed by asset id.
///
/// Only strictly positive fees appear; an asset whose inputs exactly
/// match its outputs contributes nothing.
pub type FeesByAsset = BTreeMap<AssetId, Amount<NonNegative>>;

/// Computes the per-asset fees paid by `tx`, consuming entries from
/// `view`.
///
/// Transactions with a null input (coinbase, stakebase, treasury base,
/// SKA emission, and the null-input stake fee form) create or route
/// value by other rules and pay no fees here; they yield an empty map.
pub fn transaction_fees(
    tx: &Transaction,
    view: &UtxoView,
) -> Result<FeesByAsset, TransactionError> {
    if tx.inputs.iter().any(|input| input.is_null()) {
        return Ok(FeesByAsset::new());
    }

    let mut input_sums: BTreeMap<AssetId, i64> = BTreeMap::new();
    for input in tx.inputs.iter() {
        let entry = view
            .lookup(&input.previous_outpoint)
            .ok_or(TransactionError::MissingUtxo(input.previous_outpoint))?;
        let sum = input_sums.entry(entry.asset_id()).or_insert(0);
        *sum = sum
            .checked_add(entry.value().atoms())
            .ok_or(TransactionError::ValueOverflow)?;
    }

    let mut output_sums: BTreeMap<AssetId, i64> = BTreeMap::new();
    for output in tx.outputs.iter() {
        let sum = output_sums.entry(output.asset_id).or_insert(0);
        *sum = sum
            .checked_add(output.value.atoms())
            .ok_or(TransactionError::ValueOverflow)?;
    }

    // An asset spent without being supplied is a deficit, so walk the
    // output side first.
    for (&asset, &spent) in output_sums.iter() {
        let supplied = input_sums.get(&asset).copied().unwrap_or(0);
        if supplied < spent {
            return Err(TransactionError::InsufficientAssetInputs(asset));
        }
    }

    let mut fees = FeesByAsset::new();
    for (&asset, &supplied) in input_sums.iter() {
        let spent = output_sums.get(&asset).copied().unwrap_or(0);
        let fee = supplied - spent;
        if fee > 0 {
            let fee = Amount::try_from(fee).map_err(|_| TransactionError::ValueOverflow)?;
            fees.insert(asset, fee);
        }
    }
    Ok(fees)
}

/// Folds `more` into `total`, asset by asset.
pub fn accumulate_fees(total: &mut FeesByAsset, more: FeesByAsset) -> Result<(), TransactionError> {
    for (asset, fee) in more {
        let entry = total.entry(asset).or_insert_with(Amount::zero);
        *entry = (*entry + fee).map_err(|_| TransactionError::ValueOverflow)?;
    }
    Ok(())
}
