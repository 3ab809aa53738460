//! Consensus check functions for whole blocks.

use std::collections::BTreeMap;
use std::sync::Arc;

use var_chain::{
    amount::{Amount, NonNegative},
    asset::AssetId,
    block::Block,
    stake::{determine_tx_type, TxType},
    transaction::Transaction,
};

use crate::error::{BlockError, CoinbaseError, SubsidyError, TransactionError};
use crate::transaction::fees::FeesByAsset;

/// Returns the coinbase if there is exactly one coinbase transaction in
/// `block`'s regular tree, and it is the first transaction there.
///
/// The coinbase collects and spends the miner subsidy and the
/// per-asset transaction fees paid by transactions included in the
/// block.
pub fn coinbase_is_first(block: &Block) -> Result<&Arc<Transaction>, BlockError> {
    let first = block.transactions.get(0).ok_or(BlockError::NoTransactions)?;
    if determine_tx_type(first) != TxType::Coinbase {
        return Err(BlockError::from_tx(
            first.hash(),
            TransactionError::CoinbasePosition,
        ));
    }
    for tx in block.transactions.iter().skip(1) {
        if determine_tx_type(tx) == TxType::Coinbase {
            return Err(BlockError::from_tx(
                tx.hash(),
                TransactionError::CoinbaseInputFound,
            ));
        }
    }
    Ok(first)
}

/// Validates the coinbase multi-output fee-distribution contract.
///
/// The coinbase aggregates the block's per-asset fees into exactly one
/// output per fee-bearing asset, plus the always-present VAR output
/// paying `subsidy + VAR fees`. Outputs are ordered by asset id and all
/// pay the same script.
pub fn coinbase_distribution(
    coinbase: &Transaction,
    subsidy: Amount<NonNegative>,
    fees: &FeesByAsset,
) -> Result<(), CoinbaseError> {
    // The expected value per asset: VAR always appears, every other
    // asset exactly when it collected fees.
    let mut expected: BTreeMap<AssetId, i64> = BTreeMap::new();
    expected.insert(AssetId::VAR, subsidy.atoms());
    for (&asset, fee) in fees.iter() {
        let slot = expected.entry(asset).or_insert(0);
        *slot += fee.atoms();
    }

    let mut seen: BTreeMap<AssetId, i64> = BTreeMap::new();
    let mut previous: Option<AssetId> = None;
    let mut pk_script = None;
    for output in coinbase.outputs.iter() {
        match previous {
            Some(prev) if output.asset_id == prev => {
                return Err(CoinbaseError::DuplicateAssetOutput(output.asset_id));
            }
            Some(prev) if output.asset_id < prev => {
                return Err(CoinbaseError::BadCoinbaseMultiOutput(
                    "outputs are not in ascending asset order",
                ));
            }
            _ => {}
        }
        previous = Some(output.asset_id);

        match &pk_script {
            None => pk_script = Some(&output.pk_script),
            Some(script) if *script != &output.pk_script => {
                return Err(CoinbaseError::BadCoinbaseMultiOutput(
                    "outputs must share a single payment script",
                ));
            }
            Some(_) => {}
        }

        seen.insert(output.asset_id, output.value.atoms());
    }

    if !seen.contains_key(&AssetId::VAR) {
        return Err(CoinbaseError::MissingVarSubsidyOutput);
    }

    for (&asset, &actual) in seen.iter() {
        match expected.get(&asset) {
            None => {
                return Err(CoinbaseError::BadCoinbaseMultiOutput(
                    "output pays an asset that collected no fees",
                ));
            }
            Some(&expected_value) if expected_value != actual => {
                return Err(CoinbaseError::BadCoinbaseFeeDistribution {
                    asset,
                    expected: expected_value,
                    actual,
                });
            }
            Some(_) => {}
        }
    }
    for &asset in expected.keys() {
        if !seen.contains_key(&asset) {
            return Err(CoinbaseError::BadCoinbaseMultiOutput(
                "a fee-bearing asset has no coinbase output",
            ));
        }
    }

    Ok(())
}

/// Returns `Ok(())` if the coinbase pays no more than the subsidy plus
/// fees require.
///
/// This is the outer guard over [`coinbase_distribution`], mapping a
/// missing coinbase to a subsidy error.
pub fn subsidy_is_valid(
    block: &Block,
    subsidy: Amount<NonNegative>,
    fees: &FeesByAsset,
) -> Result<(), BlockError> {
    let coinbase = block.transactions.get(0).ok_or(SubsidyError::NoCoinbase)?;
    coinbase_distribution(coinbase, subsidy, fees)?;
    Ok(())
}
