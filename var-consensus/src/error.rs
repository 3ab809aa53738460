//! Errors that can occur when checking consensus rules.
//!
//! Each layer has its own error type; lower-layer errors are nested
//! upward with their context (offending asset, output index, or
//! transaction hash) attached where the rule has it.

use thiserror::Error;

use var_chain::{asset::AssetId, transaction, transparent};
use var_state::utxo::UtxoError;

#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum SubsidyError {
    #[error("no coinbase transaction in block")]
    NoCoinbase,
    #[error("block subsidy calculation overflowed")]
    SubsidyOverflow,
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum TransactionError {
    #[error("first transaction in the regular tree must be coinbase")]
    CoinbasePosition,

    #[error("coinbase shape found in non-coinbase position")]
    CoinbaseInputFound,

    #[error("transaction has no inputs")]
    NoInputs,

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("transaction of {size} bytes is above the limit of {limit} bytes")]
    TxTooBig { size: usize, limit: usize },

    #[error("output {index} value is out of range for {asset}")]
    BadOutValue { asset: AssetId, index: usize },

    #[error("aggregate output value is out of range for {0}")]
    BadAssetTotal(AssetId),

    #[error("duplicate input: {0:?}")]
    DuplicateInputs(transparent::OutPoint),

    #[error("input {0:?} not found or already spent")]
    MissingUtxo(transparent::OutPoint),

    #[error("insufficient {0} inputs: outputs of that asset exceed its inputs")]
    InsufficientAssetInputs(AssetId),

    #[error("value or fee arithmetic overflowed")]
    ValueOverflow,

    #[error(transparent)]
    Emission(#[from] EmissionError),

    #[error(transparent)]
    SSFee(#[from] SSFeeError),
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum EmissionError {
    #[error("no SKA coin is configured for {0}")]
    UnknownAsset(AssetId),

    #[error("emission signed by a key other than the configured emission key")]
    UnauthorizedKey,

    #[error("emission nonce {actual} is not the successor of the stored nonce {stored}")]
    InvalidNonce { stored: u64, actual: u64 },

    #[error(
        "emission at height {current} authorized for height {authorized} is outside the emission window"
    )]
    OutsideEmissionWindow { authorized: i64, current: u32 },

    #[error("emission outputs do not sum to the authorized and configured amount")]
    AmountMismatch,

    #[error("emission outputs carry a different asset than the authorization")]
    InconsistentAsset,

    #[error("{0} has already been emitted")]
    AlreadyEmitted(AssetId),

    #[error("emission signature is malformed: {0}")]
    BadSignatureFormat(&'static str),

    #[error("emission signature is not canonical (S above the half curve order)")]
    NonCanonicalSignature,

    #[error("emission signature does not verify against the authorized key and message")]
    SignatureMismatch,

    #[error("the governance vote activating {0} has not passed")]
    InactiveVoteGate(AssetId),

    #[error("SKA emissions are not allowed before the stake validation height")]
    PreStakeValidationHeight,

    #[error("more than one emission for {0} in one block")]
    MultipleEmissionsSameAsset(AssetId),

    #[error("malformed emission transaction: {0}")]
    MalformedEmission(&'static str),
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum SSFeeError {
    #[error("stake fee transaction has no staker or miner marker")]
    MissingMarker,

    #[error("stake fee outputs mix more than one asset")]
    MixedAssets,

    #[error("miner stake fees may not use VAR; miner VAR fees go directly to the coinbase")]
    MinerVarNotAllowed,

    #[error("malformed stake fee structure: {0}")]
    MalformedStructure(&'static str),

    #[error("vote carries no consolidation address output")]
    MissingConsolidation,
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum CoinbaseError {
    #[error("bad coinbase multi-output structure: {0}")]
    BadCoinbaseMultiOutput(&'static str),

    #[error("coinbase output for {asset} pays {actual} atoms but {expected} are owed")]
    BadCoinbaseFeeDistribution {
        asset: AssetId,
        expected: i64,
        actual: i64,
    },

    #[error("coinbase pays {0} more than once")]
    DuplicateAssetOutput(AssetId),

    #[error("coinbase is missing the VAR subsidy output")]
    MissingVarSubsidyOutput,
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum BlockError {
    #[error("block has no transactions")]
    NoTransactions,

    #[error("transaction {hash} failed validation: {error}")]
    Transaction {
        hash: transaction::Hash,
        error: TransactionError,
    },

    #[error(transparent)]
    Coinbase(#[from] CoinbaseError),

    #[error(transparent)]
    Subsidy(#[from] SubsidyError),

    #[error("inactive asset {0} appears in a transaction output")]
    InactiveAsset(AssetId),

    #[error("utxo view rejected the block: {0}")]
    Utxo(#[from] UtxoError),

    #[error("state transition rejected: {0}")]
    State(String),
}

impl BlockError {
    /// Attaches the offending transaction hash to a transaction-level
    /// error.
    pub fn from_tx(hash: transaction::Hash, error: impl Into<TransactionError>) -> BlockError {
        BlockError::Transaction {
            hash,
            error: error.into(),
        }
    }
}
