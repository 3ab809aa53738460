//! Consensus rules for the VAR dual-asset chain.
//!
//! This crate checks what `var-chain` merely represents: context-free
//! transaction sanity, per-asset value conservation, the one-time SKA
//! emission protocol, the stake fee (SSFee) sub-protocol, the coinbase
//! fee-distribution contract, and the block-level orchestration that
//! connects and disconnects blocks against the state in `var-state`.
//!
//! Every rule failure rejects the block; there is no local recovery at
//! this layer.

#![allow(clippy::unit_arg)]

#[macro_use]
extern crate serde;

pub mod block;
pub mod chain_state;
pub mod error;
pub mod transaction;

pub use block::connect::{
    apply_deltas, connect_block, disconnect_block, revert_deltas, BlockDeltas,
    ConsolidationRecord,
};
pub use chain_state::ChainState;
pub use error::{
    BlockError, CoinbaseError, EmissionError, SSFeeError, SubsidyError, TransactionError,
};
pub use transaction::fees::FeesByAsset;
