//! Consensus-critical data structures for the VAR dual-asset chain.
//!
//! Every transaction output on this chain carries an asset identifier: the
//! native `VAR` asset (used for fees, subsidies, and staking) or one of up
//! to 255 secondary `SKA` assets, each emitted exactly once under a signed
//! authorization. This crate defines the transaction, block, and UTXO data
//! model, the exact wire serialization, the script marker grammar, and the
//! per-network consensus parameters. The rules that *use* these structures
//! live in `var-consensus`; persistent chain state lives in `var-state`.
#![allow(clippy::unit_arg)]

#[macro_use]
extern crate serde;

pub mod amount;
pub mod asset;
pub mod block;
pub mod cached;
pub mod compactint;
pub mod fmt;
pub mod parameters;
pub mod serialization;
pub mod stake;
pub mod transaction;
pub mod transparent;
pub mod work;

pub use cached::Cached;
pub use serialization::{SerializationError, VarDeserialize, VarDeserializeInto, VarSerialize};
