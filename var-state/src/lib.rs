//! Chain state for the VAR dual-asset network.
//!
//! This crate owns the mutable consensus state: the UTXO viewpoint, the
//! per-asset SKA emission ledger (nonce and emitted flag), the per-asset
//! burn ledger, and the sled-backed finalized state that persists all of
//! them. Connect and disconnect of a block mutate these structures
//! together; `var-consensus` drives the mutations and this crate
//! guarantees they commit atomically and reverse exactly.

mod cancel;
pub mod burn;
pub mod emission;
mod sled_state;
pub mod utxo;

pub use cancel::CancelToken;
pub use sled_state::{FinalizedState, HashOrHeight};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use var_chain::parameters::Network;

/// A boxed error for the storage boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The version byte layouts of the persistent buckets.
///
/// Loading a bucket whose stored format version is above the supported
/// one fails hard; downgrades never reinterpret newer data.
pub const STATE_FORMAT_VERSION: u32 = 1;

/// Errors raised by the persistent state buckets.
#[derive(displaydoc::Display, thiserror::Error, Debug)]
pub enum StateError {
    /// bucket format version {found} is newer than supported version {supported}
    BucketVersionUnsupported { found: u32, supported: u32 },
    /// invalid key in state bucket: {0}
    InvalidKey(&'static str),
    /// invalid value in state bucket: {0}
    InvalidValue(&'static str),
    /// storage error: {0}
    Sled(#[from] sled::Error),
}

/// Configuration for the state service.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// The root directory for the state databases.
    ///
    /// Each network's database lives in a `state/<network>` subdirectory
    /// of this directory.
    pub cache_dir: PathBuf,

    /// Whether to use an ephemeral database that is removed on drop.
    ///
    /// Ephemeral databases are useful for tests and one-shot tools.
    pub ephemeral: bool,
}

impl Config {
    /// The sled configuration for `network`.
    pub fn sled_config(&self, network: Network) -> sled::Config {
        let path = self
            .cache_dir
            .join("state")
            .join(format!("{}", network));

        let config = sled::Config::default().path(path);
        if self.ephemeral {
            config.temporary(true)
        } else {
            config
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| {
                std::env::current_dir()
                    .expect("the current directory is accessible")
                    .join("cache")
            })
            .join("var");

        Self {
            cache_dir,
            ephemeral: false,
        }
    }
}
