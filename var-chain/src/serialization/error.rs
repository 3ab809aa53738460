use std::io;

use thiserror::Error;

/// A serialization error.
#[derive(Error, Debug)]
pub enum SerializationError {
    /// An io error that prevented deserialization
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// The data to be deserialized was malformed.
    #[error("parse error: {0}")]
    Parse(&'static str),
    /// The requested protocol version cannot represent the data.
    ///
    /// Emitted when a pre-dual-asset peer version is asked to carry a
    /// non-VAR output, or when a dual-asset serialization is parsed at an
    /// older version.
    #[error("codec mismatch: {0}")]
    CodecMismatch(&'static str),
}
