//! Contains impls of `VarSerialize`, `VarDeserialize` for transactions,
//! so that all of the serialization logic is in one place.
//!
//! A transaction serializes as a prefix (version word, inputs as
//! outpoint + sequence, outputs, lock time, expiry) followed by a
//! witness (per-input value, creating block coordinates, and signature
//! script). The no-witness form carries the prefix only and is the form
//! hashed into SKA emission authorizations.

use std::{io, sync::Arc};

use crate::compactint::CompactInt;
use crate::serialization::{
    SerializationError, VarDeserialize, VarSerialize, DUAL_ASSET_VERSION,
};

/// The maximum size of a serialized transaction in bytes.
pub const MAX_TX_SIZE: u64 = 393_216;

use super::*;
use crate::transparent;

/// The serialization form encoded in the high 16 bits of a
/// transaction's on-wire version word.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SerializationType {
    /// Prefix and witness.
    Full,
    /// Prefix only. Used for signature hashing, including the SKA
    /// emission authorization message.
    NoWitness,
}

impl SerializationType {
    pub fn to_u16(self) -> u16 {
        match self {
            SerializationType::Full => 0,
            SerializationType::NoWitness => 1,
        }
    }

    pub fn from_u16(raw: u16) -> Result<Self, SerializationError> {
        match raw {
            0 => Ok(SerializationType::Full),
            1 => Ok(SerializationType::NoWitness),
            _ => Err(SerializationError::Parse("unknown serialization type")),
        }
    }
}

impl Transaction {
    /// Serializes this transaction in the requested form.
    pub fn var_serialize_as<W: io::Write>(
        &self,
        mut writer: W,
        ser_type: SerializationType,
    ) -> Result<(), io::Error> {
        let version_word = (self.version as u32) | ((ser_type.to_u16() as u32) << 16);
        version_word.var_serialize(&mut writer)?;

        CompactInt::from(self.inputs.len()).var_serialize(&mut writer)?;
        for input in self.inputs.iter() {
            input.var_serialize_prefix(&mut writer)?;
        }
        CompactInt::from(self.outputs.len()).var_serialize(&mut writer)?;
        for output in self.outputs.iter() {
            output.var_serialize(&mut writer)?;
        }
        self.lock_time.var_serialize(&mut writer)?;
        self.expiry.var_serialize(&mut writer)?;

        if let SerializationType::Full = ser_type {
            CompactInt::from(self.inputs.len()).var_serialize(&mut writer)?;
            for input in self.inputs.iter() {
                input.var_serialize_witness(&mut writer)?;
            }
        }
        Ok(())
    }

    /// Serializes the no-witness form to a fresh buffer.
    pub fn var_serialize_no_witness_to_vec(&self) -> Result<Vec<u8>, io::Error> {
        let mut data = Vec::new();
        self.var_serialize_as(&mut data, SerializationType::NoWitness)?;
        Ok(data)
    }

    /// Serializes this transaction for a peer speaking
    /// `protocol_version`, refusing if any output cannot be represented
    /// at that version.
    pub fn var_serialize_versioned<W: io::Write>(
        &self,
        mut writer: W,
        protocol_version: u32,
    ) -> Result<(), SerializationError> {
        if protocol_version < DUAL_ASSET_VERSION {
            if self.outputs.iter().any(|o| o.asset_id.is_ska()) {
                return Err(SerializationError::CodecMismatch(
                    "pre-dual-asset protocol version cannot represent asset ids",
                ));
            }
            return Err(SerializationError::CodecMismatch(
                "legacy single-asset serialization is not supported",
            ));
        }
        self.var_serialize(&mut writer)?;
        Ok(())
    }
}

/// Deserializes a transaction, calculating and caching its hash.
impl VarDeserialize for Transaction {
    fn var_deserialize<R: std::io::Read>(src: R) -> Result<Self, SerializationError> {
        // Put a sanity limit on the size of a transaction to protect against DOS attacks
        let mut src = src.take(MAX_TX_SIZE);

        let version_word = u32::var_deserialize(&mut src)?;
        let version = (version_word & 0xFFFF) as u16;
        let ser_type = SerializationType::from_u16((version_word >> 16) as u16)?;

        let input_count = CompactInt::var_deserialize(&mut src)?.value() as usize;
        let blind_alloc_limit = 1024;
        let mut inputs = Vec::with_capacity(std::cmp::min(input_count, blind_alloc_limit));
        for _ in 0..input_count {
            inputs.push(transparent::Input::var_deserialize_prefix(&mut src)?);
        }
        let outputs = <Vec<transparent::Output>>::var_deserialize(&mut src)?;
        let lock_time = LockTime::var_deserialize(&mut src)?;
        let expiry = u32::var_deserialize(&mut src)?;

        if let SerializationType::Full = ser_type {
            let witness_count = CompactInt::var_deserialize(&mut src)?.value() as usize;
            if witness_count != inputs.len() {
                return Err(SerializationError::Parse(
                    "witness count disagrees with input count",
                ));
            }
            for input in inputs.iter_mut() {
                input.var_deserialize_witness(&mut src)?;
            }
        }

        let mut tx = Transaction {
            version,
            inputs,
            outputs,
            lock_time,
            expiry,
            hash: Cached::new(),
        };
        // Calculate and cache the transaction hash. The hash is defined
        // over the full serialization, so a no-witness parse leaves the
        // cache cold rather than caching a hash of zeroed witnesses.
        if let SerializationType::Full = ser_type {
            let own_hash = tx.hash();
            tx.hash = Cached::from(own_hash);
        }
        Ok(tx)
    }
}

impl VarSerialize for Transaction {
    fn var_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error> {
        self.var_serialize_as(writer, SerializationType::Full)
    }
}

impl<T> VarDeserialize for Arc<T>
where
    T: VarDeserialize,
{
    fn var_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Arc::new(T::var_deserialize(reader)?))
    }
}

impl<T> VarSerialize for Arc<T>
where
    T: VarSerialize,
{
    fn var_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error> {
        T::var_serialize(self, writer)
    }
}
