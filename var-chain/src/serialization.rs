//! Consensus-critical serialization.
//!
//! This module contains the `VarSerialize` and `VarDeserialize` traits,
//! analogs of the Serde `Serialize` and `Deserialize` traits but intended
//! for the consensus-critical wire formats of this chain: little-endian
//! integers, CompactInt length prefixes, and raw byte arrays. Serde is
//! used for storage and RPC encodings, never for the wire format.

mod deserialize;
mod error;

pub mod sha256d;

use chrono::{DateTime, Utc};
use std::convert::TryFrom;

pub use deserialize::{VarDeserialize, VarDeserializeInto};
pub use error::SerializationError;

use crate::compactint::CompactInt;
use byteorder::{LittleEndian, WriteBytesExt};

/// The protocol version that introduced the one-byte asset identifier on
/// every transaction output.
///
/// Peers below this version cannot decode dual-asset serializations, and
/// encoders asked for an older version must refuse to emit non-VAR
/// outputs. This is a hard fork boundary.
pub const DUAL_ASSET_VERSION: u32 = 2;

/// The protocol version spoken by this implementation.
pub const PROTOCOL_VERSION: u32 = DUAL_ASSET_VERSION;

pub trait VarSerialize {
    fn var_serialize<W: std::io::Write>(&self, target: W) -> Result<(), std::io::Error>;

    fn var_serialize_to_vec(&self) -> Result<Vec<u8>, std::io::Error> {
        let mut data = Vec::new();
        self.var_serialize(&mut data)?;
        Ok(data)
    }
}

impl VarSerialize for bool {
    fn var_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_all(&[*self as u8])
    }
}

impl VarSerialize for u16 {
    fn var_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_u16::<LittleEndian>(*self)
    }
}

impl VarSerialize for u32 {
    fn var_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_u32::<LittleEndian>(*self)
    }
}

impl VarSerialize for u64 {
    fn var_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_u64::<LittleEndian>(*self)
    }
}

impl VarSerialize for i32 {
    fn var_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_i32::<LittleEndian>(*self)
    }
}

impl VarSerialize for i64 {
    fn var_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_i64::<LittleEndian>(*self)
    }
}

impl VarSerialize for DateTime<Utc> {
    fn var_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        let time_u32 = u32::try_from(self.timestamp()).unwrap_or(std::u32::MAX);
        target.write_u32::<LittleEndian>(time_u32)
    }
}

impl VarSerialize for &[u8] {
    fn var_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_all(self)
    }
}

impl VarSerialize for [u8; 4] {
    fn var_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_all(self)
    }
}

impl VarSerialize for [u8; 20] {
    fn var_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_all(self)
    }
}

impl VarSerialize for [u8; 32] {
    fn var_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_all(self)
    }
}

impl VarSerialize for [u8; 33] {
    fn var_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_all(self)
    }
}

impl VarSerialize for Vec<u8> {
    fn var_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        CompactInt::from(self.len()).var_serialize(&mut target)?;
        target.write_all(self)?;
        Ok(())
    }
}

impl<T> VarSerialize for Vec<T>
where
    T: VarSerialize,
{
    fn var_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        CompactInt::from(self.len()).var_serialize(&mut target)?;
        for item in self.iter() {
            item.var_serialize(&mut target)?
        }
        Ok(())
    }
}

impl<T, U> VarSerialize for (T, U)
where
    T: VarSerialize,
    U: VarSerialize,
{
    fn var_serialize<W>(&self, mut target: W) -> std::result::Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        self.0.var_serialize(&mut target)?;
        self.1.var_serialize(&mut target)?;
        Ok(())
    }
}

impl VarSerialize for String {
    fn var_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        CompactInt::from(self.len()).var_serialize(&mut target)?;
        self.as_bytes().var_serialize(&mut target)?;
        Ok(())
    }
}

impl<T: VarSerialize> VarSerialize for Option<T> {
    fn var_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        match self {
            Some(contents) => contents.var_serialize(&mut target),
            None => Ok(()),
        }
    }
}
