//! The Bitcoin-inherited variable-length integer encoding used for all
//! length prefixes on the wire.

use crate::{SerializationError, VarDeserialize, VarSerialize};
use byteorder::{LittleEndian, WriteBytesExt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactInt(u64);

impl CompactInt {
    pub fn new() -> CompactInt {
        CompactInt(0)
    }

    pub fn from(value: usize) -> CompactInt {
        CompactInt(value as u64)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// The number of bytes the encoding of `value` occupies.
    pub fn size(value: usize) -> usize {
        if value < 253 {
            1
        } else if value <= std::u16::MAX as usize {
            3
        } else if value <= std::u32::MAX as usize {
            5
        } else {
            9
        }
    }
}

impl Default for CompactInt {
    fn default() -> Self {
        CompactInt::new()
    }
}

impl VarSerialize for CompactInt {
    fn var_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        if self.value() < 253 {
            target.write_all(&[self.value() as u8])
        } else if self.value() <= std::u16::MAX as u64 {
            target.write_all(&[253])?;
            target.write_u16::<LittleEndian>(self.value() as u16)
        } else if self.value() <= std::u32::MAX as u64 {
            target.write_all(&[254])?;
            target.write_u32::<LittleEndian>(self.value() as u32)
        } else {
            target.write_all(&[255])?;
            target.write_u64::<LittleEndian>(self.value())
        }
    }
}

impl VarDeserialize for CompactInt {
    fn var_deserialize<R: std::io::Read>(mut target: R) -> Result<CompactInt, SerializationError> {
        let first = u8::var_deserialize(&mut target)?;
        if first < 253 {
            Ok(CompactInt::from(first as usize))
        } else if first == 253 {
            Ok(CompactInt::from(u16::var_deserialize(&mut target)? as usize))
        } else if first == 254 {
            Ok(CompactInt::from(u32::var_deserialize(&mut target)? as usize))
        } else {
            Ok(CompactInt(u64::var_deserialize(&mut target)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_size_matches_encoding() {
        for &value in &[0usize, 1, 252, 253, 65535, 65536, 70000, 4_294_967_296] {
            let encoded = CompactInt::from(value).var_serialize_to_vec().unwrap();
            assert_eq!(encoded.len(), CompactInt::size(value), "value {}", value);

            let decoded = CompactInt::var_deserialize(&encoded[..]).unwrap();
            assert_eq!(decoded.value(), value as u64);
        }
    }
}
