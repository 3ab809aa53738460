use super::CompactInt;
use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{DateTime, TimeZone, Utc};
use std::io;

use super::SerializationError;

type Result<R> = std::result::Result<R, SerializationError>;

pub trait VarDeserialize {
    fn var_deserialize<R: io::Read>(reader: R) -> Result<Self>
    where
        Self: Sized;
}

/// Helper for deserializing more succinctly via type inference
pub trait VarDeserializeInto {
    /// Deserialize based on type inference
    fn var_deserialize_into<T>(self) -> Result<T>
    where
        T: VarDeserialize;
}

impl<R: io::Read> VarDeserializeInto for R {
    fn var_deserialize_into<T>(self) -> Result<T>
    where
        T: VarDeserialize,
    {
        T::var_deserialize(self)
    }
}

impl VarDeserialize for bool {
    fn var_deserialize<R: io::Read>(mut reader: R) -> Result<bool> {
        let value = reader.read_u8()?;
        match value {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(SerializationError::Parse("Invalid bool")),
        }
    }
}

impl VarDeserialize for u8 {
    fn var_deserialize<R: io::Read>(mut reader: R) -> Result<u8> {
        Ok(reader.read_u8()?)
    }
}

impl VarDeserialize for u16 {
    fn var_deserialize<R: io::Read>(mut reader: R) -> Result<u16> {
        Ok(reader.read_u16::<LittleEndian>()?)
    }
}

impl VarDeserialize for u32 {
    fn var_deserialize<R: io::Read>(mut reader: R) -> Result<u32> {
        Ok(reader.read_u32::<LittleEndian>()?)
    }
}

impl VarDeserialize for u64 {
    fn var_deserialize<R: io::Read>(mut reader: R) -> Result<u64> {
        Ok(reader.read_u64::<LittleEndian>()?)
    }
}

impl VarDeserialize for i32 {
    fn var_deserialize<R: io::Read>(mut reader: R) -> Result<i32> {
        Ok(reader.read_i32::<LittleEndian>()?)
    }
}

impl VarDeserialize for i64 {
    fn var_deserialize<R: io::Read>(mut reader: R) -> Result<i64> {
        Ok(reader.read_i64::<LittleEndian>()?)
    }
}

impl VarDeserialize for DateTime<Utc> {
    fn var_deserialize<R: io::Read>(mut reader: R) -> Result<DateTime<Utc>> {
        Ok(Utc.timestamp(reader.read_u32::<LittleEndian>()? as i64, 0))
    }
}

impl<T> VarDeserialize for Vec<T>
where
    T: VarDeserialize,
{
    fn var_deserialize<R: io::Read>(mut reader: R) -> Result<Vec<T>> {
        let len = CompactInt::var_deserialize(&mut reader)?.value() as usize;
        // Limit preallocation since blind preallocation is a DOS vulnerability
        let blind_alloc_limit = 1024;
        let mut result: Vec<T> = Vec::with_capacity(std::cmp::min(len, blind_alloc_limit));
        for _ in 0..len {
            result.push(T::var_deserialize(&mut reader)?);
        }
        Ok(result)
    }
}

impl VarDeserialize for String {
    fn var_deserialize<R: io::Read>(mut reader: R) -> Result<String> {
        let len = CompactInt::var_deserialize(&mut reader)?.value() as usize;
        let blind_alloc_limit = 1024;
        let mut buf = vec![0; std::cmp::min(len, blind_alloc_limit)];
        reader.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|_| SerializationError::Parse("invalid utf-8"))
    }
}

impl<T: Sized + VarDeserialize> VarDeserialize for Option<T> {
    fn var_deserialize<R: io::Read>(reader: R) -> Result<Option<T>> {
        Ok(Some(T::var_deserialize(reader)?))
    }
}

impl<T, U> VarDeserialize for (T, U)
where
    T: VarDeserialize,
    U: VarDeserialize,
{
    fn var_deserialize<R: io::Read>(mut reader: R) -> Result<(T, U)> {
        Ok((
            T::var_deserialize(&mut reader)?,
            U::var_deserialize(&mut reader)?,
        ))
    }
}

macro_rules! impl_deserializable_byte_array {
    ($size:expr) => {
        impl VarDeserialize for [u8; $size] {
            fn var_deserialize<R: io::Read>(mut reader: R) -> Result<[u8; $size]> {
                let mut result = [0u8; $size];
                reader.read_exact(&mut result)?;
                Ok(result)
            }
        }
    };
}

impl_deserializable_byte_array!(4);
impl_deserializable_byte_array!(20);
impl_deserializable_byte_array!(32);
impl_deserializable_byte_array!(33);
