//! Byte layouts for types stored in sled.
//!
//! Heights use big-endian so the tree's lexicographic order is the
//! numeric order, which makes the tip the last entry. Everything else
//! reuses the consensus wire serialization.

use std::sync::Arc;

use var_chain::{
    block::{self, Block},
    transaction::Transaction,
    transparent, VarDeserialize, VarSerialize,
};

use crate::BoxError;

/// A type that can be used as a sled key or value.
pub trait SledSerialize {
    fn as_sled_bytes(&self) -> Vec<u8>;
}

/// A type that can be reconstructed from a sled value.
pub trait FromSled: Sized {
    fn from_ivec(bytes: sled::IVec) -> Result<Self, BoxError>;
}

/// `zs_`-prefixed typed helpers over raw sled trees.
pub trait SledTreeExt {
    fn zs_insert<K: SledSerialize, V: SledSerialize>(
        &self,
        key: K,
        value: V,
    ) -> Result<(), BoxError>;

    fn zs_get<K: SledSerialize, V: FromSled>(&self, key: &K) -> Result<Option<V>, BoxError>;

    fn zs_remove<K: SledSerialize>(&self, key: &K) -> Result<(), BoxError>;
}

impl SledTreeExt for sled::Tree {
    fn zs_insert<K: SledSerialize, V: SledSerialize>(
        &self,
        key: K,
        value: V,
    ) -> Result<(), BoxError> {
        self.insert(key.as_sled_bytes(), value.as_sled_bytes())?;
        Ok(())
    }

    fn zs_get<K: SledSerialize, V: FromSled>(&self, key: &K) -> Result<Option<V>, BoxError> {
        self.get(key.as_sled_bytes())?.map(V::from_ivec).transpose()
    }

    fn zs_remove<K: SledSerialize>(&self, key: &K) -> Result<(), BoxError> {
        self.remove(key.as_sled_bytes())?;
        Ok(())
    }
}

impl SledSerialize for block::Height {
    fn as_sled_bytes(&self) -> Vec<u8> {
        self.0.to_be_bytes().to_vec()
    }
}

impl FromSled for block::Height {
    fn from_ivec(bytes: sled::IVec) -> Result<Self, BoxError> {
        let mut raw = [0u8; 4];
        if bytes.len() != 4 {
            return Err("stored heights are 4 bytes".into());
        }
        raw.copy_from_slice(&bytes);
        Ok(block::Height(u32::from_be_bytes(raw)))
    }
}

impl SledSerialize for block::Hash {
    fn as_sled_bytes(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl FromSled for block::Hash {
    fn from_ivec(bytes: sled::IVec) -> Result<Self, BoxError> {
        let mut raw = [0u8; 32];
        if bytes.len() != 32 {
            return Err("stored block hashes are 32 bytes".into());
        }
        raw.copy_from_slice(&bytes);
        Ok(block::Hash(raw))
    }
}

impl SledSerialize for var_chain::transaction::Hash {
    fn as_sled_bytes(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

macro_rules! impl_sled_via_wire {
    ($type:ty) => {
        impl SledSerialize for $type {
            fn as_sled_bytes(&self) -> Vec<u8> {
                self.var_serialize_to_vec()
                    .expect("serialization to a vec is infallible")
            }
        }

        impl FromSled for $type {
            fn from_ivec(bytes: sled::IVec) -> Result<Self, BoxError> {
                Ok(<$type>::var_deserialize(&bytes[..])?)
            }
        }
    };
}

impl_sled_via_wire!(transparent::OutPoint);
impl_sled_via_wire!(transparent::Output);
impl_sled_via_wire!(transparent::UtxoEntry);
impl_sled_via_wire!(Block);
impl_sled_via_wire!(Transaction);

impl<T> SledSerialize for &T
where
    T: SledSerialize,
{
    fn as_sled_bytes(&self) -> Vec<u8> {
        T::as_sled_bytes(*self)
    }
}

impl<T> SledSerialize for Arc<T>
where
    T: SledSerialize,
{
    fn as_sled_bytes(&self) -> Vec<u8> {
        T::as_sled_bytes(self)
    }
}

impl<T> FromSled for Arc<T>
where
    T: FromSled,
{
    fn from_ivec(bytes: sled::IVec) -> Result<Self, BoxError> {
        Ok(Arc::new(T::from_ivec(bytes)?))
    }
}
