#![allow(clippy::unit_arg)]
use crate::{
    compactint::CompactInt,
    serialization::{SerializationError, VarDeserialize, VarSerialize},
};
use std::{
    fmt,
    io::{self, Read},
};

use super::serialize::MAX_SCRIPT_SIZE;

/// An encoding of a script.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize, Hash, Default)]
#[cfg_attr(
    any(test, feature = "proptest-impl"),
    derive(proptest_derive::Arbitrary)
)]
pub struct Script(pub Vec<u8>);

impl Script {
    pub fn serialized_size(&self) -> usize {
        CompactInt::size(self.0.len()) + self.0.len()
    }

    /// Returns true for the zero-length script.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Script")
            .field(&hex::encode(&self.0))
            .finish()
    }
}

impl VarSerialize for Script {
    fn var_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        CompactInt::from(self.0.len()).var_serialize(&mut writer)?;
        writer.write_all(&self.0[..])?;
        Ok(())
    }
}

impl VarDeserialize for Script {
    fn var_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let len = CompactInt::var_deserialize(&mut reader)?.value();
        if len > MAX_SCRIPT_SIZE as u64 {
            return Err(SerializationError::Parse("script exceeds maximum size"));
        }
        let mut bytes = Vec::new();
        reader.take(len).read_to_end(&mut bytes)?;
        if (bytes.len() as u64) < len {
            return Err(SerializationError::Parse("script shorter than its length"));
        }
        Ok(Script(bytes))
    }
}

#[cfg(test)]
mod proptests {
    use std::io::Cursor;

    use proptest::prelude::*;

    use super::*;
    use crate::serialization::{VarDeserialize, VarSerialize};

    proptest! {
        #[test]
        fn script_roundtrip(script in any::<Script>()) {
            var_test::init();

            let mut bytes = Cursor::new(Vec::new());
            script.var_serialize(&mut bytes)?;

            bytes.set_position(0);
            let other_script = Script::var_deserialize(&mut bytes)?;

            prop_assert_eq![script, other_script];
        }
    }
}
