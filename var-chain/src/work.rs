//! Proof-of-work primitives.
//!
//! Hashing and difficulty retargeting are black boxes to the consensus
//! core; only the compact difficulty encoding appears in block headers.

pub mod difficulty {
    use crate::{SerializationError, VarDeserialize, VarSerialize};
    use var_serde_derive::{VarDeserialize, VarSerialize};

    /// A difficulty target threshold in the compact `nBits` encoding.
    ///
    /// The consensus core treats this as opaque header data; interpreting
    /// and retargeting it belongs to the proof-of-work collaborator.
    #[derive(
        Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, VarSerialize,
        VarDeserialize,
    )]
    #[cfg_attr(
        any(test, feature = "proptest-impl"),
        derive(proptest_derive::Arbitrary)
    )]
    pub struct CompactDifficulty(pub u32);
}
