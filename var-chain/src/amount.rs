//! Strongly-typed atom amounts that prevent under/overflows.
//!
//! The `Amount` type is parameterized by a `Constraint` implementation
//! that declares the range of allowed values. All arithmetic returns a
//! `Result`, so amounts can never silently wrap. Amounts of different
//! asset types are never mixed by this module; per-asset supply caps are
//! enforced by the sanity checks in `var-consensus` using
//! [`crate::asset::AssetId::max_atoms`].

use std::convert::{TryFrom, TryInto};
use std::marker::PhantomData;
use std::ops::RangeInclusive;

use crate::{SerializationError, VarDeserialize, VarSerialize};
use thiserror::Error;

/// The number of atoms in one whole unit, for VAR and every SKA asset.
pub const COIN: i64 = 100_000_000;

/// The largest number of atoms a single asset can ever have in
/// circulation, across all asset types.
///
/// This is the SKA supply cap; the VAR cap is lower and enforced
/// per-asset by the sanity checks.
pub const MAX_ATOMS: i64 = 100_000_000 * COIN;

/// A runtime validated type for representing atom amounts.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount<C = NegativeAllowed>(i64, PhantomData<C>);

impl<C> std::fmt::Debug for Amount<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple(&format!("Amount<{}>", std::any::type_name::<C>()))
            .field(&self.0)
            .finish()
    }
}

impl<C> Clone for Amount<C> {
    fn clone(&self) -> Self {
        Amount(self.0, PhantomData)
    }
}

impl<C> Copy for Amount<C> {}

impl<C> PartialEq for Amount<C> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<C> Eq for Amount<C> {}

impl<C> PartialOrd for Amount<C> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<C> Ord for Amount<C> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl<C> std::hash::Hash for Amount<C> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<C> Amount<C> {
    /// Convert this amount to a different `Amount` type if it satisfies
    /// the new constraint.
    pub fn constrain<C2: Constraint>(self) -> Result<Amount<C2>, Error> {
        self.0.try_into()
    }

    /// The raw atom count.
    pub fn atoms(&self) -> i64 {
        self.0
    }
}

impl<C: Constraint> Amount<C> {
    /// An `Amount` of zero atoms, valid under every constraint.
    pub fn zero() -> Amount<C> {
        Amount(0, PhantomData)
    }
}

impl<C> From<Amount<C>> for i64 {
    fn from(amount: Amount<C>) -> Self {
        amount.0
    }
}

impl From<Amount<NonNegative>> for u64 {
    fn from(amount: Amount<NonNegative>) -> Self {
        amount.0 as _
    }
}

impl<C: Constraint> std::convert::TryFrom<i64> for Amount<C> {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        C::validate(value).map(|v| Amount(v, PhantomData))
    }
}

impl<C: Constraint> std::convert::TryFrom<u64> for Amount<C> {
    type Error = Error;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        let value = i64::try_from(value).map_err(|_| Error::Constraint {
            value: i64::MAX,
            range: C::valid_range(),
        })?;
        C::validate(value).map(|v| Amount(v, PhantomData))
    }
}

impl<C: Constraint> std::ops::Add<Amount<C>> for Amount<C> {
    type Output = Result<Amount<C>, Error>;

    fn add(self, rhs: Amount<C>) -> Self::Output {
        let value = self
            .0
            .checked_add(rhs.0)
            .ok_or_else(|| Error::Constraint {
                value: self.0,
                range: C::valid_range(),
            })?;
        value.try_into()
    }
}

impl<C: Constraint> std::ops::Sub<Amount<C>> for Amount<C> {
    type Output = Result<Amount<C>, Error>;

    fn sub(self, rhs: Amount<C>) -> Self::Output {
        let value = self
            .0
            .checked_sub(rhs.0)
            .ok_or_else(|| Error::Constraint {
                value: self.0,
                range: C::valid_range(),
            })?;
        value.try_into()
    }
}

impl<C: Constraint> std::iter::Sum<Amount<C>> for Result<Amount<C>, Error> {
    fn sum<I: Iterator<Item = Amount<C>>>(iter: I) -> Self {
        let mut total: i64 = 0;
        for amount in iter {
            total = total.checked_add(amount.0).ok_or_else(|| Error::Constraint {
                value: total,
                range: C::valid_range(),
            })?;
        }
        total.try_into()
    }
}

/// Errors that can be returned when validating `Amount`s.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// input {value} is outside of valid range for amounts: {range:?}
    #[error("{value} is outside of the valid amount range {range:?}")]
    Constraint {
        value: i64,
        range: RangeInclusive<i64>,
    },
}

/// Marker type for `Amount` constraining it to values greater than or
/// equal to zero.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct NonNegative;

/// Marker type for `Amount` allowing negative values, e.g. (potentially
/// negative) ledger fees.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct NegativeAllowed;

/// A constraint on the range of values an `Amount` may hold.
pub trait Constraint {
    /// The range of values the constraint considers valid.
    fn valid_range() -> RangeInclusive<i64>;

    /// Check that `value` is within `valid_range()`.
    fn validate(value: i64) -> Result<i64, Error> {
        let range = Self::valid_range();
        if !range.contains(&value) {
            Err(Error::Constraint { value, range })
        } else {
            Ok(value)
        }
    }
}

impl Constraint for NonNegative {
    fn valid_range() -> RangeInclusive<i64> {
        0..=MAX_ATOMS
    }
}

impl Constraint for NegativeAllowed {
    fn valid_range() -> RangeInclusive<i64> {
        -MAX_ATOMS..=MAX_ATOMS
    }
}

impl<C> VarSerialize for Amount<C> {
    fn var_serialize<W: std::io::Write>(&self, writer: W) -> Result<(), std::io::Error> {
        self.0.var_serialize(writer)
    }
}

impl<C: Constraint> VarDeserialize for Amount<C> {
    fn var_deserialize<R: std::io::Read>(reader: R) -> Result<Self, SerializationError> {
        let value = i64::var_deserialize(reader)?;
        value
            .try_into()
            .map_err(|_| SerializationError::Parse("amount out of range"))
    }
}

#[cfg(any(test, feature = "proptest-impl"))]
mod arbitrary {
    use super::*;
    use proptest::prelude::*;

    impl<C: Constraint + std::fmt::Debug + 'static> Arbitrary for Amount<C> {
        type Parameters = ();

        fn arbitrary_with(_args: ()) -> Self::Strategy {
            C::valid_range()
                .prop_map(|value| Amount(value, PhantomData))
                .boxed()
        }

        type Strategy = BoxedStrategy<Self>;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use color_eyre::eyre::Result;
    use std::convert::TryFrom;

    #[test]
    fn test_add() -> Result<()> {
        let one: Amount = Amount::try_from(1i64)?;
        let neg_one: Amount = Amount::try_from(-1i64)?;

        let zero: Amount = Amount::try_from(0i64)?;
        let new_zero = one + neg_one;

        assert_eq!(zero, new_zero?);

        Ok(())
    }

    #[test]
    fn add_with_diff_constraints_fails() -> Result<()> {
        let one = Amount::<NonNegative>::try_from(1i64)?;
        let zero = Amount::<NonNegative>::zero();

        // NonNegative cannot go below zero
        assert!((zero - one).is_err());

        Ok(())
    }

    #[test]
    fn deserialize_checks_bounds() {
        let big = (MAX_ATOMS + 1)
            .var_serialize_to_vec()
            .expect("serialize i64");
        assert!(Amount::<NonNegative>::var_deserialize(&big[..]).is_err());

        let neg = (-10i64).var_serialize_to_vec().expect("serialize i64");
        assert!(Amount::<NonNegative>::var_deserialize(&neg[..]).is_err());
    }

    #[test]
    fn sum_overflow_is_error() {
        let max = Amount::<NonNegative>::try_from(MAX_ATOMS).unwrap();
        let one = Amount::<NonNegative>::try_from(1i64).unwrap();

        let sum: Result<Amount<NonNegative>, Error> = vec![max, one].into_iter().sum();
        assert!(sum.is_err());
    }
}
