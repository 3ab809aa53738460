use proptest::{collection::vec, prelude::*};

use chrono::{TimeZone, Utc};

use super::{LockTime, Transaction};
use crate::{block, transparent};

impl Arbitrary for LockTime {
    type Parameters = ();

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        prop_oneof![
            (0u32..(LockTime::MIN_TIMESTAMP as u32))
                .prop_map(|n| LockTime::Height(block::Height(n))),
            (LockTime::MIN_TIMESTAMP..=LockTime::MAX_TIMESTAMP)
                .prop_map(|n| LockTime::Time(Utc.timestamp(n, 0)))
        ]
        .boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}

impl Arbitrary for Transaction {
    type Parameters = ();

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (
            any::<u16>(),
            vec(any::<transparent::Input>(), 1..5),
            vec(any::<transparent::Output>(), 1..5),
            any::<LockTime>(),
            any::<u32>(),
        )
            .prop_map(|(version, inputs, outputs, lock_time, expiry)| {
                Transaction::new(version, inputs, outputs, lock_time, expiry)
            })
            .boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}
