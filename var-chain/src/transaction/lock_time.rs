use std::{convert::TryInto, io};

use chrono::{DateTime, TimeZone, Utc};

use crate::block;
use crate::serialization::{SerializationError, VarDeserialize, VarSerialize};

/// A transaction lock time.
///
/// Values below the threshold are interpreted as block heights;
/// values at or above it are Unix timestamps.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Hash)]
pub enum LockTime {
    /// Unlocked at the given block height.
    Height(block::Height),
    /// Unlocked at the given time.
    Time(DateTime<Utc>),
}

impl LockTime {
    /// The smallest interpreted-as-time lock time value.
    pub const MIN_TIMESTAMP: i64 = 500_000_000;

    /// The largest lock time timestamp representable on the wire.
    pub const MAX_TIMESTAMP: i64 = u32::MAX as i64;

    /// A lock time that locks nothing: height zero.
    pub fn unlocked() -> LockTime {
        LockTime::Height(block::Height(0))
    }

    /// Returns true for the all-zero lock time.
    pub fn is_unlocked(&self) -> bool {
        matches!(self, LockTime::Height(block::Height(0)))
    }
}

impl VarSerialize for LockTime {
    fn var_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error> {
        match self {
            LockTime::Height(block::Height(height)) => height.var_serialize(writer),
            LockTime::Time(time) => (time.timestamp() as u32).var_serialize(writer),
        }
    }
}

impl VarDeserialize for LockTime {
    fn var_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        let raw = u32::var_deserialize(reader)?;
        if i64::from(raw) < LockTime::MIN_TIMESTAMP {
            Ok(LockTime::Height(block::Height(raw)))
        } else {
            Ok(LockTime::Time(Utc.timestamp(raw.into(), 0)))
        }
    }
}

impl From<u32> for LockTime {
    fn from(raw: u32) -> LockTime {
        if i64::from(raw) < LockTime::MIN_TIMESTAMP {
            LockTime::Height(block::Height(raw))
        } else {
            LockTime::Time(Utc.timestamp(raw.into(), 0))
        }
    }
}

impl From<LockTime> for u32 {
    fn from(lock_time: LockTime) -> u32 {
        match lock_time {
            LockTime::Height(block::Height(height)) => height,
            LockTime::Time(time) => time
                .timestamp()
                .try_into()
                .expect("lock times are within the u32 range"),
        }
    }
}
