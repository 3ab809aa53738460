//! Format wrappers for structured logging and `Debug` impls.

use std::fmt;

/// Wrapper to override `Debug` to display a shorter summary type.
pub struct DisplayToDebug<T>(pub T);

impl<T> fmt::Debug for DisplayToDebug<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
