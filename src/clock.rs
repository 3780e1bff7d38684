//! The injectable clock backing `CURRENT_DATE`/`CURRENT_TIME`/`CURRENT_TIMESTAMP`.

use chrono::{Local, NaiveDateTime};

/// Supplies the current local date/time to the evaluator.
///
/// Swappable in tests for deterministic niladic-function results; the
/// default implementation reads the system clock via `chrono`.
pub trait Clock: std::fmt::Debug {
    /// The current local date and time.
    fn now(&self) -> NaiveDateTime;
}

/// The default [`Clock`], backed by the system's local time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
