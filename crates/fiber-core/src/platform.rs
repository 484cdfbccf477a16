//! Platform abstraction traits for the scheduling host.
//!
//! The renderer never sleeps or spawns. A host registers the work loop as an
//! idle callback through [`IdleScheduler`] and hands each invocation a
//! [`Deadline`] describing how much of the idle slice is left.

use std::cell::Cell;
use std::time::Duration;

/// Registers the work loop to run during the host's next idle slice.
///
/// Implementations must tolerate repeated requests before the callback runs;
/// one pending request is enough.
pub trait IdleScheduler: Send + Sync {
    fn request_idle_callback(&self);
}

/// Remaining time in the current idle slice.
pub trait Deadline {
    fn time_remaining(&self) -> Duration;
}

/// Deadline that never runs out.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unbounded;

impl Deadline for Unbounded {
    fn time_remaining(&self) -> Duration {
        Duration::MAX
    }
}

/// Deadline that grants a fixed number of work units per slice.
///
/// Each query consumes one unit and reports the units left as milliseconds, so
/// with the default one millisecond yield threshold the loop performs exactly
/// `units` units of work (at least one).
#[derive(Debug)]
pub struct UnitBudget {
    remaining: Cell<u64>,
}

impl UnitBudget {
    pub fn new(units: u64) -> Self {
        Self {
            remaining: Cell::new(units),
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining.get()
    }
}

impl Deadline for UnitBudget {
    fn time_remaining(&self) -> Duration {
        let left = self.remaining.get().saturating_sub(1);
        self.remaining.set(left);
        Duration::from_millis(left)
    }
}
