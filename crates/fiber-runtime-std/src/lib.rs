//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides concrete implementations of the scheduling traits
//! defined in `fiber-core`. An event loop constructs a [`StdRuntime`], hands
//! [`StdRuntime::runtime`] to a [`fiber_core::Renderer`], and on every idle
//! period calls the work loop with the deadline from
//! [`StdRuntime::begin_slice`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use fiber_core::{Deadline, IdleScheduler, Runtime};

/// Length of an idle slice when none is configured, one 60 Hz frame.
pub const DEFAULT_SLICE_BUDGET: Duration = Duration::from_millis(16);

type Waker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler that records idle callback requests in an atomic flag.
pub struct StdScheduler {
    idle_requested: AtomicBool,
    idle_waker: RwLock<Option<Waker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            idle_requested: AtomicBool::new(false),
            idle_waker: RwLock::new(None),
        }
    }

    /// Returns whether an idle callback has been requested since the last call.
    pub fn take_idle_request(&self) -> bool {
        self.idle_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker invoked whenever an idle callback is requested.
    pub fn set_idle_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self
            .idle_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    pub fn clear_idle_waker(&self) {
        *self
            .idle_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .idle_waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field("idle_requested", &self.idle_requested.load(Ordering::SeqCst))
            .finish()
    }
}

impl IdleScheduler for StdScheduler {
    fn request_idle_callback(&self) {
        self.idle_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Wall-clock deadline for one idle slice.
#[derive(Clone, Copy, Debug)]
pub struct IdleDeadline {
    started: Instant,
    budget: Duration,
}

impl IdleDeadline {
    pub fn new(budget: Duration) -> Self {
        Self::starting_at(Instant::now(), budget)
    }

    pub fn starting_at(started: Instant, budget: Duration) -> Self {
        Self { started, budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }
}

impl Deadline for IdleDeadline {
    fn time_remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }
}

/// Convenience container bundling the standard scheduler and the renderer
/// runtime wired to it.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    runtime: Runtime,
    slice_budget: Duration,
}

impl StdRuntime {
    pub fn new() -> Self {
        Self::with_slice_budget(DEFAULT_SLICE_BUDGET)
    }

    pub fn with_slice_budget(slice_budget: Duration) -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        log::debug!("std runtime created with a {slice_budget:?} idle slice");
        Self {
            scheduler,
            runtime,
            slice_budget,
        }
    }

    /// Returns a [`fiber_core::Runtime`] configured with the standard scheduler.
    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn slice_budget(&self) -> Duration {
        self.slice_budget
    }

    /// Starts an idle slice of the configured length.
    pub fn begin_slice(&self) -> IdleDeadline {
        IdleDeadline::new(self.slice_budget)
    }

    /// Returns whether the renderer asked for an idle callback since the last poll.
    pub fn take_idle_request(&self) -> bool {
        self.scheduler.take_idle_request()
    }

    pub fn set_idle_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_idle_waker(waker);
    }

    pub fn clear_idle_waker(&self) {
        self.scheduler.clear_idle_waker();
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("slice_budget", &self.slice_budget)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}
