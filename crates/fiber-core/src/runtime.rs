use std::cell::Cell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::platform::IdleScheduler;

struct RuntimeInner {
    scheduler: Arc<dyn IdleScheduler>,
    rerender_requested: Cell<bool>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn IdleScheduler>) -> Self {
        Self {
            scheduler,
            rerender_requested: Cell::new(false),
        }
    }

    fn request_idle_callback(&self) {
        self.scheduler.request_idle_callback();
    }

    fn request_rerender(&self) {
        self.rerender_requested.set(true);
        self.request_idle_callback();
    }
}

/// Shared state between the renderer and the state setters it hands out.
///
/// The renderer owns the [`Runtime`]; setters only hold a [`RuntimeHandle`],
/// so a setter outliving its renderer is a no-op.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn IdleScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn request_idle_callback(&self) {
        self.inner.request_idle_callback();
    }

    pub fn has_rerender_request(&self) -> bool {
        self.inner.rerender_requested.get()
    }

    pub(crate) fn take_rerender_request(&self) -> bool {
        self.inner.rerender_requested.replace(false)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(Arc::new(DefaultScheduler))
    }
}

#[derive(Debug, Default)]
pub struct DefaultScheduler;

impl IdleScheduler for DefaultScheduler {
    fn request_idle_callback(&self) {}
}

#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    /// Asks for a full re-render from the committed root.
    pub fn request_rerender(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.request_rerender();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingScheduler {
        requests: AtomicUsize,
    }

    impl IdleScheduler for CountingScheduler {
        fn request_idle_callback(&self) {
            self.requests.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn rerender_request_arms_idle_callback() {
        let scheduler = Arc::new(CountingScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        let handle = runtime.handle();

        handle.request_rerender();

        assert!(runtime.has_rerender_request());
        assert!(runtime.take_rerender_request());
        assert!(!runtime.take_rerender_request());
        assert_eq!(scheduler.requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handle_outliving_runtime_is_inert() {
        let scheduler = Arc::new(CountingScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        let handle = runtime.handle();
        drop(runtime);

        handle.request_rerender();
        assert_eq!(scheduler.requests.load(Ordering::SeqCst), 0);
    }
}
