use std::time::Duration;

use fiber_core::{Element, HostSurface, MemoryHost, NodeId, Renderer, WorkLoopConfig, WorkStatus};
use fiber_runtime_std::StdRuntime;

/// Drives a [`Renderer`] from an event loop: the loop polls
/// [`should_render`](Self::should_render) and calls [`update`](Self::update)
/// once per idle period.
pub struct AppShell<H: HostSurface> {
    runtime: StdRuntime,
    renderer: Renderer<H>,
    container: NodeId,
    commits: usize,
}

impl<H: HostSurface> AppShell<H> {
    pub fn new(host: H, container: NodeId, root: Element) -> Self {
        Self::with_runtime(StdRuntime::new(), host, container, root)
    }

    pub fn with_runtime(runtime: StdRuntime, host: H, container: NodeId, root: Element) -> Self {
        let mut renderer = Renderer::with_runtime(host, runtime.runtime());
        renderer.render(root, container);
        Self {
            runtime,
            renderer,
            container,
            commits: 0,
        }
    }

    pub fn with_config(mut self, config: WorkLoopConfig) -> Self {
        self.renderer = self.renderer.with_config(config);
        self
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn host(&self) -> &H {
        self.renderer.host()
    }

    pub fn host_mut(&mut self) -> &mut H {
        self.renderer.host_mut()
    }

    pub fn renderer(&mut self) -> &mut Renderer<H> {
        &mut self.renderer
    }

    pub fn runtime(&self) -> &StdRuntime {
        &self.runtime
    }

    /// Number of commits applied since the shell was created.
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Registers a callback run whenever the renderer asks for an idle slice,
    /// so an event loop can sleep until there is work.
    pub fn set_idle_waker(&mut self, waker: impl Fn() + Send + Sync + 'static) {
        self.runtime.set_idle_waker(waker);
    }

    pub fn clear_idle_waker(&mut self) {
        self.runtime.clear_idle_waker();
    }

    /// Replaces the root element; the next slices reconcile against what is
    /// on screen.
    pub fn set_root(&mut self, root: Element) {
        self.renderer.render(root, self.container);
    }

    /// The work loop re-arms its idle callback after every slice, so the
    /// renderer's pending work decides whether another slice is needed.
    pub fn should_render(&self) -> bool {
        self.renderer.has_pending_work()
    }

    /// Runs one idle slice with the runtime's slice budget. Failures abort the
    /// pass and are logged; the committed tree stays on screen.
    pub fn update(&mut self) -> Option<WorkStatus> {
        self.runtime.take_idle_request();
        let deadline = self.runtime.begin_slice();
        match self.renderer.work_loop(&deadline) {
            Ok(status) => {
                if status == WorkStatus::Committed {
                    self.commits += 1;
                }
                Some(status)
            }
            Err(err) => {
                log::error!("render slice failed: {err}");
                None
            }
        }
    }

    /// Runs slices until the renderer has no pending work or `max_slices` ran.
    /// Returns the number of slices run.
    pub fn run_until_idle(&mut self, max_slices: usize) -> usize {
        let mut slices = 0;
        while slices < max_slices && self.should_render() {
            self.update();
            slices += 1;
        }
        if self.renderer.has_pending_work() {
            log::warn!("still busy after {slices} slices");
        }
        slices
    }
}

impl AppShell<MemoryHost> {
    /// Shell over an in-memory document with a fresh `root` container.
    pub fn headless(root: Element, slice_budget: Duration) -> Self {
        let mut host = MemoryHost::new();
        let container = host.create_container("root");
        Self::with_runtime(
            StdRuntime::with_slice_budget(slice_budget),
            host,
            container,
            root,
        )
    }

    pub fn log_debug_info(&self) {
        log::info!("current screen state:");
        for line in self.host().dump_tree(Some(self.container)).lines() {
            log::info!("  {line}");
        }
    }
}
