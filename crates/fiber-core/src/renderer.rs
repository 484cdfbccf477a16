//! The render session.
//!
//! [`Renderer`] owns everything a render pass needs: the fiber arena with both
//! generations, the cursor of the next unit of work, the pending deletions
//! and the host surface. Nothing here is global, and only the thread driving
//! the renderer mutates it.

use std::rc::Rc;
use std::time::Duration;

use crate::commit::{self, CommitSummary};
use crate::element::{Attributes, Element, ElementType, Props};
use crate::error::RenderError;
use crate::fiber::{Fiber, FiberArena, FiberId};
use crate::hooks::{render_with_hooks, HookFrame};
use crate::host::{create_host_node, HostSurface};
use crate::platform::{Deadline, Unbounded};
use crate::reconcile::reconcile_children;
use crate::runtime::Runtime;
use crate::NodeId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkLoopConfig {
    /// The loop yields once less than this much time is left in the slice.
    pub yield_threshold: Duration,
}

impl Default for WorkLoopConfig {
    fn default() -> Self {
        Self {
            yield_threshold: Duration::from_millis(1),
        }
    }
}

/// Outcome of one idle slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkStatus {
    /// There was nothing to do.
    Idle,
    /// The deadline ran out with work left; the cursor resumes next slice.
    Yielded,
    /// The tree was finished and committed during this slice.
    Committed,
}

pub struct Renderer<H: HostSurface> {
    host: H,
    runtime: Runtime,
    config: WorkLoopConfig,
    fibers: FiberArena,
    current_root: Option<FiberId>,
    wip_root: Option<FiberId>,
    next_unit_of_work: Option<FiberId>,
    deletions: Vec<FiberId>,
    last_commit: Option<CommitSummary>,
}

impl<H: HostSurface> Renderer<H> {
    pub fn new(host: H) -> Self {
        Self::with_runtime(host, Runtime::default())
    }

    pub fn with_runtime(host: H, runtime: Runtime) -> Self {
        Self {
            host,
            runtime,
            config: WorkLoopConfig::default(),
            fibers: FiberArena::new(),
            current_root: None,
            wip_root: None,
            next_unit_of_work: None,
            deletions: Vec::new(),
            last_commit: None,
        }
    }

    pub fn with_config(mut self, config: WorkLoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &WorkLoopConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn fibers(&self) -> &FiberArena {
        &self.fibers
    }

    pub fn current_root(&self) -> Option<FiberId> {
        self.current_root
    }

    pub fn work_in_progress_root(&self) -> Option<FiberId> {
        self.wip_root
    }

    pub fn pending_deletions(&self) -> &[FiberId] {
        &self.deletions
    }

    pub fn last_commit(&self) -> Option<CommitSummary> {
        self.last_commit
    }

    /// Whether a call to [`work_loop`](Self::work_loop) would do anything.
    pub fn has_pending_work(&self) -> bool {
        self.next_unit_of_work.is_some()
            || self.wip_root.is_some()
            || (self.current_root.is_some() && self.runtime.has_rerender_request())
    }

    /// Seeds a work-in-progress root rendering `element` into `container`.
    /// The previously committed root, if any, becomes its alternate.
    ///
    /// A pending state-change re-render is consumed: the new pass reads the
    /// queued updates through the alternate's hooks, so none are lost.
    pub fn render(&mut self, element: Element, container: NodeId) {
        log::debug!(
            "render of <{}> into container {container}",
            element.element_type().name()
        );
        if self.runtime.take_rerender_request() {
            log::trace!("pending state re-render folded into explicit render");
        }
        let props = Rc::new(Props::new(Attributes::default(), vec![element]));
        self.seed_work_in_progress(container, props);
    }

    /// Runs one idle slice: units of work until the cursor is exhausted or the
    /// deadline says to yield, then the commit if the tree is finished.
    ///
    /// The idle callback is re-armed after every invocation, including failed
    /// ones.
    pub fn work_loop(&mut self, deadline: &dyn Deadline) -> Result<WorkStatus, RenderError> {
        let status = self.run_slice(deadline);
        self.runtime.request_idle_callback();
        status
    }

    /// Runs slices without a deadline until no work is left.
    pub fn flush_sync(&mut self) -> Result<(), RenderError> {
        while self.has_pending_work() {
            self.work_loop(&Unbounded)?;
        }
        Ok(())
    }

    fn run_slice(&mut self, deadline: &dyn Deadline) -> Result<WorkStatus, RenderError> {
        self.apply_rerender_request();
        let mut units = 0usize;
        let mut should_yield = false;
        while !should_yield {
            let Some(fiber) = self.next_unit_of_work else {
                break;
            };
            match self.perform_unit_of_work(fiber) {
                Ok(next) => self.next_unit_of_work = next,
                Err(err) => {
                    self.abort(&err);
                    return Err(err);
                }
            }
            units += 1;
            should_yield = deadline.time_remaining() < self.config.yield_threshold;
            self.apply_rerender_request();
        }

        if self.next_unit_of_work.is_some() {
            log::trace!("yielding after {units} units of work");
            return Ok(WorkStatus::Yielded);
        }
        match self.wip_root {
            Some(root) => {
                self.commit_root(root)?;
                Ok(WorkStatus::Committed)
            }
            None => Ok(WorkStatus::Idle),
        }
    }

    fn seed_work_in_progress(&mut self, container: NodeId, props: Rc<Props>) {
        self.discard_work_in_progress();
        let root = self
            .fibers
            .insert(Fiber::root(container, props, self.current_root));
        self.wip_root = Some(root);
        self.next_unit_of_work = Some(root);
        self.deletions.clear();
        self.runtime.request_idle_callback();
    }

    /// Drops any in-flight pass. Host nodes it created stay detached.
    fn discard_work_in_progress(&mut self) {
        self.next_unit_of_work = None;
        self.deletions.clear();
        if self.wip_root.take().is_some() {
            let live: Vec<FiberId> = self.current_root.into_iter().collect();
            let freed = self.fibers.retain_reachable(&live);
            log::debug!("discarded work in progress ({freed} fibers reclaimed)");
        }
    }

    /// A state setter ran: restart from the committed root, last writer wins.
    /// Requests made before the first commit wait for it.
    fn apply_rerender_request(&mut self) {
        let Some(current) = self.current_root else {
            return;
        };
        if !self.runtime.take_rerender_request() {
            return;
        }
        let root = &self.fibers[current];
        let props = Rc::clone(&root.props);
        if let Some(container) = root.node {
            log::debug!("state changed, re-rendering from committed root {current:?}");
            self.seed_work_in_progress(container, props);
        }
    }

    fn abort(&mut self, err: &RenderError) {
        log::warn!("render pass aborted: {err}");
        self.discard_work_in_progress();
    }

    fn perform_unit_of_work(&mut self, fiber: FiberId) -> Result<Option<FiberId>, RenderError> {
        if self.fibers[fiber].is_component() {
            self.update_function_component(fiber)?;
        } else {
            self.update_host_component(fiber)?;
        }
        Ok(self.fibers.next_in_preorder(fiber))
    }

    fn update_function_component(&mut self, fiber: FiberId) -> Result<(), RenderError> {
        let wip = &self.fibers[fiber];
        let Some(ElementType::Component(component)) = wip.element_type.clone() else {
            return Ok(());
        };
        let props = Rc::clone(&wip.props);
        let previous = wip
            .alternate
            .map(|alternate| self.fibers[alternate].hooks.clone())
            .unwrap_or_default();

        let frame = HookFrame::new(fiber, previous, self.runtime.handle());
        let (child, hooks) = render_with_hooks(frame, || component.render(&props));
        self.fibers[fiber].hooks = hooks;
        let child = child?;
        reconcile_children(
            &mut self.fibers,
            fiber,
            std::slice::from_ref(&child),
            &mut self.deletions,
        );
        Ok(())
    }

    fn update_host_component(&mut self, fiber: FiberId) -> Result<(), RenderError> {
        let wip = &self.fibers[fiber];
        let props = Rc::clone(&wip.props);
        if wip.node.is_none() {
            if let Some(element_type) = wip.element_type.clone() {
                let node = create_host_node(&mut self.host, &element_type, &props)?;
                self.fibers[fiber].node = Some(node);
            }
        }
        reconcile_children(&mut self.fibers, fiber, &props.children, &mut self.deletions);
        Ok(())
    }

    fn commit_root(&mut self, root: FiberId) -> Result<(), RenderError> {
        let summary = match commit::commit_root(&self.fibers, &mut self.host, root, &self.deletions)
        {
            Ok(summary) => summary,
            Err(err) => {
                self.abort(&err);
                return Err(err);
            }
        };
        self.deletions.clear();
        self.fibers.clear_alternates(root);
        self.current_root = Some(root);
        self.wip_root = None;
        let freed = self.fibers.retain_reachable(&[root]);
        self.last_commit = Some(summary);
        log::debug!("committed {summary:?} ({freed} fibers reclaimed)");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/renderer_tests.rs"]
mod tests;
