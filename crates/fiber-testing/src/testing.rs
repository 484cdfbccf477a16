use fiber_core::{
    EffectTag, Element, ElementType, Event, HostShape, MemoryHost, NodeError, NodeId, RenderError,
    Renderer, UnitBudget, WorkStatus, NODE_VALUE,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TestError {
    #[error("no <{tag}> in the rendered tree")]
    NotFound { tag: String },
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Host(#[from] NodeError),
}

/// A renderer mounted into a fresh `root` container of a [`MemoryHost`].
///
/// Every mutating helper flushes synchronously unless it says otherwise, so
/// assertions always see a committed tree.
pub struct TestRoot {
    renderer: Renderer<MemoryHost>,
    container: NodeId,
}

impl TestRoot {
    pub fn new() -> Self {
        let mut host = MemoryHost::new();
        let container = host.create_container("root");
        Self {
            renderer: Renderer::new(host),
            container,
        }
    }

    /// Renders `element` into a fresh root and flushes the first commit.
    pub fn mount(element: Element) -> Result<Self, RenderError> {
        let mut root = Self::new();
        root.render(element)?;
        Ok(root)
    }

    pub fn render(&mut self, element: Element) -> Result<(), RenderError> {
        self.renderer.render(element, self.container);
        self.flush()
    }

    /// Seeds a render without running it; drive it with [`step`](Self::step).
    pub fn schedule(&mut self, element: Element) {
        self.renderer.render(element, self.container);
    }

    pub fn flush(&mut self) -> Result<(), RenderError> {
        self.renderer.flush_sync()
    }

    /// Runs one slice that may perform at most `units` units of work.
    pub fn step(&mut self, units: u64) -> Result<WorkStatus, RenderError> {
        self.renderer.work_loop(&UnitBudget::new(units))
    }

    /// Runs `units`-sized slices until the pending pass commits. Returns the
    /// number of slices it took.
    pub fn step_until_committed(&mut self, units: u64) -> Result<usize, RenderError> {
        let mut slices = 0;
        while self.renderer.has_pending_work() {
            slices += 1;
            if self.step(units)? == WorkStatus::Committed {
                break;
            }
        }
        Ok(slices)
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn host(&self) -> &MemoryHost {
        self.renderer.host()
    }

    pub fn host_mut(&mut self) -> &mut MemoryHost {
        self.renderer.host_mut()
    }

    pub fn renderer(&self) -> &Renderer<MemoryHost> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<MemoryHost> {
        &mut self.renderer
    }

    /// First attached node with `tag`, in document order.
    pub fn find(&self, tag: &str) -> Option<NodeId> {
        self.host().find(self.container, tag)
    }

    pub fn find_all(&self, tag: &str) -> Vec<NodeId> {
        self.host().find_all(self.container, tag)
    }

    pub fn text(&self) -> String {
        self.host().text_content(self.container)
    }

    pub fn text_of(&self, tag: &str) -> Option<String> {
        self.find(tag).map(|node| self.host().text_content(node))
    }

    /// Shapes of the container's children.
    pub fn shape(&self) -> Vec<HostShape> {
        self.host()
            .children(self.container)
            .iter()
            .filter_map(|child| self.host().shape(*child))
            .collect()
    }

    /// Effect tags of the committed tree in pre-order, root excluded.
    pub fn effects(&self) -> Vec<EffectTag> {
        let Some(root) = self.renderer.current_root() else {
            return Vec::new();
        };
        let fibers = self.renderer.fibers();
        fibers
            .preorder(root)
            .into_iter()
            .skip(1)
            .map(|id| fibers[id].effect())
            .collect()
    }

    /// Delivers `event_type` to the first `<tag>` without flushing.
    pub fn dispatch(&self, tag: &str, event: Event) -> Result<usize, TestError> {
        let node = self.find(tag).ok_or_else(|| TestError::NotFound {
            tag: tag.to_owned(),
        })?;
        let event_type = event.event_type.clone();
        Ok(self.host().dispatch_event(node, &event_type, event)?)
    }

    /// Clicks the first `<tag>` and flushes the resulting re-render.
    pub fn click(&mut self, tag: &str) -> Result<usize, TestError> {
        let handled = self.dispatch(tag, Event::new("click"))?;
        self.flush()?;
        Ok(handled)
    }

    pub fn dump(&self) -> String {
        self.host().dump_tree(Some(self.container))
    }
}

impl Default for TestRoot {
    fn default() -> Self {
        Self::new()
    }
}

/// Shape a host tree must have after committing `element`, or `None` when the
/// tree contains components, whose output is only known after rendering.
pub fn expected_shape(element: &Element) -> Option<HostShape> {
    match element.element_type() {
        ElementType::Text => Some(HostShape::Text(
            element.props().text(NODE_VALUE).unwrap_or_default(),
        )),
        ElementType::Host(tag) => {
            let children = element
                .children()
                .iter()
                .map(expected_shape)
                .collect::<Option<Vec<_>>>()?;
            Some(HostShape::Element {
                tag: tag.to_string(),
                children,
            })
        }
        ElementType::Component(component) => {
            log::debug!("no static shape for component `{}`", component.name());
            None
        }
    }
}
