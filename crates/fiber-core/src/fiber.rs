//! Arena-backed fiber tree.
//!
//! Both generations (the committed tree and the work-in-progress tree) live in
//! one [`FiberArena`]. Links between fibers are [`FiberId`]s, so promoting the
//! work-in-progress tree is an id swap and the previous generation is
//! reclaimed by sweeping everything no longer reachable from the live roots.

use std::any::Any;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::rc::Rc;

use crate::collections::map::HashSet;
use crate::element::{ElementType, Props};
use crate::NodeId;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiberId(usize);

impl FiberId {
    pub fn index(self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        FiberId(index)
    }
}

impl fmt::Debug for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EffectTag {
    #[default]
    None,
    Placement,
    Update,
    Deletion,
}

pub(crate) type HookSlot = Rc<dyn Any>;

pub struct Fiber {
    /// `None` only for a root fiber, which owns the container node.
    pub(crate) element_type: Option<ElementType>,
    pub(crate) props: Rc<Props>,
    pub(crate) node: Option<NodeId>,
    pub(crate) parent: Option<FiberId>,
    pub(crate) child: Option<FiberId>,
    pub(crate) sibling: Option<FiberId>,
    pub(crate) alternate: Option<FiberId>,
    pub(crate) effect: EffectTag,
    pub(crate) hooks: Vec<HookSlot>,
}

impl Fiber {
    pub(crate) fn root(container: NodeId, props: Rc<Props>, alternate: Option<FiberId>) -> Self {
        Self {
            element_type: None,
            props,
            node: Some(container),
            parent: None,
            child: None,
            sibling: None,
            alternate,
            effect: EffectTag::None,
            hooks: Vec::new(),
        }
    }

    pub(crate) fn new(element_type: ElementType, props: Rc<Props>, parent: FiberId) -> Self {
        Self {
            element_type: Some(element_type),
            props,
            node: None,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: None,
            effect: EffectTag::None,
            hooks: Vec::new(),
        }
    }

    pub fn element_type(&self) -> Option<&ElementType> {
        self.element_type.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.element_type.is_none()
    }

    pub fn is_component(&self) -> bool {
        self.element_type
            .as_ref()
            .is_some_and(ElementType::is_component)
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn parent(&self) -> Option<FiberId> {
        self.parent
    }

    pub fn child(&self) -> Option<FiberId> {
        self.child
    }

    pub fn sibling(&self) -> Option<FiberId> {
        self.sibling
    }

    pub fn alternate(&self) -> Option<FiberId> {
        self.alternate
    }

    pub fn effect(&self) -> EffectTag {
        self.effect
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }
}

impl fmt::Debug for Fiber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber")
            .field(
                "type",
                &self.element_type.as_ref().map_or("<root>", ElementType::name),
            )
            .field("node", &self.node)
            .field("effect", &self.effect)
            .field("parent", &self.parent)
            .field("child", &self.child)
            .field("sibling", &self.sibling)
            .field("alternate", &self.alternate)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[derive(Default)]
pub struct FiberArena {
    slots: Vec<Option<Fiber>>,
    free: Vec<usize>,
}

impl FiberArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, fiber: Fiber) -> FiberId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(fiber);
                FiberId(index)
            }
            None => {
                self.slots.push(Some(fiber));
                FiberId(self.slots.len() - 1)
            }
        }
    }

    pub fn get(&self, id: FiberId) -> Option<&Fiber> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Number of live fibers across both generations.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the direct children of `id` in sibling order.
    pub fn children(&self, id: FiberId) -> Children<'_> {
        Children {
            arena: self,
            next: self.get(id).and_then(|fiber| fiber.child),
        }
    }

    /// Pre-order successor of `id`: first child, else the nearest sibling found
    /// while walking up. `None` once the walk climbs past the root.
    pub(crate) fn next_in_preorder(&self, id: FiberId) -> Option<FiberId> {
        if let Some(child) = self[id].child {
            return Some(child);
        }
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let fiber = &self[current];
            if fiber.sibling.is_some() {
                return fiber.sibling;
            }
            cursor = fiber.parent;
        }
        None
    }

    /// Fibers of the tree rooted at `root` in pre-order, following only
    /// child and sibling links below the root.
    pub fn preorder(&self, root: FiberId) -> Vec<FiberId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(fiber) = self.get(id) else {
                continue;
            };
            order.push(id);
            if id != root {
                if let Some(sibling) = fiber.sibling {
                    stack.push(sibling);
                }
            }
            if let Some(child) = fiber.child {
                stack.push(child);
            }
        }
        order
    }

    pub(crate) fn clear_alternates(&mut self, root: FiberId) {
        for id in self.preorder(root) {
            self[id].alternate = None;
        }
    }

    /// Frees every fiber not reachable from `roots`. Returns how many were freed.
    pub(crate) fn retain_reachable(&mut self, roots: &[FiberId]) -> usize {
        let mut live: HashSet<usize> = HashSet::default();
        for &root in roots {
            live.extend(self.preorder(root).into_iter().map(FiberId::index));
        }
        let mut freed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_some() && !live.contains(&index) {
                *slot = None;
                self.free.push(index);
                freed += 1;
            }
        }
        freed
    }
}

impl Index<FiberId> for FiberArena {
    type Output = Fiber;

    fn index(&self, id: FiberId) -> &Fiber {
        match self.get(id) {
            Some(fiber) => fiber,
            None => panic!("fiber {id:?} was reclaimed"),
        }
    }
}

impl IndexMut<FiberId> for FiberArena {
    fn index_mut(&mut self, id: FiberId) -> &mut Fiber {
        match self.get_mut(id) {
            Some(fiber) => fiber,
            None => panic!("fiber {id:?} was reclaimed"),
        }
    }
}

pub struct Children<'a> {
    arena: &'a FiberArena,
    next: Option<FiberId>,
}

impl Iterator for Children<'_> {
    type Item = FiberId;

    fn next(&mut self) -> Option<FiberId> {
        let id = self.next?;
        self.next = self.arena.get(id).and_then(|fiber| fiber.sibling);
        Some(id)
    }
}
