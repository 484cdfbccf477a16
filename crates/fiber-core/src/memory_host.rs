//! In-memory document used as the reference [`HostSurface`].

use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::element::{Event, Listener, PropValue, NODE_VALUE, TEXT_ELEMENT};
use crate::error::NodeError;
use crate::host::HostSurface;
use crate::NodeId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemoryNodeKind {
    Element(String),
    Text,
}

#[derive(Clone, Debug)]
pub struct MemoryNode {
    pub kind: MemoryNodeKind,
    pub properties: IndexMap<String, PropValue>,
    pub listeners: Vec<(String, Listener)>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

impl MemoryNode {
    fn new(kind: MemoryNodeKind) -> Self {
        Self {
            kind,
            properties: IndexMap::new(),
            listeners: Vec::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn tag(&self) -> &str {
        match &self.kind {
            MemoryNodeKind::Element(tag) => tag,
            MemoryNodeKind::Text => TEXT_ELEMENT,
        }
    }
}

/// Host mutations recorded by [`MemoryHost`], in the order they were applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostOp {
    CreateNode { node: NodeId, tag: String },
    CreateText { node: NodeId, value: String },
    SetProperty { node: NodeId, name: String },
    RemoveProperty { node: NodeId, name: String },
    AddListener { node: NodeId, event_type: String },
    RemoveListener { node: NodeId, event_type: String },
    AppendChild { parent: NodeId, child: NodeId },
    RemoveChild { parent: NodeId, child: NodeId },
}

impl HostOp {
    /// Whether the op touched the attached document rather than building a
    /// detached node.
    pub fn is_structural(&self) -> bool {
        matches!(self, HostOp::AppendChild { .. } | HostOp::RemoveChild { .. })
    }
}

/// Structural snapshot of a host subtree: tags, text values and nesting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostShape {
    Element { tag: String, children: Vec<HostShape> },
    Text(String),
}

#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<Option<MemoryNode>>,
    ops: Vec<HostOp>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached element to render into.
    pub fn create_container(&mut self, tag: &str) -> NodeId {
        self.insert(MemoryNode::new(MemoryNodeKind::Element(tag.to_owned())))
    }

    fn insert(&mut self, node: MemoryNode) -> NodeId {
        self.nodes.push(Some(node));
        self.nodes.len() - 1
    }

    pub fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MemoryNode, NodeError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(NodeError::Missing { id })
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut MemoryNode, NodeError> {
        let node = self.node_mut(id)?;
        match node.kind {
            MemoryNodeKind::Element(_) => Ok(node),
            MemoryNodeKind::Text => Err(NodeError::NotAnElement { id }),
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |node| node.children.as_slice())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    pub fn property(&self, id: NodeId, name: &str) -> Option<&PropValue> {
        self.node(id).and_then(|node| node.properties.get(name))
    }

    /// Value of a text node.
    pub fn text(&self, id: NodeId) -> Option<String> {
        let node = self.node(id)?;
        match node.kind {
            MemoryNodeKind::Text => Some(
                node.properties
                    .get(NODE_VALUE)
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            ),
            MemoryNodeKind::Element(_) => None,
        }
    }

    /// Concatenated text of every text node below `id`, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut output = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(text) = self.text(current) {
                output.push_str(&text);
            }
            stack.extend(self.children(current).iter().rev());
        }
        output
    }

    /// Attached descendants of `root` (excluding `root`) whose tag is `tag`.
    pub fn find_all(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if self.node(current).is_some_and(|node| node.tag() == tag) {
                found.push(current);
            }
            stack.extend(self.children(current).iter().rev());
        }
        found
    }

    pub fn find(&self, root: NodeId, tag: &str) -> Option<NodeId> {
        self.find_all(root, tag).into_iter().next()
    }

    /// Invokes every listener registered on `node` for `event_type`.
    /// Returns how many listeners ran.
    pub fn dispatch_event(
        &self,
        node: NodeId,
        event_type: &str,
        event: Event,
    ) -> Result<usize, NodeError> {
        let target = self.node(node).ok_or(NodeError::Missing { id: node })?;
        let listeners: Vec<Listener> = target
            .listeners
            .iter()
            .filter(|(kind, _)| kind == event_type)
            .map(|(_, listener)| listener.clone())
            .collect();
        let event = Event {
            event_type: event_type.to_owned(),
            target: Some(node),
            ..event
        };
        for listener in &listeners {
            listener.call(&event);
        }
        Ok(listeners.len())
    }

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    /// Number of nodes ever created, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape(&self, root: NodeId) -> Option<HostShape> {
        let node = self.node(root)?;
        Some(match node.kind {
            MemoryNodeKind::Text => HostShape::Text(self.text(root).unwrap_or_default()),
            MemoryNodeKind::Element(ref tag) => HostShape::Element {
                tag: tag.clone(),
                children: node
                    .children
                    .iter()
                    .filter_map(|child| self.shape(*child))
                    .collect(),
            },
        })
    }

    pub fn dump_tree(&self, root: Option<NodeId>) -> String {
        let mut output = String::new();
        match root {
            Some(root) => self.dump_node(&mut output, root, 0),
            None => output.push_str("(no root)\n"),
        }
        output
    }

    fn dump_node(&self, output: &mut String, id: NodeId, depth: usize) {
        let indent = "  ".repeat(depth);
        let Some(node) = self.node(id) else {
            let _ = writeln!(output, "{indent}[{id}] (missing)");
            return;
        };
        match node.kind {
            MemoryNodeKind::Text => {
                let value = self.text(id).unwrap_or_default();
                let _ = writeln!(output, "{indent}[{id}] \"{value}\"");
            }
            MemoryNodeKind::Element(ref tag) => {
                let _ = write!(output, "{indent}[{id}] <{tag}");
                for (name, value) in &node.properties {
                    let _ = write!(output, " {name}=\"{value}\"");
                }
                for (event_type, _) in &node.listeners {
                    let _ = write!(output, " on:{event_type}");
                }
                output.push_str(">\n");
                for child in &node.children {
                    self.dump_node(output, *child, depth + 1);
                }
            }
        }
    }

    fn detach(&mut self, child: NodeId) -> Result<(), NodeError> {
        if let Some(parent) = self.node_mut(child)?.parent.take() {
            self.node_mut(parent)?.children.retain(|id| *id != child);
        }
        Ok(())
    }
}

impl HostSurface for MemoryHost {
    fn create_node(&mut self, tag: &str) -> Result<NodeId, NodeError> {
        let node = self.insert(MemoryNode::new(MemoryNodeKind::Element(tag.to_owned())));
        self.ops.push(HostOp::CreateNode {
            node,
            tag: tag.to_owned(),
        });
        Ok(node)
    }

    fn create_text_node(&mut self, value: &str) -> Result<NodeId, NodeError> {
        let mut text = MemoryNode::new(MemoryNodeKind::Text);
        text.properties
            .insert(NODE_VALUE.to_owned(), PropValue::from(value));
        let node = self.insert(text);
        self.ops.push(HostOp::CreateText {
            node,
            value: value.to_owned(),
        });
        Ok(node)
    }

    fn set_property(
        &mut self,
        node: NodeId,
        name: &str,
        value: &PropValue,
    ) -> Result<(), NodeError> {
        self.node_mut(node)?
            .properties
            .insert(name.to_owned(), value.clone());
        self.ops.push(HostOp::SetProperty {
            node,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn remove_property(&mut self, node: NodeId, name: &str) -> Result<(), NodeError> {
        self.node_mut(node)?.properties.shift_remove(name);
        self.ops.push(HostOp::RemoveProperty {
            node,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn add_event_listener(
        &mut self,
        node: NodeId,
        event_type: &str,
        listener: &Listener,
    ) -> Result<(), NodeError> {
        self.node_mut(node)?
            .listeners
            .push((event_type.to_owned(), listener.clone()));
        self.ops.push(HostOp::AddListener {
            node,
            event_type: event_type.to_owned(),
        });
        Ok(())
    }

    fn remove_event_listener(
        &mut self,
        node: NodeId,
        event_type: &str,
        listener: &Listener,
    ) -> Result<(), NodeError> {
        self.node_mut(node)?
            .listeners
            .retain(|(kind, existing)| !(kind == event_type && existing == listener));
        self.ops.push(HostOp::RemoveListener {
            node,
            event_type: event_type.to_owned(),
        });
        Ok(())
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        self.element_mut(parent)?;
        self.detach(child)?;
        self.node_mut(child)?.parent = Some(parent);
        self.element_mut(parent)?.children.push(child);
        self.ops.push(HostOp::AppendChild { parent, child });
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        if self.node_mut(child)?.parent != Some(parent) {
            return Err(NodeError::NotAChild { parent, child });
        }
        self.detach(child)?;
        self.ops.push(HostOp::RemoveChild { parent, child });
        Ok(())
    }
}
