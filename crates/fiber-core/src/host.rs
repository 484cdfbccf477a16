//! Boundary between the renderer and the surface it mutates.

use crate::element::{Attributes, ElementType, Listener, PropValue, Props, NODE_VALUE};
use crate::error::NodeError;
use crate::NodeId;

/// The operations the renderer needs from a host render surface.
///
/// Nodes are addressed by [`NodeId`]. Creating a node does not attach it;
/// attachment only happens through [`append_child`](Self::append_child)
/// during commit.
pub trait HostSurface {
    fn create_node(&mut self, tag: &str) -> Result<NodeId, NodeError>;
    fn create_text_node(&mut self, value: &str) -> Result<NodeId, NodeError>;
    fn set_property(&mut self, node: NodeId, name: &str, value: &PropValue)
        -> Result<(), NodeError>;
    fn remove_property(&mut self, node: NodeId, name: &str) -> Result<(), NodeError>;
    fn add_event_listener(
        &mut self,
        node: NodeId,
        event_type: &str,
        listener: &Listener,
    ) -> Result<(), NodeError>;
    fn remove_event_listener(
        &mut self,
        node: NodeId,
        event_type: &str,
        listener: &Listener,
    ) -> Result<(), NodeError>;
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError>;
    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError>;
}

/// Event type a listener property binds to: `onClick` -> `click`.
pub fn event_type(name: &str) -> String {
    name.strip_prefix("on").unwrap_or(name).to_lowercase()
}

fn listener_of<'a>(attributes: &'a Attributes, name: &str) -> Option<&'a Listener> {
    attributes.get(name).and_then(PropValue::as_listener)
}

fn is_property_of(attributes: &Attributes, name: &str) -> bool {
    attributes.get(name).is_some_and(|value| !value.is_listener())
}

pub(crate) fn create_host_node<H: HostSurface + ?Sized>(
    host: &mut H,
    element_type: &ElementType,
    props: &Props,
) -> Result<NodeId, NodeError> {
    match element_type {
        ElementType::Text => {
            let value = props.text(NODE_VALUE).unwrap_or_default();
            host.create_text_node(&value)
        }
        ElementType::Host(tag) => {
            let node = host.create_node(tag)?;
            update_host_node(host, node, &Attributes::default(), &props.attributes)?;
            Ok(node)
        }
        ElementType::Component(component) => {
            unreachable!("component `{}` never owns a host node", component.name())
        }
    }
}

/// Applies the difference between two attribute maps to `node`.
///
/// Order: stale listeners are detached, vanished properties cleared, new or
/// changed properties set, then new or changed listeners attached.
pub(crate) fn update_host_node<H: HostSurface + ?Sized>(
    host: &mut H,
    node: NodeId,
    prev: &Attributes,
    next: &Attributes,
) -> Result<(), NodeError> {
    for (name, value) in prev.iter() {
        if let Some(listener) = value.as_listener() {
            if listener_of(next, name) != Some(listener) {
                host.remove_event_listener(node, &event_type(name), listener)?;
            }
        }
    }

    for (name, value) in prev.iter() {
        if !value.is_listener() && !is_property_of(next, name) {
            host.remove_property(node, name)?;
        }
    }

    for (name, value) in next.iter() {
        if !value.is_listener() && prev.get(name) != Some(value) {
            host.set_property(node, name, value)?;
        }
    }

    for (name, value) in next.iter() {
        if let Some(listener) = value.as_listener() {
            if listener_of(prev, name) != Some(listener) {
                host.add_event_listener(node, &event_type(name), listener)?;
            }
        }
    }

    log::trace!("updated host node {node}");
    Ok(())
}
