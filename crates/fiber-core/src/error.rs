use thiserror::Error;

use crate::fiber::FiberId;
use crate::NodeId;

/// Failures reported by a [`HostSurface`](crate::HostSurface) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    #[error("node {id} missing")]
    Missing { id: NodeId },
    #[error("node {child} is not a child of node {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("node {id} is not an element and cannot hold children")]
    NotAnElement { id: NodeId },
}

/// Failures that abort a render pass.
///
/// Nothing is retried. Effects applied by a commit before the failure stay
/// applied on the host surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("state hook called outside of a component render")]
    InvalidHookContext,
    #[error("fiber {fiber:?} has no ancestor owning a host node")]
    OrphanFiber { fiber: FiberId },
    #[error("hook slot {index} does not hold a `{expected}` state")]
    HookMismatch { index: usize, expected: &'static str },
    #[error("component `{name}` failed: {message}")]
    Component { name: &'static str, message: String },
    #[error(transparent)]
    Host(#[from] NodeError),
}

impl RenderError {
    pub fn component(name: &'static str, message: impl Into<String>) -> Self {
        RenderError::Component {
            name,
            message: message.into(),
        }
    }
}
