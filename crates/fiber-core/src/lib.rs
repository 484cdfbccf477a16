//! Core of a fiber-based incremental UI renderer.
//!
//! Element descriptions go in, a fiber tree is reconciled against the last
//! committed one in interruptible slices, and the finished tree is committed
//! to a [`HostSurface`] in one uninterrupted pass.

pub mod collections;
mod commit;
pub mod element;
pub mod error;
pub mod fiber;
pub mod hooks;
pub mod host;
pub mod memory_host;
pub mod platform;
mod reconcile;
pub mod renderer;
pub mod runtime;

pub use commit::CommitSummary;
pub use element::{
    create_element, create_text_element, Attributes, Child, Component, Element, ElementType, Event,
    Listener, PropValue, Props, NODE_VALUE, TEXT_ELEMENT,
};
pub use error::{NodeError, RenderError};
pub use fiber::{EffectTag, Fiber, FiberArena, FiberId};
pub use hooks::{use_state, SetState, StateUpdate};
pub use host::{event_type, HostSurface};
pub use memory_host::{HostOp, HostShape, MemoryHost, MemoryNode, MemoryNodeKind};
pub use platform::{Deadline, IdleScheduler, Unbounded, UnitBudget};
pub use renderer::{Renderer, WorkLoopConfig, WorkStatus};
pub use runtime::{DefaultScheduler, Runtime, RuntimeHandle};

/// Handle of a node on the host render surface.
pub type NodeId = usize;
