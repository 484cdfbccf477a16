//! Testing utilities and harness for the fiber renderer.

pub mod testing;

pub use testing::*;

pub mod prelude {
    pub use crate::testing::*;
    pub use fiber_core::{
        create_element, create_text_element, use_state, Attributes, Child, Component, Element,
        Event, HostShape, RenderError, SetState,
    };
}
