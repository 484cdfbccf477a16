//! Positional state slots for function components.
//!
//! While a component renders, the renderer installs a [`HookFrame`] holding
//! the hooks of the fiber's alternate. Each `use_state` call takes the next
//! slot by position, so the call sequence of a component must not change
//! between renders.

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::RenderError;
use crate::fiber::{FiberId, HookSlot};
use crate::runtime::RuntimeHandle;

/// Pending change to a state slot.
pub enum StateUpdate<T> {
    Replace(T),
    Apply(Rc<dyn Fn(&T) -> T>),
}

impl<T: Clone> StateUpdate<T> {
    fn apply(&self, state: T) -> T {
        match self {
            StateUpdate::Replace(value) => value.clone(),
            StateUpdate::Apply(update) => update(&state),
        }
    }
}

impl<T> fmt::Debug for StateUpdate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateUpdate::Replace(_) => f.write_str("Replace(..)"),
            StateUpdate::Apply(_) => f.write_str("Apply(..)"),
        }
    }
}

type UpdateQueue<T> = Rc<RefCell<Vec<StateUpdate<T>>>>;

struct StateHook<T> {
    state: T,
    queue: UpdateQueue<T>,
}

/// Setter paired with a state slot. Updates are queued and take effect on the
/// next render, which the setter requests from the committed root.
pub struct SetState<T> {
    queue: UpdateQueue<T>,
    runtime: RuntimeHandle,
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Rc::clone(&self.queue),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T: 'static> SetState<T> {
    pub fn set(&self, value: T) {
        self.dispatch(StateUpdate::Replace(value));
    }

    pub fn update(&self, update: impl Fn(&T) -> T + 'static) {
        self.dispatch(StateUpdate::Apply(Rc::new(update)));
    }

    pub fn dispatch(&self, update: StateUpdate<T>) {
        self.queue.borrow_mut().push(update);
        self.runtime.request_rerender();
    }
}

impl<T> fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetState")
            .field("pending", &self.queue.borrow().len())
            .finish()
    }
}

pub(crate) struct HookFrame {
    fiber: FiberId,
    previous: Vec<HookSlot>,
    hooks: Vec<HookSlot>,
    index: usize,
    runtime: RuntimeHandle,
}

impl HookFrame {
    pub(crate) fn new(fiber: FiberId, previous: Vec<HookSlot>, runtime: RuntimeHandle) -> Self {
        Self {
            fiber,
            previous,
            hooks: Vec::new(),
            index: 0,
            runtime,
        }
    }
}

thread_local! {
    static HOOK_FRAMES: RefCell<Vec<HookFrame>> = const { RefCell::new(Vec::new()) };
}

struct FrameGuard {
    armed: bool,
}

impl FrameGuard {
    fn finish(mut self) -> Option<HookFrame> {
        self.armed = false;
        HOOK_FRAMES.with(|frames| frames.borrow_mut().pop())
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if self.armed {
            HOOK_FRAMES.with(|frames| {
                frames.borrow_mut().pop();
            });
        }
    }
}

/// Runs `render` with `frame` as the active render context and returns the
/// hooks the render produced, in call order.
pub(crate) fn render_with_hooks<R>(
    frame: HookFrame,
    render: impl FnOnce() -> R,
) -> (R, Vec<HookSlot>) {
    let fiber = frame.fiber;
    HOOK_FRAMES.with(|frames| frames.borrow_mut().push(frame));
    let guard = FrameGuard { armed: true };
    let result = render();
    let hooks = guard.finish().map(|frame| frame.hooks).unwrap_or_default();
    log::trace!("fiber {fiber:?} rendered with {} hooks", hooks.len());
    (result, hooks)
}

/// Declares a state slot at the current position of the rendering component.
///
/// Returns the state with every queued update folded in, plus its setter.
/// Fails with [`RenderError::InvalidHookContext`] outside a component render.
pub fn use_state<T: Clone + 'static>(initial: T) -> Result<(T, SetState<T>), RenderError> {
    HOOK_FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        let frame = frames.last_mut().ok_or(RenderError::InvalidHookContext)?;
        let index = frame.index;
        let state = match frame.previous.get(index) {
            Some(slot) => {
                let previous = (**slot)
                    .downcast_ref::<StateHook<T>>()
                    .ok_or(RenderError::HookMismatch {
                        index,
                        expected: type_name::<T>(),
                    })?;
                previous
                    .queue
                    .borrow()
                    .iter()
                    .fold(previous.state.clone(), |state, update| update.apply(state))
            }
            None => initial,
        };
        let hook = StateHook {
            state: state.clone(),
            queue: Rc::new(RefCell::new(Vec::new())),
        };
        let setter = SetState {
            queue: Rc::clone(&hook.queue),
            runtime: frame.runtime.clone(),
        };
        frame.hooks.push(Rc::new(hook));
        frame.index += 1;
        Ok((state, setter))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Runtime;

    fn frame(previous: Vec<HookSlot>, runtime: &Runtime) -> HookFrame {
        HookFrame::new(FiberId::from_index(0), previous, runtime.handle())
    }

    #[test]
    fn use_state_outside_render_is_rejected() {
        assert_eq!(use_state(0).unwrap_err(), RenderError::InvalidHookContext);
    }

    #[test]
    fn queued_updates_fold_in_order() {
        let runtime = Runtime::default();
        let ((first, setter), hooks) = render_with_hooks(frame(Vec::new(), &runtime), || {
            use_state(1).expect("state")
        });
        assert_eq!(first, 1);

        setter.update(|count| count + 1);
        setter.set(10);
        setter.update(|count| count * 3);
        assert!(runtime.has_rerender_request());

        let ((second, _), next_hooks) =
            render_with_hooks(frame(hooks.clone(), &runtime), || use_state(1).expect("state"));
        assert_eq!(second, 30);

        // A replay from the same previous generation sees the same result.
        let ((replayed, _), _) =
            render_with_hooks(frame(hooks, &runtime), || use_state(1).expect("state"));
        assert_eq!(replayed, 30);

        let ((third, _), _) =
            render_with_hooks(frame(next_hooks, &runtime), || use_state(1).expect("state"));
        assert_eq!(third, 30);
    }

    #[test]
    fn slots_are_bound_by_position() {
        let runtime = Runtime::default();
        let render = |previous: Vec<HookSlot>| {
            render_with_hooks(frame(previous, &runtime), || {
                let (name, set_name) = use_state(String::from("Luke")).expect("name");
                let (count, set_count) = use_state(1u32).expect("count");
                (name, set_name, count, set_count)
            })
        };

        let ((_, set_name, _, set_count), hooks) = render(Vec::new());
        set_name.set("Leia".into());
        set_count.update(|count| count + 1);
        let ((name, _, count, _), hooks) = render(hooks);
        assert_eq!((name.as_str(), count), ("Leia", 2));

        let ((name, _, count, _), _) = render(hooks);
        assert_eq!((name.as_str(), count), ("Leia", 2));
    }

    #[test]
    fn mismatched_slot_type_is_reported() {
        let runtime = Runtime::default();
        let (_, hooks) =
            render_with_hooks(frame(Vec::new(), &runtime), || use_state(1i32).expect("state"));

        let (result, _) = render_with_hooks(frame(hooks, &runtime), || use_state(false));

        assert_eq!(
            result.unwrap_err(),
            RenderError::HookMismatch {
                index: 0,
                expected: "bool"
            }
        );
    }

    #[test]
    fn frame_is_removed_when_render_panics() {
        let runtime = Runtime::default();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            render_with_hooks(frame(Vec::new(), &runtime), || panic!("component exploded"))
        }));

        assert!(outcome.is_err());
        assert_eq!(use_state(0).unwrap_err(), RenderError::InvalidHookContext);
    }
}
