//! Positional child diffing.
//!
//! Old children (the alternate's child chain) and new elements are walked in
//! lockstep by index. Matching is by position and type only; there are no
//! keys, so reordering a list shows up as deletions plus placements.

use crate::element::Element;
use crate::fiber::{EffectTag, Fiber, FiberArena, FiberId};

/// Rebuilds the child chain of `wip` from `elements`, tagging every new fiber
/// and pushing replaced or surplus old fibers onto `deletions`.
pub(crate) fn reconcile_children(
    fibers: &mut FiberArena,
    wip: FiberId,
    elements: &[Element],
    deletions: &mut Vec<FiberId>,
) {
    let mut old = fibers[wip].alternate.and_then(|alternate| fibers[alternate].child);
    let mut previous: Option<FiberId> = None;
    let mut index = 0;
    fibers[wip].child = None;

    while index < elements.len() || old.is_some() {
        let element = elements.get(index);
        let same_type = match (element, old) {
            (Some(element), Some(old)) => {
                fibers[old].element_type.as_ref() == Some(element.element_type())
            }
            _ => false,
        };

        let new_fiber = match (element, old) {
            (Some(element), Some(old)) if same_type => {
                let matched = &fibers[old];
                let effect = if matched.props.attributes == element.props().attributes {
                    EffectTag::None
                } else {
                    EffectTag::Update
                };
                let node = matched.node;
                let mut fiber =
                    Fiber::new(element.element_type().clone(), element.shared_props(), wip);
                fiber.node = node;
                fiber.alternate = Some(old);
                fiber.effect = effect;
                Some(fibers.insert(fiber))
            }
            (Some(element), _) => {
                let mut fiber =
                    Fiber::new(element.element_type().clone(), element.shared_props(), wip);
                fiber.effect = EffectTag::Placement;
                Some(fibers.insert(fiber))
            }
            (None, _) => None,
        };

        if let Some(old_fiber) = old {
            if !same_type {
                fibers[old_fiber].effect = EffectTag::Deletion;
                deletions.push(old_fiber);
            }
            old = fibers[old_fiber].sibling;
        }

        if let Some(new_fiber) = new_fiber {
            match previous {
                None => fibers[wip].child = Some(new_fiber),
                Some(previous) => fibers[previous].sibling = Some(new_fiber),
            }
            previous = Some(new_fiber);
        }

        index += 1;
    }
}
