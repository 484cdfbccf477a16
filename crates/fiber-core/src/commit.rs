//! Applies a finished work-in-progress tree to the host surface.
//!
//! Commit runs to completion once started. Both walks use explicit stacks so
//! tree depth never turns into call-stack depth.

use crate::collections::map::HashSet;
use crate::element::Attributes;
use crate::error::RenderError;
use crate::fiber::{EffectTag, FiberArena, FiberId};
use crate::host::{update_host_node, HostSurface};
use crate::NodeId;

/// Effects applied by one commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub placements: usize,
    pub updates: usize,
    pub deletions: usize,
}

impl CommitSummary {
    pub fn is_empty(&self) -> bool {
        self.placements == 0 && self.updates == 0 && self.deletions == 0
    }
}

/// Closest ancestor that owns a host node. Component fibers are skipped
/// because they never own one.
fn host_parent_fiber(fibers: &FiberArena, fiber: FiberId) -> Result<FiberId, RenderError> {
    let mut cursor = fibers[fiber].parent;
    while let Some(id) = cursor {
        let ancestor = &fibers[id];
        if ancestor.node.is_some() {
            return Ok(id);
        }
        cursor = ancestor.parent;
    }
    Err(RenderError::OrphanFiber { fiber })
}

fn host_parent(fibers: &FiberArena, fiber: FiberId) -> Result<NodeId, RenderError> {
    let parent = host_parent_fiber(fibers, fiber)?;
    fibers[parent].node.ok_or(RenderError::OrphanFiber { fiber })
}

/// Fibers owning the host nodes directly under `parent`, in document order.
/// Component fibers are looked through.
fn host_children(fibers: &FiberArena, parent: FiberId) -> Vec<FiberId> {
    let mut owners = Vec::new();
    let mut stack: Vec<FiberId> = fibers[parent].child.into_iter().collect();
    while let Some(id) = stack.pop() {
        let fiber = &fibers[id];
        if let Some(sibling) = fiber.sibling {
            stack.push(sibling);
        }
        if fiber.node.is_some() {
            owners.push(id);
        } else if let Some(child) = fiber.child {
            stack.push(child);
        }
    }
    owners
}

/// Attaches the placed children of `parent`. The host can only append, so
/// every node from the first placed one onwards is appended again in fiber
/// order; `append_child` moves nodes that are already attached.
fn place_children<H: HostSurface + ?Sized>(
    fibers: &FiberArena,
    host: &mut H,
    parent: FiberId,
) -> Result<(), RenderError> {
    let Some(parent_node) = fibers[parent].node else {
        return Ok(());
    };
    let children = host_children(fibers, parent);
    let Some(first) = children
        .iter()
        .position(|&id| fibers[id].effect == EffectTag::Placement)
    else {
        return Ok(());
    };
    for &id in &children[first..] {
        if let Some(node) = fibers[id].node {
            host.append_child(parent_node, node)?;
        }
    }
    Ok(())
}

pub(crate) fn commit_root<H: HostSurface + ?Sized>(
    fibers: &FiberArena,
    host: &mut H,
    root: FiberId,
    deletions: &[FiberId],
) -> Result<CommitSummary, RenderError> {
    let mut summary = CommitSummary::default();
    let mut placed_under: Vec<FiberId> = Vec::new();
    let mut seen: HashSet<FiberId> = HashSet::default();

    let mut stack: Vec<FiberId> = fibers[root].child.into_iter().collect();
    while let Some(id) = stack.pop() {
        let fiber = &fibers[id];
        if let Some(sibling) = fiber.sibling {
            stack.push(sibling);
        }
        if let Some(child) = fiber.child {
            stack.push(child);
        }
        if let Some(parent) = commit_work(fibers, host, id, &mut summary)? {
            if seen.insert(parent) {
                placed_under.push(parent);
            }
        }
    }

    for &deleted in deletions {
        let parent = host_parent(fibers, deleted)?;
        commit_deletion(fibers, host, deleted, parent)?;
        summary.deletions += 1;
    }

    for parent in placed_under {
        place_children(fibers, host, parent)?;
    }

    Ok(summary)
}

/// Applies the effect of one fiber. A placement is only recorded here and
/// returns the host parent whose children must be attached afterwards.
fn commit_work<H: HostSurface + ?Sized>(
    fibers: &FiberArena,
    host: &mut H,
    id: FiberId,
    summary: &mut CommitSummary,
) -> Result<Option<FiberId>, RenderError> {
    let fiber = &fibers[id];
    let mut placed_under = None;
    match fiber.effect {
        EffectTag::None => {}
        EffectTag::Placement => {
            let parent = host_parent_fiber(fibers, id)?;
            if fiber.node.is_some() {
                placed_under = Some(parent);
            }
            summary.placements += 1;
        }
        EffectTag::Update => {
            if let Some(node) = fiber.node {
                let empty = Attributes::default();
                let previous = fiber
                    .alternate
                    .and_then(|alternate| fibers.get(alternate))
                    .map_or(&empty, |alternate| &alternate.props.attributes);
                update_host_node(host, node, previous, &fiber.props.attributes)?;
            }
            summary.updates += 1;
        }
        EffectTag::Deletion => {
            let parent = host_parent(fibers, id)?;
            commit_deletion(fibers, host, id, parent)?;
            summary.deletions += 1;
        }
    }
    Ok(placed_under)
}

/// Removes the host node backing `fiber`. A component fiber owns no node, so
/// the walk descends through first children until it reaches one that does.
fn commit_deletion<H: HostSurface + ?Sized>(
    fibers: &FiberArena,
    host: &mut H,
    fiber: FiberId,
    parent: NodeId,
) -> Result<(), RenderError> {
    let mut cursor = Some(fiber);
    while let Some(id) = cursor {
        let current = &fibers[id];
        if let Some(node) = current.node {
            host.remove_child(parent, node)?;
            return Ok(());
        }
        cursor = current.child;
    }
    Ok(())
}
