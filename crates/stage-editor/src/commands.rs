//! Commands and the undo/redo history.
//!
//! Every scene mutation is a `Command`: an immutable value holding enough
//! prior state to build its own inverse. Constructors below read the
//! current graph and return self-contained commands; nothing they return
//! depends on the graph it was built from.
//!
//! Multi-step edits (delete with re-parenting, group, duplicate) are
//! planned against a scratch copy of the graph so that every step records
//! the exact indices it will see when replayed in order.

use kurbo::Vec2;
use stage_core::geometry;
use stage_core::model::*;
use stage_core::{DeletePolicy, NodeId, SceneError, SceneGraph};
use thiserror::Error;

/// Position in a parent's child list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub parent: NodeId,
    pub index: usize,
}

/// Sibling ordering of a node: child-list index plus z-index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub index: usize,
    pub z_index: i32,
}

/// One reversible mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Insert a leaf node.
    Insert { parent: NodeId, index: usize, node: Node },
    /// Remove a leaf node.
    Remove { parent: NodeId, index: usize, node: Node },
    /// Move a node to another parent, replacing its local transform.
    Reparent {
        id: NodeId,
        from: Slot,
        to: Slot,
        before: Transform,
        after: Transform,
    },
    Transform {
        id: NodeId,
        before: Placement,
        after: Placement,
    },
    /// Move a node within its parent's paint order.
    Reorder { id: NodeId, before: Order, after: Order },
    SetFlags {
        id: NodeId,
        before: NodeFlags,
        after: NodeFlags,
    },
    SetStyle {
        id: NodeId,
        before: Style,
        after: Style,
    },
    /// Steps applied in order, all or nothing.
    Batch { label: String, commands: Vec<Command> },
}

impl Command {
    /// Short description for undo/redo UI.
    pub fn label(&self) -> &str {
        match self {
            Command::Insert { .. } => "Create",
            Command::Remove { .. } => "Delete",
            Command::Reparent { .. } => "Reparent",
            Command::Transform { .. } => "Transform",
            Command::Reorder { .. } => "Reorder",
            Command::SetFlags { .. } => "Set flags",
            Command::SetStyle { .. } => "Set style",
            Command::Batch { label, .. } => label,
        }
    }

    /// The command that undoes this one.
    pub fn inverse(&self) -> Command {
        match self {
            Command::Insert {
                parent,
                index,
                node,
            } => Command::Remove {
                parent: *parent,
                index: *index,
                node: node.clone(),
            },
            Command::Remove {
                parent,
                index,
                node,
            } => Command::Insert {
                parent: *parent,
                index: *index,
                node: node.clone(),
            },
            Command::Reparent {
                id,
                from,
                to,
                before,
                after,
            } => Command::Reparent {
                id: *id,
                from: *to,
                to: *from,
                before: *after,
                after: *before,
            },
            Command::Transform { id, before, after } => Command::Transform {
                id: *id,
                before: *after,
                after: *before,
            },
            Command::Reorder { id, before, after } => Command::Reorder {
                id: *id,
                before: *after,
                after: *before,
            },
            Command::SetFlags { id, before, after } => Command::SetFlags {
                id: *id,
                before: *after,
                after: *before,
            },
            Command::SetStyle { id, before, after } => Command::SetStyle {
                id: *id,
                before: after.clone(),
                after: before.clone(),
            },
            Command::Batch { label, commands } => Command::Batch {
                label: label.clone(),
                commands: commands.iter().rev().map(Command::inverse).collect(),
            },
        }
    }

    /// Apply the forward effect. On error the graph is left unchanged.
    pub fn apply(&self, graph: &mut SceneGraph) -> Result<(), SceneError> {
        match self {
            Command::Insert {
                parent,
                index,
                node,
            } => graph.insert_node(*parent, *index, node.clone()).map(|_| ()),

            Command::Remove { parent, node, .. } => {
                if graph.parent_of(node.id) != Some(*parent) {
                    return Err(SceneError::UnknownNode(node.id));
                }
                graph.remove_leaf(node.id).map(|_| ())
            }

            Command::Reparent { id, to, after, .. } => {
                graph.reparent(*id, to.parent, to.index)?;
                graph.set_transform(*id, *after)
            }

            Command::Transform { id, after, .. } => graph.set_placement(*id, *after),

            Command::Reorder { id, after, .. } => {
                let parent = graph.parent_of(*id).ok_or(SceneError::UnknownNode(*id))?;
                graph.reparent(*id, parent, after.index)?;
                graph.set_z_index(*id, after.z_index)
            }

            Command::SetFlags { id, after, .. } => graph.set_flags(*id, *after),

            Command::SetStyle { id, after, .. } => graph.set_style(*id, after.clone()),

            Command::Batch { label, commands } => {
                for (i, command) in commands.iter().enumerate() {
                    if let Err(err) = command.apply(graph) {
                        log::warn!("{label}: step {i} failed ({err}), rolling back");
                        for done in commands[..i].iter().rev() {
                            if let Err(undo_err) = done.inverse().apply(graph) {
                                log::error!("{label}: rollback failed: {undo_err}");
                            }
                        }
                        return Err(err);
                    }
                }
                Ok(())
            }
        }
    }
}

// ─── Planning ────────────────────────────────────────────────────────────

/// Accumulates steps while replaying them on a scratch graph, so each
/// step is computed against the state it will actually meet.
struct Plan {
    scratch: SceneGraph,
    steps: Vec<Command>,
}

impl Plan {
    fn new(graph: &SceneGraph) -> Self {
        Self {
            scratch: graph.clone(),
            steps: Vec::new(),
        }
    }

    fn push(&mut self, command: Command) -> Result<(), SceneError> {
        command.apply(&mut self.scratch)?;
        self.steps.push(command);
        Ok(())
    }

    fn slot_of(&self, id: NodeId) -> Result<Slot, SceneError> {
        let parent = self.scratch.parent_of(id).ok_or(SceneError::UnknownNode(id))?;
        let index = self
            .scratch
            .index_in_parent(id)
            .ok_or(SceneError::UnknownNode(id))?;
        Ok(Slot { parent, index })
    }

    fn node(&self, id: NodeId) -> Result<Node, SceneError> {
        self.scratch
            .get(id)
            .cloned()
            .ok_or(SceneError::UnknownNode(id))
    }

    /// Remove `id`, moving its children into its place with their world
    /// placement preserved.
    fn dissolve(&mut self, id: NodeId) -> Result<(), SceneError> {
        let node = self.node(id)?;
        let slot = self.slot_of(id)?;
        let children = self.scratch.child_ids(id);

        // Last child first: each lands right after the node, pushing the
        // previously moved ones down, which restores the original order.
        for (k, child) in children.iter().enumerate().rev() {
            let before = self.node(*child)?.transform;
            let after = if node.transform == Transform::IDENTITY {
                before
            } else {
                Transform::from_affine(geometry::compose(
                    node.transform.to_affine(),
                    before.to_affine(),
                ))
            };
            self.push(Command::Reparent {
                id: *child,
                from: Slot {
                    parent: id,
                    index: k,
                },
                to: Slot {
                    parent: slot.parent,
                    index: slot.index + 1,
                },
                before,
                after,
            })?;
        }

        self.push(Command::Remove {
            parent: slot.parent,
            index: slot.index,
            node,
        })
    }

    /// Remove `id` and its whole subtree, leaves first.
    fn destroy(&mut self, id: NodeId) -> Result<(), SceneError> {
        for victim in self.scratch.subtree_of(id).into_iter().rev() {
            let slot = self.slot_of(victim)?;
            let node = self.node(victim)?;
            self.push(Command::Remove {
                parent: slot.parent,
                index: slot.index,
                node,
            })?;
        }
        Ok(())
    }

    /// Deep-copy `source` under `slot` with fresh IDs. Returns the copy's ID.
    fn copy_subtree(&mut self, source: NodeId, slot: Slot, offset: Vec2) -> Result<NodeId, SceneError> {
        let original = self.node(source)?;
        let fresh = self.scratch.next_id(original.kind.tag());
        let copy = Node {
            id: fresh,
            transform: original.transform.translated(offset),
            ..original
        };
        self.push(Command::Insert {
            parent: slot.parent,
            index: slot.index,
            node: copy,
        })?;
        for (k, child) in self.scratch.child_ids(source).into_iter().enumerate() {
            self.copy_subtree(
                child,
                Slot {
                    parent: fresh,
                    index: k,
                },
                Vec2::ZERO,
            )?;
        }
        Ok(fresh)
    }

    fn finish(self, label: &str) -> Option<Command> {
        if self.steps.is_empty() {
            return None;
        }
        Some(Command::Batch {
            label: label.to_string(),
            commands: self.steps,
        })
    }
}

/// Known, non-root, outermost nodes of `ids` in paint order.
fn targets(graph: &SceneGraph, ids: &[NodeId]) -> Vec<NodeId> {
    let known: Vec<NodeId> = graph
        .paint_order()
        .into_iter()
        .filter(|id| ids.contains(id))
        .collect();
    graph.outermost(&known)
}

/// Map a world-space offset into `id`'s parent space.
fn parent_delta(graph: &SceneGraph, id: NodeId, delta: Vec2) -> Option<Vec2> {
    let parent_world = graph.parent_world_transform(id)?;
    let inv = geometry::invert(parent_world).ok()?;
    Some(geometry::map_vector(inv, delta))
}

// ─── Constructors ────────────────────────────────────────────────────────

/// Append `node` to `parent`'s children.
pub fn create(graph: &SceneGraph, parent: NodeId, node: Node) -> Command {
    Command::Insert {
        parent,
        index: graph.child_ids(parent).len(),
        node,
    }
}

/// Delete `ids` according to `policy`. Unknown IDs fail the whole command.
pub fn delete(
    graph: &SceneGraph,
    ids: &[NodeId],
    policy: DeletePolicy,
) -> Result<Option<Command>, SceneError> {
    if let Some(missing) = ids.iter().find(|id| !graph.contains(**id) || id.is_root()) {
        return Err(SceneError::UnknownNode(*missing));
    }
    let mut plan = Plan::new(graph);
    for id in targets(graph, ids) {
        match policy {
            DeletePolicy::ReparentChildren => plan.dissolve(id)?,
            DeletePolicy::DestroySubtree => plan.destroy(id)?,
        }
    }
    Ok(plan.finish("Delete"))
}

/// Replace a node's transform and size. `None` when nothing changes.
pub fn transform(graph: &SceneGraph, id: NodeId, after: Placement) -> Option<Command> {
    let before = graph.get(id)?.placement();
    (before != after).then_some(Command::Transform { id, before, after })
}

/// Translate the outermost unlocked nodes of `ids` by a world-space delta.
pub fn move_by(graph: &SceneGraph, ids: &[NodeId], delta: Vec2, label: &str) -> Option<Command> {
    let commands: Vec<Command> = targets(graph, ids)
        .into_iter()
        .filter_map(|id| {
            let node = graph.get(id)?;
            if node.flags.locked {
                return None;
            }
            let local = parent_delta(graph, id, delta)?;
            let after = Placement {
                transform: node.transform.translated(local),
                size: node.size,
            };
            transform(graph, id, after)
        })
        .collect();
    if commands.is_empty() {
        return None;
    }
    Some(Command::Batch {
        label: label.to_string(),
        commands,
    })
}

/// Arrow-key nudge.
pub fn nudge(graph: &SceneGraph, ids: &[NodeId], delta: Vec2) -> Option<Command> {
    move_by(graph, ids, delta, "Nudge")
}

/// Move `id` under `new_parent` at `index`, keeping its world placement
/// when the new parent's world transform is invertible.
pub fn reparent(
    graph: &SceneGraph,
    id: NodeId,
    new_parent: NodeId,
    index: usize,
) -> Result<Command, SceneError> {
    let node = graph.get(id).filter(|_| !id.is_root()).ok_or(SceneError::UnknownNode(id))?;
    let invalid = SceneError::InvalidParent {
        node: id,
        parent: new_parent,
    };
    let parent_node = graph.get(new_parent).ok_or(invalid.clone())?;
    if new_parent == id || graph.is_ancestor_of(id, new_parent) || !parent_node.kind.is_container() {
        return Err(invalid);
    }

    let from = Slot {
        parent: graph.parent_of(id).ok_or(SceneError::UnknownNode(id))?,
        index: graph.index_in_parent(id).ok_or(SceneError::UnknownNode(id))?,
    };
    let siblings = graph.child_ids(new_parent).len() - usize::from(from.parent == new_parent);
    let to = Slot {
        parent: new_parent,
        index: index.min(siblings),
    };

    let before = node.transform;
    let after = match (
        graph.world_transform(id),
        graph.world_transform(new_parent).map(geometry::invert),
    ) {
        (Some(world), Some(Ok(inv))) => Transform::from_affine(geometry::compose(inv, world)),
        _ => before,
    };
    Ok(Command::Reparent {
        id,
        from,
        to,
        before,
        after,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZStep {
    Forward,
    Backward,
    Front,
    Back,
}

fn reorder(graph: &SceneGraph, id: NodeId, step: ZStep) -> Option<Command> {
    let node = graph.get(id)?;
    let parent = graph.parent_of(id)?;
    let painted = graph.children(parent);
    let structural = graph.child_ids(parent);
    let p = painted.iter().position(|c| *c == id)?;
    let mine = structural.iter().position(|c| *c == id)?;
    let z_of = |other: NodeId| graph.get(other).map_or(0, |n| n.z_index);
    // Index of a sibling once `id` is out of the list.
    let detached = |other: NodeId| {
        structural
            .iter()
            .position(|c| *c == other)
            .map(|i| if i > mine { i - 1 } else { i })
    };

    let after = match step {
        ZStep::Forward => {
            let above = *painted.get(p + 1)?;
            Order {
                index: detached(above)? + 1,
                z_index: z_of(above),
            }
        }
        ZStep::Backward => {
            let below = *painted.get(p.checked_sub(1)?)?;
            Order {
                index: detached(below)?,
                z_index: z_of(below),
            }
        }
        ZStep::Front => {
            if p + 1 == painted.len() {
                return None;
            }
            Order {
                index: structural.len() - 1,
                z_index: z_of(*painted.last()?),
            }
        }
        ZStep::Back => {
            if p == 0 {
                return None;
            }
            Order {
                index: 0,
                z_index: z_of(*painted.first()?),
            }
        }
    };
    let before = Order {
        index: mine,
        z_index: node.z_index,
    };
    (before != after).then_some(Command::Reorder { id, before, after })
}

/// Swap one step up in paint order.
pub fn bring_forward(graph: &SceneGraph, id: NodeId) -> Option<Command> {
    reorder(graph, id, ZStep::Forward)
}

pub fn send_backward(graph: &SceneGraph, id: NodeId) -> Option<Command> {
    reorder(graph, id, ZStep::Backward)
}

pub fn bring_to_front(graph: &SceneGraph, id: NodeId) -> Option<Command> {
    reorder(graph, id, ZStep::Front)
}

pub fn send_to_back(graph: &SceneGraph, id: NodeId) -> Option<Command> {
    reorder(graph, id, ZStep::Back)
}

pub fn set_flags(graph: &SceneGraph, id: NodeId, after: NodeFlags) -> Option<Command> {
    let before = graph.get(id)?.flags;
    (before != after).then_some(Command::SetFlags { id, before, after })
}

pub fn set_style(graph: &SceneGraph, id: NodeId, after: Style) -> Option<Command> {
    let before = graph.get(id)?.style.clone();
    (before != after).then_some(Command::SetStyle { id, before, after })
}

/// Apply `f` to the flags of every known node in `ids` as one step.
pub fn update_flags(
    graph: &SceneGraph,
    ids: &[NodeId],
    label: &str,
    f: impl Fn(NodeFlags) -> NodeFlags,
) -> Option<Command> {
    let commands: Vec<Command> = ids
        .iter()
        .filter_map(|id| {
            let flags = graph.get(*id)?.flags;
            set_flags(graph, *id, f(flags))
        })
        .collect();
    (!commands.is_empty()).then(|| Command::Batch {
        label: label.to_string(),
        commands,
    })
}

/// Wrap `ids` in a new group placed where the topmost member was.
pub fn group(graph: &SceneGraph, ids: &[NodeId], group_id: NodeId) -> Result<Option<Command>, SceneError> {
    let members = targets(graph, ids);
    let Some(top) = members.last().copied() else {
        return Ok(None);
    };
    if graph.contains(group_id) {
        return Err(SceneError::DuplicateId(group_id));
    }
    let top_node = graph.get(top).ok_or(SceneError::UnknownNode(top))?;

    let mut plan = Plan::new(graph);
    let slot = plan.slot_of(top)?;
    plan.push(Command::Insert {
        parent: slot.parent,
        index: slot.index + 1,
        node: Node::group(group_id).with_z(top_node.z_index),
    })?;
    for member in members {
        let step = reparent(&plan.scratch, member, group_id, usize::MAX)?;
        plan.push(step)?;
    }
    Ok(plan.finish("Group"))
}

/// Dissolve a group, keeping its children where they appear.
pub fn ungroup(graph: &SceneGraph, id: NodeId) -> Result<Option<Command>, SceneError> {
    let node = graph.get(id).ok_or(SceneError::UnknownNode(id))?;
    if node.kind != NodeKind::Group {
        return Ok(None);
    }
    let mut plan = Plan::new(graph);
    plan.dissolve(id)?;
    Ok(plan.finish("Ungroup"))
}

/// Deep-copy `ids`, each copy placed just above its original and shifted
/// by a world-space `offset`. Returns the command and the copies' IDs.
pub fn duplicate(
    graph: &SceneGraph,
    ids: &[NodeId],
    offset: Vec2,
) -> Result<Option<(Command, Vec<NodeId>)>, SceneError> {
    let mut plan = Plan::new(graph);
    let mut copies = Vec::new();
    for source in targets(graph, ids) {
        let slot = plan.slot_of(source)?;
        let local = parent_delta(graph, source, offset).unwrap_or(Vec2::ZERO);
        let copy = plan.copy_subtree(
            source,
            Slot {
                parent: slot.parent,
                index: slot.index + 1,
            },
            local,
        )?;
        copies.push(copy);
    }
    Ok(plan.finish("Duplicate").map(|command| (command, copies)))
}

// ─── History ─────────────────────────────────────────────────────────────

/// Outcome of an undo/redo that did not run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryStatus {
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
    /// The graph refused the replay; history is unchanged.
    #[error(transparent)]
    Rejected(#[from] SceneError),
}

/// One command sequence with a cursor: entries before it are applied,
/// entries after it have been undone.
///
/// There is no depth limit; memory grows with the session.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<Command>,
    cursor: usize,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `command` and record it, discarding anything redoable.
    pub fn apply(&mut self, graph: &mut SceneGraph, command: Command) -> Result<(), SceneError> {
        command.apply(graph)?;
        log::debug!("apply: {}", command.label());
        self.entries.truncate(self.cursor);
        self.entries.push(command);
        self.cursor += 1;
        Ok(())
    }

    /// Undo the command before the cursor. Returns its label.
    pub fn undo(&mut self, graph: &mut SceneGraph) -> Result<String, HistoryStatus> {
        let idx = self.cursor.checked_sub(1).ok_or(HistoryStatus::NothingToUndo)?;
        let command = &self.entries[idx];
        command.inverse().apply(graph)?;
        self.cursor = idx;
        log::debug!("undo: {}", command.label());
        Ok(command.label().to_string())
    }

    /// Redo the command after the cursor. Returns its label.
    pub fn redo(&mut self, graph: &mut SceneGraph) -> Result<String, HistoryStatus> {
        let command = self.entries.get(self.cursor).ok_or(HistoryStatus::NothingToRedo)?;
        command.apply(graph)?;
        self.cursor += 1;
        log::debug!("redo: {}", command.label());
        Ok(command.label().to_string())
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(Command::label)
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(Command::label)
    }

    /// Recorded commands, applied and undone.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}
