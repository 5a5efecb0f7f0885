//! Integration tests: command history (stage-editor).
//!
//! Commands built from a live graph, recorded through `History`, then
//! walked back and forth. The property tests drive random edit sessions.

use pretty_assertions::assert_eq;
use proptest::collection::vec;
use proptest::prelude::*;
use stage_core::kurbo::Vec2;
use stage_core::model::*;
use stage_core::{DeletePolicy, NodeId, SceneError, SceneGraph};
use stage_editor::commands::{self, Command, History, HistoryStatus};

fn id(s: &str) -> NodeId {
    NodeId::intern(s)
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Two top-level rects and a group holding an ellipse.
fn seed() -> SceneGraph {
    init_logging();
    let mut sg = SceneGraph::new();
    let root = sg.root_id();
    sg.add_node(root, Node::rect(id("ur_a"), 0.0, 0.0, 100.0, 100.0)).unwrap();
    sg.add_node(root, Node::rect(id("ur_b"), 50.0, 50.0, 100.0, 100.0).with_z(1))
        .unwrap();
    sg.add_node(root, Node::group(id("ur_g")).with_transform(Transform::at(300.0, 0.0)))
        .unwrap();
    sg.add_node(id("ur_g"), Node::ellipse(id("ur_e"), 0.0, 0.0, 40.0, 20.0))
        .unwrap();
    sg
}

// ─── Basic undo/redo ────────────────────────────────────────────────────

#[test]
fn undo_restores_previous_state() {
    let mut sg = seed();
    let mut history = History::new();
    let after = Placement {
        transform: Transform::at(10.0, 20.0),
        size: kurbo_size(200.0, 100.0),
    };
    let cmd = commands::transform(&sg, id("ur_a"), after).unwrap();
    history.apply(&mut sg, cmd).unwrap();
    assert_eq!(sg.get(id("ur_a")).unwrap().placement(), after);

    assert_eq!(history.undo(&mut sg), Ok("Transform".to_string()));
    assert_eq!(sg, seed());
}

#[test]
fn redo_reapplies() {
    let mut sg = seed();
    let mut history = History::new();
    let cmd = commands::nudge(&sg, &[id("ur_a")], Vec2::new(5.0, 0.0)).unwrap();
    history.apply(&mut sg, cmd).unwrap();
    history.undo(&mut sg).unwrap();
    assert_eq!(history.redo(&mut sg), Ok("Nudge".to_string()));
    assert_eq!(sg.get(id("ur_a")).unwrap().transform.x, 5.0);
}

#[test]
fn empty_history_reports_status() {
    let mut sg = seed();
    let mut history = History::new();
    assert_eq!(history.undo(&mut sg), Err(HistoryStatus::NothingToUndo));
    assert_eq!(history.redo(&mut sg), Err(HistoryStatus::NothingToRedo));
    assert!(!history.can_undo());
    assert!(!history.can_redo());
}

#[test]
fn new_command_truncates_redo() {
    let mut sg = seed();
    let mut history = History::new();
    let first = commands::nudge(&sg, &[id("ur_a")], Vec2::new(1.0, 0.0)).unwrap();
    history.apply(&mut sg, first).unwrap();
    history.undo(&mut sg).unwrap();
    assert!(history.can_redo());

    let second = commands::bring_to_front(&sg, id("ur_a")).unwrap();
    history.apply(&mut sg, second).unwrap();
    assert!(!history.can_redo());
    assert_eq!(history.len(), 1);
    assert_eq!(history.undo_label(), Some("Reorder"));
}

#[test]
fn delete_group_with_reparent_policy_round_trips() {
    let mut sg = seed();
    let mut history = History::new();
    let cmd = commands::delete(&sg, &[id("ur_g")], DeletePolicy::ReparentChildren)
        .unwrap()
        .unwrap();
    history.apply(&mut sg, cmd).unwrap();

    assert!(!sg.contains(id("ur_g")));
    assert_eq!(sg.parent_of(id("ur_e")), Some(sg.root_id()));
    // World placement survives the parent going away.
    assert_eq!(sg.get(id("ur_e")).unwrap().transform.x, 300.0);

    history.undo(&mut sg).unwrap();
    assert_eq!(sg, seed());
}

#[test]
fn delete_subtree_policy_removes_descendants() {
    let mut sg = seed();
    let mut history = History::new();
    let cmd = commands::delete(&sg, &[id("ur_g")], DeletePolicy::DestroySubtree)
        .unwrap()
        .unwrap();
    history.apply(&mut sg, cmd).unwrap();
    assert!(!sg.contains(id("ur_e")));
    history.undo(&mut sg).unwrap();
    assert_eq!(sg, seed());
}

#[test]
fn rejected_reparent_leaves_graph_and_history_unchanged() {
    let sg = seed();
    let err = commands::reparent(&sg, id("ur_g"), id("ur_e"), 0).unwrap_err();
    assert_eq!(
        err,
        SceneError::InvalidParent {
            node: id("ur_g"),
            parent: id("ur_e"),
        }
    );
    assert_eq!(sg, seed());
}

#[test]
fn group_then_undo() {
    let mut sg = seed();
    let mut history = History::new();
    let cmd = commands::group(&sg, &[id("ur_a"), id("ur_b")], id("ur_new_group"))
        .unwrap()
        .unwrap();
    history.apply(&mut sg, cmd).unwrap();
    assert_eq!(sg.child_ids(id("ur_new_group")), vec![id("ur_a"), id("ur_b")]);
    history.undo(&mut sg).unwrap();
    assert_eq!(sg, seed());
    history.redo(&mut sg).unwrap();
    assert!(sg.contains(id("ur_new_group")));
}

fn kurbo_size(w: f64, h: f64) -> stage_core::kurbo::Size {
    stage_core::kurbo::Size::new(w, h)
}

// ─── Laws ────────────────────────────────────────────────────────────────

/// A random edit, resolved against the graph at the time it runs.
#[derive(Debug, Clone)]
enum Op {
    Create { parent: usize, x: f64, y: f64 },
    Move { target: usize, dx: f64, dy: f64 },
    Delete { target: usize, destroy: bool },
    Reparent { target: usize, parent: usize },
    Front { target: usize },
    Back { target: usize },
    Forward { target: usize },
    Group { a: usize, b: usize },
    Ungroup { target: usize },
    Lock { target: usize },
    Duplicate { target: usize },
}

fn op() -> impl Strategy<Value = Op> {
    let coord = -200.0..200.0f64;
    prop_oneof![
        (0..8usize, coord.clone(), coord.clone()).prop_map(|(parent, x, y)| Op::Create { parent, x, y }),
        (0..16usize, coord.clone(), coord).prop_map(|(target, dx, dy)| Op::Move { target, dx, dy }),
        (0..16usize, any::<bool>()).prop_map(|(target, destroy)| Op::Delete { target, destroy }),
        (0..16usize, 0..8usize).prop_map(|(target, parent)| Op::Reparent { target, parent }),
        (0..16usize).prop_map(|target| Op::Front { target }),
        (0..16usize).prop_map(|target| Op::Back { target }),
        (0..16usize).prop_map(|target| Op::Forward { target }),
        (0..16usize, 0..16usize).prop_map(|(a, b)| Op::Group { a, b }),
        (0..16usize).prop_map(|target| Op::Ungroup { target }),
        (0..16usize).prop_map(|target| Op::Lock { target }),
        (0..16usize).prop_map(|target| Op::Duplicate { target }),
    ]
}

fn pick(nodes: &[NodeId], i: usize) -> Option<NodeId> {
    (!nodes.is_empty()).then(|| nodes[i % nodes.len()])
}

/// Turn `op` into a command against `sg`; `None` when it does not apply.
fn plan(sg: &SceneGraph, op: &Op, serial: usize) -> Option<Command> {
    let nodes = sg.paint_order();
    let mut containers = vec![sg.root_id()];
    containers.extend(
        nodes
            .iter()
            .copied()
            .filter(|n| sg.get(*n).is_some_and(|node| node.kind.is_container())),
    );
    let container = |i: usize| containers[i % containers.len()];

    match *op {
        Op::Create { parent, x, y } => {
            let node = Node::rect(NodeId::intern(&format!("pp_{serial}")), x, y, 30.0, 30.0);
            Some(commands::create(sg, container(parent), node))
        }
        Op::Move { target, dx, dy } => {
            commands::move_by(sg, &[pick(&nodes, target)?], Vec2::new(dx, dy), "Move")
        }
        Op::Delete { target, destroy } => {
            let policy = if destroy {
                DeletePolicy::DestroySubtree
            } else {
                DeletePolicy::ReparentChildren
            };
            commands::delete(sg, &[pick(&nodes, target)?], policy).ok()?
        }
        Op::Reparent { target, parent } => {
            commands::reparent(sg, pick(&nodes, target)?, container(parent), usize::MAX).ok()
        }
        Op::Front { target } => commands::bring_to_front(sg, pick(&nodes, target)?),
        Op::Back { target } => commands::send_to_back(sg, pick(&nodes, target)?),
        Op::Forward { target } => commands::bring_forward(sg, pick(&nodes, target)?),
        Op::Group { a, b } => {
            let ids = [pick(&nodes, a)?, pick(&nodes, b)?];
            commands::group(sg, &ids, NodeId::intern(&format!("pg_{serial}"))).ok()?
        }
        Op::Ungroup { target } => commands::ungroup(sg, pick(&nodes, target)?).ok()?,
        Op::Lock { target } => {
            commands::update_flags(sg, &[pick(&nodes, target)?], "Lock", |f| NodeFlags {
                locked: !f.locked,
                ..f
            })
        }
        Op::Duplicate { target } => commands::duplicate(sg, &[pick(&nodes, target)?], Vec2::new(10.0, 10.0))
            .ok()?
            .map(|(command, _)| command),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn undo_all_then_redo_all_restores(ops in vec(op(), 1..24)) {
        let mut sg = seed();
        let initial = sg.clone();
        let mut history = History::new();
        for (serial, op) in ops.iter().enumerate() {
            if let Some(cmd) = plan(&sg, op, serial) {
                prop_assert!(history.apply(&mut sg, cmd).is_ok());
            }
        }
        let last = sg.clone();
        let steps = history.len();

        for _ in 0..steps {
            prop_assert!(history.undo(&mut sg).is_ok());
        }
        prop_assert_eq!(&sg, &initial);
        prop_assert_eq!(history.undo(&mut sg), Err(HistoryStatus::NothingToUndo));

        for _ in 0..steps {
            prop_assert!(history.redo(&mut sg).is_ok());
        }
        prop_assert_eq!(&sg, &last);
    }

    #[test]
    fn repeated_apply_undo_is_one_round_trip(ops in vec(op(), 1..12), cycles in 1..5usize) {
        let mut sg = seed();
        let mut history = History::new();
        for (serial, op) in ops.iter().enumerate() {
            let Some(cmd) = plan(&sg, op, serial) else { continue };
            let before = sg.clone();
            for _ in 0..cycles {
                prop_assert!(history.apply(&mut sg, cmd.clone()).is_ok());
                prop_assert!(history.undo(&mut sg).is_ok());
            }
            prop_assert_eq!(&sg, &before);

            // Leave it applied so later ops see a changing graph.
            prop_assert!(history.apply(&mut sg, cmd.clone()).is_ok());
            let mut once = before.clone();
            prop_assert!(cmd.apply(&mut once).is_ok());
            prop_assert_eq!(&sg, &once);
        }
    }

    #[test]
    fn inverse_of_inverse_applies_like_the_original(ops in vec(op(), 1..12)) {
        let mut sg = seed();
        for (serial, op) in ops.iter().enumerate() {
            let Some(cmd) = plan(&sg, op, serial) else { continue };
            let mut via_double = sg.clone();
            prop_assert!(cmd.inverse().inverse().apply(&mut via_double).is_ok());
            prop_assert!(cmd.apply(&mut sg).is_ok());
            prop_assert_eq!(&sg, &via_double);
        }
    }
}
