//! Scene save/load.
//!
//! The persisted form is a tree of nodes:
//!
//! ```json
//! { "version": 1, "nodes": [
//!   { "id": "card", "kind": "group", "transform": [1,0,0,1,40,40],
//!     "size": [0,0], "zIndex": 0, "children": [
//!       { "id": "bg", "kind": "shape", "shape": "rect",
//!         "transform": [1,0,0,1,0,0], "size": [200,120], "zIndex": 0,
//!         "children": [] } ] } ] }
//! ```
//!
//! `transform` holds the affine coefficients `[a, b, c, d, e, f]`. On load
//! they are decomposed into translation/rotation/scale; skew is dropped.
//! The same schema is written as MessagePack for binary snapshots.

use crate::error::SceneError;
use crate::geometry;
use crate::graph::SceneGraph;
use crate::id::NodeId;
use crate::model::*;
use kurbo::{Affine, Size};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const FORMAT_VERSION: u32 = 1;

/// Top-level persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub nodes: Vec<SerialNode>,
}

fn default_version() -> u32 {
    FORMAT_VERSION
}

/// One persisted node and its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialNode {
    pub id: String,
    pub kind: String,
    #[serde(default = "identity_coeffs")]
    pub transform: [f64; 6],
    #[serde(default)]
    pub size: [f64; 2],
    #[serde(default)]
    pub z_index: i32,
    #[serde(default)]
    pub children: Vec<SerialNode>,
    #[serde(default = "yes", skip_serializing_if = "is_true")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<ShapeKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
}

fn identity_coeffs() -> [f64; 6] {
    Affine::IDENTITY.as_coeffs()
}

fn yes() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_false(v: &bool) -> bool {
    !*v
}

// ─── Save ────────────────────────────────────────────────────────────────

/// Snapshot a graph into its persisted form.
pub fn to_document(graph: &SceneGraph) -> SceneDocument {
    let nodes = graph
        .child_ids(graph.root_id())
        .into_iter()
        .filter_map(|id| save_node(graph, id))
        .collect();
    SceneDocument {
        version: FORMAT_VERSION,
        nodes,
    }
}

fn save_node(graph: &SceneGraph, id: NodeId) -> Option<SerialNode> {
    let node = graph.get(id)?;
    let (shape, text, src) = match &node.kind {
        NodeKind::Shape(shape) => (Some(*shape), None, None),
        NodeKind::Text { content } => (None, Some(content.clone()), None),
        NodeKind::Image { source } => (None, None, Some(source.clone())),
        NodeKind::Group | NodeKind::Root => (None, None, None),
    };
    let children = graph
        .child_ids(id)
        .into_iter()
        .filter_map(|child| save_node(graph, child))
        .collect();
    Some(SerialNode {
        id: id.as_str().to_string(),
        kind: node.kind.tag().to_string(),
        transform: node.transform.to_affine().as_coeffs(),
        size: [node.size.width, node.size.height],
        z_index: node.z_index,
        children,
        visible: node.flags.visible,
        locked: node.flags.locked,
        shape,
        text,
        src,
        style: (node.style != Style::default()).then(|| node.style.clone()),
    })
}

pub fn to_json(graph: &SceneGraph) -> Result<String, SceneError> {
    serde_json::to_string_pretty(&to_document(graph))
        .map_err(|e| SceneError::MalformedScene(e.to_string()))
}

pub fn to_msgpack(graph: &SceneGraph) -> Result<Vec<u8>, SceneError> {
    rmp_serde::to_vec_named(&to_document(graph))
        .map_err(|e| SceneError::MalformedScene(e.to_string()))
}

// ─── Load ────────────────────────────────────────────────────────────────

/// Build a graph from a persisted document.
///
/// The whole document is validated before the graph is built, so a
/// malformed input never yields a partial scene.
pub fn from_document(doc: &SceneDocument) -> Result<SceneGraph, SceneError> {
    if doc.version > FORMAT_VERSION {
        return Err(SceneError::MalformedScene(format!(
            "unsupported format version {}",
            doc.version
        )));
    }

    let mut seen = HashSet::new();
    let mut nodes = Vec::new();
    for top in &doc.nodes {
        validate(top, &mut seen, &mut nodes)?;
    }

    let mut graph = SceneGraph::new();
    let root = graph.root_id();
    for (parent, node) in nodes {
        graph.add_node(parent.unwrap_or(root), node)?;
    }
    log::debug!("loaded scene with {} nodes", graph.len());
    Ok(graph)
}

/// Pre-order walk converting each entry into a `Node` paired with its parent.
fn validate(
    entry: &SerialNode,
    seen: &mut HashSet<NodeId>,
    out: &mut Vec<(Option<NodeId>, Node)>,
) -> Result<(), SceneError> {
    let node = convert(entry)?;
    let id = node.id;
    // A repeated ID in its own subtree would make the parent chain cyclic.
    if id.is_root() || !seen.insert(id) {
        return Err(SceneError::MalformedScene(format!(
            "duplicate or cyclic node id `{id}`"
        )));
    }
    if !entry.children.is_empty() && !node.kind.is_container() {
        return Err(SceneError::MalformedScene(format!(
            "`{id}` is a {} and cannot have children",
            entry.kind
        )));
    }
    out.push((None, node));
    let first_child = out.len();
    for child in &entry.children {
        validate(child, seen, out)?;
    }
    // Entries pushed while walking this subtree whose parent is still unset
    // are the direct children.
    for (parent, _) in out[first_child..].iter_mut() {
        if parent.is_none() {
            *parent = Some(id);
        }
    }
    Ok(())
}

fn convert(entry: &SerialNode) -> Result<Node, SceneError> {
    let malformed = |what: &str| SceneError::MalformedScene(format!("`{}`: {what}", entry.id));

    if entry.id.is_empty() {
        return Err(SceneError::MalformedScene("empty node id".into()));
    }
    if !entry.transform.iter().chain(entry.size.iter()).all(|v| v.is_finite()) {
        return Err(malformed("non-finite number"));
    }
    if let Some(style) = &entry.style
        && !(style.stroke_width.is_finite() && style.opacity.is_finite())
    {
        return Err(malformed("non-finite style value"));
    }

    let kind = match entry.kind.as_str() {
        "shape" => NodeKind::Shape(entry.shape.unwrap_or_default()),
        "group" => NodeKind::Group,
        "text" => NodeKind::Text {
            content: entry.text.clone().unwrap_or_default(),
        },
        "image" => NodeKind::Image {
            source: entry.src.clone().unwrap_or_default(),
        },
        other => return Err(malformed(&format!("unknown kind `{other}`"))),
    };

    let mut node = Node::new(NodeId::intern(&entry.id), kind)
        .with_transform(Transform::from_affine(Affine::new(entry.transform)))
        .with_size(geometry::sanitize_size(Size::new(entry.size[0], entry.size[1])))
        .with_z(entry.z_index);
    node.flags = NodeFlags {
        visible: entry.visible,
        locked: entry.locked,
    };
    if let Some(style) = &entry.style {
        node.style = style.clone();
    }
    Ok(node)
}

pub fn from_json(json: &str) -> Result<SceneGraph, SceneError> {
    let doc: SceneDocument =
        serde_json::from_str(json).map_err(|e| SceneError::MalformedScene(e.to_string()))?;
    from_document(&doc)
}

pub fn from_msgpack(bytes: &[u8]) -> Result<SceneGraph, SceneError> {
    let doc: SceneDocument =
        rmp_serde::from_slice(bytes).map_err(|e| SceneError::MalformedScene(e.to_string()))?;
    from_document(&doc)
}
