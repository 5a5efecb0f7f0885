use crate::geometry::SingularTransform;
use crate::id::NodeId;
use thiserror::Error;

/// Failures of scene-graph operations.
///
/// Every variant aborts the offending operation before anything is
/// mutated; callers never observe a partially applied change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// The parent does not exist, or attaching would create a cycle.
    #[error("cannot attach {node} under {parent}")]
    InvalidParent { node: NodeId, parent: NodeId },

    #[error("no node with id {0}")]
    UnknownNode(NodeId),

    /// The operation requires a node without children.
    #[error("node {0} still has children")]
    NotEmpty(NodeId),

    #[error("node id {0} is already in use")]
    DuplicateId(NodeId),

    #[error(transparent)]
    SingularTransform(#[from] SingularTransform),

    /// Deserialization input violates a scene invariant.
    #[error("malformed scene: {0}")]
    MalformedScene(String),
}
