pub mod error;
pub mod geometry;
pub mod graph;
pub mod hit;
pub mod id;
pub mod model;
pub mod scene;
pub mod serial;
pub mod viewport;

pub use error::SceneError;
pub use graph::{DeletePolicy, HitMode, SceneGraph};
pub use id::NodeId;
pub use model::*;
pub use scene::Scene;
pub use serial::{from_json, from_msgpack, to_json, to_msgpack};
pub use viewport::{Surface, Viewport};

// Re-export kurbo so downstream crates share one geometry version
pub use kurbo;
