//! Engine configuration.
//!
//! Every field has a default, so hosts only override what they need:
//!
//! ```json
//! { "handleSize": 10, "rotationSnapDegrees": 45, "deletePolicy": "destroy_subtree" }
//! ```

use serde::{Deserialize, Serialize};
use stage_core::DeletePolicy;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid engine config: {0}")]
pub struct ConfigError(#[from] serde_json::Error);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Hit radius of resize/rotate handles, CSS px.
    pub handle_size: f64,
    /// Distance of the rotate handle above the top edge, CSS px.
    pub rotate_handle_offset: f64,
    /// Pointer travel below which a press counts as a click, CSS px.
    pub click_threshold: f64,
    /// Smallest width/height a resize may produce, local units.
    pub min_size: f64,
    /// Rotation step while Shift is held.
    pub rotation_snap_degrees: f64,
    /// Arrow-key nudge, world units.
    pub nudge: f64,
    /// Shift+arrow nudge, world units.
    pub nudge_large: f64,
    pub zoom_min: f64,
    pub zoom_max: f64,
    /// Multiplicative zoom per wheel notch / shortcut.
    pub zoom_step: f64,
    /// Offset applied to duplicated nodes, world units.
    pub duplicate_offset: f64,
    pub delete_policy: DeletePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            handle_size: 8.0,
            rotate_handle_offset: 24.0,
            click_threshold: 3.0,
            min_size: 1.0,
            rotation_snap_degrees: 15.0,
            nudge: 1.0,
            nudge_large: 10.0,
            zoom_min: 0.1,
            zoom_max: 32.0,
            zoom_step: 1.1,
            duplicate_offset: 10.0,
            delete_policy: DeletePolicy::ReparentChildren,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn rotation_snap(&self) -> f64 {
        self.rotation_snap_degrees.to_radians()
    }
}
