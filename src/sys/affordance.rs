use serde::{Deserialize, Serialize};

use crate::model::monitor::Monitor;
use crate::model::window::WorkspaceId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Left,
    Right,
}

/// First column beyond the viewport bound in one scan direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackTarget {
    pub workspace: WorkspaceId,
    pub column: usize,
}

/// Per-monitor click overlay used for click-to-scroll and edge activation.
pub trait EdgeAffordances {
    /// Destroys all existing affordances and creates one per monitor given.
    fn recreate_affordances(&mut self, monitors: &[Monitor]);

    fn set_affordance_active(&mut self, monitor: usize, active: bool);

    fn set_affordance_visible(&mut self, monitor: usize, visible: bool);

    fn reset_stack_targets(&mut self, monitor: usize);

    fn set_stack_target(&mut self, monitor: usize, edge: Edge, target: StackTarget);
}
