use serde::{Deserialize, Serialize};

use crate::common::collections::BTreeMap;
use crate::model::window::{WindowId, WorkspaceId};

/// Tiling state of one desktop, kept across a registry teardown so the
/// rebuilt registry can restore column order instead of guessing it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SavedSpace {
    pub columns: Vec<Vec<WindowId>>,
    pub target_x: f64,
    pub monitor: Option<usize>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SavedLayout {
    pub spaces: BTreeMap<WorkspaceId, SavedSpace>,
}

impl SavedLayout {
    pub fn space(&self, workspace: WorkspaceId) -> Option<&SavedSpace> {
        self.spaces.get(&workspace)
    }

    pub fn is_empty(&self) -> bool { self.spaces.is_empty() }

    /// Column of `window` in the saved layout of `workspace`, if it had one.
    pub fn column_of(&self, workspace: WorkspaceId, window: WindowId) -> Option<usize> {
        self.space(workspace)?.columns.iter().position(|c| c.contains(&window))
    }
}
