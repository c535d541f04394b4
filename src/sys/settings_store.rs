use serde::{Deserialize, Serialize};

use crate::model::window::WorkspaceId;

/// Externally owned per-desktop settings. Empty strings mean "unset".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    pub name: String,
    pub color: String,
    pub background: String,
}

pub trait SettingsStore {
    fn workspace_settings(&self, workspace: WorkspaceId) -> WorkspaceSettings;

    /// Persisted desktop names, by desktop index.
    fn workspace_names(&self) -> Vec<String>;

    fn set_workspace_names(&mut self, names: Vec<String>);
}
