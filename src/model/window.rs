use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Host-assigned window identity. The core never owns window lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u64);

/// Host-assigned virtual desktop identity, stable across index changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkspaceId(pub u64);

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct WindowFlags: u16 {
        const MINIMIZED = 1 << 0;
        const FULLSCREEN = 1 << 1;
        const MAXIMIZED_H = 1 << 2;
        const MAXIMIZED_V = 1 << 3;
        const ABOVE = 1 << 4;
        const ON_ALL_WORKSPACES = 1 << 5;

        const MAXIMIZED_BOTH = Self::MAXIMIZED_H.bits() | Self::MAXIMIZED_V.bits();
    }
}

impl WindowFlags {
    pub fn is_maximized_both(self) -> bool { self.contains(Self::MAXIMIZED_BOTH) }

    /// Windows parked off the normal tiling flow.
    pub fn is_parked(self) -> bool {
        self.contains(Self::FULLSCREEN) || self.is_maximized_both()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WindowType {
    #[default]
    Normal,
    Dialog,
    ModalDialog,
    Utility,
    Splash,
    Other,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub wm_class: Option<String>,
    pub title: String,
    pub window_type: WindowType,
    pub transient_for: Option<WindowId>,
}
