//! Outbound notifications for indicator collaborators (top bar, minimap).
//!
//! Delivery is fire-and-forget: nobody answers, and a missing receiver is
//! not an error.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::window::{WindowId, WorkspaceId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BroadcastEvent {
    ActiveSpaceChanged { workspace: WorkspaceId, index: Option<usize> },
    WorkspaceLabelChanged { workspace: WorkspaceId, name: String },
    FullscreenEntered { window: WindowId },
    FullscreenExited { window: WindowId },
    /// The indicator follows the monitor of the active space.
    IndicatorMonitorChanged { monitor: usize },
    PreviewCursorMoved { workspace: WorkspaceId },
    WindowSelected { workspace: WorkspaceId, window: WindowId },
}

pub type BroadcastSender = broadcast::Sender<BroadcastEvent>;
pub type BroadcastReceiver = broadcast::Receiver<BroadcastEvent>;

pub fn channel() -> (BroadcastSender, BroadcastReceiver) { broadcast::channel(64) }
