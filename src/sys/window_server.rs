//! Host window capability set.
//!
//! Every call is assumed infallible. Calls that touch a window the host no
//! longer knows about are expected to be ignored, and queries return `None`
//! or defaults, since lifecycle notifications race with pending work.

use crate::model::monitor::Monitor;
use crate::model::window::{WindowFlags, WindowId, WindowInfo, WorkspaceId};
use crate::sys::geometry::{Point, Rect, Size};

pub trait WindowServer {
    /// Outer frame in screen coordinates.
    fn frame(&self, window: WindowId) -> Option<Rect>;

    /// Buffer rectangle, which includes client-side decorations and shadows.
    fn buffer(&self, window: WindowId) -> Option<Rect>;

    /// May be clamped by the host. Re-read `frame` for the realized result.
    fn move_resize_frame(&mut self, window: WindowId, frame: Rect);

    fn move_frame(&mut self, window: WindowId, x: f64, y: f64);

    fn flags(&self, window: WindowId) -> WindowFlags;

    fn set_flags(&mut self, window: WindowId, flags: WindowFlags, enabled: bool);

    fn info(&self, window: WindowId) -> Option<WindowInfo>;

    /// Whether the compositor surface for the window exists yet.
    fn has_surface(&self, window: WindowId) -> bool;

    fn raise(&mut self, window: WindowId);

    /// Returns `windows` ordered from bottom-most to top-most.
    fn sort_by_stacking(&self, windows: &[WindowId]) -> Vec<WindowId>;

    fn workspace_of(&self, window: WindowId) -> Option<WorkspaceId>;

    fn change_workspace(&mut self, window: WindowId, workspace: WorkspaceId);

    /// Windows in activation order, most recent first. `None` spans all
    /// desktops.
    fn tab_list(&self, workspace: Option<WorkspaceId>) -> Vec<WindowId>;

    fn windows_on(&self, workspace: WorkspaceId) -> Vec<WindowId>;

    fn focus_window(&self) -> Option<WindowId>;

    fn activate(&mut self, window: WindowId);

    /// Desktops in index order.
    fn workspaces(&self) -> Vec<WorkspaceId>;

    fn active_workspace(&self) -> WorkspaceId;

    fn activate_workspace(&mut self, workspace: WorkspaceId);

    fn monitors(&self) -> Vec<Monitor>;

    fn primary_monitor(&self) -> usize;

    fn screen_size(&self) -> Size;

    /// Height of the top panel reserved on every monitor.
    fn panel_height(&self) -> f64;

    fn pointer(&self) -> Point;

    fn warp_pointer(&mut self, point: Point);

    fn default_workspace_name(&self, index: usize) -> String { format!("Workspace {}", index + 1) }

    fn workspace_index(&self, workspace: WorkspaceId) -> Option<usize> {
        self.workspaces().iter().position(|ws| *ws == workspace)
    }
}
