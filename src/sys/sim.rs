//! In-memory host.
//!
//! Frames, stacking and activation order are plain data. Animations apply
//! their final values immediately; completion tokens queue up until
//! [`SimHost::take_completions`] hands them to whoever drives the reactor.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::affordance::{Edge, EdgeAffordances, StackTarget};
use super::compositor::{AnimProps, AnimTarget, Completion, Compositor, SpaceAppearance};
use super::geometry::{Point, Rect, Size};
use super::menu::{MenuAction, MenuActions};
use super::settings_store::{SettingsStore, WorkspaceSettings};
use super::window_server::WindowServer;
use crate::common::collections::{BTreeMap, HashMap};
use crate::model::monitor::Monitor;
use crate::model::window::{WindowFlags, WindowId, WindowInfo, WorkspaceId};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimWindow {
    pub frame: Rect,
    /// Decoration/shadow extent drawn outside the frame on every side.
    #[serde(default)]
    pub buffer_inset: f64,
    #[serde(default)]
    pub flags: WindowFlags,
    #[serde(default)]
    pub info: WindowInfo,
    pub workspace: Option<WorkspaceId>,
    #[serde(default = "yes")]
    pub has_surface: bool,
    /// Pixels shaved off every resize request.
    #[serde(default)]
    pub width_clamp: f64,
}

fn yes() -> bool { true }

/// Realized state of a compositor object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimProps {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for SimProps {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, width: 0.0, height: 0.0, scale_x: 1.0, scale_y: 1.0 }
    }
}

impl SimProps {
    fn apply(&mut self, props: AnimProps) {
        let AnimProps { x, y, width, height, scale_x, scale_y } = props;
        self.x = x.unwrap_or(self.x);
        self.y = y.unwrap_or(self.y);
        self.width = width.unwrap_or(self.width);
        self.height = height.unwrap_or(self.height);
        self.scale_x = scale_x.unwrap_or(self.scale_x);
        self.scale_y = scale_y.unwrap_or(self.scale_y);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AffordanceState {
    pub active: bool,
    pub visible: bool,
    pub left: Option<StackTarget>,
    pub right: Option<StackTarget>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationRecord {
    pub target: AnimTarget,
    pub props: AnimProps,
    pub duration: Duration,
}

#[derive(Debug)]
pub struct SimHost {
    windows: BTreeMap<WindowId, SimWindow>,
    /// Bottom-most first.
    stacking: Vec<WindowId>,
    /// Most recently activated first.
    mru: Vec<WindowId>,
    focus: Option<WindowId>,
    workspaces: Vec<WorkspaceId>,
    active: WorkspaceId,
    monitors: Vec<Monitor>,
    primary: usize,
    panel_height: f64,
    pointer: Point,
    warps: Vec<Point>,

    props: HashMap<AnimTarget, SimProps>,
    visibility: HashMap<AnimTarget, bool>,
    proxies: HashMap<WindowId, WorkspaceId>,
    clips: HashMap<WindowId, Rect>,
    space_order: Vec<WorkspaceId>,
    appearances: HashMap<WorkspaceId, SpaceAppearance>,
    animations: Vec<AnimationRecord>,
    completions: Vec<Completion>,
    unredirect: bool,
    backdrop: bool,

    affordances: BTreeMap<usize, AffordanceState>,
    settings: HashMap<WorkspaceId, WorkspaceSettings>,
    names: Vec<String>,
    menu_actions: Vec<MenuAction>,
}

impl SimHost {
    /// One monitor at the origin and a single active desktop `WorkspaceId(1)`.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            windows: BTreeMap::new(),
            stacking: Vec::new(),
            mru: Vec::new(),
            focus: None,
            workspaces: vec![WorkspaceId(1)],
            active: WorkspaceId(1),
            monitors: vec![Monitor::new(0, Rect::new(0.0, 0.0, width, height))],
            primary: 0,
            panel_height: 0.0,
            pointer: Point::ZERO,
            warps: Vec::new(),
            props: HashMap::default(),
            visibility: HashMap::default(),
            proxies: HashMap::default(),
            clips: HashMap::default(),
            space_order: Vec::new(),
            appearances: HashMap::default(),
            animations: Vec::new(),
            completions: Vec::new(),
            unredirect: true,
            backdrop: false,
            affordances: BTreeMap::new(),
            settings: HashMap::default(),
            names: Vec::new(),
            menu_actions: Vec::new(),
        }
    }

    pub fn set_monitors(&mut self, frames: &[Rect], primary: usize) {
        self.monitors =
            frames.iter().enumerate().map(|(i, frame)| Monitor::new(i, *frame)).collect();
        self.primary = primary.min(self.monitors.len().saturating_sub(1));
    }

    pub fn set_workspaces(&mut self, workspaces: &[WorkspaceId]) {
        self.workspaces = workspaces.to_vec();
        if !self.workspaces.contains(&self.active)
            && let Some(first) = self.workspaces.first()
        {
            self.active = *first;
        }
    }

    pub fn set_panel_height(&mut self, height: f64) { self.panel_height = height; }

    pub fn set_pointer(&mut self, point: Point) { self.pointer = point; }

    pub fn monitor(&self, index: usize) -> Monitor {
        self.monitors
            .get(index)
            .copied()
            .unwrap_or_else(|| Monitor::new(index, Rect::new(0.0, 0.0, 1920.0, 1080.0)))
    }

    pub fn add_window(&mut self, window: WindowId, workspace: WorkspaceId, frame: Rect) {
        let info = WindowInfo { title: format!("window {}", window.0), ..WindowInfo::default() };
        self.insert_window(
            window,
            SimWindow {
                frame,
                info,
                workspace: Some(workspace),
                has_surface: true,
                ..SimWindow::default()
            },
        );
    }

    /// New windows land on top of the stack and at the back of the
    /// activation order.
    pub fn insert_window(&mut self, window: WindowId, state: SimWindow) {
        self.windows.insert(window, state);
        self.stacking.retain(|w| *w != window);
        self.stacking.push(window);
        self.mru.retain(|w| *w != window);
        self.mru.push(window);
    }

    pub fn remove_window(&mut self, window: WindowId) {
        self.windows.remove(&window);
        self.stacking.retain(|w| *w != window);
        self.mru.retain(|w| *w != window);
        self.proxies.remove(&window);
        if self.focus == Some(window) {
            self.focus = None;
        }
    }

    pub fn window(&self, window: WindowId) -> Option<&SimWindow> { self.windows.get(&window) }

    pub fn frame_of(&self, window: WindowId) -> Rect {
        self.windows.get(&window).map_or(Rect::ZERO, |w| w.frame)
    }

    pub fn set_frame(&mut self, window: WindowId, frame: Rect) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.frame = frame;
        }
    }

    pub fn set_width_clamp(&mut self, window: WindowId, pixels: f64) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.width_clamp = pixels;
        }
    }

    pub fn set_has_surface(&mut self, window: WindowId, has_surface: bool) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.has_surface = has_surface;
        }
    }

    pub fn set_flags_direct(&mut self, window: WindowId, flags: WindowFlags) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.flags = flags;
        }
    }

    pub fn set_info(&mut self, window: WindowId, info: WindowInfo) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.info = info;
        }
    }

    pub fn raise_window(&mut self, window: WindowId) {
        if self.windows.contains_key(&window) {
            self.stacking.retain(|w| *w != window);
            self.stacking.push(window);
        }
    }

    /// Gives focus without raising or switching desktops.
    pub fn focus(&mut self, window: WindowId) {
        if !self.windows.contains_key(&window) {
            return;
        }
        self.focus = Some(window);
        self.mru.retain(|w| *w != window);
        self.mru.insert(0, window);
    }

    pub fn stacking(&self) -> &[WindowId] { &self.stacking }

    pub fn set_workspace_settings(&mut self, workspace: WorkspaceId, settings: WorkspaceSettings) {
        self.settings.insert(workspace, settings);
    }

    pub fn props_of(&self, target: AnimTarget) -> SimProps {
        self.props.get(&target).copied().unwrap_or_default()
    }

    pub fn surface_clip(&self, window: WindowId) -> Option<Rect> { self.clips.get(&window).copied() }

    pub fn proxy_parent(&self, window: WindowId) -> Option<WorkspaceId> {
        self.proxies.get(&window).copied()
    }

    pub fn stack_target(&self, monitor: usize, edge: Edge) -> Option<StackTarget> {
        let state = self.affordances.get(&monitor)?;
        match edge {
            Edge::Left => state.left,
            Edge::Right => state.right,
        }
    }

    pub fn affordance(&self, monitor: usize) -> Option<AffordanceState> {
        self.affordances.get(&monitor).copied()
    }

    pub fn affordance_count(&self) -> usize { self.affordances.len() }

    pub fn warps(&self) -> &[Point] { &self.warps }

    pub fn animations(&self) -> &[AnimationRecord] { &self.animations }

    pub fn appearance(&self, workspace: WorkspaceId) -> Option<&SpaceAppearance> {
        self.appearances.get(&workspace)
    }

    pub fn space_order(&self) -> &[WorkspaceId] { &self.space_order }

    pub fn unredirect_enabled(&self) -> bool { self.unredirect }

    pub fn backdrop_visible(&self) -> bool { self.backdrop }

    pub fn menu_actions(&self) -> &[MenuAction] { &self.menu_actions }

    pub fn take_completions(&mut self) -> Vec<Completion> { std::mem::take(&mut self.completions) }
}

impl WindowServer for SimHost {
    fn frame(&self, window: WindowId) -> Option<Rect> { self.windows.get(&window).map(|w| w.frame) }

    fn buffer(&self, window: WindowId) -> Option<Rect> {
        self.windows.get(&window).map(|w| {
            let inset = w.buffer_inset;
            Rect::new(
                w.frame.x - inset,
                w.frame.y - inset,
                w.frame.width + 2.0 * inset,
                w.frame.height + 2.0 * inset,
            )
        })
    }

    fn move_resize_frame(&mut self, window: WindowId, frame: Rect) {
        if let Some(w) = self.windows.get_mut(&window) {
            let width = (frame.width - w.width_clamp).max(1.0);
            w.frame = Rect::new(frame.x, frame.y, width, frame.height);
        }
    }

    fn move_frame(&mut self, window: WindowId, x: f64, y: f64) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.frame = w.frame.with_origin(x, y);
        }
    }

    fn flags(&self, window: WindowId) -> WindowFlags {
        self.windows.get(&window).map_or(WindowFlags::empty(), |w| w.flags)
    }

    fn set_flags(&mut self, window: WindowId, flags: WindowFlags, enabled: bool) {
        let active = self.active;
        let Some(w) = self.windows.get_mut(&window) else { return };
        w.flags.set(flags, enabled);
        if flags.contains(WindowFlags::ON_ALL_WORKSPACES) {
            w.workspace = if enabled { None } else { Some(active) };
        }
        if flags.contains(WindowFlags::MINIMIZED) && enabled && self.focus == Some(window) {
            self.focus = None;
        }
    }

    fn info(&self, window: WindowId) -> Option<WindowInfo> {
        self.windows.get(&window).map(|w| w.info.clone())
    }

    fn has_surface(&self, window: WindowId) -> bool {
        self.windows.get(&window).is_some_and(|w| w.has_surface)
    }

    fn raise(&mut self, window: WindowId) { self.raise_window(window); }

    fn sort_by_stacking(&self, windows: &[WindowId]) -> Vec<WindowId> {
        self.stacking.iter().copied().filter(|w| windows.contains(w)).collect()
    }

    fn workspace_of(&self, window: WindowId) -> Option<WorkspaceId> {
        self.windows.get(&window).and_then(|w| w.workspace)
    }

    fn change_workspace(&mut self, window: WindowId, workspace: WorkspaceId) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.workspace = Some(workspace);
        }
    }

    fn tab_list(&self, workspace: Option<WorkspaceId>) -> Vec<WindowId> {
        self.mru
            .iter()
            .copied()
            .filter(|w| match (workspace, self.windows.get(w)) {
                (None, Some(_)) => true,
                (Some(ws), Some(state)) => state.workspace.is_none_or(|own| own == ws),
                (_, None) => false,
            })
            .collect()
    }

    fn windows_on(&self, workspace: WorkspaceId) -> Vec<WindowId> {
        self.stacking
            .iter()
            .copied()
            .filter(|w| self.windows.get(w).is_some_and(|s| s.workspace == Some(workspace)))
            .collect()
    }

    fn focus_window(&self) -> Option<WindowId> { self.focus }

    fn activate(&mut self, window: WindowId) {
        let Some(workspace) = self.windows.get(&window).map(|w| w.workspace) else { return };
        if let Some(workspace) = workspace {
            self.active = workspace;
        }
        self.raise_window(window);
        self.focus(window);
    }

    fn workspaces(&self) -> Vec<WorkspaceId> { self.workspaces.clone() }

    fn active_workspace(&self) -> WorkspaceId { self.active }

    fn activate_workspace(&mut self, workspace: WorkspaceId) {
        if self.workspaces.contains(&workspace) {
            self.active = workspace;
        }
    }

    fn monitors(&self) -> Vec<Monitor> { self.monitors.clone() }

    fn primary_monitor(&self) -> usize { self.primary }

    fn screen_size(&self) -> Size {
        let width = self.monitors.iter().map(|m| m.frame.max_x()).fold(0.0, f64::max);
        let height = self.monitors.iter().map(|m| m.frame.max_y()).fold(0.0, f64::max);
        Size::new(width, height)
    }

    fn panel_height(&self) -> f64 { self.panel_height }

    fn pointer(&self) -> Point { self.pointer }

    fn warp_pointer(&mut self, point: Point) {
        self.pointer = point;
        self.warps.push(point);
    }
}

impl Compositor for SimHost {
    fn animate(
        &mut self,
        target: AnimTarget,
        props: AnimProps,
        duration: Duration,
        completion: Option<Completion>,
    ) {
        self.props.entry(target).or_default().apply(props);
        self.animations.push(AnimationRecord { target, props, duration });
        if let Some(completion) = completion {
            trace!(?completion, "queued completion");
            self.completions.push(completion);
        }
    }

    fn cancel_animations(&mut self, _target: AnimTarget) {}

    fn set_props(&mut self, target: AnimTarget, props: AnimProps) {
        self.props.entry(target).or_default().apply(props);
    }

    fn position(&self, target: AnimTarget) -> Point {
        let props = self.props_of(target);
        Point::new(props.x, props.y)
    }

    fn set_visible(&mut self, target: AnimTarget, visible: bool) {
        self.visibility.insert(target, visible);
    }

    fn is_visible(&self, target: AnimTarget) -> bool {
        self.visibility
            .get(&target)
            .copied()
            .unwrap_or(matches!(target, AnimTarget::Surface(_) | AnimTarget::SpaceActor(_)))
    }

    fn attach_proxy(&mut self, window: WindowId, workspace: WorkspaceId) {
        self.proxies.insert(window, workspace);
    }

    fn detach_proxy(&mut self, window: WindowId) { self.proxies.remove(&window); }

    fn raise_proxy(&mut self, _window: WindowId) {}

    fn set_surface_clip(&mut self, window: WindowId, clip: Option<Rect>) {
        match clip {
            Some(rect) => self.clips.insert(window, rect),
            None => self.clips.remove(&window),
        };
    }

    fn stack_space_below(&mut self, workspace: WorkspaceId, sibling: WorkspaceId) {
        self.space_order.retain(|ws| *ws != workspace);
        let index = self.space_order.iter().position(|ws| *ws == sibling).unwrap_or(0);
        self.space_order.insert(index, workspace);
    }

    fn raise_space(&mut self, workspace: WorkspaceId) {
        self.space_order.retain(|ws| *ws != workspace);
        self.space_order.push(workspace);
    }

    fn set_space_appearance(&mut self, workspace: WorkspaceId, appearance: &SpaceAppearance) {
        self.appearances.insert(workspace, appearance.clone());
    }

    fn set_unredirect_enabled(&mut self, enabled: bool) { self.unredirect = enabled; }

    fn set_backdrop_visible(&mut self, visible: bool) { self.backdrop = visible; }
}

impl EdgeAffordances for SimHost {
    fn recreate_affordances(&mut self, monitors: &[Monitor]) {
        self.affordances = monitors
            .iter()
            .map(|m| (m.index, AffordanceState { visible: true, ..AffordanceState::default() }))
            .collect();
    }

    fn set_affordance_active(&mut self, monitor: usize, active: bool) {
        if let Some(state) = self.affordances.get_mut(&monitor) {
            state.active = active;
        }
    }

    fn set_affordance_visible(&mut self, monitor: usize, visible: bool) {
        if let Some(state) = self.affordances.get_mut(&monitor) {
            state.visible = visible;
        }
    }

    fn reset_stack_targets(&mut self, monitor: usize) {
        if let Some(state) = self.affordances.get_mut(&monitor) {
            state.left = None;
            state.right = None;
        }
    }

    fn set_stack_target(&mut self, monitor: usize, edge: Edge, target: StackTarget) {
        let state = self.affordances.entry(monitor).or_default();
        match edge {
            Edge::Left => state.left = Some(target),
            Edge::Right => state.right = Some(target),
        }
    }
}

impl SettingsStore for SimHost {
    fn workspace_settings(&self, workspace: WorkspaceId) -> WorkspaceSettings {
        self.settings.get(&workspace).cloned().unwrap_or_default()
    }

    fn workspace_names(&self) -> Vec<String> { self.names.clone() }

    fn set_workspace_names(&mut self, names: Vec<String>) { self.names = names; }
}

impl MenuActions for SimHost {
    fn register_window_menu_action(&mut self, action: MenuAction) {
        if !self.menu_actions.contains(&action) {
            self.menu_actions.push(action);
        }
    }
}
