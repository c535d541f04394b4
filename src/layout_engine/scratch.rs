//! The floating ("scratch") layer.
//!
//! Scratch windows are kept above and on every desktop, and never take part
//! in column tiling. Per-window bookkeeping lives in a side table keyed by
//! window identity.

use tracing::{debug, instrument};

use super::{insertion, viewport};
use crate::common::collections::HashMap;
use crate::model::monitor;
use crate::model::state::WindowManagerState;
use crate::model::window::{WindowFlags, WindowId};
use crate::sys::Platform;
use crate::sys::compositor::{AnimProps, AnimTarget, Completion};
use crate::sys::geometry::{Point, Rect};

/// Vertical offset applied when a tiled window first floats.
const FLOAT_DROP: f64 = 30.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WindowState {
    pub floating: bool,
    /// Frame the window had when it last left the scratch layer.
    pub cached_frame: Option<Rect>,
    /// Frame to restore on the second horizontal-maximize toggle.
    pub unmaximized_frame: Option<Rect>,
    /// Moved to the selected desktop at creation; treated as new when it
    /// arrives there.
    pub redirected: bool,
}

#[derive(Debug, Default)]
pub struct ScratchLayer {
    windows: HashMap<WindowId, WindowState>,
}

impl ScratchLayer {
    pub fn is_scratch(&self, window: WindowId) -> bool {
        self.windows.get(&window).is_some_and(|s| s.floating)
    }

    pub fn state(&self, window: WindowId) -> WindowState {
        self.windows.get(&window).copied().unwrap_or_default()
    }

    pub fn state_mut(&mut self, window: WindowId) -> &mut WindowState {
        self.windows.entry(window).or_default()
    }

    pub fn forget(&mut self, window: WindowId) { self.windows.remove(&window); }

    /// Puts `window` in the floating layer without touching tiling:
    /// floating, above and sticky.
    pub fn adopt(&mut self, host: &mut dyn Platform, window: WindowId) {
        self.state_mut(window).floating = true;
        host.set_flags(window, WindowFlags::ABOVE | WindowFlags::ON_ALL_WORKSPACES, true);
    }
}

/// Moves `window` into the floating layer. A window leaving tiling keeps
/// roughly the position it was seen at, dropped slightly and shortened,
/// unless it has a remembered scratch frame on the focus monitor.
#[instrument(skip(state, host))]
pub fn make_scratch(state: &mut WindowManagerState, host: &mut dyn Platform, window: WindowId) {
    let tiled_in = state.spaces.find_window(window);
    let seen = tiled_in.and_then(|ws| state.spaces.get(ws)).and_then(|space| {
        let placement = space.placement(window)?;
        let monitor = space.monitor().frame;
        Some(Point::new(
            (monitor.x + placement.x + space.target_x()).round(),
            (monitor.y + placement.y).round(),
        ))
    });
    let minimized = host.flags(window).contains(WindowFlags::MINIMIZED);

    state.scratch.adopt(host, window);
    if let Some(ws) = tiled_in {
        let mut ctx = state.ctx(host);
        if let Some(space) = state.spaces.get_mut(ws) {
            space.remove_window(&mut ctx, window);
        }
    }

    if !minimized {
        host.set_backdrop_visible(true);
        host.set_visible(AnimTarget::Proxy(window), false);
        host.set_visible(AnimTarget::Surface(window), true);
    }

    let focus_monitor = monitor::focus_monitor(&*host);
    if let Some(seen) = seen
        && let Some(frame) = host.frame(window)
    {
        let target = match state.scratch.state(window).cached_frame {
            Some(cached) if focus_monitor.contains(cached.origin()) => cached,
            _ => Rect::new(
                seen.x,
                seen.y + FLOAT_DROP,
                frame.width,
                (frame.height - FLOAT_DROP).min((frame.height * 0.9).floor()),
            ),
        };
        if minimized {
            host.move_resize_frame(window, target);
            state.scratch.state_mut(window).cached_frame = None;
        } else {
            host.move_resize_frame(window, frame.with_size(target.width, target.height));
            let duration = state.config.settings.animation_duration();
            host.animate(
                AnimTarget::Surface(window),
                AnimProps::at(target.x, target.y),
                duration,
                Some(Completion::ScratchPlaced { window, x: target.x, y: target.y }),
            );
        }
    }

    host.set_affordance_visible(focus_monitor.index, false);
}

/// The surface slide of [`make_scratch`] finished; commit the frame.
pub fn scratch_placed(
    state: &mut WindowManagerState,
    host: &mut dyn Platform,
    window: WindowId,
    x: f64,
    y: f64,
) {
    if !state.scratch.is_scratch(window) {
        return;
    }
    host.move_frame(window, x, y);
    state.scratch.state_mut(window).cached_frame = None;
}

/// Returns `window` to tiling on the active desktop, remembering where it
/// floated.
#[instrument(skip(state, host))]
pub fn unmake_scratch(state: &mut WindowManagerState, host: &mut dyn Platform, window: WindowId) {
    let frame = host.frame(window);
    let entry = state.scratch.state_mut(window);
    if entry.cached_frame.is_none() {
        entry.cached_frame = frame;
    }
    entry.floating = false;
    host.set_flags(window, WindowFlags::ABOVE | WindowFlags::ON_ALL_WORKSPACES, false);
    insertion::insert_window(state, host, window, true);
}

pub fn toggle(state: &mut WindowManagerState, host: &mut dyn Platform, window: WindowId) {
    if state.scratch.is_scratch(window) {
        unmake_scratch(state, host, window);
        hide(&state.scratch, host);
        return;
    }
    make_scratch(state, host, window);
    if host.focus_window() == Some(window) {
        let active = host.active_workspace();
        let mut ctx = state.ctx(host);
        if let Some(space) = state.spaces.get_mut(active) {
            viewport::collapse_selection(space, &mut ctx);
        }
    }
}

/// Scratch windows, most recently used first.
pub fn scratch_windows(scratch: &ScratchLayer, host: &dyn Platform) -> Vec<WindowId> {
    host.tab_list(None).into_iter().filter(|w| scratch.is_scratch(*w)).collect()
}

pub fn is_active(scratch: &ScratchLayer, host: &dyn Platform) -> bool {
    scratch_windows(scratch, host)
        .iter()
        .any(|w| !host.flags(*w).contains(WindowFlags::MINIMIZED))
}

pub fn toggle_scratch_layer(scratch: &ScratchLayer, host: &mut dyn Platform) {
    if is_active(scratch, host) { hide(scratch, host) } else { show(scratch, host, false) }
}

pub fn toggle_scratch_window(scratch: &ScratchLayer, host: &mut dyn Platform) {
    match host.focus_window() {
        Some(focus) if scratch.is_scratch(focus) => hide(scratch, host),
        _ => show(scratch, host, true),
    }
}

/// Reveals the layer (or only its most recent window) and activates the
/// most recent one.
pub fn show(scratch: &ScratchLayer, host: &mut dyn Platform, top: bool) {
    let mut windows = scratch_windows(scratch, host);
    if windows.is_empty() {
        debug!("no scratch windows to show");
        return;
    }
    if top {
        windows.truncate(1);
    }
    host.set_backdrop_visible(true);
    for &window in windows.iter().rev() {
        host.set_flags(window, WindowFlags::MINIMIZED, false);
        host.set_flags(window, WindowFlags::ABOVE, true);
        host.set_visible(AnimTarget::Surface(window), true);
    }
    host.activate(windows[0]);
    let monitor = monitor::focus_monitor(&*host);
    host.set_affordance_visible(monitor.index, false);
}

pub fn hide(scratch: &ScratchLayer, host: &mut dyn Platform) {
    for window in scratch_windows(scratch, host) {
        host.set_flags(window, WindowFlags::MINIMIZED, true);
    }
    host.set_backdrop_visible(false);
}
