//! Decides what happens to a window when it shows up: tiled next to the
//! selection, routed to the scratch layer, moved to the selected desktop, or
//! left alone.

use std::cmp::Ordering;

use tracing::{debug, instrument, trace};

use super::scratch::{self, ScratchLayer};
use super::{Ctx, Space, viewport};
use crate::model::monitor;
use crate::model::saved::SavedLayout;
use crate::model::state::WindowManagerState;
use crate::model::window::{WindowFlags, WindowId, WindowType, WorkspaceId};
use crate::sys::Platform;
use crate::sys::compositor::{AnimProps, AnimTarget, Completion};
use crate::sys::geometry::Rect;

/// Whether `window` may be tiled at all.
pub fn add_filter(host: &dyn Platform, scratch: &ScratchLayer, window: WindowId) -> bool {
    let Some(info) = host.info(window) else { return false };
    // Dialogs without a transient hint are treated as regular windows.
    if info.window_type != WindowType::Normal && info.transient_for.is_some() {
        return false;
    }
    if host.flags(window).contains(WindowFlags::ON_ALL_WORKSPACES) {
        return false;
    }
    !scratch.is_scratch(window)
}

/// Populates a freshly built space. Columns remembered in `saved` come
/// first; everything else is ordered by [`xz_order`] and appended.
pub fn add_all(
    space: &mut Space,
    ctx: &mut Ctx<'_>,
    scratch: &mut ScratchLayer,
    saved: Option<&SavedLayout>,
) {
    let workspace = space.workspace();
    if let Some(saved) = saved.and_then(|s| s.space(workspace)) {
        for column in &saved.columns {
            let mut index = None;
            for &window in column {
                if ctx.host.workspace_of(window) != Some(workspace)
                    || !add_filter(&*ctx.host, scratch, window)
                {
                    continue;
                }
                match index {
                    None => {
                        let end = space.column_count();
                        if space.add_window(ctx, window, end, None) {
                            index = Some(end);
                        }
                    }
                    Some(col) => {
                        let row = space.column(col).map_or(0, |c| c.len());
                        space.add_window(ctx, window, col, Some(row));
                    }
                }
            }
        }
    }

    let windows = xz_order(space, &*ctx.host, ctx.host.windows_on(workspace));
    for window in windows {
        if space.contains(window) {
            continue;
        }
        // Above or minimized at this point most likely means it floated
        // before.
        if ctx.host.flags(window).intersects(WindowFlags::ABOVE | WindowFlags::MINIMIZED) {
            trace!(?window, "adopting as scratch");
            scratch.adopt(&mut *ctx.host, window);
            continue;
        }
        if add_filter(&*ctx.host, scratch, window) {
            let end = space.column_count();
            space.add_window(ctx, window, end, None);
        }
    }

    let recent = ctx.host.tab_list(Some(workspace)).into_iter().find(|w| space.contains(*w));
    if recent.is_some() {
        space.set_selected(recent);
    }
}

/// Approximates column order from geometry and stacking alone.
///
/// Windows flush against the left edge sort first and windows flush against
/// the right edge last. Among left-edge windows the lower stacked one comes
/// first; everywhere else the higher stacked one does.
pub fn xz_order(space: &Space, host: &dyn Platform, mut windows: Vec<WindowId>) -> Vec<WindowId> {
    let stacking = host.sort_by_stacking(&windows);
    let z = |w: &WindowId| stacking.iter().position(|s| s == w).unwrap_or(0);
    let origin = space.monitor().frame.x;
    let width = space.width();
    let xkey = |w: &WindowId| {
        let Some(frame) = host.frame(*w) else { return 0.0 };
        let x = frame.x - origin;
        if x <= 0.0 {
            0.0
        } else if x + frame.width == width {
            width
        } else {
            x
        }
    };
    windows.sort_by(|a, b| {
        let (ax, bx) = (xkey(a), xkey(b));
        match ax.total_cmp(&bx) {
            Ordering::Equal if ax == 0.0 => z(a).cmp(&z(b)),
            Ordering::Equal => z(b).cmp(&z(a)),
            other => other,
        }
    });
    windows
}

/// Tiles `window` right after the selected column of its desktop's space.
///
/// New windows may be routed to the scratch layer instead: when the focused
/// window is scratch, or a winprop asks for it. Returns whether the window
/// ended up tiled.
#[instrument(skip(state, host))]
pub fn insert_window(
    state: &mut WindowManagerState,
    host: &mut dyn Platform,
    window: WindowId,
    existing: bool,
) -> bool {
    if !existing {
        let focus_is_scratch = host.focus_window().is_some_and(|f| state.scratch.is_scratch(f));
        let by_rule = host
            .info(window)
            .and_then(|info| state.winprops.take_match(&info))
            .is_some_and(|rule| rule.scratch_layer);
        if focus_is_scratch || by_rule {
            debug!(?window, focus_is_scratch, by_rule, "routing new window to scratch");
            scratch::make_scratch(state, host, window);
            if focus_is_scratch {
                host.activate(window);
            }
            return false;
        }
    }

    if !add_filter(&*host, &state.scratch, window) {
        return false;
    }
    let Some(workspace) = host.workspace_of(window) else { return false };
    let margin = state.config.settings.minimum_margin;
    let mut ctx = state.ctx(host);
    let Some(space) = state.spaces.get_mut(workspace) else {
        debug!(?workspace, "no space for window");
        return false;
    };

    let index = space.selected_location().map_or(0, |(col, _)| col + 1);
    if !space.add_window(&mut ctx, window, index, None) {
        return false;
    }

    ctx.host.set_flags(window, WindowFlags::ABOVE, false);
    if ctx.host.flags(window).is_maximized_both() {
        ctx.host.set_flags(window, WindowFlags::MAXIMIZED_BOTH, false);
        toggle_maximize_horizontally(&mut state.scratch, &mut *ctx.host, window, margin);
    }

    ctx.host.set_visible(AnimTarget::Surface(window), false);
    let proxy = AnimTarget::Proxy(window);
    if existing {
        if let Some(frame) = ctx.host.frame(window) {
            let monitor = space.monitor().frame;
            let (dx, dy) = viewport::surface_offset(&ctx, window);
            let container = ctx.host.position(AnimTarget::ScrollContainer(workspace));
            ctx.host.set_props(
                proxy,
                AnimProps::at(
                    frame.x - monitor.x - dx - container.x,
                    frame.y - monitor.y - dy + container.y,
                ),
            );
        }
        ctx.host.set_visible(proxy, true);
    } else {
        let x = space.placement(window).map_or(0.0, |p| p.x);
        let top = space.top(&ctx);
        ctx.host.set_props(proxy, AnimProps::at(x, top).scale(0.0));
        ctx.host.set_visible(proxy, true);
        ctx.host.animate(
            proxy,
            AnimProps::default().scale(1.0),
            space.animation_duration(true),
            Some(Completion::WindowEntered { workspace, window }),
        );
    }

    viewport::ensure_viewport(space, &mut ctx, window, true);
    if ctx.host.focus_window() == Some(window) || ctx.host.active_workspace() == workspace {
        ctx.host.activate(window);
    }
    true
}

/// A window was created. Windows born on another desktop are moved to the
/// selected one and tiled when they arrive there; the rest wait for their
/// surface to be shown.
pub fn window_created(state: &mut WindowManagerState, host: &mut dyn Platform, window: WindowId) {
    let target = state.spaces.selected_space();
    match (host.workspace_of(window), target) {
        (Some(workspace), Some(selected)) if workspace != selected => {
            debug!(?window, ?workspace, ?selected, "redirecting new window");
            state.scratch.state_mut(window).redirected = true;
            host.change_workspace(window, selected);
        }
        _ => {
            state.pending_insert.insert(window);
        }
    }
}

/// The surface of a newly created window is up; tile it.
pub fn surface_shown(state: &mut WindowManagerState, host: &mut dyn Platform, window: WindowId) -> bool {
    if !state.pending_insert.remove(&window) {
        return false;
    }
    insert_window(state, host, window, false);
    true
}

/// A window entered `workspace`. Redirected windows count as new.
pub fn window_added(
    state: &mut WindowManagerState,
    host: &mut dyn Platform,
    window: WindowId,
    workspace: WorkspaceId,
) -> bool {
    if state.pending_insert.contains(&window) || !host.has_surface(window) {
        trace!(?window, ?workspace, "window not ready for insertion");
        return false;
    }
    let redirected = std::mem::take(&mut state.scratch.state_mut(window).redirected);
    insert_window(state, host, window, !redirected)
}

/// Stretches `window` across its monitor, less a margin on each side. The
/// second call restores the previous frame.
pub fn toggle_maximize_horizontally(
    scratch: &mut ScratchLayer,
    host: &mut dyn Platform,
    window: WindowId,
    minimum_margin: f64,
) {
    let Some(frame) = host.frame(window) else { return };
    let entry = scratch.state_mut(window);
    if let Some(previous) = entry.unmaximized_frame.take() {
        host.move_resize_frame(window, previous);
        return;
    }
    entry.unmaximized_frame = Some(frame);
    let monitor = monitor::at_point(&*host, frame.center()).unwrap_or_else(|| monitor::primary(&*host));
    host.move_resize_frame(
        window,
        Rect::new(
            monitor.frame.x + minimum_margin,
            frame.y,
            monitor.frame.width - 2.0 * minimum_margin,
            frame.height,
        ),
    );
}
