use tracing::{debug, trace};

use crate::actor::reactor::Reactor;
use crate::layout_engine::{insertion, scratch, viewport};
use crate::model::WindowManagerState;
use crate::model::window::{WindowFlags, WindowId, WorkspaceId};
use crate::sys::Platform;
use crate::sys::compositor::{AnimProps, AnimTarget};

pub struct WindowEventHandler;

impl WindowEventHandler {
    pub fn handle_created<P: Platform>(reactor: &mut Reactor<P>, window: WindowId) {
        let (state, host) = reactor.parts();
        insertion::window_created(state, host, window);
    }

    /// New windows are tiled on their first show. Any other show on a
    /// space that is mid-scroll, in the background, or in the preview deck
    /// would put a real surface where its proxy should be, so the proxy
    /// takes over again.
    pub fn handle_surface_shown<P: Platform>(reactor: &mut Reactor<P>, window: WindowId) {
        let (state, host) = reactor.parts();
        if insertion::surface_shown(state, host, window) {
            return;
        }
        let Some(workspace) = state.spaces.find_window(window) else { return };
        let unsettled = host.is_visible(AnimTarget::Proxy(window))
            || workspace != host.active_workspace()
            || state.spaces.in_preview();
        if unsettled {
            trace!(?window, ?workspace, "surface shown on unsettled space");
            host.set_visible(AnimTarget::Surface(window), false);
            host.set_visible(AnimTarget::Proxy(window), true);
        }
    }

    pub fn handle_added<P: Platform>(
        reactor: &mut Reactor<P>,
        window: WindowId,
        workspace: WorkspaceId,
    ) {
        let (state, host) = reactor.parts();
        insertion::window_added(state, host, window, workspace);
    }

    pub fn handle_removed<P: Platform>(
        reactor: &mut Reactor<P>,
        window: WindowId,
        workspace: WorkspaceId,
    ) {
        let (state, host) = reactor.parts();
        let mut ctx = state.ctx(host);
        let Some(space) = state.spaces.get_mut(workspace) else { return };
        if space.remove_window(&mut ctx, window) {
            debug!(?window, ?workspace, "window left space");
        }
    }

    pub fn handle_destroyed<P: Platform>(reactor: &mut Reactor<P>, window: WindowId) {
        let (state, host) = reactor.parts();
        if let Some(workspace) = state.spaces.find_window(window) {
            let mut ctx = state.ctx(host);
            if let Some(space) = state.spaces.get_mut(workspace) {
                space.remove_window(&mut ctx, window);
            }
        }
        state.forget_window(window);
        if reactor.fullscreen == Some(window) {
            reactor.set_fullscreen(window, false);
        }
    }

    /// Scrolls a newly focused tiled window into view and restacks its
    /// neighbours. Scratch windows are only raised. A transient window
    /// stands in for its tiled parent.
    pub fn handle_focused<P: Platform>(reactor: &mut Reactor<P>, window: WindowId) {
        let fullscreen = reactor.host.flags(window).contains(WindowFlags::FULLSCREEN);
        reactor.set_fullscreen(window, fullscreen);

        let (state, host) = reactor.parts();
        if state.scratch.is_scratch(window) {
            host.set_flags(window, WindowFlags::ABOVE, true);
            host.raise(window);
            return;
        }
        if state.grab.is_some() {
            trace!(?window, "focus change during grab");
            return;
        }
        let target = host
            .info(window)
            .and_then(|info| info.transient_for)
            .filter(|parent| state.spaces.find_window(*parent).is_some())
            .unwrap_or(window);
        let Some(workspace) = state.spaces.find_window(target) else {
            trace!(?window, "focused window is not tiled");
            return;
        };
        let mut ctx = state.ctx(host);
        let Some(space) = state.spaces.get_mut(workspace) else { return };
        // Scratch toggles hide the click affordance; a tiled focus brings it back.
        ctx.host.set_affordance_visible(space.monitor().index, true);
        viewport::ensure_viewport(space, &mut ctx, target, false);
        viewport::fix_stack(space, &mut ctx, target);
    }

    pub fn handle_minimized_changed<P: Platform>(reactor: &mut Reactor<P>, window: WindowId) {
        let (state, host) = reactor.parts();
        let minimized = host.flags(window).contains(WindowFlags::MINIMIZED);
        if !minimized
            || state.scratch.is_scratch(window)
            || state.spaces.find_window(window).is_none()
        {
            return;
        }
        debug!(?window, "minimized tiled window moves to scratch");
        scratch::make_scratch(state, host, window);
    }

    pub fn handle_fullscreen_changed<P: Platform>(reactor: &mut Reactor<P>, window: WindowId) {
        let selected = reactor
            .state
            .spaces
            .find_window(window)
            .and_then(|ws| reactor.state.spaces.get(ws))
            .is_some_and(|space| space.selected() == Some(window));
        if !selected {
            return;
        }
        let fullscreen = reactor.host.flags(window).contains(WindowFlags::FULLSCREEN);
        reactor.set_fullscreen(window, fullscreen);
    }

    /// Only the selected window's size matters. While grabbed, the column
    /// model follows without animation; otherwise the column stays where
    /// the resize left it and the space re-tiles around it.
    pub fn handle_size_changed<P: Platform>(reactor: &mut Reactor<P>, window: WindowId) {
        let (state, host) = reactor.parts();
        let Some(workspace) = state.spaces.find_window(window) else { return };
        let Some(frame) = host.frame(window) else { return };
        host.set_props(
            AnimTarget::Proxy(window),
            AnimProps { width: Some(frame.width), height: Some(frame.height), ..AnimProps::default() },
        );

        let frozen = state.grab.is_some();
        let mut ctx = state.ctx(host);
        let Some(space) = state.spaces.get_mut(workspace) else { return };
        if space.selected() != Some(window) {
            return;
        }
        if frozen {
            space.layout(&mut ctx, false);
            viewport::update_selection(space, &mut ctx, Some(window), true);
            return;
        }
        // The preview deck owns the container position while it is open.
        if !ctx.modes.navigating {
            let x = frame.x - space.monitor().frame.x;
            viewport::move_to(space, &mut ctx, window, x, false);
        }
        space.layout(&mut ctx, true);
        viewport::ensure_viewport(space, &mut ctx, window, true);
    }

    /// A window dragged onto another monitor joins the space shown there.
    /// Grabbed windows are handled when the grab ends.
    pub fn handle_entered_monitor<P: Platform>(
        reactor: &mut Reactor<P>,
        window: WindowId,
        monitor: usize,
    ) {
        let (state, host) = reactor.parts();
        if state.grab.is_some_and(|g| g.window == window) {
            trace!(?window, monitor, "monitor change deferred until grab ends");
            return;
        }
        move_to_monitor(state, host, window, monitor);
    }
}

/// Moves a tiled window into the space shown on `monitor`. Returns whether
/// it changed spaces.
pub(crate) fn move_to_monitor(
    state: &mut WindowManagerState,
    host: &mut dyn Platform,
    window: WindowId,
    monitor: usize,
) -> bool {
    if state.scratch.is_scratch(window) {
        return false;
    }
    let Some(from) = state.spaces.find_window(window) else { return false };
    let Some(to) = state.spaces.monitor_space(monitor) else { return false };
    if from == to {
        return false;
    }
    debug!(?window, ?from, ?to, monitor, "window changed monitor");
    {
        let mut ctx = state.ctx(host);
        if let Some(space) = state.spaces.get_mut(from) {
            space.remove_window(&mut ctx, window);
        }
    }
    host.change_workspace(window, to);
    insertion::insert_window(state, host, window, true)
}
