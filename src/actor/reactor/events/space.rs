use tracing::{debug, info, trace};

use crate::actor::reactor::Reactor;
use crate::layout_engine::{scratch, viewport};
use crate::model::window::WorkspaceId;
use crate::sys::Platform;
use crate::sys::compositor::{Completion, SwitchContinuation};

pub struct SpaceEventHandler;

impl SpaceEventHandler {
    pub fn handle_monitors_changed<P: Platform>(reactor: &mut Reactor<P>) {
        let (state, host) = reactor.parts();
        let mut ctx = state.ctx(host);
        state.spaces.monitors_changed(&mut ctx);
        info!(monitors = state.spaces.monitors().len(), "monitors changed");
    }

    pub fn handle_workspaces_changed<P: Platform>(reactor: &mut Reactor<P>) {
        let (state, host) = reactor.parts();
        let mut ctx = state.ctx(host);
        state.spaces.workspaces_changed(&mut ctx, &mut state.scratch);
    }

    pub fn handle_workspace_removed<P: Platform>(reactor: &mut Reactor<P>, index: usize) {
        let (state, host) = reactor.parts();
        let mut ctx = state.ctx(host);
        state.spaces.workspace_removed(&mut ctx, index);
    }

    pub fn handle_workspace_switched<P: Platform>(
        reactor: &mut Reactor<P>,
        from: WorkspaceId,
        to: WorkspaceId,
    ) {
        let (state, host) = reactor.parts();
        let mut ctx = state.ctx(host);
        state.spaces.switch_workspace(&mut ctx, from, to);
    }

    pub fn handle_settings_changed<P: Platform>(reactor: &mut Reactor<P>, workspace: WorkspaceId) {
        let (state, host) = reactor.parts();
        let mut ctx = state.ctx(host);
        state.spaces.refresh_appearance(&mut ctx, workspace);
    }

    /// A click on a stacked edge scrolls that column into view and focuses
    /// its head.
    pub fn handle_stack_edge_activated<P: Platform>(
        reactor: &mut Reactor<P>,
        workspace: WorkspaceId,
        column: usize,
    ) {
        let (state, host) = reactor.parts();
        let mut ctx = state.ctx(host);
        let Some(space) = state.spaces.get_mut(workspace) else { return };
        let Some(window) = space.window_at(column, 0) else {
            trace!(?workspace, column, "stack edge points past the last column");
            return;
        };
        viewport::ensure_viewport(space, &mut ctx, window, false);
        ctx.host.activate(window);
    }

    pub fn handle_animation_completed<P: Platform>(
        reactor: &mut Reactor<P>,
        completion: Completion,
    ) {
        let (state, host) = reactor.parts();
        match completion {
            Completion::ScrollSettled { workspace, generation } => {
                let mut ctx = state.ctx(host);
                if let Some(space) = state.spaces.get_mut(workspace) {
                    viewport::scroll_settled(space, &mut ctx, generation);
                }
            }
            Completion::WindowEntered { workspace, window } => {
                // The window may have settled on another size while it was
                // being shown.
                let mut ctx = state.ctx(host);
                if let Some(space) = state.spaces.get_mut(workspace)
                    && space.contains(window)
                {
                    space.layout(&mut ctx, true);
                }
            }
            Completion::SpaceShown { workspace, generation } => {
                let continuation = {
                    let mut ctx = state.ctx(host);
                    state.spaces.space_shown(&mut ctx, workspace, generation)
                };
                if let Some(SwitchContinuation::ActivateWindow(window)) = continuation {
                    debug!(?window, "activating window after switch");
                    host.activate(window);
                }
            }
            Completion::SpaceHidden { workspace, generation } => {
                let mut ctx = state.ctx(host);
                state.spaces.space_hidden(&mut ctx, workspace, generation);
            }
            Completion::ScratchPlaced { window, x, y } => {
                scratch::scratch_placed(state, host, window, x, y);
            }
        }
    }
}
