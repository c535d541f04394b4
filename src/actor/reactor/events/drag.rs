use tracing::{debug, trace};

use super::window::move_to_monitor;
use crate::actor::reactor::Reactor;
use crate::layout_engine::grab::{self, GrabOp};
use crate::model::monitor;
use crate::model::window::WindowId;
use crate::sys::Platform;

pub struct DragEventHandler;

impl DragEventHandler {
    pub fn handle_grab_begin<P: Platform>(reactor: &mut Reactor<P>, window: WindowId, op: GrabOp) {
        let (state, host) = reactor.parts();
        if state.grab.is_some() {
            trace!(?window, "grab already in progress");
            return;
        }
        let Some(workspace) = state.spaces.find_window(window) else { return };
        let mut ctx = state.ctx(host);
        let Some(space) = state.spaces.get(workspace) else { return };
        state.grab = grab::begin(space, &mut ctx, window, op);
    }

    pub fn handle_position_changed<P: Platform>(reactor: &mut Reactor<P>, window: WindowId) {
        let (state, host) = reactor.parts();
        let Some(grab) = state.grab.filter(|g| g.window == window) else { return };
        let mut ctx = state.ctx(host);
        if let Some(space) = state.spaces.get_mut(grab.workspace) {
            grab::position_changed(space, &mut ctx, &grab);
        }
    }

    /// Releases the follower and re-tiles. A window dropped on another
    /// monitor then moves to that monitor's space.
    pub fn handle_grab_end<P: Platform>(reactor: &mut Reactor<P>, window: WindowId, op: GrabOp) {
        let (state, host) = reactor.parts();
        if state.grab.is_none_or(|g| g.window != window) {
            trace!(?window, %op, "grab end without matching grab");
            return;
        }
        let Some(grab) = state.grab.take() else { return };
        {
            let mut ctx = state.ctx(host);
            if let Some(space) = state.spaces.get_mut(grab.workspace) {
                grab::end(space, &mut ctx, &grab);
            }
        }

        let dropped_on = host.frame(window).and_then(|frame| monitor::at_point(&*host, frame.center()));
        let home = state.spaces.get(grab.workspace).map(|s| s.monitor().index);
        if let Some(dropped_on) = dropped_on
            && Some(dropped_on.index) != home
        {
            debug!(?window, monitor = dropped_on.index, "window dropped on another monitor");
            move_to_monitor(state, host, window, dropped_on.index);
        }
    }
}
