//! Interactive move of a tiled window. While the user drags, the whole
//! scroll container follows the grabbed column instead of the window leaving
//! the strip.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{Ctx, Space, viewport};
use crate::model::window::{WindowId, WorkspaceId};
use crate::sys::compositor::{AnimProps, AnimTarget};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum GrabOp {
    /// Modal grabs taken by the compositor itself. Ignored.
    Compositor,
    Moving,
    Resizing,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrabState {
    pub window: WindowId,
    pub workspace: WorkspaceId,
    /// Screen x of the grabbed column's origin when the drag started.
    pub anchor: f64,
}

/// Starts following `window`. Returns `None` for compositor grabs and for
/// windows that aren't tiled here.
pub fn begin(space: &Space, ctx: &mut Ctx<'_>, window: WindowId, op: GrabOp) -> Option<GrabState> {
    if op == GrabOp::Compositor {
        return None;
    }
    let placement = space.placement(window)?;
    viewport::start_animate(space, ctx, Some(window));
    let anchor = placement.x + space.monitor().frame.x;
    ctx.host.cancel_animations(AnimTarget::ScrollContainer(space.workspace()));
    debug!(?window, %op, anchor, "grab started");
    Some(GrabState { window, workspace: space.workspace(), anchor })
}

/// The grabbed window moved: drag the container along and keep the
/// selection highlight on the window.
pub fn position_changed(space: &mut Space, ctx: &mut Ctx<'_>, grab: &GrabState) {
    let Some(frame) = ctx.host.frame(grab.window) else { return };
    let workspace = space.workspace();
    let x = frame.x - grab.anchor;
    ctx.host.set_props(AnimTarget::ScrollContainer(workspace), AnimProps::x(x));

    let protrusion = (space.settings().window_gap / 2.0).round();
    let y = frame.y - space.monitor().frame.y - protrusion;
    ctx.host.set_props(AnimTarget::Selection(workspace), AnimProps::y(y));
    let selection = space.selection();
    space.set_selection(selection.with_origin(selection.x, y));
    trace!(x, y, "grab follower");
}

/// Drops the follower and snaps everything back into tiled order. The
/// caller must have cleared its grab first so layout is no longer frozen.
pub fn end(space: &mut Space, ctx: &mut Ctx<'_>, grab: &GrabState) {
    let workspace = space.workspace();
    let target_x = ctx.host.position(AnimTarget::ScrollContainer(workspace)).x;
    space.set_target_x(target_x);
    if let Some(buffer) = ctx.host.buffer(grab.window) {
        let monitor = space.monitor().frame;
        ctx.host.set_props(
            AnimTarget::Proxy(grab.window),
            AnimProps::at(buffer.x - monitor.x - target_x, buffer.y - monitor.y),
        );
    }
    space.layout(ctx, true);
    viewport::ensure_viewport(space, ctx, grab.window, true);
    debug!(window = ?grab.window, target_x, "grab ended");
}
