//! Keeps the selected window in view by scrolling the space's container, and
//! hands display over between visual proxies and real surfaces around each
//! scroll.

use tracing::trace;

use super::{Ctx, Space, SpaceSignal};
use crate::common::config::Settings;
use crate::model::window::WindowId;
use crate::sys::compositor::{AnimProps, AnimTarget};
use crate::sys::geometry::Rect;

/// Offset between a window's frame and its buffer, which includes
/// decorations and shadows drawn outside the frame.
pub(crate) fn surface_offset(ctx: &Ctx<'_>, window: WindowId) -> (f64, f64) {
    match (ctx.host.frame(window), ctx.host.buffer(window)) {
        (Some(frame), Some(buffer)) => (frame.x - buffer.x, frame.y - buffer.y),
        _ => (0.0, 0.0),
    }
}

/// Edge-snap policy. `x` is the column's candidate viewport position; the
/// first matching rule wins.
pub fn snap_x(
    settings: &Settings,
    index: usize,
    columns: usize,
    x: f64,
    width: f64,
    space_width: f64,
) -> f64 {
    let margin = settings.horizontal_margin;
    let wide = space_width * settings.wide_column_ratio - 2.0 * (margin + settings.window_gap);
    if index == 0 && x <= 0.0 {
        0.0
    } else if index + 1 == columns && x + width > space_width {
        space_width - width
    } else if width > wide {
        ((space_width - width) / 2.0).round()
    } else if x + width > space_width {
        space_width - margin - width
    } else if x < 0.0 {
        margin
    } else if x + width == space_width {
        // Leave a sliver visible instead of sitting exactly on the edge.
        space_width - settings.minimum_margin - width
    } else if x == 0.0 {
        settings.minimum_margin
    } else {
        x
    }
}

/// Makes `window` the selection and scrolls it into view. Returns the
/// viewport x the window's column was moved to, or `None` when the window
/// isn't tiled here or a scroll to it is already running.
pub fn ensure_viewport(
    space: &mut Space,
    ctx: &mut Ctx<'_>,
    window: WindowId,
    force: bool,
) -> Option<f64> {
    if space.moving() == Some(window) && !force {
        trace!(?window, "already moving to window");
        return None;
    }
    let (index, _) = space.locate(window)?;

    if let Some(previous) = space.selected()
        && ctx.host.flags(previous).is_parked()
    {
        animate_down(space, ctx, previous);
    }
    if space.selected() != Some(window) {
        update_selection(space, ctx, Some(window), true);
    }
    space.set_selected(Some(window));

    let frame = ctx.host.frame(window)?;
    let x = space.placement(window).map_or(0.0, |p| p.x.round()) + space.target_x();
    let x = snap_x(space.settings(), index, space.column_count(), x, frame.width, space.width());

    if !ctx.modes.navigating && ctx.host.flags(window).is_parked() {
        let y = frame.y - space.monitor().frame.y;
        let duration = space.animation_duration(true);
        ctx.host.animate(AnimTarget::Proxy(window), AnimProps::y(y), duration, None);
    }

    move_to(space, ctx, window, x, force);
    update_selection(space, ctx, None, false);
    ctx.host.raise(window);
    space.push_signal(SpaceSignal::Selected(window));
    Some(x)
}

/// Scrolls so that `window`'s column lands at viewport position `x`.
pub fn move_to(space: &mut Space, ctx: &mut Ctx<'_>, window: WindowId, x: f64, force: bool) {
    if !space.contains(window) {
        return;
    }
    let delta = space.placement(window).map_or(0.0, |p| p.x.round()) + space.target_x() - x;
    let target = space.target_x() - delta;
    if !ctx.modes.navigating && delta == 0.0 && !force {
        move_done(space, ctx);
        return;
    }

    space.set_target_x(target);
    start_animate(space, ctx, None);
    space.set_moving(Some(window));
    let duration = space.animation_duration(true);
    space.scroll_container(ctx, duration);
    space.fix_visible(ctx);
}

/// Completion of a scroll. Stale generations belong to superseded scrolls
/// and are dropped.
pub fn scroll_settled(space: &mut Space, ctx: &mut Ctx<'_>, generation: u64) -> bool {
    if generation != space.generation() {
        trace!(workspace = ?space.workspace(), generation, "stale scroll completion");
        return false;
    }
    space.set_moving(None);
    move_done(space, ctx);
    true
}

/// Reconciles real frames with the settled proxies and swaps the visible
/// windows back to their real surfaces.
pub fn move_done(space: &mut Space, ctx: &mut Ctx<'_>) {
    if ctx.modes.navigating || ctx.modes.frozen {
        return;
    }
    let monitor = space.monitor().frame;
    let windows: Vec<WindowId> = space.windows().collect();
    for window in windows {
        if !ctx.host.has_surface(window) || ctx.host.flags(window).is_parked() {
            continue;
        }
        let Some(placement) = space.placement(window) else { continue };
        let x = monitor.x + placement.x.round() + space.target_x();
        let y = monitor.y + placement.y.round();
        ctx.host.move_frame(window, x, y);
    }

    for window in space.visible().to_vec() {
        ctx.host.set_visible(AnimTarget::Proxy(window), false);
        if !ctx.host.has_surface(window) {
            continue;
        }
        ctx.host.set_surface_clip(window, Some(monitor));
        ctx.host.set_visible(AnimTarget::Surface(window), true);
    }
    space.push_signal(SpaceSignal::MoveDone);
}

/// Hides the real surfaces of visible windows behind their proxies so the
/// container can be panned as a unit. The grabbed window keeps its surface.
pub fn start_animate(space: &Space, ctx: &mut Ctx<'_>, grab: Option<WindowId>) {
    for &window in space.visible() {
        if !ctx.host.has_surface(window) {
            continue;
        }
        ctx.host.set_surface_clip(window, None);
        if Some(window) == grab {
            ctx.host.set_visible(AnimTarget::Proxy(window), false);
            ctx.host.set_visible(AnimTarget::Surface(window), true);
            continue;
        }
        ctx.host.set_visible(AnimTarget::Surface(window), false);
        ctx.host.set_visible(AnimTarget::Proxy(window), true);
    }
}

/// Moves the selection highlight onto `window` (or the current selection),
/// protruding half a gap on every side.
pub fn update_selection(
    space: &mut Space,
    ctx: &mut Ctx<'_>,
    window: Option<WindowId>,
    no_animate: bool,
) {
    let Some(window) = window.or(space.selected()) else { return };
    let Some(frame) = ctx.host.frame(window) else { return };
    let placement = space.placement(window).unwrap_or_default();
    let gap = space.settings().window_gap;
    let protrusion = (gap / 2.0).round();
    let rect = Rect::new(
        placement.x - protrusion,
        placement.y - protrusion,
        frame.width + gap,
        frame.height + gap,
    );
    space.set_selection(rect);
    let duration = space.animation_duration(!no_animate);
    ctx.host.animate(AnimTarget::Selection(space.workspace()), AnimProps::rect(rect), duration, None);
}

pub fn collapse_selection(space: &mut Space, ctx: &mut Ctx<'_>) {
    let target = AnimTarget::Selection(space.workspace());
    ctx.host.cancel_animations(target);
    ctx.host.set_props(target, AnimProps { width: Some(0.0), ..AnimProps::default() });
    space.set_selection(space.selection().with_size(0.0, space.selection().height));
}

/// Restacks after a focus change: the windows just before and after `window`
/// in column-major order keep their relative stacking and go on top, then
/// `window` above them. Closing `window` then hands focus to a neighbour.
pub fn fix_stack(space: &Space, ctx: &mut Ctx<'_>, window: WindowId) {
    let windows: Vec<WindowId> = space.windows().collect();
    let neighbours: Vec<WindowId> = match windows.iter().position(|w| *w == window) {
        Some(around) => [around.checked_sub(1), Some(around + 1)]
            .into_iter()
            .flatten()
            .filter_map(|i| windows.get(i).copied())
            .collect(),
        None => Vec::new(),
    };
    for neighbour in ctx.host.sort_by_stacking(&neighbours) {
        ctx.host.raise(neighbour);
    }
    ctx.host.raise(window);
}

/// Returns a parked window's proxy to the normal vertical anchor.
fn animate_down(space: &Space, ctx: &mut Ctx<'_>, window: WindowId) {
    let (_, dy) = surface_offset(ctx, window);
    let y = space.top(ctx) - dy;
    let duration = space.animation_duration(true);
    ctx.host.animate(AnimTarget::Proxy(window), AnimProps::y(y), duration, None);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout_engine::Modes;
    use crate::model::window::{WindowFlags, WorkspaceId};
    use crate::sys::compositor::{Completion, Compositor};
    use crate::sys::sim::SimHost;

    fn wid(n: u64) -> WindowId { WindowId(n) }

    fn setup(widths: &[f64]) -> (SimHost, Space) {
        let mut host = SimHost::new(1920.0, 1080.0);
        let ws = WorkspaceId(1);
        let mut space = Space::new(ws, host.monitor(0), Settings::default());
        for (i, width) in widths.iter().enumerate() {
            let id = wid(i as u64 + 1);
            host.add_window(id, ws, Rect::new(0.0, 0.0, *width, 600.0));
            let mut ctx = Ctx::new(&mut host, Modes::default());
            space.add_window(&mut ctx, id, i, None);
        }
        space.mark_populated();
        let mut ctx = Ctx::new(&mut host, Modes::default());
        space.layout(&mut ctx, false);
        (host, space)
    }

    #[test]
    fn snap_policy_rules_in_priority_order() {
        let s = Settings::default();
        let w = 1920.0;
        // First column at or past the left edge.
        assert_eq!(snap_x(&s, 0, 3, -40.0, 600.0, w), 0.0);
        assert_eq!(snap_x(&s, 0, 3, 0.0, 600.0, w), 0.0);
        // Last column overflowing the right edge.
        assert_eq!(snap_x(&s, 2, 3, 1500.0, 600.0, w), 1320.0);
        // Wide columns are centered.
        assert_eq!(snap_x(&s, 1, 3, 300.0, 1700.0, w), 110.0);
        // Interior overflow and underflow use the horizontal margin.
        assert_eq!(snap_x(&s, 1, 3, 1500.0, 600.0, w), 1920.0 - 20.0 - 600.0);
        assert_eq!(snap_x(&s, 1, 3, -10.0, 600.0, w), 20.0);
        // Exactly flush leaves a sliver.
        assert_eq!(snap_x(&s, 1, 3, 1320.0, 600.0, w), 1920.0 - 15.0 - 600.0);
        assert_eq!(snap_x(&s, 1, 3, 0.0, 600.0, w), 15.0);
        // Already comfortably inside.
        assert_eq!(snap_x(&s, 1, 3, 400.0, 600.0, w), 400.0);
    }

    #[test]
    fn first_column_pins_exactly_to_left_edge() {
        let (mut host, mut space) = setup(&[800.0, 800.0, 800.0]);
        space.set_target_x(-100.0);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert_eq!(ensure_viewport(&mut space, &mut ctx, wid(1), true), Some(0.0));
        assert_eq!(space.target_x(), 0.0);
    }

    #[test]
    fn last_column_overflowing_pins_flush_right() {
        let (mut host, mut space) = setup(&[800.0, 800.0, 800.0]);
        space.set_target_x(0.0);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert_eq!(ensure_viewport(&mut space, &mut ctx, wid(3), false), Some(1120.0));
        assert_eq!(space.target_x(), 1120.0 - 1640.0);
        assert_eq!(space.selected(), Some(wid(3)));
    }

    #[test]
    fn last_column_exactly_flush_right_keeps_a_sliver() {
        let (mut host, mut space) = setup(&[600.0, 600.0, 600.0]);
        // Column 2 sits at 1240; put its right edge exactly on the viewport edge.
        space.set_target_x(1920.0 - 600.0 - 1240.0);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        let x = ensure_viewport(&mut space, &mut ctx, wid(3), false);
        assert_eq!(x, Some(1920.0 - 15.0 - 600.0));
    }

    #[test]
    fn ensure_viewport_twice_is_idempotent() {
        let (mut host, mut space) = setup(&[800.0, 800.0, 800.0]);
        space.set_target_x(0.0);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert!(ensure_viewport(&mut space, &mut ctx, wid(3), false).is_some());
        let first = space.target_x();
        assert_eq!(space.moving(), Some(wid(3)));
        assert_eq!(ensure_viewport(&mut space, &mut ctx, wid(3), false), None);
        assert_eq!(space.target_x(), first);
    }

    #[test]
    fn settled_column_is_not_scrolled_again() {
        let (mut host, mut space) = setup(&[800.0, 800.0, 800.0]);
        space.set_target_x(0.0);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert_eq!(ensure_viewport(&mut space, &mut ctx, wid(2), false), Some(820.0));
        let generation = space.generation();
        assert_eq!(ensure_viewport(&mut space, &mut ctx, wid(2), false), Some(820.0));
        assert_eq!(space.generation(), generation);
        assert_eq!(space.moving(), None);
    }

    #[test]
    fn ensure_viewport_on_unknown_window_fails() {
        let (mut host, mut space) = setup(&[800.0]);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert_eq!(ensure_viewport(&mut space, &mut ctx, wid(99), true), None);
        assert_eq!(space.selected(), Some(wid(1)));
    }

    #[test]
    fn superseded_scroll_completion_is_ignored() {
        let (mut host, mut space) = setup(&[800.0, 800.0, 800.0]);
        space.set_target_x(0.0);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        ensure_viewport(&mut space, &mut ctx, wid(3), false);
        let stale = space.generation();
        ensure_viewport(&mut space, &mut ctx, wid(1), false);
        assert_ne!(space.generation(), stale);

        assert!(!scroll_settled(&mut space, &mut ctx, stale));
        assert_eq!(space.moving(), Some(wid(1)));
        let current = space.generation();
        assert!(scroll_settled(&mut space, &mut ctx, current));
        assert_eq!(space.moving(), None);
    }

    #[test]
    fn move_done_reconciles_frames_with_placements() {
        let (mut host, mut space) = setup(&[800.0, 800.0, 800.0]);
        space.set_target_x(0.0);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        ensure_viewport(&mut space, &mut ctx, wid(2), false);
        space.fix_visible(&mut ctx);
        let generation = space.generation();
        assert!(scroll_settled(&mut space, &mut ctx, generation));

        let target_x = space.target_x();
        let f2 = host.frame_of(wid(2));
        assert_eq!(f2.x, 820.0 + target_x);
        assert!(host.is_visible(AnimTarget::Surface(wid(2))));
        assert!(!host.is_visible(AnimTarget::Proxy(wid(2))));
        assert_eq!(host.surface_clip(wid(2)), Some(space.monitor().frame));
        assert!(space.take_signals().contains(&SpaceSignal::MoveDone));
    }

    #[test]
    fn move_done_is_suppressed_while_frozen() {
        let (mut host, mut space) = setup(&[800.0, 800.0]);
        let before = host.frame_of(wid(2));
        let modes = Modes { frozen: true, navigating: false };
        let mut ctx = Ctx::new(&mut host, modes);
        move_done(&mut space, &mut ctx);
        assert_eq!(host.frame_of(wid(2)), before);
    }

    #[test]
    fn fullscreen_windows_keep_their_frame_on_move_done() {
        let (mut host, mut space) = setup(&[800.0, 800.0]);
        host.set_flags_direct(wid(2), WindowFlags::FULLSCREEN);
        let before = host.frame_of(wid(2));
        let mut ctx = Ctx::new(&mut host, Modes::default());
        move_done(&mut space, &mut ctx);
        assert_eq!(host.frame_of(wid(2)), before);
    }

    #[test]
    fn selection_highlight_protrudes_half_a_gap() {
        let (mut host, mut space) = setup(&[800.0, 700.0]);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        ensure_viewport(&mut space, &mut ctx, wid(2), true);
        let gap = space.settings().window_gap;
        let placement = space.placement(wid(2)).unwrap_or_default();
        let frame = host.frame_of(wid(2));
        assert_eq!(
            space.selection(),
            Rect::new(placement.x - 10.0, placement.y - 10.0, frame.width + gap, frame.height + gap)
        );
    }

    #[test]
    fn scroll_requests_carry_the_current_generation() {
        let (mut host, mut space) = setup(&[800.0, 800.0, 800.0]);
        space.set_target_x(0.0);
        host.take_completions();
        let mut ctx = Ctx::new(&mut host, Modes::default());
        ensure_viewport(&mut space, &mut ctx, wid(3), false);
        let completions = host.take_completions();
        assert_eq!(
            completions.last(),
            Some(&Completion::ScrollSettled {
                workspace: space.workspace(),
                generation: space.generation()
            })
        );
    }

    #[test]
    fn fix_stack_raises_only_adjacent_neighbours() {
        let (mut host, space) = setup(&[600.0, 600.0, 600.0, 600.0]);
        for w in [4, 3, 1] {
            host.raise_window(wid(w));
        }
        assert_eq!(host.stacking(), &[wid(2), wid(4), wid(3), wid(1)]);

        let mut ctx = Ctx::new(&mut host, Modes::default());
        fix_stack(&space, &mut ctx, wid(2));
        assert_eq!(host.stacking(), &[wid(4), wid(3), wid(1), wid(2)]);
    }
}
