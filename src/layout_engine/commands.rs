//! User-invokable commands. Keybinding hosts deliver these as
//! `Event::Command`; most act on the active desktop's space.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::insertion::toggle_maximize_horizontally;
use super::scratch;
use super::winprop::Winprop;
use super::{Ctx, Direction, Space, viewport};
use crate::common::config::WinpropRule;
use crate::model::monitor;
use crate::model::state::WindowManagerState;
use crate::model::window::WindowId;
use crate::sys::Platform;
use crate::sys::geometry::{Point, Rect};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    SwitchLeft,
    SwitchRight,
    SwitchUp,
    SwitchDown,
    /// Next window in column-major order.
    SwitchNext,
    SwitchPrevious,
    Swap(Direction),

    /// Opens the space preview or moves its cursor.
    SelectSpace(Direction),
    EndPreview,
    CancelPreview,

    ToggleMaximizeHorizontally,
    CycleWindowWidth,
    CenterWindowHorizontally,
    /// Narrows the on-screen columns until they all fit.
    TileVisible,

    ActivateNthWindow(usize),
    ActivateFirstWindow,
    ActivateLastWindow,

    /// Pull the head of the next column into the selected one.
    Slurp,
    /// Push the bottom window of the selected column into a new column.
    Barf,

    ToggleScratch,
    ToggleScratchLayer,
    ToggleScratchWindow,

    DefineWinprop(WinpropRule),
}

/// Runs `command`. Returns false when it had nothing to act on.
pub fn execute(state: &mut WindowManagerState, host: &mut dyn Platform, command: Command) -> bool {
    debug!(?command, "executing command");
    match command {
        Command::SwitchLeft => switch(state, host, |s, ctx| s.switch(ctx, Direction::Left)),
        Command::SwitchRight => switch(state, host, |s, ctx| s.switch(ctx, Direction::Right)),
        Command::SwitchUp => switch(state, host, |s, ctx| s.switch(ctx, Direction::Up)),
        Command::SwitchDown => switch(state, host, |s, ctx| s.switch(ctx, Direction::Down)),
        Command::SwitchNext => switch(state, host, |s, ctx| s.switch_linear(ctx, 1)),
        Command::SwitchPrevious => switch(state, host, |s, ctx| s.switch_linear(ctx, -1)),
        Command::Swap(direction) => {
            on_active_space(state, host, |s, ctx| s.swap(ctx, direction, None))
        }
        Command::SelectSpace(direction) => {
            let mut ctx = state.ctx(host);
            state.spaces.select_space(&mut ctx, direction)
        }
        Command::EndPreview => {
            let mut ctx = state.ctx(host);
            state.spaces.end_preview(&mut ctx)
        }
        Command::CancelPreview => {
            let mut ctx = state.ctx(host);
            state.spaces.cancel_preview(&mut ctx)
        }
        Command::ToggleMaximizeHorizontally => {
            let Some(window) = host.focus_window() else { return false };
            let margin = state.config.settings.minimum_margin;
            toggle_maximize_horizontally(&mut state.scratch, host, window, margin);
            true
        }
        Command::CycleWindowWidth => match host.focus_window() {
            Some(window) => cycle_window_width(state, host, window),
            None => false,
        },
        Command::CenterWindowHorizontally => match host.focus_window() {
            Some(window) => center_window_horizontally(state, host, window),
            None => false,
        },
        Command::TileVisible => match host.focus_window() {
            Some(window) => tile_visible(state, host, window),
            None => false,
        },
        Command::ActivateNthWindow(n) => activate_nth_window(state, host, n),
        Command::ActivateFirstWindow => activate_nth_window(state, host, 0),
        Command::ActivateLastWindow => {
            let active = host.active_workspace();
            let last = state.spaces.get(active).and_then(|s| s.column_count().checked_sub(1));
            match last {
                Some(last) => activate_nth_window(state, host, last),
                None => false,
            }
        }
        Command::Slurp => on_active_space(state, host, |s, ctx| s.slurp(ctx)),
        Command::Barf => on_active_space(state, host, |s, ctx| s.barf(ctx)),
        Command::ToggleScratch => {
            let Some(window) = host.focus_window() else { return false };
            scratch::toggle(state, host, window);
            true
        }
        Command::ToggleScratchLayer => {
            scratch::toggle_scratch_layer(&state.scratch, host);
            true
        }
        Command::ToggleScratchWindow => {
            scratch::toggle_scratch_window(&state.scratch, host);
            true
        }
        Command::DefineWinprop(rule) => match Winprop::compile(&rule) {
            Ok(winprop) => {
                state.winprops.define(winprop);
                true
            }
            Err(e) => {
                warn!("ignoring winprop: {e}");
                false
            }
        },
    }
}

fn on_active_space(
    state: &mut WindowManagerState,
    host: &mut dyn Platform,
    f: impl FnOnce(&mut Space, &mut Ctx<'_>) -> bool,
) -> bool {
    let active = host.active_workspace();
    let mut ctx = state.ctx(host);
    let Some(space) = state.spaces.get_mut(active) else { return false };
    f(space, &mut ctx)
}

/// Moves the selection and gives the newly selected window focus.
fn switch(
    state: &mut WindowManagerState,
    host: &mut dyn Platform,
    f: impl FnOnce(&mut Space, &mut Ctx<'_>) -> bool,
) -> bool {
    if !on_active_space(state, host, f) {
        return false;
    }
    let active = host.active_workspace();
    if let Some(selected) = state.spaces.get(active).and_then(|s| s.selected()) {
        host.activate(selected);
    }
    true
}

/// Scrolls to the head of column `n` of the active space and focuses it.
pub fn activate_nth_window(state: &mut WindowManagerState, host: &mut dyn Platform, n: usize) -> bool {
    let active = host.active_workspace();
    let Some(window) = state.spaces.get(active).and_then(|s| s.window_at(n, 0)) else {
        return false;
    };
    on_active_space(state, host, |s, ctx| {
        viewport::ensure_viewport(s, ctx, window, false);
        true
    });
    host.activate(window);
    true
}

/// Index of the first ratio clearly wider than `current`, wrapping to the
/// narrowest one.
pub fn next_width_ratio(ratios: &[f64], current: f64) -> usize {
    for (i, ratio) in ratios.iter().enumerate() {
        if current <= *ratio {
            return if current / ratio > 0.9 { (i + 1) % ratios.len() } else { i };
        }
    }
    0
}

/// Steps `window` through the configured width ratios of its monitor,
/// keeping it fully on screen.
pub fn cycle_window_width(
    state: &mut WindowManagerState,
    host: &mut dyn Platform,
    window: WindowId,
) -> bool {
    let settings = &state.config.settings;
    if settings.cycle_width_ratios.is_empty() {
        return false;
    }
    let Some(frame) = host.frame(window) else { return false };
    let monitor =
        monitor::at_point(&*host, frame.center()).unwrap_or_else(|| monitor::primary(&*host));
    let margin = settings.minimum_margin;
    let available = monitor.frame.width - 2.0 * margin;
    let ratios = &settings.cycle_width_ratios;
    let width = (ratios[next_width_ratio(ratios, frame.width / available)] * available).floor();

    let right = monitor.frame.max_x() - margin;
    let x = if frame.x + width > right { right - width } else { frame.x };
    host.move_resize_frame(window, Rect::new(x, frame.y, width, frame.height));
    state.scratch.state_mut(window).unmaximized_frame = None;
    true
}

/// Centers `window` on its monitor. A pointer resting on the window moves
/// with it.
pub fn center_window_horizontally(
    state: &mut WindowManagerState,
    host: &mut dyn Platform,
    window: WindowId,
) -> bool {
    let Some(frame) = host.frame(window) else { return false };
    let tiled_in = state.spaces.find_window(window);
    let space = tiled_in.and_then(|ws| state.spaces.get(ws));
    let monitor = match space {
        Some(space) => *space.monitor(),
        None => monitor::at_point(&*host, frame.center()).unwrap_or_else(|| monitor::primary(&*host)),
    };
    let target_x = (monitor.frame.width / 2.0 - frame.width / 2.0).round();
    let current = match space.and_then(|s| Some(s.placement(window)?.x + s.target_x())) {
        Some(x) => x,
        None => frame.x - monitor.frame.x,
    };
    let dx = target_x - current;

    let pointer = host.pointer();
    if frame.contains(pointer) {
        host.warp_pointer(Point::new(pointer.x + dx, pointer.y));
    }

    let Some(workspace) = tiled_in else {
        host.move_frame(window, target_x + monitor.frame.x, frame.y);
        return true;
    };
    let mut ctx = state.ctx(host);
    if let Some(space) = state.spaces.get_mut(workspace) {
        viewport::move_to(space, &mut ctx, window, target_x, false);
        viewport::update_selection(space, &mut ctx, None, false);
    }
    true
}

/// Shrinks every unstacked column of `window`'s space by the same amount
/// until they fit side by side, then scrolls the first of them to the left
/// margin.
pub fn tile_visible(state: &mut WindowManagerState, host: &mut dyn Platform, window: WindowId) -> bool {
    let Some(workspace) = state.spaces.find_window(window) else { return false };
    let mut ctx = state.ctx(host);
    let Some(space) = state.spaces.get_mut(workspace) else { return false };

    let visible = space.visible();
    let columns: Vec<Vec<WindowId>> = space
        .columns()
        .filter(|column| column.iter().any(|w| visible.contains(w)))
        .map(<[WindowId]>::to_vec)
        .collect();
    let Some(first) = columns.first().and_then(|c| c.first().copied()) else { return false };
    let widths: Vec<f64> = columns
        .iter()
        .map(|c| c.iter().filter_map(|w| ctx.host.frame(*w)).map(|f| f.width).fold(0.0, f64::max))
        .collect();

    let gap = space.settings().window_gap;
    let margin = space.settings().minimum_margin;
    let count = columns.len() as f64;
    let required = widths.iter().sum::<f64>() + (count - 1.0) * gap + 2.0 * margin;
    let deficit = required - space.width();
    if deficit > 0.0 {
        let reduction = (deficit / count).ceil();
        debug!(?workspace, columns = columns.len(), reduction, "tiling visible columns");
        for (column, width) in columns.iter().zip(&widths) {
            for &w in column {
                if let Some(frame) = ctx.host.frame(w) {
                    ctx.host.move_resize_frame(w, frame.with_size(width - reduction, frame.height));
                }
            }
        }
        space.layout(&mut ctx, true);
    }
    viewport::move_to(space, &mut ctx, first, margin, false);
    true
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::common::config::Config;
    use crate::model::window::WorkspaceId;
    use crate::sys::compositor::Completion;
    use crate::sys::sim::SimHost;
    use crate::sys::window_server::WindowServer;

    fn wid(n: u64) -> WindowId { WindowId(n) }

    fn setup(ids: &[u64]) -> (SimHost, WindowManagerState) {
        let mut host = SimHost::new(1920.0, 1080.0);
        for id in ids {
            host.add_window(wid(*id), WorkspaceId(1), Rect::new(0.0, 0.0, 600.0, 600.0));
        }
        let mut state = WindowManagerState::new(&mut host, Config::default(), None).expect("state");
        settle(&mut host, &mut state);
        (host, state)
    }

    fn settle(host: &mut SimHost, state: &mut WindowManagerState) {
        for completion in host.take_completions() {
            if let Completion::ScrollSettled { workspace, generation } = completion {
                let mut ctx = state.ctx(host);
                if let Some(space) = state.spaces.get_mut(workspace) {
                    viewport::scroll_settled(space, &mut ctx, generation);
                }
            }
        }
    }

    fn selected(state: &WindowManagerState) -> Option<WindowId> {
        state.spaces.get(WorkspaceId(1)).and_then(|s| s.selected())
    }

    #[test]
    fn commands_deserialize_from_snake_case() {
        let command: Command = serde_json::from_str(r#"{"swap":"right"}"#).expect("json");
        assert_eq!(command, Command::Swap(Direction::Right));
        let command: Command = serde_json::from_str(r#""toggle_scratch_layer""#).expect("json");
        assert_eq!(command, Command::ToggleScratchLayer);
        let command: Command =
            ron::from_str(r#"define_winprop((wm_class: "Term", scratch_layer: true))"#)
                .expect("ron");
        assert!(matches!(command, Command::DefineWinprop(rule) if rule.scratch_layer));
    }

    #[test]
    fn switching_moves_focus_with_selection() {
        let (mut host, mut state) = setup(&[1, 2, 3]);
        assert_eq!(selected(&state), Some(wid(1)));
        assert!(!execute(&mut state, &mut host, Command::SwitchLeft));

        assert!(execute(&mut state, &mut host, Command::SwitchRight));
        assert_eq!(selected(&state), Some(wid(2)));
        assert_eq!(host.focus_window(), Some(wid(2)));

        assert!(execute(&mut state, &mut host, Command::SwitchNext));
        assert_eq!(selected(&state), Some(wid(3)));
        assert!(!execute(&mut state, &mut host, Command::SwitchNext));
    }

    #[test]
    fn activate_nth_window_selects_column_head() {
        let (mut host, mut state) = setup(&[1, 2, 3]);
        assert!(execute(&mut state, &mut host, Command::ActivateLastWindow));
        assert_eq!(selected(&state), Some(wid(3)));
        assert_eq!(host.focus_window(), Some(wid(3)));
        settle(&mut host, &mut state);
        assert!(execute(&mut state, &mut host, Command::ActivateFirstWindow));
        assert_eq!(selected(&state), Some(wid(1)));
        assert!(!execute(&mut state, &mut host, Command::ActivateNthWindow(7)));
    }

    #[test]
    fn empty_space_has_nothing_to_activate() {
        let (mut host, mut state) = setup(&[]);
        assert!(!execute(&mut state, &mut host, Command::ActivateLastWindow));
        assert!(!execute(&mut state, &mut host, Command::Slurp));
    }

    #[test]
    fn width_ratios_step_up_and_wrap() {
        let ratios = [0.38195, 0.5, 0.61804];
        assert_eq!(next_width_ratio(&ratios, 0.2), 0);
        assert_eq!(next_width_ratio(&ratios, 0.38), 1);
        assert_eq!(next_width_ratio(&ratios, 0.42), 1);
        assert_eq!(next_width_ratio(&ratios, 0.6), 0);
        assert_eq!(next_width_ratio(&ratios, 0.7), 0);
    }

    #[test]
    fn cycled_width_keeps_window_on_screen() {
        let (mut host, mut state) = setup(&[]);
        host.add_window(wid(5), WorkspaceId(1), Rect::new(1500.0, 40.0, 400.0, 500.0));
        assert!(cycle_window_width(&mut state, &mut host, wid(5)));
        let available: f64 = 1920.0 - 30.0;
        let width = (0.38195 * available).floor();
        assert_eq!(host.frame_of(wid(5)), Rect::new(1920.0 - 15.0 - width, 40.0, width, 500.0));
    }

    #[test]
    fn tile_visible_narrows_on_screen_columns_to_fit() {
        let mut host = SimHost::new(1920.0, 1080.0);
        for id in [1, 2, 3] {
            host.add_window(wid(id), WorkspaceId(1), Rect::new(0.0, 0.0, 700.0, 600.0));
        }
        let mut state = WindowManagerState::new(&mut host, Config::default(), None).expect("state");
        settle(&mut host, &mut state);
        host.activate(wid(1));

        // 3 * 700 + 2 gaps + 2 margins overshoots by 250: each loses 84.
        assert!(execute(&mut state, &mut host, Command::TileVisible));
        for id in [1, 2, 3] {
            assert_eq!(host.frame_of(wid(id)).width, 616.0);
        }
        let space = state.spaces.get(WorkspaceId(1));
        assert_eq!(space.and_then(|s| s.placement(wid(2))).map(|p| p.x), Some(636.0));
        assert_eq!(space.map(|s| s.target_x()), Some(15.0));
    }

    #[test]
    fn tile_visible_leaves_fitting_columns_alone() {
        let (mut host, mut state) = setup(&[1, 2]);
        assert!(tile_visible(&mut state, &mut host, wid(1)));
        assert_eq!(host.frame_of(wid(1)).width, 600.0);
        assert!(!tile_visible(&mut state, &mut host, wid(9)));
    }

    #[test]
    fn centering_a_floating_window_carries_the_pointer() {
        let (mut host, mut state) = setup(&[]);
        host.add_window(wid(5), WorkspaceId(1), Rect::new(100.0, 40.0, 600.0, 500.0));
        host.set_pointer(Point::new(150.0, 60.0));
        assert!(center_window_horizontally(&mut state, &mut host, wid(5)));
        assert_eq!(host.frame_of(wid(5)).x, 660.0);
        assert_eq!(host.warps(), &[Point::new(710.0, 60.0)]);
    }

    #[test]
    fn centering_a_tiled_window_scrolls_the_space() {
        let (mut host, mut state) = setup(&[1, 2, 3]);
        assert!(center_window_horizontally(&mut state, &mut host, wid(2)));
        let space = state.spaces.get(WorkspaceId(1)).expect("space");
        let x = space.placement(wid(2)).map_or(0.0, |p| p.x) + space.target_x();
        assert_eq!(x, 660.0);
    }

    #[test]
    fn winprops_can_be_defined_at_runtime() {
        let (mut host, mut state) = setup(&[]);
        let rule = WinpropRule { wm_class: "Term".into(), ..WinpropRule::default() };
        assert!(execute(&mut state, &mut host, Command::DefineWinprop(rule)));
        assert_eq!(state.winprops.len(), 1);
        let bad = WinpropRule {
            wm_class: "Term".into(),
            title: Some("/[/".into()),
            ..WinpropRule::default()
        };
        assert!(!execute(&mut state, &mut host, Command::DefineWinprop(bad)));
        assert_eq!(state.winprops.len(), 1);
    }
}
