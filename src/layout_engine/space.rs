use std::time::Duration;

use ascii_tree::Tree;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{Ctx, Direction, SpaceSignal, viewport};
use crate::common::collections::HashMap;
use crate::common::config::Settings;
use crate::model::monitor::Monitor;
use crate::model::window::{WindowId, WorkspaceId};
use crate::sys::affordance::{Edge, StackTarget};
use crate::sys::compositor::{AnimProps, AnimTarget, Completion, SpaceAppearance};
use crate::sys::geometry::Rect;

/// A column that keeps getting resized to something else is laid out at
/// most this many times per pass.
const MAX_COLUMN_PASSES: usize = 3;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
struct Column {
    windows: Vec<WindowId>,
}

impl Column {
    fn new(window: WindowId) -> Self { Self { windows: vec![window] } }
}

/// Where a window's proxy rests inside the scroll container, relative to the
/// monitor origin before the scroll offset is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
}

/// Column tiling state for one virtual desktop.
#[derive(Debug)]
pub struct Space {
    workspace: WorkspaceId,
    columns: Vec<Column>,
    selected: Option<WindowId>,
    target_x: f64,
    visible: Vec<WindowId>,
    monitor: Monitor,
    settings: Settings,
    appearance: SpaceAppearance,
    placements: HashMap<WindowId, Placement>,
    selection: Rect,
    moving: Option<WindowId>,
    generation: u64,
    populated: bool,
    in_layout: bool,
    signals: Vec<SpaceSignal>,
}

impl Space {
    pub fn new(workspace: WorkspaceId, monitor: Monitor, settings: Settings) -> Self {
        Self {
            workspace,
            columns: Vec::new(),
            selected: None,
            target_x: 0.0,
            visible: Vec::new(),
            monitor,
            settings,
            appearance: SpaceAppearance::default(),
            placements: HashMap::default(),
            selection: Rect::ZERO,
            moving: None,
            generation: 0,
            populated: false,
            in_layout: false,
            signals: Vec::new(),
        }
    }

    pub fn workspace(&self) -> WorkspaceId { self.workspace }

    pub fn monitor(&self) -> &Monitor { &self.monitor }

    pub fn settings(&self) -> &Settings { &self.settings }

    pub fn appearance(&self) -> &SpaceAppearance { &self.appearance }

    pub fn width(&self) -> f64 { self.monitor.frame.width }

    pub fn height(&self) -> f64 { self.monitor.frame.height }

    pub fn selected(&self) -> Option<WindowId> { self.selected }

    pub fn target_x(&self) -> f64 { self.target_x }

    pub fn visible(&self) -> &[WindowId] { &self.visible }

    pub fn selection(&self) -> Rect { self.selection }

    pub fn moving(&self) -> Option<WindowId> { self.moving }

    pub fn generation(&self) -> u64 { self.generation }

    pub fn is_populated(&self) -> bool { self.populated }

    pub fn is_empty(&self) -> bool { self.columns.is_empty() }

    pub fn column_count(&self) -> usize { self.columns.len() }

    pub fn column(&self, index: usize) -> Option<&[WindowId]> {
        self.columns.get(index).map(|c| c.windows.as_slice())
    }

    pub fn columns(&self) -> impl Iterator<Item = &[WindowId]> + '_ {
        self.columns.iter().map(|c| c.windows.as_slice())
    }

    /// Windows in column-major order.
    pub fn windows(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.columns.iter().flat_map(|c| c.windows.iter().copied())
    }

    pub fn contains(&self, window: WindowId) -> bool { self.locate(window).is_some() }

    pub fn locate(&self, window: WindowId) -> Option<(usize, usize)> {
        for (col_idx, col) in self.columns.iter().enumerate() {
            if let Some(row_idx) = col.windows.iter().position(|w| *w == window) {
                return Some((col_idx, row_idx));
            }
        }
        None
    }

    pub fn index_of(&self, window: WindowId) -> Option<usize> {
        self.locate(window).map(|(col, _)| col)
    }

    pub fn selected_location(&self) -> Option<(usize, usize)> {
        self.selected.and_then(|w| self.locate(w))
    }

    pub fn window_at(&self, column: usize, row: usize) -> Option<WindowId> {
        self.columns.get(column)?.windows.get(row).copied()
    }

    pub fn placement(&self, window: WindowId) -> Option<Placement> {
        self.placements.get(&window).copied()
    }

    pub fn take_signals(&mut self) -> Vec<SpaceSignal> { std::mem::take(&mut self.signals) }

    pub(crate) fn push_signal(&mut self, signal: SpaceSignal) { self.signals.push(signal); }

    pub(crate) fn set_selected(&mut self, window: Option<WindowId>) { self.selected = window; }

    pub(crate) fn set_target_x(&mut self, target_x: f64) { self.target_x = target_x; }

    pub(crate) fn set_moving(&mut self, window: Option<WindowId>) { self.moving = window; }

    pub(crate) fn set_selection(&mut self, selection: Rect) { self.selection = selection; }

    pub(crate) fn set_placement(&mut self, window: WindowId, placement: Placement) {
        self.placements.insert(window, placement);
    }

    pub(crate) fn mark_populated(&mut self) { self.populated = true; }

    pub(crate) fn update_settings(&mut self, settings: Settings) { self.settings = settings; }

    pub(crate) fn next_generation(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    pub(crate) fn animation_duration(&self, animate: bool) -> Duration {
        if animate { self.settings.animation_duration() } else { Duration::ZERO }
    }

    pub(crate) fn top(&self, ctx: &Ctx<'_>) -> f64 {
        ctx.host.panel_height() + self.settings.vertical_margin
    }

    /// Recomputes column widths, row heights and column offsets, and
    /// proposes the resulting frame to every window with a surface.
    pub fn layout(&mut self, ctx: &mut Ctx<'_>, animate: bool) {
        if self.in_layout {
            trace!(workspace = ?self.workspace, "layout already running");
            return;
        }
        self.in_layout = true;

        let duration = self.animation_duration(animate);
        let gap = self.settings.window_gap;
        let top = self.top(ctx);
        viewport::start_animate(self, ctx, None);

        let mut x = 0.0;
        let mut index = 0;
        let mut passes = 0;
        while index < self.columns.len() {
            let (width, width_changed) = self.layout_column(ctx, index, x, top, duration);
            passes += 1;
            if width_changed && passes < MAX_COLUMN_PASSES {
                continue;
            }
            if width_changed {
                debug!(workspace = ?self.workspace, column = index, "column width did not settle");
            }
            passes = 0;
            x += width + gap;
            index += 1;
        }
        self.in_layout = false;

        if x < self.width() {
            self.target_x = ((self.width() - x) / 2.0).round();
        }
        if animate {
            self.scroll_container(ctx, duration);
            self.fix_visible(ctx);
            viewport::update_selection(self, ctx, None, false);
        }
    }

    /// Lays out one column at `x`. Returns the width used and whether any
    /// window came back with a width other than the requested one.
    fn layout_column(
        &mut self,
        ctx: &mut Ctx<'_>,
        index: usize,
        x: f64,
        top: f64,
        duration: Duration,
    ) -> (f64, bool) {
        let windows = self.columns[index].windows.clone();
        let mut target_width =
            windows.iter().filter_map(|w| ctx.host.frame(*w)).map(|f| f.width).fold(0.0, f64::max);
        if let Some(selected) = self.selected
            && windows.contains(&selected)
            && let Some(frame) = ctx.host.frame(selected)
        {
            target_width = frame.width;
        }
        target_width = target_width.min(self.width());

        let gap = self.settings.window_gap;
        let rows = windows.len() as f64;
        let height = ((self.height() - top - gap * (rows - 1.0)) / rows).round();

        let mut y = top;
        let mut width_changed = false;
        for window in windows {
            if !ctx.host.has_surface(window) {
                continue;
            }
            let Some(frame) = ctx.host.frame(window) else { continue };
            ctx.host.move_resize_frame(window, Rect::new(frame.x, frame.y, target_width, height));
            let realized = ctx.host.frame(window).map_or(target_width, |f| f.width);
            if realized != target_width && realized != frame.width {
                width_changed = true;
            }

            self.placements.insert(window, Placement { x, y });
            let (dx, dy) = viewport::surface_offset(ctx, window);
            ctx.host.animate(AnimTarget::Proxy(window), AnimProps::at(x - dx, y - dy), duration, None);
            y += height + gap;
        }
        (target_width, width_changed)
    }

    /// Animates the scroll container to `target_x`. Any in-flight scroll is
    /// superseded.
    pub(crate) fn scroll_container(&mut self, ctx: &mut Ctx<'_>, duration: Duration) {
        let generation = self.next_generation();
        ctx.host.animate(
            AnimTarget::ScrollContainer(self.workspace),
            AnimProps::x(self.target_x),
            duration,
            Some(Completion::ScrollSettled { workspace: self.workspace, generation }),
        );
    }

    /// Recomputes the visible set around the selected column and registers
    /// the first column beyond each viewport edge as a stack target.
    pub fn fix_visible(&mut self, ctx: &mut Ctx<'_>) {
        let Some((index, _)) = self.selected_location() else { return };
        let monitor = self.monitor.index;
        ctx.host.reset_stack_targets(monitor);
        let mut visible = self.columns[index].windows.clone();

        for n in index + 1..self.columns.len() {
            let Some((x, width, parked)) = self.column_span(ctx, n) else { continue };
            if self.overlaps_viewport(x, width, parked) {
                visible.extend_from_slice(&self.columns[n].windows);
            }
            if x + width > self.width() {
                let target = StackTarget { workspace: self.workspace, column: n };
                ctx.host.set_stack_target(monitor, Edge::Right, target);
                break;
            }
        }

        for n in (0..index).rev() {
            let Some((x, width, parked)) = self.column_span(ctx, n) else { continue };
            if self.overlaps_viewport(x, width, parked) {
                visible.extend_from_slice(&self.columns[n].windows);
            }
            if x < 0.0 {
                let target = StackTarget { workspace: self.workspace, column: n };
                ctx.host.set_stack_target(monitor, Edge::Left, target);
                break;
            }
        }

        self.visible = visible;
    }

    /// Viewport x, width and parked state of a column's head window.
    fn column_span(&self, ctx: &Ctx<'_>, column: usize) -> Option<(f64, f64, bool)> {
        let head = *self.columns.get(column)?.windows.first()?;
        let frame = ctx.host.frame(head)?;
        let x = self.placement(head).map_or(0.0, |p| p.x) + self.target_x;
        Some((x, frame.width, ctx.host.flags(head).is_parked()))
    }

    fn overlaps_viewport(&self, x: f64, width: f64, parked: bool) -> bool {
        let margin = self.settings.stack_margin;
        !(x + width < margin || x > self.width() - margin || parked)
    }

    /// Inserts `window` as a new column at `index`, or at `row` of the
    /// existing column `index` when a row is given. Returns false if the
    /// window is already tiled here.
    pub fn add_window(
        &mut self,
        ctx: &mut Ctx<'_>,
        window: WindowId,
        index: usize,
        row: Option<usize>,
    ) -> bool {
        if self.contains(window) {
            return false;
        }
        if self.selected.is_none() {
            self.selected = Some(window);
        }
        match (row, self.columns.get_mut(index)) {
            (Some(row), Some(column)) => {
                let row = row.min(column.windows.len());
                column.windows.insert(row, window);
            }
            _ => {
                let index = index.min(self.columns.len());
                self.columns.insert(index, Column::new(window));
            }
        }
        ctx.host.attach_proxy(window, self.workspace);
        if self.populated {
            self.layout(ctx, true);
        }
        self.signals.push(SpaceSignal::WindowAdded(window));
        true
    }

    /// Removes `window`, pruning its column if it empties. When the window
    /// was selected, the higher-stacked of its immediate neighbours in
    /// column-major order takes over the selection.
    pub fn remove_window(&mut self, ctx: &mut Ctx<'_>, window: WindowId) -> bool {
        let Some((col, row)) = self.locate(window) else { return false };

        let replacement = if self.selected == Some(window) {
            let windows: Vec<WindowId> = self.windows().collect();
            let neighbours: Vec<WindowId> = match windows.iter().position(|w| *w == window) {
                Some(i) => [i.checked_sub(1), Some(i + 1)]
                    .into_iter()
                    .flatten()
                    .filter_map(|j| windows.get(j).copied())
                    .collect(),
                None => Vec::new(),
            };
            ctx.host.sort_by_stacking(&neighbours).last().copied()
        } else {
            self.selected
        };

        self.columns[col].windows.remove(row);
        if self.columns[col].windows.is_empty() {
            self.columns.remove(col);
        }
        self.placements.remove(&window);
        self.visible.retain(|w| *w != window);
        if self.moving == Some(window) {
            self.moving = None;
        }
        if self.selected == Some(window) {
            self.selected = None;
        }
        ctx.host.detach_proxy(window);

        self.layout(ctx, true);
        self.signals.push(SpaceSignal::WindowRemoved(window));
        match replacement {
            Some(next) => {
                viewport::ensure_viewport(self, ctx, next, true);
            }
            None => {
                self.selected = None;
                viewport::collapse_selection(self, ctx);
            }
        }
        true
    }

    /// Exchanges `window` (or the selection) with its neighbour in
    /// `direction`: whole columns horizontally, rows vertically.
    pub fn swap(
        &mut self,
        ctx: &mut Ctx<'_>,
        direction: Direction,
        window: Option<WindowId>,
    ) -> bool {
        let Some(window) = window.or(self.selected) else { return false };
        let Some((col, row)) = self.locate(window) else { return false };
        let Some((target_col, target_row)) = self.neighbour_of(col, row, direction) else {
            trace!(?window, %direction, "swap target out of bounds");
            return false;
        };

        if direction.is_horizontal() {
            self.columns.swap(col, target_col);
        } else {
            self.columns[col].windows.swap(row, target_row);
        }
        ctx.host.raise_proxy(window);

        self.layout(ctx, true);
        self.signals.push(SpaceSignal::Swapped { window, direction });
        if let Some(selected) = self.selected {
            viewport::ensure_viewport(self, ctx, selected, true);
        }
        true
    }

    fn neighbour_of(&self, col: usize, row: usize, direction: Direction) -> Option<(usize, usize)> {
        // Horizontal swaps move whole columns, so only the column must exist.
        match direction {
            Direction::Left => Some((col.checked_sub(1)?, row)),
            Direction::Right => (col + 1 < self.columns.len()).then_some((col + 1, row)),
            Direction::Up => Some((col, row.checked_sub(1)?)),
            Direction::Down => (row + 1 < self.columns[col].windows.len()).then_some((col, row + 1)),
        }
    }

    /// Moves the selection one step through the windows in column-major
    /// order, crossing into the next or previous column when the current one
    /// is exhausted.
    pub fn switch_linear(&mut self, ctx: &mut Ctx<'_>, delta: isize) -> bool {
        let Some(target) = self.linear_target(delta) else { return false };
        viewport::ensure_viewport(self, ctx, target, false);
        true
    }

    fn linear_target(&self, delta: isize) -> Option<WindowId> {
        let step = delta.signum();
        if step == 0 {
            return None;
        }
        let (col, row) = self.selected_location()?;
        let next_row = row.checked_add_signed(step).filter(|r| *r < self.columns[col].windows.len());
        match next_row {
            Some(row) => self.window_at(col, row),
            None => {
                let col = col.checked_add_signed(step)?;
                let column = self.columns.get(col)?;
                let row = if step > 0 { 0 } else { column.windows.len() - 1 };
                self.window_at(col, row)
            }
        }
    }

    /// Moves the selection in `direction`. Horizontal moves land on the most
    /// recently used window of the destination column.
    pub fn switch(&mut self, ctx: &mut Ctx<'_>, direction: Direction) -> bool {
        let Some(target) = self.directional_target(ctx, direction) else {
            trace!(%direction, "no window in direction");
            return false;
        };
        viewport::ensure_viewport(self, ctx, target, false);
        true
    }

    fn directional_target(&self, ctx: &Ctx<'_>, direction: Direction) -> Option<WindowId> {
        let (col, row) = self.selected_location()?;
        let (col, row) = match direction {
            Direction::Left | Direction::Right => {
                let col = col.checked_add_signed(direction.step())?;
                let column = &self.columns.get(col)?.windows;
                let recent = ctx.host.tab_list(Some(self.workspace));
                let row = recent
                    .iter()
                    .find_map(|w| column.iter().position(|c| c == w))
                    .unwrap_or(0);
                (col, row)
            }
            Direction::Up => (col, row.checked_sub(1)?),
            Direction::Down => (col, row + 1),
        };
        self.window_at(col, row)
    }

    /// Pulls the head of the next column into the bottom of the selected
    /// column.
    pub fn slurp(&mut self, ctx: &mut Ctx<'_>) -> bool {
        let Some((col, _)) = self.selected_location() else { return false };
        let Some(next) = self.columns.get_mut(col + 1) else { return false };
        let window = next.windows.remove(0);
        if next.windows.is_empty() {
            self.columns.remove(col + 1);
        }
        self.columns[col].windows.push(window);
        self.layout(ctx, true);
        if let Some(selected) = self.selected {
            viewport::ensure_viewport(self, ctx, selected, true);
        }
        true
    }

    /// Expels the bottom window of the selected column into a new column to
    /// its right.
    pub fn barf(&mut self, ctx: &mut Ctx<'_>) -> bool {
        let Some((col, _)) = self.selected_location() else { return false };
        if self.columns[col].windows.len() < 2 {
            return false;
        }
        let Some(window) = self.columns[col].windows.pop() else { return false };
        self.columns.insert(col + 1, Column::new(window));
        self.layout(ctx, true);
        if let Some(selected) = self.selected {
            viewport::ensure_viewport(self, ctx, selected, true);
        }
        true
    }

    /// Points the space at a (possibly different) monitor and resets any
    /// preview transform.
    pub fn set_monitor(&mut self, ctx: &mut Ctx<'_>, monitor: Monitor, animate: bool) {
        self.monitor = monitor;
        let duration = self.animation_duration(animate);
        ctx.host.animate(
            AnimTarget::SpaceActor(self.workspace),
            AnimProps::at(0.0, 0.0).scale(1.0),
            duration,
            None,
        );
        ctx.host.set_props(AnimTarget::SpaceClip(self.workspace), AnimProps::rect(monitor.frame));
        self.signals.push(SpaceSignal::MonitorChanged(monitor.index));
    }

    pub fn set_appearance(&mut self, ctx: &mut Ctx<'_>, appearance: SpaceAppearance) {
        if self.appearance == appearance {
            return;
        }
        ctx.host.set_space_appearance(self.workspace, &appearance);
        self.appearance = appearance;
    }

    pub fn draw_tree(&self) -> String {
        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let rows = column
                    .windows
                    .iter()
                    .map(|w| {
                        let mark = if Some(*w) == self.selected { " *" } else { "" };
                        format!("{}{mark}", w.0)
                    })
                    .collect();
                Tree::Node(format!("column {i}"), vec![Tree::Leaf(rows)])
            })
            .collect();
        let root = Tree::Node(
            format!("{} (target_x {})", self.appearance_label(), self.target_x),
            columns,
        );
        let mut out = String::new();
        let _ = ascii_tree::write_tree(&mut out, &root);
        out
    }

    fn appearance_label(&self) -> String {
        if self.appearance.name.is_empty() {
            format!("workspace {}", self.workspace.0)
        } else {
            self.appearance.name.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout_engine::Modes;
    use crate::sys::sim::SimHost;

    fn wid(n: u64) -> WindowId { WindowId(n) }

    fn ws() -> WorkspaceId { WorkspaceId(1) }

    fn columns(space: &Space) -> Vec<Vec<u64>> {
        space.columns().map(|c| c.iter().map(|w| w.0).collect()).collect()
    }

    fn populated_space(host: &mut SimHost, layout: &[&[u64]]) -> Space {
        let mut space = Space::new(ws(), host.monitor(0), Settings::default());
        let mut ctx = Ctx::new(host, Modes::default());
        for (col, windows) in layout.iter().enumerate() {
            for (row, id) in windows.iter().enumerate() {
                let row = (row > 0).then_some(row);
                assert!(space.add_window(&mut ctx, wid(*id), col, row));
            }
        }
        space.mark_populated();
        space.layout(&mut ctx, false);
        space
    }

    fn host_with(windows: &[(u64, f64)]) -> SimHost {
        let mut host = SimHost::new(1920.0, 1080.0);
        for (id, width) in windows {
            host.add_window(wid(*id), ws(), Rect::new(0.0, 0.0, *width, 600.0));
        }
        host
    }

    #[test]
    fn first_window_becomes_selected_in_empty_space() {
        let mut host = host_with(&[(4, 800.0)]);
        let mut space = Space::new(ws(), host.monitor(0), Settings::default());
        space.mark_populated();
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert!(space.add_window(&mut ctx, wid(4), 0, None));
        assert_eq!(space.selected(), Some(wid(4)));
        assert_eq!(columns(&space), vec![vec![4]]);
    }

    #[test]
    fn adding_a_window_twice_is_rejected() {
        let mut host = host_with(&[(1, 800.0), (2, 800.0)]);
        let mut space = populated_space(&mut host, &[&[1], &[2]]);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert!(!space.add_window(&mut ctx, wid(1), 1, Some(0)));
        assert_eq!(columns(&space), vec![vec![1], vec![2]]);
    }

    #[test]
    fn row_insert_into_existing_column() {
        let mut host = host_with(&[(1, 800.0), (2, 800.0), (3, 800.0)]);
        let mut space = populated_space(&mut host, &[&[1], &[2]]);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert!(space.add_window(&mut ctx, wid(3), 1, Some(0)));
        assert_eq!(columns(&space), vec![vec![1], vec![3, 2]]);
        // Out of range column with a row still creates a column.
        let mut host = host_with(&[(1, 800.0), (5, 800.0)]);
        let mut space = populated_space(&mut host, &[&[1]]);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert!(space.add_window(&mut ctx, wid(5), 7, Some(2)));
        assert_eq!(columns(&space), vec![vec![1], vec![5]]);
    }

    #[test]
    fn layout_places_columns_left_to_right_and_splits_rows() {
        let mut host = host_with(&[(1, 800.0), (2, 600.0), (3, 500.0)]);
        host.set_panel_height(30.0);
        let space = populated_space(&mut host, &[&[1], &[2, 3]]);
        let gap = space.settings().window_gap;
        let top = 30.0 + space.settings().vertical_margin;

        assert_eq!(space.placement(wid(1)), Some(Placement { x: 0.0, y: top }));
        assert_eq!(space.placement(wid(2)).map(|p| p.x), Some(800.0 + gap));

        let row_height = ((1080.0 - top - gap) / 2.0_f64).round();
        let f2 = host.frame_of(wid(2));
        let f3 = host.frame_of(wid(3));
        assert_eq!(f2.height, row_height);
        assert_eq!(f3.height, row_height);
        // Column width follows the widest member.
        assert_eq!(f3.width, 600.0);
        assert_eq!(space.placement(wid(3)).map(|p| p.y), Some(top + row_height + gap));
    }

    #[test]
    fn layout_column_width_follows_selected_member() {
        let mut host = host_with(&[(1, 500.0), (2, 900.0)]);
        let mut space = populated_space(&mut host, &[&[1, 2]]);
        space.set_selected(Some(wid(1)));
        let mut ctx = Ctx::new(&mut host, Modes::default());
        space.layout(&mut ctx, false);
        assert_eq!(host.frame_of(wid(2)).width, 500.0);
    }

    #[test]
    fn narrow_content_is_centered() {
        let mut host = host_with(&[(1, 800.0)]);
        let space = populated_space(&mut host, &[&[1]]);
        let content = 800.0 + space.settings().window_gap;
        assert_eq!(space.target_x(), ((1920.0 - content) / 2.0_f64).round());
    }

    #[test]
    fn layout_terminates_when_host_keeps_clamping() {
        let mut host = host_with(&[(1, 2400.0), (2, 700.0)]);
        host.set_width_clamp(wid(1), 1.0);
        host.set_width_clamp(wid(2), 1.0);
        let space = populated_space(&mut host, &[&[1], &[2]]);
        assert_eq!(space.column_count(), 2);
        for id in [1, 2] {
            let width = host.frame_of(wid(id)).width;
            assert!(width <= space.width(), "expected width <= {}, got {}", space.width(), width);
        }
    }

    #[test]
    fn removing_last_window_of_column_prunes_it() {
        let mut host = host_with(&[(1, 800.0), (2, 800.0), (3, 800.0)]);
        let mut space = populated_space(&mut host, &[&[1], &[2, 3]]);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert!(space.remove_window(&mut ctx, wid(1)));
        assert_eq!(columns(&space), vec![vec![2, 3]]);
        assert!(!space.remove_window(&mut ctx, wid(1)));
        assert!(space.remove_window(&mut ctx, wid(2)));
        assert!(space.remove_window(&mut ctx, wid(3)));
        assert!(space.is_empty());
        assert_eq!(space.selected(), None);
        assert_eq!(space.selection().width, 0.0);
    }

    #[test]
    fn removing_selected_window_prefers_higher_stacked_neighbour() {
        let mut host = host_with(&[(1, 800.0), (2, 800.0), (3, 800.0)]);
        let mut space = populated_space(&mut host, &[&[1], &[2, 3]]);
        space.set_selected(Some(wid(2)));

        host.raise_window(wid(1));
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert!(space.remove_window(&mut ctx, wid(2)));
        assert_eq!(columns(&space), vec![vec![1], vec![3]]);
        assert_eq!(space.selected(), Some(wid(1)));

        let mut host = host_with(&[(1, 800.0), (2, 800.0), (3, 800.0)]);
        let mut space = populated_space(&mut host, &[&[1], &[2, 3]]);
        space.set_selected(Some(wid(2)));
        host.raise_window(wid(3));
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert!(space.remove_window(&mut ctx, wid(2)));
        assert_eq!(space.selected(), Some(wid(3)));
    }

    #[test]
    fn removing_unselected_window_keeps_selection() {
        let mut host = host_with(&[(1, 800.0), (2, 800.0)]);
        let mut space = populated_space(&mut host, &[&[1], &[2]]);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert!(space.remove_window(&mut ctx, wid(2)));
        assert_eq!(space.selected(), Some(wid(1)));
    }

    #[test]
    fn horizontal_swap_exchanges_whole_columns() {
        let mut host = host_with(&[(1, 800.0), (2, 800.0), (3, 800.0)]);
        let mut space = populated_space(&mut host, &[&[1], &[2, 3]]);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert!(space.swap(&mut ctx, Direction::Right, Some(wid(1))));
        assert_eq!(columns(&space), vec![vec![2, 3], vec![1]]);
        assert_eq!(space.index_of(wid(1)), Some(1));
    }

    #[test]
    fn lower_row_swaps_column_with_shorter_neighbour() {
        let mut host = host_with(&[(1, 800.0), (2, 800.0), (3, 800.0)]);
        let mut space = populated_space(&mut host, &[&[1], &[2, 3]]);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert!(space.swap(&mut ctx, Direction::Left, Some(wid(3))));
        assert_eq!(columns(&space), vec![vec![2, 3], vec![1]]);
        assert!(!space.swap(&mut ctx, Direction::Left, Some(wid(3))));
    }

    #[test]
    fn vertical_swap_exchanges_rows_and_bounds_are_checked() {
        let mut host = host_with(&[(1, 800.0), (2, 800.0), (3, 800.0)]);
        let mut space = populated_space(&mut host, &[&[1], &[2, 3]]);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert!(space.swap(&mut ctx, Direction::Down, Some(wid(2))));
        assert_eq!(columns(&space), vec![vec![1], vec![3, 2]]);
        assert!(!space.swap(&mut ctx, Direction::Down, Some(wid(2))));
        assert!(!space.swap(&mut ctx, Direction::Left, Some(wid(1))));
        assert!(!space.swap(&mut ctx, Direction::Up, Some(wid(1))));
        assert_eq!(columns(&space), vec![vec![1], vec![3, 2]]);
    }

    #[test]
    fn switch_linear_walks_rows_then_columns() {
        let mut host = host_with(&[(1, 600.0), (2, 600.0), (3, 600.0)]);
        let mut space = populated_space(&mut host, &[&[1], &[2, 3]]);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert!(space.switch_linear(&mut ctx, 1));
        assert_eq!(space.selected(), Some(wid(2)));
        assert!(space.switch_linear(&mut ctx, 1));
        assert_eq!(space.selected(), Some(wid(3)));
        assert!(!space.switch_linear(&mut ctx, 1));
        assert_eq!(space.selected(), Some(wid(3)));
        assert!(space.switch_linear(&mut ctx, -1));
        assert!(space.switch_linear(&mut ctx, -1));
        assert_eq!(space.selected(), Some(wid(1)));
        assert!(!space.switch_linear(&mut ctx, -1));
    }

    #[test]
    fn switch_right_picks_most_recent_window_of_column() {
        let mut host = host_with(&[(1, 600.0), (2, 600.0), (3, 600.0)]);
        let mut space = populated_space(&mut host, &[&[1], &[2, 3]]);
        host.focus(wid(3));
        host.focus(wid(1));
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert!(space.switch(&mut ctx, Direction::Right));
        assert_eq!(space.selected(), Some(wid(3)));
        assert!(space.switch(&mut ctx, Direction::Up));
        assert_eq!(space.selected(), Some(wid(2)));
        assert!(!space.switch(&mut ctx, Direction::Up));
        assert!(!space.switch(&mut ctx, Direction::Right));
        assert!(space.switch(&mut ctx, Direction::Left));
        assert_eq!(space.selected(), Some(wid(1)));
    }

    #[test]
    fn fix_visible_registers_stack_targets_beyond_edges() {
        let windows: Vec<(u64, f64)> = (1..=5).map(|i| (i, 800.0)).collect();
        let mut host = host_with(&windows);
        let mut space = populated_space(&mut host, &[&[1], &[2], &[3], &[4], &[5]]);
        // Scroll so that column 2 sits at the left of the viewport.
        let x2 = space.placement(wid(3)).map_or(0.0, |p| p.x);
        space.set_target_x(-x2 + 400.0);
        space.set_selected(Some(wid(3)));
        let mut ctx = Ctx::new(&mut host, Modes::default());
        space.fix_visible(&mut ctx);

        let right = host.stack_target(0, Edge::Right).map(|t| t.column);
        let left = host.stack_target(0, Edge::Left).map(|t| t.column);
        assert_eq!(right, Some(3));
        assert_eq!(left, Some(1));
        assert!(space.visible().contains(&wid(3)));
        assert!(space.visible().contains(&wid(4)));
        assert!(space.visible().contains(&wid(2)));
        assert!(!space.visible().contains(&wid(5)));
    }

    #[test]
    fn slurp_and_barf_move_windows_between_columns() {
        let mut host = host_with(&[(1, 600.0), (2, 600.0), (3, 600.0)]);
        let mut space = populated_space(&mut host, &[&[1], &[2], &[3]]);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        assert!(space.slurp(&mut ctx));
        assert_eq!(columns(&space), vec![vec![1, 2], vec![3]]);
        assert!(space.barf(&mut ctx));
        assert_eq!(columns(&space), vec![vec![1], vec![2], vec![3]]);
        assert!(!space.barf(&mut ctx));
    }

    #[test]
    fn draw_tree_marks_selection() {
        let mut host = host_with(&[(1, 600.0), (2, 600.0)]);
        let space = populated_space(&mut host, &[&[1, 2]]);
        let tree = space.draw_tree();
        assert!(tree.contains("column 0"), "got {tree}");
        assert!(tree.contains("1 *"), "got {tree}");
    }
}
