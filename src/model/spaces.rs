//! All spaces, one per desktop, plus the structures that relate them: which
//! space each monitor shows, the stack of hidden spaces, and the preview
//! deck used while paging through spaces.

use slotmap::{SlotMap, new_key_type};
use tracing::{debug, info, instrument, trace};

use crate::actor::broadcast::BroadcastEvent;
use crate::common::collections::{BTreeMap, HashMap};
use crate::common::config::Settings;
use crate::layout_engine::scratch::ScratchLayer;
use crate::layout_engine::{Ctx, Direction, Space, SpaceSignal, insertion, viewport};
use crate::model::monitor::{self, Monitor};
use crate::model::saved::{SavedLayout, SavedSpace};
use crate::model::window::{WindowFlags, WindowId, WorkspaceId};
use crate::sys::Platform;
use crate::sys::compositor::{AnimProps, AnimTarget, Completion, SpaceAppearance, SwitchContinuation};
use crate::sys::geometry::Point;

new_key_type! {
    pub struct SpaceKey;
}

/// Deck offsets as a share of the space height: the entry just above the
/// cursor, the cursor, the entry just below it, and everything further
/// below.
const PREVIEW_HEIGHTS: [f64; 4] = [0.95, 0.10, 0.035, 0.01];
const PREVIEW_SCALE: f64 = 0.9;
/// Resting offset of a hidden space actor.
const HIDDEN_HEIGHT: f64 = 0.1;

#[derive(Clone, Debug)]
struct Preview {
    deck: Vec<WorkspaceId>,
    cursor: usize,
}

#[derive(Debug)]
pub struct SpacesRegistry {
    spaces: SlotMap<SpaceKey, Space>,
    by_workspace: HashMap<WorkspaceId, SpaceKey>,
    monitors: Vec<Monitor>,
    /// Monitor index to the space it shows.
    assignments: BTreeMap<usize, WorkspaceId>,
    /// Spaces not shown on any monitor, most recent first.
    stack: Vec<WorkspaceId>,
    selected_space: Option<WorkspaceId>,
    preview: Option<Preview>,
    switch_generation: u64,
    continuation: Option<(u64, SwitchContinuation)>,
    settings: Settings,
    notifications: Vec<BroadcastEvent>,
}

impl SpacesRegistry {
    /// Builds a space for every desktop the host reports and assigns them to
    /// monitors. `saved` restores column order from an earlier teardown.
    pub fn new(
        ctx: &mut Ctx<'_>,
        settings: Settings,
        scratch: &mut ScratchLayer,
        saved: Option<&SavedLayout>,
    ) -> Self {
        let mut registry = Self {
            spaces: SlotMap::with_key(),
            by_workspace: HashMap::default(),
            monitors: Vec::new(),
            assignments: BTreeMap::new(),
            stack: Vec::new(),
            selected_space: None,
            preview: None,
            switch_generation: 0,
            continuation: None,
            settings,
            notifications: Vec::new(),
        };
        for workspace in ctx.host.workspaces() {
            registry.add_space(ctx, workspace, scratch, saved);
        }
        registry.monitors_changed(ctx);
        registry.selected_space = registry.mru(&*ctx.host).first().copied();
        info!(spaces = registry.len(), monitors = registry.monitors.len(), "spaces ready");
        registry
    }

    pub fn len(&self) -> usize { self.spaces.len() }

    pub fn is_empty(&self) -> bool { self.spaces.is_empty() }

    pub fn contains(&self, workspace: WorkspaceId) -> bool {
        self.by_workspace.contains_key(&workspace)
    }

    pub fn get(&self, workspace: WorkspaceId) -> Option<&Space> {
        self.by_workspace.get(&workspace).and_then(|key| self.spaces.get(*key))
    }

    pub fn get_mut(&mut self, workspace: WorkspaceId) -> Option<&mut Space> {
        self.by_workspace.get(&workspace).and_then(|key| self.spaces.get_mut(*key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Space> + '_ { self.spaces.values() }

    pub fn workspaces(&self) -> impl Iterator<Item = WorkspaceId> + '_ {
        self.spaces.values().map(|s| s.workspace())
    }

    /// Space whose columns hold `window`.
    pub fn find_window(&self, window: WindowId) -> Option<WorkspaceId> {
        self.spaces.values().find(|s| s.contains(window)).map(|s| s.workspace())
    }

    pub fn monitors(&self) -> &[Monitor] { &self.monitors }

    pub fn monitor_space(&self, monitor: usize) -> Option<WorkspaceId> {
        self.assignments.get(&monitor).copied()
    }

    pub fn assignments(&self) -> impl Iterator<Item = (usize, WorkspaceId)> + '_ {
        self.assignments.iter().map(|(m, ws)| (*m, *ws))
    }

    /// Shown on some monitor.
    pub fn is_visible(&self, workspace: WorkspaceId) -> bool {
        self.assignments.values().any(|ws| *ws == workspace)
    }

    pub fn stack(&self) -> &[WorkspaceId] { &self.stack }

    pub fn selected_space(&self) -> Option<WorkspaceId> { self.selected_space }

    pub fn settings(&self) -> &Settings { &self.settings }

    pub fn in_preview(&self) -> bool { self.preview.is_some() }

    pub fn preview_cursor(&self) -> Option<WorkspaceId> {
        self.preview.as_ref().and_then(|p| p.deck.get(p.cursor).copied())
    }

    pub fn take_notifications(&mut self) -> Vec<BroadcastEvent> {
        std::mem::take(&mut self.notifications)
    }

    pub fn take_signals(&mut self) -> Vec<(WorkspaceId, SpaceSignal)> {
        self.spaces
            .values_mut()
            .flat_map(|space| {
                let workspace = space.workspace();
                space.take_signals().into_iter().map(move |signal| (workspace, signal))
            })
            .collect()
    }

    pub fn add_space(
        &mut self,
        ctx: &mut Ctx<'_>,
        workspace: WorkspaceId,
        scratch: &mut ScratchLayer,
        saved: Option<&SavedLayout>,
    ) {
        if self.contains(workspace) {
            return;
        }
        let remembered = saved.and_then(|s| s.space(workspace));
        let monitors = ctx.host.monitors();
        let monitor = remembered
            .and_then(|s| s.monitor)
            .and_then(|index| monitors.get(index).copied())
            .unwrap_or_else(|| monitor::primary(&*ctx.host));

        let mut space = Space::new(workspace, monitor, self.settings.clone());
        if let Some(remembered) = remembered {
            space.set_target_x(remembered.target_x);
        }
        ctx.host.set_props(AnimTarget::SpaceClip(workspace), AnimProps::rect(monitor.frame));
        let key = self.spaces.insert(space);
        self.by_workspace.insert(workspace, key);
        self.refresh_appearance(ctx, workspace);

        let space = &mut self.spaces[key];
        insertion::add_all(space, ctx, scratch, saved);
        space.mark_populated();
        space.layout(ctx, false);
        debug!(?workspace, windows = space.windows().count(), "added space");
    }

    pub fn remove_space(&mut self, ctx: &mut Ctx<'_>, workspace: WorkspaceId) -> Option<Space> {
        let key = self.by_workspace.remove(&workspace)?;
        let space = self.spaces.remove(key)?;
        for window in space.windows() {
            ctx.host.detach_proxy(window);
        }
        ctx.host.set_visible(AnimTarget::SpaceActor(workspace), false);
        self.stack.retain(|ws| *ws != workspace);
        self.assignments.retain(|_, ws| *ws != workspace);
        if self.selected_space == Some(workspace) {
            self.selected_space = None;
        }
        debug!(?workspace, "removed space");
        Some(space)
    }

    /// Re-reads the stored name, color and background of `workspace`.
    /// Unset names fall back to the host's persisted or default name, unset
    /// colors to the configured palette.
    pub fn refresh_appearance(&mut self, ctx: &mut Ctx<'_>, workspace: WorkspaceId) {
        let Some(index) = ctx.host.workspace_index(workspace) else { return };
        let stored = ctx.host.workspace_settings(workspace);
        let name = if stored.name.is_empty() {
            ctx.host
                .workspace_names()
                .get(index)
                .filter(|n| !n.is_empty())
                .cloned()
                .unwrap_or_else(|| ctx.host.default_workspace_name(index))
        } else {
            stored.name
        };
        let color = if stored.color.is_empty() {
            self.settings.workspace_color(index).unwrap_or_default().to_owned()
        } else {
            stored.color
        };
        let background = (!stored.background.is_empty()).then_some(stored.background);

        let Some(space) = self.get_mut(workspace) else { return };
        space.set_appearance(ctx, SpaceAppearance { name: name.clone(), color, background });
        self.notifications.push(BroadcastEvent::WorkspaceLabelChanged { workspace, name });
    }

    /// Desktops ordered by recent use: the active one, then one entry per
    /// desktop in window activation order, then the rest in index order.
    pub fn mru(&self, host: &dyn Platform) -> Vec<WorkspaceId> {
        let candidates = std::iter::once(host.active_workspace())
            .chain(host.tab_list(None).into_iter().filter_map(|w| host.workspace_of(w)))
            .chain(host.workspaces());
        let mut out = Vec::with_capacity(self.len());
        for workspace in candidates {
            if self.contains(workspace) && !out.contains(&workspace) {
                out.push(workspace);
            }
        }
        out
    }

    /// Recomputes which space each monitor shows after a topology change.
    ///
    /// Pairings survive when the monitor at the same index kept its exact
    /// geometry. Free monitors take spaces from the MRU head, and spaces
    /// whose monitor vanished move to the monitor at the same index, or the
    /// primary one.
    #[instrument(skip_all)]
    pub fn monitors_changed(&mut self, ctx: &mut Ctx<'_>) {
        let previous: Vec<(Monitor, WorkspaceId)> = self
            .assignments
            .iter()
            .filter_map(|(index, ws)| self.monitors.get(*index).map(|m| (*m, *ws)))
            .collect();
        self.assignments.clear();
        self.monitors = ctx.host.monitors();

        let active = ctx.host.active_workspace();
        if let Some(space) = self.get(active) {
            for window in space.windows() {
                ctx.host.set_visible(AnimTarget::Surface(window), false);
                ctx.host.set_visible(AnimTarget::Proxy(window), true);
            }
        }

        let primary = monitor::primary(&*ctx.host);
        let mut mru = self.mru(&*ctx.host);

        if self.settings.workspaces_only_on_primary {
            let workspaces: Vec<WorkspaceId> = self.workspaces().collect();
            for workspace in workspaces {
                if let Some(space) = self.get_mut(workspace) {
                    space.set_monitor(ctx, primary, false);
                }
            }
            if let Some(first) = mru.first() {
                self.assignments.insert(primary.index, *first);
            }
            ctx.host.recreate_affordances(&[primary]);
            self.finish_monitors_changed(ctx);
            return;
        }

        let monitors = self.monitors.clone();
        ctx.host.recreate_affordances(&monitors);
        for monitor in &monitors {
            ctx.host.set_affordance_active(monitor.index, true);
        }

        for (old, workspace) in previous {
            let Some(current) = monitors.get(old.index) else { continue };
            if !current.same_output(&old)
                || !self.contains(workspace)
                || self.assignments.contains_key(&current.index)
            {
                continue;
            }
            trace!(monitor = current.index, ?workspace, "kept monitor pairing");
            self.assign_monitor(ctx, *current, workspace);
            mru.retain(|ws| *ws != workspace);
        }

        for monitor in &monitors {
            if self.assignments.contains_key(&monitor.index) {
                continue;
            }
            if mru.is_empty() {
                break;
            }
            let workspace = mru.remove(0);
            self.assign_monitor(ctx, *monitor, workspace);
        }

        for workspace in mru {
            let Some(space) = self.get_mut(workspace) else { continue };
            if monitors.contains(space.monitor()) {
                continue;
            }
            let fallback = monitors.get(space.monitor().index).copied().unwrap_or(primary);
            debug!(?workspace, monitor = fallback.index, "space lost its monitor");
            space.set_monitor(ctx, fallback, false);
        }

        self.finish_monitors_changed(ctx);
    }

    fn assign_monitor(&mut self, ctx: &mut Ctx<'_>, monitor: Monitor, workspace: WorkspaceId) {
        self.assignments.insert(monitor.index, workspace);
        if let Some(space) = self.get_mut(workspace) {
            space.set_monitor(ctx, monitor, false);
        }
    }

    fn finish_monitors_changed(&mut self, ctx: &mut Ctx<'_>) {
        // The active space always shows on its own monitor. Whatever it
        // displaces takes the monitor it came from.
        let active = ctx.host.active_workspace();
        if let Some(index) = self.get(active).map(|s| s.monitor().index) {
            let came_from = self
                .assignments
                .iter()
                .find(|(m, ws)| **ws == active && **m != index)
                .map(|(m, _)| *m);
            let displaced = self.assignments.insert(index, active);
            if let Some(came_from) = came_from {
                match (displaced, self.monitors.get(came_from).copied()) {
                    (Some(other), Some(monitor)) if other != active => {
                        self.assign_monitor(ctx, monitor, other);
                    }
                    _ => {
                        self.assignments.remove(&came_from);
                    }
                }
            }
        }

        let visible: Vec<WorkspaceId> = self.assignments.values().copied().collect();
        for workspace in &visible {
            ctx.host.set_visible(AnimTarget::SpaceActor(*workspace), true);
            ctx.host.raise_space(*workspace);
        }
        self.stack = self.mru(&*ctx.host).into_iter().filter(|ws| !visible.contains(ws)).collect();

        let workspaces: Vec<WorkspaceId> = self.workspaces().collect();
        for workspace in workspaces {
            let Some(space) = self.get_mut(workspace) else { continue };
            space.layout(ctx, false);
            if let Some(selected) = space.selected() {
                viewport::ensure_viewport(space, ctx, selected, true);
            }
        }
    }

    /// The host switched desktops. A switch between spaces sharing a
    /// monitor is a pure animation; otherwise the indicator follows the
    /// destination monitor and the pointer is brought onto it.
    #[instrument(skip(self, ctx))]
    pub fn switch_workspace(&mut self, ctx: &mut Ctx<'_>, from: WorkspaceId, to: WorkspaceId) {
        let Some(to_monitor) = self.get(to).map(|s| *s.monitor()) else {
            debug!("switch to unknown workspace");
            return;
        };
        self.stack.retain(|ws| *ws != to);
        self.assignments.insert(to_monitor.index, to);
        let from_monitor = self.get(from).map(|s| s.monitor().index);

        self.animate_to_space(ctx, to, Some(from), None);
        if from == to {
            return;
        }

        if from_monitor == Some(to_monitor.index) {
            self.stack.retain(|ws| *ws != from);
            self.stack.insert(0, from);
            return;
        }

        self.notifications.push(BroadcastEvent::IndicatorMonitorChanged { monitor: to_monitor.index });
        ctx.host.set_affordance_active(to_monitor.index, false);

        let frame = to_monitor.frame;
        let pointer = ctx.host.pointer();
        let (x, y) = (pointer.x - frame.x, pointer.y - frame.y);
        if x < 0.0 || x > frame.width || y < 0.0 || y > frame.height {
            let center = Point::new(
                frame.x + (frame.width / 2.0).floor(),
                frame.y + (frame.height / 2.0).floor(),
            );
            debug!(?center, "warping pointer onto destination monitor");
            ctx.host.warp_pointer(center);
        }

        for monitor in self.monitors.iter().filter(|m| m.index != to_monitor.index) {
            ctx.host.set_affordance_active(monitor.index, true);
        }
    }

    /// Moves the preview cursor one step through the deck, opening the deck
    /// first if needed. Returns false when the cursor is already at the end
    /// in that direction.
    #[instrument(skip(self, ctx))]
    pub fn select_space(&mut self, ctx: &mut Ctx<'_>, direction: Direction) -> bool {
        if self.preview.is_none() {
            self.open_preview(ctx);
        }
        ctx.modes.navigating = true;
        let Some(preview) = self.preview.as_mut() else { return false };
        let Some(to) = preview
            .cursor
            .checked_add_signed(direction.step())
            .filter(|to| *to < preview.deck.len())
        else {
            trace!(cursor = preview.cursor, "preview cursor at end of deck");
            return false;
        };
        preview.cursor = to;
        let deck = preview.deck.clone();
        self.notifications.push(BroadcastEvent::PreviewCursorMoved { workspace: deck[to] });

        let duration = self.settings.animation_duration();
        for (i, workspace) in deck.iter().enumerate() {
            let Some(space) = self.get(*workspace) else { continue };
            let y = preview_height(i, to) * space.height();
            let scale = PREVIEW_SCALE + (to as f64 - i as f64) * 0.01;
            ctx.host.animate(
                AnimTarget::SpaceActor(*workspace),
                AnimProps::y(y).scale(scale),
                duration,
                None,
            );
        }
        true
    }

    fn open_preview(&mut self, ctx: &mut Ctx<'_>) {
        let active = ctx.host.active_workspace();
        let Some(monitor) = self.get(active).map(|s| *s.monitor()) else { return };
        let mut deck = vec![active];
        deck.extend(self.stack.iter().copied().filter(|ws| *ws != active && self.contains(*ws)));

        for (i, workspace) in deck.iter().enumerate() {
            let Some(space) = self.get(*workspace) else { continue };
            ctx.host.set_props(AnimTarget::SpaceClip(*workspace), AnimProps::rect(monitor.frame));
            let h = if i == 0 { 0.0 } else { PREVIEW_HEIGHTS[i.min(PREVIEW_HEIGHTS.len() - 1)] };
            let scale = PREVIEW_SCALE + (1.0 - i as f64) * 0.01;
            let actor = AnimTarget::SpaceActor(*workspace);
            if i > 0 {
                ctx.host.cancel_animations(actor);
                ctx.host.stack_space_below(*workspace, deck[i - 1]);
                ctx.host.set_visible(actor, true);
            }
            ctx.host.set_props(actor, AnimProps::at(0.0, space.height() * h).scale(scale));
        }
        ctx.host.set_props(AnimTarget::SpaceActor(active), AnimProps::default().scale(1.0));
        debug!(deck = deck.len(), "opened space preview");
        self.selected_space = Some(active);
        self.preview = Some(Preview { deck, cursor: 0 });
    }

    /// Commits the preview to the space under the cursor.
    pub fn end_preview(&mut self, ctx: &mut Ctx<'_>) -> bool {
        let Some(preview) = self.preview.take() else { return false };
        ctx.modes.navigating = false;
        let active = ctx.host.active_workspace();
        let to = preview.deck.get(preview.cursor).copied().unwrap_or(active);
        if to == active {
            self.animate_to_space(ctx, to, None, None);
        } else {
            ctx.host.activate_workspace(to);
            self.switch_workspace(ctx, active, to);
        }
        true
    }

    /// Closes the preview and slides back to the active space.
    pub fn cancel_preview(&mut self, ctx: &mut Ctx<'_>) -> bool {
        if self.preview.take().is_none() {
            return false;
        }
        ctx.modes.navigating = false;
        let active = ctx.host.active_workspace();
        self.animate_to_space(ctx, active, None, None);
        true
    }

    /// Slides `to` into place and every other rendered, unshown space out
    /// below the screen. `continuation` runs once `to` has settled.
    pub fn animate_to_space(
        &mut self,
        ctx: &mut Ctx<'_>,
        to: WorkspaceId,
        from: Option<WorkspaceId>,
        continuation: Option<SwitchContinuation>,
    ) {
        self.preview = None;
        ctx.modes.navigating = false;
        self.selected_space = Some(to);
        self.switch_generation = self.switch_generation.wrapping_add(1);
        let generation = self.switch_generation;
        self.continuation = continuation.map(|c| (generation, c));
        let index = ctx.host.workspace_index(to);
        self.notifications.push(BroadcastEvent::ActiveSpaceChanged { workspace: to, index });

        let duration = self.settings.animation_duration();
        let screen_height = ctx.host.screen_size().height;

        ctx.host.set_visible(AnimTarget::SpaceActor(to), true);
        if let Some(space) = self.get_mut(to) {
            ctx.host.set_props(AnimTarget::SpaceClip(to), AnimProps::rect(space.monitor().frame));
            if let Some(selected) = space.selected() {
                viewport::ensure_viewport(space, ctx, selected, true);
            }
        }
        if let Some(from) = from.filter(|f| *f != to)
            && let Some(space) = self.get(from)
        {
            viewport::start_animate(space, ctx, None);
        }

        ctx.host.animate(
            AnimTarget::SpaceActor(to),
            AnimProps::at(0.0, 0.0).scale(1.0),
            duration,
            Some(Completion::SpaceShown { workspace: to, generation }),
        );

        let hidden: Vec<WorkspaceId> = self
            .workspaces()
            .filter(|ws| {
                *ws != to
                    && !self.is_visible(*ws)
                    && ctx.host.is_visible(AnimTarget::SpaceActor(*ws))
            })
            .collect();
        for workspace in hidden {
            ctx.host.animate(
                AnimTarget::SpaceActor(workspace),
                AnimProps::at(0.0, screen_height).scale(PREVIEW_SCALE),
                duration,
                Some(Completion::SpaceHidden { workspace, generation }),
            );
        }
    }

    /// The destination of the latest switch settled. Returns the
    /// continuation attached to that switch, if any.
    pub fn space_shown(
        &mut self,
        ctx: &mut Ctx<'_>,
        workspace: WorkspaceId,
        generation: u64,
    ) -> Option<SwitchContinuation> {
        if generation != self.switch_generation {
            trace!(?workspace, generation, "stale space-shown completion");
            return None;
        }
        ctx.host.set_unredirect_enabled(true);
        ctx.host.raise_space(workspace);
        match self.continuation.take() {
            Some((g, continuation)) if g == generation => Some(continuation),
            other => {
                self.continuation = other;
                None
            }
        }
    }

    pub fn space_hidden(&mut self, ctx: &mut Ctx<'_>, workspace: WorkspaceId, generation: u64) {
        if generation != self.switch_generation
            || self.is_visible(workspace)
            || self.selected_space == Some(workspace)
        {
            return;
        }
        let height = ctx.host.screen_size().height;
        let actor = AnimTarget::SpaceActor(workspace);
        ctx.host.set_props(actor, AnimProps::at(0.0, height * HIDDEN_HEIGHT));
        ctx.host.set_visible(actor, false);
    }

    /// Creates spaces for new desktops and drops those of removed ones.
    pub fn workspaces_changed(&mut self, ctx: &mut Ctx<'_>, scratch: &mut ScratchLayer) {
        let current = ctx.host.workspaces();
        for workspace in &current {
            if !self.contains(*workspace) {
                self.add_space(ctx, *workspace, scratch, None);
                self.stack.push(*workspace);
            }
        }

        let removed: Vec<WorkspaceId> =
            self.workspaces().filter(|ws| !current.contains(ws)).collect();
        if removed.is_empty() {
            return;
        }
        for workspace in removed {
            self.remove_space(ctx, workspace);
        }
        for monitor in self.monitors.clone() {
            if self.assignments.contains_key(&monitor.index) || self.stack.is_empty() {
                continue;
            }
            let workspace = self.stack.remove(0);
            self.assign_monitor(ctx, monitor, workspace);
        }
    }

    /// Keeps persisted names attached to the desktops that remain. The
    /// removed desktop's name moves to the end rather than being lost.
    pub fn workspace_removed(&mut self, ctx: &mut Ctx<'_>, index: usize) {
        let mut names = ctx.host.workspace_names();
        if index >= names.len() {
            return;
        }
        let name = names.remove(index);
        names.push(name);
        ctx.host.set_workspace_names(names);
    }

    pub fn update_settings(&mut self, ctx: &mut Ctx<'_>, settings: Settings) {
        self.settings = settings;
        let workspaces: Vec<WorkspaceId> = self.workspaces().collect();
        for workspace in workspaces {
            let settings = self.settings.clone();
            if let Some(space) = self.get_mut(workspace) {
                space.update_settings(settings);
            }
            self.refresh_appearance(ctx, workspace);
        }
        self.monitors_changed(ctx);
    }

    pub fn snapshot(&self) -> SavedLayout {
        let mut saved = SavedLayout::default();
        for space in self.spaces.values() {
            saved.spaces.insert(
                space.workspace(),
                SavedSpace {
                    columns: space.columns().map(|c| c.to_vec()).collect(),
                    target_x: space.target_x(),
                    monitor: Some(space.monitor().index),
                },
            );
        }
        saved
    }

    /// Snapshots every space and hands all windows back to the host as
    /// plain, unclipped surfaces.
    pub fn teardown(&mut self, ctx: &mut Ctx<'_>) -> SavedLayout {
        let saved = self.snapshot();

        let active = ctx.host.active_workspace();
        for window in ctx.host.tab_list(None) {
            ctx.host.set_surface_clip(window, None);
            let on_active = ctx.host.workspace_of(window).is_none_or(|ws| ws == active);
            let minimized = ctx.host.flags(window).contains(WindowFlags::MINIMIZED);
            ctx.host.set_visible(AnimTarget::Surface(window), on_active && !minimized);
        }
        ctx.host.recreate_affordances(&[]);

        let workspaces: Vec<WorkspaceId> = self.workspaces().collect();
        for workspace in workspaces {
            self.remove_space(ctx, workspace);
        }
        self.preview = None;
        info!(spaces = saved.spaces.len(), "spaces torn down");
        saved
    }
}

fn preview_height(i: usize, to: usize) -> f64 {
    if i == to {
        PREVIEW_HEIGHTS[1]
    } else if i == to + 1 {
        PREVIEW_HEIGHTS[2]
    } else if i + 1 == to {
        PREVIEW_HEIGHTS[0]
    } else if i > to {
        PREVIEW_HEIGHTS[3]
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout_engine::Modes;
    use crate::sys::compositor::Compositor;
    use crate::sys::geometry::Rect;
    use crate::sys::settings_store::{SettingsStore, WorkspaceSettings};
    use crate::sys::sim::SimHost;
    use crate::sys::window_server::WindowServer;

    fn ws(n: u64) -> WorkspaceId { WorkspaceId(n) }

    fn host(workspaces: u64, monitors: &[Rect]) -> SimHost {
        let mut host = SimHost::new(1920.0, 1080.0);
        host.set_monitors(monitors, 0);
        let ids: Vec<WorkspaceId> = (1..=workspaces).map(ws).collect();
        host.set_workspaces(&ids);
        host
    }

    fn registry(host: &mut SimHost) -> SpacesRegistry {
        let mut ctx = Ctx::new(host, Modes::default());
        SpacesRegistry::new(&mut ctx, Settings::default(), &mut ScratchLayer::default(), None)
    }

    fn two_monitors() -> [Rect; 2] {
        [Rect::new(0.0, 0.0, 1920.0, 1080.0), Rect::new(1920.0, 0.0, 1920.0, 1080.0)]
    }

    fn assert_unique_assignments(spaces: &SpacesRegistry) {
        let mut seen: Vec<WorkspaceId> = spaces.assignments().map(|(_, ws)| ws).collect();
        let total = seen.len();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), total, "a space is shown on two monitors");
    }

    #[test]
    fn mru_lists_every_desktop_once() {
        let mut host = host(4, &[Rect::new(0.0, 0.0, 1920.0, 1080.0)]);
        host.add_window(WindowId(10), ws(2), Rect::new(0.0, 0.0, 500.0, 500.0));
        host.add_window(WindowId(11), ws(3), Rect::new(0.0, 0.0, 500.0, 500.0));
        host.add_window(WindowId(12), ws(1), Rect::new(0.0, 0.0, 500.0, 500.0));
        host.focus(WindowId(12));
        host.focus(WindowId(10));
        host.focus(WindowId(11));
        let spaces = registry(&mut host);
        assert_eq!(spaces.mru(&host), vec![ws(1), ws(3), ws(2), ws(4)]);
    }

    #[test]
    fn monitors_are_filled_from_mru_head() {
        let mut host = host(3, &two_monitors());
        let spaces = registry(&mut host);
        assert_eq!(spaces.monitor_space(0), Some(ws(1)));
        assert_eq!(spaces.monitor_space(1), Some(ws(2)));
        assert_eq!(spaces.stack(), &[ws(3)]);
        assert_eq!(spaces.get(ws(2)).map(|s| s.monitor().index), Some(1));
        assert_eq!(host.affordance_count(), 2);
        assert_unique_assignments(&spaces);
    }

    #[test]
    fn unchanged_monitors_keep_their_spaces() {
        let mut host = host(3, &two_monitors());
        let mut spaces = registry(&mut host);
        // Make ws 3 the most recent hidden desktop; the pairing must still win.
        host.add_window(WindowId(1), ws(3), Rect::new(0.0, 0.0, 500.0, 500.0));
        host.focus(WindowId(1));
        let mut ctx = Ctx::new(&mut host, Modes::default());
        spaces.monitors_changed(&mut ctx);
        assert_eq!(spaces.monitor_space(1), Some(ws(2)));
        assert_eq!(spaces.stack(), &[ws(3)]);
    }

    #[test]
    fn space_on_removed_monitor_moves_to_primary() {
        let mut host = host(3, &two_monitors());
        let mut spaces = registry(&mut host);
        assert_eq!(spaces.monitor_space(1), Some(ws(2)));

        host.set_monitors(&[Rect::new(0.0, 0.0, 1920.0, 1080.0)], 0);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        spaces.monitors_changed(&mut ctx);

        let primary = host.monitor(0);
        assert_eq!(spaces.get(ws(2)).map(|s| *s.monitor()), Some(primary));
        assert_eq!(spaces.monitor_space(0), Some(ws(1)));
        assert_eq!(spaces.monitor_space(1), None);
        assert_unique_assignments(&spaces);
        // Repositioned without animation.
        let moved = host
            .animations()
            .iter()
            .rev()
            .find(|a| a.target == AnimTarget::SpaceActor(ws(2)))
            .map(|a| a.duration);
        assert_eq!(moved, Some(Duration::ZERO));
        assert_eq!(host.affordance_count(), 1);
    }

    #[test]
    fn single_monitor_mode_collapses_onto_primary() {
        let mut host = host(3, &two_monitors());
        let settings = Settings { workspaces_only_on_primary: true, ..Settings::default() };
        let mut ctx = Ctx::new(&mut host, Modes::default());
        let spaces =
            SpacesRegistry::new(&mut ctx, settings, &mut ScratchLayer::default(), None);
        assert_eq!(spaces.assignments().count(), 1);
        assert!(spaces.iter().all(|s| s.monitor().index == 0));
        assert_eq!(host.affordance_count(), 1);
    }

    #[test]
    fn same_monitor_switch_pushes_source_onto_stack() {
        let mut host = host(3, &[Rect::new(0.0, 0.0, 1920.0, 1080.0)]);
        let mut spaces = registry(&mut host);
        host.activate_workspace(ws(3));
        host.take_completions();
        let mut ctx = Ctx::new(&mut host, Modes::default());
        spaces.switch_workspace(&mut ctx, ws(1), ws(3));

        assert_eq!(spaces.monitor_space(0), Some(ws(3)));
        assert_eq!(spaces.stack().first(), Some(&ws(1)));
        assert!(!spaces.stack().contains(&ws(3)));
        assert_eq!(spaces.selected_space(), Some(ws(3)));
        assert!(host.warps().is_empty());
        let shown = host
            .take_completions()
            .into_iter()
            .any(|c| matches!(c, Completion::SpaceShown { workspace, .. } if workspace == ws(3)));
        assert!(shown);
    }

    #[test]
    fn cross_monitor_switch_warps_pointer_and_moves_indicator() {
        let mut host = host(2, &two_monitors());
        let mut spaces = registry(&mut host);
        host.set_pointer(Point::new(100.0, 100.0));
        host.activate_workspace(ws(2));
        let mut ctx = Ctx::new(&mut host, Modes::default());
        spaces.switch_workspace(&mut ctx, ws(1), ws(2));

        assert_eq!(host.warps(), &[Point::new(1920.0 + 960.0, 540.0)]);
        assert_eq!(host.affordance(1).map(|a| a.active), Some(false));
        assert_eq!(host.affordance(0).map(|a| a.active), Some(true));
        assert_eq!(spaces.monitor_space(0), Some(ws(1)));
        assert!(
            spaces
                .take_notifications()
                .contains(&BroadcastEvent::IndicatorMonitorChanged { monitor: 1 })
        );
    }

    #[test]
    fn pointer_already_on_destination_is_left_alone() {
        let mut host = host(2, &two_monitors());
        let mut spaces = registry(&mut host);
        host.set_pointer(Point::new(2000.0, 100.0));
        let mut ctx = Ctx::new(&mut host, Modes::default());
        spaces.switch_workspace(&mut ctx, ws(1), ws(2));
        assert!(host.warps().is_empty());
    }

    #[test]
    fn preview_cursor_saturates_at_both_ends() {
        let mut host = host(3, &[Rect::new(0.0, 0.0, 1920.0, 1080.0)]);
        let mut spaces = registry(&mut host);
        let mut ctx = Ctx::new(&mut host, Modes::default());

        assert!(spaces.select_space(&mut ctx, Direction::Down));
        assert!(ctx.modes.navigating);
        assert!(spaces.select_space(&mut ctx, Direction::Down));
        assert_eq!(spaces.preview_cursor(), Some(ws(3)));
        assert!(!spaces.select_space(&mut ctx, Direction::Down));
        assert_eq!(spaces.preview_cursor(), Some(ws(3)));

        assert!(spaces.select_space(&mut ctx, Direction::Up));
        assert!(spaces.select_space(&mut ctx, Direction::Up));
        assert!(!spaces.select_space(&mut ctx, Direction::Up));
        assert_eq!(spaces.preview_cursor(), Some(ws(1)));
        assert!(spaces.in_preview());
    }

    #[test]
    fn preview_deck_offsets_follow_cursor() {
        let mut host = host(4, &[Rect::new(0.0, 0.0, 1920.0, 1080.0)]);
        let mut spaces = registry(&mut host);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        spaces.select_space(&mut ctx, Direction::Down);

        let y = |host: &SimHost, n| host.props_of(AnimTarget::SpaceActor(ws(n))).y;
        assert_eq!(y(&host, 1), 0.95 * 1080.0);
        assert_eq!(y(&host, 2), 0.10 * 1080.0);
        assert_eq!(y(&host, 3), 0.035 * 1080.0);
        assert_eq!(y(&host, 4), 0.01 * 1080.0);
        let props = host.props_of(AnimTarget::SpaceActor(ws(1)));
        assert_eq!(props.scale_x, 0.9 + 0.01);
    }

    #[test]
    fn ending_preview_switches_to_cursor() {
        let mut host = host(3, &[Rect::new(0.0, 0.0, 1920.0, 1080.0)]);
        let mut spaces = registry(&mut host);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        spaces.select_space(&mut ctx, Direction::Down);
        assert!(spaces.end_preview(&mut ctx));
        assert!(!ctx.modes.navigating);
        assert!(!spaces.in_preview());
        assert_eq!(host.active_workspace(), ws(2));
        assert_eq!(spaces.selected_space(), Some(ws(2)));
        assert_eq!(spaces.stack().first(), Some(&ws(1)));
    }

    #[test]
    fn cancelled_preview_returns_to_active_space() {
        let mut host = host(3, &[Rect::new(0.0, 0.0, 1920.0, 1080.0)]);
        let mut spaces = registry(&mut host);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        spaces.select_space(&mut ctx, Direction::Down);
        assert!(spaces.cancel_preview(&mut ctx));
        assert!(!spaces.cancel_preview(&mut ctx));
        assert_eq!(host.active_workspace(), ws(1));
        assert_eq!(spaces.selected_space(), Some(ws(1)));
    }

    #[test]
    fn stale_switch_completions_are_ignored() {
        let mut host = host(3, &[Rect::new(0.0, 0.0, 1920.0, 1080.0)]);
        let mut spaces = registry(&mut host);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        spaces.animate_to_space(
            &mut ctx,
            ws(2),
            Some(ws(1)),
            Some(SwitchContinuation::ActivateWindow(WindowId(7))),
        );
        let stale = spaces.switch_generation;
        spaces.animate_to_space(&mut ctx, ws(1), Some(ws(2)), None);
        assert_eq!(spaces.space_shown(&mut ctx, ws(2), stale), None);

        spaces.animate_to_space(
            &mut ctx,
            ws(3),
            None,
            Some(SwitchContinuation::ActivateWindow(WindowId(7))),
        );
        let current = spaces.switch_generation;
        assert_eq!(
            spaces.space_shown(&mut ctx, ws(3), current),
            Some(SwitchContinuation::ActivateWindow(WindowId(7)))
        );
    }

    #[test]
    fn hidden_completion_hides_only_unshown_spaces() {
        let mut host = host(3, &[Rect::new(0.0, 0.0, 1920.0, 1080.0)]);
        let mut spaces = registry(&mut host);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        spaces.animate_to_space(&mut ctx, ws(1), None, None);
        let generation = spaces.switch_generation;
        spaces.space_hidden(&mut ctx, ws(3), generation);
        spaces.space_hidden(&mut ctx, ws(1), generation);
        assert!(!host.is_visible(AnimTarget::SpaceActor(ws(3))));
        assert!(host.is_visible(AnimTarget::SpaceActor(ws(1))));
    }

    #[test]
    fn workspace_removal_rotates_names() {
        let mut host = host(3, &[Rect::new(0.0, 0.0, 1920.0, 1080.0)]);
        host.set_workspace_names(vec!["a".into(), "b".into(), "c".into()]);
        let mut spaces = registry(&mut host);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        spaces.workspace_removed(&mut ctx, 0);
        assert_eq!(host.workspace_names(), vec!["b", "c", "a"]);
    }

    #[test]
    fn workspaces_changed_tracks_host_desktops() {
        let mut host = host(2, &[Rect::new(0.0, 0.0, 1920.0, 1080.0)]);
        let mut spaces = registry(&mut host);
        host.set_workspaces(&[ws(1), ws(2), ws(5)]);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        spaces.workspaces_changed(&mut ctx, &mut ScratchLayer::default());
        assert!(spaces.contains(ws(5)));

        host.set_workspaces(&[ws(1), ws(5)]);
        let mut ctx = Ctx::new(&mut host, Modes::default());
        spaces.workspaces_changed(&mut ctx, &mut ScratchLayer::default());
        assert!(!spaces.contains(ws(2)));
        assert!(!spaces.stack().contains(&ws(2)));
        assert_eq!(spaces.len(), 2);
        assert_eq!(spaces.mru(&host).len(), 2);
    }

    #[test]
    fn appearance_falls_back_to_defaults() {
        let mut host = host(2, &[Rect::new(0.0, 0.0, 1920.0, 1080.0)]);
        host.set_workspace_settings(
            ws(2),
            WorkspaceSettings { name: "web".into(), ..WorkspaceSettings::default() },
        );
        let spaces = registry(&mut host);
        let defaults = Settings::default();
        let first = spaces.get(ws(1)).map(|s| s.appearance().clone()).unwrap_or_default();
        assert_eq!(first.name, "Workspace 1");
        assert_eq!(Some(first.color.as_str()), defaults.workspace_color(0));
        let second = spaces.get(ws(2)).map(|s| s.appearance().clone()).unwrap_or_default();
        assert_eq!(second.name, "web");
        assert_eq!(Some(second.color.as_str()), defaults.workspace_color(1));
        assert_eq!(second.background, None);
    }

    #[test]
    fn teardown_snapshot_restores_column_order() {
        let mut host = host(1, &[Rect::new(0.0, 0.0, 1920.0, 1080.0)]);
        for id in 1..=3 {
            host.add_window(WindowId(id), ws(1), Rect::new(0.0, 0.0, 600.0, 500.0));
        }
        let mut spaces = registry(&mut host);
        {
            let mut ctx = Ctx::new(&mut host, Modes::default());
            let space = spaces.get_mut(ws(1)).expect("space");
            let first = space.window_at(0, 0).expect("window");
            assert!(space.swap(&mut ctx, Direction::Right, Some(first)));
            space.slurp(&mut ctx);
        }
        let before: Vec<Vec<WindowId>> =
            spaces.get(ws(1)).expect("space").columns().map(|c| c.to_vec()).collect();

        let mut ctx = Ctx::new(&mut host, Modes::default());
        let saved = spaces.teardown(&mut ctx);
        assert!(spaces.is_empty());

        let restored = SpacesRegistry::new(
            &mut ctx,
            Settings::default(),
            &mut ScratchLayer::default(),
            Some(&saved),
        );
        let after: Vec<Vec<WindowId>> =
            restored.get(ws(1)).expect("space").columns().map(|c| c.to_vec()).collect();
        assert_eq!(after, before);
    }
}
