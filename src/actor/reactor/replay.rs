//! Scripted runs against the in-memory host.
//!
//! A [`Scenario`] describes the host at startup (monitors, desktops and
//! windows) followed by steps: raw reactor events, or host-side actions that
//! change the host and then deliver the event a real host would send.

use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use super::{Event, Reactor};
use crate::common::config::{Config, ConfigError};
use crate::model::saved::SavedLayout;
use crate::model::window::{WindowId, WorkspaceId};
use crate::sys::geometry::Rect;
use crate::sys::sim::{SimHost, SimWindow};
use crate::sys::window_server::WindowServer;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Step {
    Event(Event),
    /// Adds a window to the host without telling the reactor.
    AddWindow(WindowId, SimWindow),
    /// Creates a window and shows its surface.
    Open(WindowId, SimWindow),
    Close(WindowId),
    Focus(WindowId),
    /// Makes `to` the active desktop.
    Switch(WorkspaceId),
    SetMonitors(Vec<Rect>),
    /// Feeds pending animation completions back in.
    Settle,
    /// Records the current space trees.
    Dump,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Scenario {
    /// Defaults to a single 1920x1080 monitor.
    pub monitors: Vec<Rect>,
    pub primary: usize,
    pub panel_height: f64,
    /// Defaults to a single desktop `WorkspaceId(1)`.
    pub workspaces: Vec<WorkspaceId>,
    pub active: Option<WorkspaceId>,
    /// Windows that exist before the reactor starts, bottom-most first.
    pub windows: Vec<(WindowId, SimWindow)>,
    pub focus: Option<WindowId>,
    pub steps: Vec<Step>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Replay {
    /// One entry per `Dump` step, holding every space tree in desktop order.
    pub dumps: Vec<String>,
    pub layout: SavedLayout,
}

impl Scenario {
    pub fn parse(text: &str) -> Result<Scenario, ConfigError> { Ok(ron::from_str(text)?) }

    fn host(&self) -> SimHost {
        let mut host = SimHost::new(1920.0, 1080.0);
        if !self.monitors.is_empty() {
            host.set_monitors(&self.monitors, self.primary);
        }
        if !self.workspaces.is_empty() {
            host.set_workspaces(&self.workspaces);
        }
        if let Some(active) = self.active {
            host.activate_workspace(active);
        }
        host.set_panel_height(self.panel_height);
        for (id, window) in &self.windows {
            host.insert_window(*id, window.clone());
        }
        if let Some(focus) = self.focus {
            host.focus(focus);
        }
        host
    }
}

impl Reactor<SimHost> {
    /// Builds a reactor on the scenario's host, before any step has run.
    pub fn from_scenario(scenario: &Scenario, config: Config) -> Result<Self, ConfigError> {
        let mut reactor = Reactor::new(scenario.host(), config, None)?;
        reactor.settle();
        Ok(reactor)
    }

    /// Runs one step. Returns the rendered trees for `Dump`.
    pub fn apply_step(&mut self, step: &Step) -> Option<String> {
        match step {
            Step::Event(event) => self.handle_event(event.clone()),
            Step::AddWindow(id, window) => self.host.insert_window(*id, window.clone()),
            Step::Open(id, window) => {
                self.host.insert_window(*id, window.clone());
                self.handle_event(Event::WindowCreated(*id));
                self.handle_event(Event::WindowSurfaceShown(*id));
            }
            Step::Close(id) => {
                self.host.remove_window(*id);
                self.handle_event(Event::WindowDestroyed(*id));
            }
            Step::Focus(id) => {
                self.host.activate(*id);
                self.handle_event(Event::WindowFocused(*id));
            }
            Step::Switch(to) => {
                let from = self.host.active_workspace();
                self.host.activate_workspace(*to);
                self.handle_event(Event::WorkspaceSwitched { from, to: *to });
            }
            Step::SetMonitors(frames) => {
                self.host.set_monitors(frames, 0);
                self.handle_event(Event::MonitorsChanged);
            }
            Step::Settle => self.settle(),
            Step::Dump => return Some(self.draw_trees()),
        }
        None
    }

    /// Every space tree, in desktop order.
    pub fn draw_trees(&self) -> String {
        self.host
            .workspaces()
            .into_iter()
            .filter_map(|ws| self.state.spaces.get(ws))
            .map(|space| space.draw_tree())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs `scenario` to completion and reports the dumps it asked for plus
/// the final layout.
pub fn replay(scenario: &Scenario, config: Config) -> Result<Replay, ConfigError> {
    let mut reactor = Reactor::from_scenario(scenario, config)?;
    let mut out = Replay::default();
    for (i, step) in scenario.steps.iter().enumerate() {
        let _guard = info_span!("replay", step = i).entered();
        if let Some(dump) = reactor.apply_step(step) {
            out.dumps.push(dump);
        }
    }
    reactor.settle();
    out.layout = reactor.state.spaces.snapshot();
    debug!(steps = scenario.steps.len(), dumps = out.dumps.len(), "replay finished");
    Ok(out)
}
