//! The Reactor's job is to keep the tiling model coherent with the host.
//!
//! It takes notifications from the host (window lifecycle, monitor and
//! desktop topology, grabs, animation completions) and commands from the
//! user, applies them to [`WindowManagerState`], and forwards what changed to
//! the indicator collaborators.

mod events;
mod replay;


use events::command::CommandEventHandler;
use events::drag::DragEventHandler;
use events::space::SpaceEventHandler;
use events::window::WindowEventHandler;
pub use replay::{Replay, Scenario, Step, replay};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::actor;
use crate::actor::broadcast::{BroadcastEvent, BroadcastSender};
use crate::common::config::{Config, ConfigError};
use crate::layout_engine::grab::GrabOp;
use crate::layout_engine::{Command, SpaceSignal};
use crate::model::WindowManagerState;
use crate::model::saved::SavedLayout;
use crate::model::window::{WindowId, WorkspaceId};
use crate::sys::Platform;
use crate::sys::compositor::Completion;
use crate::sys::menu::MenuAction;
use crate::sys::sim::SimHost;

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

/// Upper bound on completion rounds in [`Reactor::settle`]. Each round may
/// start new animations, so a misbehaving chain must not spin forever.
const MAX_SETTLE_ROUNDS: usize = 16;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Event {
    /// A window exists but its surface may not have been shown yet.
    WindowCreated(WindowId),
    WindowSurfaceShown(WindowId),
    WindowAdded {
        window: WindowId,
        workspace: WorkspaceId,
    },
    WindowRemoved {
        window: WindowId,
        workspace: WorkspaceId,
    },
    WindowDestroyed(WindowId),
    WindowFocused(WindowId),
    WindowMinimizedChanged(WindowId),
    WindowFullscreenChanged(WindowId),
    WindowSizeChanged(WindowId),
    WindowPositionChanged(WindowId),
    WindowEnteredMonitor {
        window: WindowId,
        monitor: usize,
    },

    GrabBegin {
        window: WindowId,
        op: GrabOp,
    },
    GrabEnd {
        window: WindowId,
        op: GrabOp,
    },

    MonitorsChanged,
    WorkspacesChanged,
    WorkspaceRemoved {
        index: usize,
    },
    WorkspaceSwitched {
        from: WorkspaceId,
        to: WorkspaceId,
    },
    WorkspaceSettingsChanged(WorkspaceId),
    StackEdgeActivated {
        workspace: WorkspaceId,
        column: usize,
    },

    AnimationCompleted(Completion),
    MenuActionInvoked {
        window: WindowId,
        action: MenuAction,
    },
    Command(Command),
    ConfigUpdated(Config),
}

pub struct Reactor<P> {
    pub state: WindowManagerState,
    pub host: P,
    broadcast_tx: Option<BroadcastSender>,
    /// Window the indicator was last told is fullscreen.
    fullscreen: Option<WindowId>,
}

impl<P: Platform> Reactor<P> {
    pub fn new(mut host: P, config: Config, saved: Option<&SavedLayout>) -> Result<Self, ConfigError> {
        let state = WindowManagerState::new(&mut host, config, saved)?;
        let mut reactor = Reactor { state, host, broadcast_tx: None, fullscreen: None };
        reactor.flush();
        Ok(reactor)
    }

    pub fn with_broadcast(mut self, broadcast_tx: BroadcastSender) -> Self {
        self.broadcast_tx = Some(broadcast_tx);
        self
    }

    /// Splits the reactor into the state and the host so handlers can
    /// borrow both at once.
    pub(crate) fn parts(&mut self) -> (&mut WindowManagerState, &mut dyn Platform) {
        (&mut self.state, &mut self.host)
    }

    pub async fn run(mut self, mut events: Receiver) {
        const MAX_EVENT_BATCH: usize = 64;

        while let Some((span, event)) = events.recv().await {
            let _guard = span.enter();
            self.handle_event(event);
            for _ in 1..MAX_EVENT_BATCH {
                let Ok((span, event)) = events.try_recv() else {
                    break;
                };
                let _guard = span.enter();
                self.handle_event(event);
            }
        }
        debug!("reactor channel closed");
    }

    fn log_event(&self, event: &Event) {
        match event {
            Event::WindowPositionChanged(..) | Event::AnimationCompleted(..) => {
                trace!(?event, "Event")
            }
            _ => debug!(?event, "Event"),
        }
    }

    #[instrument(name = "reactor::handle_event", skip(self), fields(event=?event))]
    pub fn handle_event(&mut self, event: Event) {
        self.log_event(&event);

        match event {
            Event::WindowCreated(window) => WindowEventHandler::handle_created(self, window),
            Event::WindowSurfaceShown(window) => {
                WindowEventHandler::handle_surface_shown(self, window)
            }
            Event::WindowAdded { window, workspace } => {
                WindowEventHandler::handle_added(self, window, workspace)
            }
            Event::WindowRemoved { window, workspace } => {
                WindowEventHandler::handle_removed(self, window, workspace)
            }
            Event::WindowDestroyed(window) => WindowEventHandler::handle_destroyed(self, window),
            Event::WindowFocused(window) => WindowEventHandler::handle_focused(self, window),
            Event::WindowMinimizedChanged(window) => {
                WindowEventHandler::handle_minimized_changed(self, window)
            }
            Event::WindowFullscreenChanged(window) => {
                WindowEventHandler::handle_fullscreen_changed(self, window)
            }
            Event::WindowSizeChanged(window) => {
                WindowEventHandler::handle_size_changed(self, window)
            }
            Event::WindowPositionChanged(window) => {
                DragEventHandler::handle_position_changed(self, window)
            }
            Event::WindowEnteredMonitor { window, monitor } => {
                WindowEventHandler::handle_entered_monitor(self, window, monitor)
            }
            Event::GrabBegin { window, op } => DragEventHandler::handle_grab_begin(self, window, op),
            Event::GrabEnd { window, op } => DragEventHandler::handle_grab_end(self, window, op),
            Event::MonitorsChanged => SpaceEventHandler::handle_monitors_changed(self),
            Event::WorkspacesChanged => SpaceEventHandler::handle_workspaces_changed(self),
            Event::WorkspaceRemoved { index } => {
                SpaceEventHandler::handle_workspace_removed(self, index)
            }
            Event::WorkspaceSwitched { from, to } => {
                SpaceEventHandler::handle_workspace_switched(self, from, to)
            }
            Event::WorkspaceSettingsChanged(workspace) => {
                SpaceEventHandler::handle_settings_changed(self, workspace)
            }
            Event::StackEdgeActivated { workspace, column } => {
                SpaceEventHandler::handle_stack_edge_activated(self, workspace, column)
            }
            Event::AnimationCompleted(completion) => {
                SpaceEventHandler::handle_animation_completed(self, completion)
            }
            Event::MenuActionInvoked { window, action } => {
                CommandEventHandler::handle_menu_action(self, window, action)
            }
            Event::Command(command) => CommandEventHandler::handle_command(self, command),
            Event::ConfigUpdated(config) => {
                CommandEventHandler::handle_config_updated(self, config)
            }
        }

        self.flush();
    }

    /// Forwards what the spaces reported while handling an event.
    fn flush(&mut self) {
        for (workspace, signal) in self.state.spaces.take_signals() {
            match signal {
                SpaceSignal::Selected(window) => {
                    self.notify(BroadcastEvent::WindowSelected { workspace, window })
                }
                signal => trace!(?workspace, ?signal, "space signal"),
            }
        }
        for event in self.state.spaces.take_notifications() {
            self.notify(event);
        }
        for space in self.state.spaces.iter() {
            trace!(workspace = ?space.workspace(), "\n{}", space.draw_tree());
        }
    }

    pub(crate) fn notify(&self, event: BroadcastEvent) {
        trace!(?event, "broadcast");
        if let Some(tx) = &self.broadcast_tx {
            // Nobody listening is fine.
            _ = tx.send(event);
        }
    }

    /// Tells the indicator whether `window` now covers its monitor. Repeats
    /// of the current state are dropped.
    pub(crate) fn set_fullscreen(&mut self, window: WindowId, fullscreen: bool) {
        match (fullscreen, self.fullscreen) {
            (true, Some(current)) if current == window => {}
            (true, _) => {
                self.fullscreen = Some(window);
                self.notify(BroadcastEvent::FullscreenEntered { window });
            }
            (false, Some(current)) => {
                self.fullscreen = None;
                self.notify(BroadcastEvent::FullscreenExited { window: current });
            }
            (false, None) => {}
        }
    }

    /// Hands every window back to the host and returns the layout to
    /// restore on the next start.
    pub fn teardown(&mut self) -> SavedLayout {
        let (state, host) = self.parts();
        let mut ctx = state.ctx(host);
        let saved = state.spaces.teardown(&mut ctx);
        self.flush();
        saved
    }
}

impl Reactor<SimHost> {
    /// Feeds queued animation completions back in until the in-memory host
    /// has none left.
    pub fn settle(&mut self) {
        for _ in 0..MAX_SETTLE_ROUNDS {
            let completions = self.host.take_completions();
            if completions.is_empty() {
                return;
            }
            for completion in completions {
                self.handle_event(Event::AnimationCompleted(completion));
            }
        }
        debug!("animations still pending after settling");
    }
}
