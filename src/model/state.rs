use tracing::{debug, warn};

use crate::common::collections::HashSet;
use crate::common::config::{Config, ConfigError};
use crate::layout_engine::grab::GrabState;
use crate::layout_engine::scratch::{self, ScratchLayer};
use crate::layout_engine::winprop::Winprops;
use crate::layout_engine::{Ctx, Modes};
use crate::model::saved::SavedLayout;
use crate::model::spaces::SpacesRegistry;
use crate::model::window::WindowId;
use crate::sys::Platform;
use crate::sys::menu::MenuAction;

/// Everything the reactor mutates in response to events.
#[derive(Debug)]
pub struct WindowManagerState {
    pub config: Config,
    pub spaces: SpacesRegistry,
    pub scratch: ScratchLayer,
    pub winprops: Winprops,
    /// Interactive move in progress. While set, layout is frozen.
    pub grab: Option<GrabState>,
    /// Windows created on the selected desktop whose surface has not been
    /// shown yet. They are tiled on first show.
    pub pending_insert: HashSet<WindowId>,
}

impl WindowManagerState {
    pub fn new(
        host: &mut dyn Platform,
        config: Config,
        saved: Option<&SavedLayout>,
    ) -> Result<Self, ConfigError> {
        let winprops = Winprops::new(config.compiled_winprops()?);
        let mut scratch = ScratchLayer::default();
        let spaces = {
            let mut ctx = Ctx::new(host, Modes::default());
            SpacesRegistry::new(&mut ctx, config.settings.clone(), &mut scratch, saved)
        };
        host.register_window_menu_action(MenuAction::ToggleScratch);

        if !scratch::is_active(&scratch, host) {
            scratch::hide(&scratch, host);
        }
        debug!(winprops = winprops.len(), restored = saved.is_some(), "state ready");
        Ok(Self {
            config,
            spaces,
            scratch,
            winprops,
            grab: None,
            pending_insert: HashSet::default(),
        })
    }

    /// Modes follow from state: a grab freezes layout, an open preview deck
    /// means the user is navigating.
    pub fn modes(&self) -> Modes {
        Modes { frozen: self.grab.is_some(), navigating: self.spaces.in_preview() }
    }

    pub fn ctx<'a>(&self, host: &'a mut dyn Platform) -> Ctx<'a> { Ctx::new(host, self.modes()) }

    /// Applies a new configuration. The old one stays in force if the new
    /// one has invalid rules.
    pub fn reload(&mut self, host: &mut dyn Platform, config: Config) -> Result<(), ConfigError> {
        let rules = match config.compiled_winprops() {
            Ok(rules) => rules,
            Err(e) => {
                warn!("keeping previous config: {e}");
                return Err(e);
            }
        };
        self.winprops = Winprops::new(rules);
        if config.settings != self.config.settings {
            let mut ctx = self.ctx(host);
            self.spaces.update_settings(&mut ctx, config.settings.clone());
        }
        self.config = config;
        Ok(())
    }

    /// Forgets every trace of a destroyed window.
    pub fn forget_window(&mut self, window: WindowId) {
        self.pending_insert.remove(&window);
        self.scratch.forget(window);
        if self.grab.as_ref().is_some_and(|g| g.window == window) {
            self.grab = None;
        }
    }
}
