use tracing::{debug, info};

use crate::actor::reactor::Reactor;
use crate::common::config::Config;
use crate::layout_engine::{Command, commands, scratch};
use crate::model::window::WindowId;
use crate::sys::Platform;
use crate::sys::menu::MenuAction;

pub struct CommandEventHandler;

impl CommandEventHandler {
    pub fn handle_command<P: Platform>(reactor: &mut Reactor<P>, command: Command) {
        let (state, host) = reactor.parts();
        if !commands::execute(state, host, command) {
            debug!("command had nothing to act on");
        }
    }

    pub fn handle_menu_action<P: Platform>(
        reactor: &mut Reactor<P>,
        window: WindowId,
        action: MenuAction,
    ) {
        let (state, host) = reactor.parts();
        match action {
            MenuAction::ToggleScratch => scratch::toggle(state, host, window),
        }
    }

    pub fn handle_config_updated<P: Platform>(reactor: &mut Reactor<P>, config: Config) {
        let (state, host) = reactor.parts();
        if state.reload(host, config).is_ok() {
            info!("config reloaded");
        }
    }
}
