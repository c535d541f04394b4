use serde::{Deserialize, Serialize};

/// Extra entries the core asks the host to place in its window menu.
/// Invocations come back as `Event::MenuActionInvoked`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum MenuAction {
    #[strum(to_string = "Scratch")]
    ToggleScratch,
}

pub trait MenuActions {
    fn register_window_menu_action(&mut self, action: MenuAction);
}
