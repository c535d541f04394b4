pub mod affordance;
pub mod compositor;
pub mod geometry;
pub mod menu;
pub mod settings_store;
pub mod sim;
pub mod window_server;

use affordance::EdgeAffordances;
use compositor::Compositor;
use menu::MenuActions;
use settings_store::SettingsStore;
use window_server::WindowServer;

/// Everything the core needs from its host, in one object.
pub trait Platform: WindowServer + Compositor + EdgeAffordances + SettingsStore + MenuActions {}

impl<T> Platform for T where
    T: WindowServer + Compositor + EdgeAffordances + SettingsStore + MenuActions + ?Sized
{
}
