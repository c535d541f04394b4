//! Window-manager state that outlives a single event: monitors, the spaces
//! registry and the persisted layout snapshot.

pub mod monitor;
pub mod saved;
pub mod spaces;
pub mod state;
pub mod window;

pub use self::spaces::SpacesRegistry;
pub use self::state::WindowManagerState;
