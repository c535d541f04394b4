//! Scrollable column tiling: per-desktop column model, viewport scrolling,
//! window classification and the interactive-move follower.

pub mod commands;
pub mod grab;
pub mod insertion;
pub mod scratch;
pub mod space;
pub mod viewport;
pub mod winprop;

use serde::{Deserialize, Serialize};

pub use self::commands::Command;
pub use self::space::{Placement, Space};
use crate::model::window::WindowId;
use crate::sys::Platform;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn is_horizontal(self) -> bool { matches!(self, Direction::Left | Direction::Right) }

    /// Step along the axis of this direction: left and up are negative.
    pub fn step(self) -> isize {
        match self {
            Direction::Left | Direction::Up => -1,
            Direction::Right | Direction::Down => 1,
        }
    }
}

/// Transient global modes that suppress end-of-move reconciliation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modes {
    /// An interactive move is in progress; layout animation is frozen.
    pub frozen: bool,
    /// The space preview deck is open.
    pub navigating: bool,
}

/// Host access plus the modes in effect, threaded through every operation
/// that has side effects outside the column model.
pub struct Ctx<'a> {
    pub host: &'a mut dyn Platform,
    pub modes: Modes,
}

impl<'a> Ctx<'a> {
    pub fn new(host: &'a mut dyn Platform, modes: Modes) -> Self { Self { host, modes } }
}

/// Observable changes a space reports to whoever drives it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SpaceSignal {
    WindowAdded(WindowId),
    WindowRemoved(WindowId),
    Swapped { window: WindowId, direction: Direction },
    Selected(WindowId),
    MoveDone,
    MonitorChanged(usize),
}
