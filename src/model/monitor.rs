use serde::{Deserialize, Serialize};

use crate::sys::geometry::{Point, Rect};
use crate::sys::window_server::WindowServer;

/// A physical output as reported by the host, in host order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub index: usize,
    pub frame: Rect,
}

impl Monitor {
    pub fn new(index: usize, frame: Rect) -> Self { Self { index, frame } }

    /// Monitor identity is not stable across reconfiguration; identical
    /// geometry at the same index is the best match available.
    pub fn same_output(&self, other: &Monitor) -> bool {
        self.index == other.index && self.frame == other.frame
    }

    pub fn contains(&self, point: Point) -> bool { self.frame.contains(point) }
}

/// The host's primary monitor. A host reporting no outputs gets a
/// screen-sized stand-in.
pub fn primary<H: WindowServer + ?Sized>(host: &H) -> Monitor {
    let monitors = host.monitors();
    monitors
        .get(host.primary_monitor())
        .or_else(|| monitors.first())
        .copied()
        .unwrap_or_else(|| {
            let size = host.screen_size();
            Monitor::new(0, Rect::new(0.0, 0.0, size.width, size.height))
        })
}

pub fn at_point<H: WindowServer + ?Sized>(host: &H, point: Point) -> Option<Monitor> {
    host.monitors().into_iter().find(|m| m.contains(point))
}

/// Monitor holding the focused window, else the primary one.
pub fn focus_monitor<H: WindowServer + ?Sized>(host: &H) -> Monitor {
    host.focus_window()
        .and_then(|w| host.frame(w))
        .and_then(|frame| at_point(host, frame.center()))
        .unwrap_or_else(|| primary(host))
}
