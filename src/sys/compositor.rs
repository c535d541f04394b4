//! Rendering collaborator: visual proxies, space actors and the animation
//! executor.
//!
//! The core never inspects intermediate animation state. A finished
//! animation is reported back by handing its [`Completion`] to the reactor
//! as `Event::AnimationCompleted`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::window::{WindowId, WorkspaceId};
use crate::sys::geometry::{Point, Rect};

/// Objects the core positions, scales or reveals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimTarget {
    /// Visual duplicate of a window, parented to its space's scroll container.
    Proxy(WindowId),
    /// The real window surface.
    Surface(WindowId),
    /// Per-space container translated by the scroll offset.
    ScrollContainer(WorkspaceId),
    /// Whole-space actor, moved and scaled by the preview deck.
    SpaceActor(WorkspaceId),
    /// Per-space clip placed over its monitor.
    SpaceClip(WorkspaceId),
    /// Selection highlight of a space.
    Selection(WorkspaceId),
}

/// Numeric property targets. Unset fields are left untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimProps {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub scale_x: Option<f64>,
    pub scale_y: Option<f64>,
}

impl AnimProps {
    pub fn at(x: f64, y: f64) -> Self { Self { x: Some(x), y: Some(y), ..Self::default() } }

    pub fn x(x: f64) -> Self { Self { x: Some(x), ..Self::default() } }

    pub fn y(y: f64) -> Self { Self { y: Some(y), ..Self::default() } }

    pub fn rect(rect: Rect) -> Self {
        Self {
            x: Some(rect.x),
            y: Some(rect.y),
            width: Some(rect.width),
            height: Some(rect.height),
            ..Self::default()
        }
    }

    pub fn scale(self, scale: f64) -> Self {
        Self { scale_x: Some(scale), scale_y: Some(scale), ..self }
    }
}

/// Follow-up work attached to a workspace switch, run once the destination
/// space has settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchContinuation {
    ActivateWindow(WindowId),
}

/// Completion token handed to the animation executor.
///
/// Tokens carrying a generation are discarded when a newer request for the
/// same object has been issued in the meantime.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Completion {
    ScrollSettled { workspace: WorkspaceId, generation: u64 },
    WindowEntered { workspace: WorkspaceId, window: WindowId },
    SpaceShown { workspace: WorkspaceId, generation: u64 },
    SpaceHidden { workspace: WorkspaceId, generation: u64 },
    ScratchPlaced { window: WindowId, x: f64, y: f64 },
}

/// Cached per-desktop appearance pushed to the renderer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceAppearance {
    pub name: String,
    pub color: String,
    pub background: Option<String>,
}

pub trait Compositor {
    fn animate(
        &mut self,
        target: AnimTarget,
        props: AnimProps,
        duration: Duration,
        completion: Option<Completion>,
    );

    fn cancel_animations(&mut self, target: AnimTarget);

    /// Applies `props` immediately, without animation.
    fn set_props(&mut self, target: AnimTarget, props: AnimProps);

    /// Realized position of `target`, which may be mid-animation.
    fn position(&self, target: AnimTarget) -> Point;

    fn set_visible(&mut self, target: AnimTarget, visible: bool);

    fn is_visible(&self, target: AnimTarget) -> bool;

    /// Parents the window's proxy to the space's scroll container, creating
    /// it if needed.
    fn attach_proxy(&mut self, window: WindowId, workspace: WorkspaceId);

    fn detach_proxy(&mut self, window: WindowId);

    fn raise_proxy(&mut self, window: WindowId);

    fn set_surface_clip(&mut self, window: WindowId, clip: Option<Rect>);

    fn stack_space_below(&mut self, workspace: WorkspaceId, sibling: WorkspaceId);

    fn raise_space(&mut self, workspace: WorkspaceId);

    fn set_space_appearance(&mut self, workspace: WorkspaceId, appearance: &SpaceAppearance);

    /// Screen-wide unredirection optimization.
    fn set_unredirect_enabled(&mut self, enabled: bool);

    fn set_backdrop_visible(&mut self, visible: bool);
}
