//! Pan/zoom view transform and the pointer gesture machine that drives it.
//!
//! The transform is owned by user gestures only. Data updates re-run the radial
//! layout but never touch pan or zoom, and gestures never re-run the layout.

use crate::layout::Point;
use serde::{Deserialize, Serialize};
use tracing::trace;

pub const MIN_ZOOM: f64 = 0.25;
pub const MAX_ZOOM: f64 = 4.0;

/// Multiplicative zoom per wheel notch.
pub const WHEEL_ZOOM_FACTOR: f64 = 1.1;

/// Pointer travel (px) below which a press/release is a click, not a pan.
pub const CLICK_SLOP: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewTransform {
    pub const IDENTITY: ViewTransform = ViewTransform {
        pan_x: 0.0,
        pan_y: 0.0,
        zoom: 1.0,
    };

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Multiply zoom by `factor`, then clamp into `[MIN_ZOOM, MAX_ZOOM]`.
    pub fn zoom_by(&mut self, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Zoom while keeping `focus` (screen coordinates) over the same world point.
    pub fn zoom_at(&mut self, factor: f64, focus: Point) {
        let world = self.to_world(focus);
        self.zoom_by(factor);
        self.pan_x = focus.x - world.x * self.zoom;
        self.pan_y = focus.y - world.y * self.zoom;
    }

    /// One wheel notch: negative delta zooms in, positive zooms out.
    pub fn wheel(&mut self, delta_y: f64) {
        if delta_y < 0.0 {
            self.zoom_by(WHEEL_ZOOM_FACTOR);
        } else if delta_y > 0.0 {
            self.zoom_by(1.0 / WHEEL_ZOOM_FACTOR);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::IDENTITY;
    }

    pub fn to_screen(&self, world: Point) -> Point {
        Point::new(world.x * self.zoom + self.pan_x, world.y * self.zoom + self.pan_y)
    }

    pub fn to_world(&self, screen: Point) -> Point {
        Point::new((screen.x - self.pan_x) / self.zoom, (screen.y - self.pan_y) / self.zoom)
    }
}

/// Host element hierarchy, used to tell interactive children from empty canvas.
pub trait ElementTree {
    type Id: Copy;

    fn parent(&self, id: Self::Id) -> Option<Self::Id>;

    /// True when the element itself is marked interactive.
    fn is_marked_interactive(&self, id: Self::Id) -> bool;
}

/// Walk from `target` up through its ancestors looking for an interactive mark.
pub fn is_interactive_target<T: ElementTree>(tree: &T, target: T::Id) -> bool {
    let mut current = Some(target);
    while let Some(id) = current {
        if tree.is_marked_interactive(id) {
            return true;
        }
        current = tree.parent(id);
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GestureState {
    Idle,
    /// Pointer is down; not yet decided between click and pan.
    Pressed { origin: Point, on_interactive: bool },
    Panning { last: Point },
}

/// What a pointer-up resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    None,
    /// Press and release without meaningful travel, or any press on an
    /// interactive element.
    Click { interactive: bool },
    PanEnded,
}

/// Turns raw pointer and wheel input into view-transform updates.
#[derive(Debug, Clone)]
pub struct GestureController {
    transform: ViewTransform,
    state: GestureState,
    click_slop: f64,
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureController {
    pub fn new() -> Self {
        Self {
            transform: ViewTransform::IDENTITY,
            state: GestureState::Idle,
            click_slop: CLICK_SLOP,
        }
    }

    pub fn with_click_slop(mut self, slop: f64) -> Self {
        self.click_slop = slop.max(0.0);
        self
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.state, GestureState::Panning { .. })
    }

    /// `on_interactive` should come from [`is_interactive_target`].
    pub fn pointer_down(&mut self, at: Point, on_interactive: bool) {
        self.state = GestureState::Pressed {
            origin: at,
            on_interactive,
        };
    }

    /// Returns true when the transform changed.
    pub fn pointer_move(&mut self, at: Point) -> bool {
        match self.state {
            GestureState::Idle => false,
            GestureState::Pressed {
                on_interactive: true,
                ..
            } => false,
            GestureState::Pressed { origin, .. } => {
                let (dx, dy) = (at.x - origin.x, at.y - origin.y);
                if dx.hypot(dy) <= self.click_slop {
                    return false;
                }
                self.transform.pan_by(dx, dy);
                self.state = GestureState::Panning { last: at };
                trace!(pan_x = self.transform.pan_x, pan_y = self.transform.pan_y, "pan started");
                true
            }
            GestureState::Panning { last } => {
                self.transform.pan_by(at.x - last.x, at.y - last.y);
                self.state = GestureState::Panning { last: at };
                true
            }
        }
    }

    pub fn pointer_up(&mut self, at: Point) -> GestureOutcome {
        let outcome = match self.state {
            GestureState::Idle => GestureOutcome::None,
            GestureState::Pressed {
                on_interactive: true,
                ..
            } => GestureOutcome::Click { interactive: true },
            // Hosts may coalesce moves, so the release point alone can carry the drag.
            GestureState::Pressed { origin, .. } => {
                let (dx, dy) = (at.x - origin.x, at.y - origin.y);
                if dx.hypot(dy) <= self.click_slop {
                    GestureOutcome::Click { interactive: false }
                } else {
                    self.transform.pan_by(dx, dy);
                    GestureOutcome::PanEnded
                }
            }
            GestureState::Panning { last } => {
                self.transform.pan_by(at.x - last.x, at.y - last.y);
                GestureOutcome::PanEnded
            }
        };
        self.state = GestureState::Idle;
        outcome
    }

    /// Pointer left or capture was lost. Pan so far is kept.
    pub fn pointer_cancel(&mut self) {
        self.state = GestureState::Idle;
    }

    pub fn wheel(&mut self, delta_y: f64) {
        self.transform.wheel(delta_y);
    }

    pub fn wheel_at(&mut self, delta_y: f64, focus: Point) {
        let factor = if delta_y < 0.0 {
            WHEEL_ZOOM_FACTOR
        } else if delta_y > 0.0 {
            1.0 / WHEEL_ZOOM_FACTOR
        } else {
            return;
        };
        self.transform.zoom_at(factor, focus);
    }

    pub fn reset(&mut self) {
        self.transform.reset();
        self.state = GestureState::Idle;
    }
}
