//! Anchor placement: where a floating panel goes relative to its anchor.
//!
//! Pure geometry. The host reads anchor and viewport geometry fresh on every
//! layout event and calls [`place`]; nothing is cached between calls.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Axis-aligned rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalSide {
    Top,
    Bottom,
}

/// Everything one placement needs, read from the host at event time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementGeometry {
    pub anchor: Rect,
    pub panel: Size,
    pub viewport: Size,
    pub padding: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub x: HorizontalSide,
    pub y: VerticalSide,
    pub left: f64,
    pub top: f64,
}

/// Pick a side on one axis. A side that fits wins, `after` (right/bottom) first;
/// otherwise the roomier side, ties going to `after`.
fn choose_side(space_after: f64, space_before: f64, needed: f64) -> bool {
    if space_after >= needed {
        true
    } else if space_before >= needed {
        false
    } else {
        space_after >= space_before
    }
}

/// Clamp into `[padding, limit - extent - padding]`. The far edge is applied first,
/// so a viewport too small for the panel pins it at `padding`.
fn clamp_axis(raw: f64, extent: f64, limit: f64, padding: f64) -> f64 {
    let far = limit - extent - padding;
    let value = if raw > far { far } else { raw };
    if value < padding {
        padding
    } else {
        value
    }
}

/// Compute a collision-avoiding position for the panel.
pub fn place(geometry: &PlacementGeometry) -> Placement {
    let PlacementGeometry {
        anchor,
        panel,
        viewport,
        padding,
    } = *geometry;

    let space_right = viewport.width - anchor.right;
    let space_left = anchor.left;
    let space_bottom = viewport.height - anchor.bottom;
    let space_top = anchor.top;

    let x = if choose_side(space_right, space_left, panel.width) {
        HorizontalSide::Right
    } else {
        HorizontalSide::Left
    };
    let y = if choose_side(space_bottom, space_top, panel.height) {
        VerticalSide::Bottom
    } else {
        VerticalSide::Top
    };

    let raw_left = match x {
        HorizontalSide::Right => anchor.left,
        HorizontalSide::Left => anchor.right - panel.width,
    };
    let raw_top = match y {
        VerticalSide::Bottom => anchor.bottom + padding,
        VerticalSide::Top => anchor.top - panel.height - padding,
    };

    let placement = Placement {
        x,
        y,
        left: clamp_axis(raw_left, panel.width, viewport.width, padding),
        top: clamp_axis(raw_top, panel.height, viewport.height, padding),
    };
    trace!(?placement, "panel placed");
    placement
}

/// Layout events that require re-placing an open panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementTrigger {
    Open,
    Resize,
    /// Scroll of the window or of any scrollable ancestor. Hosts must listen in the
    /// capture phase so nested containers are seen too.
    Scroll,
}

/// Tracks whether the panel is open and recomputes placement on named triggers only.
#[derive(Debug, Default)]
pub struct PlacementTracker {
    open: bool,
    current: Option<Placement>,
}

impl PlacementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a layout event. `Open` opens the tracker; `Resize`/`Scroll` while
    /// closed are ignored. Returns the new placement when one was computed.
    pub fn on_event(&mut self, trigger: PlacementTrigger, geometry: &PlacementGeometry) -> Option<Placement> {
        match trigger {
            PlacementTrigger::Open => self.open = true,
            PlacementTrigger::Resize | PlacementTrigger::Scroll if !self.open => return None,
            PlacementTrigger::Resize | PlacementTrigger::Scroll => {}
        }
        let placement = place(geometry);
        self.current = Some(placement);
        Some(placement)
    }

    pub fn close(&mut self) {
        self.open = false;
        self.current = None;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn current(&self) -> Option<Placement> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PANEL: Size = Size {
        width: 320.0,
        height: 320.0,
    };

    fn geometry(anchor: Rect) -> PlacementGeometry {
        PlacementGeometry {
            anchor,
            panel: PANEL,
            viewport: Size::new(1280.0, 800.0),
            padding: 8.0,
        }
    }

    fn assert_inside(p: &Placement, g: &PlacementGeometry) {
        assert!(p.left >= g.padding);
        assert!(p.top >= g.padding);
        assert!(p.left <= g.viewport.width - g.panel.width - g.padding);
        assert!(p.top <= g.viewport.height - g.panel.height - g.padding);
    }

    #[test]
    fn roomy_anchor_prefers_right_and_bottom() {
        let g = geometry(Rect::new(100.0, 100.0, 28.0, 28.0));
        let p = place(&g);
        assert_eq!((p.x, p.y), (HorizontalSide::Right, VerticalSide::Bottom));
        assert_eq!(p.left, 100.0);
        assert_eq!(p.top, 136.0);
    }

    #[test]
    fn bottom_right_corner_flips_and_stays_inside() {
        let g = geometry(Rect::new(1250.0, 770.0, 28.0, 28.0));
        let p = place(&g);
        assert_eq!((p.x, p.y), (HorizontalSide::Left, VerticalSide::Top));
        assert_inside(&p, &g);
        // Raw left (1278 - 320) overshoots the padding band and is pulled back.
        assert_eq!(p.left, 1280.0 - 320.0 - 8.0);
        assert_eq!(p.top, 770.0 - 320.0 - 8.0);
    }

    #[test]
    fn cramped_viewport_picks_roomier_side_and_clamps() {
        let mut g = geometry(Rect::new(250.0, 150.0, 20.0, 20.0));
        g.viewport = Size::new(400.0, 400.0);
        let p = place(&g);
        // 130 right vs 250 left, 230 bottom vs 150 top: neither axis fits.
        assert_eq!((p.x, p.y), (HorizontalSide::Left, VerticalSide::Bottom));
        assert_inside(&p, &g);
    }

    #[test]
    fn ties_favor_right_and_bottom() {
        let mut g = geometry(Rect::new(190.0, 190.0, 20.0, 20.0));
        g.viewport = Size::new(400.0, 400.0);
        let p = place(&g);
        assert_eq!((p.x, p.y), (HorizontalSide::Right, VerticalSide::Bottom));
    }

    #[test]
    fn undersized_viewport_pins_to_padding() {
        let mut g = geometry(Rect::new(10.0, 10.0, 20.0, 20.0));
        g.viewport = Size::new(200.0, 200.0);
        let p = place(&g);
        assert_eq!((p.left, p.top), (8.0, 8.0));
    }

    #[test]
    fn tracker_ignores_layout_events_while_closed() {
        let g = geometry(Rect::new(100.0, 100.0, 28.0, 28.0));
        let mut tracker = PlacementTracker::new();
        assert!(tracker.on_event(PlacementTrigger::Scroll, &g).is_none());
        assert!(tracker.on_event(PlacementTrigger::Open, &g).is_some());
        let moved = geometry(Rect::new(1250.0, 770.0, 28.0, 28.0));
        let p = tracker.on_event(PlacementTrigger::Scroll, &moved).unwrap();
        assert_eq!(p.x, HorizontalSide::Left);
        tracker.close();
        assert!(tracker.on_event(PlacementTrigger::Resize, &g).is_none());
        assert!(tracker.current().is_none());
    }
}
