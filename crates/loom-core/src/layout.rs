//! Radial layout: entities grouped onto concentric orbits.
//!
//! Groups are laid out in their declared order. Within a group, entities keep input
//! order and sit at equal angular steps starting from the top of the circle. Only
//! absolute positions come out; motion is the renderer's business.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, TAU};
use std::fmt;
use tracing::debug;

/// First slot of every orbit: top of the circle (screen y grows downward).
pub const START_ANGLE: f64 = -FRAC_PI_2;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutEntity<G> {
    pub id: String,
    pub group: G,
    pub weight: f64,
}

impl<G> LayoutEntity<G> {
    pub fn new(id: impl Into<String>, group: G, weight: f64) -> Self {
        Self {
            id: id.into(),
            group,
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orbit<G> {
    pub group: G,
    pub radius: f64,
}

/// Linear map from weight to rendered size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeScale {
    pub min: f64,
    pub max: f64,
    pub weight_ceiling: f64,
}

impl Default for SizeScale {
    fn default() -> Self {
        Self {
            min: 20.0,
            max: 35.0,
            weight_ceiling: 100.0,
        }
    }
}

impl SizeScale {
    /// Monotonic in `weight`; weights outside `[0, weight_ceiling]` (infinities
    /// included) saturate and NaN maps to `min`.
    pub fn size_for(&self, weight: f64) -> f64 {
        if weight.is_nan() {
            return self.min;
        }
        let t = if self.weight_ceiling > 0.0 {
            (weight / self.weight_ceiling).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.min + t * (self.max - self.min)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedEntity {
    pub id: String,
    /// Index into the layout's declared orbit order.
    pub orbit: usize,
    pub angle: f64,
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

#[derive(Debug, Clone)]
pub struct RadialLayout<G> {
    center: Point,
    orbits: Vec<Orbit<G>>,
    scale: SizeScale,
}

impl<G: PartialEq + fmt::Debug> RadialLayout<G> {
    pub fn new(center: Point, orbits: Vec<Orbit<G>>) -> Self {
        Self {
            center,
            orbits,
            scale: SizeScale::default(),
        }
    }

    pub fn with_scale(mut self, scale: SizeScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_center(mut self, center: Point) -> Self {
        self.center = center;
        self
    }

    /// Place every entity whose group has an orbit. An empty group takes no angle
    /// steps, so it never skews another group's spacing.
    pub fn compute(&self, entities: &[LayoutEntity<G>]) -> Vec<PlacedEntity> {
        let mut placed = Vec::with_capacity(entities.len());
        for (orbit_index, orbit) in self.orbits.iter().enumerate() {
            let members: Vec<&LayoutEntity<G>> =
                entities.iter().filter(|e| e.group == orbit.group).collect();
            if members.is_empty() {
                continue;
            }
            let step = TAU / members.len() as f64;
            for (slot, entity) in members.into_iter().enumerate() {
                let angle = START_ANGLE + slot as f64 * step;
                placed.push(PlacedEntity {
                    id: entity.id.clone(),
                    orbit: orbit_index,
                    angle,
                    x: self.center.x + orbit.radius * angle.cos(),
                    y: self.center.y + orbit.radius * angle.sin(),
                    size: self.scale.size_for(entity.weight),
                });
            }
        }

        if placed.len() < entities.len() {
            for entity in entities {
                if !self.orbits.iter().any(|o| o.group == entity.group) {
                    debug!(id = %entity.id, group = ?entity.group, "entity has no orbit; skipped");
                }
            }
        }
        placed
    }
}

/// The three loop categories shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    Forward,
    Reverse,
    System,
}

impl LoopMode {
    pub const ALL: [LoopMode; 3] = [LoopMode::Forward, LoopMode::Reverse, LoopMode::System];

    const BASE_ORBIT: f64 = 150.0;
    const ORBIT_SPACING: f64 = 120.0;

    pub fn orbit_radius(self) -> f64 {
        let index = match self {
            LoopMode::Forward => 0.0,
            LoopMode::Reverse => 1.0,
            LoopMode::System => 2.0,
        };
        Self::BASE_ORBIT + index * Self::ORBIT_SPACING
    }
}

impl RadialLayout<LoopMode> {
    /// Forward/Reverse/System on orbits 150/270/390 around `center`.
    pub fn loop_modes(center: Point) -> Self {
        let orbits = LoopMode::ALL
            .iter()
            .map(|&mode| Orbit {
                group: mode,
                radius: mode.orbit_radius(),
            })
            .collect();
        Self::new(center, orbits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn forward(n: usize) -> Vec<LayoutEntity<LoopMode>> {
        (0..n)
            .map(|i| LayoutEntity::new(format!("f{i}"), LoopMode::Forward, 50.0))
            .collect()
    }

    #[test]
    fn four_entities_sit_ninety_degrees_apart_from_top() {
        let layout = RadialLayout::loop_modes(Point::new(0.0, 0.0));
        let placed = layout.compute(&forward(4));
        assert_eq!(placed.len(), 4);
        assert!((placed[0].x).abs() < EPS);
        assert!((placed[0].y + 150.0).abs() < EPS);
        for pair in placed.windows(2) {
            assert!((pair[1].angle - pair[0].angle - FRAC_PI_2).abs() < EPS);
        }
    }

    #[test]
    fn fifth_entity_respaces_only_its_group() {
        let layout = RadialLayout::loop_modes(Point::new(400.0, 300.0));
        let mut entities = forward(4);
        entities.push(LayoutEntity::new("s0", LoopMode::System, 10.0));
        let before = layout.compute(&entities);
        let system_before = before.iter().find(|p| p.id == "s0").cloned().unwrap();

        entities.insert(4, LayoutEntity::new("f4", LoopMode::Forward, 50.0));
        let after = layout.compute(&entities);
        let forward_after: Vec<_> = after.iter().filter(|p| p.orbit == 0).collect();
        assert_eq!(forward_after.len(), 5);
        for pair in forward_after.windows(2) {
            assert!((pair[1].angle - pair[0].angle - TAU / 5.0).abs() < EPS);
        }
        let system_after = after.iter().find(|p| p.id == "s0").unwrap();
        assert_eq!(&system_before, system_after);
    }

    #[test]
    fn input_order_is_kept_within_a_group() {
        let layout = RadialLayout::loop_modes(Point::default());
        let entities = vec![
            LayoutEntity::new("b", LoopMode::Reverse, 0.0),
            LayoutEntity::new("a", LoopMode::Reverse, 0.0),
        ];
        let ids: Vec<_> = layout.compute(&entities).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn size_is_monotonic_and_saturates() {
        let scale = SizeScale::default();
        assert_eq!(scale.size_for(0.0), 20.0);
        assert_eq!(scale.size_for(100.0), 35.0);
        assert_eq!(scale.size_for(250.0), 35.0);
        assert_eq!(scale.size_for(-5.0), 20.0);
        assert!(scale.size_for(40.0) < scale.size_for(60.0));
    }

    #[test]
    fn non_finite_weights_give_finite_sizes() {
        let scale = SizeScale::default();
        assert_eq!(scale.size_for(f64::NAN), 20.0);
        assert_eq!(scale.size_for(f64::NEG_INFINITY), 20.0);
        assert_eq!(scale.size_for(f64::INFINITY), 35.0);

        let layout = RadialLayout::loop_modes(Point::default());
        let placed = layout.compute(&[LayoutEntity::new("n", LoopMode::Forward, f64::NAN)]);
        assert!(placed[0].size.is_finite());
    }

    #[test]
    fn custom_scale_and_center_are_applied() {
        let layout = RadialLayout::loop_modes(Point::default())
            .with_scale(SizeScale {
                min: 8.0,
                max: 16.0,
                weight_ceiling: 10.0,
            })
            .with_center(Point::new(500.0, 400.0));
        let placed = layout.compute(&[LayoutEntity::new("r", LoopMode::Reverse, 5.0)]);
        assert_eq!(placed[0].size, 12.0);
        assert!((placed[0].x - 500.0).abs() < EPS);
        assert!((placed[0].y - (400.0 - 270.0)).abs() < EPS);
    }

    #[test]
    fn groups_without_orbit_are_skipped() {
        let layout = RadialLayout::new(
            Point::default(),
            vec![Orbit {
                group: "core",
                radius: 10.0,
            }],
        );
        let placed = layout.compute(&[
            LayoutEntity::new("x", "core", 1.0),
            LayoutEntity::new("y", "stray", 1.0),
        ]);
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].id, "x");
    }
}
