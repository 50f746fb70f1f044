use physics_rapier::{DebugLine, PhysicsWorld};
use rapier2d::math::{Point, Vector};
use rapier2d::prelude::Real;
use serde::{Deserialize, Serialize};

/// Opaque layer selection handed through to the ray backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: LayerMask = LayerMask(u32::MAX);
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub distance: Real,
    pub normal: Vector<Real>,
}

/// Nearest-hit ray cast against solid geometry.
///
/// Implementations must be free of side effects; the resolver calls this up to
/// `horizontal_ray_count + vertical_ray_count + 2` times per step.
pub trait RayQuery {
    fn cast_ray(
        &self,
        origin: Point<Real>,
        direction: Vector<Real>,
        max_distance: Real,
        filter: LayerMask,
    ) -> Option<RayHit>;
}

impl RayQuery for PhysicsWorld {
    fn cast_ray(
        &self,
        origin: Point<Real>,
        direction: Vector<Real>,
        max_distance: Real,
        filter: LayerMask,
    ) -> Option<RayHit> {
        PhysicsWorld::cast_ray(self, origin, direction, max_distance, filter.0).map(|hit| RayHit {
            distance: hit.distance,
            normal: hit.normal,
        })
    }
}

impl<F> RayQuery for F
where
    F: Fn(Point<Real>, Vector<Real>, Real, LayerMask) -> Option<RayHit>,
{
    fn cast_ray(
        &self,
        origin: Point<Real>,
        direction: Vector<Real>,
        max_distance: Real,
        filter: LayerMask,
    ) -> Option<RayHit> {
        self(origin, direction, max_distance, filter)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RayKind {
    Horizontal,
    Vertical,
    SlopeAhead,
    Descend,
}

/// One recorded cast, kept for hosts that want to draw the casts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaySample {
    pub kind: RayKind,
    pub origin: Point<Real>,
    pub direction: Vector<Real>,
    pub length: Real,
    pub hit: Option<RayHit>,
}

impl RaySample {
    pub fn to_debug_line(&self) -> DebugLine {
        let (reach, color) = match self.hit {
            Some(hit) => (hit.distance, [0.2, 0.9, 0.3, 1.0]),
            None => (self.length, [0.9, 0.2, 0.2, 1.0]),
        };
        DebugLine::new(self.origin, self.origin + self.direction * reach, color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier2d::prelude::*;

    #[test]
    fn world_query_uses_mask_bits() {
        let mut world = PhysicsWorld::new();
        let wall = ColliderBuilder::cuboid(0.5, 5.0)
            .translation(vector![3.0, 0.0])
            .collision_groups(InteractionGroups::new(Group::GROUP_3, Group::ALL))
            .build();
        world.insert_static_collider(wall);

        let origin = point![0.0, 0.0];
        let right = vector![1.0, 0.0];
        let hit = RayQuery::cast_ray(&world, origin, right, 10.0, LayerMask::ALL).expect("hit");
        assert!((hit.distance - 2.5).abs() < 1.0e-4);
        assert!((hit.normal.x + 1.0).abs() < 1.0e-4);
        assert!(RayQuery::cast_ray(&world, origin, right, 10.0, LayerMask(0b11)).is_none());
    }

    #[test]
    fn sample_line_stops_at_hit() {
        let sample = RaySample {
            kind: RayKind::Vertical,
            origin: point![1.0, 1.0],
            direction: vector![0.0, -1.0],
            length: 2.0,
            hit: Some(RayHit {
                distance: 0.5,
                normal: vector![0.0, 1.0],
            }),
        };
        let line = sample.to_debug_line();
        assert_eq!(line.start, [1.0, 1.0]);
        assert_eq!(line.end, [1.0, 0.5]);
    }
}
