//! Raycast collision resolver for axis-aligned 2D bodies.
//!
//! Each step the body's box is shrunk by the skin width, rays are fanned out
//! along the leading edges, and the desired displacement is clipped against the
//! nearest hits. Walkable slopes redirect horizontal motion along the surface.
#![forbid(unsafe_code)]

mod geometry;
mod profile;
mod query;
mod state;

use std::f32::consts::FRAC_PI_2;

use log::{debug, trace};
use physics_rapier::DebugLine;
use rapier2d::math::{Point, Vector};
use rapier2d::parry::bounding_volume::Aabb;
use rapier2d::prelude::Real;

pub use geometry::{shrink_bounds, RayOrigins, RaySpacing};
pub use profile::{
    CollisionProfile, ProfileError, DEFAULT_MAX_CLIMB_ANGLE_DEG, DEFAULT_MAX_DESCEND_ANGLE_DEG,
    DEFAULT_RAY_COUNT, DEFAULT_SKIN_WIDTH, MIN_RAY_COUNT,
};
pub use query::{LayerMask, RayHit, RayKind, RayQuery, RaySample};
pub use state::CollisionState;

/// Two slope angles closer than this (radians) are the same slope.
pub const SLOPE_ANGLE_EPSILON: Real = 1.0e-4;

/// Angle between a surface normal and world up, in radians.
pub fn slope_angle_of(normal: Vector<Real>) -> Real {
    let len = normal.norm();
    if len <= Real::EPSILON {
        return FRAC_PI_2;
    }
    (normal.y / len).clamp(-1.0, 1.0).acos()
}

pub fn same_slope(a: Real, b: Real) -> bool {
    (a - b).abs() <= SLOPE_ANGLE_EPSILON
}

// Zero counts as positive.
fn direction_of(value: Real) -> Real {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Redirects horizontal motion up a slope of `slope_angle` radians.
///
/// The climb is skipped when the body already rises faster than the slope would
/// carry it, so a jump is not pulled back onto the ground.
pub fn climb_slope(
    mut velocity: Vector<Real>,
    slope_angle: Real,
    collisions: &mut CollisionState,
) -> Vector<Real> {
    let move_distance = velocity.x.abs();
    let climb_velocity_y = slope_angle.sin() * move_distance;
    if velocity.y <= climb_velocity_y {
        velocity.y = climb_velocity_y;
        velocity.x = slope_angle.cos() * move_distance * direction_of(velocity.x);
        collisions.below = true;
        collisions.climbing_slope = true;
        collisions.slope_angle = slope_angle;
    }
    velocity
}

pub struct RaycastController {
    profile: CollisionProfile,
    spacing: RaySpacing,
    collisions: CollisionState,
    rays: Vec<RaySample>,
}

impl RaycastController {
    pub fn new(profile: CollisionProfile, bounds: &Aabb) -> Result<Self, ProfileError> {
        profile.validate()?;
        Ok(Self {
            profile,
            spacing: RaySpacing::compute(
                bounds,
                profile.skin_width,
                profile.horizontal_ray_count,
                profile.vertical_ray_count,
            ),
            collisions: CollisionState::default(),
            rays: Vec::new(),
        })
    }

    pub fn profile(&self) -> CollisionProfile {
        self.profile
    }

    pub fn set_profile(
        &mut self,
        profile: CollisionProfile,
        bounds: &Aabb,
    ) -> Result<(), ProfileError> {
        profile.validate()?;
        self.profile = profile;
        self.recalculate_spacing(bounds);
        Ok(())
    }

    pub fn set_ray_counts(&mut self, horizontal: u32, vertical: u32, bounds: &Aabb) {
        self.profile.horizontal_ray_count = horizontal;
        self.profile.vertical_ray_count = vertical;
        self.recalculate_spacing(bounds);
    }

    /// Call when the body's size changes; a pure translation needs no update.
    pub fn recalculate_spacing(&mut self, bounds: &Aabb) {
        self.spacing = RaySpacing::compute(
            bounds,
            self.profile.skin_width,
            self.profile.horizontal_ray_count,
            self.profile.vertical_ray_count,
        );
    }

    pub fn spacing(&self) -> RaySpacing {
        self.spacing
    }

    pub fn collisions(&self) -> &CollisionState {
        &self.collisions
    }

    /// Casts from the last step. Empty unless `record_rays` is set.
    pub fn rays(&self) -> &[RaySample] {
        &self.rays
    }

    pub fn ray_debug_lines(&self) -> Vec<DebugLine> {
        self.rays.iter().map(RaySample::to_debug_line).collect()
    }

    /// Resolves one step of desired displacement for a body currently occupying
    /// `bounds` and returns the collision-safe displacement to apply.
    pub fn move_body<Q: RayQuery + ?Sized>(
        &mut self,
        query: &Q,
        bounds: &Aabb,
        velocity: Vector<Real>,
    ) -> Vector<Real> {
        let origins = RayOrigins::from_bounds(bounds, self.profile.skin_width);
        self.collisions.reset();
        self.rays.clear();

        let mut resolver = Resolver {
            query,
            profile: &self.profile,
            origins,
            spacing: self.spacing,
            collisions: &mut self.collisions,
            rays: if self.profile.record_rays {
                Some(&mut self.rays)
            } else {
                None
            },
            velocity_old: velocity,
        };

        let mut velocity = velocity;
        if velocity.y < 0.0 {
            velocity = resolver.descend_slope(velocity);
        }
        if velocity.x != 0.0 {
            velocity = resolver.horizontal_collisions(velocity);
        }
        if velocity.y != 0.0 {
            velocity = resolver.vertical_collisions(velocity);
        }
        velocity
    }
}

struct Resolver<'a, Q: RayQuery + ?Sized> {
    query: &'a Q,
    profile: &'a CollisionProfile,
    origins: RayOrigins,
    spacing: RaySpacing,
    collisions: &'a mut CollisionState,
    rays: Option<&'a mut Vec<RaySample>>,
    velocity_old: Vector<Real>,
}

impl<Q: RayQuery + ?Sized> Resolver<'_, Q> {
    fn cast(
        &mut self,
        kind: RayKind,
        origin: Point<Real>,
        direction: Vector<Real>,
        length: Real,
    ) -> Option<RayHit> {
        let hit = self
            .query
            .cast_ray(origin, direction, length, self.profile.collision_mask);
        if let Some(rays) = self.rays.as_deref_mut() {
            rays.push(RaySample {
                kind,
                origin,
                direction,
                length,
                hit,
            });
        }
        if let Some(hit) = hit {
            trace!(
                "{:?} ray hit at {:.4} (normal {:.3}, {:.3})",
                kind,
                hit.distance,
                hit.normal.x,
                hit.normal.y
            );
        }
        hit
    }

    fn horizontal_collisions(&mut self, mut velocity: Vector<Real>) -> Vector<Real> {
        let skin_width = self.profile.skin_width;
        let max_climb_angle = self.profile.max_climb_angle();
        let direction_x = direction_of(velocity.x);
        let mut ray_length = velocity.x.abs() + skin_width;
        let corner = if direction_x < 0.0 {
            self.origins.bottom_left
        } else {
            self.origins.bottom_right
        };
        let ray_direction = Vector::new(direction_x, 0.0);

        for i in 0..self.spacing.horizontal_count {
            let origin = corner + Vector::y() * (self.spacing.horizontal * i as Real);
            let hit = match self.cast(RayKind::Horizontal, origin, ray_direction, ray_length) {
                Some(hit) => hit,
                None => continue,
            };
            let slope_angle = slope_angle_of(hit.normal);

            if i == 0 && slope_angle <= max_climb_angle {
                if self.collisions.descending_slope {
                    self.collisions.descending_slope = false;
                    velocity = self.velocity_old;
                }
                let mut distance_to_slope_start = 0.0;
                if !same_slope(slope_angle, self.collisions.slope_angle_old) {
                    debug!(
                        "new slope {:.2} deg at {:.4}",
                        slope_angle.to_degrees(),
                        hit.distance
                    );
                    distance_to_slope_start = hit.distance - skin_width;
                    velocity.x -= distance_to_slope_start * direction_x;
                }
                velocity = climb_slope(velocity, slope_angle, self.collisions);
                velocity.x += distance_to_slope_start * direction_x;
            }

            if !self.collisions.climbing_slope || slope_angle > max_climb_angle {
                velocity.x = (hit.distance - skin_width) * direction_x;
                ray_length = hit.distance;

                if self.collisions.climbing_slope {
                    velocity.y = self.collisions.slope_angle.tan() * velocity.x.abs();
                }

                self.collisions.left = direction_x < 0.0;
                self.collisions.right = direction_x > 0.0;
            }
        }
        velocity
    }

    fn vertical_collisions(&mut self, mut velocity: Vector<Real>) -> Vector<Real> {
        let skin_width = self.profile.skin_width;
        let direction_y = direction_of(velocity.y);
        let mut ray_length = velocity.y.abs() + skin_width;
        let corner = if direction_y < 0.0 {
            self.origins.bottom_left
        } else {
            self.origins.top_left
        };
        let ray_direction = Vector::new(0.0, direction_y);

        for i in 0..self.spacing.vertical_count {
            // Follow the footprint after this step's horizontal motion.
            let offset = self.spacing.vertical * i as Real + velocity.x;
            let origin = corner + Vector::x() * offset;
            let hit = match self.cast(RayKind::Vertical, origin, ray_direction, ray_length) {
                Some(hit) => hit,
                None => continue,
            };

            velocity.y = (hit.distance - skin_width) * direction_y;
            ray_length = hit.distance;

            if self.collisions.climbing_slope {
                let tan = self.collisions.slope_angle.tan();
                if tan > SLOPE_ANGLE_EPSILON {
                    velocity.x = velocity.y / tan * direction_of(velocity.x);
                }
            }

            self.collisions.below = direction_y < 0.0;
            self.collisions.above = direction_y > 0.0;
        }

        if self.collisions.climbing_slope {
            let direction_x = direction_of(velocity.x);
            let ray_length = velocity.x.abs() + skin_width;
            let corner = if direction_x < 0.0 {
                self.origins.bottom_left
            } else {
                self.origins.bottom_right
            };
            let origin = corner + Vector::y() * velocity.y;
            let ray_direction = Vector::new(direction_x, 0.0);
            if let Some(hit) = self.cast(RayKind::SlopeAhead, origin, ray_direction, ray_length) {
                let slope_angle = slope_angle_of(hit.normal);
                if !same_slope(slope_angle, self.collisions.slope_angle) {
                    debug!(
                        "slope changes {:.2} -> {:.2} deg, stopping at {:.4}",
                        self.collisions.slope_angle.to_degrees(),
                        slope_angle.to_degrees(),
                        hit.distance
                    );
                    velocity.x = (hit.distance - skin_width) * direction_x;
                    if slope_angle <= self.profile.max_climb_angle() {
                        self.collisions.slope_angle = slope_angle;
                    }
                }
            }
        }
        velocity
    }

    /// Keeps the body on a walkable slope that falls away in the direction of
    /// travel, instead of stepping off into the air and dropping back.
    fn descend_slope(&mut self, mut velocity: Vector<Real>) -> Vector<Real> {
        if velocity.x == 0.0 {
            return velocity;
        }
        let skin_width = self.profile.skin_width;
        let max_descend_angle = self.profile.max_descend_angle();
        let direction_x = direction_of(velocity.x);
        let move_distance = velocity.x.abs();
        // The trailing corner stays in contact when walking downhill.
        let origin = if direction_x < 0.0 {
            self.origins.bottom_right
        } else {
            self.origins.bottom_left
        };
        let reach = max_descend_angle.tan() * move_distance + skin_width;
        let hit = match self.cast(RayKind::Descend, origin, -Vector::y(), reach) {
            Some(hit) => hit,
            None => return velocity,
        };

        let slope_angle = slope_angle_of(hit.normal);
        if slope_angle <= SLOPE_ANGLE_EPSILON || slope_angle > max_descend_angle {
            return velocity;
        }
        if direction_of(hit.normal.x) != direction_x {
            return velocity;
        }
        let drop = slope_angle.tan() * move_distance;
        if hit.distance - skin_width > drop {
            return velocity;
        }

        debug!("descending {:.2} deg slope", slope_angle.to_degrees());
        velocity.y = -drop;
        self.collisions.slope_angle = slope_angle;
        self.collisions.descending_slope = true;
        self.collisions.below = true;
        velocity
    }
}
