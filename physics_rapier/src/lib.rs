//! Rapier 2D collision world used as the ray-query backend.
#![forbid(unsafe_code)]

use rapier2d::prelude::*;

#[derive(Clone, Copy, Debug, Default)]
pub struct DebugDrawConfig {
    pub draw_colliders: bool,
    pub draw_aabbs: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DebugLine {
    pub start: [f32; 2],
    pub end: [f32; 2],
    pub color: [f32; 4],
}

impl DebugLine {
    pub fn new(start: Point<Real>, end: Point<Real>, color: [f32; 4]) -> Self {
        Self {
            start: [start.x, start.y],
            end: [end.x, end.y],
            color,
        }
    }
}

#[derive(Default)]
pub struct PhysicsDebugLines {
    pub lines: Vec<DebugLine>,
}

impl PhysicsDebugLines {
    fn push_line(&mut self, start: Point<Real>, end: Point<Real>, color: [f32; 4]) {
        self.lines.push(DebugLine::new(start, end, color));
    }
}

impl rapier2d::pipeline::DebugRenderBackend for PhysicsDebugLines {
    fn draw_line(
        &mut self,
        object: rapier2d::pipeline::DebugRenderObject,
        a: Point<Real>,
        b: Point<Real>,
        _color: [f32; 4],
    ) {
        let color = match object {
            rapier2d::pipeline::DebugRenderObject::Collider(..) => [0.2, 0.8, 0.9, 1.0],
            rapier2d::pipeline::DebugRenderObject::ColliderAabb(..) => [0.5, 0.5, 0.5, 1.0],
            rapier2d::pipeline::DebugRenderObject::RigidBody(..) => [0.3, 0.7, 0.3, 1.0],
            rapier2d::pipeline::DebugRenderObject::ImpulseJoint(..)
            | rapier2d::pipeline::DebugRenderObject::MultibodyJoint(..) => [0.9, 0.7, 0.2, 1.0],
            rapier2d::pipeline::DebugRenderObject::ContactPair(..) => [0.9, 0.2, 0.2, 1.0],
        };
        self.push_line(a, b, color);
    }
}

/// Nearest hit returned by [`PhysicsWorld::cast_ray`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldRayHit {
    pub distance: Real,
    pub normal: Vector<Real>,
}

/// Static level geometry. Colliders never move, so there is no simulation
/// step; the query pipeline is rebuilt whenever geometry is inserted.
pub struct PhysicsWorld {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    narrow_phase: NarrowPhase,
    query_pipeline: QueryPipeline,
    debug_pipeline: rapier2d::pipeline::DebugRenderPipeline,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            narrow_phase: NarrowPhase::new(),
            query_pipeline: QueryPipeline::new(),
            debug_pipeline: rapier2d::pipeline::DebugRenderPipeline::default(),
        }
    }

    pub fn insert_static_collider(&mut self, collider: Collider) -> ColliderHandle {
        let handle = self.colliders.insert(collider);
        self.query_pipeline.update(&self.colliders);
        handle
    }

    /// Casts a solid ray and returns the nearest hit within `max_distance`.
    ///
    /// `direction` must be unit length so the time of impact is a distance.
    /// Only colliders whose membership groups intersect `filter_bits` are tested.
    pub fn cast_ray(
        &self,
        origin: Point<Real>,
        direction: Vector<Real>,
        max_distance: Real,
        filter_bits: u32,
    ) -> Option<WorldRayHit> {
        if max_distance <= 0.0 {
            return None;
        }
        let ray = Ray::new(origin, direction);
        let groups = InteractionGroups::new(Group::ALL, Group::from_bits_truncate(filter_bits));
        let filter = QueryFilter::default().groups(groups);
        let (_, hit) = self.query_pipeline.cast_ray_and_get_normal(
            &self.bodies,
            &self.colliders,
            &ray,
            max_distance,
            true,
            filter,
        )?;
        Some(WorldRayHit {
            distance: hit.time_of_impact,
            normal: hit.normal,
        })
    }

    pub fn debug_lines(&mut self, config: DebugDrawConfig) -> PhysicsDebugLines {
        let mut lines = PhysicsDebugLines::default();
        let mut mode = rapier2d::pipeline::DebugRenderMode::empty();
        if config.draw_colliders {
            mode |= rapier2d::pipeline::DebugRenderMode::COLLIDER_SHAPES;
        }
        if config.draw_aabbs {
            mode |= rapier2d::pipeline::DebugRenderMode::COLLIDER_AABBS;
        }
        if !mode.is_empty() {
            self.debug_pipeline.mode = mode;
            self.debug_pipeline.render(
                &mut lines,
                &self.bodies,
                &self.colliders,
                &self.impulse_joints,
                &self.multibody_joints,
                &self.narrow_phase,
            );
        }
        lines
    }
}
