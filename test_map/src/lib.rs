//! 2D test scene format: static solids, a body box and its per-step motion.
#![forbid(unsafe_code)]

use character_collision::CollisionProfile;
use physics_rapier::PhysicsWorld;
use rapier2d::parry::bounding_volume::Aabb;
use rapier2d::prelude::*;
use serde::Deserialize;

const SCENE_VERSION: u32 = 1;
const DEFAULT_STEPS: u32 = 60;

#[derive(Clone, Debug, Deserialize)]
pub struct TestScene {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub steps: Option<u32>,
    pub body: BodySpec,
    #[serde(default)]
    pub profile: Option<CollisionProfile>,
    #[serde(default)]
    pub motion: MotionSpec,
    #[serde(default)]
    pub solids: Vec<SolidSpec>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct BodySpec {
    /// Bottom-left corner.
    pub pos: [f32; 2],
    pub size: [f32; 2],
}

/// Desired displacement fed to the resolver every step.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct MotionSpec {
    #[serde(default)]
    pub displacement: [f32; 2],
}

#[derive(Clone, Debug, Deserialize)]
pub struct SolidSpec {
    pub id: String,
    pub kind: SolidKind,
    /// Box center, or the ramp's low base corner.
    pub pos: [f32; 2],
    #[serde(default)]
    pub size: Option<[f32; 2]>,
    #[serde(default)]
    pub length: Option<f32>,
    #[serde(default)]
    pub angle_deg: Option<f32>,
    #[serde(default)]
    pub facing: RampFacing,
    #[serde(default = "default_layer")]
    pub layer: u32,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SolidKind {
    Box,
    Ramp,
}

/// Side the ramp rises toward.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RampFacing {
    #[default]
    Right,
    Left,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SolidShape {
    Box { center: [f32; 2], half_extents: [f32; 2] },
    Triangle { points: [[f32; 2]; 3] },
}

#[derive(Clone, Debug)]
pub struct ResolvedSolid {
    pub id: String,
    pub shape: SolidShape,
    pub layer: u32,
}

impl ResolvedSolid {
    pub fn collider(&self) -> Collider {
        let builder = match &self.shape {
            SolidShape::Box {
                center,
                half_extents,
            } => ColliderBuilder::cuboid(half_extents[0], half_extents[1])
                .translation(vector![center[0], center[1]]),
            SolidShape::Triangle { points } => ColliderBuilder::triangle(
                point![points[0][0], points[0][1]],
                point![points[1][0], points[1][1]],
                point![points[2][0], points[2][1]],
            ),
        };
        builder
            .collision_groups(InteractionGroups::new(
                Group::from_bits_truncate(self.layer),
                Group::ALL,
            ))
            .build()
    }
}

#[derive(Clone, Debug, Default)]
pub struct SceneValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl SceneValidation {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl TestScene {
    pub fn parse_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|err| err.to_string())
    }

    pub fn steps(&self) -> u32 {
        self.steps.unwrap_or(DEFAULT_STEPS)
    }

    pub fn profile(&self) -> CollisionProfile {
        self.profile.unwrap_or_default()
    }

    pub fn displacement(&self) -> Vector<Real> {
        vector![self.motion.displacement[0], self.motion.displacement[1]]
    }

    pub fn body_bounds(&self) -> Aabb {
        let [x, y] = self.body.pos;
        let [w, h] = self.body.size;
        Aabb::new(point![x, y], point![x + w, y + h])
    }

    pub fn validate(&self) -> SceneValidation {
        let mut validation = SceneValidation::default();
        if self.version != SCENE_VERSION {
            validation
                .errors
                .push(format!("unsupported version {}", self.version));
        }
        if !vector_is_finite(self.body.pos) {
            validation.errors.push("body pos must be finite".to_string());
        }
        if !vector_is_finite(self.body.size) || self.body.size.iter().any(|value| *value <= 0.0) {
            validation
                .errors
                .push("body size must be finite and > 0".to_string());
        }
        if !vector_is_finite(self.motion.displacement) {
            validation
                .errors
                .push("motion displacement must be finite".to_string());
        }
        if let Some(profile) = &self.profile {
            if let Err(err) = profile.validate() {
                validation.errors.push(err.to_string());
            }
            let thickness = profile.skin_width * 2.0;
            if self.body.size.iter().any(|value| *value <= thickness) {
                validation
                    .warnings
                    .push("body is thinner than twice the skin width".to_string());
            }
        }
        if self.solids.is_empty() {
            validation
                .warnings
                .push("test scene contains no solids".to_string());
        }
        for solid in &self.solids {
            validate_solid(solid, &mut validation);
        }
        validation
    }

    pub fn resolved_solids(&self) -> Result<Vec<ResolvedSolid>, String> {
        let validation = self.validate();
        if !validation.is_ok() {
            return Err(validation.errors.join("; "));
        }
        let mut solids = Vec::new();
        for solid in &self.solids {
            solids.push(solid.resolve()?);
        }
        let mut seen = std::collections::HashSet::new();
        for solid in &solids {
            if !seen.insert(solid.id.clone()) {
                return Err(format!("duplicate solid id '{}'", solid.id));
            }
        }
        Ok(solids)
    }

    pub fn build_world(&self) -> Result<PhysicsWorld, String> {
        let mut world = PhysicsWorld::new();
        for solid in self.resolved_solids()? {
            world.insert_static_collider(solid.collider());
        }
        Ok(world)
    }
}

impl SolidSpec {
    fn resolve(&self) -> Result<ResolvedSolid, String> {
        let shape = match self.kind {
            SolidKind::Box => {
                let size = self
                    .size
                    .ok_or_else(|| format!("solid '{}' missing size", self.id))?;
                SolidShape::Box {
                    center: self.pos,
                    half_extents: [size[0] * 0.5, size[1] * 0.5],
                }
            }
            SolidKind::Ramp => {
                let (length, angle) = self
                    .length
                    .zip(self.angle_deg)
                    .ok_or_else(|| format!("solid '{}' missing length/angle_deg", self.id))?;
                let height = angle.to_radians().tan() * length;
                let [x, y] = self.pos;
                let points = match self.facing {
                    RampFacing::Right => [[x, y], [x + length, y], [x + length, y + height]],
                    RampFacing::Left => [[x - length, y], [x, y], [x - length, y + height]],
                };
                SolidShape::Triangle { points }
            }
        };
        Ok(ResolvedSolid {
            id: self.id.clone(),
            shape,
            layer: self.layer,
        })
    }
}

fn validate_solid(solid: &SolidSpec, validation: &mut SceneValidation) {
    if solid.id.trim().is_empty() {
        validation
            .errors
            .push("solid id must not be empty".to_string());
    }
    if !vector_is_finite(solid.pos) {
        validation
            .errors
            .push(format!("solid '{}' has invalid pos", solid.id));
    }
    if solid.layer == 0 {
        validation
            .warnings
            .push(format!("solid '{}' is on no layer and never blocks", solid.id));
    }
    match solid.kind {
        SolidKind::Box => match solid.size {
            Some(size) if vector_is_finite(size) && size.iter().all(|value| *value > 0.0) => {}
            Some(_) => validation
                .errors
                .push(format!("solid '{}' has invalid size", solid.id)),
            None => validation
                .errors
                .push(format!("solid '{}' missing size", solid.id)),
        },
        SolidKind::Ramp => {
            match solid.length {
                Some(length) if length.is_finite() && length > 0.0 => {}
                _ => validation
                    .errors
                    .push(format!("solid '{}' ramp length must be > 0", solid.id)),
            }
            match solid.angle_deg {
                Some(angle) if angle > 0.0 && angle < 89.0 => {}
                _ => validation.errors.push(format!(
                    "solid '{}' ramp angle_deg must be between 0 and 89",
                    solid.id
                )),
            }
        }
    }
}

fn vector_is_finite(value: [f32; 2]) -> bool {
    value.iter().all(|component| component.is_finite())
}

fn default_layer() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use character_collision::RayQuery;

    const RAMP_SCENE: &str = r#"
version = 1
name = "ramp"
steps = 30

[body]
pos = [0.0, 0.0]
size = [1.0, 1.0]

[profile]
horizontal_ray_count = 5

[motion]
displacement = [0.1, -0.05]

[[solids]]
id = "floor"
kind = "box"
pos = [0.0, -0.5]
size = [40.0, 1.0]

[[solids]]
id = "ramp"
kind = "ramp"
pos = [1.5, 0.0]
length = 5.0
angle_deg = 30.0
"#;

    #[test]
    fn parse_ramp_scene() {
        let scene = TestScene::parse_toml(RAMP_SCENE).expect("parse");
        assert_eq!(scene.steps(), 30);
        assert_eq!(scene.profile().horizontal_ray_count, 5);
        assert_eq!(scene.profile().vertical_ray_count, 4);
        assert_eq!(scene.displacement(), vector![0.1, -0.05]);

        let solids = scene.resolved_solids().expect("resolve");
        assert_eq!(solids.len(), 2);
        match &solids[1].shape {
            SolidShape::Triangle { points } => {
                assert_eq!(points[0], [1.5, 0.0]);
                assert!((points[2][1] - 5.0 * 30.0_f32.to_radians().tan()).abs() < 1.0e-4);
            }
            other => panic!("unexpected shape {:?}", other),
        }
    }

    #[test]
    fn built_world_answers_rays() {
        let scene = TestScene::parse_toml(RAMP_SCENE).expect("parse");
        let world = scene.build_world().expect("world");
        let mask = scene.profile().collision_mask;

        let hit = RayQuery::cast_ray(&world, point![0.5, 1.0], vector![0.0, -1.0], 5.0, mask)
            .expect("floor");
        assert!((hit.distance - 1.0).abs() < 1.0e-4);
        let ramp = RayQuery::cast_ray(&world, point![0.0, 0.2], vector![1.0, 0.0], 5.0, mask)
            .expect("ramp");
        assert!((ramp.normal.y - 30.0_f32.to_radians().cos()).abs() < 1.0e-3);
    }

    #[test]
    fn rejects_bad_solids() {
        let text = r#"
version = 2
name = "bad"

[body]
pos = [0.0, 0.0]
size = [1.0, 0.0]

[[solids]]
id = "ramp"
kind = "ramp"
pos = [0.0, 0.0]
angle_deg = 95.0

[[solids]]
id = "box"
kind = "box"
pos = [0.0, 0.0]
"#;
        let scene = TestScene::parse_toml(text).expect("parse");
        let validation = scene.validate();
        assert!(!validation.is_ok());
        assert!(validation.errors.iter().any(|e| e.contains("unsupported version")));
        assert!(validation.errors.iter().any(|e| e.contains("body size")));
        assert!(validation.errors.iter().any(|e| e.contains("length")));
        assert!(validation.errors.iter().any(|e| e.contains("angle_deg")));
        assert!(validation.errors.iter().any(|e| e.contains("missing size")));
        assert!(scene.build_world().is_err());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let text = r#"
version = 1
name = "dup"

[body]
pos = [0.0, 2.0]
size = [1.0, 1.0]

[[solids]]
id = "wall"
kind = "box"
pos = [3.0, 0.0]
size = [1.0, 4.0]

[[solids]]
id = "wall"
kind = "box"
pos = [-3.0, 0.0]
size = [1.0, 4.0]
layer = 2
"#;
        let scene = TestScene::parse_toml(text).expect("parse");
        assert!(scene.validate().is_ok());
        let err = scene.resolved_solids().expect_err("duplicate");
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn bundled_scenes_are_valid() {
        for text in [
            include_str!("../scenes/ramp.toml"),
            include_str!("../scenes/hill.toml"),
        ] {
            let scene = TestScene::parse_toml(text).expect("parse");
            let validation = scene.validate();
            assert!(validation.is_ok(), "{:?}", validation.errors);
            assert!(scene.build_world().is_ok());
        }
        let profile = CollisionProfile::parse_toml(include_str!("../scenes/profile.toml"))
            .expect("profile");
        assert_eq!(profile.effective_horizontal_ray_count(), 6);
    }
}
