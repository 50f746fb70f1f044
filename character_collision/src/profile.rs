use std::fmt;

use rapier2d::prelude::Real;
use serde::{Deserialize, Serialize};

use crate::query::LayerMask;

pub const MIN_RAY_COUNT: u32 = 2;
pub const DEFAULT_RAY_COUNT: u32 = 4;
pub const DEFAULT_SKIN_WIDTH: Real = 0.015;
pub const DEFAULT_MAX_CLIMB_ANGLE_DEG: Real = 80.0;
pub const DEFAULT_MAX_DESCEND_ANGLE_DEG: Real = 75.0;

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileError {
    Parse(String),
    Invalid(String),
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::Parse(message) => write!(f, "profile parse error: {}", message),
            ProfileError::Invalid(message) => write!(f, "invalid profile: {}", message),
        }
    }
}

impl std::error::Error for ProfileError {}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionProfile {
    /// Rays cast along the leading vertical edge; clamped to at least 2.
    pub horizontal_ray_count: u32,
    /// Rays cast along the leading horizontal edge; clamped to at least 2.
    pub vertical_ray_count: u32,
    /// Layers that block the body.
    pub collision_mask: LayerMask,
    /// Steepest surface, in degrees from up, that can be walked up.
    pub max_climb_angle_deg: Real,
    /// Steepest surface, in degrees from up, that the body follows downhill.
    pub max_descend_angle_deg: Real,
    /// Inward margin kept between the box and any surface.
    pub skin_width: Real,
    /// Keep every cast of the last step for debug drawing.
    pub record_rays: bool,
}

impl Default for CollisionProfile {
    fn default() -> Self {
        Self {
            horizontal_ray_count: DEFAULT_RAY_COUNT,
            vertical_ray_count: DEFAULT_RAY_COUNT,
            collision_mask: LayerMask::ALL,
            max_climb_angle_deg: DEFAULT_MAX_CLIMB_ANGLE_DEG,
            max_descend_angle_deg: DEFAULT_MAX_DESCEND_ANGLE_DEG,
            skin_width: DEFAULT_SKIN_WIDTH,
            record_rays: false,
        }
    }
}

impl CollisionProfile {
    pub fn parse_toml(text: &str) -> Result<Self, ProfileError> {
        let profile: Self =
            toml::from_str(text).map_err(|err| ProfileError::Parse(err.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn to_toml(&self) -> Result<String, ProfileError> {
        toml::to_string(self).map_err(|err| ProfileError::Parse(err.to_string()))
    }

    /// Ray counts are not checked here; they are clamped instead.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if !self.skin_width.is_finite() || self.skin_width <= 0.0 {
            return Err(ProfileError::Invalid(format!(
                "skin_width must be finite and > 0 (got {})",
                self.skin_width
            )));
        }
        for (name, value) in [
            ("max_climb_angle_deg", self.max_climb_angle_deg),
            ("max_descend_angle_deg", self.max_descend_angle_deg),
        ] {
            if !value.is_finite() || !(0.0..90.0).contains(&value) {
                return Err(ProfileError::Invalid(format!(
                    "{} must be in [0, 90) (got {})",
                    name, value
                )));
            }
        }
        Ok(())
    }

    pub fn effective_horizontal_ray_count(&self) -> u32 {
        self.horizontal_ray_count.max(MIN_RAY_COUNT)
    }

    pub fn effective_vertical_ray_count(&self) -> u32 {
        self.vertical_ray_count.max(MIN_RAY_COUNT)
    }

    pub fn max_climb_angle(&self) -> Real {
        self.max_climb_angle_deg.to_radians()
    }

    pub fn max_descend_angle(&self) -> Real {
        self.max_descend_angle_deg.to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let profile = CollisionProfile::parse_toml("").expect("parse");
        assert_eq!(profile, CollisionProfile::default());
        assert_eq!(profile.horizontal_ray_count, 4);
        assert!((profile.skin_width - 0.015).abs() < 1.0e-6);
    }

    #[test]
    fn parses_partial_profile() {
        let text = r#"
horizontal_ray_count = 6
collision_mask = 3
max_climb_angle_deg = 60.0
"#;
        let profile = CollisionProfile::parse_toml(text).expect("parse");
        assert_eq!(profile.horizontal_ray_count, 6);
        assert_eq!(profile.vertical_ray_count, 4);
        assert_eq!(profile.collision_mask, LayerMask(3));
        assert!((profile.max_climb_angle() - 60.0_f32.to_radians()).abs() < 1.0e-6);
    }

    #[test]
    fn ray_counts_are_clamped_not_rejected() {
        let profile = CollisionProfile {
            horizontal_ray_count: 1,
            vertical_ray_count: 0,
            ..CollisionProfile::default()
        };
        assert!(profile.validate().is_ok());
        assert_eq!(profile.effective_horizontal_ray_count(), 2);
        assert_eq!(profile.effective_vertical_ray_count(), 2);
    }

    #[test]
    fn rejects_bad_skin_and_angles() {
        let skin = CollisionProfile {
            skin_width: 0.0,
            ..CollisionProfile::default()
        };
        assert!(matches!(skin.validate(), Err(ProfileError::Invalid(_))));

        let steep = CollisionProfile {
            max_descend_angle_deg: 90.0,
            ..CollisionProfile::default()
        };
        assert!(matches!(steep.validate(), Err(ProfileError::Invalid(_))));

        let parse = CollisionProfile::parse_toml("skin_width = \"wide\"");
        assert!(matches!(parse, Err(ProfileError::Parse(_))));
    }

    #[test]
    fn toml_round_trip_keeps_mask() {
        let profile = CollisionProfile {
            collision_mask: LayerMask(0b101),
            record_rays: true,
            ..CollisionProfile::default()
        };
        let text = profile.to_toml().expect("serialize");
        assert_eq!(CollisionProfile::parse_toml(&text).expect("parse"), profile);
    }
}
