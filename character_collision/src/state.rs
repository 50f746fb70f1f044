use rapier2d::prelude::Real;

/// Contact report for the last resolved step. Angles are in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CollisionState {
    pub above: bool,
    pub below: bool,
    pub left: bool,
    pub right: bool,
    pub climbing_slope: bool,
    pub descending_slope: bool,
    pub slope_angle: Real,
    /// Slope angle of the previous step, kept across resets.
    pub slope_angle_old: Real,
}

impl CollisionState {
    pub fn reset(&mut self) {
        self.above = false;
        self.below = false;
        self.left = false;
        self.right = false;
        self.climbing_slope = false;
        self.descending_slope = false;
        self.slope_angle_old = self.slope_angle;
        self.slope_angle = 0.0;
    }

    pub fn any_contact(&self) -> bool {
        self.above || self.below || self.left || self.right
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_flags_and_keeps_previous_angle() {
        let mut state = CollisionState {
            above: true,
            below: true,
            left: true,
            right: true,
            climbing_slope: true,
            descending_slope: true,
            slope_angle: 0.5,
            slope_angle_old: 0.1,
        };
        state.reset();
        assert!(!state.any_contact());
        assert!(!state.climbing_slope);
        assert!(!state.descending_slope);
        assert_eq!(state.slope_angle, 0.0);
        assert_eq!(state.slope_angle_old, 0.5);
    }
}
