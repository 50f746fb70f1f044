use rapier2d::math::Point;
use rapier2d::parry::bounding_volume::Aabb;
use rapier2d::prelude::Real;

use crate::profile::MIN_RAY_COUNT;

/// Shrinks `bounds` by `skin_width` on every side. A box thinner than twice the
/// skin collapses onto its center line instead of inverting.
pub fn shrink_bounds(bounds: &Aabb, skin_width: Real) -> Aabb {
    let center = bounds.center();
    let half = bounds.half_extents();
    let half_x = (half.x - skin_width).max(0.0);
    let half_y = (half.y - skin_width).max(0.0);
    Aabb::new(
        Point::new(center.x - half_x, center.y - half_y),
        Point::new(center.x + half_x, center.y + half_y),
    )
}

/// Corners of the skin-shrunk box; rays start here.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayOrigins {
    pub top_left: Point<Real>,
    pub top_right: Point<Real>,
    pub bottom_left: Point<Real>,
    pub bottom_right: Point<Real>,
}

impl Default for RayOrigins {
    fn default() -> Self {
        Self {
            top_left: Point::origin(),
            top_right: Point::origin(),
            bottom_left: Point::origin(),
            bottom_right: Point::origin(),
        }
    }
}

impl RayOrigins {
    pub fn from_bounds(bounds: &Aabb, skin_width: Real) -> Self {
        let shrunk = shrink_bounds(bounds, skin_width);
        Self {
            top_left: Point::new(shrunk.mins.x, shrunk.maxs.y),
            top_right: Point::new(shrunk.maxs.x, shrunk.maxs.y),
            bottom_left: Point::new(shrunk.mins.x, shrunk.mins.y),
            bottom_right: Point::new(shrunk.maxs.x, shrunk.mins.y),
        }
    }
}

/// Distance between neighbouring rays on each edge, corners included.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RaySpacing {
    /// Vertical gap between the horizontal rays.
    pub horizontal: Real,
    /// Horizontal gap between the vertical rays.
    pub vertical: Real,
    pub horizontal_count: u32,
    pub vertical_count: u32,
}

impl RaySpacing {
    pub fn compute(
        bounds: &Aabb,
        skin_width: Real,
        horizontal_count: u32,
        vertical_count: u32,
    ) -> Self {
        let shrunk = shrink_bounds(bounds, skin_width);
        let extents = shrunk.extents();
        let horizontal_count = horizontal_count.max(MIN_RAY_COUNT);
        let vertical_count = vertical_count.max(MIN_RAY_COUNT);
        Self {
            horizontal: extents.y / (horizontal_count - 1) as Real,
            vertical: extents.x / (vertical_count - 1) as Real,
            horizontal_count,
            vertical_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(Point::new(0.0, 0.0), Point::new(1.0, 2.0))
    }

    #[test]
    fn origins_are_inset_by_skin() {
        let origins = RayOrigins::from_bounds(&unit_box(), 0.015);
        assert!((origins.bottom_left.x - 0.015).abs() < 1.0e-6);
        assert!((origins.bottom_left.y - 0.015).abs() < 1.0e-6);
        assert!((origins.top_right.x - 0.985).abs() < 1.0e-6);
        assert!((origins.top_right.y - 1.985).abs() < 1.0e-6);
        assert_eq!(origins.top_left.x, origins.bottom_left.x);
        assert_eq!(origins.bottom_right.y, origins.bottom_left.y);
    }

    #[test]
    fn spacing_spans_corner_to_corner() {
        let spacing = RaySpacing::compute(&unit_box(), 0.015, 4, 3);
        assert!((spacing.horizontal - 1.97 / 3.0).abs() < 1.0e-5);
        assert!((spacing.vertical - 0.97 / 2.0).abs() < 1.0e-5);
    }

    #[test]
    fn single_ray_is_clamped_to_two() {
        let spacing = RaySpacing::compute(&unit_box(), 0.015, 1, 0);
        assert_eq!(spacing.horizontal_count, 2);
        assert_eq!(spacing.vertical_count, 2);
        assert!((spacing.horizontal - 1.97).abs() < 1.0e-5);
        assert!((spacing.vertical - 0.97).abs() < 1.0e-5);
        assert!(spacing.horizontal.is_finite());
    }

    #[test]
    fn thin_box_collapses_to_center() {
        let thin = Aabb::new(Point::new(0.0, 0.0), Point::new(0.01, 1.0));
        let shrunk = shrink_bounds(&thin, 0.015);
        assert_eq!(shrunk.mins.x, shrunk.maxs.x);
        assert!((shrunk.mins.x - 0.005).abs() < 1.0e-6);
    }
}
