//! Geometric primitives for shape layout and positioning.
//!
//! This module provides fundamental geometric types used throughout Tangram
//! for calculating positions, sizes, bounding boxes, and transforms of shapes.
//!
//! # Overview
//!
//! - [`Point`] - A 2D coordinate in canvas space
//! - [`Size`] - Width and height dimensions
//! - [`Bounds`] - A rectangular bounding box defined by minimum and maximum coordinates
//! - [`Insets`] - Padding/margin values for four sides
//! - [`Affine`] - A 2D affine transform
//!
//! # Coordinate System
//!
//! Tangram uses a coordinate system consistent with SVG:
//!
//! ```text
//!   (0,0) ────────► +X
//!     │
//!     │
//!     │
//!     ▼
//!    +Y
//! ```
//!
//! - **Origin**: Top-left corner at `(0, 0)`
//! - **X-axis**: Increases rightward (positive to the right)
//! - **Y-axis**: Increases downward (positive downward)
//! - **Angles**: Radians, positive angles rotate clockwise on screen

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing computed coordinates.
pub const EPSILON: f64 = 1e-9;

/// A 2D point representing a position in canvas coordinate space.
///
/// # Examples
///
/// ```
/// # use tangram_core::geometry::Point;
/// let p1 = Point::new(10.0, 20.0);
/// let p2 = Point::new(5.0, 5.0);
///
/// let sum = p1.add_point(p2);
/// assert_eq!(sum.x(), 15.0);
/// assert_eq!(sum.y(), 25.0);
///
/// let mid = p1.lerp(p2, 0.5);
/// assert_eq!(mid.x(), 7.5);
/// assert_eq!(mid.y(), 12.5);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    x: f64,
    y: f64,
}

impl Point {
    /// Creates a new point with the specified coordinates
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the x-coordinate of the point
    pub fn x(self) -> f64 {
        self.x
    }

    /// Returns the y-coordinate of the point
    pub fn y(self) -> f64 {
        self.y
    }

    /// Adds another point to this point, returning a new point.
    pub fn add_point(self, other: Point) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    /// Subtracts another point from this point, returning a new point
    pub fn sub_point(self, other: Point) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    /// Linear interpolation towards `other`; `t = 0` is `self`, `t = 1` is `other`.
    pub fn lerp(self, other: Point, t: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Calculates the hypotenuse (Euclidean distance from origin)
    pub fn hypot(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Euclidean distance to another point
    pub fn distance(self, other: Point) -> f64 {
        other.sub_point(self).hypot()
    }

    /// Angle of the vector from this point to `other`, in radians.
    pub fn angle_to(self, other: Point) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// Rotates this point around the origin.
    pub fn rotate(self, angle: f64) -> Self {
        if angle == 0.0 {
            return self;
        }
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    /// Rotates this point around `center`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tangram_core::geometry::Point;
    /// let p = Point::new(10.0, 0.0).rotate_around(Point::new(0.0, 0.0), std::f64::consts::FRAC_PI_2);
    /// assert!((p.x() - 0.0).abs() < 1e-9);
    /// assert!((p.y() - 10.0).abs() < 1e-9);
    /// ```
    pub fn rotate_around(self, center: Point, angle: f64) -> Self {
        self.sub_point(center).rotate(angle).add_point(center)
    }

    /// Returns true when both coordinates are within [`EPSILON`] of `other`.
    pub fn approx_eq(self, other: Point) -> bool {
        (self.x - other.x).abs() < EPSILON && (self.y - other.y).abs() < EPSILON
    }
}

/// Represents the dimensions of an element with width and height
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    width: f64,
    height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns the width dimension of this size
    pub fn width(self) -> f64 {
        self.width
    }

    /// Returns the height dimension of this size
    pub fn height(self) -> f64 {
        self.height
    }

    /// Returns a new Size with the maximum width and height between this size and another
    pub fn max(self, other: Size) -> Self {
        Self {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }
}

/// Represents a rectangular bounding box with minimum and maximum coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bounds {
    /// Creates a new bounds from a center point and a size
    pub fn new_from_center(center: Point, size: Size) -> Self {
        let half_width = size.width / 2.0;
        let half_height = size.height / 2.0;
        Self {
            min_x: center.x - half_width,
            min_y: center.y - half_height,
            max_x: center.x + half_width,
            max_y: center.y + half_height,
        }
    }

    /// Creates a new bounds from a top-left point and a size
    pub fn new_from_top_left(top_left: Point, size: Size) -> Self {
        Self {
            min_x: top_left.x,
            min_y: top_left.y,
            max_x: top_left.x + size.width,
            max_y: top_left.y + size.height,
        }
    }

    /// Creates the smallest bounds containing every point, or `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        points.into_iter().fold(None, |acc: Option<Self>, p| {
            let point_bounds = Self {
                min_x: p.x,
                min_y: p.y,
                max_x: p.x,
                max_y: p.y,
            };
            Some(match acc {
                Some(bounds) => bounds.merge(&point_bounds),
                None => point_bounds,
            })
        })
    }

    /// Returns the minimum x-coordinate of the bounds
    pub fn min_x(self) -> f64 {
        self.min_x
    }

    /// Returns the minimum y-coordinate of the bounds
    pub fn min_y(self) -> f64 {
        self.min_y
    }

    /// Returns the maximum x-coordinate of the bounds
    pub fn max_x(self) -> f64 {
        self.max_x
    }

    /// Returns the maximum y-coordinate of the bounds
    pub fn max_y(self) -> f64 {
        self.max_y
    }

    /// Returns the center point of the bounds
    pub fn center(self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Returns the width of the bounds
    pub fn width(self) -> f64 {
        self.max_x - self.min_x
    }

    /// Returns the height of the bounds
    pub fn height(self) -> f64 {
        self.max_y - self.min_y
    }

    /// Returns the top-left corner as a Point
    pub fn min_point(self) -> Point {
        Point {
            x: self.min_x,
            y: self.min_y,
        }
    }

    /// Returns the bottom-right corner as a Point
    pub fn max_point(self) -> Point {
        Point {
            x: self.max_x,
            y: self.max_y,
        }
    }

    /// Returns the four corners, clockwise from the top-left.
    pub fn corners(self) -> [Point; 4] {
        [
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.max_x, self.max_y),
            Point::new(self.min_x, self.max_y),
        ]
    }

    /// Converts bounds to a Size object
    pub fn to_size(self) -> Size {
        Size {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Merges two bounds to create a larger bounds that contains both.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tangram_core::geometry::{Bounds, Point, Size};
    /// let header = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(100.0, 30.0));
    /// let content = Bounds::new_from_top_left(Point::new(10.0, 40.0), Size::new(120.0, 80.0));
    ///
    /// let combined = header.merge(&content);
    /// assert_eq!(combined.min_x(), 0.0);
    /// assert_eq!(combined.width(), 130.0);
    /// assert_eq!(combined.height(), 120.0);
    /// ```
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Moves the bounds by the specified offset.
    pub fn translate(&self, offset: Point) -> Self {
        Self {
            min_x: self.min_x + offset.x,
            min_y: self.min_y + offset.y,
            max_x: self.max_x + offset.x,
            max_y: self.max_y + offset.y,
        }
    }

    /// Shrinks the bounds inward by the insets, never past a zero extent.
    pub fn inset(&self, insets: Insets) -> Self {
        let min_x = self.min_x + insets.left;
        let min_y = self.min_y + insets.top;
        Self {
            min_x,
            min_y,
            max_x: (self.max_x - insets.right).max(min_x),
            max_y: (self.max_y - insets.bottom).max(min_y),
        }
    }

    /// Returns true if the two bounds share any area or edge.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Point at the relative position `rate` inside the bounds (`0,0` top-left, `1,1` bottom-right).
    pub fn point_at_rate(&self, rate: Point) -> Point {
        Point::new(
            self.min_x + self.width() * rate.x,
            self.min_y + self.height() * rate.y,
        )
    }
}

/// Padding/margin values for the four sides of a box
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Insets {
    top: f64,
    right: f64,
    bottom: f64,
    left: f64,
}

impl Insets {
    /// Creates new insets in CSS order: top, right, bottom, left
    pub fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Creates insets with the same value on every side
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn top(self) -> f64 {
        self.top
    }

    pub fn right(self) -> f64 {
        self.right
    }

    pub fn bottom(self) -> f64 {
        self.bottom
    }

    pub fn left(self) -> f64 {
        self.left
    }

    /// Sum of left and right insets
    pub fn horizontal_sum(self) -> f64 {
        self.left + self.right
    }

    /// Sum of top and bottom insets
    pub fn vertical_sum(self) -> f64 {
        self.top + self.bottom
    }
}

/// A 2D affine transform.
///
/// Coefficients follow the SVG `matrix(a b c d e f)` convention:
///
/// ```text
/// x' = a·x + c·y + e
/// y' = b·x + d·y + f
/// ```
///
/// # Examples
///
/// ```
/// # use tangram_core::geometry::{Affine, Point};
/// let t = Affine::translation(10.0, 0.0).then(&Affine::scaling(2.0, 2.0));
/// assert_eq!(t.apply(Point::new(1.0, 1.0)), Point::new(22.0, 2.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Affine {
    /// Creates a transform from raw coefficients.
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Pure translation.
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, dx, dy)
    }

    /// Axis-aligned scale about the origin.
    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation by `angle` radians about `center`.
    pub fn rotation_about(center: Point, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::translation(-center.x, -center.y)
            .then(&Self::new(cos, sin, -sin, cos, 0.0, 0.0))
            .then(&Self::translation(center.x, center.y))
    }

    /// Axis-aligned transform mapping `src` onto `dst`.
    ///
    /// An axis along which `src` has zero extent is mapped by translation only,
    /// keeping a scale factor of 1 so degenerate shapes never divide by zero.
    pub fn map_bounds(src: Bounds, dst: Bounds) -> Self {
        let sx = if src.width().abs() < EPSILON {
            1.0
        } else {
            dst.width() / src.width()
        };
        let sy = if src.height().abs() < EPSILON {
            1.0
        } else {
            dst.height() / src.height()
        };
        Self::new(
            sx,
            0.0,
            0.0,
            sy,
            dst.min_x - src.min_x * sx,
            dst.min_y - src.min_y * sy,
        )
    }

    /// Composes two transforms: the result applies `self` first, then `next`.
    pub fn then(&self, next: &Affine) -> Self {
        Self {
            a: next.a * self.a + next.c * self.b,
            b: next.b * self.a + next.d * self.b,
            c: next.a * self.c + next.c * self.d,
            d: next.b * self.c + next.d * self.d,
            e: next.a * self.e + next.c * self.f + next.e,
            f: next.b * self.e + next.d * self.f + next.f,
        }
    }

    /// Applies the transform to a point.
    pub fn apply(&self, point: Point) -> Point {
        Point::new(
            self.a * point.x + self.c * point.y + self.e,
            self.b * point.x + self.d * point.y + self.f,
        )
    }

    /// Applies only the linear part (no translation) to a vector.
    pub fn apply_vector(&self, vector: Point) -> Point {
        Point::new(
            self.a * vector.x + self.c * vector.y,
            self.b * vector.x + self.d * vector.y,
        )
    }

    /// Returns true if the transform has no rotation or skew component.
    pub fn is_axis_aligned(&self) -> bool {
        self.b.abs() < EPSILON && self.c.abs() < EPSILON
    }

    /// Bounds of a box after transformation.
    pub fn apply_bounds(&self, bounds: Bounds) -> Bounds {
        Bounds::from_points(bounds.corners().map(|corner| self.apply(corner)))
            .unwrap_or(bounds)
    }
}


#[cfg(test)]
mod proptest_tests {
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    use super::*;

    // ===================
    // Strategies
    // ===================

    fn bounds_strategy() -> impl Strategy<Value = Bounds> {
        (
            -1000.0f64..1000.0,
            -1000.0f64..1000.0,
            1.0f64..500.0,
            1.0f64..500.0,
        )
            .prop_map(|(x, y, w, h)| Bounds::new_from_top_left(Point::new(x, y), Size::new(w, h)))
    }

    fn point_strategy() -> impl Strategy<Value = Point> {
        (-1000.0f64..1000.0, -1000.0f64..1000.0).prop_map(|(x, y)| Point::new(x, y))
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Merged bounds should contain both original bounds.
    fn check_bounds_merge_contains_both(b1: Bounds, b2: Bounds) -> Result<(), TestCaseError> {
        let merged = b1.merge(&b2);

        for bounds in [b1, b2] {
            prop_assert!(merged.min_x() <= bounds.min_x());
            prop_assert!(merged.min_y() <= bounds.min_y());
            prop_assert!(merged.max_x() >= bounds.max_x());
            prop_assert!(merged.max_y() >= bounds.max_y());
        }
        Ok(())
    }

    /// Mapping bounds onto other bounds should land exactly on the target corners.
    fn check_map_bounds_hits_corners(src: Bounds, dst: Bounds) -> Result<(), TestCaseError> {
        let t = Affine::map_bounds(src, dst);
        let min = t.apply(src.min_point());
        let max = t.apply(src.max_point());

        prop_assert!(approx_eq!(f64, min.x(), dst.min_x(), epsilon = 1e-6));
        prop_assert!(approx_eq!(f64, min.y(), dst.min_y(), epsilon = 1e-6));
        prop_assert!(approx_eq!(f64, max.x(), dst.max_x(), epsilon = 1e-6));
        prop_assert!(approx_eq!(f64, max.y(), dst.max_y(), epsilon = 1e-6));
        Ok(())
    }

    /// Rotating forth and back should return the original point.
    fn check_rotation_roundtrip(p: Point, center: Point, angle: f64) -> Result<(), TestCaseError> {
        let back = p.rotate_around(center, angle).rotate_around(center, -angle);

        prop_assert!(approx_eq!(f64, back.x(), p.x(), epsilon = 1e-6));
        prop_assert!(approx_eq!(f64, back.y(), p.y(), epsilon = 1e-6));
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn bounds_merge_contains_both(b1 in bounds_strategy(), b2 in bounds_strategy()) {
            check_bounds_merge_contains_both(b1, b2)?;
        }

        #[test]
        fn map_bounds_hits_corners(src in bounds_strategy(), dst in bounds_strategy()) {
            check_map_bounds_hits_corners(src, dst)?;
        }

        #[test]
        fn rotation_roundtrip(p in point_strategy(), center in point_strategy(), angle in -6.3f64..6.3) {
            check_rotation_roundtrip(p, center, angle)?;
        }
    }
}
