//! The shape record and its geometric and relational parts.
//!
//! A [`Shape`] is a flat record: common identity fields, a [`Geometry`], and a
//! set of optional relational fields read by the layout rules. The meaning of a
//! shape's [`ShapeType`] is not known here; it is resolved through the shape
//! registry of the `tangram` crate.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    geometry::{Bounds, EPSILON, Insets, Point, Size},
    identifier::Id,
    order_key::OrderKey,
};

/// Discriminant of a shape, resolved through the shape registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeType(Id);

impl ShapeType {
    pub fn new(name: &str) -> Self {
        Self(Id::new(name))
    }

    pub fn id(self) -> Id {
        self.0
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Box geometry: the unrotated top-left corner, the size, and a rotation about the center.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RectGeometry {
    pub p: Point,
    pub width: f64,
    pub height: f64,
    /// Rotation in radians about the box center.
    #[serde(default)]
    pub rotation: f64,
}

impl RectGeometry {
    pub fn new(p: Point, width: f64, height: f64) -> Self {
        Self {
            p,
            width,
            height,
            rotation: 0.0,
        }
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// The box ignoring rotation.
    pub fn unrotated_bounds(&self) -> Bounds {
        Bounds::new_from_top_left(self.p, self.size())
    }

    pub fn center(&self) -> Point {
        self.unrotated_bounds().center()
    }

    /// Corners after rotation, clockwise from the unrotated top-left.
    pub fn corners(&self) -> [Point; 4] {
        let center = self.center();
        self.unrotated_bounds()
            .corners()
            .map(|corner| corner.rotate_around(center, self.rotation))
    }

    /// Axis-aligned bounds of the rotated box.
    pub fn bounds(&self) -> Bounds {
        if self.rotation == 0.0 {
            return self.unrotated_bounds();
        }
        Bounds::from_points(self.corners()).unwrap_or_else(|| self.unrotated_bounds())
    }

    /// Point at a relative position inside the box, honoring rotation.
    pub fn point_at_rate(&self, rate: Point) -> Point {
        self.unrotated_bounds()
            .point_at_rate(rate)
            .rotate_around(self.center(), self.rotation)
    }

    /// Returns a copy moved by `offset`.
    pub fn translated(&self, offset: Point) -> Self {
        Self {
            p: self.p.add_point(offset),
            ..*self
        }
    }

    fn approx_eq(&self, other: &Self) -> bool {
        self.p.approx_eq(other.p)
            && (self.width - other.width).abs() < EPSILON
            && (self.height - other.height).abs() < EPSILON
            && (self.rotation - other.rotation).abs() < EPSILON
    }
}

/// Polyline geometry from `p` through the `body` vertices to `q`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineGeometry {
    pub p: Point,
    pub q: Point,
    #[serde(default)]
    pub body: Vec<Point>,
    /// Elbow lines are routed orthogonally; their body is derived.
    #[serde(default)]
    pub elbow: bool,
}

impl LineGeometry {
    pub fn new(p: Point, q: Point) -> Self {
        Self {
            p,
            q,
            body: Vec::new(),
            elbow: false,
        }
    }

    pub fn with_elbow(mut self, elbow: bool) -> Self {
        self.elbow = elbow;
        self
    }

    pub fn with_body(mut self, body: Vec<Point>) -> Self {
        self.body = body;
        self
    }

    /// All vertices in order, endpoints included.
    pub fn vertices(&self) -> Vec<Point> {
        let mut vertices = Vec::with_capacity(self.body.len() + 2);
        vertices.push(self.p);
        vertices.extend(self.body.iter().copied());
        vertices.push(self.q);
        vertices
    }

    pub fn length(&self) -> f64 {
        self.vertices()
            .windows(2)
            .map(|segment| segment[0].distance(segment[1]))
            .sum()
    }

    /// Point at `rate` (0 = `p`, 1 = `q`) along the polyline and the angle of
    /// the segment it lies on.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tangram_core::{geometry::Point, shape::LineGeometry};
    /// let line = LineGeometry::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0))
    ///     .with_body(vec![Point::new(10.0, 0.0)]);
    /// let (point, angle) = line.point_at_rate(0.75);
    /// assert_eq!(point, Point::new(10.0, 5.0));
    /// assert!((angle - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    /// ```
    pub fn point_at_rate(&self, rate: f64) -> (Point, f64) {
        let vertices = self.vertices();
        let total = self.length();
        if total < EPSILON {
            return (self.p, 0.0);
        }

        let target = total * rate.clamp(0.0, 1.0);
        let mut walked = 0.0;
        let mut last = (self.q, 0.0);
        for segment in vertices.windows(2) {
            let (from, to) = (segment[0], segment[1]);
            let length = from.distance(to);
            if length < EPSILON {
                continue;
            }
            let angle = from.angle_to(to);
            if walked + length >= target {
                return (from.lerp(to, (target - walked) / length), angle);
            }
            walked += length;
            last = (to, angle);
        }
        last
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_points(self.vertices())
            .unwrap_or_else(|| Bounds::new_from_top_left(self.p, Size::default()))
    }

    fn approx_eq(&self, other: &Self) -> bool {
        self.elbow == other.elbow
            && self.body.len() == other.body.len()
            && self
                .vertices()
                .iter()
                .zip(other.vertices())
                .all(|(a, b)| a.approx_eq(b))
    }
}

/// Geometry of a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Geometry {
    Rect(RectGeometry),
    Line(LineGeometry),
}

impl Geometry {
    /// Axis-aligned bounds of the geometry.
    pub fn bounds(&self) -> Bounds {
        match self {
            Geometry::Rect(rect) => rect.bounds(),
            Geometry::Line(line) => line.bounds(),
        }
    }

    /// Equality within [`EPSILON`] on every coordinate.
    pub fn approx_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Geometry::Rect(a), Geometry::Rect(b)) => a.approx_eq(b),
            (Geometry::Line(a), Geometry::Line(b)) => a.approx_eq(b),
            _ => false,
        }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry::Rect(RectGeometry::default())
    }
}

/// A line endpoint bound to a shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// The connected shape.
    pub id: Id,
    /// Relative position inside the connected shape's box.
    pub rate: Point,
}

impl Connection {
    pub fn new(id: Id, rate: Point) -> Self {
        Self { id, rate }
    }
}

/// How an attached shape's rotation follows its host line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationType {
    /// Rotation = host segment angle + the attachment's own rotation.
    #[default]
    Relative,
    /// Rotation stays as set on the shape.
    Absolute,
}

/// A shape pinned to a point along a host line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// The host line.
    pub id: Id,
    /// Rate along the host line, `0..=1`.
    pub to: f64,
    /// The point of the attached shape placed on the line, relative to its box.
    pub anchor: Point,
    #[serde(default)]
    pub rotation_type: RotationType,
    /// Extra rotation applied on top of the segment angle for relative attachments.
    #[serde(default)]
    pub rotation: f64,
}

impl Attachment {
    pub fn new(id: Id, to: f64) -> Self {
        Self {
            id,
            to,
            anchor: Point::new(0.5, 0.5),
            rotation_type: RotationType::Relative,
            rotation: 0.0,
        }
    }

    pub fn with_anchor(mut self, anchor: Point) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_rotation_type(mut self, rotation_type: RotationType) -> Self {
        self.rotation_type = rotation_type;
        self
    }
}

/// Cardinal direction of a tree node relative to its tree parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    #[default]
    Right,
    Down,
    Left,
}

impl Direction {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Right | Direction::Left)
    }

    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];
}

/// Main axis of an alignment box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignDirection {
    #[default]
    Row,
    Column,
}

/// Arrangement of an alignment box's members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignLayout {
    #[serde(default)]
    pub direction: AlignDirection,
    #[serde(default)]
    pub gap: f64,
    #[serde(default)]
    pub padding: Insets,
    /// Maximum main-axis extent of a line of members before wrapping.
    #[serde(default)]
    pub wrap: Option<f64>,
}

impl AlignLayout {
    pub fn new(direction: AlignDirection, gap: f64) -> Self {
        Self {
            direction,
            gap,
            ..Self::default()
        }
    }

    pub fn with_padding(mut self, padding: Insets) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_wrap(mut self, wrap: f64) -> Self {
        self.wrap = Some(wrap);
        self
    }
}

/// Group constraint codes, one per axis. `0` scales with the group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupConstraint {
    #[serde(default)]
    pub vertical: u8,
    #[serde(default)]
    pub horizontal: u8,
}

impl GroupConstraint {
    pub fn new(vertical: u8, horizontal: u8) -> Self {
        Self {
            vertical,
            horizontal,
        }
    }

    pub fn vertical(code: u8) -> Self {
        Self::new(code, 0)
    }

    pub fn is_default(self) -> bool {
        self.vertical == 0 && self.horizontal == 0
    }
}

/// A shape on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: Id,
    pub findex: OrderKey,
    #[serde(default)]
    pub parent_id: Option<Id>,
    pub shape_type: ShapeType,
    pub geometry: Geometry,
    #[serde(default)]
    pub attachment: Option<Attachment>,
    #[serde(default)]
    pub p_connection: Option<Connection>,
    #[serde(default)]
    pub q_connection: Option<Connection>,
    /// Rate along the parent line for line-bound labels.
    #[serde(default)]
    pub line_attached: Option<f64>,
    /// Direct tree parent; `parent_id` of a tree node is its tree root.
    #[serde(default)]
    pub tree_parent_id: Option<Id>,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub column_id: Option<Id>,
    #[serde(default)]
    pub lane_id: Option<Id>,
    #[serde(default)]
    pub align: Option<AlignLayout>,
    #[serde(default)]
    pub constraint: GroupConstraint,
}

impl Shape {
    /// Creates a shape with the zero ordering key and no relations.
    pub fn new(id: Id, shape_type: ShapeType, geometry: Geometry) -> Self {
        Self {
            id,
            findex: OrderKey::default(),
            parent_id: None,
            shape_type,
            geometry,
            attachment: None,
            p_connection: None,
            q_connection: None,
            line_attached: None,
            tree_parent_id: None,
            direction: None,
            column_id: None,
            lane_id: None,
            align: None,
            constraint: GroupConstraint::default(),
        }
    }

    pub fn with_findex(mut self, findex: OrderKey) -> Self {
        self.findex = findex;
        self
    }

    pub fn with_parent(mut self, parent_id: Id) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_p_connection(mut self, connection: Connection) -> Self {
        self.p_connection = Some(connection);
        self
    }

    pub fn with_q_connection(mut self, connection: Connection) -> Self {
        self.q_connection = Some(connection);
        self
    }

    pub fn with_line_attached(mut self, rate: f64) -> Self {
        self.line_attached = Some(rate);
        self
    }

    pub fn with_tree_parent(mut self, tree_parent_id: Id, direction: Direction) -> Self {
        self.tree_parent_id = Some(tree_parent_id);
        self.direction = Some(direction);
        self
    }

    pub fn with_board_cell(mut self, column_id: Id, lane_id: Option<Id>) -> Self {
        self.column_id = Some(column_id);
        self.lane_id = lane_id;
        self
    }

    pub fn with_align(mut self, align: AlignLayout) -> Self {
        self.align = Some(align);
        self
    }

    pub fn with_constraint(mut self, constraint: GroupConstraint) -> Self {
        self.constraint = constraint;
        self
    }

    pub fn rect(&self) -> Option<&RectGeometry> {
        match &self.geometry {
            Geometry::Rect(rect) => Some(rect),
            Geometry::Line(_) => None,
        }
    }

    pub fn line(&self) -> Option<&LineGeometry> {
        match &self.geometry {
            Geometry::Line(line) => Some(line),
            Geometry::Rect(_) => None,
        }
    }

    /// Ids referenced by the relational fields, excluding `parent_id`.
    pub fn relation_ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.attachment
            .map(|attachment| attachment.id)
            .into_iter()
            .chain(self.p_connection.map(|connection| connection.id))
            .chain(self.q_connection.map(|connection| connection.id))
            .chain(self.tree_parent_id)
            .chain(self.column_id)
            .chain(self.lane_id)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use float_cmp::assert_approx_eq;

    use super::*;

    #[test]
    fn test_rect_rotated_bounds() {
        let rect = RectGeometry::new(Point::new(0.0, 0.0), 20.0, 10.0).with_rotation(FRAC_PI_2);
        let bounds = rect.bounds();

        assert_approx_eq!(f64, bounds.min_x(), 5.0, epsilon = 1e-9);
        assert_approx_eq!(f64, bounds.min_y(), -5.0, epsilon = 1e-9);
        assert_approx_eq!(f64, bounds.width(), 10.0, epsilon = 1e-9);
        assert_approx_eq!(f64, bounds.height(), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rect_point_at_rate() {
        let rect = RectGeometry::new(Point::new(10.0, 10.0), 20.0, 10.0);
        assert_eq!(rect.point_at_rate(Point::new(1.0, 0.5)), Point::new(30.0, 15.0));

        let rotated = rect.with_rotation(FRAC_PI_2);
        let point = rotated.point_at_rate(Point::new(1.0, 0.5));
        assert_approx_eq!(f64, point.x(), 20.0, epsilon = 1e-9);
        assert_approx_eq!(f64, point.y(), 25.0, epsilon = 1e-9);
    }

    #[test]
    fn test_line_point_at_rate_endpoints() {
        let line = LineGeometry::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0));

        assert_eq!(line.point_at_rate(0.0).0, Point::new(0.0, 0.0));
        assert_eq!(line.point_at_rate(1.0).0, Point::new(10.0, 0.0));
        assert_eq!(line.point_at_rate(0.5).0, Point::new(5.0, 0.0));
        assert_eq!(line.point_at_rate(2.0).0, Point::new(10.0, 0.0));
    }

    #[test]
    fn test_degenerate_line_point_at_rate() {
        let line = LineGeometry::new(Point::new(3.0, 3.0), Point::new(3.0, 3.0));
        assert_eq!(line.point_at_rate(0.5), (Point::new(3.0, 3.0), 0.0));
    }

    #[test]
    fn test_geometry_approx_eq() {
        let a = Geometry::Rect(RectGeometry::new(Point::new(0.0, 0.0), 10.0, 10.0));
        let b = Geometry::Rect(RectGeometry::new(Point::new(1e-12, 0.0), 10.0, 10.0));
        let c = Geometry::Line(LineGeometry::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0)));

        assert!(a.approx_eq(&b));
        assert!(!a.approx_eq(&c));
    }

    #[test]
    fn test_relation_ids() {
        let shape = Shape::new(
            Id::new("label"),
            ShapeType::new("text"),
            Geometry::default(),
        )
        .with_attachment(Attachment::new(Id::new("host"), 0.5))
        .with_board_cell(Id::new("column"), Some(Id::new("lane")));

        let ids: Vec<Id> = shape.relation_ids().collect();
        assert_eq!(ids, vec![Id::new("host"), Id::new("column"), Id::new("lane")]);
    }
}
