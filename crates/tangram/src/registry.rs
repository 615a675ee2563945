//! Shape-type registry and per-type capabilities.
//!
//! The engine never dispatches on shape type names. Every type-specific
//! decision goes through a [`ShapeStruct`] looked up in a [`ShapeRegistry`];
//! an unregistered type falls back to plain rectangle behavior.
//!
//! # Overview
//!
//! - [`ShapeStruct`] - Capabilities of one shape type
//! - [`ShapeRole`] - Structural category read by the layout rules
//! - [`ShapeRegistry`] - Map from [`ShapeType`] to its [`ShapeStruct`]

use std::fmt;

use indexmap::{IndexMap, IndexSet};

use tangram_core::{
    geometry::{Affine, Bounds, Insets, Point},
    identifier::Id,
    patch::PartialShape,
    shape::{Attachment, Connection, Geometry, LineGeometry, RectGeometry, Shape, ShapeType},
};

use crate::composite::ShapeComposite;

mod align_box;
mod board;
mod ellipse;
mod group;
mod line;
mod rectangle;
mod text;
mod tree;

pub use align_box::AlignBoxStruct;
pub use board::{BoardCardStruct, BoardColumnStruct, BoardLaneStruct, BoardRootStruct};
pub use ellipse::EllipseStruct;
pub use group::GroupStruct;
pub use line::LineStruct;
pub use rectangle::RectangleStruct;
pub use text::TextStruct;
pub use tree::{TreeNodeStruct, TreeRootStruct};

pub const RECTANGLE: &str = "rectangle";
pub const ELLIPSE: &str = "ellipse";
pub const TEXT: &str = "text";
pub const LINE: &str = "line";
pub const GROUP: &str = "group";
pub const TREE_ROOT: &str = "tree_root";
pub const TREE_NODE: &str = "tree_node";
pub const BOARD_ROOT: &str = "board_root";
pub const BOARD_COLUMN: &str = "board_column";
pub const BOARD_LANE: &str = "board_lane";
pub const BOARD_CARD: &str = "board_card";
pub const ALIGN_BOX: &str = "align_box";

/// Inner padding between a box edge and its text area.
const TEXT_PADDING: f64 = 4.0;

/// Structural category of a shape type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeRole {
    Plain,
    Line,
    Group,
    TreeRoot,
    TreeNode,
    BoardRoot,
    BoardColumn,
    BoardLane,
    BoardCard,
    AlignBox,
}

/// Capabilities of a shape type.
///
/// A new type supplies at minimum a factory ([`ShapeStruct::create`]) and a
/// transform ([`ShapeStruct::transform`]); every other capability has a
/// default suited to a plain box.
pub trait ShapeStruct: fmt::Debug {
    /// Builds a new shape of this type.
    fn create(&self, id: Id, geometry: Geometry) -> Shape;

    /// Fields to update so that `shape` follows `affine`.
    fn transform(&self, shape: &Shape, affine: &Affine) -> PartialShape;

    fn role(&self) -> ShapeRole {
        ShapeRole::Plain
    }

    /// Bounds of the shape computed from its own geometry.
    fn local_bounds(&self, shape: &Shape) -> Bounds {
        shape.geometry.bounds()
    }

    /// Returns true if the bounds of this type are the union of its children's bounds.
    fn bounds_from_children(&self) -> bool {
        false
    }

    /// Axis-aligned bounds of `shape`, given the bounds of its children.
    ///
    /// `children` is only drawn from when [`ShapeStruct::bounds_from_children`]
    /// holds; a childless shape of such a type falls back to its own geometry.
    fn bounds(&self, shape: &Shape, children: &mut dyn Iterator<Item = Bounds>) -> Bounds {
        if self.bounds_from_children() {
            if let Some(union) = children.reduce(|acc, bounds| acc.merge(&bounds)) {
                return union;
            }
        }
        self.local_bounds(shape)
    }

    /// Existence precondition: returns true once the shape must be deleted
    /// because the shapes in `removed` are gone.
    fn should_delete(
        &self,
        _shape: &Shape,
        _composite: &ShapeComposite,
        _removed: &IndexSet<Id>,
    ) -> bool {
        false
    }

    /// Fields turning this shape into a plain shape after its structure vanished.
    fn demote(&self, _shape: &Shape) -> PartialShape {
        PartialShape::default()
    }

    /// Area available to the shape's text, if it has any.
    fn text_bounds(&self, shape: &Shape) -> Option<Bounds> {
        shape
            .rect()
            .map(|rect| rect.unrotated_bounds().inset(Insets::uniform(TEXT_PADDING)))
    }

    /// Outline of the shape as a polygon, clockwise.
    fn clip_path(&self, shape: &Shape) -> Option<Vec<Point>> {
        shape.rect().map(|rect| rect.corners().to_vec())
    }

    /// Copy of `shape` with every referenced id passed through `remap`.
    ///
    /// `remap` returns the new id for a copied shape and `None` for a shape
    /// outside the copy set. Connections and attachments to shapes outside
    /// the set are dropped; structural references keep their original id.
    fn remap_relations(&self, shape: &Shape, remap: &dyn Fn(Id) -> Option<Id>) -> Shape {
        let keep = |id: Id| remap(id).unwrap_or(id);
        let mut copy = shape.clone();
        copy.parent_id = shape.parent_id.map(keep);
        copy.tree_parent_id = shape.tree_parent_id.map(keep);
        copy.column_id = shape.column_id.map(keep);
        copy.lane_id = shape.lane_id.map(keep);
        copy.attachment = shape.attachment.and_then(|attachment| {
            remap(attachment.id).map(|id| Attachment { id, ..attachment })
        });
        copy.p_connection = shape.p_connection.and_then(|connection| {
            remap(connection.id).map(|id| Connection { id, ..connection })
        });
        copy.q_connection = shape.q_connection.and_then(|connection| {
            remap(connection.id).map(|id| Connection { id, ..connection })
        });
        copy
    }
}

/// Maps a box through `affine`.
///
/// The center follows the transform; each side length is scaled by the length
/// of the transformed axis, and the rotation picks up the transform's rotation.
pub(crate) fn transform_rect(rect: &RectGeometry, affine: &Affine) -> RectGeometry {
    let center = affine.apply(rect.center());
    let x_axis = affine.apply_vector(Point::new(1.0, 0.0).rotate(rect.rotation));
    let y_axis = affine.apply_vector(Point::new(0.0, 1.0).rotate(rect.rotation));
    let width = rect.width * x_axis.hypot();
    let height = rect.height * y_axis.hypot();
    let rotation = if affine.is_axis_aligned() && rect.rotation == 0.0 {
        0.0
    } else {
        Point::new(0.0, 0.0).angle_to(x_axis)
    };

    RectGeometry {
        p: Point::new(center.x() - width / 2.0, center.y() - height / 2.0),
        width,
        height,
        rotation,
    }
}

/// Maps every vertex of a line through `affine`.
pub(crate) fn transform_line(line: &LineGeometry, affine: &Affine) -> LineGeometry {
    LineGeometry {
        p: affine.apply(line.p),
        q: affine.apply(line.q),
        body: line.body.iter().map(|point| affine.apply(*point)).collect(),
        elbow: line.elbow,
    }
}

/// Transform shared by every box-shaped type.
pub(crate) fn transform_geometry(shape: &Shape, affine: &Affine) -> PartialShape {
    let geometry = match &shape.geometry {
        Geometry::Rect(rect) => Geometry::Rect(transform_rect(rect, affine)),
        Geometry::Line(line) => Geometry::Line(transform_line(line, affine)),
    };
    PartialShape::default().with_geometry(geometry)
}

/// Fields reverting a structural member to a top-level rectangle.
pub(crate) fn demote_to_rectangle() -> PartialShape {
    PartialShape::default()
        .with_shape_type(ShapeType::new(RECTANGLE))
        .with_parent_id(None)
        .with_tree_parent_id(None)
        .with_direction(None)
        .with_column_id(None)
        .with_lane_id(None)
}

/// Map from shape type to its capabilities.
///
/// # Examples
///
/// ```
/// # use tangram::registry::{ShapeRegistry, ShapeRole};
/// # use tangram_core::shape::ShapeType;
/// let registry = ShapeRegistry::default();
/// assert_eq!(registry.get(ShapeType::new("board_card")).role(), ShapeRole::BoardCard);
/// // Unknown types behave like rectangles
/// assert_eq!(registry.get(ShapeType::new("hexagon")).role(), ShapeRole::Plain);
/// ```
pub struct ShapeRegistry {
    structs: IndexMap<ShapeType, Box<dyn ShapeStruct>>,
    fallback: Box<dyn ShapeStruct>,
}

impl ShapeRegistry {
    /// Creates a registry without any registered type.
    pub fn empty() -> Self {
        Self {
            structs: IndexMap::new(),
            fallback: Box::new(RectangleStruct),
        }
    }

    /// Creates a registry holding every built-in type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(RECTANGLE, Box::new(RectangleStruct));
        registry.register(ELLIPSE, Box::new(EllipseStruct));
        registry.register(TEXT, Box::new(TextStruct));
        registry.register(LINE, Box::new(LineStruct));
        registry.register(GROUP, Box::new(GroupStruct));
        registry.register(TREE_ROOT, Box::new(TreeRootStruct));
        registry.register(TREE_NODE, Box::new(TreeNodeStruct));
        registry.register(BOARD_ROOT, Box::new(BoardRootStruct));
        registry.register(BOARD_COLUMN, Box::new(BoardColumnStruct));
        registry.register(BOARD_LANE, Box::new(BoardLaneStruct));
        registry.register(BOARD_CARD, Box::new(BoardCardStruct));
        registry.register(ALIGN_BOX, Box::new(AlignBoxStruct));
        registry
    }

    /// Registers `shape_struct` for the type named `name`, replacing any earlier entry.
    pub fn register(&mut self, name: &str, shape_struct: Box<dyn ShapeStruct>) {
        self.structs.insert(ShapeType::new(name), shape_struct);
    }

    /// Returns the capabilities of `shape_type`, or the rectangle fallback.
    pub fn get(&self, shape_type: ShapeType) -> &dyn ShapeStruct {
        match self.structs.get(&shape_type) {
            Some(shape_struct) => shape_struct.as_ref(),
            None => self.fallback.as_ref(),
        }
    }

    pub fn contains(&self, shape_type: ShapeType) -> bool {
        self.structs.contains_key(&shape_type)
    }

    /// Builds a shape through the factory of `shape_type`.
    pub fn create(&self, shape_type: ShapeType, id: Id, geometry: Geometry) -> Shape {
        let mut shape = self.get(shape_type).create(id, geometry);
        shape.shape_type = shape_type;
        shape
    }

    /// Registered type names in registration order.
    pub fn shape_types(&self) -> impl Iterator<Item = ShapeType> + '_ {
        self.structs.keys().copied()
    }
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for ShapeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeRegistry")
            .field("structs", &self.structs.keys().collect::<Vec<_>>())
            .finish()
    }
}
