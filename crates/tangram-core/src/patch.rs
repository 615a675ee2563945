//! Shape patches: the unit of change exchanged between the editor and the engine.
//!
//! # Overview
//!
//! - [`PartialShape`] - A set of field overrides for one shape
//! - [`Patch`] - Shapes to add, partial updates keyed by id, and ids to delete
//!
//! Nullable shape fields are represented as `Option<Option<T>>` in a
//! [`PartialShape`]: `None` leaves the field untouched, `Some(None)` clears it.

use indexmap::{IndexMap, IndexSet};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    identifier::Id,
    order_key::OrderKey,
    shape::{AlignLayout, Attachment, Connection, Direction, Geometry, GroupConstraint, Shape, ShapeType},
};

/// Serde adapter distinguishing an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Field overrides for a single shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialShape {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub findex: Option<OrderKey>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub parent_id: Option<Option<Id>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_type: Option<ShapeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub attachment: Option<Option<Attachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub p_connection: Option<Option<Connection>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub q_connection: Option<Option<Connection>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub line_attached: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub tree_parent_id: Option<Option<Id>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub direction: Option<Option<Direction>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub column_id: Option<Option<Id>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub lane_id: Option<Option<Id>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub align: Option<Option<AlignLayout>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<GroupConstraint>,
}

/// Applies `$body` to every field name of [`PartialShape`].
macro_rules! for_each_field {
    ($body:ident!($($arg:tt)*)) => {
        $body!($($arg)*; findex, parent_id, shape_type, geometry, attachment,
            p_connection, q_connection, line_attached, tree_parent_id, direction,
            column_id, lane_id, align, constraint)
    };
}

macro_rules! overwrite_fields {
    ($target:ident, $source:ident; $($field:ident),*) => {{
        $(
            if let Some(value) = $source.$field {
                $target.$field = Some(value);
            }
        )*
    }};
}

macro_rules! apply_fields {
    ($shape:ident, $partial:ident; $($field:ident),*) => {{
        $(
            if let Some(value) = &$partial.$field {
                $shape.$field = value.clone();
            }
        )*
    }};
}

macro_rules! all_none {
    ($partial:ident; $($field:ident),*) => {
        true $(&& $partial.$field.is_none())*
    };
}

impl PartialShape {
    /// Returns true if the partial overrides no field.
    pub fn is_empty(&self) -> bool {
        let partial = self;
        for_each_field!(all_none!(partial))
    }

    /// Overlays `other` on this partial; fields set in `other` win.
    pub fn merge(&mut self, other: PartialShape) {
        let target = self;
        for_each_field!(overwrite_fields!(target, other));
    }

    /// Returns `shape` with every overridden field replaced.
    pub fn apply_to(&self, shape: &Shape) -> Shape {
        let mut shape = shape.clone();
        let partial = self;
        for_each_field!(apply_fields!(shape, partial));
        shape
    }

    /// Partial holding exactly the fields that differ between `before` and `after`.
    ///
    /// Geometry is compared within [`crate::geometry::EPSILON`], so recomputing
    /// the same layout never produces a spurious change.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tangram_core::{geometry::Point, identifier::Id, patch::PartialShape,
    /// #     shape::{Geometry, RectGeometry, Shape, ShapeType}};
    /// let before = Shape::new(
    ///     Id::new("card"),
    ///     ShapeType::new("rectangle"),
    ///     Geometry::Rect(RectGeometry::new(Point::new(0.0, 0.0), 10.0, 10.0)),
    /// );
    /// let after = before.clone().with_parent(Id::new("group"));
    ///
    /// let diff = PartialShape::diff(&before, &after);
    /// assert_eq!(diff.parent_id, Some(Some(Id::new("group"))));
    /// assert!(diff.geometry.is_none());
    /// ```
    pub fn diff(before: &Shape, after: &Shape) -> PartialShape {
        fn changed<T: Clone + PartialEq>(before: &T, after: &T) -> Option<T> {
            (before != after).then(|| after.clone())
        }

        PartialShape {
            findex: changed(&before.findex, &after.findex),
            parent_id: changed(&before.parent_id, &after.parent_id),
            shape_type: changed(&before.shape_type, &after.shape_type),
            geometry: (!before.geometry.approx_eq(&after.geometry))
                .then(|| after.geometry.clone()),
            attachment: changed(&before.attachment, &after.attachment),
            p_connection: changed(&before.p_connection, &after.p_connection),
            q_connection: changed(&before.q_connection, &after.q_connection),
            line_attached: changed(&before.line_attached, &after.line_attached),
            tree_parent_id: changed(&before.tree_parent_id, &after.tree_parent_id),
            direction: changed(&before.direction, &after.direction),
            column_id: changed(&before.column_id, &after.column_id),
            lane_id: changed(&before.lane_id, &after.lane_id),
            align: changed(&before.align, &after.align),
            constraint: changed(&before.constraint, &after.constraint),
        }
    }

    /// Partial that sets every field of `shape`.
    pub fn from_shape(shape: &Shape) -> PartialShape {
        PartialShape {
            findex: Some(shape.findex.clone()),
            parent_id: Some(shape.parent_id),
            shape_type: Some(shape.shape_type),
            geometry: Some(shape.geometry.clone()),
            attachment: Some(shape.attachment),
            p_connection: Some(shape.p_connection),
            q_connection: Some(shape.q_connection),
            line_attached: Some(shape.line_attached),
            tree_parent_id: Some(shape.tree_parent_id),
            direction: Some(shape.direction),
            column_id: Some(shape.column_id),
            lane_id: Some(shape.lane_id),
            align: Some(shape.align),
            constraint: Some(shape.constraint),
        }
    }

    pub fn with_findex(mut self, findex: OrderKey) -> Self {
        self.findex = Some(findex);
        self
    }

    pub fn with_parent_id(mut self, parent_id: Option<Id>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_shape_type(mut self, shape_type: ShapeType) -> Self {
        self.shape_type = Some(shape_type);
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_attachment(mut self, attachment: Option<Attachment>) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_p_connection(mut self, connection: Option<Connection>) -> Self {
        self.p_connection = Some(connection);
        self
    }

    pub fn with_q_connection(mut self, connection: Option<Connection>) -> Self {
        self.q_connection = Some(connection);
        self
    }

    pub fn with_line_attached(mut self, rate: Option<f64>) -> Self {
        self.line_attached = Some(rate);
        self
    }

    pub fn with_tree_parent_id(mut self, tree_parent_id: Option<Id>) -> Self {
        self.tree_parent_id = Some(tree_parent_id);
        self
    }

    pub fn with_direction(mut self, direction: Option<Direction>) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_column_id(mut self, column_id: Option<Id>) -> Self {
        self.column_id = Some(column_id);
        self
    }

    pub fn with_lane_id(mut self, lane_id: Option<Id>) -> Self {
        self.lane_id = Some(lane_id);
        self
    }

    pub fn with_align(mut self, align: Option<AlignLayout>) -> Self {
        self.align = Some(align);
        self
    }

    pub fn with_constraint(mut self, constraint: GroupConstraint) -> Self {
        self.constraint = Some(constraint);
        self
    }
}

/// A batch of shape changes.
///
/// Adds are applied first, then updates (which may target added shapes),
/// then deletes. A deleted id never keeps an update entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    #[serde(default)]
    pub add: Vec<Shape>,
    #[serde(default)]
    pub update: IndexMap<Id, PartialShape>,
    #[serde(default)]
    pub delete: Vec<Id>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }

    pub fn with_add(mut self, shape: Shape) -> Self {
        self.add_shape(shape);
        self
    }

    pub fn with_update(mut self, id: Id, partial: PartialShape) -> Self {
        self.update_shape(id, partial);
        self
    }

    pub fn with_delete(mut self, id: Id) -> Self {
        self.delete_shape(id);
        self
    }

    /// Adds a shape, replacing an earlier add with the same id.
    pub fn add_shape(&mut self, shape: Shape) {
        match self.add.iter_mut().find(|added| added.id == shape.id) {
            Some(added) => *added = shape,
            None => self.add.push(shape),
        }
    }

    /// Merges `partial` into the update entry of `id`. Ignored for deleted ids.
    pub fn update_shape(&mut self, id: Id, partial: PartialShape) {
        if partial.is_empty() {
            return;
        }
        if self.is_deleted(id) {
            debug!(shape_id:% = id; "Ignoring update of deleted shape");
            return;
        }
        self.update.entry(id).or_default().merge(partial);
    }

    /// Marks `id` as touched without changing any field.
    pub fn touch(&mut self, id: Id) {
        if !self.is_deleted(id) {
            self.update.entry(id).or_default();
        }
    }

    /// Marks `id` deleted. A shape added by this patch is dropped instead.
    pub fn delete_shape(&mut self, id: Id) {
        self.update.shift_remove(&id);
        if let Some(pos) = self.add.iter().position(|added| added.id == id) {
            self.add.remove(pos);
            return;
        }
        if !self.delete.contains(&id) {
            self.delete.push(id);
        }
    }

    pub fn is_deleted(&self, id: Id) -> bool {
        self.delete.contains(&id)
    }

    pub fn partial(&self, id: Id) -> Option<&PartialShape> {
        self.update.get(&id)
    }

    /// Folds `other` into this patch as if it were applied after it.
    pub fn merge(&mut self, other: Patch) {
        for shape in other.add {
            self.add_shape(shape);
        }
        for (id, partial) in other.update {
            self.update_shape(id, partial);
        }
        for id in other.delete {
            self.delete_shape(id);
        }
    }

    /// Ids of shapes added or updated, in patch order, without duplicates.
    pub fn touched_ids(&self) -> IndexSet<Id> {
        self.add
            .iter()
            .map(|shape| shape.id)
            .chain(self.update.keys().copied())
            .collect()
    }
}
