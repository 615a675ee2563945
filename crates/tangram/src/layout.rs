//! Specialized layout rules.
//!
//! Every rule implements [`LayoutRule`]: given the state before a patch and
//! the patch itself, it returns a refinement that makes the structures touched
//! by the patch consistent again. Rules dispatch on the registry
//! [`ShapeRole`](crate::registry::ShapeRole) of shapes, never on type names,
//! and are idempotent on their own output.
//!
//! # Overview
//!
//! - [`TreeLayout`] - Tree nodes placed along their direction from their tree parent
//! - [`BoardLayout`] - Kanban columns, lanes, and cards on a grid
//! - [`AlignLayoutRule`] - Alignment boxes reflowing their members
//! - [`LineLayout`] - Line endpoints, elbow routes, attachments, and labels

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use log::warn;

use tangram_core::{
    geometry::{Bounds, Point},
    identifier::Id,
    patch::{PartialShape, Patch},
    shape::{Geometry, Shape},
};

use crate::{composite::ShapeComposite, config::EngineConfig};

mod align;
mod board;
mod line;
mod tree;

pub use align::AlignLayoutRule;
pub use board::BoardLayout;
pub use line::LineLayout;
pub use tree::TreeLayout;

/// A layout rule run by the convergence engine.
pub trait LayoutRule: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Returns the refinement that `patch` requires.
    ///
    /// # Arguments
    ///
    /// * `composite` - The state before `patch`.
    /// * `patch` - The change to react to; its result is `composite.apply_patch(patch)`.
    fn apply(&self, composite: &ShapeComposite, patch: &Patch) -> Patch;
}

/// The built-in rules in the order the convergence engine runs them.
pub fn default_rules(config: &EngineConfig) -> Vec<Box<dyn LayoutRule>> {
    vec![
        Box::new(TreeLayout::new(config.tree().clone())),
        Box::new(BoardLayout::new(config.board().clone())),
        Box::new(AlignLayoutRule),
        Box::new(LineLayout),
    ]
}

/// Ids a rule has to look at: the touched shapes, plus the referrers and
/// parents of deleted shapes, restricted to shapes that still exist.
pub(crate) fn affected_ids(
    composite: &ShapeComposite,
    patch: &Patch,
    next: &ShapeComposite,
) -> IndexSet<Id> {
    let mut ids = patch.touched_ids();
    if !patch.delete.is_empty() {
        let deleted: IndexSet<Id> = patch.delete.iter().copied().collect();
        ids.extend(composite.referrers(&deleted));
        ids.extend(
            patch
                .delete
                .iter()
                .filter_map(|id| composite.parent_id(*id)),
        );
    }
    ids.retain(|id| next.contains(*id));
    ids
}

/// Working copy of the shapes a rule rewrites.
///
/// Reads fall through to the snapshot for shapes not yet rewritten;
/// [`Refinement::into_patch`] keeps only the fields that actually changed.
pub(crate) struct Refinement<'a> {
    base: &'a ShapeComposite,
    shapes: IndexMap<Id, Shape>,
    deleted: IndexSet<Id>,
}

impl<'a> Refinement<'a> {
    pub(crate) fn new(base: &'a ShapeComposite) -> Self {
        Self {
            base,
            shapes: IndexMap::new(),
            deleted: IndexSet::new(),
        }
    }

    pub(crate) fn base(&self) -> &'a ShapeComposite {
        self.base
    }

    /// Current version of `id`, `None` once deleted.
    pub(crate) fn shape(&self, id: Id) -> Option<&Shape> {
        if self.deleted.contains(&id) {
            return None;
        }
        self.shapes.get(&id).or_else(|| self.base.shape(id))
    }

    pub(crate) fn update(&mut self, id: Id, partial: &PartialShape) {
        if let Some(shape) = self.shape(id) {
            let updated = partial.apply_to(shape);
            self.shapes.insert(id, updated);
        }
    }

    pub(crate) fn set_geometry(&mut self, id: Id, geometry: Geometry) {
        self.update(id, &PartialShape::default().with_geometry(geometry));
    }

    /// Reverts `id` to a plain shape through its type's `demote` capability.
    pub(crate) fn demote(&mut self, id: Id) {
        let Some(shape) = self.shape(id) else {
            return;
        };
        let partial = self.base.shape_struct(shape).demote(shape);
        warn!(shape_id:% = id, shape_type:% = shape.shape_type; "Demoting shape without its structure");
        self.update(id, &partial);
    }

    pub(crate) fn delete(&mut self, id: Id) {
        self.shapes.shift_remove(&id);
        self.deleted.insert(id);
    }

    /// Bounds of `id` from the current versions; groups take the union of their children.
    pub(crate) fn bounds(&self, id: Id) -> Option<Bounds> {
        let shape = self.shape(id)?;
        let mut children = self
            .base
            .child_ids(id)
            .iter()
            .filter_map(|child| self.bounds(*child));
        Some(self.base.shape_struct(shape).bounds(shape, &mut children))
    }

    /// Moves `id` and its scene descendants by `offset`.
    pub(crate) fn translate_branch(&mut self, id: Id, offset: Point) {
        if offset.approx_eq(Point::default()) {
            return;
        }
        for branch_id in self.base.branch_ids(id) {
            self.translate(branch_id, offset);
        }
    }

    /// Moves the scene descendants of `id`, not `id` itself, by `offset`.
    pub(crate) fn translate_descendants(&mut self, id: Id, offset: Point) {
        if offset.approx_eq(Point::default()) {
            return;
        }
        for descendant in self.base.descendants(id) {
            self.translate(descendant, offset);
        }
    }

    fn translate(&mut self, id: Id, offset: Point) {
        let Some(shape) = self.shape(id) else {
            return;
        };
        if self.base.shape_struct(shape).bounds_from_children() {
            return;
        }
        let geometry = translate_geometry(&shape.geometry, offset);
        self.set_geometry(id, geometry);
    }

    /// The refinement relative to the snapshot.
    pub(crate) fn into_patch(self) -> Patch {
        let mut patch = Patch::new();
        for (id, shape) in &self.shapes {
            if let Some(before) = self.base.shape(*id) {
                patch.update_shape(*id, PartialShape::diff(before, shape));
            }
        }
        for id in self.deleted {
            if self.base.contains(id) {
                patch.delete_shape(id);
            }
        }
        patch
    }
}

pub(crate) fn translate_geometry(geometry: &Geometry, offset: Point) -> Geometry {
    match geometry {
        Geometry::Rect(rect) => Geometry::Rect(rect.translated(offset)),
        Geometry::Line(line) => {
            let mut line = line.clone();
            line.p = line.p.add_point(offset);
            line.q = line.q.add_point(offset);
            for point in &mut line.body {
                *point = point.add_point(offset);
            }
            Geometry::Line(line)
        }
    }
}
