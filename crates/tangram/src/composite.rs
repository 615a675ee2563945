//! The scene graph: an immutable snapshot of persisted shapes with an overlay
//! of uncommitted edits.
//!
//! # Overview
//!
//! A [`ShapeComposite`] is a pure function of its inputs: the persisted
//! shapes, a map of temporary per-shape overrides, and the shape registry.
//! It derives the merged shape map, the parent/child tree, bounds, and the
//! per-type capabilities. Mutation happens by building a [`Patch`] and
//! deriving the next composite with [`ShapeComposite::apply_patch`].
//!
//! Children are ordered by `findex`, ties broken by id. A shape whose parent
//! is missing, or whose parent chain cycles back to itself, is a root.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    rc::Rc,
};

use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};

use tangram_core::{
    geometry::{Bounds, Point},
    identifier::Id,
    order_key::OrderKey,
    patch::{PartialShape, Patch},
    shape::Shape,
};

use crate::{
    TangramError,
    registry::{ShapeRegistry, ShapeRole, ShapeStruct},
};

/// A node of the derived scene tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeTreeNode {
    pub id: Id,
    pub children: Vec<ShapeTreeNode>,
}

/// Immutable scene-graph snapshot.
#[derive(Clone)]
pub struct ShapeComposite {
    registry: Rc<ShapeRegistry>,
    shapes: IndexMap<Id, Shape>,
    overrides: IndexMap<Id, PartialShape>,
    merged: IndexMap<Id, Shape>,
    parents: HashMap<Id, Id>,
    children: HashMap<Id, Vec<Id>>,
    roots: Vec<Id>,
}

impl ShapeComposite {
    /// Builds a snapshot from persisted shapes and temporary overrides.
    ///
    /// # Arguments
    ///
    /// * `shapes` - Persisted shapes; a later shape with a repeated id replaces the earlier one.
    /// * `overrides` - Uncommitted per-shape edits; entries for unknown ids are ignored.
    /// * `registry` - Shape-type capabilities.
    pub fn new(
        shapes: impl IntoIterator<Item = Shape>,
        overrides: IndexMap<Id, PartialShape>,
        registry: Rc<ShapeRegistry>,
    ) -> Self {
        let mut persisted: IndexMap<Id, Shape> =
            shapes.into_iter().map(|shape| (shape.id, shape)).collect();
        sort_by_findex(&mut persisted);

        let mut merged: IndexMap<Id, Shape> = persisted
            .values()
            .map(|shape| {
                let shape = match overrides.get(&shape.id) {
                    Some(partial) => partial.apply_to(shape),
                    None => shape.clone(),
                };
                (shape.id, shape)
            })
            .collect();
        sort_by_findex(&mut merged);

        let parents: HashMap<Id, Id> = merged
            .values()
            .filter_map(|shape| {
                let parent_id = shape.parent_id?;
                if !merged.contains_key(&parent_id) {
                    return None;
                }
                if parent_chain_cycles(&merged, shape.id) {
                    warn!(shape_id:% = shape.id; "Parent chain cycles, treating shape as root");
                    return None;
                }
                Some((shape.id, parent_id))
            })
            .collect();

        let mut children: HashMap<Id, Vec<Id>> = HashMap::new();
        let mut roots = Vec::new();
        for id in merged.keys() {
            match parents.get(id) {
                Some(parent_id) => children.entry(*parent_id).or_default().push(*id),
                None => roots.push(*id),
            }
        }

        Self {
            registry,
            shapes: persisted,
            overrides,
            merged,
            parents,
            children,
            roots,
        }
    }

    pub fn registry(&self) -> &Rc<ShapeRegistry> {
        &self.registry
    }

    /// Persisted shapes in `findex` order.
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values()
    }

    pub fn overrides(&self) -> &IndexMap<Id, PartialShape> {
        &self.overrides
    }

    /// Shapes with overrides applied, in `findex` order.
    pub fn merged_shapes(&self) -> impl Iterator<Item = &Shape> {
        self.merged.values()
    }

    pub fn merged_shape_map(&self) -> &IndexMap<Id, Shape> {
        &self.merged
    }

    /// The scene tree derived from `parent_id`, roots in `findex` order.
    pub fn merged_shape_tree(&self) -> Vec<ShapeTreeNode> {
        self.roots.iter().map(|id| self.tree_node(*id)).collect()
    }

    fn tree_node(&self, id: Id) -> ShapeTreeNode {
        ShapeTreeNode {
            id,
            children: self
                .child_ids(id)
                .iter()
                .map(|child| self.tree_node(*child))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.merged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }

    pub fn contains(&self, id: Id) -> bool {
        self.merged.contains_key(&id)
    }

    /// Merged shape by id.
    pub fn shape(&self, id: Id) -> Option<&Shape> {
        self.merged.get(&id)
    }

    /// Persisted shape by id, ignoring overrides.
    pub fn persisted_shape(&self, id: Id) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    /// Highest ordering key in the snapshot.
    pub fn last_findex(&self) -> Option<&OrderKey> {
        self.merged.values().map(|shape| &shape.findex).max()
    }

    /// Effective parent id: `None` for roots, dangling parents, and cyclic chains.
    pub fn parent_id(&self, id: Id) -> Option<Id> {
        self.parents.get(&id).copied()
    }

    pub fn parent(&self, id: Id) -> Option<&Shape> {
        self.parent_id(id).and_then(|parent_id| self.shape(parent_id))
    }

    /// Ids of the direct children of `id` in `findex` order.
    pub fn child_ids(&self, id: Id) -> &[Id] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn children(&self, id: Id) -> impl Iterator<Item = &Shape> {
        self.child_ids(id)
            .iter()
            .filter_map(|child| self.shape(*child))
    }

    pub fn root_ids(&self) -> &[Id] {
        &self.roots
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: Id) -> Vec<Id> {
        let mut ancestors = Vec::new();
        let mut current = id;
        while let Some(parent_id) = self.parent_id(current) {
            ancestors.push(parent_id);
            current = parent_id;
        }
        ancestors
    }

    /// Transitive descendants of `id`, parents before children.
    pub fn descendants(&self, id: Id) -> Vec<Id> {
        let mut descendants = Vec::new();
        self.collect_descendants(id, &mut descendants);
        descendants
    }

    fn collect_descendants(&self, id: Id, out: &mut Vec<Id>) {
        for child in self.child_ids(id) {
            out.push(*child);
            self.collect_descendants(*child, out);
        }
    }

    /// `id` followed by its descendants; empty if `id` is unknown.
    pub fn branch_ids(&self, id: Id) -> Vec<Id> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut branch = vec![id];
        self.collect_descendants(id, &mut branch);
        branch
    }

    pub fn branch_shapes(&self, id: Id) -> Vec<&Shape> {
        self.branch_ids(id)
            .into_iter()
            .filter_map(|branch_id| self.shape(branch_id))
            .collect()
    }

    /// Shapes whose bounds overlap `rect`, in `findex` order.
    pub fn shapes_in_rect(&self, rect: Bounds) -> Vec<&Shape> {
        self.merged
            .values()
            .filter(|shape| {
                self.bounds(shape.id)
                    .is_some_and(|bounds| bounds.intersects(&rect))
            })
            .collect()
    }

    /// Capabilities of the type of `shape`.
    pub fn shape_struct(&self, shape: &Shape) -> &dyn ShapeStruct {
        self.registry.get(shape.shape_type)
    }

    pub fn role(&self, id: Id) -> Option<ShapeRole> {
        self.shape(id)
            .map(|shape| self.shape_struct(shape).role())
    }

    /// Axis-aligned bounds; a group takes the union of its children's bounds.
    pub fn bounds(&self, id: Id) -> Option<Bounds> {
        let shape = self.shape(id)?;
        let mut children = self
            .child_ids(id)
            .iter()
            .filter_map(|child| self.bounds(*child));
        Some(self.shape_struct(shape).bounds(shape, &mut children))
    }

    pub fn text_bounds(&self, id: Id) -> Option<Bounds> {
        let shape = self.shape(id)?;
        self.shape_struct(shape).text_bounds(shape)
    }

    pub fn clip_path(&self, id: Id) -> Option<Vec<Point>> {
        let shape = self.shape(id)?;
        self.shape_struct(shape).clip_path(shape)
    }

    /// Returns true if the existence precondition of `id` fails once `removed` are gone.
    pub fn should_delete(&self, id: Id, removed: &IndexSet<Id>) -> bool {
        self.shape(id)
            .is_some_and(|shape| self.shape_struct(shape).should_delete(shape, self, removed))
    }

    /// Closure of a deletion: the ids, their descendants, and every shape whose
    /// existence precondition fails once those are gone, to a fixed point.
    ///
    /// Unknown ids are ignored.
    pub fn deletion_targets(&self, ids: impl IntoIterator<Item = Id>) -> IndexSet<Id> {
        let mut removed = IndexSet::new();
        for id in ids {
            removed.extend(self.branch_ids(id));
        }

        loop {
            let cascade: Vec<Id> = self
                .merged
                .values()
                .filter(|shape| !removed.contains(&shape.id))
                .filter(|shape| {
                    shape.relation_ids().any(|id| removed.contains(&id))
                        || self
                            .child_ids(shape.id)
                            .iter()
                            .any(|child| removed.contains(child))
                })
                .filter(|shape| self.should_delete(shape.id, &removed))
                .map(|shape| shape.id)
                .collect();
            if cascade.is_empty() {
                break;
            }
            for id in cascade {
                removed.extend(self.branch_ids(id));
            }
        }

        removed
    }

    /// Shapes outside `ids` whose parent or relational fields reference any of `ids`.
    pub fn referrers(&self, ids: &IndexSet<Id>) -> IndexSet<Id> {
        self.merged
            .values()
            .filter(|shape| !ids.contains(&shape.id))
            .filter(|shape| {
                shape.parent_id.is_some_and(|parent_id| ids.contains(&parent_id))
                    || shape.relation_ids().any(|id| ids.contains(&id))
            })
            .map(|shape| shape.id)
            .collect()
    }

    /// Checks the caller contract and expands deletions to their full closure.
    ///
    /// # Errors
    ///
    /// - [`TangramError::IdCollision`] if an added id already exists or is added twice.
    /// - [`TangramError::UnknownShape`] if an update targets an id that is
    ///   neither in the snapshot nor added by the patch.
    pub fn normalize_patch(&self, patch: Patch) -> Result<Patch, TangramError> {
        let mut added = HashSet::new();
        for shape in &patch.add {
            if self.contains(shape.id) || !added.insert(shape.id) {
                return Err(TangramError::IdCollision(shape.id));
            }
        }
        if let Some(id) = patch
            .update
            .keys()
            .find(|id| !self.contains(**id) && !added.contains(*id))
        {
            return Err(TangramError::UnknownShape(*id));
        }

        let Patch {
            add,
            update,
            delete,
        } = patch;
        let mut normalized = Patch {
            add,
            update,
            delete: Vec::new(),
        };
        if delete.is_empty() {
            return Ok(normalized);
        }

        let staged = self.apply_patch(&normalized);
        let targets = staged.deletion_targets(delete.iter().copied());
        debug!(
            requested = delete.len(),
            cascaded = targets.len();
            "Expanded deletion"
        );
        for id in targets {
            normalized.delete_shape(id);
        }
        Ok(normalized)
    }

    /// The next snapshot with `patch` committed. Overrides are folded in.
    pub fn apply_patch(&self, patch: &Patch) -> ShapeComposite {
        let mut shapes = self.merged.clone();
        for shape in &patch.add {
            shapes.insert(shape.id, shape.clone());
        }
        for (id, partial) in &patch.update {
            if let Some(shape) = shapes.get_mut(id) {
                *shape = partial.apply_to(shape);
            }
        }
        for id in &patch.delete {
            shapes.shift_remove(id);
        }
        Self::new(shapes.into_values(), IndexMap::new(), Rc::clone(&self.registry))
    }

    /// Same persisted shapes under a new preview overlay.
    pub fn with_overrides(&self, overrides: IndexMap<Id, PartialShape>) -> ShapeComposite {
        Self::new(
            self.shapes.values().cloned(),
            overrides,
            Rc::clone(&self.registry),
        )
    }
}

impl fmt::Debug for ShapeComposite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeComposite")
            .field("shapes", &self.merged.len())
            .field("overrides", &self.overrides.len())
            .field("roots", &self.roots)
            .finish()
    }
}

fn sort_by_findex(shapes: &mut IndexMap<Id, Shape>) {
    shapes.sort_by(|_, a, _, b| a.findex.cmp(&b.findex).then_with(|| a.id.cmp(&b.id)));
}

/// Returns true if following `parent_id` from `id` leads back to `id`.
fn parent_chain_cycles(shapes: &IndexMap<Id, Shape>, id: Id) -> bool {
    let mut current = id;
    for _ in 0..shapes.len() {
        match shapes.get(&current).and_then(|shape| shape.parent_id) {
            Some(parent_id) if parent_id == id => return true,
            Some(parent_id) => current = parent_id,
            None => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use tangram_core::{
        geometry::Size,
        shape::{Geometry, RectGeometry, ShapeType},
    };

    use super::*;
    use crate::registry::{BOARD_CARD, BOARD_COLUMN, BOARD_ROOT, GROUP, RECTANGLE};

    fn rect(id: &str, x: f64, y: f64) -> Shape {
        Shape::new(
            Id::new(id),
            ShapeType::new(RECTANGLE),
            Geometry::Rect(RectGeometry::new(Point::new(x, y), 10.0, 10.0)),
        )
    }

    fn key(key: &str) -> OrderKey {
        OrderKey::parse(key).expect("valid key")
    }

    fn composite(shapes: Vec<Shape>) -> ShapeComposite {
        ShapeComposite::new(shapes, IndexMap::new(), Rc::new(ShapeRegistry::default()))
    }

    #[test]
    fn test_children_sorted_by_findex_then_id() {
        let c = composite(vec![
            rect("parent", 0.0, 0.0),
            rect("b", 0.0, 0.0).with_parent(Id::new("parent")).with_findex(key("a1")),
            rect("a", 0.0, 0.0).with_parent(Id::new("parent")).with_findex(key("a1")),
            rect("c", 0.0, 0.0).with_parent(Id::new("parent")).with_findex(key("a0")),
        ]);

        assert_eq!(
            c.child_ids(Id::new("parent")),
            &[Id::new("c"), Id::new("a"), Id::new("b")]
        );
    }

    #[test]
    fn test_dangling_and_cyclic_parents_are_roots() {
        let c = composite(vec![
            rect("orphan", 0.0, 0.0).with_parent(Id::new("missing")),
            rect("x", 0.0, 0.0).with_parent(Id::new("y")),
            rect("y", 0.0, 0.0).with_parent(Id::new("x")),
        ]);

        assert_eq!(c.parent_id(Id::new("orphan")), None);
        assert_eq!(c.parent_id(Id::new("x")), None);
        assert_eq!(c.parent_id(Id::new("y")), None);
        assert_eq!(c.root_ids().len(), 3);
    }

    #[test]
    fn test_overrides_are_merged_but_persisted_kept() {
        let base = composite(vec![rect("a", 0.0, 0.0)]);
        let moved = Geometry::Rect(RectGeometry::new(Point::new(50.0, 0.0), 10.0, 10.0));
        let mut overrides = IndexMap::new();
        overrides.insert(Id::new("a"), PartialShape::default().with_geometry(moved.clone()));
        overrides.insert(Id::new("ghost"), PartialShape::default().with_parent_id(None));

        let preview = base.with_overrides(overrides);

        assert_eq!(preview.shape(Id::new("a")).map(|s| &s.geometry), Some(&moved));
        assert_ne!(preview.persisted_shape(Id::new("a")).map(|s| &s.geometry), Some(&moved));
        assert!(!preview.contains(Id::new("ghost")));
    }

    #[test]
    fn test_ancestors_descendants_and_branch() {
        let c = composite(vec![
            rect("root", 0.0, 0.0),
            rect("mid", 0.0, 0.0).with_parent(Id::new("root")),
            rect("leaf", 0.0, 0.0).with_parent(Id::new("mid")),
        ]);

        assert_eq!(c.ancestors(Id::new("leaf")), vec![Id::new("mid"), Id::new("root")]);
        assert_eq!(c.descendants(Id::new("root")), vec![Id::new("mid"), Id::new("leaf")]);
        assert_eq!(
            c.branch_ids(Id::new("mid")),
            vec![Id::new("mid"), Id::new("leaf")]
        );
        assert!(c.branch_ids(Id::new("missing")).is_empty());
    }

    #[test]
    fn test_group_bounds_from_children() {
        let group = Shape::new(Id::new("g"), ShapeType::new(GROUP), Geometry::default());
        let c = composite(vec![
            group,
            rect("a", 0.0, 0.0).with_parent(Id::new("g")),
            rect("b", 30.0, 20.0).with_parent(Id::new("g")),
        ]);

        let bounds = c.bounds(Id::new("g")).expect("group has bounds");
        assert_eq!(bounds.min_point(), Point::new(0.0, 0.0));
        assert_eq!(bounds.to_size(), Size::new(40.0, 30.0));
    }

    #[test]
    fn test_shapes_in_rect() {
        let c = composite(vec![rect("near", 0.0, 0.0), rect("far", 100.0, 100.0)]);
        let hits = c.shapes_in_rect(Bounds::new_from_top_left(
            Point::new(5.0, 5.0),
            Size::new(10.0, 10.0),
        ));

        let ids: Vec<Id> = hits.iter().map(|shape| shape.id).collect();
        assert_eq!(ids, vec![Id::new("near")]);
    }

    #[test]
    fn test_deletion_targets_cascade() {
        let board = |id: &str, shape_type: &str| {
            Shape::new(Id::new(id), ShapeType::new(shape_type), Geometry::default())
        };
        let c = composite(vec![
            board("root", BOARD_ROOT),
            board("col_a", BOARD_COLUMN).with_parent(Id::new("root")),
            board("col_b", BOARD_COLUMN).with_parent(Id::new("root")),
            board("card_a", BOARD_CARD)
                .with_parent(Id::new("root"))
                .with_board_cell(Id::new("col_a"), None),
            board("card_b", BOARD_CARD)
                .with_parent(Id::new("root"))
                .with_board_cell(Id::new("col_b"), None),
            rect("note", 0.0, 0.0).with_parent(Id::new("card_a")),
        ]);

        let targets = c.deletion_targets([Id::new("col_a")]);
        let expected: IndexSet<Id> = [Id::new("col_a"), Id::new("card_a"), Id::new("note")]
            .into_iter()
            .collect();
        assert_eq!(targets, expected);
    }

    #[test]
    fn test_group_dissolves_when_children_deleted() {
        let group = Shape::new(Id::new("g"), ShapeType::new(GROUP), Geometry::default());
        let c = composite(vec![
            group,
            rect("a", 0.0, 0.0).with_parent(Id::new("g")),
            rect("b", 0.0, 0.0).with_parent(Id::new("g")),
        ]);

        let targets = c.deletion_targets([Id::new("a")]);
        assert!(!targets.contains(&Id::new("g")));

        let targets = c.deletion_targets([Id::new("a"), Id::new("b")]);
        assert!(targets.contains(&Id::new("g")));
    }

    #[test]
    fn test_normalize_patch_contract() {
        let c = composite(vec![rect("a", 0.0, 0.0)]);

        let collision = Patch::new().with_add(rect("a", 0.0, 0.0));
        assert!(matches!(
            c.normalize_patch(collision),
            Err(TangramError::IdCollision(id)) if id == "a"
        ));

        let twice = Patch {
            add: vec![rect("n", 0.0, 0.0), rect("n", 1.0, 0.0)],
            ..Patch::default()
        };
        assert!(matches!(
            c.normalize_patch(twice),
            Err(TangramError::IdCollision(_))
        ));

        let unknown = Patch::new().with_update(Id::new("zz"), PartialShape::default().with_parent_id(None));
        assert!(matches!(
            c.normalize_patch(unknown),
            Err(TangramError::UnknownShape(id)) if id == "zz"
        ));

        let update_added = Patch::new()
            .with_add(rect("n", 0.0, 0.0))
            .with_update(Id::new("n"), PartialShape::default().with_parent_id(Some(Id::new("a"))));
        assert!(c.normalize_patch(update_added).is_ok());
    }

    #[test]
    fn test_normalize_patch_expands_deletion() {
        let c = composite(vec![
            rect("parent", 0.0, 0.0),
            rect("child", 0.0, 0.0).with_parent(Id::new("parent")),
        ]);

        let patch = c
            .normalize_patch(Patch::new().with_delete(Id::new("parent")))
            .expect("valid patch");
        assert_eq!(patch.delete, vec![Id::new("parent"), Id::new("child")]);
    }

    #[test]
    fn test_apply_patch_and_referrers() {
        let c = composite(vec![rect("a", 0.0, 0.0), rect("b", 0.0, 0.0).with_parent(Id::new("a"))]);
        let next = c.apply_patch(
            &Patch::new()
                .with_add(rect("n", 5.0, 5.0))
                .with_delete(Id::new("a")),
        );

        assert!(next.contains(Id::new("n")));
        assert!(!next.contains(Id::new("a")));
        assert_eq!(next.parent_id(Id::new("b")), None);

        let ids: IndexSet<Id> = [Id::new("a")].into_iter().collect();
        assert_eq!(c.referrers(&ids).into_iter().collect::<Vec<_>>(), vec![Id::new("b")]);
    }

    #[test]
    fn test_merged_shape_tree() {
        let c = composite(vec![
            rect("root", 0.0, 0.0),
            rect("child", 0.0, 0.0).with_parent(Id::new("root")),
        ]);

        assert_eq!(
            c.merged_shape_tree(),
            vec![ShapeTreeNode {
                id: Id::new("root"),
                children: vec![ShapeTreeNode {
                    id: Id::new("child"),
                    children: Vec::new(),
                }],
            }]
        );
    }
}
