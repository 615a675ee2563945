//! Tree layout.
//!
//! A tree is a tree root plus tree nodes whose scene parent is the root and
//! whose `tree_parent_id` is either the root or another node of the same
//! tree. Children of the root keep their own direction (right by default);
//! deeper nodes inherit the direction of their tree parent.
//!
//! Each subtree occupies `max(node extent, children extents + gaps)` across
//! its direction and the node is centered on that span. Nodes that cannot be
//! reached from their root are demoted to plain shapes.

use std::collections::HashMap;

use indexmap::IndexSet;
use log::debug;

use tangram_core::{
    geometry::{Bounds, Point},
    identifier::Id,
    patch::{PartialShape, Patch},
    shape::{Direction, Geometry, RectGeometry},
};

use super::{LayoutRule, Refinement, affected_ids};
use crate::{composite::ShapeComposite, config::TreeConfig, registry::ShapeRole};

/// Places tree nodes relative to their tree parents.
#[derive(Debug, Clone, Default)]
pub struct TreeLayout {
    config: TreeConfig,
}

/// Tree structure of one root, resolved from the snapshot.
struct TreeShape {
    /// Tree children per tree parent, in `findex` order.
    children: HashMap<Id, Vec<Id>>,
    /// Cross-axis extent of each subtree.
    spans: HashMap<Id, f64>,
}

impl TreeLayout {
    pub fn new(config: TreeConfig) -> Self {
        Self { config }
    }

    fn layout_tree(&self, refinement: &mut Refinement, root_id: Id) {
        let base = refinement.base();
        let Some(root_rect) = base.shape(root_id).and_then(|root| root.rect()).copied() else {
            return;
        };

        let nodes: Vec<Id> = base
            .child_ids(root_id)
            .iter()
            .copied()
            .filter(|id| base.role(*id) == Some(ShapeRole::TreeNode))
            .collect();

        let mut children: HashMap<Id, Vec<Id>> = HashMap::new();
        for node in &nodes {
            if let Some(tree_parent) = base.shape(*node).and_then(|shape| shape.tree_parent_id) {
                children.entry(tree_parent).or_default().push(*node);
            }
        }

        let mut reached = IndexSet::new();
        let mut stack = vec![root_id];
        while let Some(id) = stack.pop() {
            for child in children.get(&id).into_iter().flatten() {
                if reached.insert(*child) {
                    stack.push(*child);
                }
            }
        }
        for node in nodes.iter().filter(|node| !reached.contains(*node)) {
            refinement.demote(*node);
        }

        let mut tree = TreeShape {
            children,
            spans: HashMap::new(),
        };
        let root_children = tree.children.get(&root_id).cloned().unwrap_or_default();

        let mut directions: HashMap<Id, Direction> = HashMap::new();
        for child in &root_children {
            let direction = base
                .shape(*child)
                .and_then(|shape| shape.direction)
                .unwrap_or_default();
            self.collect_directions(&tree, *child, direction, &mut directions);
        }
        for child in &root_children {
            self.compute_span(refinement, &mut tree, *child, directions[child]);
        }

        for direction in Direction::ALL {
            let group: Vec<Id> = root_children
                .iter()
                .copied()
                .filter(|child| directions[child] == direction)
                .collect();
            if !group.is_empty() {
                let bounds = root_rect.unrotated_bounds();
                self.place_children(refinement, &tree, bounds, &group, direction);
            }
        }

        debug!(root:% = root_id, nodes = reached.len(); "Tree laid out");
    }

    fn collect_directions(
        &self,
        tree: &TreeShape,
        id: Id,
        direction: Direction,
        directions: &mut HashMap<Id, Direction>,
    ) {
        directions.insert(id, direction);
        for child in tree.children.get(&id).into_iter().flatten() {
            self.collect_directions(tree, *child, direction, directions);
        }
    }

    fn compute_span(
        &self,
        refinement: &Refinement,
        tree: &mut TreeShape,
        id: Id,
        direction: Direction,
    ) -> f64 {
        let own = refinement
            .shape(id)
            .and_then(|shape| shape.rect())
            .map_or(0.0, |rect| cross_extent(rect, direction));

        let children = tree.children.get(&id).cloned().unwrap_or_default();
        let mut total = 0.0;
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                total += self.config.sibling_gap();
            }
            total += self.compute_span(refinement, tree, *child, direction);
        }

        let span = own.max(total);
        tree.spans.insert(id, span);
        span
    }

    /// Places `children` beside `parent` along `direction`, centered as a block
    /// on the parent across the direction, then recurses into each child.
    fn place_children(
        &self,
        refinement: &mut Refinement,
        tree: &TreeShape,
        parent: Bounds,
        children: &[Id],
        direction: Direction,
    ) {
        let spans: Vec<f64> = children
            .iter()
            .map(|child| tree.spans.get(child).copied().unwrap_or(0.0))
            .collect();
        let gaps = self.config.sibling_gap() * children.len().saturating_sub(1) as f64;
        let total: f64 = spans.iter().sum::<f64>() + gaps;

        let parent_center = parent.center();
        let mut cursor = if direction.is_horizontal() {
            parent_center.y() - total / 2.0
        } else {
            parent_center.x() - total / 2.0
        };

        for (child, span) in children.iter().zip(spans) {
            let Some(rect) = refinement.shape(*child).and_then(|shape| shape.rect()).copied()
            else {
                continue;
            };
            let center = cursor + span / 2.0;
            let gap = self.config.child_gap();
            let p = match direction {
                Direction::Right => Point::new(parent.max_x() + gap, center - rect.height / 2.0),
                Direction::Left => Point::new(
                    parent.min_x() - gap - rect.width,
                    center - rect.height / 2.0,
                ),
                Direction::Down => Point::new(center - rect.width / 2.0, parent.max_y() + gap),
                Direction::Up => Point::new(
                    center - rect.width / 2.0,
                    parent.min_y() - gap - rect.height,
                ),
            };

            let placed = RectGeometry { p, ..rect };
            refinement.update(
                *child,
                &PartialShape::default()
                    .with_geometry(Geometry::Rect(placed))
                    .with_direction(Some(direction)),
            );
            refinement.translate_descendants(*child, p.sub_point(rect.p));

            if let Some(grandchildren) = tree.children.get(child) {
                self.place_children(
                    refinement,
                    tree,
                    placed.unrotated_bounds(),
                    grandchildren,
                    direction,
                );
            }
            cursor += span + self.config.sibling_gap();
        }
    }
}

fn cross_extent(rect: &RectGeometry, direction: Direction) -> f64 {
    if direction.is_horizontal() {
        rect.height
    } else {
        rect.width
    }
}

/// Tree root of a node: its scene parent, if that is a tree root.
fn tree_root_of(composite: &ShapeComposite, id: Id) -> Option<Id> {
    composite
        .parent_id(id)
        .filter(|parent_id| composite.role(*parent_id) == Some(ShapeRole::TreeRoot))
}

impl LayoutRule for TreeLayout {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn apply(&self, composite: &ShapeComposite, patch: &Patch) -> Patch {
        let next = composite.apply_patch(patch);
        let mut refinement = Refinement::new(&next);

        let mut roots = IndexSet::new();
        for id in affected_ids(composite, patch, &next) {
            match next.role(id) {
                Some(ShapeRole::TreeRoot) => {
                    roots.insert(id);
                }
                Some(ShapeRole::TreeNode) => match tree_root_of(&next, id) {
                    Some(root_id) => {
                        roots.insert(root_id);
                    }
                    None => refinement.demote(id),
                },
                _ => {}
            }
        }

        for root_id in roots {
            self.layout_tree(&mut refinement, root_id);
        }
        refinement.into_patch()
    }
}
