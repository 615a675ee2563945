//! Dependency graph between shapes.
//!
//! A [`DependencyMap`] records, for every shape reachable from a set of seeds,
//! which shapes its presentation depends on:
//!
//! - an attached shape depends on its host line;
//! - a line depends on the shapes its endpoints connect to;
//! - a line-bound label depends on its parent line;
//! - a group depends on each of its children.
//!
//! Edges point from the dependent to the dependency. The map is restricted
//! to the seeds plus everything that transitively depends on them.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use petgraph::{Direction, graphmap::DiGraphMap};

use tangram_core::{identifier::Id, shape::Shape};

use crate::{composite::ShapeComposite, registry::ShapeRole};

/// Shapes the presentation of `shape` directly depends on.
fn direct_dependencies(composite: &ShapeComposite, shape: &Shape) -> Vec<Id> {
    let mut dependencies = Vec::new();
    if let Some(attachment) = shape.attachment {
        dependencies.push(attachment.id);
    }
    dependencies.extend(shape.p_connection.map(|connection| connection.id));
    dependencies.extend(shape.q_connection.map(|connection| connection.id));

    if shape.line_attached.is_some() {
        if let Some(parent_id) = composite.parent_id(shape.id) {
            if composite.role(parent_id) == Some(ShapeRole::Line) {
                dependencies.push(parent_id);
            }
        }
    }

    if composite.shape_struct(shape).role() == ShapeRole::Group {
        dependencies.extend_from_slice(composite.child_ids(shape.id));
    }

    dependencies.retain(|id| *id != shape.id && composite.contains(*id));
    dependencies
}

/// Dependency graph rooted at a set of seed shapes.
#[derive(Debug, Clone, Default)]
pub struct DependencyMap {
    graph: DiGraphMap<Id, ()>,
}

impl DependencyMap {
    /// Builds the map for `seeds` and every shape that transitively depends on them.
    ///
    /// Seeds absent from the composite are skipped.
    pub fn build(composite: &ShapeComposite, seeds: impl IntoIterator<Item = Id>) -> Self {
        let mut forward: IndexMap<Id, Vec<Id>> = IndexMap::new();
        let mut reverse: IndexMap<Id, Vec<Id>> = IndexMap::new();
        for shape in composite.merged_shapes() {
            let dependencies = direct_dependencies(composite, shape);
            for dependency in &dependencies {
                reverse.entry(*dependency).or_default().push(shape.id);
            }
            forward.insert(shape.id, dependencies);
        }

        let mut closure = IndexSet::new();
        let mut queue: VecDeque<Id> = seeds
            .into_iter()
            .filter(|id| composite.contains(*id))
            .collect();
        while let Some(id) = queue.pop_front() {
            if !closure.insert(id) {
                continue;
            }
            if let Some(dependents) = reverse.get(&id) {
                queue.extend(dependents.iter().copied());
            }
        }

        let mut graph = DiGraphMap::with_capacity(closure.len(), closure.len());
        for id in &closure {
            graph.add_node(*id);
        }
        for id in &closure {
            let dependencies = forward.get(id).into_iter().flatten();
            for dependency in dependencies.filter(|dependency| closure.contains(*dependency)) {
                graph.add_edge(*id, *dependency, ());
            }
        }

        Self { graph }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: Id) -> bool {
        self.graph.contains_node(id)
    }

    /// Ids in the map, in discovery order.
    pub fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.graph.nodes()
    }

    /// Shapes `id` depends on.
    pub fn dependencies(&self, id: Id) -> impl Iterator<Item = Id> + '_ {
        self.graph.neighbors_directed(id, Direction::Outgoing)
    }

    /// Shapes depending on `id`.
    pub fn dependents(&self, id: Id) -> impl Iterator<Item = Id> + '_ {
        self.graph.neighbors_directed(id, Direction::Incoming)
    }

    /// The map as `id -> dependencies`.
    pub fn to_map(&self) -> IndexMap<Id, IndexSet<Id>> {
        self.graph
            .nodes()
            .map(|id| (id, self.dependencies(id).collect()))
            .collect()
    }

    /// Topological layers: each layer holds the shapes whose dependencies all
    /// lie in earlier layers. Shapes caught in a cycle form one final layer.
    pub fn layers(&self) -> Vec<Vec<Id>> {
        let mut resolved = IndexSet::new();
        let mut remaining: Vec<Id> = self.graph.nodes().collect();
        let mut layers = Vec::new();

        while !remaining.is_empty() {
            let (ready, blocked): (Vec<Id>, Vec<Id>) = remaining.into_iter().partition(|id| {
                self.dependencies(*id)
                    .all(|dependency| resolved.contains(&dependency))
            });
            if ready.is_empty() {
                layers.push(blocked);
                break;
            }
            resolved.extend(ready.iter().copied());
            layers.push(ready);
            remaining = blocked;
        }

        layers
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use tangram_core::{
        geometry::Point,
        shape::{Attachment, Connection, Geometry, LineGeometry, RectGeometry, ShapeType},
    };

    use super::*;
    use crate::registry::{GROUP, LINE, RECTANGLE, ShapeRegistry, TEXT};

    fn rect(id: &str) -> Shape {
        Shape::new(
            Id::new(id),
            ShapeType::new(RECTANGLE),
            Geometry::Rect(RectGeometry::new(Point::new(0.0, 0.0), 10.0, 10.0)),
        )
    }

    fn line(id: &str, from: &str, to: Option<&str>) -> Shape {
        let mut shape = Shape::new(
            Id::new(id),
            ShapeType::new(LINE),
            Geometry::Line(LineGeometry::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0))),
        )
        .with_p_connection(Connection::new(Id::new(from), Point::new(0.5, 0.5)));
        if let Some(to) = to {
            shape = shape.with_q_connection(Connection::new(Id::new(to), Point::new(0.5, 0.5)));
        }
        shape
    }

    fn composite(shapes: Vec<Shape>) -> ShapeComposite {
        ShapeComposite::new(shapes, IndexMap::new(), Rc::new(ShapeRegistry::default()))
    }

    fn set(ids: &[&str]) -> IndexSet<Id> {
        ids.iter().map(|id| Id::new(id)).collect()
    }

    #[test]
    fn test_line_attachment_closure() {
        let c = composite(vec![
            rect("A"),
            line("L", "A", None),
            rect("B").with_attachment(Attachment::new(Id::new("L"), 0.5)),
            rect("unrelated"),
        ]);

        let map = DependencyMap::build(&c, [Id::new("A")]).to_map();

        let mut expected = IndexMap::new();
        expected.insert(Id::new("A"), set(&[]));
        expected.insert(Id::new("L"), set(&["A"]));
        expected.insert(Id::new("B"), set(&["L"]));
        assert_eq!(map, expected);
    }

    #[test]
    fn test_dependencies_filtered_to_map() {
        let c = composite(vec![rect("A"), rect("C"), line("L", "A", Some("C"))]);

        let map = DependencyMap::build(&c, [Id::new("A")]);

        assert!(map.contains(Id::new("L")));
        assert!(!map.contains(Id::new("C")));
        assert_eq!(map.dependencies(Id::new("L")).collect::<Vec<_>>(), vec![Id::new("A")]);
        assert_eq!(map.dependents(Id::new("A")).collect::<Vec<_>>(), vec![Id::new("L")]);
    }

    #[test]
    fn test_label_and_group_relations() {
        let label = Shape::new(Id::new("label"), ShapeType::new(TEXT), Geometry::default())
            .with_parent(Id::new("L"))
            .with_line_attached(0.5);
        let group = Shape::new(Id::new("G"), ShapeType::new(GROUP), Geometry::default());
        let c = composite(vec![
            rect("A"),
            group,
            rect("member").with_parent(Id::new("G")),
            line("L", "A", Some("G")),
            label,
        ]);

        let map = DependencyMap::build(&c, [Id::new("member")]).to_map();

        assert_eq!(map[&Id::new("G")], set(&["member"]));
        assert_eq!(map[&Id::new("L")], set(&["G"]));
        assert_eq!(map[&Id::new("label")], set(&["L"]));
        assert!(!map.contains_key(&Id::new("A")));
    }

    #[test]
    fn test_layers_follow_dependencies() {
        let c = composite(vec![
            rect("A"),
            line("L", "A", None),
            rect("B").with_attachment(Attachment::new(Id::new("L"), 0.5)),
        ]);

        let layers = DependencyMap::build(&c, [Id::new("A")]).layers();
        assert_eq!(
            layers,
            vec![vec![Id::new("A")], vec![Id::new("L")], vec![Id::new("B")]]
        );
    }

    #[test]
    fn test_cycle_forms_final_layer() {
        // Two lines attached to each other.
        let c = composite(vec![
            rect("A"),
            line("L1", "A", None).with_attachment(Attachment::new(Id::new("L2"), 0.5)),
            line("L2", "A", None).with_attachment(Attachment::new(Id::new("L1"), 0.5)),
        ]);

        let layers = DependencyMap::build(&c, [Id::new("A")]).layers();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0], vec![Id::new("A")]);
        assert_eq!(layers[1].len(), 2);
    }

    #[test]
    fn test_unknown_seed_is_skipped() {
        let c = composite(vec![rect("A")]);
        assert!(DependencyMap::build(&c, [Id::new("missing")]).is_empty());
    }
}
