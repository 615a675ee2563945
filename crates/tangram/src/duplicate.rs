//! Copying branches of the scene.

use indexmap::{IndexMap, IndexSet};
use log::debug;

use tangram_core::{
    geometry::Point,
    identifier::Id,
    order_key,
    patch::Patch,
};

use crate::{TangramError, composite::ShapeComposite, layout::translate_geometry};

/// Builds an add-only patch copying the branches of `ids`.
///
/// Copies keep their relative stacking order and are placed after every
/// existing shape. Relations between copied shapes point at the copies;
/// see [`ShapeStruct::remap_relations`](crate::registry::ShapeStruct::remap_relations)
/// for references leaving the copy set.
///
/// # Arguments
///
/// * `composite` - The snapshot to copy from. Unknown ids are skipped.
/// * `ids` - Roots of the branches to copy.
/// * `new_id` - Generates the id of the copy of a shape.
/// * `offset` - Translation applied to every copy.
///
/// # Errors
///
/// - [`TangramError::IdCollision`] if `new_id` returns an existing or repeated id.
/// - [`TangramError::InvalidKey`] if ordering keys cannot be generated.
pub fn duplicate_shapes(
    composite: &ShapeComposite,
    ids: &[Id],
    mut new_id: impl FnMut(Id) -> Id,
    offset: Point,
) -> Result<Patch, TangramError> {
    let selected: IndexSet<Id> = ids
        .iter()
        .flat_map(|id| composite.branch_ids(*id))
        .collect();
    let sources: Vec<_> = composite
        .merged_shapes()
        .filter(|shape| selected.contains(&shape.id))
        .collect();

    let mut copies: IndexMap<Id, Id> = IndexMap::with_capacity(sources.len());
    for shape in &sources {
        let copy_id = new_id(shape.id);
        if composite.contains(copy_id) || copies.values().any(|id| *id == copy_id) {
            return Err(TangramError::IdCollision(copy_id));
        }
        copies.insert(shape.id, copy_id);
    }

    let keys = order_key::n_between(composite.last_findex(), None, sources.len())?;
    let remap = |id: Id| copies.get(&id).copied();

    let mut patch = Patch::new();
    for ((shape, findex), copy_id) in sources.into_iter().zip(keys).zip(copies.values()) {
        let mut copy = composite.shape_struct(shape).remap_relations(shape, &remap);
        copy.id = *copy_id;
        copy.findex = findex;
        copy.geometry = translate_geometry(&copy.geometry, offset);
        patch.add_shape(copy);
    }

    debug!(roots = ids.len(), copies = patch.add.len(); "Duplicated shapes");
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use tangram_core::shape::{Connection, Geometry, LineGeometry, RectGeometry, Shape, ShapeType};

    use super::*;
    use crate::registry::{LINE, RECTANGLE, ShapeRegistry};

    fn rect(id: &str, findex: &str) -> Shape {
        Shape::new(
            Id::new(id),
            ShapeType::new(RECTANGLE),
            Geometry::Rect(RectGeometry::new(Point::new(0.0, 0.0), 10.0, 10.0)),
        )
        .with_findex(order_key::OrderKey::parse(findex).expect("valid key"))
    }

    fn line(id: &str, from: &str, to: &str, findex: &str) -> Shape {
        Shape::new(
            Id::new(id),
            ShapeType::new(LINE),
            Geometry::Line(LineGeometry::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0))),
        )
        .with_findex(order_key::OrderKey::parse(findex).expect("valid key"))
        .with_p_connection(Connection::new(Id::new(from), Point::new(0.5, 0.5)))
        .with_q_connection(Connection::new(Id::new(to), Point::new(0.5, 0.5)))
    }

    fn composite(shapes: Vec<Shape>) -> ShapeComposite {
        ShapeComposite::new(shapes, IndexMap::new(), Rc::new(ShapeRegistry::default()))
    }

    fn copy_of(id: Id) -> Id {
        Id::new(&format!("{id}-copy"))
    }

    #[test]
    fn test_branch_copied_after_last_key() {
        let c = composite(vec![
            rect("frame", "a0"),
            rect("label", "a1").with_parent(Id::new("frame")),
            rect("other", "a5"),
        ]);

        let patch =
            duplicate_shapes(&c, &[Id::new("frame")], copy_of, Point::new(5.0, 5.0)).expect("copies");

        assert!(patch.update.is_empty() && patch.delete.is_empty());
        let ids: Vec<Id> = patch.add.iter().map(|shape| shape.id).collect();
        assert_eq!(ids, vec![Id::new("frame-copy"), Id::new("label-copy")]);

        let last = c.last_findex().expect("keys").clone();
        assert!(patch.add[0].findex > last);
        assert!(patch.add[1].findex > patch.add[0].findex);
        assert_eq!(patch.add[1].parent_id, Some(Id::new("frame-copy")));
        assert_eq!(patch.add[0].rect().map(|rect| rect.p), Some(Point::new(5.0, 5.0)));
    }

    #[test]
    fn test_relations_remapped_or_dropped() {
        let c = composite(vec![
            rect("A", "a0"),
            rect("B", "a1"),
            rect("outside", "a2"),
            line("inner", "A", "B", "a3"),
            line("leaving", "A", "outside", "a4"),
        ]);
        let ids = [Id::new("A"), Id::new("B"), Id::new("inner"), Id::new("leaving")];

        let patch = duplicate_shapes(&c, &ids, copy_of, Point::default()).expect("copies");

        let inner = patch.add.iter().find(|s| s.id == Id::new("inner-copy")).expect("copied");
        assert_eq!(inner.p_connection.map(|c| c.id), Some(Id::new("A-copy")));
        assert_eq!(inner.q_connection.map(|c| c.id), Some(Id::new("B-copy")));

        let leaving = patch.add.iter().find(|s| s.id == Id::new("leaving-copy")).expect("copied");
        assert_eq!(leaving.p_connection.map(|c| c.id), Some(Id::new("A-copy")));
        assert_eq!(leaving.q_connection, None);
    }

    #[test]
    fn test_parent_outside_copy_is_kept() {
        let c = composite(vec![
            rect("frame", "a0"),
            rect("label", "a1").with_parent(Id::new("frame")),
        ]);

        let patch = duplicate_shapes(&c, &[Id::new("label")], copy_of, Point::default())
            .expect("copies");

        assert_eq!(patch.add[0].parent_id, Some(Id::new("frame")));
    }

    #[test]
    fn test_colliding_copy_id_is_error() {
        let c = composite(vec![rect("A", "a0"), rect("B", "a1")]);

        let result = duplicate_shapes(&c, &[Id::new("A")], |_| Id::new("B"), Point::default());
        assert!(matches!(result, Err(TangramError::IdCollision(id)) if id == Id::new("B")));
    }

    #[test]
    fn test_unknown_ids_copy_nothing() {
        let c = composite(vec![rect("A", "a0")]);
        let patch = duplicate_shapes(&c, &[Id::new("missing")], copy_of, Point::default())
            .expect("copies");
        assert!(patch.is_empty());
    }
}
