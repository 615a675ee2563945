use indexmap::IndexSet;

use tangram_core::{
    geometry::{Affine, Bounds, Point},
    identifier::Id,
    patch::PartialShape,
    shape::{Geometry, Shape, ShapeType},
};

use super::{GROUP, ShapeRole, ShapeStruct};
use crate::composite::ShapeComposite;

/// Container whose bounds are the union of its children.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupStruct;

impl ShapeStruct for GroupStruct {
    fn create(&self, id: Id, geometry: Geometry) -> Shape {
        Shape::new(id, ShapeType::new(GROUP), geometry)
    }

    /// Children are transformed individually; the group itself carries no geometry.
    fn transform(&self, _shape: &Shape, _affine: &Affine) -> PartialShape {
        PartialShape::default()
    }

    fn role(&self) -> ShapeRole {
        ShapeRole::Group
    }

    fn bounds_from_children(&self) -> bool {
        true
    }

    /// A group dissolves once every child is gone.
    fn should_delete(
        &self,
        shape: &Shape,
        composite: &ShapeComposite,
        removed: &IndexSet<Id>,
    ) -> bool {
        let children = composite.child_ids(shape.id);
        !children.is_empty() && children.iter().all(|child| removed.contains(child))
    }

    fn text_bounds(&self, _shape: &Shape) -> Option<Bounds> {
        None
    }

    fn clip_path(&self, _shape: &Shape) -> Option<Vec<Point>> {
        None
    }
}
