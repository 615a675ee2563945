use tangram_core::{
    geometry::Affine,
    identifier::Id,
    patch::PartialShape,
    shape::{Geometry, Shape, ShapeType},
};

use super::{RECTANGLE, ShapeStruct, transform_geometry};

/// Plain box. Also serves unregistered types.
#[derive(Debug, Clone, Copy, Default)]
pub struct RectangleStruct;

impl ShapeStruct for RectangleStruct {
    fn create(&self, id: Id, geometry: Geometry) -> Shape {
        Shape::new(id, ShapeType::new(RECTANGLE), geometry)
    }

    fn transform(&self, shape: &Shape, affine: &Affine) -> PartialShape {
        transform_geometry(shape, affine)
    }
}
