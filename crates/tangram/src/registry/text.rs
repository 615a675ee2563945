use tangram_core::{
    geometry::{Affine, Bounds},
    identifier::Id,
    patch::PartialShape,
    shape::{Geometry, Shape, ShapeType},
};

use super::{ShapeStruct, TEXT, transform_geometry};

/// Free text box. With `line_attached` set it is a label bound to its parent line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextStruct;

impl ShapeStruct for TextStruct {
    fn create(&self, id: Id, geometry: Geometry) -> Shape {
        Shape::new(id, ShapeType::new(TEXT), geometry)
    }

    fn transform(&self, shape: &Shape, affine: &Affine) -> PartialShape {
        transform_geometry(shape, affine)
    }

    fn text_bounds(&self, shape: &Shape) -> Option<Bounds> {
        shape.rect().map(|rect| rect.unrotated_bounds())
    }
}
