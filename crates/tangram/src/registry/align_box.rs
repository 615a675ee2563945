use tangram_core::{
    geometry::Affine,
    identifier::Id,
    patch::PartialShape,
    shape::{AlignLayout, Geometry, Shape, ShapeType},
};

use super::{ALIGN_BOX, ShapeRole, ShapeStruct, transform_geometry};

/// Container arranging its children in rows or columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignBoxStruct;

impl ShapeStruct for AlignBoxStruct {
    fn create(&self, id: Id, geometry: Geometry) -> Shape {
        Shape::new(id, ShapeType::new(ALIGN_BOX), geometry).with_align(AlignLayout::default())
    }

    fn transform(&self, shape: &Shape, affine: &Affine) -> PartialShape {
        transform_geometry(shape, affine)
    }

    fn role(&self) -> ShapeRole {
        ShapeRole::AlignBox
    }
}
