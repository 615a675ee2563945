use tangram_core::{
    geometry::{Affine, Bounds, Point},
    identifier::Id,
    patch::PartialShape,
    shape::{Geometry, Shape, ShapeType},
};

use super::{LINE, ShapeRole, ShapeStruct, transform_geometry};

/// Polyline, optionally connected to shapes at either end.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineStruct;

impl ShapeStruct for LineStruct {
    fn create(&self, id: Id, geometry: Geometry) -> Shape {
        Shape::new(id, ShapeType::new(LINE), geometry)
    }

    fn transform(&self, shape: &Shape, affine: &Affine) -> PartialShape {
        transform_geometry(shape, affine)
    }

    fn role(&self) -> ShapeRole {
        ShapeRole::Line
    }

    fn text_bounds(&self, _shape: &Shape) -> Option<Bounds> {
        None
    }

    fn clip_path(&self, _shape: &Shape) -> Option<Vec<Point>> {
        None
    }
}
