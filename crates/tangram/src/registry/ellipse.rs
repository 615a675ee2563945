use std::f64::consts::{FRAC_1_SQRT_2, TAU};

use tangram_core::{
    geometry::{Affine, Bounds, Point, Size},
    identifier::Id,
    patch::PartialShape,
    shape::{Geometry, Shape, ShapeType},
};

use super::{ELLIPSE, ShapeStruct, transform_geometry};

/// Number of polygon vertices approximating the outline.
const OUTLINE_SEGMENTS: usize = 32;

/// Ellipse inscribed in its box.
#[derive(Debug, Clone, Copy, Default)]
pub struct EllipseStruct;

impl ShapeStruct for EllipseStruct {
    fn create(&self, id: Id, geometry: Geometry) -> Shape {
        Shape::new(id, ShapeType::new(ELLIPSE), geometry)
    }

    fn transform(&self, shape: &Shape, affine: &Affine) -> PartialShape {
        transform_geometry(shape, affine)
    }

    /// The largest axis-aligned box inside the ellipse.
    fn text_bounds(&self, shape: &Shape) -> Option<Bounds> {
        let rect = shape.rect()?;
        let size = Size::new(rect.width * FRAC_1_SQRT_2, rect.height * FRAC_1_SQRT_2);
        Some(Bounds::new_from_center(rect.center(), size))
    }

    fn clip_path(&self, shape: &Shape) -> Option<Vec<Point>> {
        let rect = shape.rect()?;
        let center = rect.center();
        let (rx, ry) = (rect.width / 2.0, rect.height / 2.0);
        let outline = (0..OUTLINE_SEGMENTS)
            .map(|i| {
                let angle = TAU * i as f64 / OUTLINE_SEGMENTS as f64;
                Point::new(center.x() + rx * angle.cos(), center.y() + ry * angle.sin())
                    .rotate_around(center, rect.rotation)
            })
            .collect();
        Some(outline)
    }
}
