use indexmap::IndexSet;

use tangram_core::{
    geometry::Affine,
    identifier::Id,
    patch::PartialShape,
    shape::{Geometry, Shape, ShapeType},
};

use super::{
    BOARD_CARD, BOARD_COLUMN, BOARD_LANE, BOARD_ROOT, ShapeRole, ShapeStruct, demote_to_rectangle,
    transform_geometry,
};
use crate::composite::ShapeComposite;

/// Kanban board; columns, lanes and cards are its scene children.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoardRootStruct;

impl ShapeStruct for BoardRootStruct {
    fn create(&self, id: Id, geometry: Geometry) -> Shape {
        Shape::new(id, ShapeType::new(BOARD_ROOT), geometry)
    }

    fn transform(&self, shape: &Shape, affine: &Affine) -> PartialShape {
        transform_geometry(shape, affine)
    }

    fn role(&self) -> ShapeRole {
        ShapeRole::BoardRoot
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoardColumnStruct;

impl ShapeStruct for BoardColumnStruct {
    fn create(&self, id: Id, geometry: Geometry) -> Shape {
        Shape::new(id, ShapeType::new(BOARD_COLUMN), geometry)
    }

    fn transform(&self, shape: &Shape, affine: &Affine) -> PartialShape {
        transform_geometry(shape, affine)
    }

    fn role(&self) -> ShapeRole {
        ShapeRole::BoardColumn
    }

    fn demote(&self, _shape: &Shape) -> PartialShape {
        demote_to_rectangle()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoardLaneStruct;

impl ShapeStruct for BoardLaneStruct {
    fn create(&self, id: Id, geometry: Geometry) -> Shape {
        Shape::new(id, ShapeType::new(BOARD_LANE), geometry)
    }

    fn transform(&self, shape: &Shape, affine: &Affine) -> PartialShape {
        transform_geometry(shape, affine)
    }

    fn role(&self) -> ShapeRole {
        ShapeRole::BoardLane
    }

    fn demote(&self, _shape: &Shape) -> PartialShape {
        demote_to_rectangle()
    }
}

/// Card placed in a column and optionally a lane.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoardCardStruct;

impl ShapeStruct for BoardCardStruct {
    fn create(&self, id: Id, geometry: Geometry) -> Shape {
        Shape::new(id, ShapeType::new(BOARD_CARD), geometry)
    }

    fn transform(&self, shape: &Shape, affine: &Affine) -> PartialShape {
        transform_geometry(shape, affine)
    }

    fn role(&self) -> ShapeRole {
        ShapeRole::BoardCard
    }

    /// A card cannot outlive its column.
    fn should_delete(
        &self,
        shape: &Shape,
        composite: &ShapeComposite,
        removed: &IndexSet<Id>,
    ) -> bool {
        shape
            .column_id
            .is_none_or(|column| removed.contains(&column) || !composite.contains(column))
    }
}
