use tangram_core::{
    geometry::Affine,
    identifier::Id,
    patch::PartialShape,
    shape::{Geometry, Shape, ShapeType},
};

use super::{ShapeRole, ShapeStruct, TREE_NODE, TREE_ROOT, demote_to_rectangle, transform_geometry};

/// Root of a tree; every node of the tree is its scene child.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeRootStruct;

impl ShapeStruct for TreeRootStruct {
    fn create(&self, id: Id, geometry: Geometry) -> Shape {
        Shape::new(id, ShapeType::new(TREE_ROOT), geometry)
    }

    fn transform(&self, shape: &Shape, affine: &Affine) -> PartialShape {
        transform_geometry(shape, affine)
    }

    fn role(&self) -> ShapeRole {
        ShapeRole::TreeRoot
    }
}

/// Tree node placed relative to its tree parent.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeNodeStruct;

impl ShapeStruct for TreeNodeStruct {
    fn create(&self, id: Id, geometry: Geometry) -> Shape {
        Shape::new(id, ShapeType::new(TREE_NODE), geometry)
    }

    fn transform(&self, shape: &Shape, affine: &Affine) -> PartialShape {
        transform_geometry(shape, affine)
    }

    fn role(&self) -> ShapeRole {
        ShapeRole::TreeNode
    }

    fn demote(&self, _shape: &Shape) -> PartialShape {
        demote_to_rectangle()
    }
}
