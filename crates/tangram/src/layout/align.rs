//! Alignment-box layout.
//!
//! An align box flows its box-shaped children along its [`AlignDirection`],
//! separated by `gap` and inset by `padding`. With `wrap` set, a new row (or
//! column) starts once the next member would exceed that extent along the
//! flow. The box is then resized to fit its padding plus content.

use indexmap::IndexSet;
use log::debug;

use tangram_core::{
    geometry::{Bounds, Point},
    identifier::Id,
    patch::Patch,
    shape::{AlignDirection, Geometry, RectGeometry},
};

use super::{LayoutRule, Refinement, affected_ids};
use crate::{composite::ShapeComposite, registry::ShapeRole};

/// Reflows alignment boxes, innermost first.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignLayoutRule;

/// Splits points and sizes into (main, cross) components for a flow direction.
#[derive(Debug, Clone, Copy)]
struct Flow(AlignDirection);

impl Flow {
    fn split(self, point: Point) -> (f64, f64) {
        match self.0 {
            AlignDirection::Row => (point.x(), point.y()),
            AlignDirection::Column => (point.y(), point.x()),
        }
    }

    fn join(self, main: f64, cross: f64) -> Point {
        match self.0 {
            AlignDirection::Row => Point::new(main, cross),
            AlignDirection::Column => Point::new(cross, main),
        }
    }

    fn extents(self, bounds: Bounds) -> (f64, f64) {
        self.split(Point::new(bounds.width(), bounds.height()))
    }
}

impl AlignLayoutRule {
    fn layout_box(&self, refinement: &mut Refinement, box_id: Id) {
        let Some(shape) = refinement.shape(box_id) else {
            return;
        };
        let Some(rect) = shape.rect().copied() else {
            return;
        };
        let layout = shape.align.unwrap_or_default();
        let flow = Flow(layout.direction);

        let base = refinement.base();
        let members: Vec<Id> = base
            .child_ids(box_id)
            .iter()
            .copied()
            .filter(|id| base.role(*id) != Some(ShapeRole::Line))
            .collect();
        if members.is_empty() {
            return;
        }

        let origin = rect.p.add_point(Point::new(layout.padding.left(), layout.padding.top()));
        let (main_origin, cross_origin) = flow.split(origin);

        let mut main = main_origin;
        let mut cross = cross_origin;
        let mut line_extent: f64 = 0.0;
        let mut content_main: f64 = 0.0;
        let mut placed = 0;

        for member in members {
            let Some(bounds) = refinement.bounds(member) else {
                continue;
            };
            let (main_size, cross_size) = flow.extents(bounds);

            let line_started = main > main_origin;
            let overflows = layout
                .wrap
                .is_some_and(|wrap| main - main_origin + main_size > wrap);
            if line_started && overflows {
                main = main_origin;
                cross += line_extent + layout.gap;
                line_extent = 0.0;
            }

            let target = flow.join(main, cross);
            refinement.translate_branch(member, target.sub_point(bounds.min_point()));

            content_main = content_main.max(main + main_size - main_origin);
            line_extent = line_extent.max(cross_size);
            main += main_size + layout.gap;
            placed += 1;
        }

        if placed == 0 {
            return;
        }
        let content = flow.join(content_main, cross + line_extent - cross_origin);
        let width = layout.padding.horizontal_sum() + content.x();
        let height = layout.padding.vertical_sum() + content.y();
        refinement.set_geometry(
            box_id,
            Geometry::Rect(RectGeometry::new(rect.p, width, height).with_rotation(rect.rotation)),
        );

        debug!(align_box:% = box_id, members = placed; "Align box reflowed");
    }
}

impl LayoutRule for AlignLayoutRule {
    fn name(&self) -> &'static str {
        "align"
    }

    fn apply(&self, composite: &ShapeComposite, patch: &Patch) -> Patch {
        let next = composite.apply_patch(patch);
        let mut refinement = Refinement::new(&next);

        let is_box = |id: &Id| next.role(*id) == Some(ShapeRole::AlignBox);
        let mut boxes = IndexSet::new();
        for id in affected_ids(composite, patch, &next) {
            if is_box(&id) {
                boxes.insert(id);
            }
            boxes.extend(next.ancestors(id).into_iter().filter(is_box));
        }

        let mut boxes: Vec<Id> = boxes.into_iter().collect();
        boxes.sort_by_key(|id| std::cmp::Reverse(next.ancestors(*id).len()));
        for box_id in boxes {
            self.layout_box(&mut refinement, box_id);
        }
        refinement.into_patch()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use float_cmp::assert_approx_eq;
    use indexmap::IndexMap;
    use tangram_core::{
        geometry::{Insets, Size},
        order_key::OrderKey,
        patch::PartialShape,
        shape::{AlignLayout, Shape, ShapeType},
    };

    use super::*;
    use crate::registry::{ALIGN_BOX, RECTANGLE, ShapeRegistry};

    fn align_box(id: &str, layout: AlignLayout) -> Shape {
        Shape::new(
            Id::new(id),
            ShapeType::new(ALIGN_BOX),
            Geometry::Rect(RectGeometry::new(Point::new(0.0, 0.0), 10.0, 10.0)),
        )
        .with_align(layout)
    }

    fn member(id: &str, parent: &str, size: Size, findex: &str) -> Shape {
        Shape::new(
            Id::new(id),
            ShapeType::new(RECTANGLE),
            Geometry::Rect(RectGeometry::new(
                Point::new(100.0, 100.0),
                size.width(),
                size.height(),
            )),
        )
        .with_parent(Id::new(parent))
        .with_findex(OrderKey::parse(findex).expect("valid key"))
    }

    fn composite(shapes: Vec<Shape>) -> ShapeComposite {
        ShapeComposite::new(shapes, IndexMap::new(), Rc::new(ShapeRegistry::default()))
    }

    fn rect_of(composite: &ShapeComposite, id: &str) -> RectGeometry {
        composite
            .shape(Id::new(id))
            .and_then(|shape| shape.rect())
            .copied()
            .expect("box shape")
    }

    fn touch(id: &str) -> Patch {
        let mut patch = Patch::new();
        patch.touch(Id::new(id));
        patch
    }

    #[test]
    fn test_row_with_padding() {
        let layout = AlignLayout::new(AlignDirection::Row, 10.0).with_padding(Insets::uniform(5.0));
        let c = composite(vec![
            align_box("box", layout),
            member("b", "box", Size::new(30.0, 20.0), "a2"),
            member("a", "box", Size::new(20.0, 10.0), "a1"),
        ]);

        let next = c.apply_patch(&AlignLayoutRule.apply(&c, &touch("box")));

        assert_eq!(rect_of(&next, "a").p, Point::new(5.0, 5.0));
        assert_eq!(rect_of(&next, "b").p, Point::new(35.0, 5.0));
        assert_eq!(rect_of(&next, "box").size(), Size::new(70.0, 30.0));
    }

    #[test]
    fn test_column_wraps() {
        let layout = AlignLayout::new(AlignDirection::Column, 0.0).with_wrap(30.0);
        let c = composite(vec![
            align_box("box", layout),
            member("a", "box", Size::new(10.0, 20.0), "a1"),
            member("b", "box", Size::new(10.0, 20.0), "a2"),
            member("c", "box", Size::new(10.0, 20.0), "a3"),
        ]);

        let next = c.apply_patch(&AlignLayoutRule.apply(&c, &touch("b")));

        assert_eq!(rect_of(&next, "a").p, Point::new(0.0, 0.0));
        assert_eq!(rect_of(&next, "b").p, Point::new(10.0, 0.0));
        assert_eq!(rect_of(&next, "c").p, Point::new(20.0, 0.0));
        assert_eq!(rect_of(&next, "box").size(), Size::new(30.0, 20.0));
    }

    #[test]
    fn test_nested_boxes_reflow_innermost_first() {
        let row = AlignLayout::new(AlignDirection::Row, 10.0);
        let c = composite(vec![
            align_box("outer", AlignLayout::new(AlignDirection::Column, 10.0)),
            member("header", "outer", Size::new(50.0, 10.0), "a1"),
            align_box("inner", row)
                .with_parent(Id::new("outer"))
                .with_findex(OrderKey::parse("a2").expect("valid key")),
            member("x", "inner", Size::new(20.0, 20.0), "a1"),
            member("y", "inner", Size::new(20.0, 20.0), "a2"),
        ]);
        let patch = Patch::new().with_update(
            Id::new("y"),
            PartialShape::default().with_geometry(Geometry::Rect(RectGeometry::new(
                Point::new(0.0, 0.0),
                40.0,
                20.0,
            ))),
        );

        let next = c.apply_patch(&patch);
        let next = next.apply_patch(&AlignLayoutRule.apply(&c, &patch));

        assert_eq!(rect_of(&next, "inner").size(), Size::new(70.0, 20.0));
        assert_eq!(rect_of(&next, "inner").p, Point::new(0.0, 20.0));
        assert_eq!(rect_of(&next, "x").p, Point::new(0.0, 20.0));
        assert_eq!(rect_of(&next, "y").p, Point::new(30.0, 20.0));
        let outer = rect_of(&next, "outer");
        assert_approx_eq!(f64, outer.width, 70.0);
        assert_approx_eq!(f64, outer.height, 40.0);
    }

    #[test]
    fn test_empty_box_keeps_size() {
        let c = composite(vec![align_box("box", AlignLayout::default())]);
        assert!(AlignLayoutRule.apply(&c, &touch("box")).is_empty());
    }

    #[test]
    fn test_reflow_is_idempotent() {
        let c = composite(vec![
            align_box("box", AlignLayout::new(AlignDirection::Row, 4.0)),
            member("a", "box", Size::new(20.0, 10.0), "a1"),
            member("b", "box", Size::new(20.0, 10.0), "a2"),
        ]);

        let next = c.apply_patch(&AlignLayoutRule.apply(&c, &touch("a")));
        assert!(AlignLayoutRule.apply(&next, &touch("a")).is_empty());
    }
}
