//! Constraint-aware resizing of groups.
//!
//! Under a non-rigid group transform every descendant follows its own
//! [`GroupConstraint`]: per axis, a code picks which of start margin, size,
//! end margin, or center offset survive the resize.
//!
//! | Code | Kept along the axis                                   |
//! |------|-------------------------------------------------------|
//! | 0    | nothing, the group transform applies verbatim         |
//! | 1    | start margin; size and end margin share the rest      |
//! | 2    | end margin; size and start margin share the rest      |
//! | 3    | size; both margins scale proportionally               |
//! | 4    | start margin and size                                 |
//! | 5    | end margin and size                                   |
//! | 6    | both margins; size stretches                          |
//! | 7    | size and the offset from the group center             |
//!
//! A constrained shape gets its own effective transform, which its
//! descendants then resolve against. Zero-extent shapes and groups map by
//! translation only.

use log::{debug, warn};

use tangram_core::{
    geometry::{Affine, Bounds, EPSILON, Point, Size},
    identifier::Id,
    patch::Patch,
    shape::GroupConstraint,
};

use crate::composite::ShapeComposite;

/// Position of a shape along one axis, relative to its group.
#[derive(Debug, Clone, Copy)]
struct AxisSpan {
    /// Start of the shape.
    start: f64,
    /// Extent of the shape.
    size: f64,
}

/// Group extent along one axis, before and after the transform.
#[derive(Debug, Clone, Copy)]
struct AxisFrame {
    old_start: f64,
    old_size: f64,
    new_start: f64,
    new_size: f64,
}

impl AxisFrame {
    fn resolve(self, span: AxisSpan, code: u8) -> AxisSpan {
        let start_margin = span.start - self.old_start;
        let end_margin = self.old_start + self.old_size - span.start - span.size;
        let new_end = self.new_start + self.new_size;

        // Share `room` between two parts in their old proportion.
        let share = |room: f64, part: f64, other: f64| {
            if (part + other).abs() < EPSILON {
                part
            } else {
                part * room / (part + other)
            }
        };

        match code {
            1 => {
                let size = share(self.new_size - start_margin, span.size, end_margin);
                AxisSpan {
                    start: self.new_start + start_margin,
                    size,
                }
            }
            2 => {
                let size = share(self.new_size - end_margin, span.size, start_margin);
                AxisSpan {
                    start: new_end - end_margin - size,
                    size,
                }
            }
            3 => {
                let old_free = self.old_size - span.size;
                let new_free = self.new_size - span.size;
                let start = if old_free.abs() < EPSILON {
                    new_free / 2.0
                } else {
                    start_margin * new_free / old_free
                };
                AxisSpan {
                    start: self.new_start + start,
                    size: span.size,
                }
            }
            4 => AxisSpan {
                start: self.new_start + start_margin,
                size: span.size,
            },
            5 => AxisSpan {
                start: new_end - end_margin - span.size,
                size: span.size,
            },
            6 => AxisSpan {
                start: self.new_start + start_margin,
                size: (self.new_size - start_margin - end_margin).max(0.0),
            },
            7 => {
                let offset = span.start + span.size / 2.0 - (self.old_start + self.old_size / 2.0);
                let center = self.new_start + self.new_size / 2.0 + offset;
                AxisSpan {
                    start: center - span.size / 2.0,
                    size: span.size,
                }
            }
            _ => {
                if self.old_size.abs() < EPSILON {
                    return AxisSpan {
                        start: self.new_start + start_margin,
                        size: span.size,
                    };
                }
                let scale = self.new_size / self.old_size;
                AxisSpan {
                    start: self.new_start + start_margin * scale,
                    size: span.size * scale,
                }
            }
        }
    }
}

fn known_code(code: u8, shape_id: Id) -> u8 {
    if code <= 7 {
        return code;
    }
    warn!(shape_id:% = shape_id, code; "Unknown constraint code, scaling instead");
    0
}

/// Bounds `child` takes inside a group resized from `old` to `new`.
fn resolve_bounds(child: Bounds, old: Bounds, new: Bounds, constraint: GroupConstraint, id: Id) -> Bounds {
    let horizontal = AxisFrame {
        old_start: old.min_x(),
        old_size: old.width(),
        new_start: new.min_x(),
        new_size: new.width(),
    }
    .resolve(
        AxisSpan {
            start: child.min_x(),
            size: child.width(),
        },
        known_code(constraint.horizontal, id),
    );
    let vertical = AxisFrame {
        old_start: old.min_y(),
        old_size: old.height(),
        new_start: new.min_y(),
        new_size: new.height(),
    }
    .resolve(
        AxisSpan {
            start: child.min_y(),
            size: child.height(),
        },
        known_code(constraint.vertical, id),
    );

    Bounds::new_from_top_left(
        Point::new(horizontal.start, vertical.start),
        Size::new(horizontal.size, vertical.size),
    )
}

/// The patch the descendants of `group_ids` receive when each group is
/// transformed by `affine`.
///
/// Groups that do not exist are skipped.
pub fn apply(composite: &ShapeComposite, group_ids: &[Id], affine: &Affine) -> Patch {
    let mut patch = Patch::new();
    for group_id in group_ids {
        let Some(old) = composite.bounds(*group_id) else {
            continue;
        };
        let new = affine.apply_bounds(old);
        resolve_children(composite, &mut patch, *group_id, old, new, affine);
    }
    debug!(groups = group_ids.len(), updated = patch.update.len(); "Group constraints resolved");
    patch
}

fn resolve_children(
    composite: &ShapeComposite,
    patch: &mut Patch,
    parent_id: Id,
    old: Bounds,
    new: Bounds,
    affine: &Affine,
) {
    for child_id in composite.child_ids(parent_id) {
        resolve_shape(composite, patch, *child_id, old, new, affine);
    }
}

fn resolve_shape(
    composite: &ShapeComposite,
    patch: &mut Patch,
    id: Id,
    group_old: Bounds,
    group_new: Bounds,
    group_affine: &Affine,
) {
    let (Some(shape), Some(old)) = (composite.shape(id), composite.bounds(id)) else {
        return;
    };

    let effective = if shape.constraint.is_default() {
        *group_affine
    } else {
        let resolved = resolve_bounds(old, group_old, group_new, shape.constraint, id);
        Affine::map_bounds(old, resolved)
    };

    patch.update_shape(id, composite.shape_struct(shape).transform(shape, &effective));
    let new = effective.apply_bounds(old);
    resolve_children(composite, patch, id, old, new, &effective);
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use float_cmp::assert_approx_eq;
    use indexmap::IndexMap;
    use tangram_core::shape::{Geometry, RectGeometry, Shape, ShapeType};

    use super::*;
    use crate::registry::{GROUP, RECTANGLE, ShapeRegistry};

    fn group(id: &str) -> Shape {
        Shape::new(Id::new(id), ShapeType::new(GROUP), Geometry::default())
    }

    fn rect(id: &str, parent: &str, y: f64, height: f64) -> Shape {
        Shape::new(
            Id::new(id),
            ShapeType::new(RECTANGLE),
            Geometry::Rect(RectGeometry::new(Point::new(0.0, y), 100.0, height)),
        )
        .with_parent(Id::new(parent))
    }

    fn composite(shapes: Vec<Shape>) -> ShapeComposite {
        ShapeComposite::new(shapes, IndexMap::new(), Rc::new(ShapeRegistry::default()))
    }

    fn resolved(composite: &ShapeComposite, patch: &Patch, id: &str) -> RectGeometry {
        composite
            .apply_patch(patch)
            .shape(Id::new(id))
            .and_then(|shape| shape.rect())
            .copied()
            .expect("box shape")
    }

    /// A 100x100 group: a frame spanning it and a child at y 10 with height 20.
    fn framed(code: u8) -> ShapeComposite {
        composite(vec![
            group("g"),
            rect("frame", "g", 0.0, 100.0),
            rect("child", "g", 10.0, 20.0).with_constraint(GroupConstraint::vertical(code)),
        ])
    }

    fn stretched(code: u8) -> (f64, f64) {
        let c = framed(code);
        let patch = apply(&c, &[Id::new("g")], &Affine::scaling(1.0, 2.0));
        let child = resolved(&c, &patch, "child");
        (child.p.y(), child.height)
    }

    #[test]
    fn test_default_code_follows_group() {
        let c = composite(vec![
            group("g"),
            rect("frame", "g", 0.0, 20.0),
            rect("child", "g", 5.0, 10.0),
        ]);
        // Maps the group onto its lower half.
        let affine = Affine::new(1.0, 0.0, 0.0, 0.5, 0.0, 10.0);

        let patch = apply(&c, &[Id::new("g")], &affine);

        let child = resolved(&c, &patch, "child");
        assert_approx_eq!(f64, child.p.y(), 12.5);
        assert_approx_eq!(f64, child.height, 5.0);
    }

    #[test]
    fn test_code_table() {
        let cases: [(u8, f64, f64); 8] = [
            (0, 20.0, 40.0),
            (1, 10.0, 20.0 * 190.0 / 90.0),
            (2, 130.0 - 20.0 * 130.0 / 30.0, 20.0 * 130.0 / 30.0),
            (3, 22.5, 20.0),
            (4, 10.0, 20.0),
            (5, 110.0, 20.0),
            (6, 10.0, 120.0),
            (7, 60.0, 20.0),
        ];
        for (code, y, height) in cases {
            let (actual_y, actual_height) = stretched(code);
            assert_approx_eq!(f64, actual_y, y, epsilon = 1e-9);
            assert_approx_eq!(f64, actual_height, height, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_unknown_code_scales() {
        assert_eq!(stretched(42), stretched(0));
    }

    #[test]
    fn test_horizontal_axis_uses_same_table() {
        let c = composite(vec![
            group("g"),
            rect("frame", "g", 0.0, 100.0),
            rect("child", "g", 0.0, 100.0).with_constraint(GroupConstraint::new(0, 4)),
        ]);

        let patch = apply(&c, &[Id::new("g")], &Affine::scaling(3.0, 1.0));

        let child = resolved(&c, &patch, "child");
        assert_approx_eq!(f64, child.p.x(), 0.0);
        assert_approx_eq!(f64, child.width, 100.0);
        assert_approx_eq!(f64, resolved(&c, &patch, "frame").width, 300.0);
    }

    #[test]
    fn test_nested_group_resolves_against_effective_transform() {
        let c = composite(vec![
            group("outer"),
            rect("frame", "outer", 0.0, 100.0),
            group("inner")
                .with_parent(Id::new("outer"))
                .with_constraint(GroupConstraint::vertical(4)),
            rect("leaf", "inner", 10.0, 20.0),
        ]);

        let patch = apply(&c, &[Id::new("outer")], &Affine::scaling(1.0, 2.0));

        // The inner group keeps its start and size, so its content does too.
        let leaf = resolved(&c, &patch, "leaf");
        assert_approx_eq!(f64, leaf.p.y(), 10.0, epsilon = 1e-9);
        assert_approx_eq!(f64, leaf.height, 20.0, epsilon = 1e-9);
        assert_approx_eq!(f64, resolved(&c, &patch, "frame").height, 200.0);
    }

    #[test]
    fn test_zero_extent_group_translates() {
        let c = composite(vec![
            group("g"),
            rect("flat", "g", 10.0, 0.0).with_constraint(GroupConstraint::vertical(1)),
        ]);

        let patch = apply(&c, &[Id::new("g")], &Affine::translation(0.0, 5.0));

        let flat = resolved(&c, &patch, "flat");
        assert_approx_eq!(f64, flat.p.y(), 15.0);
        assert_approx_eq!(f64, flat.height, 0.0);
    }
}
