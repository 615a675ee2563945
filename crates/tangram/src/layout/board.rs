//! Board (kanban) layout.
//!
//! Columns, lanes, and cards are scene children of their board root. Cards
//! name their cell with `column_id` and an optional `lane_id`. The grid is:
//!
//! ```text
//!  root ┌──────────────────────────────────────┐
//!       │ root header                          │
//!       │ gap ┌ column ──────┐ gap ┌ column ─┐ gap
//!       │     │ column header│     │         │
//!  lane ├─────┼──────────────┼─────┼─────────┤  one row per lane
//!       │     │ gap card gap │     │         │
//!       └──────────────────────────────────────┘
//! ```
//!
//! Cards without a lane go to a trailing lane-less row, which exists only
//! when such cards exist or the board has no lanes at all.

use std::collections::HashMap;

use indexmap::IndexSet;
use log::{debug, warn};

use tangram_core::{
    geometry::Point,
    identifier::Id,
    patch::{PartialShape, Patch},
    shape::{Geometry, RectGeometry},
};

use super::{LayoutRule, Refinement, affected_ids};
use crate::{composite::ShapeComposite, config::BoardConfig, registry::ShapeRole};

/// Lays out board columns, lanes, and cards.
#[derive(Debug, Clone, Default)]
pub struct BoardLayout {
    config: BoardConfig,
}

impl BoardLayout {
    pub fn new(config: BoardConfig) -> Self {
        Self { config }
    }

    fn layout_board(&self, refinement: &mut Refinement, root_id: Id) {
        let base = refinement.base();
        let Some(root_rect) = base.shape(root_id).and_then(|root| root.rect()).copied() else {
            return;
        };

        let members_with = |role: ShapeRole| -> Vec<Id> {
            base.child_ids(root_id)
                .iter()
                .copied()
                .filter(|id| base.role(*id) == Some(role))
                .collect()
        };
        let columns = members_with(ShapeRole::BoardColumn);
        let lanes = members_with(ShapeRole::BoardLane);
        let cards = members_with(ShapeRole::BoardCard);

        // Cell of every surviving card; stale cards are deleted, stale lanes dropped.
        let mut cells: HashMap<(Id, Option<Id>), Vec<Id>> = HashMap::new();
        let mut has_laneless_card = false;
        for card in cards {
            let Some(shape) = base.shape(card) else {
                continue;
            };
            let Some(column) = shape.column_id.filter(|column| columns.contains(column)) else {
                warn!(card:% = card; "Deleting card whose column is gone");
                refinement.delete(card);
                continue;
            };
            let lane = match shape.lane_id {
                Some(lane) if lanes.contains(&lane) => Some(lane),
                Some(_) => {
                    warn!(card:% = card; "Dropping missing lane from card");
                    refinement.update(card, &PartialShape::default().with_lane_id(None));
                    None
                }
                None => None,
            };
            has_laneless_card |= lane.is_none();
            cells.entry((column, lane)).or_default().push(card);
        }

        let mut rows: Vec<Option<Id>> = lanes.iter().copied().map(Some).collect();
        if has_laneless_card || lanes.is_empty() {
            rows.push(None);
        }

        let gap = self.config.gap();
        let column_width = self.config.column_width();
        let row_heights: Vec<f64> = rows
            .iter()
            .map(|row| {
                let tallest = columns
                    .iter()
                    .map(|column| self.cell_stack_height(refinement, cells.get(&(*column, *row))))
                    .fold(self.config.empty_cell_height() + gap, f64::max);
                gap + tallest
            })
            .collect();

        let origin = root_rect.p;
        let grid_width = column_width * columns.len() as f64
            + gap * columns.len().saturating_sub(1) as f64;
        let column_top = origin.y() + self.config.root_header();
        let rows_top = column_top + self.config.column_header();
        let column_height = self.config.column_header() + row_heights.iter().sum::<f64>();

        for (i, column) in columns.iter().enumerate() {
            let x = origin.x() + gap + i as f64 * (column_width + gap);
            set_box(refinement, *column, Point::new(x, column_top), column_width, column_height);

            let mut row_top = rows_top;
            for (row, height) in rows.iter().zip(&row_heights) {
                let mut cursor = row_top + gap;
                for card in cells.get(&(*column, *row)).into_iter().flatten() {
                    let Some(card_height) = box_height(refinement, *card) else {
                        continue;
                    };
                    set_box(
                        refinement,
                        *card,
                        Point::new(x + gap, cursor),
                        self.config.card_width(),
                        card_height,
                    );
                    cursor += card_height + gap;
                }
                row_top += height;
            }
        }

        let mut row_top = rows_top;
        for (row, height) in rows.iter().zip(&row_heights) {
            if let Some(lane) = row {
                set_box(
                    refinement,
                    *lane,
                    Point::new(origin.x() + gap, row_top),
                    grid_width,
                    *height,
                );
            }
            row_top += height;
        }

        let root_width = gap + grid_width + gap;
        let root_height = self.config.root_header() + column_height + gap;
        set_box(refinement, root_id, origin, root_width, root_height);

        debug!(
            board:% = root_id,
            columns = columns.len(),
            rows = rows.len();
            "Board laid out"
        );
    }

    /// Height of a cell's card stack, each card followed by a gap.
    fn cell_stack_height(&self, refinement: &Refinement, cards: Option<&Vec<Id>>) -> f64 {
        cards
            .into_iter()
            .flatten()
            .filter_map(|card| box_height(refinement, *card))
            .map(|height| height + self.config.gap())
            .sum()
    }
}

fn box_height(refinement: &Refinement, id: Id) -> Option<f64> {
    refinement
        .shape(id)
        .and_then(|shape| shape.rect())
        .map(|rect| rect.height)
}

/// Resizes `id` to an unrotated box and moves its scene content along.
fn set_box(refinement: &mut Refinement, id: Id, p: Point, width: f64, height: f64) {
    let Some(previous) = refinement.shape(id).and_then(|shape| shape.rect()).copied() else {
        return;
    };
    refinement.set_geometry(id, Geometry::Rect(RectGeometry::new(p, width, height)));
    if refinement.base().role(id) == Some(ShapeRole::BoardCard) {
        refinement.translate_descendants(id, p.sub_point(previous.p));
    }
}

/// Board root of a column, lane, or card: its scene parent, if that is a board root.
fn board_root_of(composite: &ShapeComposite, id: Id) -> Option<Id> {
    composite
        .parent_id(id)
        .filter(|parent_id| composite.role(*parent_id) == Some(ShapeRole::BoardRoot))
}

impl LayoutRule for BoardLayout {
    fn name(&self) -> &'static str {
        "board"
    }

    fn apply(&self, composite: &ShapeComposite, patch: &Patch) -> Patch {
        let next = composite.apply_patch(patch);
        let mut refinement = Refinement::new(&next);

        let mut roots = IndexSet::new();
        for id in affected_ids(composite, patch, &next) {
            let Some(role) = next.role(id) else {
                continue;
            };
            match (role, board_root_of(&next, id)) {
                (ShapeRole::BoardRoot, _) => {
                    roots.insert(id);
                }
                (ShapeRole::BoardColumn | ShapeRole::BoardLane | ShapeRole::BoardCard, Some(root_id)) => {
                    roots.insert(root_id);
                }
                (ShapeRole::BoardColumn | ShapeRole::BoardLane, None) => refinement.demote(id),
                (ShapeRole::BoardCard, None) => {
                    warn!(card:% = id; "Deleting card outside any board");
                    refinement.delete(id);
                }
                _ => {}
            }
        }

        for root_id in roots {
            self.layout_board(&mut refinement, root_id);
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
        geometry::Size,
        order_key::OrderKey,
        shape::{Shape, ShapeType},
    };

    use super::*;
    use crate::registry::{BOARD_CARD, BOARD_COLUMN, BOARD_LANE, BOARD_ROOT, RECTANGLE, ShapeRegistry};

    fn boxed(id: &str, shape_type: &str, height: f64) -> Shape {
        Shape::new(
            Id::new(id),
            ShapeType::new(shape_type),
            Geometry::Rect(RectGeometry::new(Point::new(0.0, 0.0), 50.0, height)),
        )
    }

    fn member(id: &str, shape_type: &str, height: f64) -> Shape {
        boxed(id, shape_type, height).with_parent(Id::new("board"))
    }

    fn card(id: &str, column: &str, lane: Option<&str>, findex: &str) -> Shape {
        member(id, BOARD_CARD, 100.0)
            .with_board_cell(Id::new(column), lane.map(Id::new))
            .with_findex(OrderKey::parse(findex).expect("valid key"))
    }

    fn composite(shapes: Vec<Shape>) -> ShapeComposite {
        ShapeComposite::new(shapes, IndexMap::new(), Rc::new(ShapeRegistry::default()))
    }

    fn size_of(composite: &ShapeComposite, id: &str) -> Size {
        composite
            .shape(Id::new(id))
            .and_then(|shape| shape.rect())
            .map(|rect| rect.size())
            .expect("box shape")
    }

    fn touch(id: &str) -> Patch {
        let mut patch = Patch::new();
        patch.touch(Id::new(id));
        patch
    }

    /// Four shapes to lay out plus a card whose column is gone; that card's
    /// deletion is the fifth entry of the resulting patch.
    fn single_cell_board() -> ShapeComposite {
        composite(vec![
            boxed("board", BOARD_ROOT, 10.0),
            member("column", BOARD_COLUMN, 10.0),
            member("lane", BOARD_LANE, 10.0),
            card("card", "column", Some("lane"), "a1"),
            card("stale", "gone", None, "a2"),
        ])
    }

    #[test]
    fn test_single_cell_board_metrics() {
        let c = single_cell_board();
        let rule = BoardLayout::default();

        let refinement = rule.apply(&c, &touch("board"));

        assert_eq!(refinement.update.len() + refinement.delete.len(), 5);
        assert_eq!(refinement.delete, vec![Id::new("stale")]);

        let next = c.apply_patch(&refinement);
        assert_eq!(size_of(&next, "board"), Size::new(380.0, 240.0));
        assert_eq!(size_of(&next, "column"), Size::new(340.0, 180.0));
        assert_eq!(size_of(&next, "lane"), Size::new(340.0, 140.0));
        assert_eq!(size_of(&next, "card"), Size::new(300.0, 100.0));

        let card = next.shape(Id::new("card")).and_then(|s| s.rect()).copied().expect("card");
        assert_approx_eq!(f64, card.p.x(), 40.0);
        assert_approx_eq!(f64, card.p.y(), 100.0);
    }

    #[test]
    fn test_cards_stack_in_findex_order() {
        let c = composite(vec![
            boxed("board", BOARD_ROOT, 10.0),
            member("column", BOARD_COLUMN, 10.0),
            card("second", "column", None, "a2"),
            card("first", "column", None, "a1"),
        ]);
        let rule = BoardLayout::default();

        let next = c.apply_patch(&rule.apply(&c, &touch("first")));

        let y = |id: &str| {
            next.shape(Id::new(id))
                .and_then(|shape| shape.rect())
                .map(|rect| rect.p.y())
                .expect("card")
        };
        assert_approx_eq!(f64, y("first"), 100.0);
        assert_approx_eq!(f64, y("second"), 220.0);
        // Lane-less row: 20 + (100 + 20) * 2
        assert_eq!(size_of(&next, "column"), Size::new(340.0, 300.0));
    }

    #[test]
    fn test_empty_column_uses_empty_cell_height() {
        let c = composite(vec![
            boxed("board", BOARD_ROOT, 10.0),
            member("a", BOARD_COLUMN, 10.0),
            member("b", BOARD_COLUMN, 10.0),
        ]);
        let rule = BoardLayout::default();

        let next = c.apply_patch(&rule.apply(&c, &touch("board")));

        // One lane-less row of 20 + 60 + 20.
        assert_eq!(size_of(&next, "a"), Size::new(340.0, 140.0));
        assert_eq!(size_of(&next, "board"), Size::new(740.0, 200.0));
        let b = next.shape(Id::new("b")).and_then(|s| s.rect()).copied().expect("column");
        assert_approx_eq!(f64, b.p.x(), 380.0);
    }

    #[test]
    fn test_missing_lane_moves_card_to_laneless_row() {
        let c = composite(vec![
            boxed("board", BOARD_ROOT, 10.0),
            member("column", BOARD_COLUMN, 10.0),
            member("lane", BOARD_LANE, 10.0),
            card("card", "column", Some("vanished"), "a1"),
        ]);
        let rule = BoardLayout::default();

        let refinement = rule.apply(&c, &touch("card"));
        assert_eq!(refinement.update[&Id::new("card")].lane_id, Some(None));

        let next = c.apply_patch(&refinement);
        // Headers (80), the empty lane row (100), then the lane-less row's gap.
        let card = next.shape(Id::new("card")).and_then(|s| s.rect()).copied().expect("card");
        assert_approx_eq!(f64, card.p.y(), 80.0 + 100.0 + 20.0);
    }

    #[test]
    fn test_orphan_members_demoted_or_deleted() {
        let c = composite(vec![
            boxed("column", BOARD_COLUMN, 10.0),
            boxed("card", BOARD_CARD, 10.0).with_board_cell(Id::new("column"), None),
        ]);
        let rule = BoardLayout::default();
        let mut patch = touch("column");
        patch.touch(Id::new("card"));

        let refinement = rule.apply(&c, &patch);

        assert_eq!(refinement.delete, vec![Id::new("card")]);
        assert_eq!(
            refinement.update[&Id::new("column")].shape_type,
            Some(ShapeType::new(RECTANGLE))
        );
    }

    #[test]
    fn test_layout_is_idempotent() {
        let c = single_cell_board();
        let rule = BoardLayout::default();

        let next = c.apply_patch(&rule.apply(&c, &touch("board")));
        assert!(rule.apply(&next, &touch("board")).is_empty());
    }
}
