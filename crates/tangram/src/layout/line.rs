//! Line relation layout.
//!
//! Keeps lines and the shapes bound to them consistent:
//!
//! - connected endpoints sit at their rate inside the target's box, which may
//!   be rotated, a group's children bounds, or another line;
//! - elbow lines are routed orthogonally through the midpoint;
//! - attached shapes sit at their rate along the host line and, for relative
//!   attachments, turn with the segment they lie on;
//! - line-bound labels are centered at their rate along the parent line.
//!
//! Relations whose target is gone are cleared.

use indexmap::IndexSet;
use log::{debug, warn};

use tangram_core::{
    geometry::{EPSILON, Point},
    identifier::Id,
    patch::{PartialShape, Patch},
    shape::{Connection, Geometry, LineGeometry, RectGeometry, RotationType},
};

use super::{LayoutRule, Refinement, affected_ids};
use crate::{composite::ShapeComposite, registry::ShapeRole};

/// Syncs lines with their connections, attachments, and labels.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineLayout;

/// Orthogonal route between two points, bending once along the dominant axis.
fn elbow_route(p: Point, q: Point) -> Vec<Point> {
    let delta = q.sub_point(p);
    if delta.x().abs() < EPSILON || delta.y().abs() < EPSILON {
        return Vec::new();
    }
    if delta.x().abs() >= delta.y().abs() {
        let mid_x = (p.x() + q.x()) / 2.0;
        vec![Point::new(mid_x, p.y()), Point::new(mid_x, q.y())]
    } else {
        let mid_y = (p.y() + q.y()) / 2.0;
        vec![Point::new(p.x(), mid_y), Point::new(q.x(), mid_y)]
    }
}

/// Where a connection lands on its target, `None` when the target is gone.
fn connection_point(refinement: &Refinement, connection: &Connection) -> Option<Point> {
    let target = refinement.shape(connection.id)?;
    if refinement.base().shape_struct(target).bounds_from_children() {
        return refinement
            .bounds(connection.id)
            .map(|bounds| bounds.point_at_rate(connection.rate));
    }
    match &target.geometry {
        Geometry::Rect(rect) => Some(rect.point_at_rate(connection.rate)),
        Geometry::Line(line) => Some(line.point_at_rate(connection.rate.x()).0),
    }
}

fn host_line(refinement: &Refinement, id: Id) -> Option<LineGeometry> {
    refinement.shape(id).and_then(|shape| shape.line()).cloned()
}

/// Moves a box to `rect`, carrying its scene content along.
fn place_box(refinement: &mut Refinement, id: Id, previous: &RectGeometry, rect: RectGeometry) {
    refinement.set_geometry(id, Geometry::Rect(rect));
    refinement.translate_descendants(id, rect.p.sub_point(previous.p));
}

impl LineLayout {
    fn sync_line(&self, refinement: &mut Refinement, line_id: Id) {
        let Some(shape) = refinement.shape(line_id) else {
            return;
        };
        let Some(mut line) = shape.line().cloned() else {
            return;
        };
        let (p_connection, q_connection) = (shape.p_connection, shape.q_connection);

        let mut partial = PartialShape::default();
        if let Some(connection) = p_connection {
            match connection_point(refinement, &connection) {
                Some(point) => line.p = point,
                None => {
                    warn!(line:% = line_id, target:% = connection.id; "Clearing dangling connection");
                    partial = partial.with_p_connection(None);
                }
            }
        }
        if let Some(connection) = q_connection {
            match connection_point(refinement, &connection) {
                Some(point) => line.q = point,
                None => {
                    warn!(line:% = line_id, target:% = connection.id; "Clearing dangling connection");
                    partial = partial.with_q_connection(None);
                }
            }
        }
        if line.elbow {
            line.body = elbow_route(line.p, line.q);
        }

        refinement.update(line_id, &partial.with_geometry(Geometry::Line(line)));
    }

    fn sync_attachment(&self, refinement: &mut Refinement, id: Id) {
        let Some(shape) = refinement.shape(id) else {
            return;
        };
        let (Some(attachment), Some(rect)) = (shape.attachment, shape.rect().copied()) else {
            return;
        };
        let Some(host) = host_line(refinement, attachment.id) else {
            warn!(shape_id:% = id, host:% = attachment.id; "Clearing attachment to a missing line");
            refinement.update(id, &PartialShape::default().with_attachment(None));
            return;
        };

        let (point, angle) = host.point_at_rate(attachment.to);
        let rotation = match attachment.rotation_type {
            RotationType::Relative => angle + attachment.rotation,
            RotationType::Absolute => rect.rotation,
        };
        let anchor_offset = Point::new(
            rect.width * (attachment.anchor.x() - 0.5),
            rect.height * (attachment.anchor.y() - 0.5),
        );
        let center = point.sub_point(anchor_offset.rotate(rotation));
        let p = center.sub_point(Point::new(rect.width / 2.0, rect.height / 2.0));

        let placed = RectGeometry::new(p, rect.width, rect.height).with_rotation(rotation);
        place_box(refinement, id, &rect, placed);
    }

    fn sync_label(&self, refinement: &mut Refinement, id: Id) {
        let Some(shape) = refinement.shape(id) else {
            return;
        };
        let (Some(rate), Some(rect)) = (shape.line_attached, shape.rect().copied()) else {
            return;
        };
        let line = refinement
            .base()
            .parent_id(id)
            .and_then(|parent_id| host_line(refinement, parent_id));
        let Some(line) = line else {
            warn!(shape_id:% = id; "Clearing label binding outside a line");
            refinement.update(id, &PartialShape::default().with_line_attached(None));
            return;
        };

        let (point, _) = line.point_at_rate(rate);
        let p = point.sub_point(Point::new(rect.width / 2.0, rect.height / 2.0));
        let placed = RectGeometry::new(p, rect.width, rect.height).with_rotation(rect.rotation);
        place_box(refinement, id, &rect, placed);
    }
}

impl LayoutRule for LineLayout {
    fn name(&self) -> &'static str {
        "line"
    }

    fn apply(&self, composite: &ShapeComposite, patch: &Patch) -> Patch {
        let next = composite.apply_patch(patch);
        let affected = affected_ids(composite, patch, &next);
        if affected.is_empty() {
            return Patch::new();
        }

        let mut lines = IndexSet::new();
        for shape in next.merged_shapes() {
            if next.shape_struct(shape).role() != ShapeRole::Line {
                continue;
            }
            let connected = [shape.p_connection, shape.q_connection]
                .into_iter()
                .flatten()
                .any(|connection| affected.contains(&connection.id));
            if connected || affected.contains(&shape.id) {
                lines.insert(shape.id);
            }
        }

        let moved = |id: &Id| affected.contains(id) || lines.contains(id);
        let mut attached = IndexSet::new();
        let mut labels = IndexSet::new();
        for shape in next.merged_shapes() {
            if let Some(attachment) = shape.attachment {
                if moved(&shape.id) || moved(&attachment.id) {
                    attached.insert(shape.id);
                }
            }
            if shape.line_attached.is_some()
                && (affected.contains(&shape.id) || shape.parent_id.as_ref().is_some_and(moved))
            {
                labels.insert(shape.id);
            }
        }

        let mut refinement = Refinement::new(&next);
        for id in &lines {
            self.sync_line(&mut refinement, *id);
        }
        for id in &attached {
            self.sync_attachment(&mut refinement, *id);
        }
        for id in &labels {
            self.sync_label(&mut refinement, *id);
        }

        debug!(
            lines = lines.len(),
            attached = attached.len(),
            labels = labels.len();
            "Line relations synced"
        );
        refinement.into_patch()
    }
}
