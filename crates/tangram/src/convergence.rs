//! Convergence of a patch to a consistent scene.
//!
//! [`propagate`] runs the layout rules over the shapes a patch touches, in
//! dependency order, until no rule has anything left to refine. Each pass
//! builds a [`DependencyMap`] from the pending ids and walks its layers; an
//! id settles once its layer has been processed. Later refinements of a
//! settled id are absorbed into the result without re-queueing it, so every
//! id is laid out at most once per deletion-free stretch and the loop ends.

use indexmap::IndexSet;
use log::{debug, trace};

use tangram_core::{
    identifier::Id,
    patch::{PartialShape, Patch},
};

use crate::{
    TangramError, composite::ShapeComposite, layout::LayoutRule, relation::DependencyMap,
};

/// Expands `patch` into the patch that leaves the scene consistent.
///
/// The result is a superset of the normalized input: the caller's changes,
/// the deletion cascade, and every layout refinement they cause.
///
/// # Arguments
///
/// * `composite` - The snapshot the patch applies to.
/// * `rules` - Layout rules, run in order for every layer.
/// * `patch` - The caller's change.
///
/// # Errors
///
/// Returns the contract violations of [`ShapeComposite::normalize_patch`].
pub fn propagate(
    composite: &ShapeComposite,
    rules: &[Box<dyn LayoutRule>],
    patch: Patch,
) -> Result<Patch, TangramError> {
    let mut accumulated = composite.normalize_patch(patch)?;

    let mut pending = accumulated.touched_ids();
    pending.extend(deletion_neighbors(composite, &accumulated.delete));

    let mut settled: IndexSet<Id> = IndexSet::new();
    let mut pass = 0;
    while !pending.is_empty() {
        pass += 1;
        let mut current = composite.apply_patch(&accumulated);
        let dependencies = DependencyMap::build(&current, pending.iter().copied());
        let layers = dependencies.layers();
        debug!(
            pass,
            pending = pending.len(),
            closure = dependencies.len(),
            layers = layers.len();
            "Convergence pass"
        );

        let mut next_pending = IndexSet::new();
        for (depth, layer) in layers.into_iter().enumerate() {
            let ids: Vec<Id> = layer
                .into_iter()
                .filter(|id| !settled.contains(id) && current.contains(*id))
                .collect();
            if ids.is_empty() {
                continue;
            }

            let changes = refine_layer(&current, rules, &ids);
            settled.extend(ids.iter().copied());
            if changes.is_empty() {
                continue;
            }

            let mut absorbed = 0;
            for id in changes.touched_ids() {
                if settled.contains(&id) {
                    absorbed += 1;
                } else if !dependencies.contains(id) {
                    next_pending.insert(id);
                }
            }
            // Deletions invalidate whatever referenced the deleted shapes.
            for id in deletion_neighbors(&current, &changes.delete) {
                settled.shift_remove(&id);
                next_pending.insert(id);
            }

            debug!(
                pass,
                depth,
                ids = ids.len(),
                updated = changes.update.len(),
                deleted = changes.delete.len(),
                absorbed;
                "Layer refined"
            );
            trace!(changes:? = changes; "Layer changes");

            accumulated.merge(changes);
            current = composite.apply_patch(&accumulated);
        }

        next_pending.retain(|id| current.contains(*id));
        pending = next_pending;
    }

    trace!(patch:? = accumulated; "Converged");
    Ok(accumulated)
}

/// Runs every rule over one layer and returns what actually changes `current`,
/// with deletions expanded to their closure.
fn refine_layer(current: &ShapeComposite, rules: &[Box<dyn LayoutRule>], ids: &[Id]) -> Patch {
    let mut refined = Patch::new();
    for id in ids {
        refined.touch(*id);
    }
    for rule in rules {
        let refinement = rule.apply(current, &refined);
        if !refinement.is_empty() {
            debug!(
                rule = rule.name(),
                updated = refinement.update.len(),
                deleted = refinement.delete.len();
                "Rule refined layer"
            );
        }
        refined.merge(refinement);
    }

    let mut changes = Patch::new();
    for (id, partial) in &refined.update {
        if let Some(shape) = current.shape(*id) {
            changes.update_shape(*id, PartialShape::diff(shape, &partial.apply_to(shape)));
        }
    }
    let deleted: Vec<Id> = refined
        .delete
        .iter()
        .copied()
        .filter(|id| current.contains(*id))
        .collect();
    if !deleted.is_empty() {
        for id in current.deletion_targets(deleted) {
            changes.delete_shape(id);
        }
    }
    changes
}

/// Surviving shapes that referenced, or were the parent of, a deleted shape.
fn deletion_neighbors(composite: &ShapeComposite, deleted: &[Id]) -> IndexSet<Id> {
    if deleted.is_empty() {
        return IndexSet::new();
    }
    let deleted: IndexSet<Id> = deleted.iter().copied().collect();
    let mut neighbors = composite.referrers(&deleted);
    neighbors.extend(deleted.iter().filter_map(|id| composite.parent_id(*id)));
    neighbors.retain(|id| !deleted.contains(id));
    neighbors
}
