//! Tangram - A scene-graph and layout-consistency engine for collaborative diagram editors.
//!
//! The engine keeps a document of shapes consistent under arbitrary edits.
//! An edit is a [`Patch`](patch::Patch); the engine expands it with the
//! deletion cascade and every layout refinement it causes (lines following
//! their endpoints, tree and board layouts, alignment boxes) until the scene
//! is stable, and hands back the expanded patch for the caller to commit.

pub mod composite;
pub mod config;
pub mod convergence;
pub mod duplicate;
pub mod group_constraint;
pub mod layout;
pub mod registry;
pub mod relation;

mod error;

pub use tangram_core::{geometry, identifier, order_key, patch, shape};

pub use error::TangramError;

use std::rc::Rc;

use indexmap::IndexMap;
use log::{info, trace};

use composite::ShapeComposite;
use config::EngineConfig;
use geometry::{Affine, Point};
use identifier::Id;
use layout::LayoutRule;
use patch::{PartialShape, Patch};
use registry::ShapeRegistry;
use shape::Shape;

/// Entry point bundling the shape registry, configuration, and layout rules.
///
/// # Examples
///
/// ```rust
/// use indexmap::IndexMap;
/// use tangram::{
///     Engine,
///     geometry::Point,
///     identifier::Id,
///     patch::{PartialShape, Patch},
///     shape::{Geometry, RectGeometry, ShapeType},
/// };
///
/// let engine = Engine::default();
/// let square = engine.registry().create(
///     ShapeType::new("rectangle"),
///     Id::new("square"),
///     Geometry::Rect(RectGeometry::new(Point::new(0.0, 0.0), 10.0, 10.0)),
/// );
/// let composite = engine.composite(vec![square], IndexMap::new());
///
/// let moved = PartialShape::default().with_geometry(Geometry::Rect(RectGeometry::new(
///     Point::new(20.0, 0.0),
///     10.0,
///     10.0,
/// )));
/// let patch = engine
///     .propagate(&composite, Patch::new().with_update(Id::new("square"), moved))
///     .expect("valid patch");
/// assert_eq!(patch.update.len(), 1);
/// ```
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    registry: Rc<ShapeRegistry>,
    rules: Vec<Box<dyn LayoutRule>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Create an engine with the built-in shape types and layout rules.
    ///
    /// # Arguments
    ///
    /// * `config` - Spacing of the tree and board layouts
    pub fn new(config: EngineConfig) -> Self {
        let rules = layout::default_rules(&config);
        Self {
            config,
            registry: Rc::new(ShapeRegistry::with_builtins()),
            rules,
        }
    }

    /// Create an engine with a custom registry, e.g. one with extra shape types.
    pub fn with_registry(config: EngineConfig, registry: ShapeRegistry) -> Self {
        Self {
            registry: Rc::new(registry),
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    pub fn rules(&self) -> &[Box<dyn LayoutRule>] {
        &self.rules
    }

    /// Build a snapshot of `shapes` under the preview `overrides`.
    pub fn composite(
        &self,
        shapes: impl IntoIterator<Item = Shape>,
        overrides: IndexMap<Id, PartialShape>,
    ) -> ShapeComposite {
        ShapeComposite::new(shapes, overrides, Rc::clone(&self.registry))
    }

    /// Expand `patch` into the patch that leaves `composite` consistent.
    ///
    /// # Errors
    ///
    /// Returns `TangramError` when the patch violates the caller contract:
    /// colliding added ids or updates of unknown shapes.
    pub fn propagate(&self, composite: &ShapeComposite, patch: Patch) -> Result<Patch, TangramError> {
        info!(
            added = patch.add.len(),
            updated = patch.update.len(),
            deleted = patch.delete.len();
            "Propagating patch"
        );
        let result = convergence::propagate(composite, &self.rules, patch)?;
        info!(
            added = result.add.len(),
            updated = result.update.len(),
            deleted = result.delete.len();
            "Patch converged"
        );
        Ok(result)
    }

    /// Resize groups under `affine`, honoring the constraints of their content.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Engine::propagate`].
    pub fn resize_groups(
        &self,
        composite: &ShapeComposite,
        group_ids: &[Id],
        affine: &Affine,
    ) -> Result<Patch, TangramError> {
        info!(groups = group_ids.len(); "Resizing groups");
        let patch = group_constraint::apply(composite, group_ids, affine);
        trace!(patch:?; "Constraint patch");
        self.propagate(composite, patch)
    }

    /// Copy the branches of `ids`, moved by `offset`.
    ///
    /// # Errors
    ///
    /// Returns `TangramError` when `new_id` yields a taken id or ordering keys
    /// cannot be generated.
    pub fn duplicate(
        &self,
        composite: &ShapeComposite,
        ids: &[Id],
        new_id: impl FnMut(Id) -> Id,
        offset: Point,
    ) -> Result<Patch, TangramError> {
        info!(roots = ids.len(); "Duplicating shapes");
        let patch = duplicate::duplicate_shapes(composite, ids, new_id, offset)?;
        self.propagate(composite, patch)
    }
}
