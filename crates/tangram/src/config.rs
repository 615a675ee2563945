//! Configuration types for the Tangram layout rules.
//!
//! All types implement [`serde::Deserialize`] so they can be loaded from
//! external sources; [`EngineConfig::from_toml`] parses a TOML document.
//!
//! # Overview
//!
//! - [`EngineConfig`] - Top-level configuration combining every rule section.
//! - [`TreeConfig`] - Spacing used by the tree layout.
//! - [`BoardConfig`] - Grid metrics used by the board layout.
//!
//! # Example
//!
//! ```
//! # use tangram::config::EngineConfig;
//! let config = EngineConfig::from_toml("[board]\ngap = 10.0").expect("valid config");
//! assert_eq!(config.board().gap(), 10.0);
//! assert_eq!(config.board().card_width(), 300.0);
//! assert_eq!(config.tree().child_gap(), 40.0);
//! ```

use serde::Deserialize;

use crate::TangramError;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Tree layout section.
    #[serde(default)]
    tree: TreeConfig,

    /// Board layout section.
    #[serde(default)]
    board: BoardConfig,
}

impl EngineConfig {
    /// Creates a new [`EngineConfig`] from its sections.
    ///
    /// # Arguments
    ///
    /// * `tree` - Tree layout spacing.
    /// * `board` - Board layout metrics.
    pub fn new(tree: TreeConfig, board: BoardConfig) -> Self {
        Self { tree, board }
    }

    /// Parses a configuration from TOML text. Missing sections and fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`TangramError::Config`] if the text is not valid TOML or a
    /// field has the wrong type.
    pub fn from_toml(text: &str) -> Result<Self, TangramError> {
        toml::from_str(text).map_err(|err| TangramError::Config(err.to_string()))
    }

    /// Returns the tree layout configuration.
    pub fn tree(&self) -> &TreeConfig {
        &self.tree
    }

    /// Returns the board layout configuration.
    pub fn board(&self) -> &BoardConfig {
        &self.board
    }
}

/// Spacing of the tree layout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Distance between a node and its children along the node's direction.
    child_gap: f64,

    /// Distance between sibling subtrees across the direction.
    sibling_gap: f64,
}

impl TreeConfig {
    pub fn new(child_gap: f64, sibling_gap: f64) -> Self {
        Self {
            child_gap,
            sibling_gap,
        }
    }

    pub fn child_gap(&self) -> f64 {
        self.child_gap
    }

    pub fn sibling_gap(&self) -> f64 {
        self.sibling_gap
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            child_gap: 40.0,
            sibling_gap: 20.0,
        }
    }
}

/// Grid metrics of the board layout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    gap: f64,
    root_header: f64,
    column_header: f64,
    card_width: f64,
    /// Height reserved for a cell without cards.
    empty_cell_height: f64,
}

impl BoardConfig {
    /// Creates a new [`BoardConfig`].
    ///
    /// # Arguments
    ///
    /// * `gap` - Spacing between columns, rows, and cards.
    /// * `root_header` - Height of the board title area.
    /// * `column_header` - Height of each column title area.
    /// * `card_width` - Width every card is resized to.
    /// * `empty_cell_height` - Height of a cell that holds no card.
    pub fn new(
        gap: f64,
        root_header: f64,
        column_header: f64,
        card_width: f64,
        empty_cell_height: f64,
    ) -> Self {
        Self {
            gap,
            root_header,
            column_header,
            card_width,
            empty_cell_height,
        }
    }

    pub fn gap(&self) -> f64 {
        self.gap
    }

    pub fn root_header(&self) -> f64 {
        self.root_header
    }

    pub fn column_header(&self) -> f64 {
        self.column_header
    }

    pub fn card_width(&self) -> f64 {
        self.card_width
    }

    pub fn empty_cell_height(&self) -> f64 {
        self.empty_cell_height
    }

    /// Width of a column: one card plus a gap on each side.
    pub fn column_width(&self) -> f64 {
        self.card_width + 2.0 * self.gap
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            gap: 20.0,
            root_header: 40.0,
            column_header: 40.0,
            card_width: 300.0,
            empty_cell_height: 60.0,
        }
    }
}
