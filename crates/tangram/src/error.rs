//! Error types for Tangram operations.
//!
//! This module provides the main error type [`TangramError`]. Most engine
//! operations are total and normalize malformed input instead of failing; the
//! variants here cover violations of the caller contract.

use thiserror::Error;

use tangram_core::{identifier::Id, order_key::KeyError};

/// The main error type for Tangram operations.
#[derive(Debug, Error)]
pub enum TangramError {
    /// An added shape reuses an id that already exists or is added twice.
    #[error("Shape id collision: {0}")]
    IdCollision(Id),

    /// An update targets an id that is neither in the composite nor added by the patch.
    #[error("Unknown shape: {0}")]
    UnknownShape(Id),

    #[error("Ordering key error: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("Configuration error: {0}")]
    Config(String),
}
