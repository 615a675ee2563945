//! Tangram Core Types
//!
//! This crate provides the foundational types shared by the Tangram engine:
//!
//! - **Identifiers**: Efficient string-interned identifiers ([`identifier::Id`])
//! - **Geometry**: Points, sizes, bounds, insets and affine transforms ([`geometry`] module)
//! - **Ordering keys**: Fractional z-order keys ([`order_key`] module)
//! - **Shapes**: The flat shape record and its relational fields ([`shape`] module)
//! - **Patches**: Partial updates and change batches ([`patch`] module)

pub mod geometry;
pub mod identifier;
pub mod order_key;
pub mod patch;
pub mod shape;
