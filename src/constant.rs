//! Typed literal values used by query expressions.
//!
//! This module provides:
//! - The closed set of constant kinds and their widening rules
//! - The `Constant` value type with cross-kind numeric equality and ordering
//! - An opaque geometry wrapper
//! - Free functions implementing negation, arithmetic and concatenation

pub mod geometry;
pub mod kind;
pub mod ops;
pub mod value;

pub use geometry::Geometry;
pub use kind::ConstantKind;
pub use value::Constant;
