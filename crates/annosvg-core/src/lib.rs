//! Annotation document model and shared geometry for the annosvg codec.
//!
//! This crate performs no I/O.  It holds the types both directions of the
//! codec agree on:
//!
//! - [`document`]: the annotation document and its item kinds
//! - [`geometry`]: points, boxes, affine matrices and transform parsing
//! - [`path`]: SVG path-data interpretation and curve flattening
//! - [`color`]: CSS colour parsing and formatting
//! - [`shapes`]: named-shape outlines and outline recognition
//! - [`simplify`]: Ramer-Douglas-Peucker point reduction
//! - [`config`] and [`error`]: codec tunables, errors and warnings

pub mod color;
pub mod config;
pub mod document;
pub mod error;
pub mod geometry;
pub mod path;
pub mod shapes;
pub mod simplify;

pub use config::CodecConfig;
pub use document::{Document, Item};
pub use error::{CodecError, ConversionWarning};
pub use geometry::{Matrix, Point, Rect};

/// Round to a fixed number of decimal places.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
