//! annosvg-export: annotation document → SVG (sans-IO)
//!
//! [`encode`] turns a [`Document`](annosvg_core::Document) into a
//! standalone SVG string plus any [`ConversionWarning`]s for items it had
//! to skip.
//!
//! [`ConversionWarning`]: annosvg_core::ConversionWarning

pub mod encode;
pub mod markup;
pub mod render;

pub use encode::{Encoded, encode, to_svg};
