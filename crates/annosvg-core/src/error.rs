//! Error and warning types.
//!
//! [`CodecError`] aborts a conversion.  [`ConversionWarning`] records an
//! element that was skipped or converted lossily; the conversion carries
//! on and returns the warnings alongside its result.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Fatal conversion errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The input file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    InputRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The input is not a valid annotation document.
    #[error("invalid annotation JSON: {0}")]
    Json(serde_json::Error),

    /// The input is not well-formed XML.
    #[error("invalid SVG: {0}")]
    Xml(String),

    /// The XML root element is not `<svg>`.
    #[error("no <svg> root element found")]
    MissingSvgRoot,

    /// The output file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The decoded document could not be serialized.
    #[error("failed to serialize document: {0}")]
    Serialize(serde_json::Error),

    /// Codec configuration is out of range.
    #[error("invalid codec configuration: {0}")]
    InvalidConfig(String),
}

/// A non-fatal problem with one element or item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionWarning {
    /// Tag name (decoding) or `tool:id` (encoding) of the offending input.
    pub element: String,
    pub message: String,
}

impl ConversionWarning {
    #[must_use]
    pub fn new(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>: {}", self.element, self.message)
    }
}
