//! Codec configuration.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Tunables shared by the encoder and decoder.
///
/// Passed explicitly to every call; there is no global configuration.
/// Missing fields in JSON take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Paths whose effective opacity is below this value decode as
    /// highlighter strokes instead of pen strokes.
    pub highlighter_opacity_threshold: f64,

    /// Ramer-Douglas-Peucker tolerance applied to decoded stroke points.
    /// `0.0` keeps every point.
    pub simplify_tolerance: f64,

    /// Straight segments per flattened curve segment (cubic, quadratic or
    /// arc) when decoding path data.
    pub curve_flatten_segments: usize,

    /// Minimum decoded stroke width for the highlighter classification.
    /// Thin translucent strokes below this width stay pens.  `0.0` makes
    /// opacity the only criterion.
    pub highlighter_min_stroke_width: f64,

    /// Embedded `data:` image URIs longer than this produce a warning.
    pub large_image_warn_bytes: usize,

    /// Flag decoded images that cover the whole canvas as backgrounds.
    pub detect_backgrounds: bool,
}

impl CodecConfig {
    pub const DEFAULT_HIGHLIGHTER_OPACITY_THRESHOLD: f64 = 0.6;
    pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 0.0;
    pub const DEFAULT_CURVE_FLATTEN_SEGMENTS: usize = 16;
    pub const DEFAULT_HIGHLIGHTER_MIN_STROKE_WIDTH: f64 = 6.0;
    pub const DEFAULT_LARGE_IMAGE_WARN_BYTES: usize = 500_000;

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidConfig`] when the threshold is outside
    /// `[0, 1]`, a tolerance or width is negative or not finite, or the
    /// curve segment count is zero.
    pub fn validate(&self) -> Result<(), CodecError> {
        if !(0.0..=1.0).contains(&self.highlighter_opacity_threshold) {
            return Err(CodecError::InvalidConfig(format!(
                "highlighter_opacity_threshold must be within 0..=1, got {}",
                self.highlighter_opacity_threshold
            )));
        }
        if !self.simplify_tolerance.is_finite() || self.simplify_tolerance < 0.0 {
            return Err(CodecError::InvalidConfig(format!(
                "simplify_tolerance must be a non-negative number, got {}",
                self.simplify_tolerance
            )));
        }
        if !self.highlighter_min_stroke_width.is_finite() || self.highlighter_min_stroke_width < 0.0
        {
            return Err(CodecError::InvalidConfig(format!(
                "highlighter_min_stroke_width must be a non-negative number, got {}",
                self.highlighter_min_stroke_width
            )));
        }
        if self.curve_flatten_segments == 0 {
            return Err(CodecError::InvalidConfig(
                "curve_flatten_segments must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            highlighter_opacity_threshold: Self::DEFAULT_HIGHLIGHTER_OPACITY_THRESHOLD,
            simplify_tolerance: Self::DEFAULT_SIMPLIFY_TOLERANCE,
            curve_flatten_segments: Self::DEFAULT_CURVE_FLATTEN_SEGMENTS,
            highlighter_min_stroke_width: Self::DEFAULT_HIGHLIGHTER_MIN_STROKE_WIDTH,
            large_image_warn_bytes: Self::DEFAULT_LARGE_IMAGE_WARN_BYTES,
            detect_backgrounds: true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CodecConfig::default();
        assert!((config.highlighter_opacity_threshold - 0.6).abs() < f64::EPSILON);
        assert!(config.simplify_tolerance.abs() < f64::EPSILON);
        assert_eq!(config.curve_flatten_segments, 16);
        assert!((config.highlighter_min_stroke_width - 6.0).abs() < f64::EPSILON);
        assert_eq!(config.large_image_warn_bytes, 500_000);
        assert!(config.detect_backgrounds);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: CodecConfig =
            serde_json::from_str(r#"{"highlighter_opacity_threshold": 0.3}"#).unwrap();
        assert!((config.highlighter_opacity_threshold - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.curve_flatten_segments, 16);
    }

    #[test]
    fn serde_round_trip() {
        let config = CodecConfig {
            highlighter_opacity_threshold: 0.45,
            simplify_tolerance: 1.5,
            curve_flatten_segments: 8,
            highlighter_min_stroke_width: 12.0,
            large_image_warn_bytes: 1024,
            detect_backgrounds: false,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: CodecConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let bad_threshold = CodecConfig {
            highlighter_opacity_threshold: 1.5,
            ..CodecConfig::default()
        };
        assert!(matches!(
            bad_threshold.validate(),
            Err(CodecError::InvalidConfig(_))
        ));

        let zero_segments = CodecConfig {
            curve_flatten_segments: 0,
            ..CodecConfig::default()
        };
        assert!(zero_segments.validate().is_err());

        let negative_tolerance = CodecConfig {
            simplify_tolerance: -1.0,
            ..CodecConfig::default()
        };
        assert!(negative_tolerance.validate().is_err());
    }
}
