//! annosvg-import: SVG → annotation document (sans-IO)
//!
//! [`decode`] parses an SVG string with `roxmltree`, flattens its groups
//! and converts each drawable element into a document item:
//!
//! 1. walk: depth-first, accumulating transform, opacity, mask and
//!    presentation properties ([`walk`])
//! 2. pair: merge adjacent fill/stroke `<path>` twins ([`pair`])
//! 3. convert: one element (or pair) at a time, baking geometry into
//!    document coordinates ([`convert`])
//!
//! Elements that cannot be converted are reported as
//! [`ConversionWarning`]s; only unparseable input fails the whole call.

pub mod convert;
pub mod pair;
pub mod place;
pub mod style;
pub mod walk;

use annosvg_core::document::{Metadata, ViewBox};
use annosvg_core::{CodecConfig, CodecError, ConversionWarning, Document, Matrix};
use roxmltree::{Node, ParsingOptions};
use tracing::{debug, warn};

use crate::convert::{Converter, mark_backgrounds};
use crate::pair::pair_paths;
use crate::style::{parse_length, parse_numbers};
use crate::walk::{Context, Walker, mask_table};

/// Canvas size when neither `width`/`height` nor `viewBox` give one.
const FALLBACK_SIZE: (f64, f64) = (800.0, 600.0);

/// Result of [`decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub document: Document,
    /// Walk warnings first, then conversion warnings.
    pub warnings: Vec<ConversionWarning>,
}

/// Build a warning for `element` and log it.
pub(crate) fn warning(element: &str, message: impl Into<String>) -> ConversionWarning {
    let message = message.into();
    warn!(element = %element, "{message}");
    ConversionWarning::new(element, message)
}

/// Decode an SVG document.
///
/// # Errors
///
/// Returns [`CodecError::InvalidConfig`] for an out-of-range `config`,
/// [`CodecError::Xml`] when the input is not well-formed XML, and
/// [`CodecError::MissingSvgRoot`] when its root element is not `<svg>`.
pub fn decode(svg: &str, config: &CodecConfig) -> Result<Decoded, CodecError> {
    config.validate()?;
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let xml = roxmltree::Document::parse_with_options(svg, options)
        .map_err(|e| CodecError::Xml(e.to_string()))?;
    let root = xml.root_element();
    if !root.has_tag_name("svg") {
        return Err(CodecError::MissingSvgRoot);
    }

    let metadata = metadata(root);
    let origin = metadata
        .view_box
        .map_or(Matrix::IDENTITY, |vb| Matrix::translate(-vb.x, -vb.y));

    let mut walker = Walker::default();
    walker.children(root, &Context::root(root, origin));
    let masks = mask_table(&xml);
    let units = pair_paths(walker.drawables);
    debug!(units = units.len(), masks = masks.len(), "walked svg");

    let mut converter = Converter::new(config, &masks);
    for unit in &units {
        converter.unit(unit);
    }
    let (mut history, converted_warnings) = converter.finish();
    if config.detect_backgrounds {
        mark_backgrounds(&mut history, metadata.width, metadata.height);
    }

    let mut warnings = walker.warnings;
    warnings.extend(converted_warnings);
    debug!(
        items = history.len(),
        warnings = warnings.len(),
        width = metadata.width,
        height = metadata.height,
        "decoded svg"
    );
    Ok(Decoded {
        document: Document { metadata, history },
        warnings,
    })
}

/// Canvas metadata from the root `<svg>` element.
fn metadata(root: Node<'_, '_>) -> Metadata {
    let view_box = root.attribute("viewBox").and_then(|value| {
        match parse_numbers(value).as_slice() {
            &[x, y, w, h] if w > 0.0 && h > 0.0 => Some(ViewBox { x, y, w, h }),
            _ => None,
        }
    });
    // Percentages are relative to a viewport we do not have.
    let dimension = |name: &str| {
        root.attribute(name)
            .filter(|v| !v.trim_end().ends_with('%'))
            .and_then(parse_length)
            .filter(|v| *v > 0.0)
    };
    let width = dimension("width")
        .or(view_box.map(|vb| vb.w))
        .unwrap_or(FALLBACK_SIZE.0);
    let height = dimension("height")
        .or(view_box.map(|vb| vb.h))
        .unwrap_or(FALLBACK_SIZE.1);
    let title = root
        .children()
        .find(|n| n.has_tag_name("title"))
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned);

    Metadata {
        width,
        height,
        title,
        view_box,
        source_type: Some("svg".to_owned()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn meta(svg: &str) -> Metadata {
        decode(svg, &CodecConfig::default()).unwrap().document.metadata
    }

    #[test]
    fn size_from_attributes_with_units() {
        let m = meta(r#"<svg xmlns="http://www.w3.org/2000/svg" width="300px" height="150"/>"#);
        assert_eq!((m.width, m.height), (300.0, 150.0));
        assert_eq!(m.source_type.as_deref(), Some("svg"));
        assert_eq!(m.view_box, None);
    }

    #[test]
    fn size_falls_back_to_view_box_then_default() {
        let m = meta(r#"<svg xmlns="http://www.w3.org/2000/svg" width="100%" viewBox="0 0 640 480"/>"#);
        assert_eq!((m.width, m.height), (640.0, 480.0));
        let m = meta(r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#);
        assert_eq!((m.width, m.height), FALLBACK_SIZE);
    }

    #[test]
    fn title_is_read_from_the_root() {
        let m = meta(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><title> Notes </title><g><title>inner</title></g></svg>"#,
        );
        assert_eq!(m.title.as_deref(), Some("Notes"));
    }

    #[test]
    fn view_box_origin_shifts_items() {
        let decoded = decode(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="100 50 200 100"><rect x="110" y="60" width="10" height="10" fill="red"/></svg>"#,
            &CodecConfig::default(),
        )
        .unwrap();
        let annosvg_core::Item::Shape(shape) = &decoded.document.history[0] else {
            unreachable!("expected a shape");
        };
        assert!((shape.x - 10.0).abs() < 1e-9 && (shape.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_malformed_and_foreign_roots() {
        let config = CodecConfig::default();
        assert!(matches!(decode("<svg", &config), Err(CodecError::Xml(_))));
        assert!(matches!(
            decode("<html/>", &config),
            Err(CodecError::MissingSvgRoot)
        ));
    }

    #[test]
    fn invalid_config_is_rejected_before_parsing() {
        let config = CodecConfig {
            curve_flatten_segments: 0,
            ..CodecConfig::default()
        };
        assert!(matches!(
            decode("<svg/>", &config),
            Err(CodecError::InvalidConfig(_))
        ));
    }
}
