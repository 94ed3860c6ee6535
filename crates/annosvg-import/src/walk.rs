//! Depth-first element walk.
//!
//! Containers are flattened: their transform, opacity, mask and
//! presentation properties are pushed down onto every drawable element
//! beneath them.  The walk yields drawables in document order.

use std::collections::HashMap;

use annosvg_core::geometry::parse_transform;
use annosvg_core::{ConversionWarning, Matrix};
use roxmltree::Node;
use tracing::debug;

use crate::style::{Style, url_id};
use crate::warning;

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Elements walked into.
const CONTAINERS: [&str; 3] = ["g", "a", "switch"];

/// Elements that never render directly.
const SKIPPED: [&str; 12] = [
    "defs",
    "mask",
    "clipPath",
    "symbol",
    "marker",
    "pattern",
    "linearGradient",
    "radialGradient",
    "style",
    "title",
    "desc",
    "metadata",
];

/// Drawable element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Path,
    Rect,
    Circle,
    Ellipse,
    Line,
    Polyline,
    Polygon,
    Text,
    Image,
}

impl Kind {
    fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "path" => Self::Path,
            "rect" => Self::Rect,
            "circle" => Self::Circle,
            "ellipse" => Self::Ellipse,
            "line" => Self::Line,
            "polyline" => Self::Polyline,
            "polygon" => Self::Polygon,
            "text" => Self::Text,
            "image" => Self::Image,
            _ => return None,
        })
    }
}

/// A drawable element and everything its ancestors contribute.
#[derive(Debug, Clone)]
pub struct Drawable<'a, 'input> {
    pub node: Node<'a, 'input>,
    pub kind: Kind,
    /// Accumulated ancestor transform, without the element's own.
    pub parent_matrix: Matrix,
    /// Ancestor transform followed by the element's own `transform`.
    pub matrix: Matrix,
    /// Product of ancestor `opacity` values.
    pub group_opacity: f64,
    /// Mask id from the element or the nearest masked ancestor.
    pub mask: Option<String>,
    pub style: Style,
}

impl Drawable<'_, '_> {
    #[must_use]
    pub fn tag(&self) -> &str {
        self.node.tag_name().name()
    }

    /// Element opacity times group opacity.
    #[must_use]
    pub fn opacity(&self) -> f64 {
        self.style.own_opacity() * self.group_opacity
    }
}

/// Accumulated state handed from a container to its children.
#[derive(Debug, Clone)]
pub struct Context {
    pub matrix: Matrix,
    pub opacity: f64,
    pub mask: Option<String>,
    pub style: Style,
}

impl Context {
    /// Context for the children of the root `<svg>`.
    #[must_use]
    pub fn root(root: Node<'_, '_>, matrix: Matrix) -> Self {
        let style = Style::default().cascade(root);
        Self {
            matrix,
            opacity: style.own_opacity(),
            mask: None,
            style,
        }
    }
}

/// Collects drawables and the warnings raised while walking.
#[derive(Debug, Default)]
pub struct Walker<'a, 'input> {
    pub drawables: Vec<Drawable<'a, 'input>>,
    pub warnings: Vec<ConversionWarning>,
}

impl<'a, 'input> Walker<'a, 'input> {
    /// Walk the element children of `parent`.
    pub fn children(&mut self, parent: Node<'a, 'input>, context: &Context) {
        for node in parent.children().filter(Node::is_element) {
            self.visit(node, context);
        }
    }

    fn visit(&mut self, node: Node<'a, 'input>, context: &Context) {
        let tag = node.tag_name();
        if tag.namespace().is_some_and(|ns| ns != SVG_NS) {
            debug!(tag = tag.name(), "skipping foreign element");
            return;
        }
        let name = tag.name();
        if SKIPPED.contains(&name) {
            return;
        }

        let own = match node.attribute("transform").map(parse_transform) {
            None => Matrix::IDENTITY,
            Some(Ok(matrix)) => matrix,
            Some(Err(e)) => {
                self.warnings
                    .push(warning(name, format!("invalid transform, element skipped: {e}")));
                return;
            }
        };
        let style = context.style.cascade(node);
        let mask = node
            .attribute("mask")
            .and_then(url_id)
            .map(str::to_owned)
            .or_else(|| context.mask.clone());

        if CONTAINERS.contains(&name) {
            let inner = Context {
                matrix: context.matrix.multiply(&own),
                opacity: context.opacity * style.own_opacity(),
                mask,
                style,
            };
            self.children(node, &inner);
            return;
        }

        let Some(kind) = Kind::from_tag(name) else {
            self.warnings
                .push(warning(name, "unsupported element skipped"));
            return;
        };
        self.drawables.push(Drawable {
            node,
            kind,
            parent_matrix: context.matrix,
            matrix: context.matrix.multiply(&own),
            group_opacity: context.opacity,
            mask,
            style,
        });
    }
}

/// A `<mask>` definition that wraps an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskDef {
    /// `mask-type`, `luminance` unless stated.
    pub kind: String,
    /// `href` of the mask's image.
    pub src: String,
}

/// Every `<mask id>` in the document that contains an `<image>`.
#[must_use]
pub fn mask_table(document: &roxmltree::Document<'_>) -> HashMap<String, MaskDef> {
    let mut masks = HashMap::new();
    for mask in document.descendants().filter(|n| n.has_tag_name("mask")) {
        let Some(id) = mask.attribute("id") else {
            continue;
        };
        let Some(src) = mask
            .descendants()
            .filter(|n| n.has_tag_name("image"))
            .find_map(href)
        else {
            continue;
        };
        let kind = Style::default()
            .cascade(mask)
            .mask_type
            .unwrap_or_else(|| "luminance".to_owned());
        masks.insert(
            id.to_owned(),
            MaskDef {
                kind,
                src: src.to_owned(),
            },
        );
    }
    masks
}

/// `href`, falling back to `xlink:href`.
#[must_use]
pub fn href<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.attribute("href")
        .or_else(|| node.attribute((XLINK_NS, "href")))
        .filter(|h| !h.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use annosvg_core::Point;

    use super::*;

    fn walk(svg: &str) -> (Vec<(Kind, Matrix, f64, Option<String>)>, Vec<ConversionWarning>) {
        let doc = roxmltree::Document::parse(svg).unwrap();
        let root = doc.root_element();
        let mut walker = Walker::default();
        walker.children(root, &Context::root(root, Matrix::IDENTITY));
        let drawables = walker
            .drawables
            .iter()
            .map(|d| (d.kind, d.matrix, d.group_opacity, d.mask.clone()))
            .collect();
        (drawables, walker.warnings)
    }

    #[test]
    fn nested_groups_accumulate() {
        let (drawables, warnings) = walk(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                 <g transform="translate(10,0)" opacity="0.5">
                   <g transform="scale(2)" opacity="0.5"><rect transform="translate(1,1)"/></g>
                 </g>
               </svg>"#,
        );
        assert!(warnings.is_empty());
        let [(kind, matrix, opacity, _)] = drawables.as_slice() else {
            unreachable!("expected one drawable");
        };
        assert_eq!(*kind, Kind::Rect);
        assert!((opacity - 0.25).abs() < 1e-12);
        let p = matrix.apply(Point::new(0.0, 0.0));
        assert!(p.approx_eq(Point::new(12.0, 2.0), 1e-9));
    }

    #[test]
    fn definitions_are_not_drawn() {
        let (drawables, warnings) = walk(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                 <title>t</title>
                 <defs><mask id="m"><image href="a.png"/></mask></defs>
                 <path d="M0 0 L1 1"/>
               </svg>"#,
        );
        assert!(warnings.is_empty());
        assert_eq!(drawables.len(), 1);
        assert_eq!(drawables[0].0, Kind::Path);
    }

    #[test]
    fn unknown_elements_warn() {
        let (drawables, warnings) = walk(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><use href="x"/><rect/></svg>"#,
        );
        assert_eq!(drawables.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].element, "use");
    }

    #[test]
    fn bad_group_transform_skips_the_subtree() {
        let (drawables, warnings) = walk(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><g transform="wobble(3)"><rect/></g><circle/></svg>"#,
        );
        assert_eq!(drawables.len(), 1);
        assert_eq!(drawables[0].0, Kind::Circle);
        assert_eq!(warnings[0].element, "g");
    }

    #[test]
    fn masked_group_passes_its_mask_down() {
        let (drawables, _) = walk(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><g mask="url(#m1)"><image/></g><image/></svg>"#,
        );
        assert_eq!(drawables[0].3.as_deref(), Some("m1"));
        assert_eq!(drawables[1].3, None);
    }

    #[test]
    fn foreign_namespaces_are_ignored() {
        let (drawables, warnings) = walk(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:inkscape="urn:x"><inkscape:thing/><rect/></svg>"#,
        );
        assert_eq!(drawables.len(), 1);
        assert!(warnings.is_empty());
    }

    #[test]
    fn masks_are_tabled_by_id() {
        let doc = roxmltree::Document::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">
                 <defs>
                   <mask id="m1" mask-type="alpha"><image xlink:href="data:image/png;base64,AA"/></mask>
                   <mask id="empty"><rect/></mask>
                 </defs>
               </svg>"#,
        )
        .unwrap();
        let masks = mask_table(&doc);
        assert_eq!(masks.len(), 1);
        assert_eq!(
            masks["m1"],
            MaskDef {
                kind: "alpha".to_owned(),
                src: "data:image/png;base64,AA".to_owned()
            }
        );
    }
}
