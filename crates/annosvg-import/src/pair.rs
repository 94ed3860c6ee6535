//! Fill/stroke pair detection.
//!
//! Some editors export one visual stroke as two sibling `<path>`s with the
//! same outline: one filled, one stroked.  Adjacent pairs are merged
//! before conversion so they produce a single item.

use crate::walk::{Drawable, Kind};

/// One unit of conversion.
#[derive(Debug, Clone)]
pub enum Unit<'a, 'input> {
    Single(Drawable<'a, 'input>),
    /// A fill-only path and a stroke-only path with identical geometry,
    /// in either document order.
    Pair {
        fill: Drawable<'a, 'input>,
        stroke: Drawable<'a, 'input>,
    },
}

fn is_fill_only(d: &Drawable<'_, '_>) -> bool {
    d.style.fill_paint().is_visible() && !d.style.stroke_paint().is_visible()
}

fn is_stroke_only(d: &Drawable<'_, '_>) -> bool {
    d.style.stroke_paint().is_visible() && !d.style.fill_paint().is_visible()
}

fn complementary(a: &Drawable<'_, '_>, b: &Drawable<'_, '_>) -> bool {
    (is_fill_only(a) && is_stroke_only(b)) || (is_stroke_only(a) && is_fill_only(b))
}

fn same_outline(a: &Drawable<'_, '_>, b: &Drawable<'_, '_>) -> bool {
    a.kind == Kind::Path
        && b.kind == Kind::Path
        && a.node.parent() == b.node.parent()
        && a.node.attribute("d").is_some()
        && a.node.attribute("d") == b.node.attribute("d")
        && a.node.attribute("transform") == b.node.attribute("transform")
}

/// Group drawables into conversion units, merging adjacent pairs.
#[must_use]
pub fn pair_paths<'a, 'input>(drawables: Vec<Drawable<'a, 'input>>) -> Vec<Unit<'a, 'input>> {
    let mut units = Vec::with_capacity(drawables.len());
    let mut iter = drawables.into_iter().peekable();
    while let Some(current) = iter.next() {
        match iter.next_if(|next| same_outline(&current, next) && complementary(&current, next)) {
            None => units.push(Unit::Single(current)),
            Some(next) if is_fill_only(&current) => units.push(Unit::Pair {
                fill: current,
                stroke: next,
            }),
            Some(next) => units.push(Unit::Pair {
                fill: next,
                stroke: current,
            }),
        }
    }
    units
}
