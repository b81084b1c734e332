//! Content offset resolution across two layout generations.
//!
//! The primary strategy keeps the item nearest the old viewport center at the same place in the
//! new viewport. When no such item survives, the offset is carried over proportionally.

use collection_layout::{
    BoundsSnapshot, IndexRemapTable, LayoutModel, ScrollAnchor, capture_anchor,
};
use kurbo::{Insets, Point, Size};

/// How a content offset was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OffsetStrategy {
    /// An anchor element was found in both generations.
    Anchored,
    /// The scroll ratio of the viewport center was preserved.
    Proportional,
    /// No transition was in flight; the proposal was only clamped to the content.
    Clamped,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResolvedOffset {
    pub offset: Point,
    pub strategy: OffsetStrategy,
}

/// Clamps `offset` per axis to `[-leading inset, content + trailing inset - viewport]`.
///
/// When the content is smaller than the viewport the lower bound wins.
pub fn clamp_content_offset(offset: Point, content: Size, viewport: Size, insets: Insets) -> Point {
    let clamp_axis = |value: f64, lead: f64, trail: f64, content: f64, viewport: f64| {
        let lo = -lead;
        let hi = content + trail - viewport;
        if hi < lo || value < lo {
            lo
        } else if value > hi {
            hi
        } else {
            value
        }
    };
    Point::new(
        clamp_axis(offset.x, insets.x0, insets.x1, content.width, viewport.width),
        clamp_axis(offset.y, insets.y0, insets.y1, content.height, viewport.height),
    )
}

/// Carries the scroll ratio of the viewport center from `old` to a viewport of `new_viewport`.
///
/// `inset_delta` is the change of the leading content insets between the two bounds.
pub fn proportional_offset(
    old: &BoundsSnapshot,
    old_content: Size,
    new_content: Size,
    new_viewport: Size,
    inset_delta: Point,
) -> Point {
    let axis = |offset: f64, old_extent: f64, delta: f64, old_content: f64, new_content: f64, new_extent: f64| {
        if old_content <= 0.0 {
            return offset;
        }
        let ratio = (offset + old_extent / 2.0 - delta) / old_content;
        ratio * new_content - new_extent / 2.0
    };
    let origin = old.bounds.origin();
    let old_size = old.size();
    Point::new(
        axis(
            origin.x,
            old_size.width,
            inset_delta.x,
            old_content.width,
            new_content.width,
            new_viewport.width,
        ),
        axis(
            origin.y,
            old_size.height,
            inset_delta.y,
            old_content.height,
            new_content.height,
            new_viewport.height,
        ),
    )
}

/// Resolves the content offset after moving from `before` to `after`.
///
/// - `remap` translates indexes between the generations; `None` means they are identical.
/// - `old` is the bounds captured before the transition, `proposed` the bounds the host would
///   otherwise settle on (its size is the new viewport size).
///
/// The result is always clamped to the new content.
pub fn resolve_content_offset<B, A>(
    before: &B,
    after: &A,
    remap: Option<&IndexRemapTable>,
    old: &BoundsSnapshot,
    proposed: &BoundsSnapshot,
    preserve_anchor: bool,
) -> ResolvedOffset
where
    B: LayoutModel + ?Sized,
    A: LayoutModel + ?Sized,
{
    let content = after.content_size();
    let viewport = proposed.size();
    let insets = proposed.content_insets;

    let anchored = preserve_anchor
        .then(|| anchored_offset(before, after, remap, old, proposed))
        .flatten();
    let resolved = match anchored {
        Some(offset) => ResolvedOffset {
            offset,
            strategy: OffsetStrategy::Anchored,
        },
        None => {
            let delta = Point::new(
                insets.x0 - old.content_insets.x0,
                insets.y0 - old.content_insets.y0,
            );
            ResolvedOffset {
                offset: proportional_offset(old, before.content_size(), content, viewport, delta),
                strategy: OffsetStrategy::Proportional,
            }
        }
    };
    let offset = clamp_content_offset(resolved.offset, content, viewport, insets);
    ldebug!(
        strategy = ?resolved.strategy,
        x = offset.x,
        y = offset.y,
        "resolved content offset"
    );
    ResolvedOffset { offset, ..resolved }
}

fn anchored_offset<B, A>(
    before: &B,
    after: &A,
    remap: Option<&IndexRemapTable>,
    old: &BoundsSnapshot,
    proposed: &BoundsSnapshot,
) -> Option<Point>
where
    B: LayoutModel + ?Sized,
    A: LayoutModel + ?Sized,
{
    let anchor = capture_anchor(before, old.bounds)?;
    let index = match remap {
        Some(table) => table.after_index(anchor.index)?,
        None => anchor.index,
    };
    let remapped = ScrollAnchor { index, ..anchor };
    after.offset_for_anchor(&remapped, proposed.bounds, old.bounds)
}
