//! Top-pinned section headers without sticky descriptors.
//!
//! A simpler alternative to [`crate::StickyPositioningEngine`] for layouts whose only pinned
//! elements are section headers stacked vertically. Headers are pinned to the top of the visible
//! region and pushed up (fading) by the next visible header.
//!
//! A header whose base frame overlaps the preceding header's base frame is hidden outright. Hiding
//! a header does not make room for earlier headers that would otherwise not collide; the collision
//! test always uses the preceding header's base frame.

use alloc::vec::Vec;

use kurbo::{Rect, Vec2};

use crate::geom::{overlap_area, touches};
use crate::{Element, LayoutAttributes};

/// z-index given to a header while it is pinned.
pub const PINNED_HEADER_Z_INDEX: i32 = 1;

/// Supplies un-pinned header frames, one per section.
///
/// Frames must be ordered by their top edge (`y0`) in section order.
pub trait SectionHeaderSource {
    fn section_count(&self) -> usize;

    fn header_frame(&self, section: usize) -> Rect;
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct HeaderSlot {
    frame: Rect,
    hidden: bool,
}

/// Caches header base frames (extended monotonically on demand) and answers pinned-header queries.
#[derive(Clone, Debug, Default)]
pub struct HeaderCollisionController {
    slots: Vec<HeaderSlot>,
}

impl HeaderCollisionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every cached frame; call when the data or geometry changes.
    pub fn invalidate(&mut self) {
        self.slots.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.slots.len()
    }

    fn push_next<S: SectionHeaderSource + ?Sized>(&mut self, source: &S) -> bool {
        let section = self.slots.len();
        if section >= source.section_count() {
            return false;
        }
        let frame = source.header_frame(section);
        let hidden = self
            .slots
            .last()
            .is_some_and(|prev| overlap_area(prev.frame, frame) > 0.0);
        debug_assert!(
            self.slots.last().is_none_or(|prev| prev.frame.y0 <= frame.y0),
            "header frames must be ordered by y0 (section {section})"
        );
        self.slots.push(HeaderSlot { frame, hidden });
        true
    }

    fn extend_to<S: SectionHeaderSource + ?Sized>(&mut self, source: &S, section: usize) {
        while self.slots.len() <= section && self.push_next(source) {}
    }

    // Caches until a header starts at or below `y`, or every header is cached.
    fn extend_past<S: SectionHeaderSource + ?Sized>(&mut self, source: &S, y: f64) {
        while self.slots.last().is_none_or(|last| last.frame.y0 < y) && self.push_next(source) {}
    }

    fn next_visible<S: SectionHeaderSource + ?Sized>(
        &mut self,
        source: &S,
        section: usize,
    ) -> Option<HeaderSlot> {
        let mut next = section + 1;
        loop {
            self.extend_to(source, next);
            let slot = *self.slots.get(next)?;
            if !slot.hidden {
                return Some(slot);
            }
            next += 1;
        }
    }

    /// The un-pinned frame of a section's header.
    pub fn base_frame<S: SectionHeaderSource + ?Sized>(
        &mut self,
        source: &S,
        section: usize,
    ) -> Option<Rect> {
        self.extend_to(source, section);
        self.slots.get(section).map(|slot| slot.frame)
    }

    pub fn is_hidden<S: SectionHeaderSource + ?Sized>(&mut self, source: &S, section: usize) -> bool {
        self.extend_to(source, section);
        self.slots.get(section).is_some_and(|slot| slot.hidden)
    }

    /// Attributes for a section's header given the visible region.
    ///
    /// Hidden headers are returned with `hidden` set and their base frame.
    pub fn header_attributes<S: SectionHeaderSource + ?Sized>(
        &mut self,
        source: &S,
        section: usize,
        viewport: Rect,
    ) -> Option<LayoutAttributes> {
        self.extend_to(source, section);
        let slot = *self.slots.get(section)?;
        let element = Element::header(section);
        if slot.hidden {
            return Some(LayoutAttributes::new(element, slot.frame).with_hidden(true));
        }

        let base = slot.frame;
        if base.y0 >= viewport.y0 {
            return Some(LayoutAttributes::new(element, base));
        }

        let height = base.height();
        let mut frame = base + Vec2::new(0.0, viewport.y0 - base.y0);
        let mut alpha = 1.0;
        if let Some(next) = self.next_visible(source, section) {
            let overlap = frame.y1 - next.frame.y0;
            if overlap > 0.0 {
                let y0 = (next.frame.y0 - height).max(base.y0);
                frame = frame + Vec2::new(0.0, y0 - frame.y0);
                alpha = if height > 0.0 {
                    1.0 - (overlap / height).clamp(0.0, 1.0)
                } else {
                    0.0
                };
            }
        }
        Some(
            LayoutAttributes::new(element, frame)
                .with_alpha(alpha)
                .with_z_index(PINNED_HEADER_Z_INDEX),
        )
    }

    /// Attributes for every visible header that intersects `viewport`, in section order.
    ///
    /// Relies on header frames being ordered by `y0` (binary search over the cache).
    pub fn headers_in<S: SectionHeaderSource + ?Sized>(
        &mut self,
        source: &S,
        viewport: Rect,
    ) -> Vec<LayoutAttributes> {
        self.extend_past(source, viewport.y1);
        // The pinned candidate is the last visible header starting at or above the top.
        let mut first = self
            .slots
            .partition_point(|slot| slot.frame.y0 <= viewport.y0);
        while first > 0 && self.slots[first - 1].hidden {
            first -= 1;
        }
        let first = first.saturating_sub(1);
        let end = self.slots.partition_point(|slot| slot.frame.y0 < viewport.y1);
        let mut out = Vec::new();
        for section in first..end {
            let Some(attrs) = self.header_attributes(source, section, viewport) else {
                continue;
            };
            if !attrs.hidden && touches(attrs.frame, viewport) {
                out.push(attrs);
            }
        }
        out
    }
}
