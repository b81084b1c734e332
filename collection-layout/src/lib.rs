//! A headless geometry engine for sectioned, virtualized collections.
//!
//! For the before/after generation machinery and scroll anchoring, see the
//! `collection-layout-transition` crate.
//!
//! This crate holds the pieces that must stay exact while the data and the viewport change:
//! - [`IndexRemapTable`]: translates `(section, item)` indexes across a batch of inserts,
//!   deletes, moves and reloads, in both directions.
//! - [`StickyPositioningEngine`]: pins supplementary elements per [`StickyDescriptor`] and keeps
//!   a spatial index so a scroll only re-examines the sticky elements it can affect.
//! - [`BoundsTracker`]: the live scroll-bounds snapshot with freeze/validity flags.
//! - [`HeaderCollisionController`]: a simpler top-pinned header strategy.
//!
//! It renders nothing. A host adapter is expected to provide:
//! - per-section item counts ([`SectionCounts`])
//! - viewport geometry ([`GeometryInfo`]) and scroll bounds ([`BoundsSnapshot`])
//! - a concrete layout implementing [`LayoutModel`]
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod attributes;
mod bounds;
mod geom;
mod header;
mod key;
mod model;
mod remap;
mod spatial;
mod state;
mod sticky;
mod types;

#[cfg(test)]
mod tests;

pub use attributes::{LayoutAttributes, StickyBehavior, StickyDescriptor, StickyEdges};
pub use bounds::BoundsTracker;
pub use geom::touches;
pub use header::{HeaderCollisionController, PINNED_HEADER_Z_INDEX, SectionHeaderSource};
pub use model::{
    AnimationKind, LayoutModel, ScrollAnchor, Transition, capture_anchor, nearest_item_to_center,
    offset_for_anchor_frame,
};
pub use remap::{IndexRemapTable, MutationOp, RemapError, ShiftError};
pub use spatial::{FALLBACK_CHUNK_EXTENT, SpatialIndex};
pub use state::{BoundsChange, BoundsSnapshot, GeometryInfo};
pub use sticky::{StickyPositioningEngine, reference_rect, stickify};
pub use types::{CompositeIndex, Element, ElementKind, SectionCounts};

pub use kurbo;
