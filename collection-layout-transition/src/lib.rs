//! Before/after layout generations for the `collection-layout` crate.
//!
//! `collection-layout` computes geometry for one snapshot of data and viewport. This crate keeps
//! two such snapshots alive while a change animates:
//!
//! - [`LayoutGeneration`]: a model plus its sticky engine, built for one
//!   `(SectionCounts, GeometryInfo)` pair and memoized by that pair.
//! - [`LayoutStateController`]: the Before/After slots and the transition lifecycle
//!   (prepare, query, finalize).
//! - [`resolve_content_offset`]: keeps the visible content anchored across a transition, with a
//!   proportional fallback.
//!
//! Everything is synchronous and single-owner; the host drives one transition at a time.
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod anchor;
mod controller;
mod generation;
mod options;


pub use anchor::{
    OffsetStrategy, ResolvedOffset, clamp_content_offset, proportional_offset,
    resolve_content_offset,
};
pub use controller::{BoundsInvalidation, LayoutStateController, ResizePreview};
pub use generation::LayoutGeneration;
pub use options::{BuildModel, LayoutStateOptions};

pub use collection_layout;
