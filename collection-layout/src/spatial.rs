use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Rect, Size};

use crate::geom::touches;
use crate::key::KeyMap;

/// Bucket extent used when the requested chunk size is empty or not finite.
pub const FALLBACK_CHUNK_EXTENT: f64 = 512.0;

// Entries (and queries) spanning more buckets than this bypass the grid.
const MAX_BUCKETS: i64 = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ChunkRange {
    col0: i64,
    row0: i64,
    col1: i64,
    row1: i64,
}

impl ChunkRange {
    fn bucket_count(&self) -> i64 {
        let cols = self.col1.saturating_sub(self.col0).saturating_add(1);
        let rows = self.row1.saturating_sub(self.row0).saturating_add(1);
        cols.saturating_mul(rows)
    }
}

/// A uniform grid of buckets keyed by `(row, column)`.
///
/// An entry is stored in every bucket its rectangle touches; a query unions the candidate buckets
/// and filters by exact (edge-inclusive) intersection. Results come back in insertion order.
#[derive(Clone, Debug)]
pub struct SpatialIndex<T> {
    chunk: Size,
    entries: Vec<(Rect, T)>,
    buckets: KeyMap<(i64, i64), Vec<usize>>,
    overflow: Vec<usize>,
}

impl<T: Clone> SpatialIndex<T> {
    /// Creates an index whose buckets are `chunk` sized (typically the viewport size).
    pub fn new(chunk: Size) -> Self {
        let sanitize = |v: f64| {
            if v.is_finite() && v > 0.0 {
                v
            } else {
                FALLBACK_CHUNK_EXTENT
            }
        };
        Self {
            chunk: Size::new(sanitize(chunk.width), sanitize(chunk.height)),
            entries: Vec::new(),
            buckets: KeyMap::default(),
            overflow: Vec::new(),
        }
    }

    pub fn chunk_size(&self) -> Size {
        self.chunk
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.buckets.clear();
        self.overflow.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Rect, &T)> + '_ {
        self.entries.iter().map(|(rect, value)| (*rect, value))
    }

    fn chunk_range(&self, rect: Rect) -> Option<ChunkRange> {
        if !rect.is_finite() {
            return None;
        }
        let rect = rect.abs();
        // `as` saturates, so far-away coordinates still produce a usable range.
        let range = ChunkRange {
            col0: (rect.x0 / self.chunk.width).floor() as i64,
            row0: (rect.y0 / self.chunk.height).floor() as i64,
            col1: (rect.x1 / self.chunk.width).floor() as i64,
            row1: (rect.y1 / self.chunk.height).floor() as i64,
        };
        (range.bucket_count() <= MAX_BUCKETS).then_some(range)
    }

    pub fn insert(&mut self, rect: Rect, value: T) {
        let id = self.entries.len();
        self.entries.push((rect, value));
        let Some(range) = self.chunk_range(rect) else {
            self.overflow.push(id);
            return;
        };
        for row in range.row0..=range.row1 {
            for col in range.col0..=range.col1 {
                self.buckets.entry((row, col)).or_default().push(id);
            }
        }
    }

    /// Returns every value whose rectangle touches `rect`.
    pub fn query(&self, rect: Rect) -> Vec<T> {
        let mut candidates: Vec<usize> = match self.chunk_range(rect) {
            Some(range) => {
                let mut out = self.overflow.clone();
                for row in range.row0..=range.row1 {
                    for col in range.col0..=range.col1 {
                        if let Some(ids) = self.buckets.get(&(row, col)) {
                            out.extend_from_slice(ids);
                        }
                    }
                }
                out
            }
            None => (0..self.entries.len()).collect(),
        };
        candidates.sort_unstable();
        candidates.dedup();
        candidates
            .into_iter()
            .filter_map(|id| {
                let (entry, value) = &self.entries[id];
                touches(*entry, rect).then(|| value.clone())
            })
            .collect()
    }
}
