use alloc::vec::Vec;
use core::fmt;

/// A `(section, item)` pair identifying one item-kind element.
///
/// Ordering is lexicographic: by section first, then by item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompositeIndex {
    pub section: usize,
    pub item: usize,
}

impl CompositeIndex {
    pub const fn new(section: usize, item: usize) -> Self {
        Self { section, item }
    }

    /// The index used for section-level supplementary elements (headers, footers).
    pub const fn section(section: usize) -> Self {
        Self { section, item: 0 }
    }
}

impl fmt::Display for CompositeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.section, self.item)
    }
}

impl From<(usize, usize)> for CompositeIndex {
    fn from((section, item): (usize, usize)) -> Self {
        Self { section, item }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementKind {
    Item,
    Header,
    Footer,
    /// Any other supplementary element, identified by a layout-defined tag.
    Custom(u32),
}

impl ElementKind {
    pub fn is_supplementary(self) -> bool {
        !matches!(self, Self::Item)
    }
}

/// One addressable element of the layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Element {
    pub kind: ElementKind,
    pub index: CompositeIndex,
}

impl Element {
    pub const fn new(kind: ElementKind, index: CompositeIndex) -> Self {
        Self { kind, index }
    }

    pub const fn item(section: usize, item: usize) -> Self {
        Self {
            kind: ElementKind::Item,
            index: CompositeIndex::new(section, item),
        }
    }

    pub const fn header(section: usize) -> Self {
        Self {
            kind: ElementKind::Header,
            index: CompositeIndex::section(section),
        }
    }

    pub const fn footer(section: usize) -> Self {
        Self {
            kind: ElementKind::Footer,
            index: CompositeIndex::section(section),
        }
    }

    /// Returns the same element kind at another index.
    pub const fn with_index(self, index: CompositeIndex) -> Self {
        Self {
            kind: self.kind,
            index,
        }
    }
}

/// Per-section item counts with precomputed cumulative offsets.
///
/// Built wholesale from the host's data source on every data change; never patched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "Vec<usize>", into = "Vec<usize>"))]
pub struct SectionCounts {
    counts: Vec<usize>,
    // offsets[s] = number of items before section `s`; len = counts.len() + 1.
    offsets: Vec<usize>,
}

impl SectionCounts {
    pub fn new(counts: impl Into<Vec<usize>>) -> Self {
        let counts = counts.into();
        let mut offsets = Vec::with_capacity(counts.len() + 1);
        let mut total = 0usize;
        offsets.push(0);
        for &c in &counts {
            total = total.saturating_add(c);
            offsets.push(total);
        }
        Self { counts, offsets }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn section_count(&self) -> usize {
        self.counts.len()
    }

    /// Returns the number of items in `section`, or `None` if the section does not exist.
    pub fn item_count(&self, section: usize) -> Option<usize> {
        self.counts.get(section).copied()
    }

    pub fn total_items(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// Number of items in all sections before `section`.
    ///
    /// `offset(section_count())` equals `total_items()`.
    pub fn offset(&self, section: usize) -> Option<usize> {
        self.offsets.get(section).copied()
    }

    pub fn contains(&self, index: CompositeIndex) -> bool {
        self.item_count(index.section)
            .is_some_and(|count| index.item < count)
    }

    /// Maps a composite index to its position in the flattened item sequence.
    pub fn flat_index(&self, index: CompositeIndex) -> Option<usize> {
        if !self.contains(index) {
            return None;
        }
        Some(self.offsets[index.section] + index.item)
    }

    /// Inverse of [`Self::flat_index`].
    pub fn composite_index(&self, flat: usize) -> Option<CompositeIndex> {
        if flat >= self.total_items() {
            return None;
        }
        // Last section whose starting offset is <= flat; empty sections share their offset with
        // the next section so the partition point skips over them.
        let section = self.offsets.partition_point(|&off| off <= flat) - 1;
        Some(CompositeIndex::new(section, flat - self.offsets[section]))
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.counts
    }

    /// Iterates all item indexes in lexicographic order.
    pub fn indices(&self) -> impl Iterator<Item = CompositeIndex> + '_ {
        self.counts
            .iter()
            .enumerate()
            .flat_map(|(section, &count)| (0..count).map(move |item| CompositeIndex::new(section, item)))
    }
}

impl From<Vec<usize>> for SectionCounts {
    fn from(counts: Vec<usize>) -> Self {
        Self::new(counts)
    }
}

impl From<&[usize]> for SectionCounts {
    fn from(counts: &[usize]) -> Self {
        Self::new(counts.to_vec())
    }
}

impl From<SectionCounts> for Vec<usize> {
    fn from(counts: SectionCounts) -> Self {
        counts.counts
    }
}
