//! Index remapping across a batch of structural mutations.
//!
//! Deletions, moves-from and reloads are expressed in *before* coordinates; insertions and
//! moves-to in *after* coordinates. Operations of the same kind are applied as a set, not
//! replayed one at a time.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use crate::{CompositeIndex, Element, ElementKind, SectionCounts};

/// One structural change reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MutationOp {
    /// Insert an item at an after-coordinate.
    InsertItem(CompositeIndex),
    /// Insert a section at an after-coordinate.
    InsertSection(usize),
    /// Delete the item at a before-coordinate.
    DeleteItem(CompositeIndex),
    /// Delete the section at a before-coordinate, together with all of its items.
    DeleteSection(usize),
    MoveItem {
        from: CompositeIndex,
        to: CompositeIndex,
    },
    MoveSection {
        from: usize,
        to: usize,
    },
    ReloadItem {
        before: CompositeIndex,
        after: CompositeIndex,
    },
    ReloadSection {
        before: usize,
        after: usize,
    },
}

/// A conflict detected by the shift routine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ShiftError {
    #[error("position {position} is out of bounds (count {count})")]
    OutOfBounds { position: usize, count: usize },
    #[error("position {position} is removed more than once")]
    DuplicateSource { position: usize },
    #[error("position {position} is targeted more than once")]
    DuplicateTarget { position: usize },
}

/// A mutation batch that violates its contract with the prior counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RemapError {
    #[error("section {section} is out of bounds (section count {count})")]
    SectionOutOfBounds { section: usize, count: usize },
    #[error("item {index} is out of bounds (item count {count})")]
    ItemOutOfBounds { index: CompositeIndex, count: usize },
    #[error("invalid section shift: {0}")]
    Sections(ShiftError),
    #[error("invalid item shift in section {section}: {error}")]
    Items { section: usize, error: ShiftError },
    #[error("remapped section count {expected} does not match new section count {actual}")]
    SectionCountMismatch { expected: usize, actual: usize },
    #[error("remapped item count {expected} in section {section} does not match new count {actual}")]
    ItemCountMismatch {
        section: usize,
        expected: usize,
        actual: usize,
    },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Slot {
    Open,
    Placeholder,
    Moved(usize),
}

/// Result of [`shift`]: a before → after map over `0..count`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Shift {
    pub(crate) forward: Vec<Option<usize>>,
    pub(crate) after_count: usize,
}

/// Shifts `count` slots through a set of deletions, insertions and moves.
///
/// `deleted` and move sources are before-positions; `inserted` and move targets are
/// after-positions. Surviving slots keep their relative order.
pub(crate) fn shift(
    count: usize,
    deleted: &[usize],
    inserted: &[usize],
    moves: &[(usize, usize)],
) -> Result<Shift, ShiftError> {
    let mut removed = alloc::vec![false; count];
    for &position in deleted.iter().chain(moves.iter().map(|(from, _)| from)) {
        if position >= count {
            return Err(ShiftError::OutOfBounds { position, count });
        }
        if removed[position] {
            return Err(ShiftError::DuplicateSource { position });
        }
        removed[position] = true;
    }

    // Moves leave the count unchanged; every removed-but-not-moved slot is a deletion.
    let after_count = count - deleted.len() + inserted.len();
    let mut slots = alloc::vec![Slot::Open; after_count];
    let targets = inserted
        .iter()
        .map(|&to| (to, Slot::Placeholder))
        .chain(moves.iter().map(|&(from, to)| (to, Slot::Moved(from))));
    for (position, slot) in targets {
        if position >= after_count {
            return Err(ShiftError::OutOfBounds {
                position,
                count: after_count,
            });
        }
        if slots[position] != Slot::Open {
            return Err(ShiftError::DuplicateTarget { position });
        }
        slots[position] = slot;
    }

    let mut forward = alloc::vec![None; count];
    let mut survivors = (0..count).filter(|&i| !removed[i]);
    for (position, slot) in slots.iter().enumerate() {
        match *slot {
            Slot::Open => {
                if let Some(before) = survivors.next() {
                    forward[before] = Some(position);
                }
            }
            Slot::Moved(from) => forward[from] = Some(position),
            Slot::Placeholder => {}
        }
    }
    debug_assert!(survivors.next().is_none(), "shift: unplaced survivors");

    Ok(Shift {
        forward,
        after_count,
    })
}

/// A bidirectional partial map between before- and after-coordinates, plus reload sets.
///
/// Built once per mutation batch and dropped when the transition finishes. Absence of a mapping
/// means the element was deleted (forward) or inserted (backward).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexRemapTable {
    before_counts: SectionCounts,
    sections: Vec<Option<usize>>,
    sections_inverse: Vec<Option<usize>>,
    items: Vec<Vec<Option<CompositeIndex>>>,
    items_inverse: BTreeMap<CompositeIndex, CompositeIndex>,
    after_item_counts: Vec<Option<usize>>,
    reloaded_items: BTreeSet<CompositeIndex>,
    reloaded_items_after: BTreeSet<CompositeIndex>,
    reloaded_sections: BTreeSet<usize>,
    reloaded_sections_after: BTreeSet<usize>,
}

impl IndexRemapTable {
    /// Builds the table, panicking if the batch is inconsistent with `prior`.
    ///
    /// A corrupt map produces wrong geometry far from its cause, so invalid input is rejected
    /// loudly. Use [`Self::try_new`] to handle the error instead.
    pub fn new(prior: &SectionCounts, ops: &[MutationOp]) -> Self {
        match Self::try_new(prior, ops) {
            Ok(table) => table,
            Err(err) => panic!("invalid mutation batch: {err}"),
        }
    }

    pub fn try_new(prior: &SectionCounts, ops: &[MutationOp]) -> Result<Self, RemapError> {
        let section_count = prior.section_count();
        let check_section = |section: usize| {
            if section < section_count {
                Ok(())
            } else {
                Err(RemapError::SectionOutOfBounds {
                    section,
                    count: section_count,
                })
            }
        };
        let check_item = |index: CompositeIndex| {
            check_section(index.section)?;
            let count = prior.item_count(index.section).unwrap_or(0);
            if index.item < count {
                Ok(())
            } else {
                Err(RemapError::ItemOutOfBounds { index, count })
            }
        };

        // Reloads never shift anything; pull them out first.
        let mut reloaded_items = BTreeSet::new();
        let mut reloaded_items_after = BTreeSet::new();
        let mut reloaded_sections = BTreeSet::new();
        let mut reloaded_sections_after = BTreeSet::new();
        let mut deleted_sections = Vec::new();
        let mut inserted_sections = Vec::new();
        let mut moved_sections = Vec::new();
        let mut item_ops = Vec::new();
        for op in ops {
            match *op {
                MutationOp::ReloadItem { before, after } => {
                    check_item(before)?;
                    reloaded_items.insert(before);
                    reloaded_items_after.insert(after);
                }
                MutationOp::ReloadSection { before, after } => {
                    check_section(before)?;
                    reloaded_sections.insert(before);
                    reloaded_sections_after.insert(after);
                }
                MutationOp::DeleteSection(section) => {
                    check_section(section)?;
                    deleted_sections.push(section);
                }
                MutationOp::InsertSection(section) => inserted_sections.push(section),
                MutationOp::MoveSection { from, to } => {
                    check_section(from)?;
                    moved_sections.push((from, to));
                }
                MutationOp::InsertItem(_) | MutationOp::DeleteItem(_) | MutationOp::MoveItem { .. } => {
                    item_ops.push(*op);
                }
            }
        }

        let section_shift = shift(
            section_count,
            &deleted_sections,
            &inserted_sections,
            &moved_sections,
        )
        .map_err(RemapError::Sections)?;
        let sections = section_shift.forward;
        let after_section_count = section_shift.after_count;
        let mut sections_inverse = alloc::vec![None; after_section_count];
        for (before, after) in sections.iter().enumerate() {
            if let Some(after) = *after {
                sections_inverse[after] = Some(before);
            }
        }

        let mut deletes: Vec<Vec<usize>> = alloc::vec![Vec::new(); section_count];
        let mut inserts: Vec<Vec<usize>> = alloc::vec![Vec::new(); section_count];
        let mut moves: Vec<Vec<(usize, usize)>> = alloc::vec![Vec::new(); section_count];
        let mut cross_moves = Vec::new();
        let check_after_section = |section: usize| {
            if section < after_section_count {
                Ok(())
            } else {
                Err(RemapError::SectionOutOfBounds {
                    section,
                    count: after_section_count,
                })
            }
        };

        for op in item_ops {
            match op {
                MutationOp::DeleteItem(index) => {
                    check_item(index)?;
                    if sections[index.section].is_none() {
                        lwarn!(
                            section = index.section,
                            item = index.item,
                            "item deletion inside a deleted section ignored"
                        );
                        continue;
                    }
                    deletes[index.section].push(index.item);
                }
                MutationOp::InsertItem(index) => {
                    check_after_section(index.section)?;
                    // Bucketed by the before-section that now occupies the target section.
                    let Some(owner) = sections_inverse[index.section] else {
                        lwarn!(
                            section = index.section,
                            item = index.item,
                            "item insertion inside an inserted section ignored"
                        );
                        continue;
                    };
                    inserts[owner].push(index.item);
                }
                MutationOp::MoveItem { from, to } => {
                    check_item(from)?;
                    check_after_section(to.section)?;
                    let source = sections[from.section];
                    if source == Some(to.section) {
                        moves[from.section].push((from.item, to.item));
                        continue;
                    }
                    // Crossing containers: a removal on one side, a placeholder on the other,
                    // and an explicit entry linking them.
                    if source.is_some() {
                        deletes[from.section].push(from.item);
                    }
                    if let Some(owner) = sections_inverse[to.section] {
                        inserts[owner].push(to.item);
                    }
                    cross_moves.push((from, to));
                }
                _ => unreachable!("non-item op in item stage"),
            }
        }

        let mut items = Vec::with_capacity(section_count);
        let mut after_item_counts = alloc::vec![None; after_section_count];
        for (section, after_section) in sections.iter().enumerate() {
            let count = prior.item_count(section).unwrap_or(0);
            let Some(after_section) = *after_section else {
                items.push(alloc::vec![None; count]);
                continue;
            };
            let item_shift = shift(count, &deletes[section], &inserts[section], &moves[section])
                .map_err(|error| RemapError::Items { section, error })?;
            after_item_counts[after_section] = Some(item_shift.after_count);
            items.push(
                item_shift
                    .forward
                    .into_iter()
                    .map(|item| item.map(|item| CompositeIndex::new(after_section, item)))
                    .collect(),
            );
        }

        for (from, to) in cross_moves {
            if sections[from.section].is_some() {
                items[from.section][from.item] = Some(to);
            }
        }

        let mut items_inverse = BTreeMap::new();
        for (section, row) in items.iter().enumerate() {
            for (item, after) in row.iter().enumerate() {
                if let Some(after) = *after {
                    let previous = items_inverse.insert(after, CompositeIndex::new(section, item));
                    debug_assert!(
                        previous.is_none(),
                        "IndexRemapTable: {after} has two before-images"
                    );
                }
            }
        }

        ltrace!(
            sections_before = section_count,
            sections_after = after_section_count,
            items_before = prior.total_items(),
            mapped_items = items_inverse.len(),
            "IndexRemapTable::try_new"
        );

        Ok(Self {
            before_counts: prior.clone(),
            sections,
            sections_inverse,
            items,
            items_inverse,
            after_item_counts,
            reloaded_items,
            reloaded_items_after,
            reloaded_sections,
            reloaded_sections_after,
        })
    }

    pub fn before_counts(&self) -> &SectionCounts {
        &self.before_counts
    }

    pub fn before_section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn after_section_count(&self) -> usize {
        self.sections_inverse.len()
    }

    /// Item count of an after-section, when it has a before-image.
    ///
    /// Inserted sections report `None`: their contents are not described by the batch.
    pub fn after_item_count(&self, section: usize) -> Option<usize> {
        self.after_item_counts.get(section).copied().flatten()
    }

    pub fn after_section(&self, before: usize) -> Option<usize> {
        self.sections.get(before).copied().flatten()
    }

    pub fn before_section(&self, after: usize) -> Option<usize> {
        self.sections_inverse.get(after).copied().flatten()
    }

    /// Maps a before-index forward. Section deletion always wins over item arithmetic.
    pub fn after_index(&self, before: CompositeIndex) -> Option<CompositeIndex> {
        self.after_section(before.section)?;
        self.items.get(before.section)?.get(before.item).copied().flatten()
    }

    /// Maps an after-index backward.
    pub fn before_index(&self, after: CompositeIndex) -> Option<CompositeIndex> {
        if after.section >= self.after_section_count() {
            return None;
        }
        let before = *self.items_inverse.get(&after)?;
        // The cached entry is only trusted while its source section survives.
        self.after_section(before.section)?;
        Some(before)
    }

    /// Maps an element forward: items by composite index, supplementaries by section.
    pub fn after_element(&self, before: Element) -> Option<Element> {
        match before.kind {
            ElementKind::Item => self.after_index(before.index).map(|i| before.with_index(i)),
            _ => self
                .after_section(before.index.section)
                .map(|s| before.with_index(CompositeIndex::new(s, before.index.item))),
        }
    }

    pub fn before_element(&self, after: Element) -> Option<Element> {
        match after.kind {
            ElementKind::Item => self.before_index(after.index).map(|i| after.with_index(i)),
            _ => self
                .before_section(after.index.section)
                .map(|s| after.with_index(CompositeIndex::new(s, after.index.item))),
        }
    }

    pub fn is_reloaded_before(&self, before: CompositeIndex) -> bool {
        self.reloaded_items.contains(&before) || self.reloaded_sections.contains(&before.section)
    }

    pub fn is_reloaded_after(&self, after: CompositeIndex) -> bool {
        self.reloaded_items_after.contains(&after)
            || self.reloaded_sections_after.contains(&after.section)
    }

    pub fn is_section_reloaded_before(&self, before: usize) -> bool {
        self.reloaded_sections.contains(&before)
    }

    pub fn is_section_reloaded_after(&self, after: usize) -> bool {
        self.reloaded_sections_after.contains(&after)
    }

    pub fn reloaded_items(&self) -> impl Iterator<Item = CompositeIndex> + '_ {
        self.reloaded_items.iter().copied()
    }

    pub fn reloaded_sections(&self) -> impl Iterator<Item = usize> + '_ {
        self.reloaded_sections.iter().copied()
    }

    /// `true` when every index maps to itself and nothing was reloaded.
    pub fn is_identity(&self) -> bool {
        self.reloaded_items.is_empty()
            && self.reloaded_sections.is_empty()
            && self.sections_inverse.len() == self.sections.len()
            && self.sections.iter().enumerate().all(|(s, a)| *a == Some(s))
            && self.after_item_counts.iter().enumerate().all(|(s, count)| {
                *count == self.before_counts.item_count(s)
            })
            && self.items.iter().enumerate().all(|(s, row)| {
                row.iter()
                    .enumerate()
                    .all(|(i, a)| *a == Some(CompositeIndex::new(s, i)))
            })
    }

    /// Cross-checks the derived after-counts against the host's new counts.
    ///
    /// Sections inserted by the batch are not checked.
    pub fn verify_after_counts(&self, after: &SectionCounts) -> Result<(), RemapError> {
        if after.section_count() != self.after_section_count() {
            return Err(RemapError::SectionCountMismatch {
                expected: self.after_section_count(),
                actual: after.section_count(),
            });
        }
        for (section, &actual) in after.as_slice().iter().enumerate() {
            if let Some(expected) = self.after_item_count(section) {
                if expected != actual {
                    return Err(RemapError::ItemCountMismatch {
                        section,
                        expected,
                        actual,
                    });
                }
            }
        }
        Ok(())
    }
}
