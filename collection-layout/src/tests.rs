use crate::*;

use alloc::collections::BTreeSet;
use alloc::vec;
use alloc::vec::Vec;

use kurbo::{Insets, Point, Rect, Size};

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        // Deterministic, dependency-free PRNG for tests.
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 11
    }

    fn gen_range_usize(&mut self, start: usize, end_exclusive: usize) -> usize {
        debug_assert!(start < end_exclusive);
        start + (self.next_u64() % (end_exclusive - start) as u64) as usize
    }

    fn gen_f64(&mut self, start: f64, end: f64) -> f64 {
        let unit = (self.next_u64() % 1_000_000) as f64 / 1_000_000.0;
        start + (end - start) * unit
    }

    fn gen_bool(&mut self, percent: u64) -> bool {
        self.next_u64() % 100 < percent
    }

    /// `k` distinct values from `0..n`, sorted.
    fn pick(&mut self, n: usize, k: usize) -> Vec<usize> {
        let mut pool: Vec<usize> = (0..n).collect();
        let mut out = Vec::with_capacity(k);
        for _ in 0..k.min(n) {
            let i = self.gen_range_usize(0, pool.len());
            out.push(pool.swap_remove(i));
        }
        out.sort_unstable();
        out
    }
}

const WIDTH: f64 = 320.0;
const HEADER: f64 = 50.0;
const ROW: f64 = 100.0;

/// A vertical list: each section is a header followed by fixed-height rows.
struct ListModel {
    counts: SectionCounts,
    sticky: Option<StickyBehavior>,
}

impl ListModel {
    fn new(counts: Vec<usize>) -> Self {
        Self {
            counts: SectionCounts::new(counts),
            sticky: None,
        }
    }

    fn with_sticky(mut self, behavior: StickyBehavior) -> Self {
        self.sticky = Some(behavior);
        self
    }

    fn section_top(&self, section: usize) -> f64 {
        self.counts.as_slice()[..section]
            .iter()
            .map(|&c| HEADER + c as f64 * ROW)
            .sum()
    }

    fn section_frame(&self, section: usize) -> Rect {
        let top = self.section_top(section);
        let count = self.counts.item_count(section).unwrap_or(0);
        Rect::new(0.0, top, WIDTH, top + HEADER + count as f64 * ROW)
    }

    fn frame(&self, element: Element) -> Option<Rect> {
        let section = element.index.section;
        let count = self.counts.item_count(section)?;
        let top = self.section_top(section);
        match element.kind {
            ElementKind::Header => Some(Rect::new(0.0, top, WIDTH, top + HEADER)),
            ElementKind::Item if element.index.item < count => {
                let y = top + HEADER + element.index.item as f64 * ROW;
                Some(Rect::new(0.0, y, WIDTH, y + ROW))
            }
            _ => None,
        }
    }
}

impl LayoutModel for ListModel {
    fn content_size(&self) -> Size {
        Size::new(WIDTH, self.section_top(self.counts.section_count()))
    }

    fn elements_intersecting(&self, rect: Rect) -> Vec<Element> {
        let mut out = Vec::new();
        for section in 0..self.counts.section_count() {
            out.push(Element::header(section));
            out.extend(self.counts.indices().filter(|i| i.section == section).map(|i| {
                Element::item(i.section, i.item)
            }));
        }
        out.retain(|e| {
            self.frame(*e)
                .is_some_and(|f| f.x0 < rect.x1 && rect.x0 < f.x1 && f.y0 < rect.y1 && rect.y0 < f.y1)
        });
        out
    }

    fn attributes(&self, element: Element) -> Option<LayoutAttributes> {
        let frame = self.frame(element)?;
        let attrs = LayoutAttributes::new(element, frame);
        match (element.kind, self.sticky) {
            (ElementKind::Header, Some(behavior)) => Some(attrs.with_sticky(Some(
                StickyDescriptor::new(StickyEdges::TOP, self.section_frame(element.index.section))
                    .with_behavior(behavior),
            ))),
            _ => Some(attrs),
        }
    }

    fn offset_for_anchor(
        &self,
        anchor: &ScrollAnchor,
        _proposed: Rect,
        _current: Rect,
    ) -> Option<Point> {
        offset_for_anchor_frame(self, anchor)
    }

    fn elements_affected_by(&self, _change: &BoundsChange) -> Vec<Element> {
        Vec::new()
    }
}

fn viewport(y: f64) -> BoundsSnapshot {
    BoundsSnapshot::new(Rect::new(0.0, y, WIDTH, y + 480.0))
}

fn ci(section: usize, item: usize) -> CompositeIndex {
    CompositeIndex::new(section, item)
}

// --- SectionCounts -----------------------------------------------------------------------------

#[test]
fn section_counts_offsets_and_flat_indexes() {
    let counts = SectionCounts::new(vec![3, 0, 2]);
    assert_eq!(counts.section_count(), 3);
    assert_eq!(counts.total_items(), 5);
    assert_eq!(counts.offset(2), Some(3));
    assert_eq!(counts.offset(3), Some(5));
    assert_eq!(counts.flat_index(ci(2, 1)), Some(4));
    assert_eq!(counts.flat_index(ci(1, 0)), None);
    assert_eq!(counts.composite_index(3), Some(ci(2, 0)));
    assert_eq!(counts.composite_index(5), None);
    for (flat, index) in counts.indices().enumerate() {
        assert_eq!(counts.flat_index(index), Some(flat));
        assert_eq!(counts.composite_index(flat), Some(index));
    }
}

#[test]
fn composite_index_orders_lexicographically() {
    assert!(ci(0, 9) < ci(1, 0));
    assert!(ci(1, 0) < ci(1, 1));
}

// --- Shift routine -----------------------------------------------------------------------------

#[test]
fn shift_compacts_deletions_and_splices_insertions() {
    let s = remap::shift(5, &[1, 3], &[0], &[]).unwrap();
    assert_eq!(s.after_count, 4);
    assert_eq!(s.forward, vec![Some(1), None, Some(2), None, Some(3)]);
}

#[test]
fn shift_places_moves_then_fills_in_order() {
    // Move 0 to the end; everything else slides up.
    let s = remap::shift(4, &[], &[], &[(0, 3)]).unwrap();
    assert_eq!(s.forward, vec![Some(3), Some(0), Some(1), Some(2)]);

    // Swap-like pair of moves.
    let s = remap::shift(3, &[], &[], &[(0, 2), (2, 0)]).unwrap();
    assert_eq!(s.forward, vec![Some(2), Some(1), Some(0)]);
}

#[test]
fn shift_rejects_conflicts() {
    assert_eq!(
        remap::shift(3, &[3], &[], &[]),
        Err(ShiftError::OutOfBounds {
            position: 3,
            count: 3
        })
    );
    assert_eq!(
        remap::shift(3, &[1], &[], &[(1, 0)]),
        Err(ShiftError::DuplicateSource { position: 1 })
    );
    assert_eq!(
        remap::shift(3, &[], &[1], &[(0, 1)]),
        Err(ShiftError::DuplicateTarget { position: 1 })
    );
    assert_eq!(
        remap::shift(3, &[], &[4], &[]),
        Err(ShiftError::OutOfBounds {
            position: 4,
            count: 4
        })
    );
}

// --- IndexRemapTable ---------------------------------------------------------------------------

#[test]
fn scenario_item_deletions_across_sections() {
    let prior = SectionCounts::new(vec![8, 3]);
    let ops = [
        MutationOp::DeleteItem(ci(0, 3)),
        MutationOp::DeleteItem(ci(0, 4)),
        MutationOp::DeleteItem(ci(0, 6)),
        MutationOp::DeleteItem(ci(1, 0)),
        MutationOp::DeleteItem(ci(1, 2)),
    ];
    let table = IndexRemapTable::new(&prior, &ops);
    assert_eq!(table.after_index(ci(0, 5)), Some(ci(0, 3)));
    assert_eq!(table.after_index(ci(0, 7)), Some(ci(0, 4)));
    assert_eq!(table.after_index(ci(1, 1)), Some(ci(1, 0)));
    for deleted in [ci(0, 3), ci(0, 4), ci(0, 6), ci(1, 0), ci(1, 2)] {
        assert_eq!(table.after_index(deleted), None, "{deleted}");
    }
    assert_eq!(table.after_item_count(0), Some(5));
    assert_eq!(table.after_item_count(1), Some(1));
    assert_eq!(table.before_index(ci(0, 3)), Some(ci(0, 5)));
}

#[test]
fn scenario_section_insertion_shifts_later_sections() {
    let prior = SectionCounts::new(vec![3, 3]);
    let ops = [
        MutationOp::InsertSection(1),
        MutationOp::InsertItem(ci(1, 0)),
        MutationOp::InsertItem(ci(1, 1)),
        MutationOp::InsertItem(ci(1, 2)),
    ];
    let table = IndexRemapTable::new(&prior, &ops);
    for item in 0..3 {
        assert_eq!(table.after_index(ci(0, item)), Some(ci(0, item)));
        assert_eq!(table.after_index(ci(1, item)), Some(ci(2, item)));
        assert_eq!(table.before_index(ci(1, item)), None);
    }
    assert_eq!(table.after_section(1), Some(2));
    assert_eq!(table.before_section(1), None);
    assert_eq!(table.after_item_count(1), None);
    assert!(
        table
            .verify_after_counts(&SectionCounts::new(vec![3, 3, 3]))
            .is_ok()
    );
}

#[test]
fn scenario_section_replacement_drops_its_items() {
    let prior = SectionCounts::new(vec![5, 3, 3]);
    let ops = [
        MutationOp::DeleteItem(ci(0, 1)),
        MutationOp::DeleteItem(ci(0, 3)),
        MutationOp::DeleteItem(ci(1, 1)),
        MutationOp::DeleteSection(1),
        MutationOp::InsertSection(1),
        MutationOp::InsertItem(ci(1, 0)),
        MutationOp::InsertItem(ci(1, 1)),
        MutationOp::InsertItem(ci(1, 2)),
    ];
    let table = IndexRemapTable::new(&prior, &ops);
    assert_eq!(table.after_index(ci(0, 1)), None);
    assert_eq!(table.after_index(ci(0, 3)), None);
    assert_eq!(table.after_index(ci(0, 4)), Some(ci(0, 2)));
    for item in 0..3 {
        assert_eq!(table.after_index(ci(1, item)), None);
        assert_eq!(table.before_index(ci(1, item)), None);
        assert_eq!(table.after_index(ci(2, item)), Some(ci(2, item)));
    }
}

#[test]
fn section_deletion_wins_over_item_arithmetic() {
    let prior = SectionCounts::new(vec![2, 2]);
    let table = IndexRemapTable::new(&prior, &[MutationOp::DeleteSection(0)]);
    assert_eq!(table.after_index(ci(0, 0)), None);
    assert_eq!(table.after_index(ci(1, 1)), Some(ci(0, 1)));
    assert_eq!(table.after_section_count(), 1);
}

#[test]
fn moves_within_and_across_sections() {
    let prior = SectionCounts::new(vec![3, 2]);
    let ops = [
        MutationOp::MoveItem {
            from: ci(0, 0),
            to: ci(0, 2),
        },
        MutationOp::MoveItem {
            from: ci(1, 0),
            to: ci(0, 0),
        },
    ];
    let table = IndexRemapTable::new(&prior, &ops);
    // Section 0 after: [(1,0), (0,1), (0,0), (0,2)].
    assert_eq!(table.after_index(ci(1, 0)), Some(ci(0, 0)));
    assert_eq!(table.after_index(ci(0, 0)), Some(ci(0, 2)));
    assert_eq!(table.after_index(ci(0, 1)), Some(ci(0, 1)));
    assert_eq!(table.after_index(ci(0, 2)), Some(ci(0, 3)));
    assert_eq!(table.after_index(ci(1, 1)), Some(ci(1, 0)));
    assert_eq!(table.before_index(ci(0, 0)), Some(ci(1, 0)));
    assert_eq!(table.after_item_count(0), Some(4));
    assert_eq!(table.after_item_count(1), Some(1));
}

#[test]
fn section_moves_carry_their_items() {
    let prior = SectionCounts::new(vec![1, 2, 3]);
    let table = IndexRemapTable::new(&prior, &[MutationOp::MoveSection { from: 2, to: 0 }]);
    assert_eq!(table.after_section(2), Some(0));
    assert_eq!(table.after_section(0), Some(1));
    assert_eq!(table.after_index(ci(2, 2)), Some(ci(0, 2)));
    assert_eq!(table.before_index(ci(2, 1)), Some(ci(1, 1)));
    assert!(
        table
            .verify_after_counts(&SectionCounts::new(vec![3, 1, 2]))
            .is_ok()
    );
}

#[test]
fn reloads_do_not_shift() {
    let prior = SectionCounts::new(vec![3, 2]);
    let ops = [
        MutationOp::ReloadItem {
            before: ci(0, 1),
            after: ci(0, 1),
        },
        MutationOp::ReloadSection {
            before: 1,
            after: 1,
        },
    ];
    let table = IndexRemapTable::new(&prior, &ops);
    assert!(!table.is_identity());
    assert_eq!(table.after_index(ci(0, 2)), Some(ci(0, 2)));
    assert!(table.is_reloaded_before(ci(0, 1)));
    assert!(table.is_reloaded_after(ci(1, 0)));
    assert!(!table.is_reloaded_before(ci(0, 0)));
    assert!(table.is_section_reloaded_before(1));
    assert!(IndexRemapTable::new(&prior, &[]).is_identity());
}

#[test]
fn supplementary_elements_map_by_section() {
    let prior = SectionCounts::new(vec![1, 1]);
    let table = IndexRemapTable::new(&prior, &[MutationOp::InsertSection(0)]);
    assert_eq!(
        table.after_element(Element::header(0)),
        Some(Element::header(1))
    );
    assert_eq!(table.before_element(Element::header(0)), None);
    assert_eq!(
        table.after_element(Element::item(1, 0)),
        Some(Element::item(2, 0))
    );
}

#[test]
fn invalid_batches_are_rejected() {
    let prior = SectionCounts::new(vec![2]);
    assert_eq!(
        IndexRemapTable::try_new(&prior, &[MutationOp::DeleteItem(ci(0, 2))]),
        Err(RemapError::ItemOutOfBounds {
            index: ci(0, 2),
            count: 2
        })
    );
    assert_eq!(
        IndexRemapTable::try_new(&prior, &[MutationOp::DeleteSection(1)]),
        Err(RemapError::SectionOutOfBounds {
            section: 1,
            count: 1
        })
    );
    assert_eq!(
        IndexRemapTable::try_new(
            &prior,
            &[
                MutationOp::InsertItem(ci(0, 0)),
                MutationOp::InsertItem(ci(0, 0))
            ]
        ),
        Err(RemapError::Items {
            section: 0,
            error: ShiftError::DuplicateTarget { position: 0 }
        })
    );
    let table = IndexRemapTable::new(&prior, &[MutationOp::DeleteItem(ci(0, 0))]);
    assert_eq!(
        table.verify_after_counts(&SectionCounts::new(vec![2])),
        Err(RemapError::ItemCountMismatch {
            section: 0,
            expected: 1,
            actual: 2
        })
    );
}

#[test]
#[should_panic(expected = "invalid mutation batch")]
fn out_of_range_delete_panics() {
    IndexRemapTable::new(
        &SectionCounts::new(vec![1]),
        &[MutationOp::DeleteItem(ci(0, 1))],
    );
}

struct RandomBatch {
    prior: SectionCounts,
    ops: Vec<MutationOp>,
    deleted: BTreeSet<CompositeIndex>,
    inserted: BTreeSet<CompositeIndex>,
    untouched: Vec<usize>,
}

fn shuffle(rng: &mut Lcg, values: &mut [usize]) {
    for i in (1..values.len()).rev() {
        let j = rng.gen_range_usize(0, i + 1);
        values.swap(i, j);
    }
}

// Random batch mixing every structural op: section deletes, inserts and moves, plus item
// deletes, inserts and moves both within and across sections.
fn random_batch(rng: &mut Lcg) -> RandomBatch {
    let sections = rng.gen_range_usize(1, 6);
    let counts: Vec<usize> = (0..sections).map(|_| rng.gen_range_usize(0, 12)).collect();
    let prior = SectionCounts::new(counts.clone());
    let mut ops = Vec::new();
    let mut deleted = BTreeSet::new();
    let mut inserted = BTreeSet::new();
    let mut untouched = Vec::new();

    // Sections.
    let dead_sections: Vec<usize> = if sections > 1 && rng.gen_bool(30) {
        vec![rng.gen_range_usize(0, sections)]
    } else {
        Vec::new()
    };
    let living: Vec<usize> = (0..sections).filter(|s| !dead_sections.contains(s)).collect();
    let section_inserts = if rng.gen_bool(30) { rng.gen_range_usize(1, 3) } else { 0 };
    let moved_sections: Vec<usize> = if living.len() > 1 && rng.gen_bool(30) {
        vec![living[rng.gen_range_usize(0, living.len())]]
    } else {
        Vec::new()
    };
    let after_sections = living.len() + section_inserts;
    let mut section_targets = rng.pick(after_sections, section_inserts + moved_sections.len());
    shuffle(rng, &mut section_targets);

    for &section in &dead_sections {
        ops.push(MutationOp::DeleteSection(section));
        deleted.extend((0..counts[section]).map(|i| ci(section, i)));
    }
    // owners[after] = the before-section now at `after`; `None` for inserted sections.
    let mut owners: Vec<Option<usize>> = vec![None; after_sections];
    let mut claimed = vec![false; after_sections];
    for (k, &to) in section_targets.iter().enumerate() {
        claimed[to] = true;
        if k < section_inserts {
            ops.push(MutationOp::InsertSection(to));
        } else {
            let from = moved_sections[k - section_inserts];
            ops.push(MutationOp::MoveSection { from, to });
            owners[to] = Some(from);
        }
    }
    let mut rest = living.iter().copied().filter(|s| !moved_sections.contains(s));
    for (slot, owner) in owners.iter_mut().enumerate() {
        if !claimed[slot] {
            *owner = rest.next();
        }
    }
    let mut after_of: Vec<Option<usize>> = vec![None; sections];
    for (after, owner) in owners.iter().enumerate() {
        if let Some(before) = *owner {
            after_of[before] = Some(after);
        }
    }

    // Items: choose removals first, then place every arrival in its target section.
    let mut deletes: Vec<Vec<usize>> = vec![Vec::new(); sections];
    let mut local_moves: Vec<Vec<usize>> = vec![Vec::new(); sections];
    let mut inserts = vec![0usize; sections];
    let mut outgoing = vec![0usize; sections];
    // Cross-section move sources, keyed by the before-section owning the target section.
    let mut incoming: Vec<Vec<CompositeIndex>> = vec![Vec::new(); sections];
    for &section in &living {
        if !rng.gen_bool(70) {
            untouched.push(section);
            continue;
        }
        let count = counts[section];
        let delete_count = rng.gen_range_usize(0, count + 1);
        deletes[section] = rng.pick(count, delete_count);
        let remaining: Vec<usize> = (0..count)
            .filter(|i| !deletes[section].contains(i))
            .collect();
        let move_count = rng.gen_range_usize(0, remaining.len().min(4) + 1);
        let others: Vec<usize> = living.iter().copied().filter(|&s| s != section).collect();
        for i in rng.pick(remaining.len(), move_count) {
            let from = remaining[i];
            if !others.is_empty() && rng.gen_bool(40) {
                let dest = others[rng.gen_range_usize(0, others.len())];
                incoming[dest].push(ci(section, from));
                outgoing[section] += 1;
            } else {
                local_moves[section].push(from);
            }
        }
        inserts[section] = rng.gen_range_usize(0, 4);
    }

    for &section in &living {
        let after_section = after_of[section].unwrap();
        for &d in &deletes[section] {
            ops.push(MutationOp::DeleteItem(ci(section, d)));
            deleted.insert(ci(section, d));
        }
        let after_count = counts[section] - deletes[section].len() - outgoing[section]
            + inserts[section]
            + incoming[section].len();
        let local = &local_moves[section];
        let arrivals = inserts[section] + local.len() + incoming[section].len();
        let mut targets = rng.pick(after_count, arrivals);
        shuffle(rng, &mut targets);
        for (k, &to) in targets.iter().enumerate() {
            let to = ci(after_section, to);
            if k < inserts[section] {
                ops.push(MutationOp::InsertItem(to));
                inserted.insert(to);
            } else if k < inserts[section] + local.len() {
                let from = ci(section, local[k - inserts[section]]);
                ops.push(MutationOp::MoveItem { from, to });
            } else {
                let from = incoming[section][k - inserts[section] - local.len()];
                ops.push(MutationOp::MoveItem { from, to });
            }
        }
    }
    RandomBatch {
        prior,
        ops,
        deleted,
        inserted,
        untouched,
    }
}

#[test]
fn random_batches_round_trip_and_are_complete() {
    let mut rng = Lcg::new(0x5eed);
    for _ in 0..500 {
        let batch = random_batch(&mut rng);
        let table = IndexRemapTable::new(&batch.prior, &batch.ops);

        let mut targets = BTreeSet::new();
        for before in batch.prior.indices() {
            match table.after_index(before) {
                Some(after) => {
                    assert!(!batch.deleted.contains(&before), "{before} was deleted");
                    assert_eq!(table.before_index(after), Some(before));
                    assert!(targets.insert(after), "{after} targeted twice");
                    assert!(!batch.inserted.contains(&after));
                }
                None => assert!(batch.deleted.contains(&before), "{before} lost its image"),
            }
        }
        for &after in &batch.inserted {
            assert_eq!(table.before_index(after), None);
        }
        for section in 0..table.after_section_count() {
            let Some(count) = table.after_item_count(section) else {
                continue;
            };
            for item in 0..count {
                let after = ci(section, item);
                match table.before_index(after) {
                    Some(before) => assert_eq!(table.after_index(before), Some(after)),
                    None => assert!(batch.inserted.contains(&after), "{after} has no source"),
                }
            }
        }
        for &section in &batch.untouched {
            let count = batch.prior.item_count(section).unwrap();
            let images: Vec<CompositeIndex> = (0..count)
                .map(|i| table.after_index(ci(section, i)).unwrap())
                .collect();
            assert!(images.windows(2).all(|w| w[0] < w[1]));
            assert!(images.iter().all(|a| a.section == images[0].section));
        }
    }
}

// --- Sticky positioning ------------------------------------------------------------------------

fn sticky_header(frame: Rect, travel: Rect, edges: StickyEdges) -> LayoutAttributes {
    LayoutAttributes::new(Element::header(0), frame)
        .with_sticky(Some(StickyDescriptor::new(edges, travel)))
}

#[test]
fn scenario_push_header_clamps_to_travel_bounds() {
    let model = ListModel::new(vec![10, 10]).with_sticky(StickyBehavior::Push);
    let base = model.attributes(Element::header(0)).unwrap();
    let travel = model.section_frame(0);
    assert_eq!(travel.y1, 1050.0);
    let mut y = 0.0;
    while y <= 1500.0 {
        let out = stickify(&base, &viewport(y));
        let expected = y.min(travel.y1 - HEADER);
        assert_eq!(out.frame.y0, expected, "scroll {y}");
        assert_eq!(out.frame.height(), HEADER);
        assert_eq!(out.alpha, 1.0);
        y += 100.0;
    }
    // The 500-unit scroll from the scenario.
    assert_eq!(stickify(&base, &viewport(500.0)).frame.y0, 500.0);
}

#[test]
fn push_stays_inside_travel_bounds_for_any_bounds() {
    let mut rng = Lcg::new(42);
    for _ in 0..2000 {
        let tx = rng.gen_f64(-500.0, 500.0);
        let ty = rng.gen_f64(-500.0, 500.0);
        let travel = Rect::new(tx, ty, tx + rng.gen_f64(50.0, 800.0), ty + rng.gen_f64(50.0, 800.0));
        let w = rng.gen_f64(1.0, travel.width());
        let h = rng.gen_f64(1.0, travel.height());
        let fx = rng.gen_f64(travel.x0, travel.x1 - w);
        let fy = rng.gen_f64(travel.y0, travel.y1 - h);
        let edges = StickyEdges::from_bits_truncate(rng.gen_range_usize(0, 16) as u8);
        let base = sticky_header(Rect::new(fx, fy, fx + w, fy + h), travel, edges);
        let bx = rng.gen_f64(-2000.0, 2000.0);
        let by = rng.gen_f64(-2000.0, 2000.0);
        let bounds = BoundsSnapshot::new(Rect::new(
            bx,
            by,
            bx + rng.gen_f64(0.0, 900.0),
            by + rng.gen_f64(0.0, 900.0),
        ));
        let out = stickify(&base, &bounds);
        assert!(
            geom::contains_rect(travel.inflate(1e-6, 1e-6), out.frame),
            "{:?} escaped {travel:?}",
            out.frame
        );
        assert!((out.frame.width() - w).abs() < 1e-6);
        assert!((out.frame.height() - h).abs() < 1e-6);
        if edges.is_empty() {
            assert_eq!(out.frame, base.frame);
        }
    }
}

#[test]
fn undesignated_edges_are_untouched() {
    let base = sticky_header(
        Rect::new(0.0, 0.0, 100.0, 50.0),
        Rect::new(-1000.0, -1000.0, 1000.0, 1000.0),
        StickyEdges::LEFT,
    );
    let out = stickify(&base, &BoundsSnapshot::new(Rect::new(30.0, 200.0, 500.0, 600.0)));
    assert_eq!(out.frame, Rect::new(30.0, 0.0, 130.0, 50.0));
}

#[test]
fn bottom_pin_and_insets() {
    let base = sticky_header(
        Rect::new(0.0, 900.0, 100.0, 950.0),
        Rect::new(0.0, 0.0, 100.0, 1000.0),
        StickyEdges::BOTTOM,
    );
    let desc = base.sticky.unwrap().with_insets(Insets::new(0.0, 0.0, 0.0, 20.0));
    let base = base.with_sticky(Some(desc));
    let out = stickify(&base, &BoundsSnapshot::new(Rect::new(0.0, 0.0, 100.0, 480.0)));
    assert_eq!(out.frame.y1, 460.0);
}

#[test]
fn safe_area_reference() {
    let base = sticky_header(
        Rect::new(0.0, 0.0, 100.0, 50.0),
        Rect::new(0.0, 0.0, 100.0, 1000.0),
        StickyEdges::TOP,
    );
    let desc = base.sticky.unwrap().with_safe_area(true);
    let base = base.with_sticky(Some(desc));
    let bounds = BoundsSnapshot::new(Rect::new(0.0, 100.0, 100.0, 580.0))
        .with_safe_area(Insets::new(0.0, 44.0, 0.0, 0.0));
    assert_eq!(stickify(&base, &bounds).frame.y0, 144.0);
}

#[test]
fn fade_leaves_travel_bounds_while_fading() {
    let model = ListModel::new(vec![4]).with_sticky(StickyBehavior::Fade);
    let base = model.attributes(Element::header(0)).unwrap();
    // Section spans 0..450; header is 50 tall.
    let inside = stickify(&base, &viewport(300.0));
    assert_eq!(inside.frame.y0, 300.0);
    assert_eq!(inside.alpha, 1.0);

    let half = stickify(&base, &viewport(425.0));
    assert_eq!(half.frame.y0, 425.0);
    assert!((half.alpha - 0.5).abs() < 1e-9);

    let gone = stickify(&base, &viewport(800.0));
    assert_eq!(gone.frame.y0, 450.0);
    assert_eq!(gone.alpha, 0.0);

    let desc = base.sticky.unwrap();
    assert_eq!(
        desc.extended_bounds(base.frame.size()),
        Rect::new(-WIDTH, -HEADER, 2.0 * WIDTH, 450.0 + HEADER)
    );
}

#[test]
fn disappear_matches_push_geometry() {
    let push = ListModel::new(vec![4]).with_sticky(StickyBehavior::Push);
    let gone = ListModel::new(vec![4]).with_sticky(StickyBehavior::Disappear);
    for y in [0.0, 200.0, 420.0, 900.0] {
        let a = stickify(&push.attributes(Element::header(0)).unwrap(), &viewport(y));
        let b = stickify(&gone.attributes(Element::header(0)).unwrap(), &viewport(y));
        assert_eq!(a.frame, b.frame);
    }
}

#[test]
fn engine_memoizes_and_indexes_sticky_elements() {
    let model = ListModel::new(vec![5, 5, 5]).with_sticky(StickyBehavior::Push);
    let mut engine = StickyPositioningEngine::new(Size::new(WIDTH, 480.0));
    engine.register(&model, model.elements_intersecting(Rect::new(0.0, 0.0, WIDTH, 5000.0)));
    assert_eq!(engine.sticky_len(), 3);
    assert_eq!(engine.cached_len(), 18);
    assert!(engine.base_attributes(&model, Element::item(9, 0)).is_none());
    assert_eq!(engine.cached_len(), 19);

    engine.update_bounds(viewport(0.0));
    let pinned = engine.attributes(&model, Element::header(0)).unwrap();
    assert_eq!(pinned.frame.y0, 0.0);
    engine.update_bounds(viewport(100.0));
    let pinned = engine.attributes(&model, Element::header(0)).unwrap();
    assert_eq!(pinned.frame.y0, 100.0);
}

#[test]
fn scrolling_flags_only_reachable_sticky_elements() {
    // Sections of 5 rows: 0..550, 550..1100, 1100..1650, ...
    let model = ListModel::new(vec![5; 10]).with_sticky(StickyBehavior::Push);
    let mut engine = StickyPositioningEngine::new(Size::new(WIDTH, 480.0));
    engine.register(&model, (0..10).map(Element::header));
    assert!(engine.update_bounds(viewport(0.0)).is_empty());

    let flagged = engine.update_bounds(viewport(200.0));
    assert_eq!(flagged, vec![Element::header(0)]);

    // Crossing into section 1 affects both the outgoing and incoming headers.
    let flagged = engine.update_bounds(viewport(600.0));
    assert_eq!(flagged, vec![Element::header(0), Element::header(1)]);

    // No change, nothing flagged.
    assert!(engine.update_bounds(viewport(600.0)).is_empty());

    // Headers between the two positions are pushed to the end of their sections.
    let flagged = engine.update_bounds(viewport(5000.0));
    assert!(flagged.contains(&Element::header(3)));
    assert!(flagged.contains(&Element::header(9)));

    // Sections the swept area does not reach are never candidates.
    let flagged = engine.update_bounds(viewport(5100.0));
    assert_eq!(flagged, vec![Element::header(9)]);
}

#[test]
fn horizontal_scroll_does_not_flag_top_pinned_headers_that_cannot_move() {
    let model = ListModel::new(vec![5; 3]).with_sticky(StickyBehavior::Push);
    let mut engine = StickyPositioningEngine::new(Size::new(WIDTH, 480.0));
    engine.register(&model, (0..3).map(Element::header));
    engine.update_bounds(viewport(700.0));
    // Section 2 starts at 1100, below the top edge both before and after.
    let moved = BoundsSnapshot::new(Rect::new(10.0, 700.0, WIDTH + 10.0, 1180.0));
    let flagged = engine.update_bounds(moved);
    assert!(flagged.contains(&Element::header(1)));
    assert!(!flagged.contains(&Element::header(2)));
}

#[test]
fn size_mismatch_mid_transition_freezes_tracking() {
    let model = ListModel::new(vec![5; 3]).with_sticky(StickyBehavior::Push);
    let mut engine =
        StickyPositioningEngine::new(Size::new(WIDTH, 480.0)).with_viewport_size(Size::new(WIDTH, 480.0));
    engine.register(&model, (0..3).map(Element::header));
    engine.update_bounds(viewport(100.0));
    engine.begin_transition();

    let odd = BoundsSnapshot::new(Rect::new(0.0, 300.0, WIDTH, 500.0));
    assert!(engine.update_bounds(odd).is_empty());
    assert!(engine.is_transition_frozen());
    assert_eq!(engine.bounds(), Some(viewport(100.0)));
    // Further updates are parked too.
    assert!(engine.update_bounds(viewport(200.0)).is_empty());
    assert_eq!(
        engine.attributes(&model, Element::header(0)).unwrap().frame.y0,
        100.0
    );

    let released = engine.finish_transition().unwrap();
    assert!(!engine.is_transition_frozen());
    assert_eq!(engine.bounds(), Some(viewport(200.0)));
    assert_eq!(released.old, viewport(100.0));
    assert_eq!(released.new, viewport(200.0));
    assert_eq!(engine.invalidated_by(&released), vec![Element::header(0)]);
    assert_eq!(engine.finish_transition(), None);
}

#[test]
fn matching_size_mid_transition_keeps_tracking() {
    let mut engine = StickyPositioningEngine::new(Size::new(WIDTH, 480.0))
        .with_viewport_size(Size::new(WIDTH, 600.0));
    engine.update_bounds(viewport(0.0));
    engine.begin_transition();
    let resized = BoundsSnapshot::new(Rect::new(0.0, 0.0, WIDTH, 600.0));
    engine.update_bounds(resized);
    assert!(!engine.is_transition_frozen());
    assert_eq!(engine.bounds(), Some(resized));
}

// --- Spatial index -----------------------------------------------------------------------------

#[test]
fn spatial_index_spans_buckets_and_dedups() {
    let mut index = SpatialIndex::new(Size::new(100.0, 100.0));
    index.insert(Rect::new(0.0, 0.0, 250.0, 50.0), 'a');
    index.insert(Rect::new(300.0, 300.0, 310.0, 310.0), 'b');
    index.insert(Rect::new(-150.0, -150.0, -120.0, -120.0), 'c');
    assert_eq!(index.query(Rect::new(0.0, 0.0, 400.0, 400.0)), vec!['a', 'b']);
    assert_eq!(index.query(Rect::new(240.0, 40.0, 260.0, 60.0)), vec!['a']);
    assert_eq!(index.query(Rect::new(-140.0, -140.0, -130.0, -130.0)), vec!['c']);
    assert!(index.query(Rect::new(150.0, 150.0, 160.0, 160.0)).is_empty());
    // Edges touch.
    assert_eq!(index.query(Rect::new(250.0, 50.0, 260.0, 60.0)), vec!['a']);
}

#[test]
fn spatial_index_overflow_and_fallback_chunk() {
    let mut index = SpatialIndex::new(Size::ZERO);
    assert_eq!(
        index.chunk_size(),
        Size::new(FALLBACK_CHUNK_EXTENT, FALLBACK_CHUNK_EXTENT)
    );
    index.insert(Rect::new(0.0, 0.0, 1.0e9, 1.0e9), 1);
    index.insert(Rect::new(0.0, 0.0, 10.0, 10.0), 2);
    assert_eq!(index.query(Rect::new(5.0e8, 5.0e8, 5.0e8, 5.0e8)), vec![1]);
    assert_eq!(index.query(Rect::new(-1.0e12, -1.0e12, 1.0e12, 1.0e12)), vec![1, 2]);
    index.clear();
    assert!(index.is_empty());
}

#[test]
fn spatial_index_matches_brute_force() {
    let mut rng = Lcg::new(7);
    let mut index = SpatialIndex::new(Size::new(320.0, 480.0));
    let mut all = Vec::new();
    for id in 0..300usize {
        let x = rng.gen_f64(-2000.0, 2000.0);
        let y = rng.gen_f64(-2000.0, 2000.0);
        let r = Rect::new(x, y, x + rng.gen_f64(0.0, 700.0), y + rng.gen_f64(0.0, 700.0));
        index.insert(r, id);
        all.push(r);
    }
    for _ in 0..200 {
        let x = rng.gen_f64(-2500.0, 2500.0);
        let y = rng.gen_f64(-2500.0, 2500.0);
        let q = Rect::new(x, y, x + rng.gen_f64(0.0, 900.0), y + rng.gen_f64(0.0, 900.0));
        let expected: Vec<usize> = all
            .iter()
            .enumerate()
            .filter(|(_, r)| geom::touches(**r, q))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(index.query(q), expected);
    }
}

// --- Bounds tracker ----------------------------------------------------------------------------

#[test]
fn bounds_tracker_parks_updates_while_frozen() {
    let mut tracker = BoundsTracker::new();
    assert!(tracker.update(viewport(0.0)).is_none());
    assert!(tracker.is_valid());

    tracker.freeze();
    tracker.freeze();
    assert!(tracker.update(viewport(10.0)).is_none());
    assert!(tracker.update(viewport(20.0)).is_none());
    assert_eq!(tracker.current(), Some(viewport(0.0)));
    assert!(tracker.unfreeze().is_none());
    assert!(tracker.has_pending());
    let change = tracker.unfreeze().unwrap();
    assert_eq!(change.old, viewport(0.0));
    assert_eq!(change.new, viewport(20.0));
    assert!(!tracker.is_frozen());

    tracker.invalidate();
    assert_eq!(tracker.fresh(), None);
    assert_eq!(tracker.current(), Some(viewport(20.0)));
    assert!(tracker.update(viewport(20.0)).is_none());
    assert_eq!(tracker.fresh(), Some(viewport(20.0)));
}

#[test]
fn touches_counts_shared_edges() {
    let a = Rect::new(0.0, 0.0, 10.0, 10.0);
    assert!(touches(a, Rect::new(10.0, 0.0, 20.0, 10.0)));
    assert!(touches(a, Rect::new(5.0, 5.0, 5.0, 5.0)));
    assert!(!touches(a, Rect::new(10.5, 0.0, 20.0, 10.0)));
    assert!(!touches(a, Rect::new(0.0, 10.5, 10.0, 20.0)));
}

// --- Header collision --------------------------------------------------------------------------

struct Headers(Vec<Rect>);

impl SectionHeaderSource for Headers {
    fn section_count(&self) -> usize {
        self.0.len()
    }

    fn header_frame(&self, section: usize) -> Rect {
        self.0[section]
    }
}

fn header_at(y: f64) -> Rect {
    Rect::new(0.0, y, 100.0, y + 40.0)
}

#[test]
fn header_pins_then_is_pushed_and_fades() {
    let source = Headers(vec![header_at(0.0), header_at(300.0), header_at(600.0)]);
    let mut headers = HeaderCollisionController::new();

    let out = headers.headers_in(&source, Rect::new(0.0, 100.0, 100.0, 500.0));
    let frames: Vec<f64> = out.iter().map(|a| a.frame.y0).collect();
    assert_eq!(frames, vec![100.0, 300.0]);
    assert_eq!(out[0].z_index, PINNED_HEADER_Z_INDEX);
    assert_eq!(out[0].alpha, 1.0);

    let pushed = headers
        .header_attributes(&source, 0, Rect::new(0.0, 280.0, 100.0, 680.0))
        .unwrap();
    assert_eq!(pushed.frame.y0, 260.0);
    assert!((pushed.alpha - 0.5).abs() < 1e-9);

    let unpinned = headers
        .header_attributes(&source, 1, Rect::new(0.0, 280.0, 100.0, 680.0))
        .unwrap();
    assert_eq!(unpinned.frame, header_at(300.0));
}

#[test]
fn colliding_headers_are_hidden_without_cascading() {
    let source = Headers(vec![
        header_at(0.0),
        header_at(20.0),
        header_at(50.0),
        header_at(200.0),
    ]);
    let mut headers = HeaderCollisionController::new();
    assert!(!headers.is_hidden(&source, 0));
    assert!(headers.is_hidden(&source, 1));
    // Overlaps the hidden header 1, so it stays hidden even though header 0 would not collide.
    assert!(headers.is_hidden(&source, 2));
    assert!(!headers.is_hidden(&source, 3));

    let out = headers.headers_in(&source, Rect::new(0.0, 0.0, 100.0, 400.0));
    let sections: Vec<usize> = out.iter().map(|a| a.element.index.section).collect();
    assert_eq!(sections, vec![0, 3]);
    let hidden = headers
        .header_attributes(&source, 1, Rect::new(0.0, 0.0, 100.0, 400.0))
        .unwrap();
    assert!(hidden.hidden);
}

#[test]
fn pinned_header_is_listed_when_a_hidden_header_sits_between() {
    let tall = |y: f64| Rect::new(0.0, y, 100.0, y + 20.0);
    let source = Headers(vec![tall(0.0), tall(10.0), tall(100.0), tall(200.0)]);
    let mut headers = HeaderCollisionController::new();
    let viewport = Rect::new(0.0, 50.0, 100.0, 150.0);

    assert!(headers.is_hidden(&source, 1));
    let pinned = headers.header_attributes(&source, 0, viewport).unwrap();
    assert_eq!(pinned.frame, tall(50.0));
    assert!(!pinned.hidden);

    let out = headers.headers_in(&source, viewport);
    let sections: Vec<usize> = out.iter().map(|a| a.element.index.section).collect();
    assert_eq!(sections, vec![0, 2]);
    assert_eq!(out[0], pinned);
}

#[test]
fn header_cache_grows_lazily() {
    let source = Headers((0..1000).map(|i| header_at(i as f64 * 500.0)).collect());
    let mut headers = HeaderCollisionController::new();
    let out = headers.headers_in(&source, Rect::new(0.0, 0.0, 100.0, 900.0));
    assert_eq!(out.len(), 2);
    assert!(headers.cached_len() <= 4);

    let out = headers.headers_in(&source, Rect::new(0.0, 10_250.0, 100.0, 10_700.0));
    let sections: Vec<usize> = out.iter().map(|a| a.element.index.section).collect();
    assert_eq!(sections, vec![20, 21]);
    assert!(headers.cached_len() < 30);

    headers.invalidate();
    assert_eq!(headers.cached_len(), 0);
    assert_eq!(headers.base_frame(&source, 3), Some(header_at(1500.0)));
}

// --- Model defaults ----------------------------------------------------------------------------

#[test]
fn default_anchor_picks_item_nearest_center() {
    let model = ListModel::new(vec![10]);
    // Visible 0..480: center at 240; rows at 50..150, 150..250 (center 200), 250..350 (300).
    assert_eq!(model.anchor(Rect::new(0.0, 0.0, WIDTH, 480.0)), Some(ci(0, 1)));
    let anchor = capture_anchor(&model, Rect::new(0.0, 0.0, WIDTH, 480.0)).unwrap();
    assert_eq!(anchor.offset_in_viewport, kurbo::Vec2::new(0.0, 150.0));
    assert_eq!(
        model.offset_for_anchor(&anchor, Rect::ZERO, Rect::ZERO),
        Some(Point::new(0.0, 0.0))
    );
    assert_eq!(model.target_offset(Rect::ZERO, kurbo::Vec2::ZERO), None);
    assert_eq!(
        model.transition_animation(Element::item(0, 0), Transition::Appearing),
        AnimationKind::Fade
    );
}

#[test]
fn anchor_ties_prefer_lower_index() {
    let model = ListModel::new(vec![10]);
    // Center at 250: rows 150..250 and 250..350 are equally distant.
    assert_eq!(model.anchor(Rect::new(0.0, 50.0, WIDTH, 450.0)), Some(ci(0, 1)));
    assert_eq!(model.anchor(Rect::new(0.0, 10_000.0, WIDTH, 10_480.0)), None);
}

#[test]
fn attribute_transforms_return_copies() {
    let a = LayoutAttributes::new(Element::item(0, 0), Rect::new(0.0, 0.0, 10.0, 10.0));
    let b = a.with_alpha(0.5).with_hidden(true).with_z_index(3);
    assert_eq!(a.alpha, 1.0);
    assert!(!a.hidden);
    assert_eq!(b.alpha, 0.5);
    assert!(b.hidden);
    assert_eq!(b.z_index, 3);
    assert_eq!(a.translated(kurbo::Vec2::new(5.0, 5.0)).frame, Rect::new(5.0, 5.0, 15.0, 15.0));
    assert!(a.pinned().is_none());
    let c = a.with_sticky(Some(StickyDescriptor::new(StickyEdges::empty(), Rect::ZERO)));
    assert!(c.pinned().is_none());
}
