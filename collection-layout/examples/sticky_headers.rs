// Example: a sectioned list with sticky headers, scrolled and then mutated.
use collection_layout::kurbo::{Point, Rect, Size};
use collection_layout::{
    BoundsChange, BoundsSnapshot, CompositeIndex, Element, ElementKind, IndexRemapTable,
    LayoutAttributes, LayoutModel, MutationOp, ScrollAnchor, SectionCounts, StickyDescriptor,
    StickyEdges, StickyPositioningEngine, offset_for_anchor_frame,
};

const WIDTH: f64 = 320.0;
const HEADER: f64 = 40.0;
const ROW: f64 = 60.0;

struct List {
    counts: SectionCounts,
}

impl List {
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
}

impl LayoutModel for List {
    fn content_size(&self) -> Size {
        Size::new(WIDTH, self.section_top(self.counts.section_count()))
    }

    fn elements_intersecting(&self, rect: Rect) -> Vec<Element> {
        let mut out = Vec::new();
        for section in 0..self.counts.section_count() {
            if self.section_frame(section).overlaps(rect) {
                out.push(Element::header(section));
            }
        }
        for index in self.counts.indices() {
            let element = Element::item(index.section, index.item);
            if self.attributes(element).is_some_and(|a| a.frame.overlaps(rect)) {
                out.push(element);
            }
        }
        out
    }

    fn attributes(&self, element: Element) -> Option<LayoutAttributes> {
        let section = element.index.section;
        let count = self.counts.item_count(section)?;
        let top = self.section_top(section);
        match element.kind {
            ElementKind::Header => {
                let frame = Rect::new(0.0, top, WIDTH, top + HEADER);
                let sticky = StickyDescriptor::new(StickyEdges::TOP, self.section_frame(section));
                Some(LayoutAttributes::new(element, frame).with_sticky(Some(sticky)))
            }
            ElementKind::Item if element.index.item < count => {
                let y = top + HEADER + element.index.item as f64 * ROW;
                Some(LayoutAttributes::new(element, Rect::new(0.0, y, WIDTH, y + ROW)))
            }
            _ => None,
        }
    }

    fn offset_for_anchor(&self, anchor: &ScrollAnchor, _: Rect, _: Rect) -> Option<Point> {
        offset_for_anchor_frame(self, anchor)
    }

    fn elements_affected_by(&self, _change: &BoundsChange) -> Vec<Element> {
        Vec::new()
    }
}

fn main() {
    let list = List {
        counts: SectionCounts::new(vec![10, 10, 10]),
    };
    let viewport = Size::new(WIDTH, 480.0);
    let mut engine = StickyPositioningEngine::new(viewport).with_viewport_size(viewport);
    engine.register(&list, list.elements_intersecting(Rect::from_origin_size(Point::ZERO, viewport)));

    for y in [0.0, 300.0, 600.0, 900.0] {
        let bounds = BoundsSnapshot::new(Rect::from_origin_size(Point::new(0.0, y), viewport));
        let flagged = engine.update_bounds(bounds);
        engine.register(&list, list.elements_intersecting(bounds.bounds));
        let header = engine.attributes(&list, Element::header(0));
        println!(
            "scroll={y} flagged={flagged:?} header0={:?}",
            header.map(|a| a.frame)
        );
    }

    let ops = [
        MutationOp::DeleteItem(CompositeIndex::new(0, 2)),
        MutationOp::InsertSection(1),
        MutationOp::MoveItem {
            from: CompositeIndex::new(1, 0),
            to: CompositeIndex::new(0, 0),
        },
    ];
    let table = IndexRemapTable::new(&list.counts, &ops);
    for before in [(0, 0), (0, 2), (1, 0), (1, 5), (2, 9)] {
        let before = CompositeIndex::from(before);
        println!("{before} -> {:?}", table.after_index(before));
    }
}
