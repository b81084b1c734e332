// Example: rows inserted above the viewport without moving the visible content.
use collection_layout_transition::collection_layout::kurbo::{Insets, Point, Rect, Size};
use collection_layout_transition::collection_layout::{
    BoundsChange, BoundsSnapshot, CompositeIndex, Element, GeometryInfo, LayoutAttributes,
    LayoutModel, MutationOp, ScrollAnchor, SectionCounts, offset_for_anchor_frame,
};
use collection_layout_transition::{LayoutStateController, LayoutStateOptions};

const ROW: f64 = 44.0;

struct Rows {
    count: usize,
    width: f64,
}

impl LayoutModel for Rows {
    fn content_size(&self) -> Size {
        Size::new(self.width, self.count as f64 * ROW)
    }

    fn elements_intersecting(&self, rect: Rect) -> Vec<Element> {
        let first = (rect.y0.max(0.0) / ROW) as usize;
        let last = ((rect.y1.max(0.0) / ROW) as usize + 1).min(self.count);
        (first..last).map(|i| Element::item(0, i)).collect()
    }

    fn attributes(&self, element: Element) -> Option<LayoutAttributes> {
        let i = element.index.item;
        (element.index.section == 0 && i < self.count).then(|| {
            let y = i as f64 * ROW;
            LayoutAttributes::new(element, Rect::new(0.0, y, self.width, y + ROW))
        })
    }

    fn offset_for_anchor(&self, anchor: &ScrollAnchor, _: Rect, _: Rect) -> Option<Point> {
        offset_for_anchor_frame(self, anchor)
    }

    fn elements_affected_by(&self, _change: &BoundsChange) -> Vec<Element> {
        Vec::new()
    }
}

fn main() {
    let options = LayoutStateOptions::new(|counts: &SectionCounts, geometry: &GeometryInfo| Rows {
        count: counts.item_count(0).unwrap_or(0),
        width: geometry.viewport_size.width,
    });
    let viewport = Size::new(375.0, 667.0);
    let mut controller = LayoutStateController::new(options);
    controller.update_geometry(GeometryInfo::new(viewport, Insets::ZERO));
    controller.update_counts(vec![200]);
    controller.push_new_generation();

    let scrolled = Point::new(0.0, 2_000.0);
    controller.update_bounds(BoundsSnapshot::new(Rect::from_origin_size(scrolled, viewport)));

    // Ten older rows arrive at the top.
    let ops: Vec<MutationOp> = (0..10)
        .map(|i| MutationOp::InsertItem(CompositeIndex::new(0, i)))
        .collect();
    controller.prepare_for_updates(vec![210], &ops);

    let resolved = controller.target_content_offset_after_transition(scrolled);
    println!(
        "offset {:?} -> {:?} ({:?})",
        scrolled, resolved.offset, resolved.strategy
    );

    let moved = Element::item(0, 50);
    println!(
        "row 50 appears from {:?}",
        controller
            .initial_attributes_for_appearing(moved)
            .map(|a| a.frame)
    );

    controller.finalize_transition();
    println!("content size {:?}", controller.content_size());
}
