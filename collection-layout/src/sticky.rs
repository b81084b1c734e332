use alloc::vec::Vec;

use kurbo::{Rect, Size, Vec2};

use crate::geom::{fits, overlap_area, shift_inside};
use crate::key::KeyMap;
use crate::{
    BoundsChange, BoundsSnapshot, BoundsTracker, Element, LayoutAttributes, LayoutModel,
    SpatialIndex, StickyBehavior, StickyDescriptor, StickyEdges,
};

/// The rectangle a sticky element pins against for the given scroll bounds.
pub fn reference_rect(descriptor: &StickyDescriptor, bounds: &BoundsSnapshot) -> Rect {
    let base = if descriptor.use_safe_area {
        bounds.safe_bounds()
    } else {
        bounds.bounds
    };
    base - descriptor.insets
}

/// Positions `base` for the given scroll bounds.
///
/// Attributes without a pinned descriptor are returned unchanged.
pub fn stickify(base: &LayoutAttributes, bounds: &BoundsSnapshot) -> LayoutAttributes {
    let Some(descriptor) = base.pinned() else {
        return base.clone();
    };
    let reference = reference_rect(descriptor, bounds);
    let edges = descriptor.edges;
    let size = base.frame.size();
    let mut frame = base.frame;

    // Bottom/right go first so top/left win when the reference is smaller than the frame.
    if edges.contains(StickyEdges::BOTTOM) && frame.y1 > reference.y1 {
        frame = frame + Vec2::new(0.0, reference.y1 - frame.y1);
    }
    if edges.contains(StickyEdges::TOP) && frame.y0 < reference.y0 {
        frame = frame + Vec2::new(0.0, reference.y0 - frame.y0);
    }
    if edges.contains(StickyEdges::RIGHT) && frame.x1 > reference.x1 {
        frame = frame + Vec2::new(reference.x1 - frame.x1, 0.0);
    }
    if edges.contains(StickyEdges::LEFT) && frame.x0 < reference.x0 {
        frame = frame + Vec2::new(reference.x0 - frame.x0, 0.0);
    }

    debug_assert!(
        fits(size, descriptor.travel_bounds),
        "sticky travel bounds {:?} smaller than frame {:?}",
        descriptor.travel_bounds,
        base.frame
    );
    // Hard limit for every behavior; only `Fade` may leave the travel bounds (while fading).
    frame = shift_inside(frame, descriptor.extended_bounds(size));

    let mut out = base.with_frame(frame);
    if descriptor.behavior == StickyBehavior::Fade {
        let area = frame.area();
        if area > 0.0 {
            out.alpha = base.alpha * (overlap_area(frame, descriptor.travel_bounds) / area);
        }
    }
    out
}

// Whether pinning against `reference` can move an element confined to `extended`.
fn may_pin(extended: Rect, reference: Rect, edges: StickyEdges) -> bool {
    (edges.contains(StickyEdges::TOP) && extended.y0 < reference.y0)
        || (edges.contains(StickyEdges::BOTTOM) && extended.y1 > reference.y1)
        || (edges.contains(StickyEdges::LEFT) && extended.x0 < reference.x0)
        || (edges.contains(StickyEdges::RIGHT) && extended.x1 > reference.x1)
}

/// Computes pinned frames for one generation and tracks which sticky elements a scroll may move.
///
/// Base attributes are fetched from the model lazily and memoized. Pinned elements are also
/// indexed by their extended sticky bounds so that a bounds change only re-examines the elements
/// whose extended bounds touch the swept area.
#[derive(Clone, Debug)]
pub struct StickyPositioningEngine {
    base: KeyMap<Element, Option<LayoutAttributes>>,
    index: SpatialIndex<Element>,
    tracker: BoundsTracker,
    viewport_size: Option<Size>,
    freeze_on_size_mismatch: bool,
    in_transition: bool,
    transition_frozen: bool,
}

impl StickyPositioningEngine {
    /// Creates an engine whose spatial index uses `chunk`-sized buckets.
    pub fn new(chunk: Size) -> Self {
        Self {
            base: KeyMap::default(),
            index: SpatialIndex::new(chunk),
            tracker: BoundsTracker::new(),
            viewport_size: None,
            freeze_on_size_mismatch: true,
            in_transition: false,
            transition_frozen: false,
        }
    }

    /// The viewport size of the geometry this engine was built for; bounds of this size are
    /// always considered consistent during a transition.
    pub fn with_viewport_size(mut self, viewport_size: Size) -> Self {
        self.viewport_size = Some(viewport_size);
        self
    }

    pub fn with_freeze_on_size_mismatch(mut self, freeze: bool) -> Self {
        self.freeze_on_size_mismatch = freeze;
        self
    }

    pub fn bounds_tracker(&self) -> &BoundsTracker {
        &self.tracker
    }

    pub fn bounds_tracker_mut(&mut self) -> &mut BoundsTracker {
        &mut self.tracker
    }

    /// The bounds queries are currently resolved against.
    pub fn bounds(&self) -> Option<BoundsSnapshot> {
        self.tracker.current()
    }

    /// Forces the next [`Self::update_bounds`] to be treated as a refresh.
    pub fn invalidate_live_bounds(&mut self) {
        self.tracker.invalidate();
    }

    pub fn needs_bounds(&self) -> bool {
        !self.tracker.is_valid() && !self.tracker.is_frozen()
    }

    pub fn cached_len(&self) -> usize {
        self.base.len()
    }

    pub fn sticky_len(&self) -> usize {
        self.index.len()
    }

    /// Memoized model attributes for `element`, before any pinning.
    pub fn base_attributes<M: LayoutModel + ?Sized>(
        &mut self,
        model: &M,
        element: Element,
    ) -> Option<LayoutAttributes> {
        if let Some(cached) = self.base.get(&element) {
            return cached.clone();
        }
        let attrs = model.attributes(element);
        if let Some(a) = &attrs {
            if let Some(d) = a.pinned() {
                self.index.insert(d.extended_bounds(a.frame.size()), element);
            }
        }
        self.base.insert(element, attrs.clone());
        attrs
    }

    /// Fetches (and indexes) base attributes for every element in `elements`.
    pub fn register<M: LayoutModel + ?Sized>(
        &mut self,
        model: &M,
        elements: impl IntoIterator<Item = Element>,
    ) {
        for element in elements {
            self.base_attributes(model, element);
        }
    }

    /// Attributes for `element` pinned against the tracked bounds.
    pub fn attributes<M: LayoutModel + ?Sized>(
        &mut self,
        model: &M,
        element: Element,
    ) -> Option<LayoutAttributes> {
        let base = self.base_attributes(model, element)?;
        Some(match self.tracker.current() {
            Some(bounds) => stickify(&base, &bounds),
            None => base,
        })
    }

    /// Known sticky elements whose extended bounds touch `rect`.
    pub fn sticky_elements_in(&self, rect: Rect) -> Vec<Element> {
        self.index.query(rect)
    }

    pub fn begin_transition(&mut self) {
        self.in_transition = true;
    }

    pub fn is_in_transition(&self) -> bool {
        self.in_transition
    }

    pub fn is_transition_frozen(&self) -> bool {
        self.transition_frozen
    }

    /// Ends a transition, releasing a size-mismatch freeze.
    ///
    /// Returns the change applied from bounds parked during the freeze; pass it to
    /// [`Self::invalidated_by`] to find the sticky elements it moved.
    pub fn finish_transition(&mut self) -> Option<BoundsChange> {
        self.in_transition = false;
        if !self.transition_frozen {
            return None;
        }
        self.transition_frozen = false;
        ldebug!("sticky bounds tracking resumed");
        self.tracker.unfreeze()
    }

    fn is_inconsistent(&self, snapshot: &BoundsSnapshot) -> bool {
        let Some(current) = self.tracker.current() else {
            return false;
        };
        let size = snapshot.size();
        size != current.size() && Some(size) != self.viewport_size
    }

    /// Applies a bounds update, returning the change when the tracked bounds moved.
    ///
    /// Returns `None` when the snapshot was parked by a freeze or equals the tracked bounds.
    pub fn apply_bounds(&mut self, snapshot: BoundsSnapshot) -> Option<BoundsChange> {
        if self.in_transition
            && self.freeze_on_size_mismatch
            && !self.transition_frozen
            && self.is_inconsistent(&snapshot)
        {
            lwarn!(
                width = snapshot.size().width,
                height = snapshot.size().height,
                "bounds size changed mid-transition; freezing sticky bounds tracking"
            );
            self.transition_frozen = true;
            self.tracker.freeze();
        }
        self.tracker.update(snapshot)
    }

    /// Applies a bounds update and returns the sticky elements that may have moved.
    pub fn update_bounds(&mut self, snapshot: BoundsSnapshot) -> Vec<Element> {
        match self.apply_bounds(snapshot) {
            Some(change) => self.invalidated_by(&change),
            None => Vec::new(),
        }
    }

    /// Sticky elements whose pinned position may differ between `change.old` and `change.new`.
    pub fn invalidated_by(&self, change: &BoundsChange) -> Vec<Element> {
        let flagged: Vec<Element> = self
            .index
            .query(change.swept())
            .into_iter()
            .filter(|element| {
                let Some(Some(base)) = self.base.get(element) else {
                    return false;
                };
                let Some(descriptor) = base.pinned() else {
                    return false;
                };
                let old_ref = reference_rect(descriptor, &change.old);
                let new_ref = reference_rect(descriptor, &change.new);
                if old_ref == new_ref {
                    return false;
                }
                let extended = descriptor.extended_bounds(base.frame.size());
                may_pin(extended, old_ref, descriptor.edges)
                    || may_pin(extended, new_ref, descriptor.edges)
            })
            .collect();
        ltrace!(
            flagged = flagged.len(),
            "StickyPositioningEngine::invalidated_by"
        );
        flagged
    }
}
