use alloc::sync::Arc;
use alloc::vec::Vec;

use collection_layout::{
    BoundsSnapshot, Element, GeometryInfo, LayoutAttributes, LayoutModel, SectionCounts,
    StickyPositioningEngine, touches,
};
use kurbo::{Rect, Size};

/// One snapshot of computed layout: the model built for a `(SectionCounts, GeometryInfo)` pair
/// plus the sticky engine serving it.
///
/// A generation's inputs never change; when either input does, the controller builds a new
/// generation instead. Only the sticky engine's caches and live bounds evolve.
pub struct LayoutGeneration<M> {
    id: u64,
    counts: SectionCounts,
    geometry: GeometryInfo,
    model: Arc<M>,
    sticky: StickyPositioningEngine,
}

impl<M: LayoutModel> LayoutGeneration<M> {
    pub(crate) fn new(
        id: u64,
        counts: SectionCounts,
        geometry: GeometryInfo,
        model: M,
        chunk_size: Option<Size>,
        freeze_on_size_mismatch: bool,
    ) -> Self {
        let chunk = chunk_size.unwrap_or(geometry.viewport_size);
        let sticky = StickyPositioningEngine::new(chunk)
            .with_viewport_size(geometry.viewport_size)
            .with_freeze_on_size_mismatch(freeze_on_size_mismatch);
        Self {
            id,
            counts,
            geometry,
            model: Arc::new(model),
            sticky,
        }
    }

    /// Monotonic id assigned by the controller that built this generation.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn counts(&self) -> &SectionCounts {
        &self.counts
    }

    pub fn geometry(&self) -> &GeometryInfo {
        &self.geometry
    }

    pub fn model(&self) -> &Arc<M> {
        &self.model
    }

    pub fn sticky(&self) -> &StickyPositioningEngine {
        &self.sticky
    }

    pub(crate) fn sticky_mut(&mut self) -> &mut StickyPositioningEngine {
        &mut self.sticky
    }

    /// Whether this generation was built from exactly these inputs.
    pub fn matches(&self, counts: &SectionCounts, geometry: &GeometryInfo) -> bool {
        self.geometry == *geometry && self.counts == *counts
    }

    /// Feeds `bounds` to the sticky engine if its cached live bounds are stale.
    pub(crate) fn sync_bounds(&mut self, bounds: Option<BoundsSnapshot>) {
        if let Some(bounds) = bounds {
            if self.sticky.needs_bounds() {
                self.sticky.update_bounds(bounds);
            }
        }
    }

    pub fn content_size(&self) -> Size {
        self.model.content_size()
    }

    /// Final attributes for `element`, pinned against the engine's live bounds.
    pub fn attributes(&mut self, element: Element) -> Option<LayoutAttributes> {
        self.sticky.attributes(&*self.model, element)
    }

    /// Attributes of every element whose final frame intersects `rect`, ordered by element.
    pub fn attributes_in_rect(&mut self, rect: Rect) -> Vec<LayoutAttributes> {
        let model = &*self.model;
        let mut elements = model.elements_intersecting(rect);
        self.sticky.register(model, elements.iter().copied());
        elements.extend(self.sticky.sticky_elements_in(rect));
        elements.sort_unstable();
        elements.dedup();

        elements
            .into_iter()
            .filter_map(|element| self.sticky.attributes(model, element))
            .filter(|attrs| touches(attrs.frame, rect))
            .collect()
    }
}

impl<M> core::fmt::Debug for LayoutGeneration<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayoutGeneration")
            .field("id", &self.id)
            .field("counts", &self.counts)
            .field("geometry", &self.geometry)
            .field("sticky", &self.sticky)
            .finish_non_exhaustive()
    }
}
