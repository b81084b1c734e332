use alloc::sync::Arc;
use alloc::vec::Vec;

use collection_layout::{
    AnimationKind, BoundsChange, BoundsSnapshot, CompositeIndex, Element, ElementKind,
    GeometryInfo, IndexRemapTable, LayoutAttributes, LayoutModel, MutationOp, RemapError,
    SectionCounts, Transition,
};
use kurbo::{Point, Rect, Size, Vec2};

use crate::{LayoutGeneration, LayoutStateOptions, OffsetStrategy, ResolvedOffset};
use crate::{clamp_content_offset, resolve_content_offset};

/// Elements whose attributes may have changed after a bounds update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoundsInvalidation {
    /// Reported by the model's `elements_affected_by` hook.
    pub elements: Vec<Element>,
    /// Sticky elements whose pinned frame may have moved.
    pub sticky: Vec<Element>,
}

impl BoundsInvalidation {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.sticky.is_empty()
    }

    /// Both lists merged, sorted and deduplicated.
    pub fn all(&self) -> Vec<Element> {
        let mut out: Vec<Element> = self.elements.iter().chain(&self.sticky).copied().collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

/// The effect a pending resize would have, computed without committing it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizePreview {
    /// New content size minus current content size.
    pub content_size_delta: Vec2,
    /// The content offset that keeps the current anchor in place after the resize.
    pub content_offset: Point,
}

/// Owns the Before/After layout generations and drives the transition lifecycle.
///
/// States:
/// - no generation (every query panics)
/// - After only
/// - Before + After, between [`Self::prepare_for_updates`] (or
///   [`Self::prepare_for_invalidation`]) and [`Self::finalize_transition`]
///
/// The host keeps the controller's inputs fresh with [`Self::update_counts`],
/// [`Self::update_geometry`] and [`Self::update_bounds`]; models only ever see explicit snapshots.
pub struct LayoutStateController<M> {
    options: LayoutStateOptions<M>,
    counts: SectionCounts,
    geometry: GeometryInfo,
    bounds: Option<BoundsSnapshot>,
    before: Option<LayoutGeneration<M>>,
    after: Option<LayoutGeneration<M>>,
    memo: Option<LayoutGeneration<M>>,
    remap: Option<IndexRemapTable>,
    // Live bounds captured when the current transition began.
    transition_bounds: Option<BoundsSnapshot>,
    next_id: u64,
}

const NO_GENERATION: &str = "LayoutStateController: no layout generation has been computed yet";

impl<M: LayoutModel> LayoutStateController<M> {
    pub fn new(options: LayoutStateOptions<M>) -> Self {
        Self {
            options,
            counts: SectionCounts::empty(),
            geometry: GeometryInfo::default(),
            bounds: None,
            before: None,
            after: None,
            memo: None,
            remap: None,
            transition_bounds: None,
            next_id: 0,
        }
    }

    pub fn options(&self) -> &LayoutStateOptions<M> {
        &self.options
    }

    /// Replaces the options. Existing generations keep the configuration they were built with.
    pub fn set_options(&mut self, options: LayoutStateOptions<M>) {
        self.options = options;
        self.memo = None;
    }

    pub fn counts(&self) -> &SectionCounts {
        &self.counts
    }

    pub fn geometry(&self) -> &GeometryInfo {
        &self.geometry
    }

    pub fn bounds(&self) -> Option<BoundsSnapshot> {
        self.bounds
    }

    /// Sets the data snapshot used by the next generation. Does not build anything.
    pub fn update_counts(&mut self, counts: impl Into<SectionCounts>) {
        self.counts = counts.into();
    }

    /// Sets the geometry snapshot used by the next generation. Does not build anything.
    pub fn update_geometry(&mut self, geometry: GeometryInfo) {
        self.geometry = geometry;
    }

    pub fn has_generation(&self) -> bool {
        self.after.is_some()
    }

    pub fn is_in_transition(&self) -> bool {
        self.before.is_some()
    }

    pub fn before_generation(&self) -> Option<&LayoutGeneration<M>> {
        self.before.as_ref()
    }

    pub fn after_generation(&self) -> Option<&LayoutGeneration<M>> {
        self.after.as_ref()
    }

    /// The remap table of the in-flight transition, if it was caused by a mutation batch.
    pub fn remap(&self) -> Option<&IndexRemapTable> {
        self.remap.as_ref()
    }

    fn after(&self) -> &LayoutGeneration<M> {
        match &self.after {
            Some(generation) => generation,
            None => panic!("{NO_GENERATION}"),
        }
    }

    // Current generation with its live bounds refreshed.
    fn after_mut(&mut self) -> &mut LayoutGeneration<M> {
        let bounds = self.bounds;
        let Some(generation) = self.after.as_mut() else {
            panic!("{NO_GENERATION}");
        };
        generation.sync_bounds(bounds);
        generation
    }

    fn before_mut(&mut self) -> Option<&mut LayoutGeneration<M>> {
        let bounds = self.transition_bounds.or(self.bounds);
        let generation = self.before.as_mut()?;
        generation.sync_bounds(bounds);
        Some(generation)
    }

    fn build(&mut self, geometry: GeometryInfo) -> LayoutGeneration<M> {
        let id = self.next_id;
        self.next_id += 1;
        let model = self.options.build(&self.counts, &geometry);
        ldebug!(
            id,
            sections = self.counts.section_count(),
            items = self.counts.total_items(),
            width = geometry.viewport_size.width,
            height = geometry.viewport_size.height,
            "built layout generation"
        );
        LayoutGeneration::new(
            id,
            self.counts.clone(),
            geometry,
            model,
            self.options.chunk_size,
            self.options.freeze_on_size_mismatch,
        )
    }

    fn take_memo(&mut self, geometry: &GeometryInfo) -> Option<LayoutGeneration<M>> {
        let mut memo = self.memo.take()?;
        if !memo.matches(&self.counts, geometry) {
            return None;
        }
        ldebug!(id = memo.id(), "layout generation memo hit");
        memo.sticky_mut().invalidate_live_bounds();
        Some(memo)
    }

    /// Moves After into Before and makes a generation for the current inputs the new After.
    ///
    /// A memoized generation for the same inputs is committed instead of building a new one.
    pub fn push_new_generation(&mut self) -> &LayoutGeneration<M> {
        let geometry = self.geometry;
        let next = match self.take_memo(&geometry) {
            Some(generation) => generation,
            None => self.build(geometry),
        };
        self.memo = None;
        if let Some(previous) = self.after.replace(next) {
            let stale = self.before.replace(previous);
            if stale.is_some() {
                lwarn!(
                    id = ?stale.as_ref().map(LayoutGeneration::id),
                    "unfinalized Before generation replaced by a new transition"
                );
            }
        }
        self.after()
    }

    /// Returns a generation for `geometry` (or the current geometry) and the current counts
    /// without committing it.
    ///
    /// Consecutive calls with unchanged inputs return the same generation. A returned memoized
    /// generation re-reads live bounds on its next query.
    pub fn ensure_generation(&mut self, geometry: Option<GeometryInfo>) -> &LayoutGeneration<M> {
        let geometry = geometry.unwrap_or(self.geometry);
        let after_matches = self
            .after
            .as_ref()
            .is_some_and(|after| after.matches(&self.counts, &geometry));
        if after_matches {
            let generation = self.after_mut();
            generation.sticky_mut().invalidate_live_bounds();
            return generation;
        }
        let generation = match self.take_memo(&geometry) {
            Some(generation) => generation,
            None => self.build(geometry),
        };
        &*self.memo.insert(generation)
    }

    /// Drops the Before generation and the transition's remap table.
    pub fn clear_previous(&mut self) {
        self.before = None;
        self.remap = None;
        self.transition_bounds = None;
    }

    fn begin_transition(&mut self) {
        self.transition_bounds = self.bounds;
        for generation in self.before.iter_mut().chain(self.after.iter_mut()) {
            generation.sync_bounds(self.bounds);
            generation.sticky_mut().begin_transition();
        }
        ldebug!(
            before = ?self.before.as_ref().map(LayoutGeneration::id),
            after = ?self.after.as_ref().map(LayoutGeneration::id),
            "transition started"
        );
    }

    /// Starts a transition for a mutation batch that turns the current counts into `counts`.
    ///
    /// # Panics
    ///
    /// Panics if `ops` is inconsistent with the current counts.
    pub fn prepare_for_updates(&mut self, counts: impl Into<SectionCounts>, ops: &[MutationOp]) {
        let table = IndexRemapTable::new(&self.counts, ops);
        self.start_update(counts.into(), table);
    }

    /// Like [`Self::prepare_for_updates`], but reports an inconsistent batch (or, when
    /// `verify_remap_counts` is set, a count mismatch) instead of panicking.
    pub fn try_prepare_for_updates(
        &mut self,
        counts: impl Into<SectionCounts>,
        ops: &[MutationOp],
    ) -> Result<(), RemapError> {
        let counts = counts.into();
        let table = IndexRemapTable::try_new(&self.counts, ops)?;
        if self.options.verify_remap_counts {
            table.verify_after_counts(&counts)?;
        }
        self.start_update(counts, table);
        Ok(())
    }

    fn start_update(&mut self, counts: SectionCounts, table: IndexRemapTable) {
        if self.options.verify_remap_counts {
            if let Err(err) = table.verify_after_counts(&counts) {
                lwarn!(%err, "mutation batch disagrees with the new section counts");
                debug_assert!(false, "mutation batch disagrees with the new section counts: {err}");
            }
        }
        self.counts = counts;
        self.push_new_generation();
        self.remap = Some(table);
        self.begin_transition();
    }

    /// Starts a transition without data changes (e.g. a geometry change); indexes map to
    /// themselves.
    pub fn prepare_for_invalidation(&mut self) {
        self.push_new_generation();
        self.remap = None;
        self.begin_transition();
    }

    /// Ends the transition and drops Before.
    ///
    /// If sticky bounds tracking was frozen by a size mismatch, the parked bounds are applied now
    /// and the returned report covers that change.
    pub fn finalize_transition(&mut self) -> BoundsInvalidation {
        let released = self
            .after
            .as_mut()
            .and_then(|after| after.sticky_mut().finish_transition());
        let invalidation = match (&self.after, released) {
            (Some(after), Some(change)) => invalidation_for(after, &change),
            _ => BoundsInvalidation::default(),
        };
        ldebug!(
            elements = invalidation.elements.len(),
            sticky = invalidation.sticky.len(),
            "transition finalized"
        );
        self.clear_previous();
        invalidation
    }

    /// Applies a live bounds update and reports what it invalidated in the current generation.
    ///
    /// Nothing is reported while the update is parked by a mid-transition freeze; see
    /// [`Self::finalize_transition`].
    pub fn update_bounds(&mut self, snapshot: BoundsSnapshot) -> BoundsInvalidation {
        self.bounds = Some(snapshot);
        if let Some(before) = self.before.as_mut() {
            before.sticky_mut().apply_bounds(snapshot);
        }
        let Some(after) = self.after.as_mut() else {
            return BoundsInvalidation::default();
        };
        let invalidation = match after.sticky_mut().apply_bounds(snapshot) {
            Some(change) => invalidation_for(after, &change),
            None => BoundsInvalidation::default(),
        };
        ltrace!(
            elements = invalidation.elements.len(),
            sticky = invalidation.sticky.len(),
            "LayoutStateController::update_bounds"
        );
        invalidation
    }

    pub fn content_size(&self) -> Size {
        self.after().content_size()
    }

    /// Final attributes of `element` in the current generation.
    pub fn attributes(&mut self, element: Element) -> Option<LayoutAttributes> {
        self.after_mut().attributes(element)
    }

    pub fn attributes_in_rect(&mut self, rect: Rect) -> Vec<LayoutAttributes> {
        self.after_mut().attributes_in_rect(rect)
    }

    /// Final attributes of a before-coordinate `element` in the Before generation.
    pub fn before_attributes(&mut self, element: Element) -> Option<LayoutAttributes> {
        if self.after.is_none() {
            panic!("{NO_GENERATION}");
        }
        self.before_mut()?.attributes(element)
    }

    /// Maps an after-index back to the Before generation. Identity outside a mutation batch.
    pub fn before_index(&self, after: CompositeIndex) -> Option<CompositeIndex> {
        match &self.remap {
            Some(table) => table.before_index(after),
            None => Some(after),
        }
    }

    /// Maps a before-index forward to the current generation. Identity outside a mutation batch.
    pub fn after_index(&self, before: CompositeIndex) -> Option<CompositeIndex> {
        match &self.remap {
            Some(table) => table.after_index(before),
            None => Some(before),
        }
    }

    fn before_element(&self, after: Element) -> Option<Element> {
        self.before.as_ref()?;
        match &self.remap {
            Some(table) if is_reloaded(table, after, false) => None,
            Some(table) => table.before_element(after),
            None => Some(after),
        }
    }

    fn after_element(&self, before: Element) -> Option<Element> {
        match &self.remap {
            Some(table) if is_reloaded(table, before, true) => None,
            Some(table) => table.after_element(before),
            None => Some(before),
        }
    }

    /// Where `element` (after-coordinates) starts its appearing animation.
    ///
    /// Elements that existed before the transition start from their Before attributes; new or
    /// reloaded elements follow the model's [`LayoutModel::transition_animation`].
    pub fn initial_attributes_for_appearing(
        &mut self,
        element: Element,
    ) -> Option<LayoutAttributes> {
        let current = self.attributes(element)?;
        if let Some(source) = self.before_element(element) {
            if let Some(before) = self.before_mut().and_then(|g| g.attributes(source)) {
                return Some(before.with_element(element));
            }
        }
        let model = Arc::clone(self.after().model());
        transition_attributes(&*model, current, Transition::Appearing)
    }

    /// Where `element` (before-coordinates) ends its disappearing animation.
    ///
    /// Elements that survive the transition end at their current attributes; deleted or reloaded
    /// elements follow the Before model's [`LayoutModel::transition_animation`].
    pub fn final_attributes_for_disappearing(
        &mut self,
        element: Element,
    ) -> Option<LayoutAttributes> {
        if self.before.is_none() {
            // Outside a transition the element simply stays where it is.
            return self.attributes(element);
        }
        let before = self.before_attributes(element)?;
        if let Some(target) = self.after_element(element) {
            if let Some(after) = self.attributes(target) {
                return Some(after.with_element(element));
            }
        }
        let model = match &self.before {
            Some(generation) => Arc::clone(generation.model()),
            None => Arc::clone(self.after().model()),
        };
        transition_attributes(&*model, before, Transition::Disappearing)
    }

    /// The content offset that keeps the visible content anchored once the transition settles.
    ///
    /// `proposed` is the offset the host would otherwise use.
    pub fn target_content_offset_after_transition(&mut self, proposed: Point) -> ResolvedOffset {
        let after = self.after();
        let geometry = *after.geometry();
        let content = after.content_size();
        let insets = self
            .bounds
            .map(|b| b.content_insets)
            .unwrap_or(kurbo::Insets::ZERO);
        let (Some(before), Some(old)) = (&self.before, self.transition_bounds.or(self.bounds)) else {
            return ResolvedOffset {
                offset: clamp_content_offset(proposed, content, geometry.viewport_size, insets),
                strategy: OffsetStrategy::Clamped,
            };
        };
        let proposed_bounds = BoundsSnapshot {
            bounds: Rect::from_origin_size(proposed, geometry.viewport_size),
            safe_area: geometry.safe_area,
            content_insets: insets,
        };
        resolve_content_offset(
            &**before.model(),
            &**after.model(),
            self.remap.as_ref(),
            &old,
            &proposed_bounds,
            self.options.preserve_anchor,
        )
    }

    /// Lets the model snap a resting offset for a deceleration with `velocity`.
    pub fn target_content_offset(&self, proposed: Point, velocity: Vec2) -> Point {
        let after = self.after();
        let rect = Rect::from_origin_size(proposed, after.geometry().viewport_size);
        after
            .model()
            .target_offset(rect, velocity)
            .unwrap_or(proposed)
    }

    /// Computes the content size change and anchored offset a resize to `geometry` would cause.
    ///
    /// The resulting generation is memoized, so committing the resize afterwards is cheap.
    pub fn preview_resize(&mut self, geometry: GeometryInfo) -> ResizePreview {
        let current = Arc::clone(self.after().model());
        let old_size = current.content_size();
        let bounds = self.bounds;
        let preview = Arc::clone(self.ensure_generation(Some(geometry)).model());
        let new_size = preview.content_size();
        let content_size_delta = new_size.to_vec2() - old_size.to_vec2();

        let content_offset = match bounds {
            Some(old) => {
                let proposed = BoundsSnapshot {
                    bounds: Rect::from_origin_size(old.bounds.origin(), geometry.viewport_size),
                    safe_area: geometry.safe_area,
                    content_insets: old.content_insets,
                };
                resolve_content_offset(
                    &*current,
                    &*preview,
                    None,
                    &old,
                    &proposed,
                    self.options.preserve_anchor,
                )
                .offset
            }
            None => clamp_content_offset(
                Point::ZERO,
                new_size,
                geometry.viewport_size,
                kurbo::Insets::ZERO,
            ),
        };
        ldebug!(
            dw = content_size_delta.x,
            dh = content_size_delta.y,
            "resize preview"
        );
        ResizePreview {
            content_size_delta,
            content_offset,
        }
    }
}

// Both the model and the sticky engine read the same `change`, never the live bounds.
fn invalidation_for<M: LayoutModel>(
    generation: &LayoutGeneration<M>,
    change: &BoundsChange,
) -> BoundsInvalidation {
    BoundsInvalidation {
        elements: generation.model().elements_affected_by(change),
        sticky: generation.sticky().invalidated_by(change),
    }
}

fn is_reloaded(table: &IndexRemapTable, element: Element, before: bool) -> bool {
    let section = element.index.section;
    match (element.kind, before) {
        (ElementKind::Item, true) => table.is_reloaded_before(element.index),
        (ElementKind::Item, false) => table.is_reloaded_after(element.index),
        (_, true) => table.is_section_reloaded_before(section),
        (_, false) => table.is_section_reloaded_after(section),
    }
}

fn transition_attributes<M: LayoutModel + ?Sized>(
    model: &M,
    current: LayoutAttributes,
    transition: Transition,
) -> Option<LayoutAttributes> {
    match model.transition_animation(current.element, transition) {
        AnimationKind::None => Some(current),
        AnimationKind::Fade => Some(current.with_alpha(0.0)),
        AnimationKind::Custom => model.attributes_for_transition(current.element, transition),
    }
}

impl<M> core::fmt::Debug for LayoutStateController<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayoutStateController")
            .field("options", &self.options)
            .field("counts", &self.counts)
            .field("geometry", &self.geometry)
            .field("bounds", &self.bounds)
            .field("before", &self.before)
            .field("after", &self.after)
            .field("memo", &self.memo)
            .field("remap", &self.remap)
            .finish_non_exhaustive()
    }
}
