use alloc::vec::Vec;

use kurbo::{Point, Rect, Size, Vec2};

use crate::{BoundsChange, CompositeIndex, Element, ElementKind, LayoutAttributes};

/// Identifies the element used to keep visual scroll position across a transition.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollAnchor {
    pub index: CompositeIndex,
    /// The anchor's frame origin relative to the visible rectangle's origin.
    pub offset_in_viewport: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Transition {
    Appearing,
    Disappearing,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnimationKind {
    /// Appear/disappear in place.
    None,
    /// Animate alpha from/to zero.
    #[default]
    Fade,
    /// Use [`LayoutModel::attributes_for_transition`].
    Custom,
}

/// The capability contract a concrete layout implements.
///
/// Models are built from explicit `(SectionCounts, GeometryInfo)` snapshots and never reach back
/// into the engine. Methods with bodies are optional hooks.
pub trait LayoutModel {
    fn content_size(&self) -> Size;

    /// Every element whose frame intersects `rect`.
    ///
    /// Sticky elements should also be reported when their travel bounds intersect `rect`, since
    /// their pinned frame may land there.
    fn elements_intersecting(&self, rect: Rect) -> Vec<Element>;

    fn attributes(&self, element: Element) -> Option<LayoutAttributes>;

    /// Attributes at the start (`Appearing`) or end (`Disappearing`) of a custom transition.
    fn attributes_for_transition(
        &self,
        element: Element,
        transition: Transition,
    ) -> Option<LayoutAttributes> {
        let _ = transition;
        self.attributes(element)
    }

    /// The item to anchor scroll position on for the visible rectangle `rect`.
    fn anchor(&self, rect: Rect) -> Option<CompositeIndex> {
        nearest_item_to_center(self, rect).map(|(index, _)| index)
    }

    /// The content offset that keeps `anchor` at the same place in the viewport.
    ///
    /// `proposed` is the visible rectangle the host would otherwise settle on; `current` the one
    /// captured before the transition.
    fn offset_for_anchor(&self, anchor: &ScrollAnchor, proposed: Rect, current: Rect)
    -> Option<Point>;

    /// Snaps a proposed resting offset given the scroll velocity. `None` keeps the proposal.
    fn target_offset(&self, proposed: Rect, velocity: Vec2) -> Option<Point> {
        let _ = (proposed, velocity);
        None
    }

    fn transition_animation(&self, element: Element, transition: Transition) -> AnimationKind {
        let _ = (element, transition);
        AnimationKind::Fade
    }

    /// Elements whose attributes depend on the scroll position (beyond sticky elements, which the
    /// engine tracks itself).
    fn elements_affected_by(&self, change: &BoundsChange) -> Vec<Element>;
}

/// The item whose frame center is closest to the center of `rect`, with that frame.
///
/// Ties go to the lower index.
pub fn nearest_item_to_center<M: LayoutModel + ?Sized>(
    model: &M,
    rect: Rect,
) -> Option<(CompositeIndex, Rect)> {
    let center = rect.center();
    let mut best: Option<(f64, CompositeIndex, Rect)> = None;
    for element in model.elements_intersecting(rect) {
        if element.kind != ElementKind::Item {
            continue;
        }
        let Some(attrs) = model.attributes(element) else {
            continue;
        };
        let distance = (attrs.frame.center() - center).hypot2();
        let closer = match best {
            None => true,
            Some((d, index, _)) => distance < d || (distance == d && element.index < index),
        };
        if closer {
            best = Some((distance, element.index, attrs.frame));
        }
    }
    best.map(|(_, index, frame)| (index, frame))
}

/// Captures an anchor for the visible rectangle `rect` using the model's `anchor` hook.
pub fn capture_anchor<M: LayoutModel + ?Sized>(model: &M, rect: Rect) -> Option<ScrollAnchor> {
    let index = model.anchor(rect)?;
    let frame = model.attributes(Element::new(ElementKind::Item, index))?.frame;
    Some(ScrollAnchor {
        index,
        offset_in_viewport: frame.origin() - rect.origin(),
    })
}

/// The offset that puts `anchor` back at its captured position, using the model's current frame
/// for the anchored item. Suitable as a body for [`LayoutModel::offset_for_anchor`].
pub fn offset_for_anchor_frame<M: LayoutModel + ?Sized>(
    model: &M,
    anchor: &ScrollAnchor,
) -> Option<Point> {
    let frame = model
        .attributes(Element::new(ElementKind::Item, anchor.index))?
        .frame;
    Some(frame.origin() - anchor.offset_in_viewport)
}
