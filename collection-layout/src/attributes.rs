use kurbo::{Affine, Insets, Rect, Size, Vec2};

use crate::Element;

bitflags::bitflags! {
    /// The edges of the reference rectangle a sticky element pins to.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct StickyEdges: u8 {
        const TOP = 1 << 0;
        const BOTTOM = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StickyBehavior {
    /// The element is pushed along by the edge of its travel bounds.
    #[default]
    Push,
    /// The element may slide out of its travel bounds, fading by the fraction that is outside.
    Fade,
    /// Geometrically identical to `Push`; the consuming layer hides the element instead of
    /// shrinking or fading it.
    Disappear,
}

/// Describes how a supplementary element stays pinned while scrolling.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StickyDescriptor {
    pub edges: StickyEdges,
    /// Absolute bounds the element's frame never leaves (for `Fade`, the element may extend past
    /// them by its own size while fading out).
    pub travel_bounds: Rect,
    pub behavior: StickyBehavior,
    /// Extra insets applied to the reference rectangle before pinning.
    pub insets: Insets,
    /// Pin against the safe-area bounds instead of the full scroll bounds.
    pub use_safe_area: bool,
}

impl StickyDescriptor {
    pub fn new(edges: StickyEdges, travel_bounds: Rect) -> Self {
        Self {
            edges,
            travel_bounds,
            behavior: StickyBehavior::Push,
            insets: Insets::ZERO,
            use_safe_area: false,
        }
    }

    pub fn with_behavior(mut self, behavior: StickyBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_insets(mut self, insets: Insets) -> Self {
        self.insets = insets;
        self
    }

    pub fn with_safe_area(mut self, use_safe_area: bool) -> Self {
        self.use_safe_area = use_safe_area;
        self
    }

    pub fn is_pinned(&self) -> bool {
        !self.edges.is_empty()
    }

    /// The largest area an element of `size` can ever occupy under this descriptor.
    pub fn extended_bounds(&self, size: Size) -> Rect {
        match self.behavior {
            StickyBehavior::Push | StickyBehavior::Disappear => self.travel_bounds,
            StickyBehavior::Fade => self.travel_bounds.inflate(size.width, size.height),
        }
    }
}

/// Computed layout for a single element.
///
/// A plain value: the `with_*` helpers return modified copies.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutAttributes {
    pub element: Element,
    pub frame: Rect,
    pub alpha: f64,
    pub hidden: bool,
    pub z_index: i32,
    pub transform: Affine,
    pub sticky: Option<StickyDescriptor>,
}

impl LayoutAttributes {
    pub fn new(element: Element, frame: Rect) -> Self {
        Self {
            element,
            frame,
            alpha: 1.0,
            hidden: false,
            z_index: 0,
            transform: Affine::IDENTITY,
            sticky: None,
        }
    }

    #[must_use]
    pub fn with_element(&self, element: Element) -> Self {
        Self {
            element,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_frame(&self, frame: Rect) -> Self {
        Self {
            frame,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_alpha(&self, alpha: f64) -> Self {
        Self {
            alpha,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_hidden(&self, hidden: bool) -> Self {
        Self {
            hidden,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_z_index(&self, z_index: i32) -> Self {
        Self {
            z_index,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_transform(&self, transform: Affine) -> Self {
        Self {
            transform,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_sticky(&self, sticky: Option<StickyDescriptor>) -> Self {
        Self {
            sticky,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn translated(&self, delta: Vec2) -> Self {
        self.with_frame(self.frame + delta)
    }

    /// The sticky descriptor, if it pins at least one edge.
    pub fn pinned(&self) -> Option<&StickyDescriptor> {
        self.sticky.as_ref().filter(|d| d.is_pinned())
    }
}
