use kurbo::{Insets, Rect, Size};

/// Inputs that determine layout geometry independently of the data.
///
/// A generation is reused only while both its `GeometryInfo` and its section counts compare equal.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeometryInfo {
    pub viewport_size: Size,
    pub safe_area: Insets,
}

impl GeometryInfo {
    pub fn new(viewport_size: Size, safe_area: Insets) -> Self {
        Self {
            viewport_size,
            safe_area,
        }
    }

    pub fn with_viewport_size(mut self, viewport_size: Size) -> Self {
        self.viewport_size = viewport_size;
        self
    }
}

/// A snapshot of the live scroll position as reported by the host.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundsSnapshot {
    /// The visible rectangle in content coordinates (origin = content offset).
    pub bounds: Rect,
    pub safe_area: Insets,
    pub content_insets: Insets,
}

impl BoundsSnapshot {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            safe_area: Insets::ZERO,
            content_insets: Insets::ZERO,
        }
    }

    pub fn with_safe_area(mut self, safe_area: Insets) -> Self {
        self.safe_area = safe_area;
        self
    }

    pub fn with_content_insets(mut self, content_insets: Insets) -> Self {
        self.content_insets = content_insets;
        self
    }

    /// The scroll bounds shrunk by the safe-area insets.
    pub fn safe_bounds(&self) -> Rect {
        self.bounds - self.safe_area
    }

    pub fn size(&self) -> Size {
        self.bounds.size()
    }

    /// Returns a copy scrolled so that `bounds.origin()` equals `origin`.
    pub fn with_origin(mut self, origin: kurbo::Point) -> Self {
        self.bounds = self.bounds.with_origin(origin);
        self
    }
}

/// A pair of consecutive bounds snapshots.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundsChange {
    pub old: BoundsSnapshot,
    pub new: BoundsSnapshot,
}

impl BoundsChange {
    pub fn is_resize(&self) -> bool {
        self.old.size() != self.new.size()
    }

    /// Union of the old and new scroll bounds.
    pub fn swept(&self) -> Rect {
        self.old.bounds.union(self.new.bounds)
    }
}
