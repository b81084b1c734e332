use kurbo::{Rect, Size, Vec2};

/// Edge-inclusive overlap test; zero-area rects still hit whatever they touch.
///
/// Every rect query in this crate (spatial index, header ranges) uses this test.
pub fn touches(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

#[cfg(test)]
pub(crate) fn contains_rect(outer: Rect, inner: Rect) -> bool {
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && inner.x1 <= outer.x1 && inner.y1 <= outer.y1
}

/// Area of `a ∩ b`, zero when they do not overlap.
pub(crate) fn overlap_area(a: Rect, b: Rect) -> f64 {
    let w = a.x1.min(b.x1) - a.x0.max(b.x0);
    let h = a.y1.min(b.y1) - a.y0.max(b.y0);
    if w <= 0.0 || h <= 0.0 { 0.0 } else { w * h }
}

/// Translates `frame` by the smallest amount that places it inside `limit` on both axes.
///
/// If `frame` is larger than `limit` on an axis, the leading edges are aligned.
pub(crate) fn shift_inside(frame: Rect, limit: Rect) -> Rect {
    let mut delta = Vec2::ZERO;
    if frame.x1 > limit.x1 {
        delta.x = limit.x1 - frame.x1;
    }
    if frame.x0 + delta.x < limit.x0 {
        delta.x = limit.x0 - frame.x0;
    }
    if frame.y1 > limit.y1 {
        delta.y = limit.y1 - frame.y1;
    }
    if frame.y0 + delta.y < limit.y0 {
        delta.y = limit.y0 - frame.y0;
    }
    frame + delta
}

pub(crate) fn fits(size: Size, limit: Rect) -> bool {
    size.width <= limit.width() && size.height <= limit.height()
}
