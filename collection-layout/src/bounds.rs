use crate::{BoundsChange, BoundsSnapshot};

/// Holds the live scroll-bounds snapshot with validity and freeze tracking.
///
/// While frozen, updates are parked and applied when the outermost freeze ends, so every read
/// inside one invalidation pass observes the same value.
#[derive(Clone, Debug, Default)]
pub struct BoundsTracker {
    current: Option<BoundsSnapshot>,
    valid: bool,
    freeze_depth: usize,
    pending: Option<BoundsSnapshot>,
}

impl BoundsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: BoundsSnapshot) -> Self {
        Self {
            current: Some(snapshot),
            valid: true,
            freeze_depth: 0,
            pending: None,
        }
    }

    /// The last applied snapshot, stale or not.
    pub fn current(&self) -> Option<BoundsSnapshot> {
        self.current
    }

    /// The last applied snapshot, only while it is known to be fresh.
    pub fn fresh(&self) -> Option<BoundsSnapshot> {
        if self.valid { self.current } else { None }
    }

    pub fn is_valid(&self) -> bool {
        self.valid && self.current.is_some()
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze_depth > 0
    }

    /// Marks the cached snapshot stale; the next [`Self::update`] refreshes it.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Applies a snapshot, returning the change when a different snapshot was replaced.
    ///
    /// While frozen the snapshot is parked and `None` is returned.
    pub fn update(&mut self, snapshot: BoundsSnapshot) -> Option<BoundsChange> {
        if self.is_frozen() {
            ltrace!(depth = self.freeze_depth, "BoundsTracker::update deferred");
            self.pending = Some(snapshot);
            return None;
        }
        self.apply(snapshot)
    }

    fn apply(&mut self, snapshot: BoundsSnapshot) -> Option<BoundsChange> {
        self.valid = true;
        let old = self.current.replace(snapshot)?;
        if old == snapshot {
            return None;
        }
        Some(BoundsChange { old, new: snapshot })
    }

    pub fn freeze(&mut self) {
        self.freeze_depth = self.freeze_depth.saturating_add(1);
    }

    /// Ends one freeze; when the last one ends, a parked snapshot is applied.
    pub fn unfreeze(&mut self) -> Option<BoundsChange> {
        debug_assert!(self.freeze_depth > 0, "BoundsTracker: freeze_depth underflow");
        self.freeze_depth = self.freeze_depth.saturating_sub(1);
        if self.freeze_depth > 0 {
            return None;
        }
        let pending = self.pending.take()?;
        self.apply(pending)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}
