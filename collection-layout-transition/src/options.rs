use alloc::sync::Arc;

use collection_layout::{GeometryInfo, SectionCounts};
use kurbo::Size;

/// Builds a layout model from explicit data and geometry snapshots.
pub type BuildModel<M> = Arc<dyn Fn(&SectionCounts, &GeometryInfo) -> M + Send + Sync>;

/// Configuration for [`crate::LayoutStateController`].
///
/// Cheap to clone: the model builder is stored in an `Arc`.
pub struct LayoutStateOptions<M> {
    /// Called whenever a new generation is needed. Model construction is assumed to be expensive;
    /// the controller memoizes generations by `(GeometryInfo, SectionCounts)`.
    pub build_model: BuildModel<M>,

    /// Bucket extent of each generation's sticky spatial index.
    ///
    /// Defaults to the generation's viewport size.
    pub chunk_size: Option<Size>,

    /// Keep the element nearest the viewport center in place across transitions.
    ///
    /// When disabled, offsets are always resolved proportionally.
    pub preserve_anchor: bool,

    /// Freeze sticky bounds tracking when the bounds size changes mid-transition for reasons the
    /// new generation does not explain.
    pub freeze_on_size_mismatch: bool,

    /// Cross-check the counts derived from a mutation batch against the new section counts.
    pub verify_remap_counts: bool,
}

impl<M> Clone for LayoutStateOptions<M> {
    fn clone(&self) -> Self {
        Self {
            build_model: Arc::clone(&self.build_model),
            chunk_size: self.chunk_size,
            preserve_anchor: self.preserve_anchor,
            freeze_on_size_mismatch: self.freeze_on_size_mismatch,
            verify_remap_counts: self.verify_remap_counts,
        }
    }
}

impl<M> LayoutStateOptions<M> {
    pub fn new(
        build_model: impl Fn(&SectionCounts, &GeometryInfo) -> M + Send + Sync + 'static,
    ) -> Self {
        Self {
            build_model: Arc::new(build_model),
            chunk_size: None,
            preserve_anchor: true,
            freeze_on_size_mismatch: true,
            verify_remap_counts: cfg!(debug_assertions),
        }
    }

    pub fn with_build_model(
        mut self,
        build_model: impl Fn(&SectionCounts, &GeometryInfo) -> M + Send + Sync + 'static,
    ) -> Self {
        self.build_model = Arc::new(build_model);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: Option<Size>) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_preserve_anchor(mut self, preserve_anchor: bool) -> Self {
        self.preserve_anchor = preserve_anchor;
        self
    }

    pub fn with_freeze_on_size_mismatch(mut self, freeze: bool) -> Self {
        self.freeze_on_size_mismatch = freeze;
        self
    }

    pub fn with_verify_remap_counts(mut self, verify: bool) -> Self {
        self.verify_remap_counts = verify;
        self
    }

    pub(crate) fn build(&self, counts: &SectionCounts, geometry: &GeometryInfo) -> M {
        (self.build_model)(counts, geometry)
    }
}

impl<M> core::fmt::Debug for LayoutStateOptions<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayoutStateOptions")
            .field("chunk_size", &self.chunk_size)
            .field("preserve_anchor", &self.preserve_anchor)
            .field("freeze_on_size_mismatch", &self.freeze_on_size_mismatch)
            .field("verify_remap_counts", &self.verify_remap_counts)
            .finish_non_exhaustive()
    }
}
