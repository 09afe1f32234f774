//! Overlay sets.

use std::sync::Arc;

use crate::frame::FrameBuffer;

/// Ordered overlay images drawn on top of every frame.
///
/// Later entries are drawn over earlier ones. The set is immutable and
/// cheap to clone: clones share the same images, so handing a set to a
/// running export never copies pixels and can never change mid-job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySet {
    layers: Arc<[Arc<FrameBuffer>]>,
}

impl Default for OverlaySet {
    fn default() -> Self {
        Self {
            layers: Arc::from(Vec::new()),
        }
    }
}

impl OverlaySet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(layers: impl IntoIterator<Item = Arc<FrameBuffer>>) -> Self {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Layers in drawing order.
    pub fn iter(&self) -> impl Iterator<Item = &FrameBuffer> {
        self.layers.iter().map(|layer| layer.as_ref())
    }

    /// Whether both sets share the same underlying storage.
    pub fn ptr_eq(&self, other: &OverlaySet) -> bool {
        Arc::ptr_eq(&self.layers, &other.layers)
    }
}

impl FromIterator<FrameBuffer> for OverlaySet {
    fn from_iter<I: IntoIterator<Item = FrameBuffer>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Arc::new))
    }
}
