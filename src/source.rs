//! Input buffers
//!
//! A [`SourceBuffer`] is the unit of deduplication: two handles are the same
//! source when they share an allocation, regardless of content.

use std::sync::{Arc, Weak};

/// Shared, immutable KTX2 file bytes
#[derive(Debug, Clone)]
pub struct SourceBuffer(Arc<Vec<u8>>);

impl SourceBuffer {
    pub fn new(data: Vec<u8>) -> Self {
        Self(Arc::new(data))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Identity of the underlying allocation
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Non-owning handle; the bytes are freed once every `SourceBuffer` is dropped
    pub(crate) fn downgrade(&self) -> WeakSource {
        WeakSource(Arc::downgrade(&self.0))
    }

    /// True when both handles refer to the same allocation
    pub fn same_source(&self, other: &SourceBuffer) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Vec<u8>> for SourceBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl AsRef<[u8]> for SourceBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// Weak counterpart of [`SourceBuffer`]
///
/// Keeps only the `Arc` control block alive, never the byte vector.
#[derive(Debug, Clone)]
pub(crate) struct WeakSource(Weak<Vec<u8>>);

impl WeakSource {
    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_allocation_not_content() {
        let a = SourceBuffer::new(vec![1, 2, 3]);
        let b = SourceBuffer::new(vec![1, 2, 3]);
        let a2 = a.clone();

        assert!(a.same_source(&a2));
        assert_eq!(a.id(), a2.id());
        assert!(!a.same_source(&b));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_weak_handle_does_not_keep_source_alive() {
        let buffer = SourceBuffer::from(vec![0u8; 1024]);
        let weak = buffer.downgrade();
        assert!(weak.is_alive());

        drop(buffer);
        assert!(!weak.is_alive());
    }
}
