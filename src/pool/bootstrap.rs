//! Shared transcoder bootstrap
//!
//! The codec runtime is loaded once and shared by every pool through an
//! `Arc`; it is released when the last loader and pool holding it drop.
//! The handle also counts active loaders, since each active loader spins
//! up its own units and pays the codec start-up cost again.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::transcode::TranscoderModule;

pub struct TranscoderBootstrap {
    module: Arc<dyn TranscoderModule>,
    active_loaders: AtomicUsize,
}

impl TranscoderBootstrap {
    pub fn new<M: TranscoderModule>(module: M) -> Arc<Self> {
        Self::from_module(Arc::new(module))
    }

    pub fn from_module(module: Arc<dyn TranscoderModule>) -> Arc<Self> {
        Arc::new(Self {
            module,
            active_loaders: AtomicUsize::new(0),
        })
    }

    pub fn module(&self) -> Arc<dyn TranscoderModule> {
        self.module.clone()
    }

    /// Loaders that have initialized a pool and not been disposed
    pub fn active_loaders(&self) -> usize {
        self.active_loaders.load(Ordering::SeqCst)
    }

    /// Register an active loader; returns how many were already active
    pub(crate) fn acquire(&self) -> usize {
        self.active_loaders.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn release(&self) {
        let _ = self
            .active_loaders
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}

impl fmt::Debug for TranscoderBootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscoderBootstrap")
            .field("active_loaders", &self.active_loaders())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeModule;

    #[test]
    fn test_active_loader_count() {
        let bootstrap = TranscoderBootstrap::new(FakeModule::default());
        assert_eq!(bootstrap.acquire(), 0);
        assert_eq!(bootstrap.acquire(), 1);
        assert_eq!(bootstrap.active_loaders(), 2);

        bootstrap.release();
        bootstrap.release();
        bootstrap.release();
        assert_eq!(bootstrap.active_loaders(), 0);
    }

    #[test]
    fn test_module_released_with_last_handle() {
        let module: Arc<dyn TranscoderModule> = Arc::new(FakeModule::default());
        let weak = Arc::downgrade(&module);

        let bootstrap = TranscoderBootstrap::from_module(module);
        let held_by_pool = bootstrap.module();
        drop(bootstrap);
        assert!(weak.upgrade().is_some());

        drop(held_by_pool);
        assert!(weak.upgrade().is_none());
    }
}
