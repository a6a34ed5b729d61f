//! Conversion task cache
//!
//! Maps a source buffer's identity to the shared outcome of its conversion so
//! a buffer is never converted twice while it is alive. Entries hold only a
//! weak reference to the buffer and are pruned once it is dropped.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::LoadError;
use crate::source::{SourceBuffer, WeakSource};
use crate::texture::TextureDescription;

/// Final result of a load, shared by every caller of the same buffer
pub type Outcome = Result<Arc<TextureDescription>, LoadError>;

/// Handle to a pending or completed outcome; clone to attach another caller
pub type SharedOutcome = Shared<BoxFuture<'static, Outcome>>;

struct CacheEntry {
    source: WeakSource,
    outcome: SharedOutcome,
}

/// Buffer-identity keyed cache of conversion outcomes
#[derive(Default)]
pub struct TaskCache {
    entries: Mutex<HashMap<usize, CacheEntry>>,
}

impl TaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the outcome for `buffer`, creating it with `factory` if needed
    ///
    /// `factory` runs at most once per live buffer, under the cache lock, so
    /// it must only build the future and not drive it.
    pub fn get_or_create<F>(&self, buffer: &SourceBuffer, factory: F) -> SharedOutcome
    where
        F: FnOnce() -> BoxFuture<'static, Outcome>,
    {
        let mut entries = self.entries.lock().expect("task cache lock poisoned");
        entries.retain(|_, entry| entry.source.is_alive());

        let id = buffer.id();
        if let Some(entry) = entries.get(&id) {
            debug!("Attaching to existing conversion task for buffer {:#x}", id);
            return entry.outcome.clone();
        }

        let outcome = factory().shared();
        entries.insert(
            id,
            CacheEntry {
                source: buffer.downgrade(),
                outcome: outcome.clone(),
            },
        );
        outcome
    }

    pub fn contains(&self, buffer: &SourceBuffer) -> bool {
        let entries = self.entries.lock().expect("task cache lock poisoned");
        entries
            .get(&buffer.id())
            .is_some_and(|entry| entry.source.is_alive())
    }

    /// Forget the outcome for `buffer`; the next load converts it again
    pub fn remove(&self, buffer: &SourceBuffer) -> bool {
        let mut entries = self.entries.lock().expect("task cache lock poisoned");
        entries.remove(&buffer.id()).is_some()
    }

    /// Drop entries whose buffer is gone; returns how many were removed
    pub fn purge(&self) -> usize {
        let mut entries = self.entries.lock().expect("task cache lock poisoned");
        let before = entries.len();
        entries.retain(|_, entry| entry.source.is_alive());
        before - entries.len()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().expect("task cache lock poisoned");
        entries.values().filter(|e| e.source.is_alive()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
