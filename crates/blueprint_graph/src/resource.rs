// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lock-guarded native resources owned by nodes.

use parking_lot::{Mutex, MutexGuard};
use std::fmt;

/// A lazily created resource bound to a key, usually a device.
///
/// The resource is built on first use, rebuilt when the key changes, and
/// dropped with the slot. Holding the guard returned by [`ResourceSlot::lock`]
/// serializes every use of the resource; nodes also hold it while they
/// publish outputs, so `on_stop` taking the same lock never races a compute.
pub struct ResourceSlot<K, R> {
    inner: Mutex<Option<(K, R)>>,
}

impl<K, R> ResourceSlot<K, R> {
    /// Create an empty slot
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Acquire the slot
    pub fn lock(&self) -> ResourceGuard<'_, K, R> {
        ResourceGuard {
            guard: self.inner.lock(),
        }
    }

    /// Drop the resource now
    pub fn release(&self) {
        self.inner.lock().take();
    }

    /// Whether a resource is currently held
    pub fn is_loaded(&self) -> bool {
        self.inner.lock().is_some()
    }
}

impl<K, R> Default for ResourceSlot<K, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, R> fmt::Debug for ResourceSlot<K, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = self.inner.try_lock().map(|g| format!("{:?}", g.as_ref().map(|(k, _)| k)));
        f.debug_struct("ResourceSlot")
            .field("key", &key.as_deref().unwrap_or("<locked>"))
            .finish_non_exhaustive()
    }
}

/// Exclusive access to a [`ResourceSlot`]
pub struct ResourceGuard<'a, K, R> {
    guard: MutexGuard<'a, Option<(K, R)>>,
}

impl<K: PartialEq + Clone + fmt::Debug, R> ResourceGuard<'_, K, R> {
    /// Get the resource for `key`, creating it if the slot is empty or bound
    /// to another key
    pub fn get_or_create<E>(
        &mut self,
        key: &K,
        create: impl FnOnce(&K) -> Result<R, E>,
    ) -> Result<&mut R, E> {
        let entry = match self.guard.take() {
            Some(entry) if entry.0 == *key => entry,
            stale => {
                if let Some((old, _)) = &stale {
                    tracing::debug!("Releasing resource bound to {:?}", old);
                }
                drop(stale);
                let resource = create(key)?;
                tracing::debug!("Created resource for {:?}", key);
                (key.clone(), resource)
            }
        };
        let (_, resource) = self.guard.insert(entry);
        Ok(resource)
    }
}

impl<K, R> ResourceGuard<'_, K, R> {
    /// Key of the held resource
    pub fn key(&self) -> Option<&K> {
        self.guard.as_ref().map(|(k, _)| k)
    }

    /// The held resource, if any
    pub fn get(&mut self) -> Option<&mut R> {
        self.guard.as_mut().map(|(_, r)| r)
    }
}
