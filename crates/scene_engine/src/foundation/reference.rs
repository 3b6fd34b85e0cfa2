//! Non-owning references that report expiry instead of dangling.
//!
//! Arena-owned scene entities are referenced through generation-checked
//! handles (see `scene::ObjectRef`). Everything owned outside an arena, such as
//! contact listeners or user state shared with callbacks, goes through the
//! pair defined here: the owner keeps a [`SafeReferenceable`] and hands out
//! [`WeakReference`]s. Dropping the owner releases the shared control block
//! first, so every outstanding weak handle observes expiry at the same time.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use thiserror::Error;

/// Errors produced when resolving a non-owning reference
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceError {
    /// The referent has been destroyed
    #[error("expired {0} reference")]
    Expired(&'static str),

    /// The handle belongs to a different scene than the one asked to resolve it
    #[error("{0} reference belongs to another scene")]
    WrongScene(&'static str),
}

/// Owning wrapper that can hand out [`WeakReference`]s to its value
pub struct SafeReferenceable<T: ?Sized> {
    inner: Arc<RwLock<T>>,
}

impl<T> SafeReferenceable<T> {
    /// Take ownership of `value`
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }
}

impl<T: ?Sized> SafeReferenceable<T> {
    /// Create a new weak handle to the owned value
    pub fn reference(&self) -> WeakReference<T> {
        WeakReference {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Shared access to the owned value
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access to the owned value
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of weak handles currently outstanding
    pub fn reference_count(&self) -> usize {
        Arc::weak_count(&self.inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<RwLock<T>> {
        Arc::downgrade(&self.inner)
    }
}

/// Non-owning handle that fails with [`ReferenceError::Expired`] once the owner is gone
pub struct WeakReference<T: ?Sized> {
    inner: Weak<RwLock<T>>,
}

impl<T: ?Sized> Clone for WeakReference<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for WeakReference<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakReference")
            .field("expired", &self.expired())
            .finish()
    }
}

impl<T: ?Sized> WeakReference<T> {
    pub(crate) fn from_weak(inner: Weak<RwLock<T>>) -> Self {
        Self { inner }
    }

    /// Whether the referent has been destroyed
    pub fn expired(&self) -> bool {
        self.inner.strong_count() == 0
    }

    /// Run `f` with shared access to the referent
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, ReferenceError> {
        let strong = self.inner.upgrade().ok_or(ReferenceError::Expired("weak"))?;
        let guard = strong.read().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&guard))
    }

    /// Run `f` with exclusive access to the referent
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, ReferenceError> {
        let strong = self.inner.upgrade().ok_or(ReferenceError::Expired("weak"))?;
        let mut guard = strong.write().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut guard))
    }

    /// Whether both handles point at the same referent
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.inner, &other.inner)
    }
}
