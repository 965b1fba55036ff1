//! Deferred values for forward references
//!
//! A [`Deferred`] starts `Pending` and is resolved exactly once through its
//! [`DeferredSetter`], which the external scheduler holds until the pass that
//! computes the value. Reading a pending handle, or resolving one twice, is a
//! defect in the caller and panics.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// State of a deferred value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredState<T> {
    Pending,
    Resolved(T),
}

/// Read side of a deferred value
pub struct Deferred<T> {
    state: Arc<RwLock<DeferredState<T>>>,
}

/// Write side of a deferred value
pub struct DeferredSetter<T> {
    state: Arc<RwLock<DeferredState<T>>>,
}

impl<T: Clone> Deferred<T> {
    /// Create a pending handle and its setter
    pub fn pending() -> (Deferred<T>, DeferredSetter<T>) {
        let state = Arc::new(RwLock::new(DeferredState::Pending));
        (
            Deferred {
                state: state.clone(),
            },
            DeferredSetter { state },
        )
    }

    /// Create an already resolved handle
    pub fn resolved(value: T) -> Self {
        Self {
            state: Arc::new(RwLock::new(DeferredState::Resolved(value))),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*self.state.read(), DeferredState::Resolved(_))
    }

    /// The value, or `None` while pending
    pub fn try_get(&self) -> Option<T> {
        match &*self.state.read() {
            DeferredState::Pending => None,
            DeferredState::Resolved(value) => Some(value.clone()),
        }
    }

    /// The resolved value
    ///
    /// # Panics
    ///
    /// Panics if the handle is still pending.
    pub fn get(&self) -> T {
        match self.try_get() {
            Some(value) => value,
            None => panic!("deferred value read before it was resolved"),
        }
    }
}

impl<T> DeferredSetter<T> {
    /// Resolve the handle
    ///
    /// # Panics
    ///
    /// Panics if the handle was already resolved.
    pub fn set(&self, value: T) {
        let mut state = self.state.write();
        if matches!(*state, DeferredState::Resolved(_)) {
            panic!("deferred value resolved twice");
        }
        *state = DeferredState::Resolved(value);
    }
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Deferred").field(&*self.state.read()).finish()
    }
}

impl<T> fmt::Debug for DeferredSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeferredSetter")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_then_read() {
        let (handle, setter) = Deferred::<i32>::pending();
        assert!(!handle.is_resolved());
        assert_eq!(handle.try_get(), None);
        setter.set(7);
        assert_eq!(handle.get(), 7);
        assert_eq!(handle.clone().get(), 7);
    }

    #[test]
    #[should_panic(expected = "before it was resolved")]
    fn test_read_pending_panics() {
        let (handle, _setter) = Deferred::<i32>::pending();
        handle.get();
    }

    #[test]
    #[should_panic(expected = "resolved twice")]
    fn test_resolve_twice_panics() {
        let (_handle, setter) = Deferred::<i32>::pending();
        setter.set(1);
        setter.set(2);
    }
}
