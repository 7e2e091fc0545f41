use std::sync::{Arc, PoisonError, RwLock};

/// Storage for one optional value, shared between the state cell and consumer mirrors.
///
/// Every read clones the value out and releases the lock before caller code runs, so a closure
/// passed to [`Slot::with`] may write back into the same slot.
pub(crate) struct Slot<S>(Arc<RwLock<Option<S>>>);

impl<S> Clone for Slot<S> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<S: Clone> Slot<S> {
    pub fn new(initial: Option<S>) -> Self { Self(Arc::new(RwLock::new(initial))) }

    pub fn store(&self, value: Option<S>) { *self.0.write().unwrap_or_else(PoisonError::into_inner) = value; }

    pub fn load(&self) -> Option<S> { self.0.read().unwrap_or_else(PoisonError::into_inner).clone() }

    pub fn with<R>(&self, f: impl FnOnce(Option<&S>) -> R) -> R {
        let value = self.load();
        f(value.as_ref())
    }

    pub fn view(&self) -> Mirror<S> { Mirror(self.clone()) }
}

/// Read-only handle to a consumer's mirror. It keeps tracking the mirror after the borrow it came
/// from ends, and stops changing once the consumer detaches.
pub struct Mirror<S>(Slot<S>);

impl<S> Clone for Mirror<S> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<S: Clone> Mirror<S> {
    pub fn get(&self) -> Option<S> { self.0.load() }

    pub fn with<R>(&self, f: impl FnOnce(Option<&S>) -> R) -> R { self.0.with(f) }
}
