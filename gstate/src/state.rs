use std::sync::Arc;

use tracing::debug;

use crate::{
    broadcast::{Broadcast, BroadcastId, IntoListener, ListenerGuard},
    consumer::Consumer,
    value::Slot,
};

/// One shared value and the listeners that mirror it.
///
/// Cloning a `GlobalState` yields another handle to the same cell; construct one `GlobalState` per
/// logical piece of shared state. Every consumer obtained through [`GlobalState::observe`] sees every
/// committed value, in commit order.
///
/// ```rust
/// use gstate::GlobalState;
///
/// let counter = GlobalState::new(Some(0));
/// let first = counter.observe();
/// let second = counter.observe();
///
/// first.setter().update(|prev| prev.map(|n| n + 1));
/// assert_eq!(first.get(), Some(1));
/// assert_eq!(second.get(), Some(1));
///
/// second.setter().clear();
/// assert_eq!(first.get(), None);
/// ```
pub struct GlobalState<S>(pub(crate) Arc<Inner<S>>);

pub(crate) struct Inner<S> {
    name: Option<String>,
    pub(crate) value: Slot<S>,
    pub(crate) broadcast: Broadcast<Option<S>>,
}

impl<S> Clone for GlobalState<S> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<S> std::fmt::Debug for GlobalState<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalState").field("name", &self.0.name).field("observers", &self.observer_count()).finish()
    }
}

impl<S> GlobalState<S> {
    /// Optional label used in log records
    pub fn name(&self) -> Option<&str> { self.0.name.as_deref() }

    /// Number of live listeners, attached consumers included
    pub fn observer_count(&self) -> usize { self.0.broadcast.len() }

    pub fn id(&self) -> BroadcastId { self.0.broadcast.id() }
}

impl<S> GlobalState<S>
where S: Clone + Send + Sync + 'static
{
    pub fn new(initial: Option<S>) -> Self { Self::build(None, initial) }

    pub fn named(name: impl Into<String>, initial: Option<S>) -> Self { Self::build(Some(name.into()), initial) }

    fn build(name: Option<String>, initial: Option<S>) -> Self {
        Self(Arc::new(Inner { name, value: Slot::new(initial), broadcast: Broadcast::new() }))
    }

    /// Returns a clone of the current value - not observed
    pub fn peek(&self) -> Option<S> { self.0.value.load() }

    /// Read the cell without observing it. `f` sees a snapshot, so it may commit to this same state.
    pub fn with<R>(&self, f: impl FnOnce(Option<&S>) -> R) -> R { self.0.value.with(f) }

    /// Begin observing: returns an attached consumer whose mirror tracks every commit
    pub fn observe(&self) -> Consumer<S> { Consumer::attached(self, None) }

    /// Like [`GlobalState::observe`], calling `render` after each mirror update
    pub fn observe_with<F>(&self, render: F) -> Consumer<S>
    where F: Fn() + Send + Sync + 'static {
        Consumer::attached(self, Some(Arc::new(render)))
    }

    /// A consumer that has read the current value but is not registered until [`Consumer::attach`]
    pub fn consumer(&self) -> Consumer<S> { Consumer::pending(self, None) }

    /// A mutator that is not bound to any consumer
    pub fn setter(&self) -> Setter<S> { Setter(self.0.clone()) }

    /// Register a raw listener that receives every committed value
    pub fn subscribe<L>(&self, listener: L) -> ListenerGuard<Option<S>>
    where L: IntoListener<Option<S>> {
        self.0.broadcast.reference().listen(listener)
    }
}

impl<S> Default for GlobalState<S>
where S: Clone + Send + Sync + 'static
{
    fn default() -> Self { Self::new(None) }
}

impl<S> Inner<S>
where S: Clone + Send + Sync + 'static
{
    fn label(&self) -> &str { self.name.as_deref().unwrap_or("anonymous") }

    /// Assign the cell, then fan out. Each listener reads the cell when it is called so that a
    /// nested commit made by an earlier listener is what later listeners see.
    fn commit(&self, next: Option<S>) {
        self.value.store(next);
        debug!(store = self.label(), observers = self.broadcast.len(), "state committed");
        self.broadcast.send_with(|| self.value.load());
    }
}

/// A replacement for the shared value: either a literal or an updater computed from the previous value.
pub enum SetState<S> {
    Replace(Option<S>),
    Update(Box<dyn FnOnce(Option<&S>) -> Option<S> + Send>),
}

impl<S> SetState<S> {
    pub fn update<F>(f: F) -> Self
    where F: FnOnce(Option<&S>) -> Option<S> + Send + 'static {
        SetState::Update(Box::new(f))
    }
}

impl<S> From<Option<S>> for SetState<S> {
    fn from(value: Option<S>) -> Self { SetState::Replace(value) }
}

impl<S> std::fmt::Debug for SetState<S>
where S: std::fmt::Debug
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetState::Replace(value) => f.debug_tuple("Replace").field(value).finish(),
            SetState::Update(_) => f.write_str("Update(..)"),
        }
    }
}

/// Writes to a [`GlobalState`]. Every call commits one value and notifies all live listeners
/// before returning.
pub struct Setter<S>(Arc<Inner<S>>);

impl<S> Clone for Setter<S> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<S> Setter<S>
where S: Clone + Send + Sync + 'static
{
    pub fn set(&self, value: S) { self.0.commit(Some(value)) }

    /// Reset the cell to absent
    pub fn clear(&self) { self.0.commit(None) }

    pub fn replace(&self, value: Option<S>) { self.0.commit(value) }

    /// Compute the next value from the previous one.
    ///
    /// The updater runs against a snapshot with no lock held. If it panics, the cell is left untouched
    /// and nobody is notified.
    pub fn update<F>(&self, f: F)
    where F: FnOnce(Option<&S>) -> Option<S> {
        let previous = self.0.value.load();
        let next = f(previous.as_ref());
        self.0.commit(next)
    }

    /// Like [`Setter::update`] for updaters that can refuse the transition. An `Err` is returned
    /// as-is and nothing is committed.
    pub fn try_update<F, E>(&self, f: F) -> Result<(), E>
    where F: FnOnce(Option<&S>) -> Result<Option<S>, E> {
        let previous = self.0.value.load();
        let next = f(previous.as_ref())?;
        self.0.commit(next);
        Ok(())
    }

    pub fn apply(&self, action: impl Into<SetState<S>>) {
        match action.into() {
            SetState::Replace(value) => self.replace(value),
            SetState::Update(f) => self.update(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_peek_reflects_commits() {
        let state = GlobalState::new(Some(1));
        let setter = state.setter();
        assert_eq!(state.peek(), Some(1));

        setter.set(2);
        assert_eq!(state.peek(), Some(2));
        setter.clear();
        assert_eq!(state.peek(), None);
        setter.replace(Some(3));
        assert_eq!(state.peek(), Some(3));
    }

    #[test]
    fn test_apply_set_state() {
        let state = GlobalState::new(Some(10));
        let setter = state.setter();

        setter.apply(SetState::update(|prev: Option<&i32>| prev.map(|n| n * 2)));
        assert_eq!(state.peek(), Some(20));

        setter.apply(Some(5));
        assert_eq!(state.peek(), Some(5));

        setter.apply(SetState::Replace(None));
        assert_eq!(state.peek(), None);
    }

    #[test]
    fn test_try_update_error_is_atomic() {
        let state = GlobalState::new(Some(3u32));
        let notified = Arc::new(Mutex::new(Vec::new()));
        let _guard = {
            let notified = notified.clone();
            state.subscribe(move |value: Option<u32>| notified.lock().unwrap().push(value))
        };

        let result = state.setter().try_update(|prev| match prev {
            Some(n) if *n > 2 => Err("too large"),
            other => Ok(other.map(|n| n + 1)),
        });

        assert_eq!(result, Err("too large"));
        assert_eq!(state.peek(), Some(3));
        assert!(notified.lock().unwrap().is_empty());

        state.setter().set(1);
        assert_eq!(state.setter().try_update(|prev| Ok::<_, ()>(prev.map(|n| n + 1))), Ok(()));
        assert_eq!(*notified.lock().unwrap(), vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_updater_may_read_same_state() {
        let state = GlobalState::new(Some(4));
        let reader = state.clone();
        state.setter().update(|prev| {
            // no lock is held while the updater runs
            assert_eq!(reader.peek(), prev.copied());
            prev.map(|n| n + 1)
        });
        assert_eq!(state.peek(), Some(5));
    }

    #[test]
    fn test_commit_from_inside_with() {
        let state = GlobalState::new(Some(0));
        let setter = state.setter();
        let seen = state.with(|value| {
            if value == Some(&0) {
                setter.set(1);
            }
            value.copied()
        });
        assert_eq!(seen, Some(0));
        assert_eq!(state.peek(), Some(1));
    }

    #[test]
    fn test_nested_commit_reaches_later_listeners() {
        let state = GlobalState::new(Some(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        // First listener clamps values above 10, which commits again from inside the fan-out
        let _clamp = {
            let setter = state.setter();
            state.subscribe(move |value: Option<i32>| {
                if let Some(n) = value {
                    if n > 10 {
                        setter.set(10);
                    }
                }
            })
        };
        let _record = {
            let seen = seen.clone();
            state.subscribe(move |value: Option<i32>| seen.lock().unwrap().push(value))
        };

        state.setter().set(42);

        assert_eq!(state.peek(), Some(10));
        // the nested commit delivers 10, and the outer fan-out resumes with the live value
        assert_eq!(*seen.lock().unwrap(), vec![Some(10), Some(10)]);
    }

    #[test]
    fn test_named_state() {
        let state = GlobalState::<String>::named("session", None);
        assert_eq!(state.name(), Some("session"));
        assert_eq!(GlobalState::<String>::default().name(), None);
        assert!(format!("{state:?}").contains("session"));
    }
}
