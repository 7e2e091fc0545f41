use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::{
    broadcast::ListenerGuard,
    error::LifecycleError,
    state::{GlobalState, Setter},
    value::{Mirror, Slot},
};

/// Where a consumer is in its attach/detach lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Has read the value but is not receiving updates yet
    Pending,
    Attached,
    /// Torn down for good
    Detached,
}

pub(crate) type RenderFn = Arc<dyn Fn() + Send + Sync>;

/// One observer of a [`GlobalState`]: a local mirror of the shared cell plus the listener that keeps it
/// current while attached.
///
/// Dropping the consumer detaches it.
pub struct Consumer<S> {
    state: GlobalState<S>,
    setter: Setter<S>,
    mirror: Slot<S>,
    renders: Arc<AtomicUsize>,
    render: Option<RenderFn>,
    guard: Option<ListenerGuard<Option<S>>>,
    phase: Phase,
}

impl<S> Consumer<S>
where S: Clone + Send + Sync + 'static
{
    pub(crate) fn pending(state: &GlobalState<S>, render: Option<RenderFn>) -> Self {
        Self {
            state: state.clone(),
            setter: state.setter(),
            mirror: Slot::new(state.peek()),
            renders: Arc::new(AtomicUsize::new(0)),
            render,
            guard: None,
            phase: Phase::Pending,
        }
    }

    pub(crate) fn attached(state: &GlobalState<S>, render: Option<RenderFn>) -> Self {
        let mut consumer = Self::pending(state, render);
        consumer.register();
        consumer
    }

    /// Start receiving updates. Fails if the consumer is already attached or has been torn down.
    pub fn attach(&mut self) -> Result<(), LifecycleError> {
        match self.phase {
            Phase::Pending => {
                self.register();
                Ok(())
            }
            Phase::Attached => Err(LifecycleError::AlreadyAttached),
            Phase::Detached => Err(LifecycleError::TornDown),
        }
    }

    fn register(&mut self) {
        let mirror = self.mirror.clone();
        let renders = self.renders.clone();
        let render = self.render.clone();
        let guard = self.state.subscribe(move |value: Option<S>| {
            mirror.store(value);
            renders.fetch_add(1, Ordering::Relaxed);
            if let Some(render) = &render {
                render();
            }
        });

        // Commits made between the initial read and now were not delivered
        self.mirror.store(self.state.peek());
        self.guard = Some(guard);
        self.phase = Phase::Attached;
        debug!(store = self.state.name().unwrap_or("anonymous"), observers = self.state.observer_count(), "consumer attached");
    }

    /// The mirrored value as of the last notification
    pub fn get(&self) -> Option<S> { self.mirror.load() }

    /// Read the mirror through a snapshot. `f` may commit through [`Consumer::setter`].
    pub fn with<R>(&self, f: impl FnOnce(Option<&S>) -> R) -> R { self.mirror.with(f) }

    /// Read-only handle to the mirror, for render functions that outlive this borrow
    pub fn mirror(&self) -> Mirror<S> { self.mirror.view() }

    /// The `(value, mutator)` pair a render reads
    pub fn state(&self) -> (Option<S>, Setter<S>) { (self.get(), self.setter.clone()) }
}

impl<S> Consumer<S> {
    /// Stop receiving updates. Idempotent, and a no-op for a consumer that never attached.
    pub fn detach(&mut self) {
        if let Some(guard) = self.guard.take() {
            drop(guard);
            debug!(store = self.state.name().unwrap_or("anonymous"), observers = self.state.observer_count(), "consumer detached");
        }
        self.phase = Phase::Detached;
    }

    pub fn phase(&self) -> Phase { self.phase }

    pub fn is_attached(&self) -> bool { self.phase == Phase::Attached }

    pub fn setter(&self) -> &Setter<S> { &self.setter }

    /// How many notifications this consumer has received
    pub fn renders(&self) -> usize { self.renders.load(Ordering::Relaxed) }
}

impl<S> Drop for Consumer<S> {
    fn drop(&mut self) { self.detach() }
}

impl<S> std::fmt::Debug for Consumer<S>
where S: Clone + std::fmt::Debug
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer").field("phase", &self.phase).field("value", &self.mirror.load()).finish()
    }
}
