use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

use tracing::trace;

/// A unique identifier for a broadcast that cannot be forged or extracted.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct BroadcastId(usize);

impl std::fmt::Display for BroadcastId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{:x}", self.0) }
}

/// Identifies one registration within a broadcast. Ids are handed out in increasing order,
/// so ordering by id is ordering by registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ListenerId(usize);

/// A callback registered with a broadcast.
pub enum Listener<T = ()> {
    /// Receives the broadcast value
    Payload(Arc<dyn Fn(T) + Send + Sync + 'static>),
    /// Only receives the notification, the value is never produced for it
    NotifyOnly(Arc<dyn Fn() + Send + Sync + 'static>),
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        match self {
            Listener::Payload(callback) => Listener::Payload(callback.clone()),
            Listener::NotifyOnly(callback) => Listener::NotifyOnly(callback.clone()),
        }
    }
}

/// Trait for types that can be converted into broadcast listeners.
pub trait IntoListener<T> {
    fn into_listener(self) -> Listener<T>;
}

/// A synchronous, ordered fan-out of values to every registered listener.
///
/// Listeners are invoked in the order they were registered. The listener set is snapshotted
/// before each send, so listeners may register or drop other listeners (or themselves) while
/// a send is in progress.
pub struct Broadcast<T = ()>(Arc<Inner<T>>);

struct Inner<T> {
    listeners: RwLock<BTreeMap<ListenerId, Listener<T>>>,
    next_id: AtomicUsize,
}

impl<T> Clone for Broadcast<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> std::fmt::Debug for Broadcast<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcast").field("id", &self.id()).field("listeners", &self.len()).finish()
    }
}

/// A listen-only reference to a broadcast
pub struct Ref<'a, T>(&'a Broadcast<T>);

/// Keeps a listener registered. Dropping the guard removes the listener.
#[must_use = "the listener is removed as soon as the guard is dropped"]
pub struct ListenerGuard<T = ()> {
    inner: Weak<Inner<T>>,
    id: ListenerId,
}

impl<T> Default for Broadcast<T> {
    fn default() -> Self { Self::new() }
}

impl<T> Broadcast<T> {
    pub fn new() -> Self { Self(Arc::new(Inner { listeners: RwLock::new(BTreeMap::new()), next_id: AtomicUsize::new(0) })) }

    pub fn id(&self) -> BroadcastId { BroadcastId(Arc::as_ptr(&self.0) as usize) }

    /// Number of currently registered listeners
    pub fn len(&self) -> usize { self.0.listeners.read().expect("listeners lock poisoned").len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Notify every listener, producing a fresh payload for each one at the moment it is called.
    ///
    /// Producing the payload per listener (rather than once up front) means that if a listener
    /// causes another send, the listeners that come after it still see the latest value.
    pub fn send_with(&self, produce: impl Fn() -> T) {
        // Snapshot so callbacks run without any lock held
        let snapshot: Vec<Listener<T>> = {
            let listeners = self.0.listeners.read().expect("listeners lock poisoned");
            listeners.values().cloned().collect()
        };
        trace!(broadcast = %self.id(), listeners = snapshot.len(), "send");

        for listener in snapshot {
            match listener {
                Listener::Payload(callback) => callback(produce()),
                Listener::NotifyOnly(callback) => callback(),
            }
        }
    }

    /// Get a read-only reference that can only register listeners
    pub fn reference(&self) -> Ref<'_, T> { Ref(self) }
}

impl<T: Clone> Broadcast<T> {
    /// Sends a clone of `value` to every listener
    pub fn send(&self, value: T) { self.send_with(|| value.clone()) }
}

impl<'a, T> Ref<'a, T> {
    /// Register a listener with the associated broadcast
    pub fn listen<L>(&self, listener: L) -> ListenerGuard<T>
    where L: IntoListener<T> {
        let inner = &self.0.0;
        let id = ListenerId(inner.next_id.fetch_add(1, Ordering::Relaxed));
        inner.listeners.write().expect("listeners lock poisoned").insert(id, listener.into_listener());
        ListenerGuard { inner: Arc::downgrade(inner), id }
    }
}

impl<T> ListenerGuard<T> {
    /// The broadcast this guard is registered with. The broadcast may already be gone;
    /// the address stays reserved while this guard's weak reference exists.
    pub fn broadcast_id(&self) -> BroadcastId { BroadcastId(self.inner.as_ptr() as usize) }
}

impl<T> Drop for ListenerGuard<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners.write().expect("listeners lock poisoned").remove(&self.id);
        }
    }
}

impl<F, T> IntoListener<T> for F
where F: Fn(T) + Send + Sync + 'static
{
    fn into_listener(self) -> Listener<T> { Listener::Payload(Arc::new(self)) }
}

impl<T> IntoListener<T> for Listener<T> {
    fn into_listener(self) -> Listener<T> { self }
}

impl<T> IntoListener<T> for Arc<dyn Fn(T) + Send + Sync + 'static> {
    fn into_listener(self) -> Listener<T> { Listener::Payload(self) }
}

// Unit listeners work with any payload type
impl<T> IntoListener<T> for Arc<dyn Fn() + Send + Sync + 'static> {
    fn into_listener(self) -> Listener<T> { Listener::NotifyOnly(self) }
}

impl<T> IntoListener<T> for std::sync::mpsc::Sender<T>
where T: Send + 'static
{
    fn into_listener(self) -> Listener<T> {
        Listener::Payload(Arc::new(move |value| {
            let _ = self.send(value); // receiver may be gone
        }))
    }
}

#[cfg(feature = "tokio")]
impl<T> IntoListener<T> for tokio::sync::mpsc::UnboundedSender<T>
where T: Send + Sync + 'static
{
    fn into_listener(self) -> Listener<T> {
        Listener::Payload(Arc::new(move |value| {
            let _ = self.send(value); // receiver may be gone
        }))
    }
}
