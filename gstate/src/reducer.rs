use std::sync::Arc;

use crate::{
    consumer::{Consumer, Phase},
    error::LifecycleError,
    state::GlobalState,
};

/// A pure `(state, action) -> state` transition.
///
/// Reducers should be total: an action they do not handle returns the previous state unchanged.
pub trait Reducer<S, A>: Send + Sync {
    fn reduce(&self, state: Option<&S>, action: A) -> Option<S>;
}

impl<S, A, F> Reducer<S, A> for F
where F: Fn(Option<&S>, A) -> Option<S> + Send + Sync
{
    fn reduce(&self, state: Option<&S>, action: A) -> Option<S> { self(state, action) }
}

/// A [`GlobalState`] that changes only by dispatching actions through a reducer.
///
/// ```rust
/// use gstate::GlobalReducer;
///
/// enum Action {
///     Add(i64),
///     Reset,
/// }
///
/// let total = GlobalReducer::new(
///     |state: Option<&i64>, action: Action| match action {
///         Action::Add(n) => Some(state.copied().unwrap_or_default() + n),
///         Action::Reset => Some(0),
///     },
///     None,
/// );
///
/// let panel = total.observe();
/// let footer = total.observe();
/// panel.dispatch(Action::Add(5));
/// footer.dispatch(Action::Add(2));
/// assert_eq!(panel.get(), Some(7));
///
/// footer.dispatch(Action::Reset);
/// assert_eq!(panel.get(), Some(0));
/// ```
pub struct GlobalReducer<S, A> {
    state: GlobalState<S>,
    reducer: Arc<dyn Reducer<S, A>>,
}

impl<S, A> Clone for GlobalReducer<S, A> {
    fn clone(&self) -> Self { Self { state: self.state.clone(), reducer: self.reducer.clone() } }
}

impl<S, A> GlobalReducer<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: 'static,
{
    pub fn new<F>(reducer: F, initial: Option<S>) -> Self
    where F: Fn(Option<&S>, A) -> Option<S> + Send + Sync + 'static {
        Self::from_reducer(reducer, initial)
    }

    pub fn from_reducer<R>(reducer: R, initial: Option<S>) -> Self
    where R: Reducer<S, A> + 'static {
        Self { state: GlobalState::new(initial), reducer: Arc::new(reducer) }
    }

    /// The initial state is `init(arg)`, computed once, here, before anything can observe it.
    ///
    /// Closure reducers passed here need their argument types spelled out, or use a named `fn`.
    pub fn with_initializer<R, T, I>(reducer: R, arg: T, init: I) -> Self
    where
        R: Reducer<S, A> + 'static,
        I: FnOnce(T) -> Option<S>,
    {
        Self::from_reducer(reducer, init(arg))
    }

    pub fn observe(&self) -> ReducerConsumer<S, A> { ReducerConsumer { consumer: self.state.observe(), dispatch: self.dispatcher() } }

    pub fn observe_with<F>(&self, render: F) -> ReducerConsumer<S, A>
    where F: Fn() + Send + Sync + 'static {
        ReducerConsumer { consumer: self.state.observe_with(render), dispatch: self.dispatcher() }
    }

    /// A consumer that is not registered until [`ReducerConsumer::attach`]
    pub fn consumer(&self) -> ReducerConsumer<S, A> { ReducerConsumer { consumer: self.state.consumer(), dispatch: self.dispatcher() } }

    pub fn dispatcher(&self) -> Dispatch<S, A> { Dispatch { state: self.state.clone(), reducer: self.reducer.clone() } }

    pub fn peek(&self) -> Option<S> { self.state.peek() }
}

impl<S, A> GlobalReducer<S, A> {
    /// The underlying shared state
    pub fn state(&self) -> &GlobalState<S> { &self.state }
}

/// Sends actions through the reducer and commits the result.
pub struct Dispatch<S, A> {
    state: GlobalState<S>,
    reducer: Arc<dyn Reducer<S, A>>,
}

impl<S, A> Clone for Dispatch<S, A> {
    fn clone(&self) -> Self { Self { state: self.state.clone(), reducer: self.reducer.clone() } }
}

impl<S, A> Dispatch<S, A>
where S: Clone + Send + Sync + 'static
{
    /// Reduce `action` against the current state and commit. A panicking reducer leaves the state
    /// as it was and notifies nobody.
    pub fn dispatch(&self, action: A) {
        let reducer = &self.reducer;
        self.state.setter().update(|prev| reducer.reduce(prev, action))
    }
}

/// A [`Consumer`] whose mutator is [`Dispatch`].
pub struct ReducerConsumer<S, A> {
    consumer: Consumer<S>,
    dispatch: Dispatch<S, A>,
}

impl<S, A> ReducerConsumer<S, A>
where S: Clone + Send + Sync + 'static
{
    pub fn attach(&mut self) -> Result<(), LifecycleError> { self.consumer.attach() }

    pub fn get(&self) -> Option<S> { self.consumer.get() }

    pub fn dispatch(&self, action: A) { self.dispatch.dispatch(action) }

    /// Read the mirror through a snapshot. `f` may dispatch.
    pub fn with<R>(&self, f: impl FnOnce(Option<&S>) -> R) -> R { self.consumer.with(f) }

    /// The `(state, dispatch)` pair a render reads
    pub fn state(&self) -> (Option<S>, Dispatch<S, A>) { (self.get(), self.dispatch.clone()) }
}

impl<S, A> ReducerConsumer<S, A> {
    pub fn detach(&mut self) { self.consumer.detach() }

    pub fn phase(&self) -> Phase { self.consumer.phase() }

    pub fn dispatcher(&self) -> &Dispatch<S, A> { &self.dispatch }

    pub fn renders(&self) -> usize { self.consumer.renders() }
}
