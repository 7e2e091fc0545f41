use crate::{reducer::GlobalReducer, state::GlobalState};

/// Helper trait for `wait_for` to allow flexible predicate return types.
///
/// ## Semantics
/// - `result()` returns `Some(output)` to stop waiting and return `output`
/// - `result()` returns `None` to continue waiting for the next commit
pub trait WaitResult {
    type Output;
    fn result(self) -> Option<Self::Output>;
}

// true = stop with (), false = keep waiting
impl WaitResult for bool {
    type Output = ();
    fn result(self) -> Option<Self::Output> { if self { Some(()) } else { None } }
}

// Some(value) = stop with value, None = keep waiting
impl<T> WaitResult for Option<T> {
    type Output = T;
    fn result(self) -> Option<Self::Output> { self }
}

impl<S> GlobalState<S>
where S: Clone + Send + Sync + 'static
{
    /// Resolve once the shared value satisfies `predicate`, checking the current value first and then
    /// every subsequent commit.
    pub async fn wait_for<F, R>(&self, predicate: F) -> R::Output
    where
        F: Fn(Option<&S>) -> R,
        R: WaitResult,
    {
        // Listen before checking so a commit between the check and the listen is not missed
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Option<S>>();
        let _guard = self.subscribe(tx);

        if let Some(result) = self.with(|value| predicate(value).result()) {
            return result;
        }

        loop {
            match rx.recv().await {
                Some(value) => {
                    if let Some(result) = predicate(value.as_ref()).result() {
                        return result;
                    }
                }
                // The sender lives in the listener we hold the guard for
                None => unreachable!("listener channel closed while its guard is alive"),
            }
        }
    }

    /// Resolve once the shared value equals `target`
    pub async fn wait_value(&self, target: Option<S>)
    where S: PartialEq {
        self.wait_for(|value| value == target.as_ref()).await
    }
}

impl<S, A> GlobalReducer<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: 'static,
{
    pub async fn wait_for<F, R>(&self, predicate: F) -> R::Output
    where
        F: Fn(Option<&S>) -> R,
        R: WaitResult,
    {
        self.state().wait_for(predicate).await
    }

    pub async fn wait_value(&self, target: Option<S>)
    where S: PartialEq {
        self.state().wait_value(target).await
    }
}
