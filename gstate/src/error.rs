use thiserror::Error;

/// Misuse of a consumer's attach/detach lifecycle.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("consumer is already attached")]
    AlreadyAttached,
    #[error("consumer was torn down and cannot be attached again")]
    TornDown,
}
